use mv_core::AppError;
use mv_core::AppResult;
use mv_core::PaneId;
use mv_core::ShellEvent;
use mv_core::SurfaceFactory;
use mv_core::SurfaceRect;
use mv_core::SurfaceRequest;
use mv_core::SurfaceRole;
use mv_core::WebSurface;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::info;
use tracing::warn;
use url::Url;
use wry::PageLoadEvent;
use wry::Rect;
use wry::WebContext;
use wry::WebView;
use wry::WebViewBuilder;
use wry::dpi::LogicalPosition;
use wry::dpi::LogicalSize;
use wry::http::HeaderMap;
use wry::http::HeaderValue;
use wry::http::Request;
use wry::http::header::ACCEPT_LANGUAGE;

use super::ACCEPT_LANGUAGE_VALUE;
use super::USER_AGENT;
use super::events::EventSink;

/// Reports client-side route changes (`pushState` and friends) over IPC.
const HISTORY_HOOK_SCRIPT: &str = include_str!("history_hook.js");
const NAVIGATED_MESSAGE_PREFIX: &str = "navigated:";
const SELECTION_SCRIPT: &str = "window.getSelection ? window.getSelection().toString() : ''";
/// Highest ` (n)` suffix tried before a download is refused.
const MAX_DOWNLOAD_SUFFIX: u32 = 9_999;

/// One native child webview.
pub(crate) struct WrySurface {
    label: String,
    role: SurfaceRole,
    events: EventSink,
    webview: WebView,
}

impl WrySurface {
    fn engine_error(&self, code: &'static str, error: wry::Error) -> AppError {
        AppError::new(code, format!("{}: {error}", self.label))
    }
}

impl WebSurface for WrySurface {
    fn navigate(&mut self, url: &str) -> AppResult<()> {
        self.webview
            .load_url(url)
            .map_err(|error| self.engine_error("shell.webview.navigate_failed", error))
    }

    fn reload(&mut self) -> AppResult<()> {
        self.webview
            .reload()
            .map_err(|error| self.engine_error("shell.webview.reload_failed", error))
    }

    fn evaluate_script(&mut self, source: &str) -> AppResult<()> {
        self.webview
            .evaluate_script(source)
            .map_err(|error| self.engine_error("shell.webview.script_failed", error))
    }

    fn set_bounds(&mut self, rect: SurfaceRect) -> AppResult<()> {
        self.webview
            .set_bounds(wry_rect(rect))
            .map_err(|error| self.engine_error("shell.webview.bounds_failed", error))
    }

    fn set_visible(&mut self, visible: bool) -> AppResult<()> {
        self.webview
            .set_visible(visible)
            .map_err(|error| self.engine_error("shell.webview.visibility_failed", error))
    }

    fn set_zoom(&mut self, factor: f64) -> AppResult<()> {
        self.webview
            .zoom(factor)
            .map_err(|error| self.engine_error("shell.webview.zoom_failed", error))
    }

    fn capture_selection(&mut self) -> AppResult<()> {
        let SurfaceRole::Pane(pane) = self.role else {
            return Err(AppError::new(
                "shell.webview.selection_unsupported",
                format!("{}: only panes offer selection search", self.label),
            ));
        };
        let events = self.events.clone();
        self.webview
            .evaluate_script_with_callback(SELECTION_SCRIPT, move |result| {
                events.emit(selection_event(pane, &result));
            })
            .map_err(|error| self.engine_error("shell.webview.script_failed", error))
    }

    fn open_devtools(&mut self) {
        self.webview.open_devtools();
    }
}

struct ProfileContext {
    storage_path: PathBuf,
    web_context: WebContext,
}

/// Long-lived engine settings plus the storage context of the active profile.
pub(crate) struct WryEngine {
    events: EventSink,
    download_dir: Option<PathBuf>,
    context: Option<ProfileContext>,
}

impl WryEngine {
    pub(crate) fn new(events: EventSink) -> Self {
        let download_dir = dirs::download_dir();
        if download_dir.is_none() {
            warn!("no Downloads directory found; downloads will be refused");
        }
        Self {
            events,
            download_dir,
            context: None,
        }
    }

    /// Context for `storage_path`, replacing the previous profile's one.
    fn context_for(&mut self, storage_path: &Path) -> &mut WebContext {
        let stale = self
            .context
            .as_ref()
            .is_none_or(|context| context.storage_path != storage_path);
        if stale {
            info!(path = %storage_path.display(), "binding engine to profile storage");
        }

        let context = match self.context.take() {
            Some(context) if !stale => context,
            _ => ProfileContext {
                storage_path: storage_path.to_path_buf(),
                web_context: WebContext::new(Some(storage_path.to_path_buf())),
            },
        };
        &mut self.context.insert(context).web_context
    }
}

/// Builds child webviews inside the main window for the duration of one frame.
pub(crate) struct WryFactory<'a> {
    engine: &'a mut WryEngine,
    parent: &'a eframe::Frame,
}

impl<'a> WryFactory<'a> {
    pub(crate) fn new(engine: &'a mut WryEngine, parent: &'a eframe::Frame) -> Self {
        Self { engine, parent }
    }
}

impl SurfaceFactory for WryFactory<'_> {
    type Surface = WrySurface;

    fn create(&mut self, request: &SurfaceRequest<'_>) -> AppResult<WrySurface> {
        let role = request.role;
        let load_events = self.engine.events.clone();
        let ipc_events = self.engine.events.clone();
        let window_events = self.engine.events.clone();
        let surface_events = self.engine.events.clone();
        let download_dir = self.engine.download_dir.clone();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));

        let context = self.engine.context_for(request.storage_path);
        let webview = WebViewBuilder::with_web_context(context)
            .with_url(request.url)
            .with_user_agent(USER_AGENT)
            .with_headers(headers)
            .with_devtools(true)
            .with_bounds(wry_rect(SurfaceRect::default()))
            .with_initialization_script(HISTORY_HOOK_SCRIPT)
            .with_on_page_load_handler(move |event, url| {
                if matches!(event, PageLoadEvent::Started) {
                    load_events.emit(navigation_event(role, url));
                }
            })
            .with_ipc_handler(move |message: Request<String>| {
                match ipc_event(role, message.body()) {
                    Some(event) => ipc_events.emit(event),
                    None => debug!(body = %message.body(), "ignored page message"),
                }
            })
            .with_new_window_req_handler(move |url| {
                debug!(url, "page requested a new window");
                window_events.emit(ShellEvent::NewWindowRequested { url });
                false
            })
            .with_download_started_handler(move |url, destination| {
                match download_destination(download_dir.as_deref(), &url, destination) {
                    Some(path) => {
                        info!(url, path = %path.display(), "download started");
                        *destination = path;
                        true
                    }
                    None => {
                        warn!(url, "download refused: no destination");
                        false
                    }
                }
            })
            .build_as_child(self.parent)
            .map_err(|error| {
                AppError::new(
                    "shell.webview.build_failed",
                    format!("failed to build `{}` webview: {error}", request.label),
                )
            })?;

        debug!(label = request.label, url = request.url, "webview created");
        Ok(WrySurface {
            label: request.label.to_owned(),
            role,
            events: surface_events,
            webview,
        })
    }
}

pub(super) fn navigation_event(role: SurfaceRole, url: String) -> ShellEvent {
    match role {
        SurfaceRole::Pane(pane) => ShellEvent::NavigationChanged { pane, url },
        SurfaceRole::Popup(popup) => ShellEvent::PopupNavigated { popup, url },
    }
}

/// Maps a page message from the history hook onto a navigation event.
pub(super) fn ipc_event(role: SurfaceRole, body: &str) -> Option<ShellEvent> {
    let url = body.strip_prefix(NAVIGATED_MESSAGE_PREFIX)?.trim();
    if url.is_empty() {
        return None;
    }
    Some(navigation_event(role, url.to_owned()))
}

/// Selected text from a script result, which the engine hands back JSON-encoded.
pub(super) fn selection_event(pane: PaneId, result: &str) -> ShellEvent {
    let text = serde_json::from_str::<String>(result).unwrap_or_default();
    ShellEvent::SelectionCaptured { pane, text }
}

/// Where a download lands: the Downloads directory, named after the engine's
/// suggestion or else the last URL path segment. Existing files are never
/// overwritten; a ` (n)` suffix is added before the extension instead.
pub(super) fn download_destination(
    download_dir: Option<&Path>,
    url: &str,
    suggested: &Path,
) -> Option<PathBuf> {
    let dir = download_dir?;
    let file_name = suggested
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .or_else(|| {
            Url::parse(url).ok().and_then(|parsed| {
                parsed
                    .path_segments()
                    .and_then(|mut segments| segments.next_back().map(str::to_owned))
                    .filter(|segment| !segment.is_empty())
            })
        })
        .unwrap_or_else(|| "download".to_owned());
    unused_path(dir, &file_name)
}

fn unused_path(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return Some(candidate);
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map_or_else(|| file_name.to_owned(), |stem| stem.to_string_lossy().into_owned());
    let extension = name
        .extension()
        .map(|extension| extension.to_string_lossy().into_owned());
    (1..=MAX_DOWNLOAD_SUFFIX)
        .map(|n| match &extension {
            Some(extension) => dir.join(format!("{stem} ({n}).{extension}")),
            None => dir.join(format!("{stem} ({n})")),
        })
        .find(|path| !path.exists())
}

fn wry_rect(rect: SurfaceRect) -> Rect {
    Rect {
        position: LogicalPosition::new(rect.x, rect.y).into(),
        size: LogicalSize::new(rect.width, rect.height).into(),
    }
}
