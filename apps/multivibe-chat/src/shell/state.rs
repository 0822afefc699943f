use mv_broadcast::BroadcastOutcome;
use mv_broadcast::Broadcaster;
use mv_core::AppResult;
use mv_core::PaneId;
use mv_core::PopupId;
use mv_core::ShellEvent;
use mv_core::SurfaceFactory;
use mv_core::WebSurface;
use mv_panes::LayoutMode;
use mv_panes::PaneManager;
use mv_panes::RebuildSummary;
use mv_popup::PopupMediator;
use mv_profile::ConfigUpdate;
use mv_profile::Profile;
use mv_profile::ProfileStore;
use mv_profile::validate_profile_name;
use mv_targets::TargetId;
use mv_targets::TargetSelection;
use std::time::Instant;
use tracing::debug;
use tracing::info;
use tracing::warn;
use url::Url;

use super::GOOGLE_SEARCH_TITLE;
use super::GOOGLE_SEARCH_URL;
use super::GOOGLE_SIGN_IN_TITLE;
use super::GOOGLE_SIGN_IN_URL;

/// What a profile switch request ended up doing.
#[derive(Debug)]
pub(crate) enum ProfileSwitch {
    /// Requested name is already active.
    Unchanged,
    Switched(RebuildSummary),
    /// No pane could be built in-process; the caller should relaunch on `profile`.
    RelaunchRequired { profile: String },
}

/// Everything the window operates on, owned in one place.
///
/// Surfaces are created through a factory passed per call, since the native
/// parent window is only reachable while a frame is being drawn.
pub(crate) struct AppState<S> {
    pub(crate) store: ProfileStore,
    pub(crate) profile: Profile,
    pub(crate) selection: TargetSelection,
    pub(crate) panes: PaneManager<S>,
    pub(crate) popups: PopupMediator<S>,
    pub(crate) broadcaster: Broadcaster,
}

impl<S: WebSurface> AppState<S> {
    /// Materializes `profile_name`, records it as the last profile and restores
    /// the saved selection. No panes exist yet.
    pub(crate) fn new(store: ProfileStore, profile_name: &str) -> Self {
        let config = store.load_config();
        let selection = TargetSelection::from_saved(config.enabled_targets.as_deref());
        let profile = store.ensure_profile_materialized(profile_name);
        if config.last_profile.as_deref() != Some(profile.name.as_str()) {
            if let Err(error) = store.save_config(ConfigUpdate::last_profile(&profile.name)) {
                warn!(%error, "failed to persist last profile");
            }
        }
        info!(
            profile = %profile.name,
            targets = selection.enabled().len(),
            "application state ready"
        );

        Self {
            store,
            profile,
            selection,
            panes: PaneManager::new(LayoutMode::Row),
            popups: PopupMediator::new(),
            broadcaster: Broadcaster::new(),
        }
    }

    pub(crate) fn window_title(&self) -> String {
        window_title(&self.profile.name)
    }

    /// Brings panes in line with the current selection and profile.
    pub(crate) fn rebuild_panes<F>(&mut self, factory: &mut F) -> RebuildSummary
    where
        F: SurfaceFactory<Surface = S>,
    {
        let targets = self.selection.effective_targets();
        self.panes.rebuild(&targets, &self.profile, factory)
    }

    pub(crate) fn send_prompt(&mut self, prompt: &str) -> BroadcastOutcome {
        self.broadcaster.broadcast(prompt, &mut self.panes)
    }

    pub(crate) fn refresh_all(&mut self) -> usize {
        self.panes.refresh_all()
    }

    pub(crate) fn toggle_layout(&mut self) -> LayoutMode {
        let next = self.panes.layout().other();
        self.panes.set_layout(next);
        next
    }

    pub(crate) fn toggle_manual_mode(&mut self) -> bool {
        self.broadcaster.toggle_manual_mode()
    }

    /// Applies a new enabled set, persists it and rebuilds panes.
    ///
    /// An empty set is rejected before anything changes.
    pub(crate) fn apply_selection<F>(
        &mut self,
        targets: &[TargetId],
        factory: &mut F,
    ) -> AppResult<RebuildSummary>
    where
        F: SurfaceFactory<Surface = S>,
    {
        self.selection.set_enabled(targets)?;
        if let Err(error) = self
            .store
            .save_config(ConfigUpdate::enabled_targets(self.selection.enabled()))
        {
            warn!(%error, "failed to persist target selection");
        }
        Ok(self.rebuild_panes(factory))
    }

    /// Moves every pane and popup onto another profile.
    ///
    /// The previous surfaces are all released before the first new one is built.
    pub(crate) fn switch_profile<F>(
        &mut self,
        requested: &str,
        factory: &mut F,
    ) -> AppResult<ProfileSwitch>
    where
        F: SurfaceFactory<Surface = S>,
    {
        let name = requested.trim();
        validate_profile_name(name)?;
        if name == self.profile.name {
            return Ok(ProfileSwitch::Unchanged);
        }

        info!(from = %self.profile.name, to = name, "switching profile");
        if let Err(error) = self.store.save_config(ConfigUpdate::last_profile(name)) {
            warn!(%error, "failed to persist last profile");
        }

        self.popups.close_all();
        self.panes.teardown_all();
        self.profile = self.store.ensure_profile_materialized(name);
        let summary = self.rebuild_panes(factory);

        if self.panes.is_empty() && !summary.failed.is_empty() {
            warn!(
                profile = name,
                failed = summary.failed.len(),
                "no pane could be built on the new profile"
            );
            return Ok(ProfileSwitch::RelaunchRequired {
                profile: name.to_owned(),
            });
        }
        Ok(ProfileSwitch::Switched(summary))
    }

    pub(crate) fn open_google_sign_in<F>(&mut self, factory: &mut F) -> AppResult<PopupId>
    where
        F: SurfaceFactory<Surface = S>,
    {
        self.popups
            .open_titled(GOOGLE_SIGN_IN_TITLE, GOOGLE_SIGN_IN_URL, &self.profile, factory)
    }

    /// Asks `pane` for its selected text; the search opens once it arrives.
    pub(crate) fn search_selection(&mut self, pane: PaneId) -> AppResult<()> {
        self.panes.capture_selection(pane)
    }

    /// Applies one engine event.
    pub(crate) fn handle_event<F>(&mut self, event: ShellEvent, now: Instant, factory: &mut F)
    where
        F: SurfaceFactory<Surface = S>,
    {
        match event {
            ShellEvent::NavigationChanged { pane, url } => {
                self.panes.record_navigation(pane, &url);
            }
            ShellEvent::NewWindowRequested { url } => {
                if let Err(error) = self.popups.open(&url, &self.profile, factory) {
                    warn!(url, %error, "failed to open popup window");
                }
            }
            ShellEvent::PopupNavigated { popup, url } => {
                self.popups.on_navigated(popup, &url, now);
            }
            ShellEvent::AutoCloseTimerFired { popup } => {
                self.popups.close(popup);
            }
            ShellEvent::SelectionCaptured { pane, text } => {
                let Some(url) = google_search_url(&text) else {
                    debug!(%pane, "nothing selected to search for");
                    return;
                };
                if let Err(error) =
                    self.popups
                        .open_titled(GOOGLE_SEARCH_TITLE, &url, &self.profile, factory)
                {
                    warn!(%pane, %error, "failed to open search window");
                }
            }
        }
    }

    /// Timer events whose deadline has passed.
    pub(crate) fn due_timer_events(&self, now: Instant) -> Vec<ShellEvent> {
        self.popups
            .due_auto_closes(now)
            .into_iter()
            .map(|popup| ShellEvent::AutoCloseTimerFired { popup })
            .collect()
    }
}

pub(crate) fn window_title(profile_name: &str) -> String {
    format!("Multi Vibe Chat - Profile: {profile_name}")
}

/// Google results page for `text`, or `None` when nothing but whitespace was selected.
pub(crate) fn google_search_url(text: &str) -> Option<String> {
    let query = text.trim();
    if query.is_empty() {
        return None;
    }
    Url::parse_with_params(GOOGLE_SEARCH_URL, [("q", query)])
        .ok()
        .map(String::from)
}
