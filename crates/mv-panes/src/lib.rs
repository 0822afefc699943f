//! Live browser panes: one embedded surface per enabled AI target.

mod layout;

pub use layout::GRID_COLUMNS;
pub use layout::LayoutMode;
pub use layout::compute_cells;

use mv_core::AppError;
use mv_core::AppResult;
use mv_core::PaneId;
use mv_core::SurfaceFactory;
use mv_core::SurfaceRect;
use mv_core::SurfaceRequest;
use mv_core::SurfaceRole;
use mv_core::WebSurface;
use mv_profile::Profile;
use mv_targets::TargetDefinition;
use mv_targets::TargetId;
use tracing::debug;
use tracing::info;
use tracing::warn;

pub const DEFAULT_ZOOM: f64 = 1.0;
pub const ZOOM_STEP: f64 = 0.1;
pub const MIN_ZOOM: f64 = 0.3;
pub const MAX_ZOOM: f64 = 3.0;

/// One embedded browser surface bound to one target.
#[derive(Debug)]
pub struct Pane<S> {
    id: PaneId,
    target: TargetId,
    surface: S,
    current_url: String,
    address: String,
    zoom: f64,
    applied_bounds: Option<SurfaceRect>,
}

impl<S> Pane<S> {
    pub fn id(&self) -> PaneId {
        self.id
    }

    pub fn target(&self) -> TargetId {
        self.target
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Last URL reported by the engine.
    pub fn current_url(&self) -> &str {
        &self.current_url
    }

    /// Editable address field contents.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn address_mut(&mut self) -> &mut String {
        &mut self.address
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }
}

/// Where one pane goes on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneCell {
    pub pane: PaneId,
    pub target: TargetId,
    /// Whole cell, including the address strip when shown.
    pub cell: SurfaceRect,
    pub address_bar: Option<SurfaceRect>,
    pub content: SurfaceRect,
}

/// What a [`PaneManager::rebuild`] call changed.
#[derive(Debug, Default)]
pub struct RebuildSummary {
    pub added: Vec<TargetId>,
    pub removed: Vec<TargetId>,
    pub failed: Vec<(TargetId, AppError)>,
}

impl RebuildSummary {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.failed.is_empty()
    }
}

/// Owns every live pane and keeps it in step with the enabled targets.
///
/// Invariant: after [`PaneManager::rebuild`] there is exactly one pane per
/// effective target that could be built, held in registry order.
#[derive(Debug)]
pub struct PaneManager<S> {
    panes: Vec<Pane<S>>,
    layout: LayoutMode,
    bound_profile: Option<String>,
    next_id: u64,
    url_bars_visible: bool,
    surfaces_visible: bool,
}

impl<S> Default for PaneManager<S> {
    fn default() -> Self {
        Self {
            panes: Vec::new(),
            layout: LayoutMode::default(),
            bound_profile: None,
            next_id: 1,
            url_bars_visible: false,
            surfaces_visible: true,
        }
    }
}

impl<S: WebSurface> PaneManager<S> {
    pub fn new(layout: LayoutMode) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.panes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panes.is_empty()
    }

    /// No live panes; the shell shows a placeholder message instead.
    pub fn is_placeholder(&self) -> bool {
        self.panes.is_empty()
    }

    pub fn layout(&self) -> LayoutMode {
        self.layout
    }

    pub fn bound_profile(&self) -> Option<&str> {
        self.bound_profile.as_deref()
    }

    pub fn panes(&self) -> impl Iterator<Item = &Pane<S>> {
        self.panes.iter()
    }

    pub fn panes_mut(&mut self) -> impl Iterator<Item = &mut Pane<S>> {
        self.panes.iter_mut()
    }

    pub fn pane(&self, id: PaneId) -> Option<&Pane<S>> {
        self.panes.iter().find(|pane| pane.id == id)
    }

    pub fn pane_mut(&mut self, id: PaneId) -> Option<&mut Pane<S>> {
        self.panes.iter_mut().find(|pane| pane.id == id)
    }

    pub fn live_targets(&self) -> Vec<TargetId> {
        self.panes.iter().map(|pane| pane.target).collect()
    }

    /// Brings the pane set in line with `targets`.
    ///
    /// Panes whose target is gone are dropped, missing targets get a fresh
    /// surface navigated to their home page, and everything else is left
    /// alone. A different profile than the one the panes were built for
    /// tears every pane down first.
    pub fn rebuild<F>(
        &mut self,
        targets: &[&'static TargetDefinition],
        profile: &Profile,
        factory: &mut F,
    ) -> RebuildSummary
    where
        F: SurfaceFactory<Surface = S>,
    {
        let mut summary = RebuildSummary::default();

        if self
            .bound_profile
            .as_deref()
            .is_some_and(|bound| bound != profile.name)
        {
            summary.removed.extend(self.live_targets());
            self.teardown_all();
        }
        self.bound_profile = Some(profile.name.clone());

        let mut dropped = Vec::new();
        self.panes.retain(|pane| {
            let keep = targets.iter().any(|definition| definition.id == pane.target);
            if !keep {
                debug!(pane = %pane.id, target_name = pane.target.name(), "releasing pane");
                dropped.push(pane.target);
            }
            keep
        });
        summary.removed.extend(dropped);

        for definition in targets {
            if self.panes.iter().any(|pane| pane.target == definition.id) {
                continue;
            }

            match self.create_pane(definition, profile, factory) {
                Ok(pane) => {
                    summary.added.push(definition.id);
                    self.panes.push(pane);
                }
                Err(error) => {
                    warn!(
                        target_name = definition.name,
                        profile = %profile.name,
                        %error,
                        "failed to create pane"
                    );
                    summary.failed.push((definition.id, error));
                }
            }
        }

        self.panes.sort_by_key(|pane| pane.target);
        info!(
            profile = %profile.name,
            live = self.panes.len(),
            added = summary.added.len(),
            removed = summary.removed.len(),
            failed = summary.failed.len(),
            "panes rebuilt"
        );
        summary
    }

    fn create_pane<F>(
        &mut self,
        definition: &'static TargetDefinition,
        profile: &Profile,
        factory: &mut F,
    ) -> AppResult<Pane<S>>
    where
        F: SurfaceFactory<Surface = S>,
    {
        let id = PaneId(self.next_id);
        self.next_id += 1;

        let request = SurfaceRequest {
            role: SurfaceRole::Pane(id),
            label: definition.name,
            url: definition.home_url,
            profile_name: &profile.name,
            storage_path: &profile.storage_path,
        };
        let mut surface = factory.create(&request)?;
        if !self.surfaces_visible {
            surface.set_visible(false)?;
        }

        Ok(Pane {
            id,
            target: definition.id,
            surface,
            current_url: definition.home_url.to_owned(),
            address: definition.home_url.to_owned(),
            zoom: DEFAULT_ZOOM,
            applied_bounds: None,
        })
    }

    /// Releases every surface. Used before switching profiles.
    pub fn teardown_all(&mut self) {
        if !self.panes.is_empty() {
            info!(count = self.panes.len(), "tearing down all panes");
        }
        self.panes.clear();
        self.bound_profile = None;
    }

    /// Switches arrangement without touching any surface. Returns whether the mode changed.
    pub fn set_layout(&mut self, mode: LayoutMode) -> bool {
        if self.layout == mode {
            return false;
        }
        debug!(from = self.layout.label(), to = mode.label(), "layout changed");
        self.layout = mode;
        true
    }

    /// Computes cells for the current layout without side effects.
    pub fn arrange(&self, viewport: SurfaceRect, url_bar_height: u32) -> Vec<PaneCell> {
        let cells = compute_cells(self.layout, self.panes.len(), viewport);
        self.panes
            .iter()
            .zip(cells)
            .map(|(pane, cell)| {
                let (address_bar, content) = if self.url_bars_visible {
                    let (strip, rest) = cell.split_top(url_bar_height);
                    (Some(strip), rest)
                } else {
                    (None, cell)
                };
                PaneCell {
                    pane: pane.id,
                    target: pane.target,
                    cell,
                    address_bar,
                    content,
                }
            })
            .collect()
    }

    /// Arranges panes and pushes changed bounds down to their surfaces.
    pub fn apply_layout(&mut self, viewport: SurfaceRect, url_bar_height: u32) -> Vec<PaneCell> {
        let cells = self.arrange(viewport, url_bar_height);
        for (pane, cell) in self.panes.iter_mut().zip(&cells) {
            if pane.applied_bounds == Some(cell.content) {
                continue;
            }
            match pane.surface.set_bounds(cell.content) {
                Ok(()) => pane.applied_bounds = Some(cell.content),
                Err(error) => warn!(pane = %pane.id, %error, "failed to resize pane"),
            }
        }
        cells
    }

    /// Reloads every pane. Returns how many reloads were issued.
    pub fn refresh_all(&mut self) -> usize {
        let mut issued = 0;
        for pane in &mut self.panes {
            match pane.surface.reload() {
                Ok(()) => issued += 1,
                Err(error) => warn!(pane = %pane.id, %error, "failed to reload pane"),
            }
        }
        info!(issued, "refreshed all panes");
        issued
    }

    /// Mirrors an engine navigation into the pane's address field.
    pub fn record_navigation(&mut self, id: PaneId, url: &str) -> bool {
        let Some(pane) = self.pane_mut(id) else {
            debug!(pane = %id, url, "navigation for a pane that is gone");
            return false;
        };
        pane.current_url = url.to_owned();
        pane.address = url.to_owned();
        true
    }

    /// Navigates a pane to user-entered text. Returns the URL used, or `None` for blank input.
    pub fn submit_address(&mut self, id: PaneId, text: &str) -> AppResult<Option<String>> {
        let Some(url) = normalize_address(text) else {
            return Ok(None);
        };
        let pane = self.pane_mut(id).ok_or_else(|| {
            AppError::new("panes.unknown_pane", format!("{id} is not a live pane"))
        })?;
        pane.surface.navigate(&url)?;
        pane.address = url.clone();
        Ok(Some(url))
    }

    /// Shows or hides the address strip on every pane at once.
    pub fn toggle_url_bars(&mut self) -> bool {
        self.url_bars_visible = !self.url_bars_visible;
        self.url_bars_visible
    }

    /// Hides or shows all native surfaces, e.g. while a modal dialog is open.
    pub fn set_visible(&mut self, visible: bool) {
        if self.surfaces_visible == visible {
            return;
        }
        self.surfaces_visible = visible;
        for pane in &mut self.panes {
            if let Err(error) = pane.surface.set_visible(visible) {
                warn!(pane = %pane.id, visible, %error, "failed to change pane visibility");
            }
        }
    }

    pub fn surfaces_visible(&self) -> bool {
        self.surfaces_visible
    }

    /// Steps zoom by `steps` increments of [`ZOOM_STEP`], clamped.
    pub fn adjust_zoom(&mut self, id: PaneId, steps: i32) -> AppResult<f64> {
        let pane = self.pane_mut(id).ok_or_else(|| {
            AppError::new("panes.unknown_pane", format!("{id} is not a live pane"))
        })?;
        let next = (pane.zoom + f64::from(steps) * ZOOM_STEP).clamp(MIN_ZOOM, MAX_ZOOM);
        let next = (next * 100.0).round() / 100.0;
        pane.surface.set_zoom(next)?;
        pane.zoom = next;
        Ok(next)
    }

    pub fn reset_zoom(&mut self, id: PaneId) -> AppResult<()> {
        let pane = self.pane_mut(id).ok_or_else(|| {
            AppError::new("panes.unknown_pane", format!("{id} is not a live pane"))
        })?;
        pane.surface.set_zoom(DEFAULT_ZOOM)?;
        pane.zoom = DEFAULT_ZOOM;
        Ok(())
    }

    /// Asks one pane for its selected text.
    pub fn capture_selection(&mut self, id: PaneId) -> AppResult<()> {
        let pane = self.pane_mut(id).ok_or_else(|| {
            AppError::new("panes.unknown_pane", format!("{id} is not a live pane"))
        })?;
        pane.surface.capture_selection()
    }

    pub fn open_devtools(&mut self, id: PaneId) -> bool {
        match self.pane_mut(id) {
            Some(pane) => {
                pane.surface.open_devtools();
                true
            }
            None => false,
        }
    }
}

/// Turns address-bar text into a navigable URL.
///
/// Surrounding whitespace is trimmed and blank input yields `None`. Anything
/// not already starting with `http://` or `https://` gets `https://` prepended.
pub fn normalize_address(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Some(trimmed.to_owned())
    } else {
        Some(format!("https://{trimmed}"))
    }
}
