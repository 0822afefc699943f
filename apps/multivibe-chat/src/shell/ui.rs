use eframe::egui;
use mv_broadcast::BroadcastOutcome;
use mv_core::PaneId;
use mv_core::PopupId;
use mv_core::ShellEvent;
use mv_core::SurfaceRect;
use mv_core::WebSurface;
use mv_panes::PaneCell;
use mv_panes::RebuildSummary;
use mv_profile::ProfileStore;
use mv_targets::TargetId;
use std::collections::HashMap;
use std::sync::mpsc;
use std::time::Instant;
use tracing::info;
use tracing::warn;

use super::POPUP_HEADER_HEIGHT;
use super::POPUP_PANEL_WIDTH;
use super::URL_BAR_HEIGHT;
use super::dialog::SelectionDraft;
use super::events;
use super::runtime;
use super::state::AppState;
use super::state::ProfileSwitch;
use super::webview::WryEngine;
use super::webview::WryFactory;
use super::webview::WrySurface;

const WARNING_COLOR: egui::Color32 = egui::Color32::from_rgb(200, 65, 65);
const MANUAL_MODE_COLOR: egui::Color32 = egui::Color32::from_rgb(0, 128, 0);

/// Deferred UI intent, collected while drawing and applied after the panels.
#[derive(Debug, Clone, PartialEq)]
enum UiAction {
    SendPrompt,
    RefreshAll,
    ToggleLayout,
    ToggleManualMode,
    OpenSelection,
    ApplySelection(Vec<TargetId>),
    CancelSelection,
    GoogleSignIn,
    SwitchProfile,
    SubmitAddress(PaneId, String),
    Zoom(PaneId, i32),
    ResetZoom(PaneId),
    SearchSelection(PaneId),
    Inspect(PaneId),
    ClosePopup(PopupId),
}

struct StatusLine {
    text: String,
    is_error: bool,
}

pub(super) struct ShellApp {
    state: AppState<WrySurface>,
    engine: WryEngine,
    events: mpsc::Receiver<ShellEvent>,
    booted: bool,
    prompt: String,
    profile_input: String,
    known_profiles: Vec<String>,
    selection_dialog: Option<SelectionDraft>,
    popup_bounds: HashMap<PopupId, SurfaceRect>,
    alt_was_down: bool,
    status: Option<StatusLine>,
}

impl ShellApp {
    pub(super) fn new(cc: &eframe::CreationContext<'_>, store: ProfileStore, profile: &str) -> Self {
        let (sink, receiver) = events::event_channel(&cc.egui_ctx);
        let state = AppState::new(store, profile);
        let known_profiles = state.store.list_existing_profiles();
        let profile_input = state.profile.name.clone();

        Self {
            state,
            engine: WryEngine::new(sink),
            events: receiver,
            booted: false,
            prompt: String::new(),
            profile_input,
            known_profiles,
            selection_dialog: None,
            popup_bounds: HashMap::new(),
            alt_was_down: false,
            status: None,
        }
    }

    fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(StatusLine {
            text: text.into(),
            is_error: false,
        });
    }

    fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusLine {
            text: text.into(),
            is_error: true,
        });
    }

    fn report_rebuild(&mut self, summary: &RebuildSummary) {
        if summary.failed.is_empty() {
            return;
        }
        let names: Vec<&str> = summary.failed.iter().map(|(target, _)| target.name()).collect();
        self.set_error(format!("Could not open: {}", names.join(", ")));
    }

    fn process_events(&mut self, frame: &eframe::Frame) {
        let now = Instant::now();
        let mut queued = events::drain(&self.events);
        queued.extend(self.state.due_timer_events(now));
        if queued.is_empty() {
            return;
        }

        let mut factory = WryFactory::new(&mut self.engine, frame);
        for event in queued {
            self.state.handle_event(event, now, &mut factory);
        }
        self.popup_bounds
            .retain(|id, _| self.state.popups.get(*id).is_some());
    }

    fn toggle_url_bars_on_alt(&mut self, ctx: &egui::Context) {
        let alt_down = ctx.input(|input| input.modifiers.alt);
        if alt_down && !self.alt_was_down {
            let visible = self.state.panes.toggle_url_bars();
            info!(visible, "url bars toggled");
        }
        self.alt_was_down = alt_down;
    }

    /// Native surfaces draw above egui, so they are hidden while a dialog is up.
    fn set_overlay_open(&mut self, open: bool) {
        if self.state.panes.surfaces_visible() != open {
            return;
        }
        self.state.panes.set_visible(!open);
        for popup in self.state.popups.popups_mut() {
            let id = popup.id();
            if let Err(error) = popup.surface_mut().set_visible(!open) {
                warn!(popup = %id, %error, "failed to change popup visibility");
            }
        }
    }

    fn perform(&mut self, action: UiAction, ctx: &egui::Context, frame: &eframe::Frame) {
        match action {
            UiAction::SendPrompt => match self.state.send_prompt(&self.prompt) {
                BroadcastOutcome::Dispatched { panes, failed } => {
                    self.prompt.clear();
                    if failed.is_empty() {
                        self.set_status(format!("Prompt sent to {} AIs", panes.len()));
                    } else {
                        self.set_error(format!(
                            "Prompt sent to {} AIs, {} failed",
                            panes.len(),
                            failed.len()
                        ));
                    }
                }
                BroadcastOutcome::Suppressed | BroadcastOutcome::EmptyPrompt => {}
            },
            UiAction::RefreshAll => {
                self.state.refresh_all();
            }
            UiAction::ToggleLayout => {
                self.state.toggle_layout();
            }
            UiAction::ToggleManualMode => {
                self.state.toggle_manual_mode();
            }
            UiAction::OpenSelection => {
                self.selection_dialog = Some(SelectionDraft::from_selection(&self.state.selection));
            }
            UiAction::ApplySelection(targets) => {
                let mut factory = WryFactory::new(&mut self.engine, frame);
                match self.state.apply_selection(&targets, &mut factory) {
                    Ok(summary) => {
                        self.selection_dialog = None;
                        if !summary.is_noop() {
                            self.set_status(format!("Showing {} AIs", self.state.panes.len()));
                        }
                        self.report_rebuild(&summary);
                    }
                    Err(error) => self.set_error(error.to_string()),
                }
            }
            UiAction::CancelSelection => {
                self.selection_dialog = None;
            }
            UiAction::GoogleSignIn => {
                let mut factory = WryFactory::new(&mut self.engine, frame);
                if let Err(error) = self.state.open_google_sign_in(&mut factory) {
                    self.set_error(error.to_string());
                }
            }
            UiAction::SwitchProfile => self.switch_profile(ctx, frame),
            UiAction::SubmitAddress(pane, text) => {
                if let Err(error) = self.state.panes.submit_address(pane, &text) {
                    self.set_error(error.to_string());
                }
            }
            UiAction::Zoom(pane, steps) => {
                if let Err(error) = self.state.panes.adjust_zoom(pane, steps) {
                    self.set_error(error.to_string());
                }
            }
            UiAction::ResetZoom(pane) => {
                if let Err(error) = self.state.panes.reset_zoom(pane) {
                    self.set_error(error.to_string());
                }
            }
            UiAction::SearchSelection(pane) => {
                if let Err(error) = self.state.search_selection(pane) {
                    self.set_error(error.to_string());
                }
            }
            UiAction::Inspect(pane) => {
                self.state.panes.open_devtools(pane);
            }
            UiAction::ClosePopup(popup) => {
                self.state.popups.close(popup);
                self.popup_bounds.remove(&popup);
            }
        }
        ctx.request_repaint();
    }

    fn switch_profile(&mut self, ctx: &egui::Context, frame: &eframe::Frame) {
        let requested = self.profile_input.trim().to_owned();
        if requested.is_empty() {
            return;
        }

        let mut factory = WryFactory::new(&mut self.engine, frame);
        let outcome = self.state.switch_profile(&requested, &mut factory);
        self.popup_bounds.clear();

        match outcome {
            Ok(ProfileSwitch::Unchanged) => {}
            Ok(ProfileSwitch::Switched(summary)) => {
                ctx.send_viewport_cmd(egui::ViewportCommand::Title(self.state.window_title()));
                self.known_profiles = self.state.store.list_existing_profiles();
                self.set_status(format!("Switched to profile {requested}"));
                self.report_rebuild(&summary);
            }
            Ok(ProfileSwitch::RelaunchRequired { profile }) => {
                match runtime::relaunch_with_profile(&profile) {
                    Ok(()) => ctx.send_viewport_cmd(egui::ViewportCommand::Close),
                    Err(error) => {
                        warn!(%error, "relaunch failed");
                        self.set_error(error.to_string());
                    }
                }
            }
            Err(error) => {
                self.profile_input = self.state.profile.name.clone();
                self.set_error(error.to_string());
            }
        }
    }

    fn render_toolbar(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        let manual = self.state.broadcaster.is_manual_mode();
        let prompt_id = egui::Id::new("prompt_input");

        let send_shortcut = ui.ctx().memory(|memory| memory.has_focus(prompt_id))
            && ui
                .ctx()
                .input_mut(|input| input.consume_key(egui::Modifiers::COMMAND, egui::Key::Enter));
        if send_shortcut && !manual {
            actions.push(UiAction::SendPrompt);
        }

        ui.add_enabled(
            !manual,
            egui::TextEdit::multiline(&mut self.prompt)
                .id(prompt_id)
                .hint_text("Enter your prompt here... (Ctrl+Enter to send)")
                .desired_rows(3)
                .desired_width(f32::INFINITY),
        );

        ui.horizontal(|ui| {
            if ui
                .add_enabled(!manual, egui::Button::new("Send to All"))
                .clicked()
            {
                actions.push(UiAction::SendPrompt);
            }
            if ui.button("Refresh All").clicked() {
                actions.push(UiAction::RefreshAll);
            }
            let layout_label = format!("Switch to {}", self.state.panes.layout().other().label());
            if ui.button(layout_label).clicked() {
                actions.push(UiAction::ToggleLayout);
            }

            let (manual_label, manual_fill) = if manual {
                ("LOG IN MODE: ON", MANUAL_MODE_COLOR)
            } else {
                ("LOG IN MODE: OFF", WARNING_COLOR)
            };
            let manual_button = egui::Button::new(
                egui::RichText::new(manual_label)
                    .strong()
                    .color(egui::Color32::WHITE),
            )
            .fill(manual_fill);
            if ui.add(manual_button).clicked() {
                actions.push(UiAction::ToggleManualMode);
            }

            if ui.button("Select AIs").clicked() {
                actions.push(UiAction::OpenSelection);
            }
            if ui.button("Google Login").clicked() {
                actions.push(UiAction::GoogleSignIn);
            }

            ui.separator();
            ui.label("Profile:");
            ui.add(egui::TextEdit::singleline(&mut self.profile_input).desired_width(140.0));
            egui::ComboBox::from_id_salt("profile_combo")
                .selected_text("")
                .width(24.0)
                .show_ui(ui, |ui| {
                    for name in &self.known_profiles {
                        ui.selectable_value(&mut self.profile_input, name.clone(), name);
                    }
                });
            if ui.button("Switch Profile").clicked() {
                actions.push(UiAction::SwitchProfile);
            }
        });
    }

    fn render_popups(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        let count = self.state.popups.len().max(1) as f32;
        let slot_height = (ui.available_height() / count).floor();

        for popup in self.state.popups.popups_mut() {
            let id = popup.id();
            ui.horizontal(|ui| {
                ui.set_height(POPUP_HEADER_HEIGHT);
                ui.strong(popup.title());
                if ui.button("Close Pop-up").clicked() {
                    actions.push(UiAction::ClosePopup(id));
                }
            });

            let surface_height =
                (slot_height - POPUP_HEADER_HEIGHT - ui.spacing().item_spacing.y).max(0.0);
            let (rect, _) = ui.allocate_exact_size(
                egui::vec2(ui.available_width(), surface_height),
                egui::Sense::hover(),
            );
            let bounds = surface_rect(rect);
            if self.popup_bounds.get(&id) != Some(&bounds) {
                match popup.surface_mut().set_bounds(bounds) {
                    Ok(()) => {
                        self.popup_bounds.insert(id, bounds);
                    }
                    Err(error) => warn!(popup = %id, %error, "failed to place popup"),
                }
            }
        }
    }

    fn render_panes(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        if self.state.panes.is_placeholder() {
            ui.centered_and_justified(|ui| {
                ui.label("No AIs selected. Use \"Select AIs\" to choose which to show.");
            });
            return;
        }

        let viewport = surface_rect(ui.max_rect());
        let cells = self.state.panes.apply_layout(viewport, URL_BAR_HEIGHT);
        for cell in cells {
            self.render_address_bar(ui, &cell, actions);
        }
    }

    fn render_address_bar(
        &mut self,
        ui: &mut egui::Ui,
        cell: &PaneCell,
        actions: &mut Vec<UiAction>,
    ) {
        let Some(strip) = cell.address_bar else {
            return;
        };
        let Some(pane) = self.state.panes.pane_mut(cell.pane) else {
            return;
        };
        let id = cell.pane;
        let zoom = pane.zoom();

        ui.scope_builder(egui::UiBuilder::new().max_rect(egui_rect(strip)), |ui| {
            ui.horizontal_centered(|ui| {
                let field_width = (ui.available_width() - 250.0).max(60.0);
                let response = ui.add(
                    egui::TextEdit::singleline(pane.address_mut())
                        .id(egui::Id::new(("address", id.0)))
                        .desired_width(field_width),
                );
                if response.lost_focus() && ui.input(|input| input.key_pressed(egui::Key::Enter)) {
                    actions.push(UiAction::SubmitAddress(id, pane.address().to_owned()));
                }
                if ui.small_button("-").clicked() {
                    actions.push(UiAction::Zoom(id, -1));
                }
                if ui.small_button(format!("{:.0}%", zoom * 100.0)).clicked() {
                    actions.push(UiAction::ResetZoom(id));
                }
                if ui.small_button("+").clicked() {
                    actions.push(UiAction::Zoom(id, 1));
                }
                if ui
                    .small_button("Search")
                    .on_hover_text("Search the selected text on Google")
                    .clicked()
                {
                    actions.push(UiAction::SearchSelection(id));
                }
                if ui.small_button("Inspect").clicked() {
                    actions.push(UiAction::Inspect(id));
                }
            });
        });
    }

    fn render_selection_dialog(&mut self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        let Some(draft) = self.selection_dialog.as_mut() else {
            return;
        };

        egui::Window::new("Select AIs")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label("Choose which AIs to display:");
                for (target, checked) in &mut draft.checked {
                    ui.checkbox(checked, target.name());
                }
                ui.horizontal(|ui| {
                    if ui.button("Select All").clicked() {
                        draft.set_all(true);
                    }
                    if ui.button("Deselect All").clicked() {
                        draft.set_all(false);
                    }
                });
                if let Some(warning) = draft.warning {
                    ui.colored_label(WARNING_COLOR, warning);
                }
                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Apply").clicked() {
                        if let Some(targets) = draft.confirm() {
                            actions.push(UiAction::ApplySelection(targets));
                        }
                    }
                    if ui.button("Cancel").clicked() {
                        actions.push(UiAction::CancelSelection);
                    }
                });
            });
    }
}

impl eframe::App for ShellApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        runtime::pump_platform_events();

        if !self.booted {
            self.booted = true;
            let mut factory = WryFactory::new(&mut self.engine, frame);
            let summary = self.state.rebuild_panes(&mut factory);
            self.report_rebuild(&summary);
        }

        self.process_events(frame);
        self.toggle_url_bars_on_alt(ctx);
        self.set_overlay_open(self.selection_dialog.is_some());

        let mut actions = Vec::new();

        egui::TopBottomPanel::top("toolbar_panel").show(ctx, |ui| {
            self.render_toolbar(ui, &mut actions);
        });

        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                ui.label(format!("Profile: {}", self.state.profile.name));
                if let Some(status) = &self.status {
                    ui.separator();
                    if status.is_error {
                        ui.colored_label(WARNING_COLOR, &status.text);
                    } else {
                        ui.label(&status.text);
                    }
                }
            });
        });

        if !self.state.popups.is_empty() {
            egui::SidePanel::right("popup_panel")
                .resizable(true)
                .default_width(POPUP_PANEL_WIDTH)
                .show(ctx, |ui| {
                    self.render_popups(ui, &mut actions);
                });
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.render_panes(ui, &mut actions);
            });

        self.render_selection_dialog(ctx, &mut actions);

        for action in actions {
            self.perform(action, ctx, frame);
        }

        if let Some(deadline) = self.state.popups.next_deadline() {
            ctx.request_repaint_after(deadline.saturating_duration_since(Instant::now()));
        }
        if let Some(interval) = runtime::platform_poll_interval() {
            ctx.request_repaint_after(interval);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.state.popups.close_all();
        self.state.panes.teardown_all();
    }
}

pub(super) fn surface_rect(rect: egui::Rect) -> SurfaceRect {
    SurfaceRect::new(
        rect.min.x.round() as i32,
        rect.min.y.round() as i32,
        rect.width().max(0.0).round() as u32,
        rect.height().max(0.0).round() as u32,
    )
}

pub(super) fn egui_rect(rect: SurfaceRect) -> egui::Rect {
    egui::Rect::from_min_size(
        egui::pos2(rect.x as f32, rect.y as f32),
        egui::vec2(rect.width as f32, rect.height as f32),
    )
}
