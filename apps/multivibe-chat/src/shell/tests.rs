use super::dialog::EMPTY_SELECTION_WARNING;
use super::dialog::SelectionDraft;
use super::runtime::platform_poll_interval;
use super::runtime::relaunch_args;
use super::state::AppState;
use super::state::ProfileSwitch;
use super::state::google_search_url;
use super::state::window_title;
use super::ui::egui_rect;
use super::ui::surface_rect;
use super::webview::download_destination;
use super::webview::ipc_event;
use super::webview::navigation_event;
use super::webview::selection_event;
use mv_broadcast::BroadcastOutcome;
use mv_core::AppError;
use mv_core::AppResult;
use mv_core::PaneId;
use mv_core::PopupId;
use mv_core::ShellEvent;
use mv_core::SurfaceRect;
use mv_core::SurfaceRole;
use mv_core::testing::RecordingFactory;
use mv_core::testing::RecordingSurface;
use mv_core::testing::SurfaceCommand;
use mv_panes::LayoutMode;
use mv_popup::AUTO_CLOSE_DELAY;
use mv_profile::ConfigUpdate;
use mv_profile::ProfileStore;
use mv_targets::TargetId;
use mv_targets::TargetSelection;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::Instant;
use tempfile::TempDir;

fn temp_dir() -> AppResult<TempDir> {
    TempDir::new().map_err(|error| AppError::new("test.tempdir", error.to_string()))
}

fn booted(
    dir: &TempDir,
    profile: &str,
    factory: &mut RecordingFactory,
) -> AppState<RecordingSurface> {
    let mut state = AppState::new(ProfileStore::new(dir.path().to_path_buf()), profile);
    state.rebuild_panes(factory);
    state
}

fn first_pane(state: &AppState<RecordingSurface>) -> Option<PaneId> {
    state.panes.panes().map(|pane| pane.id()).next()
}

#[test]
fn boot_restores_saved_selection() -> AppResult<()> {
    let dir = temp_dir()?;
    ProfileStore::new(dir.path().to_path_buf())
        .save_config(ConfigUpdate::enabled_targets(&[TargetId::Grok, TargetId::Claude]))?;

    let mut factory = RecordingFactory::default();
    let state = booted(&dir, "default", &mut factory);

    assert_eq!(state.panes.live_targets(), vec![TargetId::Claude, TargetId::Grok]);
    assert_eq!(state.window_title(), "Multi Vibe Chat - Profile: default");
    Ok(())
}

#[test]
fn boot_records_startup_profile_as_last_used() -> AppResult<()> {
    let dir = temp_dir()?;
    let mut factory = RecordingFactory::default();
    let state = booted(&dir, "work", &mut factory);

    assert_eq!(state.store.load_config().last_profile.as_deref(), Some("work"));

    let restarted = AppState::<RecordingSurface>::new(state.store.clone(), "default");
    assert_eq!(
        restarted.store.load_config().last_profile.as_deref(),
        Some("default")
    );
    Ok(())
}

#[test]
fn empty_selection_keeps_current_panes() -> AppResult<()> {
    let dir = temp_dir()?;
    let mut factory = RecordingFactory::default();
    let mut state = booted(&dir, "default", &mut factory);

    let rejected = state.apply_selection(&[], &mut factory);
    assert_eq!(
        rejected.err().map(|error| error.code),
        Some("targets.selection_empty")
    );
    assert_eq!(state.panes.len(), TargetId::ALL.len());

    state.apply_selection(&[TargetId::KimiK2], &mut factory)?;
    assert_eq!(state.panes.live_targets(), vec![TargetId::KimiK2]);
    let saved = state.store.load_config();
    assert_eq!(saved.enabled_targets, Some(vec![TargetId::KimiK2]));
    Ok(())
}

#[test]
fn profile_switch_rebuilds_on_new_profile() -> AppResult<()> {
    let dir = temp_dir()?;
    let mut factory = RecordingFactory::default();
    let mut state = booted(&dir, "default", &mut factory);
    state.handle_event(
        ShellEvent::NewWindowRequested {
            url: "https://accounts.google.com/".to_owned(),
        },
        Instant::now(),
        &mut factory,
    );
    assert_eq!(state.popups.len(), 1);

    let outcome = state.switch_profile("  work ", &mut factory)?;
    assert!(matches!(outcome, ProfileSwitch::Switched(_)));
    assert_eq!(state.profile.name, "work");
    assert!(state.popups.is_empty());
    assert!(
        state
            .panes
            .panes()
            .all(|pane| pane.surface().profile_name == "work")
    );
    assert_eq!(state.store.load_config().last_profile.as_deref(), Some("work"));
    assert_eq!(state.window_title(), "Multi Vibe Chat - Profile: work");
    Ok(())
}

#[test]
fn profile_switch_rejects_bad_names_and_noops() -> AppResult<()> {
    let dir = temp_dir()?;
    let mut factory = RecordingFactory::default();
    let mut state = booted(&dir, "default", &mut factory);
    let created = factory.created;

    assert!(matches!(
        state.switch_profile("default", &mut factory)?,
        ProfileSwitch::Unchanged
    ));
    let invalid = state.switch_profile("../escape", &mut factory);
    assert_eq!(
        invalid.err().map(|error| error.code),
        Some("profile.name_invalid")
    );
    assert_eq!(factory.created, created);
    assert_eq!(state.profile.name, "default");
    Ok(())
}

#[test]
fn profile_switch_asks_for_relaunch_when_nothing_builds() -> AppResult<()> {
    let dir = temp_dir()?;
    let mut factory = RecordingFactory::default();
    let mut state = booted(&dir, "default", &mut factory);
    factory.fail_labels = TargetId::ALL
        .iter()
        .map(|target| target.name().to_owned())
        .collect();

    match state.switch_profile("work", &mut factory)? {
        ProfileSwitch::RelaunchRequired { profile } => assert_eq!(profile, "work"),
        other => panic!("expected relaunch, got {other:?}"),
    }
    assert!(state.panes.is_placeholder());
    assert_eq!(relaunch_args("work"), vec!["--profile", "work"]);
    Ok(())
}

#[test]
fn navigation_events_reach_the_pane() -> AppResult<()> {
    let dir = temp_dir()?;
    let mut factory = RecordingFactory::default();
    let mut state = booted(&dir, "default", &mut factory);
    let Some(pane) = first_pane(&state) else {
        panic!("no panes built");
    };

    state.handle_event(
        ShellEvent::NavigationChanged {
            pane,
            url: "https://chatgpt.com/c/abc".to_owned(),
        },
        Instant::now(),
        &mut factory,
    );
    assert_eq!(
        state.panes.pane(pane).map(|pane| pane.address().to_owned()),
        Some("https://chatgpt.com/c/abc".to_owned())
    );
    Ok(())
}

#[test]
fn sign_in_popup_closes_after_callback() -> AppResult<()> {
    let dir = temp_dir()?;
    let mut factory = RecordingFactory::default();
    let mut state = booted(&dir, "default", &mut factory);
    let popup = state.open_google_sign_in(&mut factory)?;
    let now = Instant::now();

    state.handle_event(
        ShellEvent::PopupNavigated {
            popup,
            url: "https://claude.ai/auth/callback?code=1".to_owned(),
        },
        now,
        &mut factory,
    );
    assert!(state.due_timer_events(now).is_empty());

    let due = state.due_timer_events(now + AUTO_CLOSE_DELAY + Duration::from_millis(1));
    assert_eq!(due, vec![ShellEvent::AutoCloseTimerFired { popup }]);
    for event in due {
        state.handle_event(event, now, &mut factory);
    }
    assert!(state.popups.is_empty());
    Ok(())
}

#[test]
fn selected_text_opens_a_search_window() -> AppResult<()> {
    let dir = temp_dir()?;
    let mut factory = RecordingFactory::default();
    let mut state = booted(&dir, "default", &mut factory);
    let Some(pane) = first_pane(&state) else {
        panic!("no panes built");
    };

    state.search_selection(pane)?;
    assert_eq!(
        state
            .panes
            .pane(pane)
            .map(|pane| pane.surface().count(&SurfaceCommand::CaptureSelection)),
        Some(1)
    );

    state.handle_event(
        ShellEvent::SelectionCaptured {
            pane,
            text: "   ".to_owned(),
        },
        Instant::now(),
        &mut factory,
    );
    assert!(state.popups.is_empty());

    state.handle_event(
        ShellEvent::SelectionCaptured {
            pane,
            text: "rust borrow checker".to_owned(),
        },
        Instant::now(),
        &mut factory,
    );
    let urls: Vec<&str> = state
        .popups
        .popups()
        .map(|popup| popup.surface().initial_url.as_str())
        .collect();
    assert_eq!(urls, vec!["https://www.google.com/search?q=rust+borrow+checker"]);
    Ok(())
}

#[test]
fn search_url_encodes_the_query() {
    assert_eq!(
        google_search_url("  a&b=c ?  ").as_deref(),
        Some("https://www.google.com/search?q=a%26b%3Dc+%3F")
    );
    assert_eq!(
        google_search_url("naïve").as_deref(),
        Some("https://www.google.com/search?q=na%C3%AFve")
    );
    assert_eq!(google_search_url("\n\t "), None);
}

#[test]
fn manual_mode_and_layout_toggles() -> AppResult<()> {
    let dir = temp_dir()?;
    let mut factory = RecordingFactory::default();
    let mut state = booted(&dir, "default", &mut factory);

    assert_eq!(state.toggle_layout(), LayoutMode::Grid);
    assert_eq!(state.toggle_layout(), LayoutMode::Row);
    assert_eq!(factory.created, TargetId::ALL.len() as u64);

    assert!(state.toggle_manual_mode());
    assert_eq!(state.send_prompt("hi"), BroadcastOutcome::Suppressed);
    assert!(!state.toggle_manual_mode());
    assert!(state.send_prompt("hi").consumed_prompt());
    assert_eq!(state.refresh_all(), TargetId::ALL.len());
    assert!(
        state
            .panes
            .panes()
            .all(|pane| pane.surface().count(&SurfaceCommand::Reload) == 1)
    );
    Ok(())
}

#[test]
fn selection_draft_requires_one_target() {
    let mut draft = SelectionDraft::from_selection(&TargetSelection::default());
    assert!(draft.checked.iter().all(|(_, checked)| *checked));

    draft.set_all(false);
    assert_eq!(draft.confirm(), None);
    assert_eq!(draft.warning, Some(EMPTY_SELECTION_WARNING));

    draft.checked[1].1 = true;
    assert_eq!(draft.confirm(), Some(vec![TargetId::Claude]));
    assert_eq!(draft.warning, None);
}

#[test]
fn downloads_land_in_downloads_dir() {
    let dir = Path::new("/home/user/Downloads");
    assert_eq!(
        download_destination(Some(dir), "https://x.test/a/report.pdf", Path::new("")),
        Some(dir.join("report.pdf"))
    );
    assert_eq!(
        download_destination(Some(dir), "https://x.test/a", Path::new("/tmp/suggested.csv")),
        Some(dir.join("suggested.csv"))
    );
    assert_eq!(
        download_destination(Some(dir), "https://x.test/", Path::new("")),
        Some(dir.join("download"))
    );
    assert_eq!(
        download_destination(None, "https://x.test/a.pdf", &PathBuf::new()),
        None
    );
}

#[test]
fn downloads_never_overwrite_existing_files() -> AppResult<()> {
    let dir = temp_dir()?;
    let write = |name: &str| {
        fs::write(dir.path().join(name), b"old")
            .map_err(|error| AppError::new("test.write", error.to_string()))
    };
    write("report.pdf")?;
    write("notes")?;

    assert_eq!(
        download_destination(Some(dir.path()), "https://x.test/report.pdf", Path::new("")),
        Some(dir.path().join("report (1).pdf"))
    );
    write("report (1).pdf")?;
    assert_eq!(
        download_destination(Some(dir.path()), "https://x.test/report.pdf", Path::new("")),
        Some(dir.path().join("report (2).pdf"))
    );
    assert_eq!(
        download_destination(Some(dir.path()), "https://x.test/notes", Path::new("")),
        Some(dir.path().join("notes (1)"))
    );
    assert_eq!(
        download_destination(Some(dir.path()), "https://x.test/fresh.txt", Path::new("")),
        Some(dir.path().join("fresh.txt"))
    );
    Ok(())
}

#[test]
fn engine_callbacks_map_to_events() {
    assert_eq!(
        navigation_event(SurfaceRole::Pane(PaneId(3)), "https://a.test/".to_owned()),
        ShellEvent::NavigationChanged {
            pane: PaneId(3),
            url: "https://a.test/".to_owned(),
        }
    );
    assert_eq!(
        navigation_event(SurfaceRole::Popup(PopupId(9)), "https://b.test/".to_owned()),
        ShellEvent::PopupNavigated {
            popup: PopupId(9),
            url: "https://b.test/".to_owned(),
        }
    );
}

#[test]
fn history_messages_map_to_navigation_events() {
    assert_eq!(
        ipc_event(
            SurfaceRole::Pane(PaneId(2)),
            "navigated:https://chatgpt.com/c/abc"
        ),
        Some(ShellEvent::NavigationChanged {
            pane: PaneId(2),
            url: "https://chatgpt.com/c/abc".to_owned(),
        })
    );
    assert_eq!(
        ipc_event(
            SurfaceRole::Popup(PopupId(5)),
            "navigated:https://claude.ai/auth/callback"
        ),
        Some(ShellEvent::PopupNavigated {
            popup: PopupId(5),
            url: "https://claude.ai/auth/callback".to_owned(),
        })
    );
    assert_eq!(ipc_event(SurfaceRole::Pane(PaneId(2)), "navigated:"), None);
    assert_eq!(ipc_event(SurfaceRole::Pane(PaneId(2)), "hello"), None);
}

#[test]
fn selection_results_are_json_decoded() {
    assert_eq!(
        selection_event(PaneId(1), r#""line one\nsaid \"hi\"""#),
        ShellEvent::SelectionCaptured {
            pane: PaneId(1),
            text: "line one\nsaid \"hi\"".to_owned(),
        }
    );
    assert_eq!(
        selection_event(PaneId(1), "null"),
        ShellEvent::SelectionCaptured {
            pane: PaneId(1),
            text: String::new(),
        }
    );
}

#[cfg(target_os = "linux")]
#[test]
fn linux_keeps_polling_the_native_toolkit() {
    assert_eq!(platform_poll_interval(), Some(Duration::from_millis(16)));
}

#[cfg(not(target_os = "linux"))]
#[test]
fn other_platforms_repaint_on_demand() {
    assert_eq!(platform_poll_interval(), None);
}

#[test]
fn rect_conversion_round_trips_whole_pixels() {
    let rect = SurfaceRect::new(12, 80, 640, 360);
    assert_eq!(surface_rect(egui_rect(rect)), rect);
    assert_eq!(window_title("work"), "Multi Vibe Chat - Profile: work");
}
