use mv_core::AppError;
use mv_core::AppResult;
use std::path::Path;
use std::process::Command;
use std::process::Stdio;
use std::time::Duration;
use tracing::info;

/// How often the UI wakes up to drive GTK while the window is otherwise idle.
#[cfg(target_os = "linux")]
const PLATFORM_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Arguments that reopen the application on `profile`.
pub(super) fn relaunch_args(profile: &str) -> Vec<String> {
    vec!["--profile".to_owned(), profile.to_owned()]
}

/// Starts a fresh instance of this executable on `profile`.
///
/// The caller closes the current window once this succeeds.
pub(super) fn relaunch_with_profile(profile: &str) -> AppResult<()> {
    let executable = std::env::current_exe().map_err(|error| {
        AppError::new(
            "shell.relaunch.executable_missing",
            format!("failed to determine the running executable: {error}"),
        )
    })?;
    spawn_detached(&executable, &relaunch_args(profile))?;
    info!(profile, executable = %executable.display(), "relaunched on new profile");
    Ok(())
}

fn spawn_detached(executable: &Path, args: &[String]) -> AppResult<()> {
    if executable.as_os_str().is_empty() {
        return Err(AppError::new(
            "shell.relaunch.executable_missing",
            "executable path is empty",
        ));
    }

    Command::new(executable)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(drop)
        .map_err(|error| {
            AppError::new(
                "shell.relaunch.spawn_failed",
                format!("failed to spawn `{}`: {error}", executable.display()),
            )
        })
}

/// Initializes the native toolkit the webviews live on.
#[cfg(target_os = "linux")]
pub(super) fn init_platform() -> AppResult<()> {
    gtk::init().map_err(|error| {
        AppError::new(
            "shell.platform.gtk_init_failed",
            format!("failed to initialize GTK: {error}"),
        )
    })
}

#[cfg(not(target_os = "linux"))]
pub(super) fn init_platform() -> AppResult<()> {
    Ok(())
}

/// Lets GTK process pending webview work; winit does not drive its main loop.
#[cfg(target_os = "linux")]
pub(super) fn pump_platform_events() {
    while gtk::events_pending() {
        gtk::main_iteration_do(false);
    }
}

#[cfg(not(target_os = "linux"))]
pub(super) fn pump_platform_events() {}

/// Repaint interval that keeps [`pump_platform_events`] running without input.
///
/// Webview input and load events on Linux only reach the GTK main loop, which
/// never wakes the egui event loop on its own.
#[cfg(target_os = "linux")]
pub(super) fn platform_poll_interval() -> Option<Duration> {
    Some(PLATFORM_POLL_INTERVAL)
}

#[cfg(not(target_os = "linux"))]
pub(super) fn platform_poll_interval() -> Option<Duration> {
    None
}
