use clap::Parser;
use eframe::egui;
use mv_core::AppError;
use mv_core::AppResult;
use mv_profile::ProfileStore;
use mv_profile::resolve_startup_profile;
use std::path::Path;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::APP_NAME;
use super::LOG_FILTER_ENV;
use super::MIN_WINDOW_SIZE;
use super::WINDOW_SIZE;
use super::runtime;
use super::state::window_title;
use super::ui::ShellApp;

/// Side-by-side AI chat windows with one shared prompt box.
#[derive(Debug, Parser)]
#[command(name = "multivibe-chat", version, about)]
pub(crate) struct StartupArgs {
    /// Profile to open; defaults to the last one used.
    #[arg(long, value_name = "NAME")]
    pub(crate) profile: Option<String>,
}

pub(crate) fn run(args: StartupArgs) -> Result<(), eframe::Error> {
    let store = ProfileStore::from_env();
    if let Err(error) = init_file_logging(&store.log_path()) {
        eprintln!("{APP_NAME}: logging disabled: {error}");
    }

    let config = store.load_config();
    let profile = resolve_startup_profile(args.profile.as_deref(), &config);
    info!(profile = %profile, root = %store.root().display(), "starting");

    if let Err(error) = runtime::init_platform() {
        error!(%error, "native toolkit unavailable; webviews will fail to build");
    }

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(window_title(&profile))
            .with_inner_size(WINDOW_SIZE)
            .with_min_inner_size(MIN_WINDOW_SIZE),
        ..Default::default()
    };

    let result = eframe::run_native(
        APP_NAME,
        native_options,
        Box::new(move |cc| Ok(Box::new(ShellApp::new(cc, store, &profile)))),
    );
    if let Err(error) = &result {
        error!(%error, "event loop exited with an error");
    }
    result
}

/// Appends plain-text logs to `log_path`.
///
/// The filter comes from `MULTIVIBE_LOG`, then `RUST_LOG`, then `info`.
fn init_file_logging(log_path: &Path) -> AppResult<()> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|error| {
                AppError::new(
                    "shell.logging.dir_failed",
                    format!(
                        "failed to create log directory '{}': {error}",
                        parent.display()
                    ),
                )
            })?;
        }
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|error| {
            AppError::new(
                "shell.logging.open_failed",
                format!("failed to open log file '{}': {error}", log_path.display()),
            )
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .try_init()
        .map_err(|error| {
            AppError::new(
                "shell.logging.init_failed",
                format!("failed to install log subscriber: {error}"),
            )
        })
}

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
