//! Persistent browsing profiles and the small JSON config document.
//!
//! Every profile owns one storage directory under the application-data root,
//! named `.multi_vibe_chat_profile_<name>`. A pre-profile installation kept a
//! single `.multi_ai_browser_profile` directory; it becomes the `default`
//! profile the first time it is seen.

mod config;

pub use config::ConfigDocument;
pub use config::ConfigUpdate;

use mv_core::AppError;
use mv_core::AppResult;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::info;
use tracing::warn;
use walkdir::WalkDir;

pub const DEFAULT_PROFILE: &str = "default";
pub const DATA_DIR_ENV: &str = "MULTIVIBE_DATA_DIR";

const APP_DATA_DIR_NAME: &str = ".MultiVibeChat";
const PROFILE_DIR_PREFIX: &str = ".multi_vibe_chat_profile_";
const LEGACY_PROFILE_DIR: &str = ".multi_ai_browser_profile";
const CONFIG_FILE_NAME: &str = ".multi_vibe_chat_config.json";
const LOG_FILE_NAME: &str = "debug.log";

/// One isolated persistent browsing identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub storage_path: PathBuf,
    pub is_default: bool,
}

/// Resolves profiles and the config document under one data root.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Store rooted at `$MULTIVIBE_DATA_DIR`, or `~/.MultiVibeChat`.
    pub fn from_env() -> Self {
        Self::new(default_app_data_root())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join(LOG_FILE_NAME)
    }

    pub fn resolve_storage_path(&self, profile_name: &str) -> PathBuf {
        self.root.join(format!("{PROFILE_DIR_PREFIX}{profile_name}"))
    }

    pub fn profile(&self, profile_name: &str) -> Profile {
        Profile {
            name: profile_name.to_owned(),
            storage_path: self.resolve_storage_path(profile_name),
            is_default: profile_name == DEFAULT_PROFILE,
        }
    }

    /// Prepares on-disk storage for `profile_name`.
    ///
    /// Migrates the legacy layout into `default` and seeds a new profile with a
    /// one-time copy of `default`. Every filesystem failure is logged and
    /// swallowed; the engine then starts that profile from an empty store.
    pub fn ensure_profile_materialized(&self, profile_name: &str) -> Profile {
        if let Err(error) = fs::create_dir_all(&self.root) {
            warn!(
                root = %self.root.display(),
                %error,
                "failed to create application data root"
            );
        }

        if let Err(error) = self.migrate_legacy_profile() {
            warn!(%error, "legacy profile migration failed");
        }

        let profile = self.profile(profile_name);
        if !profile.is_default && !profile.storage_path.exists() {
            let default_path = self.resolve_storage_path(DEFAULT_PROFILE);
            if default_path.exists() {
                match copy_dir_recursive(&default_path, &profile.storage_path) {
                    Ok(files) => info!(
                        profile = profile_name,
                        files, "seeded new profile from default"
                    ),
                    Err(error) => warn!(profile = profile_name, %error, "profile cloning failed"),
                }
            } else {
                debug!(
                    profile = profile_name,
                    "no default profile to clone; engine will create an empty store"
                );
            }
        }

        profile
    }

    /// Sorted names of every profile directory under the root.
    pub fn list_existing_profiles(&self) -> Vec<String> {
        let mut profiles = Vec::new();
        if let Ok(entries) = fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                if !entry.path().is_dir() {
                    continue;
                }
                let file_name = entry.file_name();
                let Some(file_name) = file_name.to_str() else {
                    continue;
                };
                if let Some(name) = file_name.strip_prefix(PROFILE_DIR_PREFIX) {
                    if !name.is_empty() {
                        profiles.push(name.to_owned());
                    }
                }
            }
        }

        if profiles.is_empty() {
            return vec![DEFAULT_PROFILE.to_owned()];
        }
        profiles.sort();
        profiles
    }

    fn migrate_legacy_profile(&self) -> AppResult<()> {
        let legacy_path = self.root.join(LEGACY_PROFILE_DIR);
        let default_path = self.resolve_storage_path(DEFAULT_PROFILE);
        if default_path.exists() || !legacy_path.exists() {
            return Ok(());
        }

        fs::rename(&legacy_path, &default_path).map_err(|error| {
            AppError::new(
                "profile.migration_failed",
                format!(
                    "failed to rename `{}` to `{}`: {error}",
                    legacy_path.display(),
                    default_path.display()
                ),
            )
        })?;
        info!(path = %default_path.display(), "migrated legacy profile to default");
        Ok(())
    }
}

/// Rejects names that cannot serve as a single directory-name suffix.
pub fn validate_profile_name(name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::new(
            "profile.name_empty",
            "profile name must not be empty",
        ));
    }

    if name != name.trim() {
        return Err(AppError::new(
            "profile.name_invalid",
            format!("profile name `{name}` has surrounding whitespace"),
        ));
    }

    let forbidden = |ch: char| matches!(ch, '/' | '\\' | ':' | '\0') || ch.is_control();
    if name.chars().any(forbidden) || name.starts_with('.') || name.contains("..") {
        return Err(AppError::new(
            "profile.name_invalid",
            format!("profile name `{name}` is not a valid directory name"),
        ));
    }

    Ok(())
}

/// Picks the startup profile: CLI flag, then the last used one, then `default`.
pub fn resolve_startup_profile(cli_profile: Option<&str>, config: &ConfigDocument) -> String {
    if let Some(name) = cli_profile.map(str::trim) {
        match validate_profile_name(name) {
            Ok(()) => return name.to_owned(),
            Err(error) => warn!(%error, "ignoring --profile value"),
        }
    }

    config
        .last_profile
        .as_deref()
        .filter(|name| validate_profile_name(name).is_ok())
        .unwrap_or(DEFAULT_PROFILE)
        .to_owned()
}

fn default_app_data_root() -> PathBuf {
    if let Some(override_root) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(override_root);
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DATA_DIR_NAME)
}

fn copy_dir_recursive(source: &Path, destination: &Path) -> AppResult<usize> {
    let mut copied = 0_usize;
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(|error| {
            AppError::new(
                "profile.copy_walk_failed",
                format!("failed walking `{}`: {error}", source.display()),
            )
        })?;

        let relative = entry.path().strip_prefix(source).map_err(|error| {
            AppError::new(
                "profile.copy_walk_failed",
                format!("unexpected path `{}`: {error}", entry.path().display()),
            )
        })?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|error| {
                AppError::new(
                    "profile.copy_failed",
                    format!("failed to create `{}`: {error}", target.display()),
                )
            })?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target).map_err(|error| {
                AppError::new(
                    "profile.copy_failed",
                    format!(
                        "failed to copy `{}` to `{}`: {error}",
                        entry.path().display(),
                        target.display()
                    ),
                )
            })?;
            copied += 1;
        }
    }

    Ok(copied)
}
