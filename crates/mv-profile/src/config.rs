//! `{"last_profile": ..., "enabled_ais": [...]}` persisted next to the profiles.

use crate::ProfileStore;
use mv_core::AppError;
use mv_core::AppResult;
use mv_targets::TargetId;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;
use tracing::warn;

const KEY_LAST_PROFILE: &str = "last_profile";
const KEY_ENABLED_TARGETS: &str = "enabled_ais";

/// Saved state as seen by the application after load-time filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    pub last_profile: Option<String>,
    /// Registry-known targets only, in saved order. `None` when nothing was saved.
    pub enabled_targets: Option<Vec<TargetId>>,
}

/// Keys to overwrite on save. `None` leaves the stored value as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub last_profile: Option<String>,
    pub enabled_targets: Option<Vec<TargetId>>,
}

impl ConfigUpdate {
    pub fn last_profile(name: impl Into<String>) -> Self {
        Self {
            last_profile: Some(name.into()),
            enabled_targets: None,
        }
    }

    pub fn enabled_targets(targets: &[TargetId]) -> Self {
        Self {
            last_profile: None,
            enabled_targets: Some(targets.to_vec()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct StoredConfig {
    #[serde(default)]
    last_profile: Option<String>,
    #[serde(default)]
    enabled_ais: Option<Vec<String>>,
}

impl StoredConfig {
    fn into_document(self) -> ConfigDocument {
        let enabled_targets = self.enabled_ais.map(|names| {
            names
                .iter()
                .filter_map(|name| {
                    let target = TargetId::from_name(name);
                    if target.is_none() {
                        debug!(name = name.as_str(), "dropping unknown saved target");
                    }
                    target
                })
                .collect::<Vec<_>>()
        });

        ConfigDocument {
            last_profile: self.last_profile,
            enabled_targets,
        }
    }
}

impl ProfileStore {
    /// Missing or unreadable config yields the empty document.
    pub fn load_config(&self) -> ConfigDocument {
        let path = self.config_path();
        if !path.exists() {
            return ConfigDocument::default();
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to read config; using defaults");
                return ConfigDocument::default();
            }
        };

        match serde_json::from_str::<StoredConfig>(&content) {
            Ok(stored) => stored.into_document(),
            Err(error) => {
                warn!(path = %path.display(), %error, "config is corrupt; using defaults");
                ConfigDocument::default()
            }
        }
    }

    /// Read-merge-write: keys not named in `update` survive untouched.
    pub fn save_config(&self, update: ConfigUpdate) -> AppResult<()> {
        let path = self.config_path();
        let mut document = read_json_object(&path);

        if let Some(last_profile) = update.last_profile {
            document.insert(KEY_LAST_PROFILE.to_owned(), Value::String(last_profile));
        }
        if let Some(targets) = update.enabled_targets {
            let names = targets
                .iter()
                .map(|target| Value::String(target.name().to_owned()))
                .collect();
            document.insert(KEY_ENABLED_TARGETS.to_owned(), Value::Array(names));
        }

        let encoded = serde_json::to_string(&Value::Object(document)).map_err(|error| {
            AppError::new(
                "profile.config_encode_failed",
                format!("failed to encode config: {error}"),
            )
        })?;
        write_atomically(&path, &encoded)
    }
}

fn read_json_object(path: &Path) -> Map<String, Value> {
    let Ok(content) = fs::read_to_string(path) else {
        return Map::new();
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            warn!(path = %path.display(), "discarding unreadable config before write");
            Map::new()
        }
    }
}

fn write_atomically(path: &Path, content: &str) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| {
            AppError::new(
                "profile.config_dir_create_failed",
                format!(
                    "failed to create config directory `{}`: {error}",
                    parent.display()
                ),
            )
        })?;
    }

    let staging = path.with_extension("json.tmp");
    fs::write(&staging, content).map_err(|error| {
        AppError::new(
            "profile.config_write_failed",
            format!("failed to write `{}`: {error}", staging.display()),
        )
    })?;

    fs::rename(&staging, path).map_err(|error| {
        AppError::new(
            "profile.config_write_failed",
            format!(
                "failed to move `{}` into place: {error}",
                staging.display()
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::ConfigDocument;
    use super::ConfigUpdate;
    use crate::ProfileStore;
    use mv_targets::TargetId;
    use std::fs;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, ProfileStore) {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let store = ProfileStore::new(dir.path().to_path_buf());
        (dir, store)
    }

    #[test]
    fn missing_file_loads_as_empty_document() {
        let (_dir, store) = temp_store();
        assert_eq!(store.load_config(), ConfigDocument::default());
    }

    #[test]
    fn corrupt_file_loads_as_empty_document() {
        let (_dir, store) = temp_store();
        assert!(fs::write(store.config_path(), "{not json").is_ok());
        assert_eq!(store.load_config(), ConfigDocument::default());
    }

    #[test]
    fn saved_values_round_trip() {
        let (_dir, store) = temp_store();
        let saved = store.save_config(ConfigUpdate {
            last_profile: Some("work".to_owned()),
            enabled_targets: Some(vec![TargetId::Claude, TargetId::ChatGpt]),
        });
        assert!(saved.is_ok());

        let loaded = store.load_config();
        assert_eq!(loaded.last_profile.as_deref(), Some("work"));
        assert_eq!(
            loaded.enabled_targets,
            Some(vec![TargetId::Claude, TargetId::ChatGpt])
        );
    }

    #[test]
    fn unknown_target_names_are_dropped_on_load() {
        let (_dir, store) = temp_store();
        let raw = r#"{"last_profile":"default","enabled_ais":["Grok","Bard","ChatGPT"]}"#;
        assert!(fs::write(store.config_path(), raw).is_ok());

        let loaded = store.load_config();
        assert_eq!(
            loaded.enabled_targets,
            Some(vec![TargetId::Grok, TargetId::ChatGpt])
        );
    }

    #[test]
    fn partial_save_preserves_other_keys() {
        let (_dir, store) = temp_store();
        let raw = r#"{"enabled_ais":["Claude"],"window":{"width":1600}}"#;
        assert!(fs::write(store.config_path(), raw).is_ok());

        assert!(store.save_config(ConfigUpdate::last_profile("work")).is_ok());

        let content = fs::read_to_string(store.config_path()).unwrap_or_default();
        let value: serde_json::Value =
            serde_json::from_str(&content).unwrap_or(serde_json::Value::Null);
        assert_eq!(value["last_profile"], "work");
        assert_eq!(value["enabled_ais"][0], "Claude");
        assert_eq!(value["window"]["width"], 1600);
        assert!(!store.config_path().with_extension("json.tmp").exists());
    }

    #[test]
    fn save_recovers_from_corrupt_file() {
        let (_dir, store) = temp_store();
        assert!(fs::write(store.config_path(), "[1, 2").is_ok());
        assert!(
            store
                .save_config(ConfigUpdate::enabled_targets(&[TargetId::Grok]))
                .is_ok()
        );
        assert_eq!(
            store.load_config().enabled_targets,
            Some(vec![TargetId::Grok])
        );
    }
}
