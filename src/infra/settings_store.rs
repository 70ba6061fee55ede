use crate::domain::{PrivateKey, Project, PublicKey, Settings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

const APP_DIR: &str = "trader-tui";
const SETTINGS_FILE: &str = "settings.json";

pub fn default_settings_path() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join(APP_DIR).join(SETTINGS_FILE),
        None => PathBuf::from(SETTINGS_FILE),
    }
}

#[derive(Debug, Error)]
pub enum LoadSettingsError {
    #[error("failed to read settings: {0}")]
    Read(#[from] io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid {field} in settings file: {message}")]
    Field {
        field: &'static str,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum SaveSettingsError {
    #[error("failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write settings: {0}")]
    Write(#[from] io::Error),
}

pub fn load_settings(path: &Path) -> Result<Settings, LoadSettingsError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Ok(Settings::default());
        }
        Err(error) => return Err(error.into()),
    };

    let file: SettingsFile = serde_json::from_str(&raw)?;
    file.into_settings()
}

/// Loads settings, falling back to empty settings (and a log line) on any failure.
pub fn load_settings_or_default(path: &Path) -> Settings {
    match load_settings(path) {
        Ok(settings) => settings,
        Err(error) => {
            warn!(path = %path.display(), %error, "could not load settings");
            Settings::default()
        }
    }
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), SaveSettingsError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    let text = serde_json::to_string_pretty(&SettingsFile::from_settings(settings))?;
    fs::write(&tmp, text)?;
    fs::rename(tmp, path)?;
    Ok(())
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    auth_header: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    private_key: String,
    #[serde(default)]
    public_key: String,
    #[serde(default)]
    open_orders_address: String,
    #[serde(default)]
    project: String,
}

impl SettingsFile {
    fn from_settings(settings: &Settings) -> Self {
        Self {
            auth_header: settings.auth_header.clone(),
            private_key: settings
                .private_key
                .as_ref()
                .map(PrivateKey::to_base58)
                .unwrap_or_default(),
            public_key: settings
                .public_key
                .map(|key| key.to_base58())
                .unwrap_or_default(),
            open_orders_address: settings
                .open_orders_address
                .map(|key| key.to_base58())
                .unwrap_or_default(),
            project: if settings.project.is_unknown() {
                String::new()
            } else {
                settings.project.to_string()
            },
        }
    }

    fn into_settings(self) -> Result<Settings, LoadSettingsError> {
        Ok(Settings {
            auth_header: self.auth_header,
            private_key: optional_key(&self.private_key, "privateKey", PrivateKey::from_base58)?,
            public_key: optional_key(&self.public_key, "publicKey", PublicKey::from_base58)?,
            open_orders_address: optional_key(
                &self.open_orders_address,
                "openOrdersAddress",
                PublicKey::from_base58,
            )?,
            project: if self.project.is_empty() {
                Project::Unknown
            } else {
                Project::parse(&self.project).ok_or_else(|| LoadSettingsError::Field {
                    field: "project",
                    message: format!("unknown value {:?}", self.project),
                })?
            },
        })
    }
}

fn optional_key<T, E: std::fmt::Display>(
    raw: &str,
    field: &'static str,
    parse: impl Fn(&str) -> Result<T, E>,
) -> Result<Option<T>, LoadSettingsError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse(raw)
        .map(Some)
        .map_err(|error| LoadSettingsError::Field {
            field,
            message: error.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::valid_input;
    use crate::domain::validate_settings;

    #[test]
    fn missing_file_yields_empty_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = load_settings(&dir.path().join("absent.json")).expect("load");
        assert!(settings.needs_init());
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("settings.json");
        let settings = validate_settings(&valid_input()).expect("valid");

        save_settings(&path, &settings).expect("save");
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = load_settings(&path).expect("load");
        assert_eq!(loaded, settings);
    }

    #[test]
    fn file_uses_camel_case_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        let settings = validate_settings(&valid_input()).expect("valid");
        save_settings(&path, &settings).expect("save");

        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.contains("\"authHeader\""));
        assert!(raw.contains("\"openOrdersAddress\""));
        assert!(raw.contains("\"P_SERUM\""));
    }

    #[test]
    fn malformed_file_falls_back_to_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"authHeader":"x","publicKey":"bad!"}"#).expect("write");

        assert!(matches!(
            load_settings(&path),
            Err(LoadSettingsError::Field {
                field: "publicKey",
                ..
            })
        ));
        assert_eq!(load_settings_or_default(&path), Settings::default());
    }
}
