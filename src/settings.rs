use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};
use tracing::{debug, warn};
use crate::error::Result;

pub const SETTINGS_FILE: &str = "settings.json";
pub const INSTALL_PATH_VAR: &str = "ISAAC_SIM_PATH";

#[cfg(windows)]
const FALLBACK_INSTALL_PATH: &str = r"C:\isaacsim";
#[cfg(not(windows))]
const FALLBACK_INSTALL_PATH: &str = "/opt/isaacsim";

/// Picks the install root from the environment value if one is set and non-empty.
pub fn default_install_path_from(var: Option<OsString>) -> PathBuf {
    var.filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(FALLBACK_INSTALL_PATH))
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "isaac_sim_path")]
    pub install_path: PathBuf,
    pub logging_enabled: bool,
    #[serde(rename = "preferred_gpu", skip_serializing_if = "Option::is_none")]
    pub preferred_device: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            install_path: default_install_path_from(env::var_os(INSTALL_PATH_VAR)),
            logging_enabled: false,
            preferred_device: None,
        }
    }
}

/// Owns the location of the settings file. Every save rewrites the whole record.
#[derive(Clone, Debug)]
pub struct SettingsStore {
    path: PathBuf,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(SETTINGS_FILE)
    }
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file, returning defaults when it does not exist.
    pub fn try_load(&self) -> Result<Settings> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no settings file, using defaults");
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Like [`try_load`](Self::try_load) but never fails: a broken file yields defaults.
    pub fn load(&self) -> Settings {
        self.try_load().unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "failed to read settings, using defaults");
            Settings::default()
        })
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        let content = serde_json::to_string_pretty(settings)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

/// Editable fields of the settings dialog.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SettingsForm {
    pub install_path: String,
    pub logging_enabled: bool,
}

impl SettingsForm {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            install_path: settings.install_path.display().to_string(),
            logging_enabled: settings.logging_enabled,
        }
    }

    /// Writes the form back. A blank path keeps the current install path.
    pub fn apply(&self, settings: &mut Settings) {
        let path = self.install_path.trim();
        if !path.is_empty() {
            settings.install_path = PathBuf::from(path);
        }
        settings.logging_enabled = self.logging_enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_install_path_prefers_env() {
        let path = default_install_path_from(Some(OsString::from("/data/isaacsim")));
        assert_eq!(path, PathBuf::from("/data/isaacsim"));
        assert_eq!(default_install_path_from(Some(OsString::new())), PathBuf::from(FALLBACK_INSTALL_PATH));
        assert_eq!(default_install_path_from(None), PathBuf::from(FALLBACK_INSTALL_PATH));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        let settings = store.try_load().unwrap();
        assert!(!settings.logging_enabled);
        assert_eq!(settings.preferred_device, None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("nested").join("settings.json"));
        let settings = Settings {
            install_path: PathBuf::from("/srv/isaacsim"),
            logging_enabled: true,
            preferred_device: Some("NVIDIA GeForce RTX 4090".into()),
        };
        store.save(&settings).unwrap();
        assert_eq!(store.try_load().unwrap(), settings);
    }

    #[test]
    fn test_reads_settings_json_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"isaac_sim_path": "/home/me/isaacsim", "logging_enabled": true, "preferred_gpu": "NVIDIA RTX A6000", "extra": 1}"#,
        )
        .unwrap();
        let settings = SettingsStore::new(&path).try_load().unwrap();
        assert_eq!(settings.install_path, PathBuf::from("/home/me/isaacsim"));
        assert!(settings.logging_enabled);
        assert_eq!(settings.preferred_device.as_deref(), Some("NVIDIA RTX A6000"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"logging_enabled": true}"#).unwrap();
        let settings = SettingsStore::new(&path).try_load().unwrap();
        assert!(settings.logging_enabled);
        assert_eq!(settings.preferred_device, None);
    }

    #[test]
    fn test_save_omits_absent_preferred_device() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        store.save(&Settings { preferred_device: None, ..Settings::default() }).unwrap();
        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("isaac_sim_path"));
        assert!(!raw.contains("preferred_gpu"));
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        let store = SettingsStore::new(&path);
        assert!(store.try_load().is_err());
        assert!(!store.load().logging_enabled);
    }

    #[test]
    fn test_form_round_trip_and_blank_path() {
        let mut settings = Settings {
            install_path: PathBuf::from("/a"),
            logging_enabled: false,
            preferred_device: Some("GPU".into()),
        };
        let mut form = SettingsForm::from_settings(&settings);
        assert_eq!(form.install_path, "/a");

        form.install_path = "  /b ".into();
        form.logging_enabled = true;
        form.apply(&mut settings);
        assert_eq!(settings.install_path, PathBuf::from("/b"));
        assert!(settings.logging_enabled);
        assert_eq!(settings.preferred_device.as_deref(), Some("GPU"));

        form.install_path = "   ".into();
        form.apply(&mut settings);
        assert_eq!(settings.install_path, PathBuf::from("/b"));
    }
}
