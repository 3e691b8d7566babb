use tracing::{info, warn};
use crate::devices::{is_launch_capable, list_devices_for, save_preferred_device};
use crate::error::Result;
use crate::gui::AppInterface;
use crate::launcher::{LaunchReport, Launcher};
use crate::settings::{Settings, SettingsForm, SettingsStore};
use crate::templates::TemplateResolver;

/// State behind the launcher window.
pub struct LauncherApp {
    store: SettingsStore,
    settings: Settings,
    resolver: TemplateResolver,
    launcher: Launcher,
    devices: Vec<String>,
    templates: Vec<String>,
    selected_device: String,
    selected_template: String,
}

impl LauncherApp {
    pub fn new(store: SettingsStore) -> Self {
        let settings = store.load();
        let devices = list_devices_for(&settings);
        Self::with_devices(store, settings, devices)
    }

    /// `devices` is expected to already have the preferred device in front.
    pub fn with_devices(store: SettingsStore, settings: Settings, devices: Vec<String>) -> Self {
        let mut resolver = TemplateResolver::for_settings(&settings);
        let templates = resolver.list_display_names();
        let selected_device = devices.first().cloned().unwrap_or_default();
        let selected_template = templates.first().cloned().unwrap_or_default();
        Self {
            store,
            settings,
            resolver,
            launcher: Launcher::default(),
            devices,
            templates,
            selected_device,
            selected_template,
        }
    }

    #[cfg(test)]
    pub fn set_launcher(&mut self, launcher: Launcher) {
        self.launcher = launcher;
    }

    fn refresh_templates(&mut self) {
        self.resolver = TemplateResolver::for_settings(&self.settings);
        self.templates = self.resolver.list_display_names();
        if !self.templates.contains(&self.selected_template) {
            self.selected_template = self.templates.first().cloned().unwrap_or_default();
        }
    }
}

impl AppInterface for LauncherApp {
    fn devices(&self) -> &[String] {
        &self.devices
    }

    fn templates(&self) -> &[String] {
        &self.templates
    }

    fn selected_device(&self) -> &str {
        &self.selected_device
    }

    fn select_device(&mut self, device: &str) {
        if device == self.selected_device {
            return;
        }
        self.selected_device = device.to_string();
        self.settings.preferred_device = Some(device.to_string());
        if let Err(e) = save_preferred_device(&self.store, device) {
            warn!(error = %e, "could not save GPU selection");
        }
    }

    fn selected_template(&self) -> &str {
        &self.selected_template
    }

    fn select_template(&mut self, template: &str) {
        self.selected_template = template.to_string();
    }

    fn can_launch(&self) -> bool {
        is_launch_capable(&self.selected_device)
    }

    fn launch(&mut self) -> Result<LaunchReport> {
        self.launcher.launch(
            &self.store,
            &mut self.resolver,
            &self.selected_device,
            &self.selected_template,
        )
    }

    fn settings_form(&self) -> SettingsForm {
        SettingsForm::from_settings(&self.settings)
    }

    fn apply_settings(&mut self, form: &SettingsForm) -> Result<()> {
        // Start from disk so a preference saved elsewhere is not clobbered.
        let mut settings = self.store.load();
        form.apply(&mut settings);
        self.store.save(&settings)?;
        info!(install_path = %settings.install_path.display(), logging = settings.logging_enabled, "settings saved");
        self.settings = settings;
        self.refresh_templates();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;
    use crate::templates::{templates_dir, LAUNCHER_EXTENSION};

    fn app_in(dir: &Path, install_path: PathBuf, devices: &[&str]) -> LauncherApp {
        let store = SettingsStore::new(dir.join("settings.json"));
        let settings = Settings {
            install_path,
            logging_enabled: false,
            preferred_device: None,
        };
        store.save(&settings).unwrap();
        let mut app = LauncherApp::with_devices(
            store,
            settings,
            devices.iter().map(|s| s.to_string()).collect(),
        );
        app.set_launcher(Launcher::with_log_path(dir.join("launch.log")));
        app
    }

    fn install(dir: &Path, stems: &[&str]) -> PathBuf {
        let root = dir.join("isaacsim");
        let release = templates_dir(&root);
        fs::create_dir_all(&release).unwrap();
        for stem in stems {
            fs::write(release.join(format!("{stem}.{LAUNCHER_EXTENSION}")), "").unwrap();
        }
        root
    }

    #[test]
    fn test_initial_selection() {
        let dir = tempdir().unwrap();
        let root = install(dir.path(), &["isaac-sim", "isaac-sim.streaming"]);
        let app = app_in(dir.path(), root, &["NVIDIA GeForce RTX 4090", "NVIDIA GeForce GTX 1080"]);
        assert_eq!(app.selected_device(), "NVIDIA GeForce RTX 4090");
        assert_eq!(app.templates(), ["Default", "Streaming"]);
        assert_eq!(app.selected_template(), "Default");
        assert!(app.can_launch());
    }

    #[test]
    fn test_non_rtx_device_blocks_launch() {
        let dir = tempdir().unwrap();
        let root = install(dir.path(), &["isaac-sim"]);
        let mut app = app_in(dir.path(), root, &["NVIDIA GeForce RTX 4090", "NVIDIA GeForce GTX 1080"]);
        app.select_device("NVIDIA GeForce GTX 1080");
        assert!(!app.can_launch());
    }

    #[test]
    fn test_select_device_persists_preference() {
        let dir = tempdir().unwrap();
        let root = install(dir.path(), &["isaac-sim"]);
        let mut app = app_in(dir.path(), root, &["A", "NVIDIA RTX A6000"]);
        app.select_device("NVIDIA RTX A6000");
        let saved = SettingsStore::new(dir.path().join("settings.json")).try_load().unwrap();
        assert_eq!(saved.preferred_device.as_deref(), Some("NVIDIA RTX A6000"));
    }

    #[test]
    fn test_apply_settings_rescans_new_install() {
        let dir = tempdir().unwrap();
        let mut app = app_in(dir.path(), dir.path().join("nowhere"), &["NVIDIA RTX A6000"]);
        assert_eq!(app.templates(), ["Default"]);

        let root = install(dir.path(), &["isaac-sim", "isaac-sim.xr.vr"]);
        let mut form = app.settings_form();
        form.install_path = root.display().to_string();
        form.logging_enabled = true;
        app.apply_settings(&form).unwrap();

        assert_eq!(app.templates(), ["Default", "XR VR"]);
        let saved = SettingsStore::new(dir.path().join("settings.json")).try_load().unwrap();
        assert_eq!(saved.install_path, root);
        assert!(saved.logging_enabled);
    }

    #[test]
    fn test_launch_reports_missing_install() {
        let dir = tempdir().unwrap();
        let mut app = app_in(dir.path(), dir.path().join("nowhere"), &["NVIDIA RTX A6000"]);
        let err = app.launch().unwrap_err();
        assert!(err.is_not_found());
    }
}
