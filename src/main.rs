mod app;
mod devices;
mod error;
mod gui;
mod launcher;
mod settings;
mod templates;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::LauncherApp;
use crate::gui::EframeGui;
use crate::settings::SettingsStore;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let store = SettingsStore::default();
    info!(settings = %store.path().display(), "starting Isaac Sim launcher");

    let app = Box::new(LauncherApp::new(store));
    EframeGui::run(app)
}
