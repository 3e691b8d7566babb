//! Discovery of Isaac Sim "kit template" launcher scripts.
//!
//! A release build ships one script per experience, e.g. `isaac-sim.bat`,
//! `isaac-sim.streaming.bat`, `isaac-sim.xr.vr.bat`. Each script gets a
//! readable label for the UI, and the resolver keeps a label -> script map
//! that is rebuilt from disk whenever it is empty or a lookup misses.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use crate::error::{LauncherError, Result};
use crate::settings::Settings;

pub const ROOT_TOKEN: &str = "isaac-sim";
pub const DEFAULT_TEMPLATE: &str = "Default";

#[cfg(windows)]
pub const PLATFORM_DIR: &str = "windows-x86_64";
#[cfg(windows)]
pub const LAUNCHER_EXTENSION: &str = "bat";

#[cfg(not(windows))]
pub const PLATFORM_DIR: &str = "linux-x86_64";
#[cfg(not(windows))]
pub const LAUNCHER_EXTENSION: &str = "sh";

const ACRONYMS: [&str; 2] = ["xr", "vr"];

/// `<install_root>/_build/<platform>/release`
pub fn templates_dir(install_root: &Path) -> PathBuf {
    install_root.join("_build").join(PLATFORM_DIR).join("release")
}

fn capitalize(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Turns a launcher file stem into its UI label.
///
/// `isaac-sim` is "Default"; otherwise the part after the root token is split
/// on `.` and `_`, each word is capitalized and XR/VR are kept upper-case.
pub fn display_name_for_stem(stem: &str) -> String {
    if stem == ROOT_TOKEN {
        return DEFAULT_TEMPLATE.to_string();
    }
    let suffix = stem
        .strip_prefix(ROOT_TOKEN)
        .unwrap_or(stem)
        .trim_start_matches(['.', '_', '-']);

    let display = suffix
        .replace(['.', '_'], " ")
        .split_whitespace()
        .map(|word| {
            if ACRONYMS.iter().any(|a| word.eq_ignore_ascii_case(a)) {
                word.to_uppercase()
            } else {
                capitalize(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    if display.is_empty() {
        DEFAULT_TEMPLATE.to_string()
    } else {
        display
    }
}

fn is_launcher_script(path: &Path) -> bool {
    let name_matches = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(ROOT_TOKEN));
    let ext_matches = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(LAUNCHER_EXTENSION));
    name_matches && ext_matches && path.is_file()
}

/// Label -> launcher script map for one install root.
#[derive(Clone, Debug)]
pub struct TemplateResolver {
    dir: PathBuf,
    entries: HashMap<String, PathBuf>,
}

impl TemplateResolver {
    pub fn new(install_root: &Path) -> Self {
        Self {
            dir: templates_dir(install_root),
            entries: HashMap::new(),
        }
    }

    pub fn for_settings(settings: &Settings) -> Self {
        Self::new(&settings.install_path)
    }

    pub fn templates_dir(&self) -> &Path {
        &self.dir
    }

    /// Drops the cached map and rebuilds it from a full directory listing.
    /// Two scripts that map to the same label: the one listed last wins.
    pub fn rescan(&mut self) -> usize {
        self.entries.clear();
        let Ok(read_dir) = fs::read_dir(&self.dir) else {
            debug!(dir = %self.dir.display(), "template directory not readable");
            return 0;
        };

        for path in read_dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| is_launcher_script(path))
        {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let label = display_name_for_stem(stem);
            if let Some(previous) = self.entries.insert(label.clone(), path.clone()) {
                debug!(label = %label, replaced = %previous.display(), by = %path.display(), "template label collision");
            }
        }

        debug!(dir = %self.dir.display(), count = self.entries.len(), "templates rescanned");
        self.entries.len()
    }

    /// Labels for the template dropdown: "Default" first, the rest sorted.
    pub fn list_display_names(&mut self) -> Vec<String> {
        if self.entries.is_empty() {
            self.rescan();
        }
        if self.entries.is_empty() {
            return vec![DEFAULT_TEMPLATE.to_string()];
        }

        let mut names: Vec<String> = self
            .entries
            .keys()
            .filter(|name| name.as_str() != DEFAULT_TEMPLATE)
            .cloned()
            .collect();
        names.sort();
        if self.entries.contains_key(DEFAULT_TEMPLATE) {
            names.insert(0, DEFAULT_TEMPLATE.to_string());
        }
        names
    }

    /// Script path for a label, rescanning once if the cache is empty or stale.
    pub fn resolve(&mut self, display_name: &str) -> Result<PathBuf> {
        if !self.entries.contains_key(display_name) {
            self.rescan();
        }
        self.entries
            .get(display_name)
            .cloned()
            .ok_or_else(|| LauncherError::TemplateNotFound {
                name: display_name.to_string(),
                dir: self.dir.clone(),
            })
    }
}
