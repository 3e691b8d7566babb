use std::ffi::OsStr;
use std::io::ErrorKind;
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};
use crate::error::Result;
use crate::settings::{Settings, SettingsStore};

pub const DETECTION_TOOL: &str = "nvidia-smi";
const DETECTION_ARGS: [&str; 2] = ["--query-gpu=name", "--format=csv,noheader"];

/// Shown when the detection tool is missing, fails, or reports nothing.
pub const PLACEHOLDER_DEVICES: [&str; 3] = ["No NVIDIA GPU Found", "Integrated Graphics", "Software Renderer"];
/// Shown when detection failed in a way nobody anticipated.
pub const ERROR_MARKER: &str = "GPU Detection Error";

#[derive(Clone, Debug, PartialEq)]
pub enum FallbackReason {
    ToolUnavailable,
    Unexpected(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeviceListing {
    Detected(Vec<String>),
    Fallback {
        reason: FallbackReason,
        devices: Vec<String>,
    },
}

impl DeviceListing {
    fn tool_unavailable() -> Self {
        DeviceListing::Fallback {
            reason: FallbackReason::ToolUnavailable,
            devices: PLACEHOLDER_DEVICES.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn unexpected(detail: impl Into<String>) -> Self {
        DeviceListing::Fallback {
            reason: FallbackReason::Unexpected(detail.into()),
            devices: vec![ERROR_MARKER.to_string()],
        }
    }

    pub fn devices(&self) -> &[String] {
        match self {
            DeviceListing::Detected(devices) => devices,
            DeviceListing::Fallback { devices, .. } => devices,
        }
    }

    pub fn into_devices(self) -> Vec<String> {
        match self {
            DeviceListing::Detected(devices) => devices,
            DeviceListing::Fallback { devices, .. } => devices,
        }
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            DeviceListing::Detected(_) => None,
            DeviceListing::Fallback { reason, .. } => Some(reason),
        }
    }
}

#[cfg(windows)]
fn hide_console(command: &mut Command) {
    use std::os::windows::process::CommandExt;

    const CREATE_NO_WINDOW: u32 = 0x08000000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console(_command: &mut Command) {}

/// One device per line; surrounding whitespace trimmed, blank lines dropped.
pub fn parse_device_output(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Queries the graphics devices on this machine. Never fails.
pub fn list_devices() -> DeviceListing {
    query_devices(DETECTION_TOOL, DETECTION_ARGS)
}

fn query_devices<I, S>(program: &str, args: I) -> DeviceListing
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null());
    hide_console(&mut command);

    let output = match command.output() {
        Ok(output) => output,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(program, "device detection tool not found");
            return DeviceListing::tool_unavailable();
        }
        Err(e) => return DeviceListing::unexpected(e.to_string()),
    };

    if !output.status.success() {
        debug!(program, status = %output.status, "device detection tool failed");
        return DeviceListing::tool_unavailable();
    }

    match String::from_utf8(output.stdout) {
        Ok(stdout) => {
            let devices = parse_device_output(&stdout);
            if devices.is_empty() {
                debug!(program, "device detection tool reported no devices");
                DeviceListing::tool_unavailable()
            } else {
                DeviceListing::Detected(devices)
            }
        }
        Err(e) => DeviceListing::unexpected(e.to_string()),
    }
}

/// Moves `preferred` to the front if it is listed. Other entries keep their order.
pub fn promote_preferred(mut devices: Vec<String>, preferred: Option<&str>) -> Vec<String> {
    if let Some(pos) = preferred.and_then(|p| devices.iter().position(|d| d == p)) {
        let device = devices.remove(pos);
        devices.insert(0, device);
    }
    devices
}

/// Device list for the UI, with the saved preference floated to the top.
pub fn list_devices_for(settings: &Settings) -> Vec<String> {
    let listing = list_devices();
    match listing.fallback_reason() {
        None => info!(count = listing.devices().len(), "detected graphics devices"),
        Some(FallbackReason::ToolUnavailable) => {
            warn!("{} unavailable, using placeholder devices", DETECTION_TOOL)
        }
        Some(FallbackReason::Unexpected(detail)) => {
            warn!(detail = %detail, "could not load graphics devices")
        }
    }
    promote_preferred(listing.into_devices(), settings.preferred_device.as_deref())
}

/// Isaac Sim needs an NVIDIA RTX part; anything else keeps the launch button disabled.
pub fn is_launch_capable(device: &str) -> bool {
    device.contains("NVIDIA") && device.contains("RTX")
}

pub fn save_preferred_device(store: &SettingsStore, device: &str) -> Result<()> {
    let mut settings = store.load();
    settings.preferred_device = Some(device.to_string());
    store.save(&settings)?;
    info!(device, "GPU selection saved");
    Ok(())
}
