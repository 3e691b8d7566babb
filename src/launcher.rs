use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
#[cfg(unix)]
use std::thread;
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{info, warn};
use crate::error::{LauncherError, Result};
use crate::settings::SettingsStore;
use crate::templates::{templates_dir, TemplateResolver};

pub const LOG_FILE: &str = "isaac_launcher.log";
/// Device selector meaning "let Isaac Sim choose".
pub const DEFAULT_DEVICE: &str = "default";

#[derive(Clone, Debug)]
pub struct LaunchReport {
    pub command_line: Vec<OsString>,
    pub working_dir: PathBuf,
    pub pid: u32,
}

/// Launcher script first, then `--gpu=<device>` unless the selector is empty or "default".
pub fn build_command_line(launcher: &Path, device: &str) -> Vec<OsString> {
    let mut cmd = vec![launcher.as_os_str().to_owned()];
    if !device.is_empty() && device != DEFAULT_DEVICE {
        cmd.push(OsString::from(format!("--gpu={device}")));
    }
    cmd
}

pub fn format_command_line(cmd: &[OsString]) -> String {
    cmd.iter()
        .map(|arg| {
            let arg = arg.to_string_lossy();
            if arg.contains(char::is_whitespace) {
                format!("\"{arg}\"")
            } else {
                arg.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn timestamp() -> String {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .unwrap_or_default()
}

#[cfg(windows)]
fn detach(command: &mut Command) {
    use std::os::windows::process::CommandExt;

    const DETACHED_PROCESS: u32 = 0x00000008;
    const CREATE_NO_WINDOW: u32 = 0x08000000;
    command.creation_flags(CREATE_NO_WINDOW | DETACHED_PROCESS);
}

#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    // Own process group: no terminal signals from the launcher's session.
    command.process_group(0);
}

#[cfg(not(any(windows, unix)))]
fn detach(_command: &mut Command) {}

/// Lets go of the child without waiting for it. On Unix an exited child stays
/// a zombie until someone waits on it, so a throwaway thread does the reaping.
fn release(child: Child) -> u32 {
    let pid = child.id();
    #[cfg(unix)]
    {
        let mut child = child;
        let reaper = thread::Builder::new()
            .name(format!("reap-{pid}"))
            .spawn(move || {
                let _ = child.wait();
            });
        if let Err(e) = reaper {
            warn!(pid, error = %e, "could not start reaper thread");
        }
    }
    #[cfg(not(unix))]
    drop(child);
    pid
}

/// Starts Isaac Sim templates as fire-and-forget processes.
#[derive(Clone, Debug)]
pub struct Launcher {
    log_path: PathBuf,
}

impl Default for Launcher {
    fn default() -> Self {
        Self::with_log_path(LOG_FILE)
    }
}

impl Launcher {
    pub fn with_log_path(log_path: impl Into<PathBuf>) -> Self {
        Self { log_path: log_path.into() }
    }

    #[cfg(test)]
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Resolves `template` under the configured install root and starts it on `device`.
    /// Returns as soon as the process exists; nothing waits on it.
    pub fn launch(
        &self,
        store: &SettingsStore,
        resolver: &mut TemplateResolver,
        device: &str,
        template: &str,
    ) -> Result<LaunchReport> {
        let settings = store.load();
        let install_root = &settings.install_path;
        if !install_root.exists() {
            return Err(LauncherError::InstallPathNotFound(install_root.clone()));
        }

        // Settings may have moved the install root since the resolver was built.
        if resolver.templates_dir() != templates_dir(install_root) {
            *resolver = TemplateResolver::new(install_root);
        }
        let launcher = resolver.resolve(template)?;
        if !launcher.exists() {
            return Err(LauncherError::LauncherMissing(launcher));
        }

        let working_dir = launcher
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| install_root.clone());
        let cmd = build_command_line(&launcher, device);

        let mut command = Command::new(&cmd[0]);
        command
            .args(&cmd[1..])
            .current_dir(&working_dir)
            .stdin(Stdio::null());
        detach(&mut command);

        let pid = if settings.logging_enabled {
            self.spawn_logged(&mut command, &cmd)?
        } else {
            command.stdout(Stdio::null()).stderr(Stdio::null());
            release(command.spawn()?)
        };

        info!(
            launcher = %launcher.display(),
            device,
            pid,
            "launched Isaac Sim"
        );
        Ok(LaunchReport { command_line: cmd, working_dir, pid })
    }

    fn spawn_logged(&self, command: &mut Command, cmd: &[OsString]) -> Result<u32> {
        let mut log: File = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(log, "\n[{}] [Launch] {}", timestamp(), format_command_line(cmd))?;

        command
            .stdout(Stdio::from(log.try_clone()?))
            .stderr(Stdio::from(log.try_clone()?));

        match command.spawn() {
            Ok(child) => {
                let pid = release(child);
                writeln!(log, "[{}] [Status] Isaac Sim launched successfully (pid {})", timestamp(), pid)?;
                Ok(pid)
            }
            Err(e) => {
                if let Err(log_err) = writeln!(log, "[{}] [Status] Launch failed: {}", timestamp(), e) {
                    warn!(error = %log_err, "could not write launch log");
                }
                Err(e.into())
            }
        }
    }
}
