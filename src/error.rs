use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LauncherError>;

#[derive(Error, Debug)]
pub enum LauncherError {
    /// Configured Isaac Sim root does not exist.
    #[error("Isaac Sim path not found: {}", .0.display())]
    InstallPathNotFound(PathBuf),

    /// No launcher script maps to the requested display name, even after a rescan.
    #[error("Template '{name}' not found in {}", .dir.display())]
    TemplateNotFound { name: String, dir: PathBuf },

    /// The resolved launcher script vanished before it could be started.
    #[error("Template launcher not found: {}", .0.display())]
    LauncherMissing(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),
}

impl LauncherError {
    /// True for the "something on disk is missing" family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LauncherError::InstallPathNotFound(_)
                | LauncherError::TemplateNotFound { .. }
                | LauncherError::LauncherMissing(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_family() {
        assert!(LauncherError::InstallPathNotFound(PathBuf::from("/nope")).is_not_found());
        assert!(LauncherError::LauncherMissing(PathBuf::from("/nope/x.bat")).is_not_found());
        assert!(
            LauncherError::TemplateNotFound {
                name: "X".into(),
                dir: PathBuf::from("/d"),
            }
            .is_not_found()
        );
        assert!(!LauncherError::Io(io::Error::other("boom")).is_not_found());
    }

    #[test]
    fn test_template_not_found_names_directory() {
        let err = LauncherError::TemplateNotFound {
            name: "NoSuchTemplate".into(),
            dir: PathBuf::from("/opt/isaacsim/_build/linux-x86_64/release"),
        };
        let msg = err.to_string();
        assert!(msg.contains("NoSuchTemplate"));
        assert!(msg.contains("/opt/isaacsim/_build/linux-x86_64/release"));
    }
}
