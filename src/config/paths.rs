//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\voice-narrator\
//!   macOS:   ~/Library/Application Support/voice-narrator/
//!   Linux:   ~/.config/voice-narrator/
//!
//! Data dir (object store root: voice samples + rendered audio):
//!   Windows: %LOCALAPPDATA%\voice-narrator\
//!   macOS:   ~/Library/Application Support/voice-narrator/
//!   Linux:   ~/.local/share/voice-narrator/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Root directory of the filesystem object store.
    pub storage_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "voice-narrator";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let storage_dir = data_dir.join("objects");

        Self {
            config_dir,
            settings_file,
            storage_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
