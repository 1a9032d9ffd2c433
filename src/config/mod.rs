//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for cross-platform directories, and TOML persistence via
//! `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, AudioConfig, ChunkerConfig, RemoteConfig, StorageConfig, SynthesisDefaults,
    VoiceConfig, API_KEY_ENV, ENDPOINT_ID_ENV,
};
