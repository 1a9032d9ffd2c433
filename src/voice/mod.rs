//! Voice profiles: sample registration, access checks, per-user library
//! and storage.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voice_narrator::config::{StorageConfig, VoiceConfig};
//! use voice_narrator::voice::{FsObjectStore, InMemoryVoiceRepository, VoiceLibrary};
//!
//! # async fn run() -> Result<(), voice_narrator::voice::VoiceError> {
//! let library = VoiceLibrary::new(
//!     Arc::new(InMemoryVoiceRepository::new()),
//!     Arc::new(FsObjectStore::from_config(&StorageConfig::default())),
//!     &VoiceConfig::default(),
//! );
//! let sample = std::fs::read("me.wav").unwrap();
//! let voice = library.register(7, "me", &sample).await?;
//! let conditioning = library.conditioning(&voice).await?;
//! # let _ = conditioning;
//! # Ok(())
//! # }
//! ```

pub mod library;
pub mod repository;
pub mod store;

pub use library::{VoiceError, VoiceLibrary, VoiceOptions};
pub use repository::{InMemoryVoiceRepository, NewVoice, VoiceRecord, VoiceRepository};
pub use store::{FsObjectStore, ObjectStore, StorageError};
