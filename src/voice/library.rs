//! Voice registration, lookup and per-user library management.
//!
//! ```text
//! register: WAV bytes ─▶ read_wav ─▶ VoiceSampleCheck::prepare ─▶ PCM16 WAV
//!                      ─▶ ObjectStore::put("voices/<uuid>.wav") ─▶ VoiceRepository::insert
//!
//! resolve:      voice_id + user ─▶ VoiceRepository::get ─▶ access check
//! conditioning: record ─▶ speaker embedding, or fetched reference WAV as base64
//! ```
//!
//! Voices held by the shared owner are visible to everyone; a user also
//! sees their own.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::audio::{encode_wav_pcm16, read_wav, AudioError, VoiceSampleCheck};
use crate::config::VoiceConfig;
use crate::synthesis::VoiceConditioning;
use crate::voice::repository::{NewVoice, VoiceRecord, VoiceRepository};
use crate::voice::store::{ObjectStore, StorageError};

// ---------------------------------------------------------------------------
// VoiceError
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VoiceError {
    #[error("voice {0} not found")]
    NotFound(i64),

    #[error("user {user_id} may not use voice {voice_id}")]
    AccessDenied { voice_id: i64, user_id: i64 },

    #[error("voice sample rejected: {0}")]
    Audio(#[from] AudioError),

    /// A stored reference no longer decodes.
    #[error("voice reference is not usable audio: {0}")]
    Reference(AudioError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Optional settings for [`VoiceLibrary::register_with`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceOptions {
    pub is_default: bool,
    pub speaker_embedding: Option<Value>,
}

// ---------------------------------------------------------------------------
// VoiceLibrary
// ---------------------------------------------------------------------------

pub struct VoiceLibrary {
    repository: Arc<dyn VoiceRepository>,
    store: Arc<dyn ObjectStore>,
    check: VoiceSampleCheck,
    shared_owner_id: i64,
}

impl VoiceLibrary {
    pub fn new(
        repository: Arc<dyn VoiceRepository>,
        store: Arc<dyn ObjectStore>,
        config: &VoiceConfig,
    ) -> Self {
        Self {
            repository,
            store,
            check: VoiceSampleCheck::from_config(config),
            shared_owner_id: config.shared_owner_id,
        }
    }

    pub fn repository(&self) -> Arc<dyn VoiceRepository> {
        Arc::clone(&self.repository)
    }

    pub fn store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.store)
    }

    /// Validate, condition and store an uploaded voice sample.
    pub async fn register(
        &self,
        owner_id: i64,
        name: &str,
        wav_bytes: &[u8],
    ) -> Result<VoiceRecord, VoiceError> {
        self.register_with(owner_id, name, wav_bytes, VoiceOptions::default())
            .await
    }

    pub async fn register_with(
        &self,
        owner_id: i64,
        name: &str,
        wav_bytes: &[u8],
        options: VoiceOptions,
    ) -> Result<VoiceRecord, VoiceError> {
        let sample = self.check.prepare(read_wav(wav_bytes)?)?;
        let wav = encode_wav_pcm16(&sample.samples, sample.sample_rate)?;

        let key = format!("voices/{}.wav", Uuid::new_v4());
        let location = self.store.put(&key, wav).await?;

        let record = self
            .repository
            .insert(NewVoice {
                owner_id,
                name: name.to_string(),
                location,
                sample_rate: sample.sample_rate,
                duration_secs: sample.duration_secs(),
                is_default: options.is_default,
                speaker_embedding: options.speaker_embedding,
            })
            .await?;

        log::info!(
            "voice: registered voice {} for owner {} ({:.2}s @ {} Hz{})",
            record.voice_id,
            owner_id,
            record.duration_secs,
            record.sample_rate,
            if record.is_default { ", default" } else { "" }
        );
        Ok(record)
    }

    /// Whether `user_id` may narrate with `record`.
    ///
    /// Allowed without a user, for the owner, and for voices held by the
    /// shared owner.
    pub fn can_use(&self, record: &VoiceRecord, user_id: Option<i64>) -> bool {
        match user_id {
            None => true,
            Some(user) => record.owner_id == user || record.owner_id == self.shared_owner_id,
        }
    }

    /// Look up a voice and check that `user_id` may use it.
    pub async fn resolve(
        &self,
        voice_id: i64,
        user_id: Option<i64>,
    ) -> Result<VoiceRecord, VoiceError> {
        let record = self.get(voice_id).await?;

        match user_id {
            Some(user) if !self.can_use(&record, user_id) => Err(VoiceError::AccessDenied {
                voice_id,
                user_id: user,
            }),
            _ => Ok(record),
        }
    }

    /// Voices `user_id` may pick from: their own plus the shared ones, or
    /// only the shared ones for a guest.
    ///
    /// Defaults first, then newest first.
    pub async fn list(&self, user_id: Option<i64>) -> Result<Vec<VoiceRecord>, VoiceError> {
        let owners = match user_id {
            Some(user) if user != self.shared_owner_id => vec![user, self.shared_owner_id],
            _ => vec![self.shared_owner_id],
        };
        let mut voices = self.repository.list_by_owners(&owners).await?;
        voices.sort_by(|a, b| {
            b.is_default
                .cmp(&a.is_default)
                .then(b.created_at.cmp(&a.created_at))
                .then(b.voice_id.cmp(&a.voice_id))
        });
        Ok(voices)
    }

    /// The user's default voice, falling back to the newest shared default.
    pub async fn default_voice(
        &self,
        user_id: Option<i64>,
    ) -> Result<Option<VoiceRecord>, VoiceError> {
        if let Some(user) = user_id {
            let own = self.repository.list_by_owners(&[user]).await?;
            if let Some(voice) = own.into_iter().find(|v| v.is_default) {
                return Ok(Some(voice));
            }
        }

        let shared = self
            .repository
            .list_by_owners(&[self.shared_owner_id])
            .await?;
        Ok(shared
            .into_iter()
            .filter(|v| v.is_default)
            .max_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then(a.voice_id.cmp(&b.voice_id))
            }))
    }

    /// Make `voice_id` the default for its owner `user_id`.
    pub async fn set_default(&self, user_id: i64, voice_id: i64) -> Result<(), VoiceError> {
        self.owned(voice_id, user_id).await?;
        if !self.repository.set_default(user_id, voice_id).await? {
            return Err(VoiceError::NotFound(voice_id));
        }
        log::info!("voice: voice {} is now the default for {}", voice_id, user_id);
        Ok(())
    }

    /// Remove a voice owned by `owner_id`.  The stored sample is left in
    /// the object store.
    pub async fn delete(&self, voice_id: i64, owner_id: i64) -> Result<VoiceRecord, VoiceError> {
        let record = self.owned(voice_id, owner_id).await?;
        if !self.repository.delete(voice_id, owner_id).await? {
            return Err(VoiceError::NotFound(voice_id));
        }
        log::info!("voice: deleted voice {} of owner {}", voice_id, owner_id);
        Ok(record)
    }

    /// Count one completed narration against `voice_id`.
    pub async fn record_usage(&self, voice_id: i64) -> Result<(), VoiceError> {
        Ok(self.repository.increment_usage(voice_id).await?)
    }

    /// Raw reference WAV bytes for a resolved voice.
    pub async fn load_reference(&self, record: &VoiceRecord) -> Result<Vec<u8>, VoiceError> {
        Ok(self.store.fetch(&record.location).await?)
    }

    /// Conditioning sent with every chunk of a job.
    ///
    /// A stored speaker embedding wins; otherwise the reference WAV is
    /// fetched, checked to decode and base64-encoded.
    pub async fn conditioning(&self, record: &VoiceRecord) -> Result<VoiceConditioning, VoiceError> {
        if let Some(embedding) = &record.speaker_embedding {
            log::debug!("voice: voice {} uses its speaker embedding", record.voice_id);
            return Ok(VoiceConditioning::SpeakerEmbedding(embedding.clone()));
        }

        let bytes = self.load_reference(record).await?;
        let reference = read_wav(&bytes).map_err(VoiceError::Reference)?;
        log::debug!(
            "voice: voice {} reference {:.2}s @ {} Hz",
            record.voice_id,
            reference.duration_secs(),
            reference.sample_rate
        );
        Ok(VoiceConditioning::reference_audio(&bytes))
    }

    async fn get(&self, voice_id: i64) -> Result<VoiceRecord, VoiceError> {
        self.repository
            .get(voice_id)
            .await?
            .ok_or(VoiceError::NotFound(voice_id))
    }

    async fn owned(&self, voice_id: i64, owner_id: i64) -> Result<VoiceRecord, VoiceError> {
        let record = self.get(voice_id).await?;
        if record.owner_id != owner_id {
            return Err(VoiceError::AccessDenied {
                voice_id,
                user_id: owner_id,
            });
        }
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::audio::secs_to_samples;
    use crate::voice::repository::InMemoryVoiceRepository;
    use crate::voice::store::FsObjectStore;

    const RATE: u32 = 16_000;

    fn library(dir: &TempDir) -> VoiceLibrary {
        VoiceLibrary::new(
            Arc::new(InMemoryVoiceRepository::new()),
            Arc::new(FsObjectStore::new(dir.path(), "/output")),
            &VoiceConfig::default(),
        )
    }

    fn wav(secs: f32, amplitude: f32) -> Vec<u8> {
        encode_wav_pcm16(&vec![amplitude; secs_to_samples(secs, RATE)], RATE).unwrap()
    }

    fn as_default() -> VoiceOptions {
        VoiceOptions {
            is_default: true,
            ..VoiceOptions::default()
        }
    }

    fn ids(voices: &[VoiceRecord]) -> Vec<i64> {
        voices.iter().map(|v| v.voice_id).collect()
    }

    #[tokio::test]
    async fn register_stores_conditioned_sample() {
        let dir = TempDir::new().unwrap();
        let lib = library(&dir);

        let record = lib.register(7, "narrator", &wav(20.0, 0.2)).await.unwrap();

        assert_eq!(record.owner_id, 7);
        assert_eq!(record.sample_rate, RATE);
        assert!(!record.is_default);
        assert!((record.duration_secs - 15.0).abs() < 1e-3);
        assert!(record.location.starts_with("/output/voices/"));

        let stored = read_wav(&lib.load_reference(&record).await.unwrap()).unwrap();
        assert_eq!(stored.len(), 15 * RATE as usize);
        let peak = stored.samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.95).abs() < 1e-3, "peak {peak}");
    }

    #[tokio::test]
    async fn register_rejects_short_and_silent_samples() {
        let dir = TempDir::new().unwrap();
        let lib = library(&dir);

        let err = lib.register(7, "short", &wav(1.0, 0.2)).await.unwrap_err();
        assert!(matches!(err, VoiceError::Audio(AudioError::TooShort { .. })));

        let err = lib.register(7, "silent", &wav(4.0, 0.0)).await.unwrap_err();
        assert!(matches!(err, VoiceError::Audio(AudioError::TooQuiet { .. })));
    }

    #[tokio::test]
    async fn register_rejects_non_wav_bytes() {
        let dir = TempDir::new().unwrap();
        let err = library(&dir)
            .register(7, "junk", b"not a wav file")
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceError::Audio(AudioError::InvalidContainer(_))));
    }

    #[tokio::test]
    async fn resolve_enforces_ownership() {
        let dir = TempDir::new().unwrap();
        let lib = library(&dir);
        let private = lib.register(7, "mine", &wav(4.0, 0.2)).await.unwrap();
        let shared = lib.register(1, "stock", &wav(4.0, 0.2)).await.unwrap();

        assert!(lib.resolve(private.voice_id, Some(7)).await.is_ok());
        assert!(lib.resolve(private.voice_id, None).await.is_ok());
        assert_eq!(
            lib.resolve(private.voice_id, Some(8)).await.unwrap_err(),
            VoiceError::AccessDenied {
                voice_id: private.voice_id,
                user_id: 8
            }
        );
        assert!(lib.resolve(shared.voice_id, Some(8)).await.is_ok());
    }

    #[tokio::test]
    async fn resolve_unknown_voice_is_not_found() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            library(&dir).resolve(404, Some(7)).await.unwrap_err(),
            VoiceError::NotFound(404)
        );
    }

    #[tokio::test]
    async fn list_shows_own_and_shared_voices_defaults_first() {
        let dir = TempDir::new().unwrap();
        let lib = library(&dir);
        let stock = lib.register(1, "stock", &wav(4.0, 0.2)).await.unwrap();
        let mine = lib.register(7, "mine", &wav(4.0, 0.2)).await.unwrap();
        let favourite = lib
            .register_with(7, "favourite", &wav(4.0, 0.2), as_default())
            .await
            .unwrap();
        let theirs = lib.register(8, "theirs", &wav(4.0, 0.2)).await.unwrap();

        let listed = lib.list(Some(7)).await.unwrap();
        assert_eq!(listed[0].voice_id, favourite.voice_id);
        assert_eq!(
            ids(&listed),
            vec![favourite.voice_id, mine.voice_id, stock.voice_id]
        );
        assert!(!ids(&listed).contains(&theirs.voice_id));

        assert_eq!(ids(&lib.list(None).await.unwrap()), vec![stock.voice_id]);
    }

    #[tokio::test]
    async fn default_voice_falls_back_to_shared_default() {
        let dir = TempDir::new().unwrap();
        let lib = library(&dir);
        assert_eq!(lib.default_voice(Some(7)).await.unwrap(), None);

        let system = lib
            .register_with(1, "system", &wav(4.0, 0.2), as_default())
            .await
            .unwrap();
        lib.register(7, "mine", &wav(4.0, 0.2)).await.unwrap();

        let fallback = lib.default_voice(Some(7)).await.unwrap().unwrap();
        assert_eq!(fallback.voice_id, system.voice_id);
        let guest = lib.default_voice(None).await.unwrap().unwrap();
        assert_eq!(guest.voice_id, system.voice_id);

        let own = lib
            .register_with(7, "own", &wav(4.0, 0.2), as_default())
            .await
            .unwrap();
        let chosen = lib.default_voice(Some(7)).await.unwrap().unwrap();
        assert_eq!(chosen.voice_id, own.voice_id);
    }

    #[tokio::test]
    async fn set_default_switches_and_checks_owner() {
        let dir = TempDir::new().unwrap();
        let lib = library(&dir);
        let a = lib
            .register_with(7, "a", &wav(4.0, 0.2), as_default())
            .await
            .unwrap();
        let b = lib.register(7, "b", &wav(4.0, 0.2)).await.unwrap();
        let shared = lib.register(1, "stock", &wav(4.0, 0.2)).await.unwrap();

        lib.set_default(7, b.voice_id).await.unwrap();
        let chosen = lib.default_voice(Some(7)).await.unwrap().unwrap();
        assert_eq!(chosen.voice_id, b.voice_id);
        let a_now = lib.resolve(a.voice_id, Some(7)).await.unwrap();
        assert!(!a_now.is_default);

        assert_eq!(
            lib.set_default(7, shared.voice_id).await.unwrap_err(),
            VoiceError::AccessDenied {
                voice_id: shared.voice_id,
                user_id: 7
            }
        );
        assert_eq!(
            lib.set_default(7, 999).await.unwrap_err(),
            VoiceError::NotFound(999)
        );
    }

    #[tokio::test]
    async fn only_the_owner_may_delete() {
        let dir = TempDir::new().unwrap();
        let lib = library(&dir);
        let voice = lib.register(7, "mine", &wav(4.0, 0.2)).await.unwrap();

        assert!(matches!(
            lib.delete(voice.voice_id, 8).await,
            Err(VoiceError::AccessDenied { .. })
        ));

        let deleted = lib.delete(voice.voice_id, 7).await.unwrap();
        assert_eq!(deleted.voice_id, voice.voice_id);
        assert_eq!(
            lib.resolve(voice.voice_id, Some(7)).await.unwrap_err(),
            VoiceError::NotFound(voice.voice_id)
        );
        assert_eq!(
            lib.delete(voice.voice_id, 7).await.unwrap_err(),
            VoiceError::NotFound(voice.voice_id)
        );
    }

    #[tokio::test]
    async fn record_usage_updates_counter_and_last_used() {
        let dir = TempDir::new().unwrap();
        let lib = library(&dir);
        let voice = lib.register(7, "mine", &wav(4.0, 0.2)).await.unwrap();

        lib.record_usage(voice.voice_id).await.unwrap();

        let stored = lib.resolve(voice.voice_id, None).await.unwrap();
        assert_eq!(stored.usage_count, 1);
        assert!(stored.last_used.is_some());
    }

    #[tokio::test]
    async fn conditioning_prefers_speaker_embedding() {
        let dir = TempDir::new().unwrap();
        let lib = library(&dir);
        let embedding = json!({ "speaker": [0.25, -0.5] });
        let mut voice = lib
            .register_with(
                7,
                "embedded",
                &wav(4.0, 0.2),
                VoiceOptions {
                    speaker_embedding: Some(embedding.clone()),
                    ..VoiceOptions::default()
                },
            )
            .await
            .unwrap();
        // The embedding is used without touching the stored sample.
        voice.location = "/output/voices/gone.wav".into();

        assert_eq!(
            lib.conditioning(&voice).await.unwrap(),
            VoiceConditioning::SpeakerEmbedding(embedding)
        );
    }

    #[tokio::test]
    async fn conditioning_falls_back_to_reference_audio() {
        let dir = TempDir::new().unwrap();
        let lib = library(&dir);
        let voice = lib.register(7, "plain", &wav(4.0, 0.2)).await.unwrap();

        let bytes = lib.load_reference(&voice).await.unwrap();
        assert_eq!(
            lib.conditioning(&voice).await.unwrap(),
            VoiceConditioning::reference_audio(&bytes)
        );
    }

    #[tokio::test]
    async fn undecodable_reference_is_reported() {
        let dir = TempDir::new().unwrap();
        let lib = library(&dir);
        let mut voice = lib.register(7, "plain", &wav(4.0, 0.2)).await.unwrap();
        voice.location = lib.store().put("voices/junk.wav", b"junk".to_vec()).await.unwrap();

        assert!(matches!(
            lib.conditioning(&voice).await,
            Err(VoiceError::Reference(_))
        ));
    }
}
