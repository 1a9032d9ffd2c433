//! Voice profile records.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::voice::store::StorageError;

/// A stored voice profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceRecord {
    pub voice_id: i64,
    pub owner_id: i64,
    pub name: String,
    /// Object-store location of the reference WAV.
    pub location: String,
    pub sample_rate: u32,
    pub duration_secs: f32,
    /// At most one voice per owner is the default.
    pub is_default: bool,
    /// Precomputed conditioning sent instead of the reference audio.
    /// Never serialized into caller-facing output.
    #[serde(default, skip_serializing)]
    pub speaker_embedding: Option<Value>,
    /// Number of completed narrations that used this voice.
    pub usage_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
}

/// Fields supplied when creating a record; the repository assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVoice {
    pub owner_id: i64,
    pub name: String,
    pub location: String,
    pub sample_rate: u32,
    pub duration_secs: f32,
    /// Clears the owner's previous default when set.
    pub is_default: bool,
    pub speaker_embedding: Option<Value>,
}

#[async_trait]
pub trait VoiceRepository: Send + Sync {
    async fn get(&self, voice_id: i64) -> Result<Option<VoiceRecord>, StorageError>;
    async fn insert(&self, voice: NewVoice) -> Result<VoiceRecord, StorageError>;

    /// All voices held by any of `owner_ids`, in no particular order.
    async fn list_by_owners(&self, owner_ids: &[i64]) -> Result<Vec<VoiceRecord>, StorageError>;

    /// Make `voice_id` the owner's only default.  `false` when the owner
    /// holds no such voice; nothing changes in that case.
    async fn set_default(&self, owner_id: i64, voice_id: i64) -> Result<bool, StorageError>;

    /// Remove `voice_id` if `owner_id` holds it.
    async fn delete(&self, voice_id: i64, owner_id: i64) -> Result<bool, StorageError>;

    /// Bump the usage counter and stamp `last_used`.
    async fn increment_usage(&self, voice_id: i64) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
struct Records {
    next_id: i64,
    by_id: HashMap<i64, VoiceRecord>,
}

impl Records {
    fn clear_defaults(&mut self, owner_id: i64) {
        for record in self.by_id.values_mut().filter(|r| r.owner_id == owner_id) {
            record.is_default = false;
        }
    }
}

/// Process-local repository; ids start at 1.
#[derive(Debug, Default)]
pub struct InMemoryVoiceRepository {
    records: Mutex<Records>,
}

impl InMemoryVoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl VoiceRepository for InMemoryVoiceRepository {
    async fn get(&self, voice_id: i64) -> Result<Option<VoiceRecord>, StorageError> {
        Ok(self.lock().by_id.get(&voice_id).cloned())
    }

    async fn insert(&self, voice: NewVoice) -> Result<VoiceRecord, StorageError> {
        let mut records = self.lock();
        if voice.is_default {
            records.clear_defaults(voice.owner_id);
        }
        records.next_id += 1;
        let record = VoiceRecord {
            voice_id: records.next_id,
            owner_id: voice.owner_id,
            name: voice.name,
            location: voice.location,
            sample_rate: voice.sample_rate,
            duration_secs: voice.duration_secs,
            is_default: voice.is_default,
            speaker_embedding: voice.speaker_embedding,
            usage_count: 0,
            created_at: Utc::now(),
            last_used: None,
        };
        records.by_id.insert(record.voice_id, record.clone());
        Ok(record)
    }

    async fn list_by_owners(&self, owner_ids: &[i64]) -> Result<Vec<VoiceRecord>, StorageError> {
        Ok(self
            .lock()
            .by_id
            .values()
            .filter(|r| owner_ids.contains(&r.owner_id))
            .cloned()
            .collect())
    }

    async fn set_default(&self, owner_id: i64, voice_id: i64) -> Result<bool, StorageError> {
        let mut records = self.lock();
        let owned = records
            .by_id
            .get(&voice_id)
            .is_some_and(|r| r.owner_id == owner_id);
        if !owned {
            return Ok(false);
        }
        records.clear_defaults(owner_id);
        if let Some(record) = records.by_id.get_mut(&voice_id) {
            record.is_default = true;
        }
        Ok(true)
    }

    async fn delete(&self, voice_id: i64, owner_id: i64) -> Result<bool, StorageError> {
        let mut records = self.lock();
        match records.by_id.get(&voice_id) {
            Some(r) if r.owner_id == owner_id => {
                records.by_id.remove(&voice_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_usage(&self, voice_id: i64) -> Result<(), StorageError> {
        match self.lock().by_id.get_mut(&voice_id) {
            Some(record) => {
                record.usage_count += 1;
                record.last_used = Some(Utc::now());
                Ok(())
            }
            None => Err(StorageError::NotFound(format!("voice {voice_id}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn new_voice(owner_id: i64) -> NewVoice {
        NewVoice {
            owner_id,
            name: "narrator".into(),
            location: "/output/voices/a.wav".into(),
            sample_rate: 24_000,
            duration_secs: 5.0,
            is_default: false,
            speaker_embedding: None,
        }
    }

    fn default_voice(owner_id: i64) -> NewVoice {
        NewVoice {
            is_default: true,
            ..new_voice(owner_id)
        }
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let repo = InMemoryVoiceRepository::new();
        let a = repo.insert(new_voice(7)).await.unwrap();
        let b = repo.insert(new_voice(7)).await.unwrap();
        assert_eq!((a.voice_id, b.voice_id), (1, 2));
        assert_eq!(a.usage_count, 0);
        assert!(a.last_used.is_none());
        assert_eq!(repo.get(1).await.unwrap(), Some(a));
    }

    #[tokio::test]
    async fn unknown_voice_is_none() {
        let repo = InMemoryVoiceRepository::new();
        assert_eq!(repo.get(42).await.unwrap(), None);
    }

    #[tokio::test]
    async fn increment_usage_counts_up_and_stamps_last_used() {
        let repo = InMemoryVoiceRepository::new();
        let v = repo.insert(new_voice(7)).await.unwrap();
        repo.increment_usage(v.voice_id).await.unwrap();
        repo.increment_usage(v.voice_id).await.unwrap();

        let stored = repo.get(v.voice_id).await.unwrap().unwrap();
        assert_eq!(stored.usage_count, 2);
        assert!(stored.last_used.is_some_and(|t| t >= stored.created_at));

        assert!(matches!(
            repo.increment_usage(99).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn inserting_a_default_clears_the_previous_one() {
        let repo = InMemoryVoiceRepository::new();
        let first = repo.insert(default_voice(7)).await.unwrap();
        let other_owner = repo.insert(default_voice(8)).await.unwrap();
        let second = repo.insert(default_voice(7)).await.unwrap();

        assert!(!repo.get(first.voice_id).await.unwrap().unwrap().is_default);
        assert!(repo.get(second.voice_id).await.unwrap().unwrap().is_default);
        assert!(repo.get(other_owner.voice_id).await.unwrap().unwrap().is_default);
    }

    #[tokio::test]
    async fn set_default_requires_ownership() {
        let repo = InMemoryVoiceRepository::new();
        let a = repo.insert(default_voice(7)).await.unwrap();
        let b = repo.insert(new_voice(7)).await.unwrap();
        let foreign = repo.insert(new_voice(8)).await.unwrap();

        assert!(!repo.set_default(7, foreign.voice_id).await.unwrap());
        assert!(repo.get(a.voice_id).await.unwrap().unwrap().is_default);

        assert!(repo.set_default(7, b.voice_id).await.unwrap());
        assert!(!repo.get(a.voice_id).await.unwrap().unwrap().is_default);
        assert!(repo.get(b.voice_id).await.unwrap().unwrap().is_default);
    }

    #[tokio::test]
    async fn list_and_delete_filter_by_owner() {
        let repo = InMemoryVoiceRepository::new();
        let mine = repo.insert(new_voice(7)).await.unwrap();
        let shared = repo.insert(new_voice(1)).await.unwrap();
        repo.insert(new_voice(8)).await.unwrap();

        let mut ids: Vec<i64> = repo
            .list_by_owners(&[7, 1])
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.voice_id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec![mine.voice_id, shared.voice_id]);

        assert!(!repo.delete(mine.voice_id, 8).await.unwrap());
        assert!(repo.delete(mine.voice_id, 7).await.unwrap());
        assert_eq!(repo.get(mine.voice_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn speaker_embedding_is_stored_but_not_serialized() {
        let repo = InMemoryVoiceRepository::new();
        let v = repo
            .insert(NewVoice {
                speaker_embedding: Some(json!({ "cond": [0.1, 0.2] })),
                ..new_voice(7)
            })
            .await
            .unwrap();

        assert_eq!(v.speaker_embedding, Some(json!({ "cond": [0.1, 0.2] })));
        let exposed = serde_json::to_value(&v).unwrap();
        assert!(exposed.get("speaker_embedding").is_none());
        assert_eq!(exposed["voice_id"], v.voice_id);
    }
}
