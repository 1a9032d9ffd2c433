//! Job tracker storage.
//!
//! [`JobStore`] is the only state shared between concurrently running jobs.
//! `update` applies a transition to a copy of the entry and commits it only
//! when the transition succeeds, so a rejected transition leaves the stored
//! job untouched.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::pipeline::state::{JobStateError, SynthesisJob};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum JobStoreError {
    #[error("job {0} not found")]
    NotFound(String),

    #[error("job {0} already exists")]
    Duplicate(String),

    #[error(transparent)]
    State(#[from] JobStateError),
}

/// Keyed job storage with per-entry atomic updates.
pub trait JobStore: Send + Sync {
    /// Insert a new job.
    fn put(&self, job: SynthesisJob) -> Result<(), JobStoreError>;

    /// Snapshot of a job.
    fn get(&self, id: &str) -> Option<SynthesisJob>;

    /// Apply `apply` to the job and return the updated snapshot.
    fn update(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&mut SynthesisJob) -> Result<(), JobStateError>,
    ) -> Result<SynthesisJob, JobStoreError>;
}

/// Process-local job store.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<String, SynthesisJob>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SynthesisJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JobStore for InMemoryJobStore {
    fn put(&self, job: SynthesisJob) -> Result<(), JobStoreError> {
        let mut jobs = self.lock();
        if jobs.contains_key(&job.id) {
            return Err(JobStoreError::Duplicate(job.id));
        }
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    fn get(&self, id: &str) -> Option<SynthesisJob> {
        self.lock().get(id).cloned()
    }

    fn update(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&mut SynthesisJob) -> Result<(), JobStateError>,
    ) -> Result<SynthesisJob, JobStoreError> {
        let mut jobs = self.lock();
        let entry = jobs
            .get_mut(id)
            .ok_or_else(|| JobStoreError::NotFound(id.to_string()))?;

        let mut next = entry.clone();
        apply(&mut next)?;
        *entry = next.clone();
        Ok(next)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
