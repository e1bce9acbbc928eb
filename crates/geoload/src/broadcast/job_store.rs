//! In-memory job registry.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::job::{JobRecord, JobStatus};

struct Entry {
    /// Insertion order, used to break `created_at` ties.
    seq: u64,
    record: JobRecord,
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    jobs: HashMap<String, Entry>,
}

/// Process-wide store of every job record.
///
/// Readers always receive clones, so nobody observes a record mid-mutation.
/// Mutation goes through [`JobRegistry::update`], which only the owning
/// pipeline task calls for a given id.
#[derive(Default)]
pub struct JobRegistry {
    inner: RwLock<Inner>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        match self.inner.read() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        match self.inner.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Stores a new record. Returns false if the id is already taken.
    pub fn insert(&self, record: JobRecord) -> bool {
        let mut inner = self.write();
        if inner.jobs.contains_key(&record.id) {
            log::error!("Refusing to reuse job id {}", record.id);
            return false;
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.jobs.insert(record.id.clone(), Entry { seq, record });
        true
    }

    /// Applies `mutate` to the stored record and returns a snapshot of the
    /// result, or `None` if the id is unknown.
    pub(crate) fn update<F>(&self, job_id: &str, mutate: F) -> Option<JobRecord>
    where
        F: FnOnce(&mut JobRecord),
    {
        let mut inner = self.write();
        let entry = inner.jobs.get_mut(job_id)?;
        mutate(&mut entry.record);
        entry.record.revision += 1;
        Some(entry.record.clone())
    }

    /// Point lookup.
    pub fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.read().jobs.get(job_id).map(|e| e.record.clone())
    }

    /// All jobs for `owner`, newest first.
    pub fn list_for_owner(&self, owner: &str) -> Vec<JobRecord> {
        let inner = self.read();
        let mut entries: Vec<&Entry> = inner
            .jobs
            .values()
            .filter(|e| e.record.owner == owner)
            .collect();
        entries.sort_by(|a, b| {
            b.record
                .created_at
                .cmp(&a.record.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        entries.into_iter().map(|e| e.record.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.read().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns (active, completed, failed) counts.
    pub fn counts(&self) -> (usize, usize, usize) {
        let inner = self.read();
        let mut active = 0;
        let mut completed = 0;
        let mut failed = 0;
        for entry in inner.jobs.values() {
            match entry.record.status {
                JobStatus::Completed => completed += 1,
                JobStatus::Failed => failed += 1,
                _ => active += 1,
            }
        }
        (active, completed, failed)
    }
}
