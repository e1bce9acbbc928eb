//! Job update notifier.
//!
//! The pipeline task that owns a job calls [`JobNotifier::publish`] after
//! every mutation. Publishing fans out to the callbacks registered for that
//! job and to a process-wide broadcast channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::broadcast;

use crate::job::JobRecord;

/// Callback invoked with a snapshot of the job after each update.
pub type UpdateCallback = Arc<dyn Fn(&JobRecord) + Send + Sync>;

struct Subscriber {
    id: u64,
    callback: UpdateCallback,
    /// Revision of the last snapshot handed to `callback`.
    last_revision: Mutex<Option<u64>>,
}

impl Subscriber {
    /// Delivers `record` unless an equal or newer revision was already seen.
    fn deliver(&self, record: &JobRecord) {
        let mut last = lock(&self.last_revision);
        if matches!(*last, Some(seen) if seen >= record.revision) {
            return;
        }
        *last = Some(record.revision);
        (self.callback)(record);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(g) => g,
        Err(poisoned) => {
            log::warn!("Job notifier lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Fans job updates out to observers.
pub struct JobNotifier {
    sender: broadcast::Sender<JobRecord>,
    subscribers: Mutex<HashMap<String, Vec<Arc<Subscriber>>>>,
    next_id: AtomicU64,
}

impl JobNotifier {
    /// Creates a notifier whose broadcast channel buffers `capacity` updates.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Receives every update for every job.
    pub fn subscribe_all(&self) -> broadcast::Receiver<JobRecord> {
        self.sender.subscribe()
    }

    /// Registers `callback` for `job_id`.
    ///
    /// `load` fetches the job's current snapshot; it runs after registration
    /// so no update published in between is lost. The snapshot is delivered
    /// straight away. A terminal snapshot is delivered once and the
    /// registration is dropped; an unknown job yields an inert subscription.
    pub fn subscribe<F>(
        self: &Arc<Self>,
        job_id: &str,
        load: F,
        callback: UpdateCallback,
    ) -> Subscription
    where
        F: FnOnce() -> Option<JobRecord>,
    {
        let subscriber = Arc::new(Subscriber {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            callback,
            last_revision: Mutex::new(None),
        });

        lock(&self.subscribers)
            .entry(job_id.to_string())
            .or_default()
            .push(Arc::clone(&subscriber));

        let Some(current) = load() else {
            self.remove(job_id, subscriber.id);
            return Subscription::inert(job_id);
        };

        subscriber.deliver(&current);

        if current.is_finished() {
            self.remove(job_id, subscriber.id);
            return Subscription::inert(job_id);
        }

        Subscription {
            notifier: Arc::downgrade(self),
            job_id: job_id.to_string(),
            id: Some(subscriber.id),
        }
    }

    /// Publishes a snapshot. Called only by the job's owning task.
    pub fn publish(&self, record: &JobRecord) {
        let targets: Vec<Arc<Subscriber>> = {
            let mut subscribers = lock(&self.subscribers);
            if record.is_finished() {
                subscribers.remove(&record.id).unwrap_or_default()
            } else {
                subscribers.get(&record.id).cloned().unwrap_or_default()
            }
        };

        for subscriber in &targets {
            subscriber.deliver(record);
        }

        // No active receivers is fine
        let _ = self.sender.send(record.clone());
    }

    /// Number of callbacks currently registered for `job_id`.
    pub fn subscriber_count(&self, job_id: &str) -> usize {
        lock(&self.subscribers)
            .get(job_id)
            .map(|subs| subs.len())
            .unwrap_or(0)
    }

    fn remove(&self, job_id: &str, id: u64) {
        let mut subscribers = lock(&self.subscribers);
        if let Some(subs) = subscribers.get_mut(job_id) {
            subs.retain(|s| s.id != id);
            if subs.is_empty() {
                subscribers.remove(job_id);
            }
        }
    }
}

impl Default for JobNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Handle returned by a job subscription.
///
/// Dropping the handle does not unsubscribe; call [`Subscription::unsubscribe`].
/// Subscriptions end on their own once the job's terminal state is delivered.
pub struct Subscription {
    notifier: Weak<JobNotifier>,
    job_id: String,
    id: Option<u64>,
}

impl Subscription {
    fn inert(job_id: &str) -> Self {
        Self {
            notifier: Weak::new(),
            job_id: job_id.to_string(),
            id: None,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Stops further callbacks. Safe to call more than once.
    pub fn unsubscribe(&self) {
        if let (Some(id), Some(notifier)) = (self.id, self.notifier.upgrade()) {
            notifier.remove(&self.job_id, id);
        }
    }

    /// True while the callback is still registered.
    pub fn is_active(&self) -> bool {
        match (self.id, self.notifier.upgrade()) {
            (Some(id), Some(notifier)) => lock(&notifier.subscribers)
                .get(&self.job_id)
                .is_some_and(|subs| subs.iter().any(|s| s.id == id)),
            _ => false,
        }
    }
}
