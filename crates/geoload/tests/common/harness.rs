//! Wiring for orchestrator tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use geoload::{
    Adapters, JobNotifier, JobRecord, JobRegistry, JobService, Orchestrator, Settings,
    SettingsHandle, Subscription, UpdateCallback,
};

use super::builders::real_settings;
use super::stubs::{StubSink, StubStage, StubTransform};

/// A real orchestrator over stub adapters, with handles to inspect them.
pub struct Harness {
    pub registry: Arc<JobRegistry>,
    pub notifier: Arc<JobNotifier>,
    pub settings: SettingsHandle,
    pub stage: Arc<StubStage>,
    pub transform: Arc<StubTransform>,
    pub sink: Arc<StubSink>,
    pub orchestrator: Orchestrator,
}

impl Harness {
    pub fn new(stage: StubStage, transform: StubTransform, sink: StubSink) -> Self {
        Self::with_settings(stage, transform, sink, real_settings())
    }

    pub fn with_settings(
        stage: StubStage,
        transform: StubTransform,
        sink: StubSink,
        settings: Settings,
    ) -> Self {
        let registry = Arc::new(JobRegistry::new());
        let notifier = Arc::new(JobNotifier::default());
        let settings = SettingsHandle::new(settings);
        let stage = Arc::new(stage);
        let transform = Arc::new(transform);
        let sink = Arc::new(sink);
        let adapters = Adapters::new(stage.clone(), transform.clone(), sink.clone());
        let orchestrator = Orchestrator::new(
            Arc::clone(&registry),
            Arc::clone(&notifier),
            adapters,
            settings.clone(),
        );
        Self {
            registry,
            notifier,
            settings,
            stage,
            transform,
            sink,
            orchestrator,
        }
    }

    /// Stubs that succeed everywhere: 1000 records, 500 rows on the first poll.
    pub fn happy() -> Self {
        Self::new(StubStage::ok(), StubTransform::ok(1000), StubSink::done(500))
    }
}

/// Polls until the job is Completed or Failed.
pub async fn wait_for_terminal(service: &dyn JobService, job_id: &str) -> JobRecord {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Some(job) = service.get_job(job_id) {
            if job.is_finished() {
                return job;
            }
        }
        assert!(
            Instant::now() < deadline,
            "job {} did not finish in time",
            job_id
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Subscribes and records every snapshot delivered.
pub fn record_updates(
    service: &dyn JobService,
    job_id: &str,
) -> (Subscription, Arc<Mutex<Vec<JobRecord>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: UpdateCallback = Arc::new(move |job: &JobRecord| {
        sink.lock().unwrap().push(job.clone());
    });
    (service.subscribe_to_job_updates(job_id, callback), seen)
}
