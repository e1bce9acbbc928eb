//! Scripted stand-ins for the stage, transform and sink services.
//!
//! Each stub counts its calls and pops scripted responses in order, falling
//! back to a fixed default once the script runs out.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use geoload::adapters::ProgressFn;
use geoload::{
    AdapterError, ConvertedSource, LoadRequest, LoadStatus, SchemaField, SchemaMode,
    SinkAdapter, StageAdapter, StageFile, StagedObject, TableProvisioning, TransformAdapter,
};

fn pop<T: Clone>(script: &Mutex<VecDeque<T>>, fallback: &T) -> T {
    script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| fallback.clone())
}

// ============================================
// Stage
// ============================================

pub struct StubStage {
    pub calls: AtomicUsize,
    script: Mutex<VecDeque<Result<(), AdapterError>>>,
    delay: Duration,
}

impl StubStage {
    pub fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(VecDeque::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn failing(err: AdapterError) -> Self {
        Self::ok().then(vec![Err(err.clone()), Err(err.clone()), Err(err.clone()), Err(err)])
    }

    pub fn then(self, script: Vec<Result<(), AdapterError>>) -> Self {
        *self.script.lock().unwrap() = script.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StageAdapter for StubStage {
    async fn upload(
        &self,
        file: &StageFile,
        destination: &str,
    ) -> Result<StagedObject, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        pop(&self.script, &Ok(()))?;
        Ok(StagedObject {
            uri: format!("gs://raw-geo/{}", destination),
            bucket: "raw-geo".to_string(),
            size_bytes: file.size_bytes,
        })
    }
}

// ============================================
// Transform
// ============================================

pub struct StubTransform {
    pub calls: AtomicUsize,
    pub record_count: u64,
    error: Option<AdapterError>,
    panics: bool,
    pub seen_schema: Mutex<Option<SchemaMode>>,
}

impl StubTransform {
    pub fn ok(record_count: u64) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            record_count,
            error: None,
            panics: false,
            seen_schema: Mutex::new(None),
        }
    }

    pub fn failing(err: AdapterError) -> Self {
        Self {
            error: Some(err),
            ..Self::ok(0)
        }
    }

    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::ok(0)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransformAdapter for StubTransform {
    async fn convert(
        &self,
        source_uri: &str,
        schema_mode: &SchemaMode,
        on_progress: ProgressFn<'_>,
    ) -> Result<ConvertedSource, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_schema.lock().unwrap() = Some(schema_mode.clone());
        if self.panics {
            panic!("converter crashed on {}", source_uri);
        }
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        on_progress(0);
        on_progress(50);
        on_progress(100);
        Ok(ConvertedSource {
            converted_uri: format!("{}.jsonl", source_uri),
            record_count: self.record_count,
        })
    }
}

// ============================================
// Sink
// ============================================

pub struct StubSink {
    pub create_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub sample_calls: AtomicUsize,
    create_script: Mutex<VecDeque<Result<TableProvisioning, AdapterError>>>,
    status_script: Mutex<VecDeque<Result<LoadStatus, AdapterError>>>,
    status_default: LoadStatus,
    submit_error: Option<AdapterError>,
    sample_error: Option<AdapterError>,
    pub submitted: Mutex<Vec<LoadRequest>>,
    pub remote_job_id: String,
}

impl StubSink {
    /// Loads finish on the first poll with `rows` rows.
    pub fn done(rows: u64) -> Self {
        Self {
            create_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            sample_calls: AtomicUsize::new(0),
            create_script: Mutex::new(VecDeque::new()),
            status_script: Mutex::new(VecDeque::new()),
            status_default: LoadStatus::done(rows),
            submit_error: None,
            sample_error: None,
            submitted: Mutex::new(Vec::new()),
            remote_job_id: "geo-warehouse:US.job_42".to_string(),
        }
    }

    /// Reports Running for `polls - 1` checks, then Done.
    pub fn done_after(polls: usize, rows: u64) -> Self {
        let sink = Self::done(rows);
        *sink.status_script.lock().unwrap() =
            std::iter::repeat_with(|| Ok(LoadStatus::running()))
                .take(polls.saturating_sub(1))
                .collect();
        sink
    }

    /// Never leaves Running.
    pub fn never_done() -> Self {
        Self {
            status_default: LoadStatus::running(),
            ..Self::done(0)
        }
    }

    pub fn with_status_script(self, script: Vec<Result<LoadStatus, AdapterError>>) -> Self {
        *self.status_script.lock().unwrap() = script.into();
        self
    }

    pub fn with_create_script(self, script: Vec<Result<TableProvisioning, AdapterError>>) -> Self {
        *self.create_script.lock().unwrap() = script.into();
        self
    }

    pub fn with_submit_error(mut self, err: AdapterError) -> Self {
        self.submit_error = Some(err);
        self
    }

    pub fn with_sample_error(mut self, err: AdapterError) -> Self {
        self.sample_error = Some(err);
        self
    }

    pub fn total_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
            + self.submit_calls.load(Ordering::SeqCst)
            + self.status_calls.load(Ordering::SeqCst)
            + self.sample_calls.load(Ordering::SeqCst)
    }

    pub fn status_count(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn create_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SinkAdapter for StubSink {
    async fn create_table(
        &self,
        _project: &str,
        _dataset: &str,
        _table: &str,
        _schema: &[SchemaField],
    ) -> Result<TableProvisioning, AdapterError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        pop(&self.create_script, &Ok(TableProvisioning::Created))
    }

    async fn submit_load(&self, request: &LoadRequest) -> Result<String, AdapterError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.submit_error {
            return Err(err.clone());
        }
        self.submitted.lock().unwrap().push(request.clone());
        Ok(self.remote_job_id.clone())
    }

    async fn get_load_status(&self, _remote_job_id: &str) -> Result<LoadStatus, AdapterError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        pop(&self.status_script, &Ok(self.status_default.clone()))
    }

    async fn sample_query(
        &self,
        _project: &str,
        _dataset: &str,
        _table: &str,
        limit: u32,
    ) -> Result<Vec<Value>, AdapterError> {
        self.sample_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.sample_error {
            return Err(err.clone());
        }
        Ok((0..limit.min(3)).map(|i| json!({ "id": i })).collect())
    }
}
