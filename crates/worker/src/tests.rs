use super::*;
use async_trait::async_trait;
use loraflow_core::{CanonicalStatus, FakeClock, Job};
use loraflow_generator::{GenerationHandle, GenerationStatus, GeneratorError};
use parking_lot::Mutex;
use std::sync::Arc;

struct ScriptedGenerator {
    polls: Mutex<Vec<GenerationStatus>>,
    start_result: Mutex<Option<Result<GenerationHandle, GeneratorError>>>,
    cancel_calls: Mutex<u32>,
}

impl ScriptedGenerator {
    fn succeeding_after(polls: Vec<GenerationStatus>) -> Self {
        Self {
            polls: Mutex::new(polls),
            start_result: Mutex::new(Some(Ok("gen-1".to_string()))),
            cancel_calls: Mutex::new(0),
        }
    }

    fn start_failure(err: GeneratorError) -> Self {
        Self {
            polls: Mutex::new(Vec::new()),
            start_result: Mutex::new(Some(Err(err))),
            cancel_calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn start(&self, _request: loraflow_generator::GenerationRequest) -> Result<GenerationHandle, GeneratorError> {
        self.start_result.lock().take().unwrap()
    }

    async fn poll(&self, _handle: &GenerationHandle) -> Result<GenerationStatus, GeneratorError> {
        let mut polls = self.polls.lock();
        if polls.is_empty() {
            panic!("poll called more times than scripted");
        }
        Ok(polls.remove(0))
    }

    async fn cancel(&self, _handle: &GenerationHandle) -> Result<(), GeneratorError> {
        *self.cancel_calls.lock() += 1;
        Ok(())
    }

    async fn healthcheck(&self) -> Result<(), GeneratorError> {
        Ok(())
    }
}

#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<StatusEvent>>,
}

#[async_trait]
impl ProgressSink for CollectingSink {
    async fn publish(&self, event: StatusEvent) {
        self.events.lock().push(event);
    }
}

fn status(state: &str, progress: Option<f64>, images: Vec<&str>) -> GenerationStatus {
    GenerationStatus {
        state: state.to_string(),
        progress,
        images: images.into_iter().map(String::from).collect(),
        error: None,
    }
}

fn fast_settings() -> WorkerSettings {
    WorkerSettings {
        poll_interval: std::time::Duration::from_millis(1),
        max_job_duration: std::time::Duration::from_secs(600),
    }
}

#[tokio::test]
async fn completes_job_and_stores_images() {
    let store = JobStore::new();
    let job = Job::builder().status(CanonicalStatus::Queued).build();
    store.create(job.clone()).unwrap();

    let generator = Arc::new(ScriptedGenerator::succeeding_after(vec![
        status("running", Some(0.5), vec![]),
        status("succeeded", Some(1.0), vec!["http://x/a.png"]),
    ]));
    let sink = Arc::new(CollectingSink::default());
    let worker = DeliveryWorker::new(
        store.clone(),
        generator,
        sink.clone(),
        FakeClock::default(),
        CancellationRegistry::new(),
        fast_settings(),
    );

    worker.run_job(job.id.clone()).await;

    let final_job = store.get(&job.id).unwrap();
    assert_eq!(final_job.status, CanonicalStatus::Completed);
    match final_job.result {
        Some(JobResult::Success { images }) => assert_eq!(images.len(), 1),
        other => panic!("expected success result, got {other:?}"),
    }

    let events = sink.events.lock();
    assert!(events.iter().any(|e| e.status == CanonicalStatus::Processing));
    assert!(events.last().unwrap().status == CanonicalStatus::Completed);
    // sequence numbers strictly increase
    for pair in events.windows(2) {
        assert!(pair[1].sequence > pair[0].sequence);
    }
}

#[tokio::test]
async fn terminal_job_is_not_redelivered() {
    let store = JobStore::new();
    let job = Job::builder().status(CanonicalStatus::Completed).build();
    store.create(job.clone()).unwrap();

    let generator = Arc::new(ScriptedGenerator::succeeding_after(vec![]));
    let sink = Arc::new(CollectingSink::default());
    let worker = DeliveryWorker::new(
        store.clone(),
        generator,
        sink.clone(),
        FakeClock::default(),
        CancellationRegistry::new(),
        fast_settings(),
    );

    worker.run_job(job.id.clone()).await;
    assert!(sink.events.lock().is_empty());
}

#[tokio::test]
async fn generator_start_failure_fails_the_job() {
    let store = JobStore::new();
    let job = Job::builder().status(CanonicalStatus::Queued).build();
    store.create(job.clone()).unwrap();

    let generator = Arc::new(ScriptedGenerator::start_failure(GeneratorError::Unreachable(
        "connection refused".to_string(),
    )));
    let sink = Arc::new(CollectingSink::default());
    let worker = DeliveryWorker::new(
        store.clone(),
        generator,
        sink,
        FakeClock::default(),
        CancellationRegistry::new(),
        fast_settings(),
    );

    worker.run_job(job.id.clone()).await;
    let final_job = store.get(&job.id).unwrap();
    assert_eq!(final_job.status, CanonicalStatus::Failed);
    match final_job.result {
        Some(JobResult::Failure { error_kind, .. }) => assert_eq!(error_kind, "generator_unreachable"),
        other => panic!("expected failure result, got {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_request_stops_polling_and_marks_canceled() {
    let store = JobStore::new();
    let job = Job::builder().status(CanonicalStatus::Queued).build();
    store.create(job.clone()).unwrap();

    let generator = Arc::new(ScriptedGenerator::succeeding_after(vec![
        status("running", Some(0.1), vec![]),
        status("running", Some(0.2), vec![]),
        status("running", Some(0.3), vec![]),
    ]));
    let cancellations = CancellationRegistry::new();
    cancellations.request_cancel(job.id.clone());

    let sink = Arc::new(CollectingSink::default());
    let worker = DeliveryWorker::new(
        store.clone(),
        generator,
        sink,
        FakeClock::default(),
        cancellations,
        fast_settings(),
    );

    worker.run_job(job.id.clone()).await;
    let final_job = store.get(&job.id).unwrap();
    assert_eq!(final_job.status, CanonicalStatus::Canceled);
}

#[tokio::test]
async fn redelivery_while_processing_resumes_sequence_numbering() {
    let store = JobStore::new();
    let job = Job::builder()
        .status(CanonicalStatus::Processing)
        .attempt_count(1)
        .sequence(7)
        .progress(0.4)
        .build();
    store.create(job.clone()).unwrap();

    let generator = Arc::new(ScriptedGenerator::succeeding_after(vec![
        status("succeeded", Some(1.0), vec!["http://x/a.png"]),
    ]));
    let sink = Arc::new(CollectingSink::default());
    let worker = DeliveryWorker::new(
        store.clone(),
        generator,
        sink.clone(),
        FakeClock::default(),
        CancellationRegistry::new(),
        fast_settings(),
    );

    worker.run_job(job.id.clone()).await;

    let events = sink.events.lock();
    assert!(events.iter().all(|e| e.sequence > 7));
    for pair in events.windows(2) {
        assert!(pair[1].sequence > pair[0].sequence);
    }
}

#[tokio::test]
async fn exceeding_max_duration_fails_with_timeout_kind() {
    let store = JobStore::new();
    let job = Job::builder().status(CanonicalStatus::Queued).build();
    store.create(job.clone()).unwrap();

    let generator = Arc::new(ScriptedGenerator::succeeding_after(vec![
        status("running", Some(0.1), vec![]),
    ]));
    let sink = Arc::new(CollectingSink::default());
    let settings = WorkerSettings {
        poll_interval: std::time::Duration::from_millis(1),
        max_job_duration: std::time::Duration::from_secs(0),
    };
    let worker = DeliveryWorker::new(
        store.clone(),
        generator,
        sink,
        FakeClock::default(),
        CancellationRegistry::new(),
        settings,
    );

    worker.run_job(job.id.clone()).await;
    let final_job = store.get(&job.id).unwrap();
    assert_eq!(final_job.status, CanonicalStatus::Failed);
    match final_job.result {
        Some(JobResult::Failure { error_kind, .. }) => assert_eq!(error_kind, "timeout"),
        other => panic!("expected timeout failure, got {other:?}"),
    }
}
