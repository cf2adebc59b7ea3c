#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use circular_client::{
    ChatError, ChatTurn, HealthStatus, Job, JobHandle, JobObserver, JobStatus, PollEvent,
    QueryApi, QueryOptions, QueryResult, TransportError, TransportKind,
};

pub fn init_logging() {
    circular_logging::initialize_for_tests();
}

pub fn job(job_id: &str, status: JobStatus) -> Job {
    Job {
        job_id: job_id.to_string(),
        status,
        created_at: Some("2025-01-01T00:00:00Z".to_string()),
        updated_at: Some("2025-01-01T00:00:01Z".to_string()),
        query: None,
        result: None,
        error: None,
        progress: None,
    }
}

pub fn with_progress(mut job: Job, progress: &str) -> Job {
    job.progress = Some(progress.to_string());
    job
}

pub fn answer(text: &str) -> QueryResult {
    QueryResult {
        answer: Some(text.to_string()),
        success: true,
        ..QueryResult::default()
    }
}

pub fn completed(job_id: &str, result: QueryResult) -> Job {
    let mut job = job(job_id, JobStatus::Completed);
    job.result = Some(result);
    job
}

pub fn handle(job_id: &str) -> JobHandle {
    JobHandle {
        job_id: job_id.to_string(),
        status: JobStatus::Pending,
        message: "Query submitted".to_string(),
        status_url: format!("/status/{job_id}"),
    }
}

pub fn transport_error() -> ChatError {
    ChatError::Transport(TransportError {
        kind: TransportKind::Connect,
        message: "connection refused".to_string(),
    })
}

#[derive(Clone)]
struct ScriptedStatus {
    delay: Duration,
    outcome: Result<Job, ChatError>,
}

/// A [`QueryApi`] that replays canned responses.
///
/// Status responses are queued per job id; the last one repeats forever.
#[derive(Default)]
pub struct ScriptedApi {
    submissions: Mutex<VecDeque<(Duration, Result<JobHandle, ChatError>)>>,
    statuses: Mutex<HashMap<String, VecDeque<ScriptedStatus>>>,
    submitted_queries: Mutex<Vec<(String, Vec<ChatTurn>)>>,
    status_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_submission(&self, outcome: Result<JobHandle, ChatError>) {
        self.push_delayed_submission(Duration::ZERO, outcome);
    }

    pub fn push_delayed_submission(&self, delay: Duration, outcome: Result<JobHandle, ChatError>) {
        self.submissions.lock().unwrap().push_back((delay, outcome));
    }

    pub fn push_status(&self, job_id: &str, outcome: Result<Job, ChatError>) {
        self.push_delayed_status(job_id, Duration::ZERO, outcome);
    }

    pub fn push_delayed_status(&self, job_id: &str, delay: Duration, outcome: Result<Job, ChatError>) {
        self.statuses
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_default()
            .push_back(ScriptedStatus { delay, outcome });
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn submitted_queries(&self) -> Vec<(String, Vec<ChatTurn>)> {
        self.submitted_queries.lock().unwrap().clone()
    }

    fn next_status(&self, job_id: &str) -> ScriptedStatus {
        let mut statuses = self.statuses.lock().unwrap();
        let queue = statuses
            .get_mut(job_id)
            .unwrap_or_else(|| panic!("no scripted status for {job_id}"));
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        }
    }
}

/// Decrements the in-flight counter even when the call is abandoned.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl QueryApi for ScriptedApi {
    async fn submit_query(
        &self,
        query: &str,
        history: &[ChatTurn],
        _options: &QueryOptions,
    ) -> Result<JobHandle, ChatError> {
        self.submitted_queries
            .lock()
            .unwrap()
            .push((query.to_string(), history.to_vec()));
        let (delay, outcome) = self
            .submissions
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted submission");
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome
    }

    async fn job_status(&self, job_id: &str) -> Result<Job, ChatError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let scripted = self.next_status(job_id);
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        scripted.outcome
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatError> {
        Ok(HealthStatus {
            status: "healthy".to_string(),
            timestamp: "2025-01-01T00:00:00Z".to_string(),
            version: "test".to_string(),
        })
    }
}

/// Observer that records every callback in order.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PollEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<PollEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn terminal_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| !matches!(event, PollEvent::Status(_)))
            .count()
    }
}

impl JobObserver for RecordingObserver {
    fn on_status(&self, job: &Job) {
        self.events.lock().unwrap().push(PollEvent::Status(job.clone()));
    }

    fn on_result(&self, result: QueryResult) {
        self.events.lock().unwrap().push(PollEvent::Result(result));
    }

    fn on_error(&self, error: ChatError) {
        self.events.lock().unwrap().push(PollEvent::Error(error));
    }
}
