//! The job-polling engine.
//!
//! A [`JobPoller`] watches at most one remote job at a time. Submitting a
//! query starts one background poll loop; the loop reports every status
//! snapshot to the bound [`JobObserver`] and ends with exactly one terminal
//! callback, unless the poller is cancelled first, in which case nothing more
//! is reported for that job.
//!
//! Observer callbacks run while the poller's internal lock is held. That is
//! what makes cancellation airtight: once [`JobPoller::cancel`] returns, no
//! callback for the cancelled job can start. Observers must therefore not
//! call back into the poller.

use std::ops::ControlFlow;
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::time::Duration;

use circular_logging::{chat_debug, chat_info, chat_warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    ChatError, ChatTurn, ClientSettings, Job, JobId, JobStatus, QueryApi, QueryOptions,
    QueryResult, ReqwestQueryApi,
};

pub const JOB_FAILED_FALLBACK: &str = "Job failed";

/// Receives everything a poller learns about its current job.
pub trait JobObserver: Send + Sync {
    /// Every status snapshot, intermediate or terminal, in arrival order.
    fn on_status(&self, job: &Job);
    /// The job completed with a result. Fires at most once per submission.
    fn on_result(&self, result: QueryResult);
    /// Submission, polling or the job itself failed. Fires at most once per submission.
    fn on_error(&self, error: ChatError);
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    Status(Job),
    Result(QueryResult),
    Error(ChatError),
}

/// Caller-chosen label of one submission, echoed on every event it causes.
pub type SubmissionTag = String;

/// A [`PollEvent`] together with the submission it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientEvent {
    pub submission: SubmissionTag,
    pub event: PollEvent,
}

/// Forwards observer callbacks into a channel, tagged with the current
/// submission.
pub struct ChannelObserver {
    tx: mpsc::Sender<ClientEvent>,
    current: Mutex<SubmissionTag>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::Sender<ClientEvent>) -> Self {
        Self {
            tx,
            current: Mutex::new(SubmissionTag::new()),
        }
    }

    /// Labels every later event with `tag`.
    ///
    /// Call it after [`JobPoller::begin_submit`] and before the submission is
    /// finished: in between, the poller reports nothing.
    pub fn set_submission(&self, tag: impl Into<SubmissionTag>) {
        *self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = tag.into();
    }

    fn send(&self, event: PollEvent) {
        let submission = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        let _ = self.tx.send(ClientEvent { submission, event });
    }
}

impl JobObserver for ChannelObserver {
    fn on_status(&self, job: &Job) {
        self.send(PollEvent::Status(job.clone()));
    }

    fn on_result(&self, result: QueryResult) {
        self.send(PollEvent::Result(result));
    }

    fn on_error(&self, error: ChatError) {
        self.send(PollEvent::Error(error));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollerState {
    /// Nothing submitted yet, or torn down by [`JobPoller::destroy`].
    #[default]
    Idle,
    Submitting,
    Polling,
    Done,
    Failed,
    Cancelled,
}

impl PollerState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PollerState::Done | PollerState::Failed | PollerState::Cancelled
        )
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: PollerState,
    job_id: Option<JobId>,
    /// Bumped whenever the current submission or loop is abandoned; both only
    /// report while their own generation is current.
    generation: u64,
    active: Option<ActivePoll>,
    /// Cancelled loops that may not have exited yet.
    retired: Vec<JoinHandle<()>>,
}

impl Shared {
    /// Abandons the current submission or loop without waiting for it.
    fn abandon(&mut self) {
        self.generation += 1;
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            self.retired.push(active.task);
        }
        self.retired.retain(|task| !task.is_finished());
    }
}

#[derive(Debug)]
struct ActivePoll {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Ticket for one submission, returned by [`JobPoller::begin_submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct SubmitTicket {
    generation: u64,
}

pub struct JobPoller {
    api: Arc<dyn QueryApi>,
    observer: Arc<dyn JobObserver>,
    poll_interval: Duration,
    shared: Arc<Mutex<Shared>>,
    /// Serializes submissions so a new loop only starts once older ones exited.
    submit_gate: tokio::sync::Mutex<()>,
}

impl JobPoller {
    pub fn new(
        api: Arc<dyn QueryApi>,
        observer: Arc<dyn JobObserver>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            api,
            observer,
            poll_interval,
            shared: Arc::new(Mutex::new(Shared::default())),
            submit_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Builds a poller talking HTTP to `settings.base_url`.
    pub fn from_settings(
        settings: &ClientSettings,
        observer: Arc<dyn JobObserver>,
    ) -> Result<Self, ChatError> {
        let api = Arc::new(ReqwestQueryApi::new(settings)?);
        Ok(Self::new(api, observer, settings.poll_interval))
    }

    pub fn state(&self) -> PollerState {
        lock(&self.shared).state
    }

    pub fn current_job_id(&self) -> Option<JobId> {
        lock(&self.shared).job_id.clone()
    }

    /// Whether any poll loop task, current or cancelled, is still running.
    pub fn has_active_loop(&self) -> bool {
        let shared = lock(&self.shared);
        shared
            .active
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
            || shared.retired.iter().any(|task| !task.is_finished())
    }

    /// Submits a query and starts polling for it.
    ///
    /// Any job currently being submitted or polled is abandoned first and
    /// never reports again. Returns once the submission succeeded or failed;
    /// a failure is reported to the observer. Must be called from within a
    /// tokio runtime.
    pub async fn submit(&self, query: &str, history: &[ChatTurn], options: &QueryOptions) {
        let ticket = self.begin_submit();
        self.finish_submit(ticket, query, history, options).await;
    }

    /// First half of [`JobPoller::submit`]: abandons whatever is in flight
    /// and makes the new submission current.
    ///
    /// Synchronous so that callers can order it against [`JobPoller::cancel`]
    /// before the network part is scheduled.
    pub fn begin_submit(&self) -> SubmitTicket {
        let mut shared = lock(&self.shared);
        if shared.state == PollerState::Polling {
            if let Some(job_id) = shared.job_id.as_deref() {
                chat_info!(job: job_id; "Superseded by a new submission");
            }
        }
        shared.abandon();
        shared.state = PollerState::Submitting;
        shared.job_id = None;
        SubmitTicket {
            generation: shared.generation,
        }
    }

    /// Second half of [`JobPoller::submit`]. Does nothing observable when the
    /// ticket was superseded or cancelled in the meantime.
    pub async fn finish_submit(
        &self,
        ticket: SubmitTicket,
        query: &str,
        history: &[ChatTurn],
        options: &QueryOptions,
    ) {
        let _gate = self.submit_gate.lock().await;
        let retired = std::mem::take(&mut lock(&self.shared).retired);
        for task in retired {
            let _ = task.await;
        }
        if !self.is_current(ticket) {
            return;
        }

        let outcome = self.api.submit_query(query, history, options).await;

        let mut shared = lock(&self.shared);
        if shared.generation != ticket.generation {
            match &outcome {
                Ok(handle) => {
                    chat_info!(job: handle.job_id; "Submission was cancelled; not polling")
                }
                Err(err) => chat_info!("Dropping failure of a cancelled submission: {}", err),
            }
            return;
        }

        let handle = match outcome {
            Ok(handle) => handle,
            Err(err) => {
                chat_warn!("Query submission failed: {}", err);
                shared.state = PollerState::Failed;
                self.observer.on_error(err);
                return;
            }
        };

        shared.state = PollerState::Polling;
        shared.job_id = Some(handle.job_id.clone());

        let cancel = CancellationToken::new();
        let poll_loop = PollLoop {
            api: self.api.clone(),
            observer: self.observer.clone(),
            shared: self.shared.clone(),
            cancel: cancel.clone(),
            job_id: handle.job_id,
            generation: ticket.generation,
            interval: self.poll_interval,
        };
        let task = tokio::spawn(poll_loop.run());
        shared.active = Some(ActivePoll { cancel, task });
    }

    /// Stops watching the current job, or drops the submission in flight,
    /// without reporting anything.
    ///
    /// The remote job keeps running; only observation stops.
    pub fn cancel(&self) {
        let mut shared = lock(&self.shared);
        shared.abandon();
        if matches!(
            shared.state,
            PollerState::Submitting | PollerState::Polling
        ) {
            shared.state = PollerState::Cancelled;
            match shared.job_id.as_deref() {
                Some(job_id) => chat_info!(job: job_id; "Polling cancelled"),
                None => chat_info!("Submission cancelled"),
            }
        }
    }

    /// Cancels and forgets the current job. Safe to call repeatedly.
    pub fn destroy(&self) {
        self.cancel();
        let mut shared = lock(&self.shared);
        shared.state = PollerState::Idle;
        shared.job_id = None;
    }

    fn is_current(&self, ticket: SubmitTicket) -> bool {
        lock(&self.shared).generation == ticket.generation
    }
}

impl Drop for JobPoller {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct PollLoop {
    api: Arc<dyn QueryApi>,
    observer: Arc<dyn JobObserver>,
    shared: Arc<Mutex<Shared>>,
    cancel: CancellationToken,
    job_id: JobId,
    generation: u64,
    interval: Duration,
}

impl PollLoop {
    async fn run(self) {
        chat_debug!(job: self.job_id; "Polling every {:?}", self.interval);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(self.interval) => {}
            }

            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => return,
                outcome = self.api.job_status(&self.job_id) => outcome,
            };

            if self.deliver(outcome).is_break() {
                return;
            }
        }
    }

    /// Reports one tick's outcome. Runs entirely under the shared lock.
    fn deliver(&self, outcome: Result<Job, ChatError>) -> ControlFlow<()> {
        let mut shared = lock(&self.shared);
        if self.cancel.is_cancelled() || shared.generation != self.generation {
            return ControlFlow::Break(());
        }

        let job = match outcome {
            Ok(job) => job,
            Err(err) => {
                chat_warn!(job: self.job_id; "Status check failed: {}", err);
                shared.state = PollerState::Failed;
                self.observer.on_error(err);
                return ControlFlow::Break(());
            }
        };

        self.observer.on_status(&job);
        match job.status {
            JobStatus::Pending | JobStatus::Processing => ControlFlow::Continue(()),
            JobStatus::Completed => {
                match job.result {
                    Some(result) => {
                        chat_info!(job: self.job_id; "Completed");
                        shared.state = PollerState::Done;
                        self.observer.on_result(result);
                    }
                    None => {
                        chat_warn!(job: self.job_id; "Completed without a result payload");
                        shared.state = PollerState::Failed;
                        self.observer.on_error(ChatError::MalformedResult {
                            job_id: self.job_id.clone(),
                        });
                    }
                }
                ControlFlow::Break(())
            }
            JobStatus::Failed => {
                let message = job
                    .error
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| JOB_FAILED_FALLBACK.to_string());
                chat_info!(job: self.job_id; "Failed: {}", message);
                shared.state = PollerState::Failed;
                self.observer.on_error(ChatError::JobFailed { message });
                ControlFlow::Break(())
            }
        }
    }
}
