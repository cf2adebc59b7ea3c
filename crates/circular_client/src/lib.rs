//! Circular client: query submission, job polling and result formatting for
//! the circulars question-answering service.
mod api;
mod comparison;
mod error;
mod handle;
mod poller;
mod settings;
mod types;
mod wait;

pub use api::{QueryApi, ReqwestQueryApi};
pub use comparison::{
    extract_circular_ids, extract_comparison, format_comparison_result, looks_like_comparison,
    render_comparison_markdown, strip_fences, ComparisonReport, COMPARISON_FIELDS,
    NO_COMPARISON_TEXT,
};
pub use error::{ChatError, TransportError, TransportKind};
pub use handle::ClientHandle;
pub use poller::{
    ChannelObserver, ClientEvent, JobObserver, JobPoller, PollEvent, PollerState,
    SubmissionTag, SubmitTicket, JOB_FAILED_FALLBACK,
};
pub use settings::{
    ClientSettings, PollingOptions, QueryOptions, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_RESULTS,
    DEFAULT_POLL_INTERVAL, DEFAULT_THRESHOLD,
};
pub use types::{ChatTurn, HealthStatus, Job, JobHandle, JobId, JobStatus, QueryResult, NO_ANSWER_TEXT};
pub use wait::{poll_for_completion, submit_and_wait, ProgressFn, SURFACE_ERRORS_WITHIN_LAST};
