use std::fmt;

use serde::{Deserialize, Serialize};

use crate::comparison;

pub type JobId = String;

/// Remote job lifecycle. Only the remote service moves a job forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "PENDING"),
            JobStatus::Processing => write!(f, "PROCESSING"),
            JobStatus::Completed => write!(f, "COMPLETED"),
            JobStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// One prior exchange sent along with a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user: String,
    pub assistant: String,
}

impl ChatTurn {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }
}

/// Body of `POST /query`.
#[derive(Debug, Serialize)]
pub(crate) struct SubmitRequest<'a> {
    pub query: &'a str,
    pub action: &'static str,
    pub history: &'a [ChatTurn],
    pub max_results: u32,
    pub threshold: f64,
}

/// Response of `POST /query`: the handle used to poll the job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status_url: String,
}

/// Snapshot returned by `GET /status/{jobId}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub result: Option<QueryResult>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub progress: Option<String>,
}

/// Terminal payload of a completed job.
///
/// Either `answer` or `comparison` carries the primary text; both may be
/// present. `comparison` is kept as raw JSON because the service sends it
/// either as an object or as a JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub comparison: Option<serde_json::Value>,
    #[serde(default)]
    pub workflow: Option<String>,
    #[serde(default)]
    pub circular1: Option<String>,
    #[serde(default)]
    pub circular2: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub num_documents_found: Option<u32>,
    #[serde(default)]
    pub num_documents_used: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
}

pub const NO_ANSWER_TEXT: &str = "No answer available";

impl QueryResult {
    /// The text a conversation should show for this result.
    ///
    /// A comparison payload wins over the plain answer. An answer that embeds
    /// a comparison object is rendered as a report when it parses.
    pub fn display_text(&self) -> String {
        if self.comparison.is_some() {
            return comparison::format_comparison_result(self);
        }
        match self.answer.as_deref().map(str::trim) {
            Some(answer) if !answer.is_empty() => {
                if comparison::looks_like_comparison(answer) {
                    if let Some(report) = comparison::extract_comparison(answer) {
                        let (found1, found2) = comparison::extract_circular_ids(answer);
                        let c1 = self.circular1.clone().or(found1);
                        let c2 = self.circular2.clone().or(found2);
                        return comparison::render_comparison_markdown(
                            &report,
                            c1.as_deref(),
                            c2.as_deref(),
                        );
                    }
                }
                answer.to_string()
            }
            _ => NO_ANSWER_TEXT.to_string(),
        }
    }
}

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub version: String,
}
