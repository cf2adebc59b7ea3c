use circular_logging::{chat_info, chat_warn};

use crate::{ChatError, ChatTurn, Job, JobStatus, PollingOptions, QueryApi, QueryOptions, QueryResult};

/// Transient failures are retried except within this many final attempts.
pub const SURFACE_ERRORS_WITHIN_LAST: u32 = 3;

pub type ProgressFn<'a> = &'a (dyn Fn(&Job) + Send + Sync);

/// Submits a query and waits for its terminal result.
///
/// Unlike [`crate::JobPoller`], this path tolerates transient status-check
/// failures and gives up after `polling.max_attempts` checks.
pub async fn submit_and_wait(
    api: &dyn QueryApi,
    query: &str,
    history: &[ChatTurn],
    options: &QueryOptions,
    polling: PollingOptions,
    on_progress: Option<ProgressFn<'_>>,
) -> Result<QueryResult, ChatError> {
    let handle = api.submit_query(query, history, options).await?;
    poll_for_completion(api, &handle.job_id, polling, on_progress).await
}

/// Polls `job_id` until it reaches a terminal status or attempts run out.
pub async fn poll_for_completion(
    api: &dyn QueryApi,
    job_id: &str,
    polling: PollingOptions,
    on_progress: Option<ProgressFn<'_>>,
) -> Result<QueryResult, ChatError> {
    let max_attempts = polling.max_attempts;

    for attempt in 1..=max_attempts {
        match api.job_status(job_id).await {
            Ok(job) => {
                if let Some(on_progress) = on_progress {
                    on_progress(&job);
                }
                match job.status {
                    JobStatus::Completed => {
                        chat_info!(job: job_id; "Completed after {} attempts", attempt);
                        return job.result.ok_or_else(|| ChatError::MalformedResult {
                            job_id: job_id.to_string(),
                        });
                    }
                    JobStatus::Failed => {
                        return Err(ChatError::JobFailed {
                            message: job.error.unwrap_or_else(|| "Unknown error".to_string()),
                        });
                    }
                    JobStatus::Pending | JobStatus::Processing => {}
                }
            }
            Err(err) => {
                let near_end = attempt.saturating_add(SURFACE_ERRORS_WITHIN_LAST) > max_attempts;
                if !err.is_transient() || near_end {
                    return Err(err);
                }
                chat_warn!(job: job_id; "Polling attempt {} failed: {}", attempt, err);
            }
        }

        if attempt < max_attempts {
            tokio::time::sleep(polling.poll_interval).await;
        }
    }

    chat_warn!(job: job_id; "Gave up after {} attempts", max_attempts);
    Err(ChatError::Timeout {
        attempts: max_attempts,
    })
}
