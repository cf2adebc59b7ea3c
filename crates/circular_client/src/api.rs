use circular_logging::{chat_debug, chat_info, chat_warn};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use crate::types::SubmitRequest;
use crate::{
    ChatError, ChatTurn, ClientSettings, HealthStatus, Job, JobHandle, QueryOptions,
    TransportError, TransportKind,
};

/// Stateless request/response calls against the question-answering service.
///
/// The polling engine and the submit-and-wait path only talk to the service
/// through this trait, so tests can swap in a scripted implementation.
#[async_trait::async_trait]
pub trait QueryApi: Send + Sync {
    /// `POST /query`. A non-success status fails with [`ChatError::Submission`].
    async fn submit_query(
        &self,
        query: &str,
        history: &[ChatTurn],
        options: &QueryOptions,
    ) -> Result<JobHandle, ChatError>;

    /// `GET /status/{job_id}`. A 404 fails with [`ChatError::NotFound`].
    async fn job_status(&self, job_id: &str) -> Result<Job, ChatError>;

    /// `GET /health`.
    async fn health_check(&self) -> Result<HealthStatus, ChatError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestQueryApi {
    base_url: Url,
    client: reqwest::Client,
}

impl ReqwestQueryApi {
    pub fn new(settings: &ClientSettings) -> Result<Self, ChatError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| ChatError::InvalidUrl(format!("{}: {err}", settings.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ChatError::InvalidUrl(settings.base_url.clone()));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(map_reqwest_error)?;

        Ok(Self { base_url, client })
    }

    /// Appends path segments to the base url, escaping each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ChatError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ChatError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl QueryApi for ReqwestQueryApi {
    async fn submit_query(
        &self,
        query: &str,
        history: &[ChatTurn],
        options: &QueryOptions,
    ) -> Result<JobHandle, ChatError> {
        let url = self.endpoint(&["query"])?;
        let body = SubmitRequest {
            query,
            action: "query",
            history,
            max_results: options.resolved_max_results(),
            threshold: options.resolved_threshold(),
        };

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            chat_warn!("Query submission rejected: {}", status);
            return Err(ChatError::Submission {
                status: status.as_u16(),
            });
        }

        let handle: JobHandle = decode_body(response).await?;
        chat_info!(job: handle.job_id; "Submitted query (history_turns={})", history.len());
        Ok(handle)
    }

    async fn job_status(&self, job_id: &str) -> Result<Job, ChatError> {
        let url = self.endpoint(&["status", job_id])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ChatError::NotFound {
                job_id: job_id.to_string(),
            });
        }
        if !status.is_success() {
            return Err(http_status_error(status));
        }

        let job: Job = decode_body(response).await?;
        chat_debug!(job: job_id; "Status {} progress={:?}", job.status, job.progress);
        Ok(job)
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatError> {
        let url = self.endpoint(&["health"])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(http_status_error(status));
        }
        decode_body(response).await
    }
}

async fn decode_body<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ChatError> {
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&bytes).map_err(|err| ChatError::Decode(err.to_string()))
}

fn http_status_error(status: StatusCode) -> ChatError {
    TransportError::new(TransportKind::HttpStatus(status.as_u16()), status.to_string()).into()
}

fn map_reqwest_error(err: reqwest::Error) -> ChatError {
    let kind = if err.is_timeout() {
        TransportKind::Timeout
    } else if err.is_connect() {
        TransportKind::Connect
    } else if err.is_decode() {
        return ChatError::Decode(err.to_string());
    } else {
        TransportKind::Network
    };
    TransportError::new(kind, err.to_string()).into()
}
