use chrono::Utc;
use circular_client::{
    ChatError, ChatTurn, ClientEvent, ClientHandle, JobStatus, PollEvent, QueryOptions,
    QueryResult,
};
use circular_core::{Effect, JobPhase, Msg, Stamp};
use circular_logging::{chat_error, chat_info, chat_warn};
use uuid::Uuid;

use super::store::LocalStore;

pub const FAILED_RESPONSE_TEXT: &str = "Failed to get response";

/// Executes effects against the record store and the query client, and turns
/// client events back into messages.
pub struct EffectRunner {
    client: ClientHandle,
    store: LocalStore,
    options: QueryOptions,
}

impl EffectRunner {
    pub fn new(client: ClientHandle, store: LocalStore, options: QueryOptions) -> Self {
        Self {
            client,
            store,
            options,
        }
    }

    pub fn load_topics(&self) -> Msg {
        Msg::TopicsLoaded(self.store.topics())
    }

    /// Runs `effects` in order and returns the messages they produced.
    pub fn run(&mut self, effects: Vec<Effect>) -> Vec<Msg> {
        let mut follow_ups = Vec::new();
        for effect in effects {
            match effect {
                Effect::SaveTopic(topic) => {
                    if let Err(err) = self.store.upsert_topic(&topic) {
                        chat_error!("Saving topic {} failed: {}", topic.id, err);
                        follow_ups.push(Msg::StoreFailed("Failed to save chat".to_string()));
                    }
                }
                Effect::SaveMessage(message) => {
                    if let Err(err) = self.store.insert_message(&message) {
                        chat_error!("Saving message {} failed: {}", message.id, err);
                        follow_ups.push(Msg::StoreFailed("Failed to save message".to_string()));
                    }
                }
                Effect::LoadMessages { topic_id } => {
                    let messages = self.store.messages(&topic_id);
                    follow_ups.push(Msg::MessagesLoaded { topic_id, messages });
                }
                Effect::SubmitQuery {
                    query_id,
                    query,
                    history,
                } => {
                    chat_info!(
                        "Submitting query {} len={} history_turns={}",
                        query_id,
                        query.len(),
                        history.len()
                    );
                    let history = history
                        .into_iter()
                        .map(|turn| ChatTurn::new(turn.user, turn.assistant))
                        .collect();
                    self.client.submit(query_id, query, history, self.options);
                }
                Effect::CancelQuery => {
                    chat_info!("Cancelling the pending query");
                    self.client.cancel();
                }
            }
        }
        follow_ups
    }

    pub fn drain_events(&self) -> Vec<Msg> {
        let mut msgs = Vec::new();
        while let Some(event) = self.client.try_recv() {
            msgs.push(poll_event_to_msg(event, new_stamp()));
        }
        msgs
    }

    pub fn check_health(&self) {
        match self.client.health_check() {
            Ok(health) => chat_info!(
                "Service status={} version={} at {}",
                health.status,
                health.version,
                health.timestamp
            ),
            Err(err) => chat_warn!("Health check failed: {}", err),
        }
    }
}

pub fn new_stamp() -> Stamp {
    Stamp::new(Uuid::new_v4().to_string(), Utc::now())
}

/// Maps a client event to a message for the query it was tagged with.
pub fn poll_event_to_msg(event: ClientEvent, stamp: Stamp) -> Msg {
    let query_id = event.submission;
    match event.event {
        PollEvent::Status(job) => Msg::JobStatusChanged {
            query_id,
            job_id: job.job_id,
            phase: map_phase(job.status),
            progress: job.progress,
        },
        PollEvent::Result(result) if is_unsuccessful(&result) => {
            chat_warn!("Service reported an unsuccessful result: {:?}", result.error);
            Msg::QueryFailed {
                query_id,
                error: result
                    .error
                    .unwrap_or_else(|| FAILED_RESPONSE_TEXT.to_string()),
            }
        }
        PollEvent::Result(result) => Msg::AnswerReceived {
            query_id,
            content: result.display_text(),
            sources: result.sources,
            stamp,
        },
        PollEvent::Error(ChatError::JobFailed { message }) => Msg::QueryFailed {
            query_id,
            error: message,
        },
        PollEvent::Error(err) => Msg::QueryFailed {
            query_id,
            error: err.to_string(),
        },
    }
}

/// A result counts as failed when the service says so and either explains
/// why or sent nothing to show.
fn is_unsuccessful(result: &QueryResult) -> bool {
    let has_text = result
        .answer
        .as_deref()
        .is_some_and(|answer| !answer.trim().is_empty())
        || result.comparison.is_some();
    !result.success && (result.error.is_some() || !has_text)
}

fn map_phase(status: JobStatus) -> JobPhase {
    match status {
        JobStatus::Pending => JobPhase::Pending,
        JobStatus::Processing => JobPhase::Processing,
        JobStatus::Completed => JobPhase::Completed,
        JobStatus::Failed => JobPhase::Failed,
    }
}
