use chrono::{DateTime, Utc};

use crate::view_model::{AppViewModel, MessageView, ProcessingView, SourceLink, TopicRowView};

pub type TopicId = String;
pub type MessageId = String;

pub const NEW_TOPIC_TITLE: &str = "New Chat";
/// Topics named after their first message keep this many characters.
pub const TITLE_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: TopicId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub topic_id: TopicId,
    pub content: String,
    pub role: Role,
    pub sources: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Identity and creation time for a record created by `update`.
///
/// The shell mints these so that `update` stays deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    pub id: String,
    pub at: DateTime<Utc>,
}

impl Stamp {
    pub fn new(id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self { id: id.into(), at }
    }
}

/// One user question and the assistant reply that followed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTurn {
    pub user: String,
    pub assistant: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingStatus {
    pub job_id: String,
    pub phase: JobPhase,
    pub progress: Option<String>,
}

/// The query in flight. Its answer belongs to `topic_id` even if the user
/// switched topics meanwhile.
///
/// `query_id` is the id of the user message that asked it. Replies tagged
/// with any other id are stale and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    pub query_id: MessageId,
    pub topic_id: TopicId,
    pub status: Option<ProcessingStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    topics: Vec<Topic>,
    selected_topic: Option<TopicId>,
    messages: Vec<Message>,
    pending: Option<PendingQuery>,
    error: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            topics: self
                .topics
                .iter()
                .map(|topic| TopicRowView {
                    id: topic.id.clone(),
                    title: topic.title.clone(),
                    selected: self.selected_topic.as_deref() == Some(topic.id.as_str()),
                })
                .collect(),
            selected_topic_id: self.selected_topic.clone(),
            messages: self
                .messages
                .iter()
                .map(|message| MessageView {
                    id: message.id.clone(),
                    role: message.role,
                    content: message.content.clone(),
                    sources: message.sources.iter().map(|url| SourceLink::new(url)).collect(),
                })
                .collect(),
            loading: self.pending.is_some(),
            processing: self.pending.as_ref().and_then(|pending| {
                pending.status.as_ref().map(|status| ProcessingView {
                    topic_id: pending.topic_id.clone(),
                    job_id: status.job_id.clone(),
                    phase: status.phase,
                    progress: status.progress.clone(),
                })
            }),
            error: self.error.clone(),
            dirty: self.dirty,
        }
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn topic(&self, topic_id: &str) -> Option<&Topic> {
        self.topics.iter().find(|topic| topic.id == topic_id)
    }

    pub fn selected_topic_id(&self) -> Option<&str> {
        self.selected_topic.as_deref()
    }

    /// Messages of the selected topic, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pending(&self) -> Option<&PendingQuery> {
        self.pending.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns whether anything changed since the last call, and resets it.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn replace_topics(&mut self, mut topics: Vec<Topic>) {
        topics.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(selected) = self.selected_topic.as_deref() {
            if !topics.iter().any(|topic| topic.id == selected) {
                self.selected_topic = None;
                self.messages.clear();
            }
        }
        self.topics = topics;
        self.mark_dirty();
    }

    pub(crate) fn replace_messages(&mut self, mut messages: Vec<Message>) {
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        self.messages = messages;
        self.mark_dirty();
    }

    pub(crate) fn add_topic(&mut self, topic: Topic) {
        self.selected_topic = Some(topic.id.clone());
        self.topics.insert(0, topic);
        self.messages.clear();
        self.mark_dirty();
    }

    pub(crate) fn select_topic(&mut self, topic_id: TopicId) {
        self.selected_topic = Some(topic_id);
        self.messages.clear();
        self.mark_dirty();
    }

    /// Appends to the visible conversation when the message belongs to it.
    pub(crate) fn push_message(&mut self, message: Message) {
        if self.selected_topic.as_deref() == Some(message.topic_id.as_str()) {
            self.messages.push(message);
            self.mark_dirty();
        }
    }

    /// Renames a still-untitled topic after its first message.
    pub(crate) fn retitle_from_first_message(
        &mut self,
        topic_id: &str,
        content: &str,
        at: DateTime<Utc>,
    ) -> Option<Topic> {
        let topic = self.topics.iter_mut().find(|topic| topic.id == topic_id)?;
        if topic.title != NEW_TOPIC_TITLE {
            return None;
        }
        topic.title = title_from_message(content);
        topic.updated_at = at;
        let renamed = topic.clone();
        self.mark_dirty();
        Some(renamed)
    }

    pub(crate) fn start_pending(&mut self, query_id: MessageId, topic_id: TopicId) {
        self.pending = Some(PendingQuery {
            query_id,
            topic_id,
            status: None,
        });
        self.error = None;
        self.mark_dirty();
    }

    pub(crate) fn update_pending_status(&mut self, query_id: &str, status: ProcessingStatus) {
        if let Some(pending) = self.pending.as_mut().filter(|current| current.query_id == query_id) {
            if pending.status.as_ref() != Some(&status) {
                pending.status = Some(status);
                self.dirty = true;
            }
        }
    }

    pub(crate) fn take_pending(&mut self) -> Option<PendingQuery> {
        let pending = self.pending.take();
        if pending.is_some() {
            self.mark_dirty();
        }
        pending
    }

    /// Like [`AppState::take_pending`], but only for the query `query_id`.
    pub(crate) fn take_pending_for(&mut self, query_id: &str) -> Option<PendingQuery> {
        match &self.pending {
            Some(pending) if pending.query_id == query_id => self.take_pending(),
            _ => None,
        }
    }

    pub(crate) fn set_error(&mut self, error: Option<String>) {
        if self.error != error {
            self.error = error;
            self.mark_dirty();
        }
    }
}

pub fn title_from_message(content: &str) -> String {
    let content = content.trim();
    if content.chars().count() > TITLE_MAX_CHARS {
        let head: String = content.chars().take(TITLE_MAX_CHARS).collect();
        format!("{head}...")
    } else {
        content.to_string()
    }
}

/// Pairs every user message with the assistant reply directly after it.
pub fn conversation_history(messages: &[Message]) -> Vec<HistoryTurn> {
    messages
        .windows(2)
        .filter_map(|pair| match (pair[0].role, pair[1].role) {
            (Role::User, Role::Assistant) => Some(HistoryTurn {
                user: pair[0].content.clone(),
                assistant: pair[1].content.clone(),
            }),
            _ => None,
        })
        .collect()
}
