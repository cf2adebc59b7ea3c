#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Topics read from the record store.
    TopicsLoaded(Vec<crate::Topic>),
    /// Messages read from the record store for one topic.
    MessagesLoaded {
        topic_id: crate::TopicId,
        messages: Vec<crate::Message>,
    },
    /// User asked for a fresh conversation.
    NewTopicClicked(crate::Stamp),
    /// User picked a conversation from the topic list.
    TopicSelected(crate::TopicId),
    /// User sent a question in the selected conversation.
    MessageSubmitted {
        content: String,
        stamp: crate::Stamp,
    },
    /// Status snapshot of the job answering the question `query_id`.
    JobStatusChanged {
        query_id: crate::MessageId,
        job_id: String,
        phase: crate::JobPhase,
        progress: Option<String>,
    },
    /// The question `query_id` was answered.
    AnswerReceived {
        query_id: crate::MessageId,
        content: String,
        sources: Vec<String>,
        stamp: crate::Stamp,
    },
    /// The question `query_id` could not be answered.
    QueryFailed {
        query_id: crate::MessageId,
        error: String,
    },
    /// Reading or writing records failed.
    StoreFailed(String),
    /// User stopped waiting for the pending answer.
    CancelClicked,
    /// User closed the error notification.
    ErrorDismissed,
}
