#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SaveTopic(crate::Topic),
    SaveMessage(crate::Message),
    LoadMessages { topic_id: crate::TopicId },
    /// Ask the service. Replies come back tagged with `query_id`.
    SubmitQuery {
        query_id: crate::MessageId,
        query: String,
        history: Vec<crate::HistoryTurn>,
    },
    /// Stop watching the pending job. The remote job is not cancelled.
    CancelQuery,
}
