//! Circular core: pure conversation state machine and view-model helpers.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use state::{
    conversation_history, title_from_message, AppState, HistoryTurn, JobPhase, Message,
    MessageId, PendingQuery, ProcessingStatus, Role, Stamp, Topic, TopicId, NEW_TOPIC_TITLE,
    TITLE_MAX_CHARS,
};
pub use update::update;
pub use view_model::{
    source_label, AppViewModel, MessageView, ProcessingView, SourceLink, TopicRowView,
    FALLBACK_SOURCE_LABEL,
};
