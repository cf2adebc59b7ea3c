use crate::{
    conversation_history, AppState, Effect, Message, Msg, ProcessingStatus, Role, Topic,
    NEW_TOPIC_TITLE,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::TopicsLoaded(topics) => {
            state.replace_topics(topics);
            Vec::new()
        }
        Msg::MessagesLoaded { topic_id, messages } => {
            // A late load for a topic the user already left.
            if state.selected_topic_id() == Some(topic_id.as_str()) {
                state.replace_messages(messages);
            }
            Vec::new()
        }
        Msg::NewTopicClicked(stamp) => {
            let topic = Topic {
                id: stamp.id,
                title: NEW_TOPIC_TITLE.to_string(),
                created_at: stamp.at,
                updated_at: stamp.at,
            };
            state.add_topic(topic.clone());
            vec![Effect::SaveTopic(topic)]
        }
        Msg::TopicSelected(topic_id) => {
            if state.topic(&topic_id).is_none() {
                return (state, Vec::new());
            }
            state.select_topic(topic_id.clone());
            vec![Effect::LoadMessages { topic_id }]
        }
        Msg::MessageSubmitted { content, stamp } => {
            let content = content.trim();
            let Some(topic_id) = state.selected_topic_id().map(str::to_owned) else {
                return (state, Vec::new());
            };
            if content.is_empty() || state.is_loading() {
                return (state, Vec::new());
            }

            let history = conversation_history(state.messages());
            let query_id = stamp.id;
            let message = Message {
                id: query_id.clone(),
                topic_id: topic_id.clone(),
                content: content.to_string(),
                role: Role::User,
                sources: Vec::new(),
                created_at: stamp.at,
            };
            state.push_message(message.clone());

            let mut effects = Vec::with_capacity(3);
            effects.push(Effect::SaveMessage(message));
            if let Some(renamed) = state.retitle_from_first_message(&topic_id, content, stamp.at) {
                effects.push(Effect::SaveTopic(renamed));
            }
            state.start_pending(query_id.clone(), topic_id);
            effects.push(Effect::SubmitQuery {
                query_id,
                query: content.to_string(),
                history,
            });
            effects
        }
        Msg::JobStatusChanged {
            query_id,
            job_id,
            phase,
            progress,
        } => {
            state.update_pending_status(
                &query_id,
                ProcessingStatus {
                    job_id,
                    phase,
                    progress,
                },
            );
            Vec::new()
        }
        Msg::AnswerReceived {
            query_id,
            content,
            sources,
            stamp,
        } => {
            let Some(pending) = state.take_pending_for(&query_id) else {
                return (state, Vec::new());
            };
            let message = Message {
                id: stamp.id,
                topic_id: pending.topic_id,
                content,
                role: Role::Assistant,
                sources,
                created_at: stamp.at,
            };
            state.push_message(message.clone());
            vec![Effect::SaveMessage(message)]
        }
        Msg::QueryFailed { query_id, error } => {
            if state.take_pending_for(&query_id).is_some() {
                state.set_error(Some(error));
            }
            Vec::new()
        }
        Msg::StoreFailed(error) => {
            state.set_error(Some(error));
            Vec::new()
        }
        Msg::CancelClicked => match state.take_pending() {
            Some(_) => vec![Effect::CancelQuery],
            None => Vec::new(),
        },
        Msg::ErrorDismissed => {
            state.set_error(None);
            Vec::new()
        }
    };

    (state, effects)
}
