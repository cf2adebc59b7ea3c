use std::sync::Once;

use chrono::{DateTime, Duration, TimeZone, Utc};
use circular_core::{
    update, AppState, Effect, Message, Msg, Role, Stamp, Topic, NEW_TOPIC_TITLE,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(circular_logging::initialize_for_tests);
}

fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
}

fn topic(id: &str, title: &str, minutes: i64) -> Topic {
    Topic {
        id: id.to_string(),
        title: title.to_string(),
        created_at: at(minutes),
        updated_at: at(minutes),
    }
}

fn message(id: &str, topic_id: &str, role: Role, content: &str, minutes: i64) -> Message {
    Message {
        id: id.to_string(),
        topic_id: topic_id.to_string(),
        content: content.to_string(),
        role,
        sources: Vec::new(),
        created_at: at(minutes),
    }
}

#[test]
fn topics_loaded_newest_first() {
    init_logging();
    let (mut state, effects) = update(
        AppState::new(),
        Msg::TopicsLoaded(vec![
            topic("old", "Old", 0),
            topic("new", "New", 30),
            topic("mid", "Mid", 10),
        ]),
    );

    let ids: Vec<_> = state.view().topics.into_iter().map(|row| row.id).collect();
    assert_eq!(ids, vec!["new", "mid", "old"]);
    assert!(effects.is_empty());
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());
}

#[test]
fn new_topic_is_selected_and_saved() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::TopicsLoaded(vec![topic("a", "A", 0)]));
    let (state, effects) = update(state, Msg::NewTopicClicked(Stamp::new("t-new", at(5))));

    let expected = topic("t-new", NEW_TOPIC_TITLE, 5);
    assert_eq!(effects, vec![Effect::SaveTopic(expected.clone())]);
    let view = state.view();
    assert_eq!(view.selected_topic_id.as_deref(), Some("t-new"));
    assert_eq!(view.topics[0].id, "t-new");
    assert!(view.topics[0].selected);
    assert!(!view.topics[1].selected);
    assert!(view.messages.is_empty());
}

#[test]
fn selecting_a_topic_loads_its_messages() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::TopicsLoaded(vec![topic("a", "A", 0), topic("b", "B", 1)]),
    );
    let (state, effects) = update(state, Msg::TopicSelected("a".to_string()));
    assert_eq!(
        effects,
        vec![Effect::LoadMessages {
            topic_id: "a".to_string()
        }]
    );

    let (state, _) = update(
        state,
        Msg::MessagesLoaded {
            topic_id: "a".to_string(),
            messages: vec![
                message("m2", "a", Role::Assistant, "second", 2),
                message("m1", "a", Role::User, "first", 1),
            ],
        },
    );
    let contents: Vec<_> = state
        .view()
        .messages
        .into_iter()
        .map(|view| view.content)
        .collect();
    assert_eq!(contents, vec!["first", "second"]);
}

#[test]
fn unknown_topic_selection_is_ignored() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::TopicsLoaded(vec![topic("a", "A", 0)]));
    let (next, effects) = update(state.clone(), Msg::TopicSelected("ghost".to_string()));
    assert_eq!(next, state);
    assert!(effects.is_empty());
}

#[test]
fn messages_for_another_topic_are_ignored() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::TopicsLoaded(vec![topic("a", "A", 0), topic("b", "B", 1)]),
    );
    let (state, _) = update(state, Msg::TopicSelected("b".to_string()));
    let (state, _) = update(
        state,
        Msg::MessagesLoaded {
            topic_id: "a".to_string(),
            messages: vec![message("m1", "a", Role::User, "stale", 1)],
        },
    );
    assert!(state.messages().is_empty());
}

#[test]
fn reloading_topics_drops_a_vanished_selection() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::TopicsLoaded(vec![topic("a", "A", 0)]));
    let (state, _) = update(state, Msg::TopicSelected("a".to_string()));
    let (state, _) = update(state, Msg::TopicsLoaded(vec![topic("b", "B", 1)]));
    assert_eq!(state.selected_topic_id(), None);
}

#[test]
fn source_links_are_labelled_by_file_name() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::TopicsLoaded(vec![topic("a", "A", 0)]));
    let (state, _) = update(state, Msg::TopicSelected("a".to_string()));
    let mut answer = message("m2", "a", Role::Assistant, "see sources", 2);
    answer.sources = vec![
        "https://docs.example.com/circulars/cssf22_806eng.pdf".to_string(),
        "https://docs.example.com/".to_string(),
    ];
    let (state, _) = update(
        state,
        Msg::MessagesLoaded {
            topic_id: "a".to_string(),
            messages: vec![answer],
        },
    );

    let labels: Vec<_> = state.view().messages[0]
        .sources
        .iter()
        .map(|link| link.label.clone())
        .collect();
    assert_eq!(labels, vec!["cssf22_806eng.pdf", "Document"]);
}
