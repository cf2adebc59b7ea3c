use chrono::{DateTime, Duration, TimeZone, Utc};
use circular_core::{
    update, AppState, Effect, HistoryTurn, JobPhase, Message, Msg, Role, Stamp, Topic,
    NEW_TOPIC_TITLE,
};

fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
}

fn with_new_topic(id: &str) -> AppState {
    let (state, _) = update(AppState::new(), Msg::NewTopicClicked(Stamp::new(id, at(0))));
    state
}

fn submit(state: AppState, content: &str, id: &str, minutes: i64) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::MessageSubmitted {
            content: content.to_string(),
            stamp: Stamp::new(id, at(minutes)),
        },
    )
}

fn processing(query_id: &str, job_id: &str, progress: &str) -> Msg {
    Msg::JobStatusChanged {
        query_id: query_id.to_string(),
        job_id: job_id.to_string(),
        phase: JobPhase::Processing,
        progress: Some(progress.to_string()),
    }
}

fn failed(query_id: &str, error: &str) -> Msg {
    Msg::QueryFailed {
        query_id: query_id.to_string(),
        error: error.to_string(),
    }
}

fn answer(
    state: AppState,
    query_id: &str,
    content: &str,
    id: &str,
    minutes: i64,
) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::AnswerReceived {
            query_id: query_id.to_string(),
            content: content.to_string(),
            sources: vec!["https://docs.example.com/a.pdf".to_string()],
            stamp: Stamp::new(id, at(minutes)),
        },
    )
}

#[test]
fn first_message_names_the_topic_and_submits() {
    let state = with_new_topic("t1");
    let (state, effects) = submit(state, "  What does CSSF 22/806 require?  ", "m1", 1);

    let user = Message {
        id: "m1".to_string(),
        topic_id: "t1".to_string(),
        content: "What does CSSF 22/806 require?".to_string(),
        role: Role::User,
        sources: Vec::new(),
        created_at: at(1),
    };
    let renamed = Topic {
        id: "t1".to_string(),
        title: "What does CSSF 22/806 require?".to_string(),
        created_at: at(0),
        updated_at: at(1),
    };
    assert_eq!(
        effects,
        vec![
            Effect::SaveMessage(user),
            Effect::SaveTopic(renamed),
            Effect::SubmitQuery {
                query_id: "m1".to_string(),
                query: "What does CSSF 22/806 require?".to_string(),
                history: Vec::new(),
            },
        ]
    );
    assert!(state.is_loading());
    assert!(state.view().loading);
    assert_eq!(state.view().messages.len(), 1);
}

#[test]
fn long_first_message_is_truncated_in_the_title() {
    let state = with_new_topic("t1");
    let long = "a".repeat(80);
    let (state, _) = submit(state, &long, "m1", 1);
    assert_eq!(state.topics()[0].title, format!("{}...", "a".repeat(50)));
}

#[test]
fn named_topic_keeps_its_title() {
    let state = with_new_topic("t1");
    let (state, _) = submit(state, "first question", "m1", 1);
    let (state, _) = answer(state, "m1", "first answer", "m2", 2);
    let (state, effects) = submit(state, "second question", "m3", 3);

    assert_eq!(state.topics()[0].title, "first question");
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::SaveTopic(_))));
}

#[test]
fn history_pairs_previous_turns() {
    let state = with_new_topic("t1");
    let (state, _) = submit(state, "q1", "m1", 1);
    let (state, _) = answer(state, "m1", "a1", "m2", 2);
    let (state, _) = submit(state, "q2", "m3", 3);
    let (state, _) = answer(state, "m3", "a2", "m4", 4);
    let (_state, effects) = submit(state, "q3", "m5", 5);

    let history = effects
        .into_iter()
        .find_map(|effect| match effect {
            Effect::SubmitQuery { history, .. } => Some(history),
            _ => None,
        })
        .expect("submit effect");
    assert_eq!(
        history,
        vec![
            HistoryTurn {
                user: "q1".to_string(),
                assistant: "a1".to_string()
            },
            HistoryTurn {
                user: "q2".to_string(),
                assistant: "a2".to_string()
            },
        ]
    );
}

#[test]
fn submission_is_ignored_when_blank_pending_or_unselected() {
    let (state, effects) = submit(AppState::new(), "no topic", "m0", 0);
    assert!(effects.is_empty());
    assert!(!state.is_loading());

    let state = with_new_topic("t1");
    let (state, effects) = submit(state, "   ", "m1", 1);
    assert!(effects.is_empty());

    let (state, _) = submit(state, "real question", "m2", 2);
    let (state, effects) = submit(state, "impatient follow-up", "m3", 3);
    assert!(effects.is_empty());
    assert_eq!(state.messages().len(), 1);
}

#[test]
fn answer_is_saved_with_sources_and_clears_loading() {
    let state = with_new_topic("t1");
    let (state, _) = submit(state, "q", "m1", 1);
    let (state, effects) = answer(state, "m1", "the answer", "m2", 2);

    assert!(!state.is_loading());
    let saved = match effects.as_slice() {
        [Effect::SaveMessage(message)] => message.clone(),
        other => panic!("unexpected effects {other:?}"),
    };
    assert_eq!(saved.role, Role::Assistant);
    assert_eq!(saved.topic_id, "t1");
    assert_eq!(saved.sources, vec!["https://docs.example.com/a.pdf"]);
    let view = state.view();
    assert_eq!(view.messages[1].content, "the answer");
    assert_eq!(view.messages[1].sources[0].label, "a.pdf");
}

#[test]
fn answer_lands_in_the_topic_it_was_asked_from() {
    let state = with_new_topic("t1");
    let (state, _) = submit(state, "q", "m1", 1);
    let (state, _) = update(state, Msg::NewTopicClicked(Stamp::new("t2", at(2))));
    let (state, effects) = answer(state, "m1", "late answer", "m2", 3);

    assert!(state.messages().is_empty());
    assert!(matches!(
        effects.as_slice(),
        [Effect::SaveMessage(message)] if message.topic_id == "t1"
    ));
}

#[test]
fn stray_answer_without_pending_query_is_dropped() {
    let state = with_new_topic("t1");
    let (next, effects) = answer(state.clone(), "m1", "nobody asked", "m9", 9);
    assert!(effects.is_empty());
    assert!(next.messages().is_empty());
}

#[test]
fn status_changes_are_shown_while_pending() {
    let state = with_new_topic("t1");
    let (state, _) = submit(state, "q", "m1", 1);
    let (mut state, _) = update(state, processing("m1", "job-1", "Searching documents"));

    let processing = state.view().processing.expect("processing");
    assert_eq!(processing.job_id, "job-1");
    assert_eq!(processing.phase, JobPhase::Processing);
    assert_eq!(processing.progress.as_deref(), Some("Searching documents"));
    assert!(state.consume_dirty());

    let (mut state, _) = update(state, crate::processing("m1", "job-1", "Searching documents"));
    assert!(!state.consume_dirty());
}

#[test]
fn failure_raises_one_notification_until_dismissed() {
    let state = with_new_topic("t1");
    let (state, _) = submit(state, "q", "m1", 1);
    let (state, effects) = update(state, failed("m1", "Job failed"));

    assert!(effects.is_empty());
    assert!(!state.is_loading());
    assert_eq!(state.error(), Some("Job failed"));

    let (state, _) = update(state, failed("m1", "again"));
    assert_eq!(state.error(), Some("Job failed"));

    let (state, _) = update(state, Msg::ErrorDismissed);
    assert_eq!(state.view().error, None);
}

#[test]
fn new_submission_clears_a_previous_error() {
    let state = with_new_topic("t1");
    let (state, _) = update(state, Msg::StoreFailed("disk full".to_string()));
    assert_eq!(state.error(), Some("disk full"));
    let (state, _) = submit(state, "q", "m1", 1);
    assert_eq!(state.error(), None);
}

#[test]
fn cancel_stops_waiting() {
    let state = with_new_topic("t1");
    let (state, _) = submit(state, "q", "m1", 1);
    let (state, effects) = update(state, Msg::CancelClicked);
    assert_eq!(effects, vec![Effect::CancelQuery]);
    assert!(!state.is_loading());

    let (state, effects) = update(state, Msg::CancelClicked);
    assert!(effects.is_empty());

    let (state, _) = answer(state, "m1", "too late", "m2", 2);
    assert_eq!(state.messages().len(), 1);
    assert_eq!(state.topics()[0].title, "q");
    assert_ne!(state.topics()[0].title, NEW_TOPIC_TITLE);
}

#[test]
fn late_failure_of_a_cancelled_query_does_not_touch_the_next_one() {
    let state = with_new_topic("t1");
    let (state, _) = submit(state, "first", "m1", 1);
    let (state, _) = update(state, Msg::CancelClicked);
    let (state, effects) = submit(state, "second", "m2", 2);
    assert!(matches!(
        effects.last(),
        Some(Effect::SubmitQuery { query_id, .. }) if query_id == "m2"
    ));

    let (state, effects) = update(state, failed("m1", "Query submission failed (503)"));
    assert!(effects.is_empty());
    assert!(state.is_loading());
    assert_eq!(state.error(), None);
    assert_eq!(state.pending().map(|p| p.query_id.as_str()), Some("m2"));

    let (state, effects) = answer(state, "m2", "second answer", "m3", 3);
    assert_eq!(effects.len(), 1);
    assert!(!state.is_loading());
    assert_eq!(state.messages().len(), 3);
}

#[test]
fn status_of_another_query_does_not_overwrite_the_current_one() {
    let state = with_new_topic("t1");
    let (state, _) = submit(state, "first", "m1", 1);
    let (state, _) = update(state, Msg::CancelClicked);
    let (state, _) = submit(state, "second", "m2", 2);
    let (mut state, _) = update(state, processing("m2", "j2", "Ranking"));
    assert!(state.consume_dirty());

    let (mut state, effects) = update(state, processing("m1", "j1", "Searching documents"));
    assert!(effects.is_empty());
    assert!(!state.consume_dirty());
    let shown = state.view().processing.expect("processing");
    assert_eq!(shown.job_id, "j2");
    assert_eq!(shown.progress.as_deref(), Some("Ranking"));

    let (state, effects) = answer(state, "m1", "stale answer", "m9", 9);
    assert!(effects.is_empty());
    assert!(state.is_loading());
    assert_eq!(state.messages().len(), 2);
}
