use circular_core::{update, AppState, Msg};

#[test]
fn dismissing_nothing_is_noop() {
    let state = AppState::new();
    let (next, effects) = update(state.clone(), Msg::ErrorDismissed);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn cancel_without_query_is_noop() {
    let state = AppState::new();
    let (next, effects) = update(state.clone(), Msg::CancelClicked);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}
