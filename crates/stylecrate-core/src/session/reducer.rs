//! Session reducer.
//!
//! All session state transitions happen here. The store calls
//! `transition(state, event)` and publishes the returned snapshot.
//!
//! Pure: no I/O, no clocks, no randomness.

use serde_json::Value;

use super::events::SessionEvent;
use super::state::{SessionState, is_empty};

/// Computes the next session state for an event.
///
/// Fields not named by the event are carried over unchanged.
pub fn transition(state: &SessionState, event: SessionEvent) -> SessionState {
    match event {
        SessionEvent::SetUser { user } => SessionState {
            is_authenticated: !is_empty(user.as_ref()),
            details: user,
            ..state.clone()
        },
        SessionEvent::LoginRequested { is_loading } => SessionState {
            error: None,
            is_loading,
            ..state.clone()
        },
        SessionEvent::LoginCompleted { error } => SessionState {
            error: Some(error),
            is_loading: false,
            ..state.clone()
        },
        SessionEvent::StyleScoreUpdated { details } => SessionState {
            details: Some(details),
            ..state.clone()
        },
        SessionEvent::StyleScoreFetched {
            error,
            is_loading,
            style,
        } => SessionState {
            error,
            is_loading,
            style,
            ..state.clone()
        },
        SessionEvent::StyleFetchFailed { error } => SessionState {
            error: Some(error),
            is_loading: false,
            ..state.clone()
        },
        // Style survives logout.
        SessionEvent::LoggedOut => SessionState {
            error: None,
            is_loading: false,
            is_authenticated: false,
            details: None,
            style: state.style.clone(),
        },
    }
}

/// Applies an action in its JSON wire form.
///
/// Actions whose `type` is unknown, or whose payload does not decode,
/// leave the state unchanged.
pub fn transition_raw(state: &SessionState, action: &Value) -> SessionState {
    match serde_json::from_value::<SessionEvent>(action.clone()) {
        Ok(event) => transition(state, event),
        Err(err) => {
            let action_type = action.get("type").and_then(Value::as_str).unwrap_or("<none>");
            tracing::debug!(
                action_type,
                error = %err,
                "ignoring unrecognised session action"
            );
            state.clone()
        }
    }
}
