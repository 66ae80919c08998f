//! Session store.
//!
//! Holds the current `SessionState` and replaces it on every dispatched
//! event. Readers take snapshots or subscribe to changes.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use super::events::SessionEvent;
use super::reducer::transition;
use super::state::SessionState;

/// Sink for session events.
///
/// The gateway dispatches through this trait so it can run against the
/// real store or anything else that wants to observe events.
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, event: SessionEvent);
}

/// In-memory holder of the session state.
#[derive(Debug)]
pub struct SessionStore {
    state: watch::Sender<SessionState>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Creates a store holding the initial state.
    pub fn new() -> Self {
        Self::with_state(SessionState::initial())
    }

    pub fn with_state(state: SessionState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self { state: tx }
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver notified whenever the state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

impl Dispatch for SessionStore {
    fn dispatch(&self, event: SessionEvent) {
        let kind = event.kind();
        // send_modify holds the write lock, so concurrent dispatches apply in turn.
        self.state.send_modify(|state| *state = transition(state, event));
        tracing::debug!(event = kind, "session event applied");
    }
}

/// Dispatch sink that only records events, in order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<SessionEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.recorded().to_vec()
    }

    /// Replays the recorded events onto the initial state.
    pub fn replay(&self) -> SessionState {
        self.events()
            .into_iter()
            .fold(SessionState::initial(), |state, event| {
                transition(&state, event)
            })
    }

    // Recovers from poisoning so no event is dropped.
    fn recorded(&self) -> MutexGuard<'_, Vec<SessionEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Dispatch for EventLog {
    fn dispatch(&self, event: SessionEvent) {
        self.recorded().push(event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::session::state::UserDetails;

    #[test]
    fn test_store_starts_with_initial_state() {
        let store = SessionStore::new();
        assert_eq!(store.snapshot(), SessionState::initial());
    }

    #[test]
    fn test_dispatch_replaces_snapshot() {
        let store = SessionStore::new();
        let before = store.snapshot();

        store.dispatch(SessionEvent::LoginRequested { is_loading: true });

        let after = store.snapshot();
        assert!(after.is_loading);
        assert!(!before.is_loading);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();

        store.dispatch(SessionEvent::SetUser {
            user: Some(UserDetails {
                name: Some("A".to_string()),
                ..Default::default()
            }),
        });

        rx.changed().await.unwrap();
        assert!(rx.borrow().is_authenticated);
    }

    #[test]
    fn test_concurrent_dispatches_all_apply() {
        let store = Arc::new(SessionStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.dispatch(SessionEvent::LoginRequested { is_loading: true });
                    store.dispatch(SessionEvent::LoginCompleted {
                        error: format!("attempt {i}"),
                    });
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let state = store.snapshot();
        assert!(!state.is_loading);
        assert!(state.error.unwrap().starts_with("attempt "));
    }

    #[test]
    fn test_event_log_records_in_order() {
        let log = EventLog::new();
        log.dispatch(SessionEvent::LoginRequested { is_loading: true });
        log.dispatch(SessionEvent::LoggedOut);

        let kinds: Vec<_> = log.events().iter().map(SessionEvent::kind).collect();
        assert_eq!(kinds, ["AUTH/LOGIN_REQUEST", "AUTH/LOGOUT"]);
        assert_eq!(log.replay(), SessionState::initial());
    }

    #[test]
    fn test_event_log_keeps_recording_after_poison() {
        let log = Arc::new(EventLog::new());
        log.dispatch(SessionEvent::LoginRequested { is_loading: true });

        let poisoner = Arc::clone(&log);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.events.lock().unwrap();
            panic!("poison the event log");
        })
        .join();
        assert!(result.is_err());

        log.dispatch(SessionEvent::LoggedOut);

        let kinds: Vec<_> = log.events().iter().map(SessionEvent::kind).collect();
        assert_eq!(kinds, ["AUTH/LOGIN_REQUEST", "AUTH/LOGOUT"]);
    }
}
