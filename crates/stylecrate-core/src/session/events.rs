//! Session event types.
//!
//! Every change to the session state is described by a `SessionEvent`.
//! The gateway produces them, the reducer consumes them.
//!
//! Events also have a JSON wire form tagged by `type`, using the action
//! names of the web client (`AUTH/LOGIN_REQUEST`, ...). Decoding a wire
//! action is the only place an unrecognised event can appear.

use serde::{Deserialize, Serialize};

use super::state::{Style, UserDetails};

/// Closed set of events the session store reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// A user was set, either after login or from persisted storage.
    #[serde(rename = "AUTH/SET_USER")]
    SetUser { user: Option<UserDetails> },

    /// A login request started.
    #[serde(rename = "AUTH/LOGIN_REQUEST", rename_all = "camelCase")]
    LoginRequested { is_loading: bool },

    /// A login request finished. Empty `error` means success.
    #[serde(rename = "AUTH/LOGIN_RESPONSE")]
    LoginCompleted { error: String },

    /// Optimistic profile overwrite after the survey was scored.
    #[serde(rename = "GET_STYLE_SCORE")]
    StyleScoreUpdated { details: UserDetails },

    /// Style lookup finished.
    #[serde(rename = "STYLE_SCORE_RESPONSE", rename_all = "camelCase")]
    StyleScoreFetched {
        error: Option<String>,
        is_loading: bool,
        style: Option<Style>,
    },

    /// Style lookup could not complete.
    #[serde(rename = "AUTH/STYLE_SCORE_FAILURE")]
    StyleFetchFailed { error: String },

    /// The user logged out.
    #[serde(rename = "AUTH/LOGOUT")]
    LoggedOut,
}

impl SessionEvent {
    /// Wire name of the event (`type` field).
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::SetUser { .. } => "AUTH/SET_USER",
            SessionEvent::LoginRequested { .. } => "AUTH/LOGIN_REQUEST",
            SessionEvent::LoginCompleted { .. } => "AUTH/LOGIN_RESPONSE",
            SessionEvent::StyleScoreUpdated { .. } => "GET_STYLE_SCORE",
            SessionEvent::StyleScoreFetched { .. } => "STYLE_SCORE_RESPONSE",
            SessionEvent::StyleFetchFailed { .. } => "AUTH/STYLE_SCORE_FAILURE",
            SessionEvent::LoggedOut => "AUTH/LOGOUT",
        }
    }
}
