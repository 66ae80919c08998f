//! Authentication/session state machine.

pub mod events;
pub mod reducer;
pub mod state;
pub mod store;

pub use events::SessionEvent;
pub use reducer::{transition, transition_raw};
pub use state::{SessionState, Style, StyleRef, UserDetails};
pub use store::{Dispatch, EventLog, SessionStore};
