//! CLI command handlers.

pub mod auth;
pub mod config;
pub mod profile;
pub mod survey;

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use stylecrate_core::config::Config;
use stylecrate_core::gateway::{Credentials, SessionGateway};
use stylecrate_core::session::{Dispatch, SessionStore, UserDetails};

/// Session store wired to a gateway backed by the files under `STYLECRATE_HOME`.
pub struct Session {
    pub store: Arc<SessionStore>,
    pub gateway: SessionGateway,
    pub credentials: Option<Credentials>,
}

impl Session {
    /// Starts from the initial state without looking at stored credentials.
    pub fn new(config: &Config) -> Result<Self> {
        let store = Arc::new(SessionStore::new());
        let dispatcher: Arc<dyn Dispatch> = Arc::clone(&store) as Arc<dyn Dispatch>;
        let gateway = SessionGateway::from_config(config, dispatcher)?;
        tracing::debug!(api_url = %gateway.api_url(), "gateway ready");
        Ok(Self {
            store,
            gateway,
            credentials: None,
        })
    }

    /// Starts from the stored session, if any.
    pub fn open(config: &Config) -> Result<Self> {
        let mut session = Self::new(config)?;
        session.credentials = session
            .gateway
            .restore()
            .context("restore stored session")?;
        Ok(session)
    }

    /// Credentials and profile of the logged-in user.
    pub fn require_login(&self) -> Result<(&Credentials, UserDetails)> {
        let Some(credentials) = &self.credentials else {
            bail!("Not logged in. Run `stylecrate login --email <EMAIL>` first.");
        };
        let details = self.store.snapshot().details.unwrap_or_default();
        Ok((credentials, details))
    }
}

/// Reads a password line from stdin, prompting on a terminal.
pub fn read_password() -> Result<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        eprint!("Password: ");
        io::stderr().flush()?;
    }

    let mut input = String::new();
    stdin
        .lock()
        .read_line(&mut input)
        .context("read password from stdin")?;

    let password = input.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Password cannot be empty");
    }
    Ok(password)
}
