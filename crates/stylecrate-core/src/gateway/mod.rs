//! Session gateway: GraphQL operations against the Crate API.
//!
//! Each operation is one POST to the API endpoint. Outcomes are turned into
//! `SessionEvent`s and handed to the configured `Dispatch` sink.
//!
//! The gateway keeps no credential of its own. Authenticated operations take
//! `Credentials` from the caller and attach them to that request only.

mod errors;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use reqwest::header::COOKIE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

pub use self::errors::{GatewayError, GatewayErrorKind, RETRY_MESSAGE, STYLE_RETRY_MESSAGE};
use crate::config::{Config, paths};
use crate::cookies;
use crate::graphql::{GraphqlResponse, Operation};
use crate::session::state::string_or_number;
use crate::session::{Dispatch, SessionEvent, Style, StyleRef, UserDetails};
use crate::storage::{ClientStorage, FileStorage, MemoryStorage, TOKEN_KEY, USER_KEY};

/// Selection set requested for the logged-in user.
const USER_FIELDS: &str = "user {name, email, role, style_survey}";

/// Credentials attached to authenticated requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
    cookie: Option<String>,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            cookie: None,
        }
    }

    /// Adds a `Cookie` header value sent alongside the bearer token.
    #[must_use]
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.bearer_auth(&self.token);
        match &self.cookie {
            Some(cookie) => request.header(COOKIE, cookie),
            None => request,
        }
    }
}

/// Input of `userSignup`.
#[derive(Debug, Clone, Serialize)]
pub struct Signup {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Result of `userSignup`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisteredUser {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Entry of `userGenders`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Gender {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    #[serde(rename = "userLogin")]
    user_login: Option<LoginPayload>,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    #[serde(default)]
    user: Option<UserDetails>,
    #[serde(default)]
    token: String,
}

#[derive(Debug, Deserialize)]
struct StyleData {
    #[serde(rename = "styleById")]
    style_by_id: Option<Style>,
}

#[derive(Debug, Deserialize)]
struct UpdateData {
    #[serde(rename = "userUpdate")]
    user_update: Option<UserDetails>,
}

#[derive(Debug, Deserialize)]
struct SignupData {
    #[serde(rename = "userSignup")]
    user_signup: Option<RegisteredUser>,
}

#[derive(Debug, Deserialize)]
struct GendersData {
    #[serde(rename = "userGenders")]
    user_genders: Option<Vec<Gender>>,
}

/// Bridges the session store to the remote API.
pub struct SessionGateway {
    api_url: Url,
    http: reqwest::Client,
    storage: Arc<dyn ClientStorage>,
    cookie_jar: Arc<dyn ClientStorage>,
    dispatcher: Arc<dyn Dispatch>,
}

impl SessionGateway {
    /// Creates a gateway with in-memory storage and no request timeout.
    pub fn new(api_url: Url, dispatcher: Arc<dyn Dispatch>) -> Self {
        Self {
            api_url,
            http: reqwest::Client::new(),
            storage: Arc::new(MemoryStorage::new()),
            cookie_jar: Arc::new(MemoryStorage::new()),
            dispatcher,
        }
    }

    /// Creates a gateway from config: file-backed storage under
    /// `STYLECRATE_HOME` and the configured endpoint and timeout.
    pub fn from_config(config: &Config, dispatcher: Arc<dyn Dispatch>) -> Result<Self> {
        let api_url = config.effective_api_url()?;
        Self::new(api_url, dispatcher)
            .with_storage(
                Arc::new(FileStorage::new(paths::storage_path())),
                Arc::new(FileStorage::new(paths::cookies_path())),
            )
            .with_timeout(config.request_timeout())
    }

    /// Replaces the durable storage and cookie jar.
    #[must_use]
    pub fn with_storage(
        mut self,
        storage: Arc<dyn ClientStorage>,
        cookie_jar: Arc<dyn ClientStorage>,
    ) -> Self {
        self.storage = storage;
        self.cookie_jar = cookie_jar;
        self
    }

    /// Rebuilds the HTTP client with a request timeout (`None` keeps transport defaults).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        self.http = builder.build().context("Failed to build HTTP client")?;
        Ok(self)
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Logs a user in with email and password.
    ///
    /// Dispatches `LoginRequested`, then exactly one `LoginCompleted`. On a
    /// non-empty token the credentials are persisted and `SetUser` is
    /// dispatched before `LoginCompleted`. Returns `Ok(None)` when the server
    /// answered without a token.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Credentials>, GatewayError> {
        self.dispatcher
            .dispatch(SessionEvent::LoginRequested { is_loading: true });

        let operation = Operation::query("userLogin")
            .variable("email", email)
            .variable("password", password)
            .field(USER_FIELDS)
            .field("token");

        let outcome = match self.execute::<LoginData>(&operation, None).await {
            Ok(response) => match response.first_error().map(str::to_owned) {
                Some(message) => Err(GatewayError::application(message)),
                None => response
                    .data
                    .and_then(|data| data.user_login)
                    .ok_or_else(|| {
                        GatewayError::transport(RETRY_MESSAGE, "userLogin missing from response")
                    }),
            },
            Err(err) => Err(err),
        };

        match outcome {
            Ok(LoginPayload { user, token }) => {
                let credentials = if token.is_empty() {
                    None
                } else {
                    let credentials = self.persist_session(&token, user.as_ref());
                    self.dispatcher.dispatch(SessionEvent::SetUser { user });
                    Some(credentials)
                };
                self.dispatcher.dispatch(SessionEvent::LoginCompleted {
                    error: String::new(),
                });
                Ok(credentials)
            }
            Err(err) => {
                tracing::warn!(
                    kind = %err.kind,
                    details = ?err.details,
                    "login failed: {}",
                    err.message
                );
                self.dispatcher.dispatch(SessionEvent::LoginCompleted {
                    error: err.message.clone(),
                });
                Err(err)
            }
        }
    }

    /// Looks up the style referenced by `details.style_survey`.
    ///
    /// HTTP 200 dispatches `StyleScoreFetched`; anything else dispatches
    /// `StyleFetchFailed`.
    pub async fn fetch_style(
        &self,
        details: &UserDetails,
        credentials: Option<&Credentials>,
    ) -> Result<Option<Style>, GatewayError> {
        let operation = Operation::query("styleById")
            .variable("styleId", details.style_survey.clone())
            .field("id")
            .field("description")
            .field("image_url");

        let result = match self.send(&operation, credentials).await {
            Ok(response) if response.status() == StatusCode::OK => response
                .json::<GraphqlResponse<StyleData>>()
                .await
                .map_err(|e| GatewayError::transport(STYLE_RETRY_MESSAGE, e)),
            Ok(response) => {
                let status = response.status();
                tracing::warn!(%status, "unexpected status from styleById");
                Err(GatewayError::transport(
                    STYLE_RETRY_MESSAGE,
                    format!("HTTP {status}"),
                ))
            }
            Err(e) => Err(GatewayError::transport(STYLE_RETRY_MESSAGE, e)),
        };

        match result {
            Ok(body) => {
                let style = body.data.and_then(|data| data.style_by_id);
                self.dispatcher.dispatch(SessionEvent::StyleScoreFetched {
                    error: None,
                    is_loading: false,
                    style: style.clone(),
                });
                Ok(style)
            }
            Err(err) => {
                tracing::warn!(details = ?err.details, "style lookup failed");
                self.dispatcher.dispatch(SessionEvent::StyleFetchFailed {
                    error: err.message.clone(),
                });
                Err(err)
            }
        }
    }

    /// Stores a new style score on the user's profile.
    ///
    /// The optimistic profile is dispatched before the request is sent. The
    /// server's answer is returned but never dispatched.
    pub async fn update_user(
        &self,
        details: &UserDetails,
        style_score: impl Into<StyleRef>,
        credentials: Option<&Credentials>,
    ) -> Result<UserDetails, GatewayError> {
        let optimistic = details.with_style_survey(style_score);
        self.dispatcher.dispatch(SessionEvent::StyleScoreUpdated {
            details: optimistic.clone(),
        });

        let operation = Operation::mutation("userUpdate")
            .variable("name", optimistic.name)
            .variable("email", optimistic.email)
            .variable("role", optimistic.role)
            .variable("style_survey", optimistic.style_survey)
            .field("name, email, role, style_survey");

        let result = self
            .execute::<UpdateData>(&operation, credentials)
            .await
            .and_then(|response| require(response, |data| data.user_update));
        if let Err(err) = &result {
            tracing::warn!(
                kind = %err.kind,
                details = ?err.details,
                "user update failed: {}",
                err.message
            );
        }
        result
    }

    /// Creates an account. No session event is dispatched.
    pub async fn register(&self, signup: &Signup) -> Result<RegisteredUser, GatewayError> {
        let variables = match serde_json::to_value(signup) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(_) => serde_json::Map::new(),
            Err(e) => return Err(GatewayError::transport(RETRY_MESSAGE, e)),
        };
        let operation = Operation::mutation("userSignup")
            .variables_from(variables)
            .field("id")
            .field("name")
            .field("email");

        self.execute::<SignupData>(&operation, None)
            .await
            .and_then(|response| require(response, |data| data.user_signup))
    }

    /// Lists the genders a profile can pick from. No session event is dispatched.
    pub async fn fetch_genders(
        &self,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<Gender>, GatewayError> {
        let operation = Operation::query("userGenders").field("id").field("name");

        self.execute::<GendersData>(&operation, credentials)
            .await
            .and_then(|response| require(response, |data| data.user_genders))
    }

    /// Clears persisted credentials and the `auth` cookie, then dispatches `LoggedOut`.
    ///
    /// Every item is removed even when another removal fails, and
    /// `LoggedOut` is always dispatched. Returns whether any credentials
    /// were stored.
    pub fn logout(&self) -> Result<bool> {
        let cleared = self.clear_session();
        self.dispatcher.dispatch(SessionEvent::LoggedOut);
        cleared
    }

    /// Restores a persisted session.
    ///
    /// With a stored token, dispatches `SetUser` with the stored profile and
    /// returns the credentials to use for later requests.
    pub fn restore(&self) -> Result<Option<Credentials>> {
        let Some(token) = self
            .storage
            .get_item(TOKEN_KEY)?
            .filter(|token| !token.is_empty())
        else {
            return Ok(None);
        };

        let user = match self.storage.get_item(USER_KEY)? {
            Some(raw) => serde_json::from_str::<Option<UserDetails>>(&raw)
                .context("Failed to parse stored user")?,
            None => None,
        };

        let mut credentials = Credentials::new(token);
        if let Some(cookie) = cookies::load_auth_cookie(self.cookie_jar.as_ref())? {
            credentials = credentials.with_cookie(cookies::cookie_header(&cookie));
        }

        self.dispatcher.dispatch(SessionEvent::SetUser { user });
        Ok(Some(credentials))
    }

    /// Replaces the persisted profile of the stored session.
    ///
    /// Rewrites `user` and re-issues the `auth` cookie for the stored token.
    /// No event is dispatched.
    pub fn save_user(&self, user: &UserDetails) -> Result<()> {
        let Some(token) = self
            .storage
            .get_item(TOKEN_KEY)?
            .filter(|token| !token.is_empty())
        else {
            bail!("No stored session to update");
        };

        let user_json = serde_json::to_string(user).context("Failed to serialize user")?;
        self.storage.set_item(USER_KEY, &user_json)?;
        cookies::set_auth_cookie(self.cookie_jar.as_ref(), &token, Some(user))?;
        Ok(())
    }

    /// Writes token, user and `auth` cookie. Failures are logged, not returned.
    fn persist_session(&self, token: &str, user: Option<&UserDetails>) -> Credentials {
        let mut credentials = Credentials::new(token);

        let stored = serde_json::to_string(&user)
            .context("Failed to serialize user")
            .and_then(|user_json| {
                self.storage.set_item(TOKEN_KEY, token)?;
                self.storage.set_item(USER_KEY, &user_json)
            });
        if let Err(e) = stored {
            tracing::warn!("failed to persist session: {e:#}");
        }

        match cookies::set_auth_cookie(self.cookie_jar.as_ref(), token, user) {
            Ok(cookie) => credentials = credentials.with_cookie(cookies::cookie_header(&cookie)),
            Err(e) => tracing::warn!("failed to store auth cookie: {e:#}"),
        }

        credentials
    }

    /// Attempts every removal; the first failure is returned after all ran.
    fn clear_session(&self) -> Result<bool> {
        let removals = [
            self.storage.remove_item(TOKEN_KEY),
            self.storage.remove_item(USER_KEY),
            cookies::remove_auth_cookie(self.cookie_jar.as_ref()),
        ];

        let mut cleared = false;
        let mut first_error = None;
        for removal in removals {
            match removal {
                Ok(had_item) => cleared |= had_item,
                Err(e) => {
                    tracing::warn!("failed to clear session item: {e:#}");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(cleared),
        }
    }

    async fn send(
        &self,
        operation: &Operation,
        credentials: Option<&Credentials>,
    ) -> reqwest::Result<reqwest::Response> {
        tracing::debug!(
            operation = operation.name(),
            authenticated = credentials.is_some(),
            "sending GraphQL request"
        );

        let mut request = self.http.post(self.api_url.clone()).json(&operation.build());
        if let Some(credentials) = credentials {
            request = credentials.apply(request);
        }
        request.send().await
    }

    /// Sends an operation and decodes the envelope. Connection failures,
    /// non-2xx statuses and undecodable bodies are transport errors.
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &Operation,
        credentials: Option<&Credentials>,
    ) -> Result<GraphqlResponse<T>, GatewayError> {
        let response = self
            .send(operation, credentials)
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| GatewayError::transport(RETRY_MESSAGE, e))?;

        response
            .json::<GraphqlResponse<T>>()
            .await
            .map_err(|e| GatewayError::transport(RETRY_MESSAGE, e))
    }
}

/// Extracts the operation payload, surfacing the first server error.
fn require<T, U>(
    response: GraphqlResponse<T>,
    select: impl FnOnce(T) -> Option<U>,
) -> Result<U, GatewayError> {
    if let Some(message) = response.first_error() {
        return Err(GatewayError::application(message));
    }
    response
        .data
        .and_then(select)
        .ok_or_else(|| GatewayError::transport(RETRY_MESSAGE, "response carried no data"))
}
