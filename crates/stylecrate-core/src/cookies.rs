//! The `auth` cookie.
//!
//! Carries `{token, user}` so a server-rendering front end can pick up the
//! session. Stored encoded in its own `ClientStorage` (the cookie file).

use anyhow::{Context, Result};
use cookie::Cookie;
use serde::{Deserialize, Serialize};

use crate::session::UserDetails;
use crate::storage::ClientStorage;

/// Name of the session cookie.
pub const AUTH_COOKIE_NAME: &str = "auth";

/// Payload of the `auth` cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthCookie {
    pub token: String,
    pub user: Option<UserDetails>,
}

/// Builds the `auth` cookie (path `/`).
pub fn auth_cookie(token: &str, user: Option<&UserDetails>) -> Result<Cookie<'static>> {
    let payload = serde_json::to_string(&AuthCookie {
        token: token.to_string(),
        user: user.cloned(),
    })
    .context("Failed to serialize auth cookie")?;

    Ok(Cookie::build((AUTH_COOKIE_NAME, payload)).path("/").build())
}

/// Persists the `auth` cookie in `jar` and returns it.
pub fn set_auth_cookie(
    jar: &dyn ClientStorage,
    token: &str,
    user: Option<&UserDetails>,
) -> Result<Cookie<'static>> {
    let cookie = auth_cookie(token, user)?;
    jar.set_item(AUTH_COOKIE_NAME, &cookie.encoded().to_string())?;
    Ok(cookie)
}

/// Removes the `auth` cookie. Returns whether one was stored.
pub fn remove_auth_cookie(jar: &dyn ClientStorage) -> Result<bool> {
    jar.remove_item(AUTH_COOKIE_NAME)
}

/// Loads and parses the stored `auth` cookie.
pub fn load_auth_cookie(jar: &dyn ClientStorage) -> Result<Option<Cookie<'static>>> {
    let Some(raw) = jar.get_item(AUTH_COOKIE_NAME)? else {
        return Ok(None);
    };
    let cookie = Cookie::parse_encoded(raw).context("Failed to parse stored auth cookie")?;
    Ok(Some(cookie))
}

/// Decodes the payload of an `auth` cookie.
pub fn decode_auth_cookie(cookie: &Cookie<'_>) -> Result<AuthCookie> {
    serde_json::from_str(cookie.value()).context("Failed to decode auth cookie payload")
}

/// Value for a `Cookie` request header (`auth=<encoded>`).
pub fn cookie_header(cookie: &Cookie<'_>) -> String {
    cookie.encoded().stripped().to_string()
}
