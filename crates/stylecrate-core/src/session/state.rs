//! Session state snapshot and the profile/style records it carries.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// User profile as returned by `userLogin` and `userUpdate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Reference to the style picked by the survey (a style id).
    #[serde(default)]
    pub style_survey: Option<StyleRef>,
}

impl UserDetails {
    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.role.is_none()
            && self.style_survey.is_none()
    }

    /// Copy of this profile with `style_survey` replaced.
    ///
    /// Keeps name, role and email; everything else comes from `style_score`.
    #[must_use]
    pub fn with_style_survey(&self, style_score: impl Into<StyleRef>) -> Self {
        Self {
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
            style_survey: Some(style_score.into()),
        }
    }
}

/// Style id held in `style_survey`.
///
/// Keeps the JSON type it was decoded from, so an integer reference goes
/// back to the server as an `Int` variable and a string one as `String`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleRef {
    Int(i64),
    Text(String),
}

impl fmt::Display for StyleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleRef::Int(n) => write!(f, "{n}"),
            StyleRef::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for StyleRef {
    fn from(n: i64) -> Self {
        StyleRef::Int(n)
    }
}

impl From<u32> for StyleRef {
    fn from(n: u32) -> Self {
        StyleRef::Int(i64::from(n))
    }
}

impl From<&str> for StyleRef {
    fn from(s: &str) -> Self {
        StyleRef::Text(s.to_string())
    }
}

impl From<String> for StyleRef {
    fn from(s: String) -> Self {
        StyleRef::Text(s)
    }
}

impl From<StyleRef> for Value {
    fn from(reference: StyleRef) -> Self {
        match reference {
            StyleRef::Int(n) => Value::from(n),
            StyleRef::Text(s) => Value::String(s),
        }
    }
}

/// Emptiness of an optional profile: absent counts as empty.
pub fn is_empty(user: Option<&UserDetails>) -> bool {
    user.is_none_or(UserDetails::is_empty)
}

/// Style descriptor resolved from `styleById`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// GraphQL IDs arrive as either strings or integers depending on the schema.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
    })
}

/// Authentication/session state.
///
/// Never mutated in place by the store: every event produces a new value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Most recent failure message.
    pub error: Option<String>,
    /// True while a login request is in flight.
    pub is_loading: bool,
    /// Whether the last assigned user was non-empty.
    pub is_authenticated: bool,
    /// Current user profile, `None` when logged out.
    pub details: Option<UserDetails>,
    /// Resolved style, `None` until fetched.
    pub style: Option<Style>,
}

impl SessionState {
    /// The state at application start: everything empty.
    pub fn initial() -> Self {
        Self::default()
    }
}
