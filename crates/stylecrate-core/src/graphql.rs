//! GraphQL request building and response envelopes.
//!
//! Produces the same request shape as the web client's query builder:
//!
//! ```text
//! {"query": "query ($email: String, $password: String) { userLogin (email: $email, password: $password) { user {name, email, role, style_survey}, token } }",
//!  "variables": {"email": "...", "password": "..."}}
//! ```

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Root operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    fn keyword(self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
        }
    }
}

/// A single named field operation with variables and a selection set.
#[derive(Debug, Clone)]
pub struct Operation {
    kind: OperationKind,
    name: String,
    variables: Vec<(String, Value)>,
    fields: Vec<String>,
}

impl Operation {
    pub fn query(name: impl Into<String>) -> Self {
        Self::new(OperationKind::Query, name)
    }

    pub fn mutation(name: impl Into<String>) -> Self {
        Self::new(OperationKind::Mutation, name)
    }

    fn new(kind: OperationKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            variables: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Adds a variable. Variables are declared in insertion order.
    #[must_use]
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.push((name.into(), value.into()));
        self
    }

    /// Adds every entry of a JSON object as a variable.
    #[must_use]
    pub fn variables_from(mut self, object: Map<String, Value>) -> Self {
        self.variables.extend(object);
        self
    }

    /// Adds a selection. Nested selections are written inline, e.g. `user {name, email}`.
    #[must_use]
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders the operation as a POST body.
    pub fn build(&self) -> GraphqlRequest {
        let mut query = String::from(self.kind.keyword());

        if !self.variables.is_empty() {
            let declarations = self
                .variables
                .iter()
                .map(|(name, value)| format!("${name}: {}", graphql_type(value)))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = write!(query, " ({declarations})");
        }

        let _ = write!(query, " {{ {}", self.name);
        if !self.variables.is_empty() {
            let arguments = self
                .variables
                .iter()
                .map(|(name, _)| format!("{name}: ${name}"))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = write!(query, " ({arguments})");
        }
        if !self.fields.is_empty() {
            let _ = write!(query, " {{ {} }}", self.fields.join(", "));
        }
        query.push_str(" }");

        GraphqlRequest {
            query,
            variables: self.variables.iter().cloned().collect(),
        }
    }
}

/// GraphQL scalar type inferred from a JSON value.
fn graphql_type(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "Boolean",
        Value::Number(n) if n.is_f64() => "Float",
        Value::Number(_) => "Int",
        _ => "String",
    }
}

/// POST body of a GraphQL request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphqlRequest {
    pub query: String,
    pub variables: Map<String, Value>,
}

/// Error entry reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GraphqlError {
    pub message: String,
}

/// Response envelope: `{data, errors}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphqlError>>,
}

impl<T> GraphqlResponse<T> {
    /// Message of the first reported error, if any.
    pub fn first_error(&self) -> Option<&str> {
        self.errors
            .as_deref()
            .and_then(<[GraphqlError]>::first)
            .map(|e| e.message.as_str())
    }
}
