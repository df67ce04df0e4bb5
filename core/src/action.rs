//! Actions flowing through the dispatch pipeline.
//!
//! Two shapes exist:
//!
//! - [`Action`]: a plain action, a `type` string plus arbitrary JSON fields.
//!   This is what reducers see.
//! - [`ApiAction`]: an action carrying a [`CallApi`] descriptor. Only the API
//!   middleware knows how to turn it into plain lifecycle actions.
//!
//! [`AnyAction`] is the tagged union the store dispatches. The variant is the
//! marker: there is no reserved field to look up at runtime.
//!
//! # Example
//!
//! ```
//! use call_api_core::action::{Action, AnyAction, ApiAction};
//! use call_api_core::descriptor::CallApi;
//! use serde_json::json;
//!
//! let plain: AnyAction = Action::new("CLEAR_ERROR").into();
//! assert!(plain.is_plain());
//!
//! let fetch = ApiAction::new(CallApi::new(
//!     "albums/123",
//!     ["ALBUM_REQUEST", "ALBUM_SUCCESS", "ALBUM_FAILURE"],
//! ))
//! .with_field("albumId", json!("123"));
//! assert!(!AnyAction::from(fetch).is_plain());
//! ```

use crate::descriptor::CallApi;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field carrying the normalized payload on a success action.
pub const RESPONSE_FIELD: &str = "response";

/// Field carrying the error payload on a failure action.
pub const ERROR_FIELD: &str = "error";

/// A plain action: a type identifier plus free-form JSON fields.
///
/// Serializes flat, the way actions look on the wire:
/// `{"type": "ALBUM_SUCCESS", "albumId": "123", "response": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// The action type identifier.
    #[serde(rename = "type")]
    pub kind: String,

    /// Every other field of the action.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Action {
    /// Create an action with no fields.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: Map::new(),
        }
    }

    /// Create an action from a type and an existing field map.
    #[must_use]
    pub fn with_fields(kind: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            fields,
        }
    }

    /// Add (or replace) a field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The `response` field, present on success lifecycle actions.
    #[must_use]
    pub fn response(&self) -> Option<&Value> {
        self.get(RESPONSE_FIELD)
    }

    /// The `error` field, present on failure lifecycle actions.
    #[must_use]
    pub fn error(&self) -> Option<&Value> {
        self.get(ERROR_FIELD)
    }

    /// Whether this action has the given type.
    #[must_use]
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

/// An action that asks the API middleware to perform a call.
///
/// It has no `type` of its own; the three lifecycle types come from the
/// descriptor. The remaining fields are copied onto every lifecycle action.
#[derive(Debug, Clone)]
pub struct ApiAction {
    /// The API-call descriptor.
    pub call: CallApi,

    /// Fields copied onto each lifecycle action.
    pub fields: Map<String, Value>,
}

impl ApiAction {
    /// Create an API-call action with no extra fields.
    #[must_use]
    pub fn new(call: CallApi) -> Self {
        Self {
            call,
            fields: Map::new(),
        }
    }

    /// Add a field that every lifecycle action will carry.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Build a lifecycle action: the original fields with `type` replaced,
    /// plus an optional extra field (`response` or `error`).
    ///
    /// A `type` key among the original fields is dropped, since the lifecycle
    /// type always wins.
    #[must_use]
    pub fn lifecycle(&self, kind: &str, extra: Option<(&str, Value)>) -> Action {
        let mut fields = self.fields.clone();
        fields.remove("type");
        if let Some((key, value)) = extra {
            fields.insert(key.to_string(), value);
        }
        Action::with_fields(kind, fields)
    }
}

/// Anything that can be dispatched into the pipeline.
#[derive(Debug, Clone)]
pub enum AnyAction {
    /// A plain action, passed through untouched by the API middleware.
    Plain(Action),

    /// An API-call action, expanded into lifecycle actions.
    CallApi(ApiAction),
}

impl AnyAction {
    /// Whether this is a plain action.
    #[must_use]
    pub const fn is_plain(&self) -> bool {
        matches!(self, Self::Plain(_))
    }

    /// Borrow the plain action, if this is one.
    #[must_use]
    pub const fn as_plain(&self) -> Option<&Action> {
        match self {
            Self::Plain(action) => Some(action),
            Self::CallApi(_) => None,
        }
    }
}

impl From<Action> for AnyAction {
    fn from(action: Action) -> Self {
        Self::Plain(action)
    }
}

impl From<ApiAction> for AnyAction {
    fn from(action: ApiAction) -> Self {
        Self::CallApi(action)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn action_serializes_flat_with_type_key() {
        let action = Action::new("ALBUM_SUCCESS").with_field("albumId", json!("123"));

        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value, json!({"type": "ALBUM_SUCCESS", "albumId": "123"}));

        let back: Action = serde_json::from_value(value).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn lifecycle_copies_fields_and_replaces_type() {
        let api = ApiAction::new(CallApi::new("albums/1", ["REQ", "OK", "FAIL"]))
            .with_field("albumId", json!("1"))
            .with_field("type", json!("IGNORED"));

        let request = api.lifecycle("REQ", None);
        assert_eq!(request.kind, "REQ");
        assert_eq!(request.get("albumId"), Some(&json!("1")));
        assert!(request.get("type").is_none());
        assert!(request.response().is_none());

        let success = api.lifecycle("OK", Some((RESPONSE_FIELD, json!({"id": "1"}))));
        assert_eq!(success.response(), Some(&json!({"id": "1"})));
        assert_eq!(success.get("albumId"), Some(&json!("1")));
    }

    #[test]
    fn any_action_variants() {
        let plain: AnyAction = Action::new("PING").into();
        assert!(plain.is_plain());
        assert_eq!(plain.as_plain().map(|a| a.kind.as_str()), Some("PING"));

        let api: AnyAction = ApiAction::new(CallApi::new("x", ["A", "B", "C"])).into();
        assert!(!api.is_plain());
        assert!(api.as_plain().is_none());
    }
}
