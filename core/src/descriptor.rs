//! The API-call descriptor and its validation.
//!
//! A [`CallApi`] is usually built with [`CallApi::new`], which is well-formed
//! by construction. Descriptors assembled from loosely typed input (for
//! example decoded from JSON) go through [`CallApi::from_raw`] and are
//! checked by [`CallApi::validate`] when the middleware picks them up.

use crate::schema::Schema;
use serde_json::Value;
use thiserror::Error;

/// A malformed descriptor shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `endpoint` is not a string.
    #[error("Specify a string endpoint URL (got {found})")]
    EndpointNotString {
        /// JSON kind of the value found instead.
        found: &'static str,
    },

    /// `types` is not an array.
    #[error("Expected an array of three action types (got {found})")]
    TypesNotArray {
        /// JSON kind of the value found instead.
        found: &'static str,
    },

    /// `types` is an array, but not of length three.
    #[error("Expected an array of three action types (got {len})")]
    TypesWrongLength {
        /// Actual number of entries.
        len: usize,
    },
}

/// Any reason a descriptor is rejected.
///
/// Shape problems are [`ConfigError`]s; a non-string action type is reported
/// as its own kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// The descriptor is malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// One of the three action types is not a string.
    #[error("Expected action types to be strings (entry {index} is {found})")]
    NonStringType {
        /// Position of the offending entry.
        index: usize,
        /// JSON kind of the entry.
        found: &'static str,
    },
}

/// Human-readable JSON kind, for error messages.
#[must_use]
pub const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The three lifecycle action types, in dispatch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleTypes {
    /// Dispatched synchronously before the network call.
    pub request: String,
    /// Dispatched with `response` when the call succeeds.
    pub success: String,
    /// Dispatched with `error` when the call fails.
    pub failure: String,
}

/// A descriptor that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedCall {
    /// Endpoint, absolute or relative to the base URL.
    pub endpoint: String,
    /// Lifecycle action types.
    pub types: LifecycleTypes,
    /// Optional response schema.
    pub schema: Option<Schema>,
}

/// Declares a remote call: where to go, which actions to emit, and how to
/// reshape the response.
#[derive(Debug, Clone)]
pub struct CallApi {
    endpoint: Value,
    types: Value,
    schema: Option<Schema>,
}

impl CallApi {
    /// Create a descriptor from an endpoint and `[request, success, failure]` types.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, types: [&str; 3]) -> Self {
        Self {
            endpoint: Value::String(endpoint.into()),
            types: Value::Array(types.iter().map(|t| Value::from(*t)).collect()),
            schema: None,
        }
    }

    /// Create a descriptor from untyped values. Checked later by [`Self::validate`].
    #[must_use]
    pub const fn from_raw(endpoint: Value, types: Value) -> Self {
        Self {
            endpoint,
            types,
            schema: None,
        }
    }

    /// Attach a response schema.
    #[must_use]
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// The schema, if any.
    #[must_use]
    pub const fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Check the descriptor's shape.
    ///
    /// The `types` array check and the length check are independent: a
    /// non-array is rejected regardless of any length it might have.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::EndpointNotString`] if `endpoint` is not a string
    /// - [`ConfigError::TypesNotArray`] if `types` is not an array
    /// - [`ConfigError::TypesWrongLength`] if `types` does not hold three entries
    /// - [`DescriptorError::NonStringType`] if an entry of `types` is not a string
    pub fn validate(&self) -> Result<ValidatedCall, DescriptorError> {
        let Value::String(endpoint) = &self.endpoint else {
            return Err(ConfigError::EndpointNotString {
                found: value_kind(&self.endpoint),
            }
            .into());
        };

        let Value::Array(types) = &self.types else {
            return Err(ConfigError::TypesNotArray {
                found: value_kind(&self.types),
            }
            .into());
        };

        if types.len() != 3 {
            return Err(ConfigError::TypesWrongLength { len: types.len() }.into());
        }

        let names = types
            .iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                Value::String(name) => Ok(name.clone()),
                other => Err(DescriptorError::NonStringType {
                    index,
                    found: value_kind(other),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let Ok([request, success, failure]) = <[String; 3]>::try_from(names) else {
            return Err(ConfigError::TypesWrongLength { len: types.len() }.into());
        };

        Ok(ValidatedCall {
            endpoint: endpoint.clone(),
            types: LifecycleTypes {
                request,
                success,
                failure,
            },
            schema: self.schema.clone(),
        })
    }
}
