//! Error types for schema, expression and codec operations

use thiserror::Error;

/// Errors raised while building, compiling, encoding or decoding against a schema
///
/// All variants are programmer or schema errors. None of them are retried; they
/// propagate to the caller unchanged.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Path not found: {path}")]
    PathNotFound { path: String },

    #[error("Invalid path segment '{segment}' in {path}")]
    InvalidPathSegment { path: String, segment: String },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Operator '{operator}' is not allowed for {kind} attribute at {path}")]
    IllegalOperatorForAttribute {
        path: String,
        operator: String,
        kind: String,
    },

    #[error("Type mismatch at {path}: expected {expected}, got {found}")]
    ValueTypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("Unknown field '{field}' at {path}")]
    UnknownField { path: String, field: String },

    #[error("List at {path} has no item schema")]
    MissingListItemSchema { path: String },

    #[error("Decode error at {path}: expected {expected} tag, got {found}")]
    DecodeTagMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// A valid store number that does not fit the decimal range of [`Value::Number`]
    /// (28 significant digits, magnitude below about 7.9e28) or of `i128`
    ///
    /// [`Value::Number`]: crate::value::Value::Number
    #[error("Number at {path} is outside the supported range: {value}")]
    NumberOutOfRange { path: String, value: String },

    #[error("Invalid operand at {path}: {message}")]
    InvalidOperand { path: String, message: String },

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl Error {
    pub fn path_not_found(path: impl Into<String>) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    pub fn invalid_segment(path: impl Into<String>, segment: impl Into<String>) -> Self {
        Self::InvalidPathSegment {
            path: path.into(),
            segment: segment.into(),
        }
    }

    pub fn type_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::ValueTypeMismatch {
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn invalid_operand(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOperand {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid_schema(msg: impl Into<String>) -> Self {
        Self::InvalidSchema(msg.into())
    }
}

/// Failures reported by a [`StoreClient`](crate::operation::StoreClient)
///
/// These cover the store's own conditions (throttling, conditional check
/// failures, transport problems). Handling them is the client's business.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{code}: {message}")]
    Service { code: String, message: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

impl StoreError {
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_include_path() {
        let err = Error::type_mismatch("address.zip", "number", "string");
        assert_eq!(
            err.to_string(),
            "Type mismatch at address.zip: expected number, got string"
        );

        let err = Error::invalid_segment("cards.foo", "foo");
        assert!(err.to_string().contains("cards.foo"));
    }

    #[test]
    fn test_store_error_conversion() {
        let err: Error = StoreError::service("ThrottlingException", "slow down").into();
        assert!(matches!(err, Error::Store(StoreError::Service { .. })));
        assert_eq!(err.to_string(), "Store error: ThrottlingException: slow down");
    }
}
