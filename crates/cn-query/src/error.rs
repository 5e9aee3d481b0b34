//! # Parse Failures
//!
//! Every failure names what was expected — a violated constraint is never
//! reported as a generic syntax error. All variants translate into a
//! status-400 [`ProtocolError`] at the HTTP boundary.

use cn_core::ProtocolError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown query parameter '{0}'")]
    UnknownParameter(String),

    #[error("unknown property '{property}' in '{parameter}'")]
    UnknownProperty { parameter: String, property: String },

    #[error("expected {expected} value for '{property}', got '{value}'")]
    InvalidValue {
        property: String,
        expected: &'static str,
        value: String,
    },

    #[error("'{property}' takes a single value, got {count} elements")]
    SingleValueExpected { property: String, count: usize },

    #[error("constraint '{constraint}' violated for '{property}': expected {expected}, got '{actual}'")]
    Constraint {
        property: String,
        constraint: &'static str,
        expected: String,
        actual: String,
    },

    #[error("malformed percent-encoding in '{0}'")]
    BadEncoding(String),

    #[error("invalid resource schema: {0}")]
    Schema(String),
}

impl ParseError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownParameter(_) => "unknown.query.parameter",
            Self::UnknownProperty { .. } => "unknown.property",
            Self::InvalidValue { .. } | Self::BadEncoding(_) => "invalid.query.parameter",
            Self::SingleValueExpected { .. } => "invalid.query.parameter",
            Self::Constraint { .. } => "constraint.violation",
            Self::Schema(_) => "invalid.resource.schema",
        }
    }
}

impl From<ParseError> for ProtocolError {
    fn from(err: ParseError) -> Self {
        ProtocolError::new(400, err.code(), &err.to_string())
    }
}
