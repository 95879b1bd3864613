//! Error types for each translation stage.

use thiserror::Error;

/// Value coercion failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoerceError {
    #[error("Unsupported value type: {type_name}")]
    UnsupportedValueType { type_name: String },

    #[error("Map keys must be strings, got {key_type}")]
    NonStringKey { key_type: String },
}

/// Statement rendering failure.
///
/// Every variant aborts the whole statement; nothing is rendered partially.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Unsupported value type: {type_name}")]
    UnsupportedValueType { type_name: String },

    #[error("Operator {op} is not supported by {dialect}")]
    UnsupportedOperator { op: String, dialect: String },

    #[error("Malformed predicate tree: {reason}")]
    MalformedPredicateTree { reason: String },

    #[error("Pagination not supported by {dialect}: {reason}")]
    PaginationUnsupported { dialect: String, reason: String },

    #[error("Query has no entity name")]
    MissingEntity,

    #[error("Cannot clear identifier field '{field}'")]
    ImmutableIdentifier { field: String },

    #[error("{statement} statements are not supported by {dialect}")]
    UnsupportedStatement { statement: String, dialect: String },
}

impl RenderError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPredicateTree {
            reason: reason.into(),
        }
    }
}

impl From<CoerceError> for RenderError {
    fn from(err: CoerceError) -> Self {
        match err {
            CoerceError::UnsupportedValueType { type_name } => {
                Self::UnsupportedValueType { type_name }
            }
            CoerceError::NonStringKey { key_type } => Self::MalformedPredicateTree {
                reason: format!("map key must be a string, got {}", key_type),
            },
        }
    }
}

/// Failure reported by a statement executor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecuteError {
    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Unexpected result shape: {0}")]
    UnexpectedShape(String),
}

/// Failure anywhere in compile-then-execute.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Execute(#[from] ExecuteError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_string_key_becomes_malformed_tree() {
        let err: RenderError = CoerceError::NonStringKey {
            key_type: "i32".to_string(),
        }
        .into();

        assert!(matches!(err, RenderError::MalformedPredicateTree { .. }));
        assert!(err.to_string().contains("i32"));
    }

    #[test]
    fn test_unsupported_type_keeps_name() {
        let err: RenderError = CoerceError::UnsupportedValueType {
            type_name: "java.util.UUID".to_string(),
        }
        .into();

        assert_eq!(
            err,
            RenderError::UnsupportedValueType {
                type_name: "java.util.UUID".to_string()
            }
        );
    }
}
