//! Compiler error types

use thiserror::Error;

use crate::filter::Operator;

/// Errors surfaced by filter compilation.
///
/// Every variant aborts the whole compile; there are no partial fragments
/// and nothing is retried. The one degradation that is *not* an error —
/// a malformed JSON filter string under [`ParsePolicy::Lenient`] — never
/// reaches this type.
///
/// [`ParsePolicy::Lenient`]: crate::filter::ParsePolicy::Lenient
#[derive(Error, Debug)]
pub enum CompileError {
    /// The filter string was not valid JSON (strict parsing only).
    #[error("Invalid filter JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The decoded value does not match the filter grammar.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Operand arity or type does not fit the operator.
    #[error("Invalid operand for {operator}: {reason}")]
    InvalidOperand { operator: Operator, reason: String },

    /// An operator key outside the supported set.
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("Cannot filter by field {field} on entity {entity}")]
    UnknownField { entity: String, field: String },

    #[error("Unknown relation {relation} on entity {entity}")]
    UnknownRelation { entity: String, relation: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_operator_display() {
        let err = CompileError::UnsupportedOperator("$regex".to_string());
        assert_eq!(err.to_string(), "Unsupported operator: $regex");
    }

    #[test]
    fn invalid_operand_display() {
        let err = CompileError::InvalidOperand {
            operator: Operator::Between,
            reason: "expected exactly 2 elements".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid operand for $between: expected exactly 2 elements"
        );
    }

    #[test]
    fn unknown_relation_display() {
        let err = CompileError::UnknownRelation {
            entity: "user".to_string(),
            relation: "projects".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown relation projects on entity user");
    }

    #[test]
    fn invalid_json_from() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: CompileError = json_err.into();
        assert!(err.to_string().starts_with("Invalid filter JSON:"));
    }
}
