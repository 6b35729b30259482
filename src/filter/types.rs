//! Filter AST
//!
//! The normalized form every raw filter is parsed into before SQL
//! generation. Each condition carries exactly one operator; the sugared
//! input forms (bare operands, `null`, multi-operator maps) are resolved
//! by the parser, never here.

use std::fmt;

use serde_json::Value as JsonValue;

use crate::error::CompileError;

/// The closed set of comparison operators.
///
/// Wire spellings use the `$` prefix (`$eq`, `$startsWith`, ...). Keeping
/// this a plain enum makes every dispatch an exhaustive `match`, so adding
/// or removing an operator is a compile-time-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Like,
    Ilike,
    IsNull,
    Between,
    Contains,
    Contained,
    Overlap,
    StartsWith,
    EndsWith,
}

impl Operator {
    /// Parse a `$`-prefixed wire key. Unknown keys return `None`; the
    /// caller turns that into a hard `UnsupportedOperator` error.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "$eq" => Some(Self::Eq),
            "$ne" => Some(Self::Ne),
            "$gt" => Some(Self::Gt),
            "$gte" => Some(Self::Gte),
            "$lt" => Some(Self::Lt),
            "$lte" => Some(Self::Lte),
            "$in" => Some(Self::In),
            "$nin" => Some(Self::Nin),
            "$like" => Some(Self::Like),
            "$ilike" => Some(Self::Ilike),
            "$null" => Some(Self::IsNull),
            "$between" => Some(Self::Between),
            "$contains" => Some(Self::Contains),
            "$contained" => Some(Self::Contained),
            "$overlap" => Some(Self::Overlap),
            "$startsWith" => Some(Self::StartsWith),
            "$endsWith" => Some(Self::EndsWith),
            _ => None,
        }
    }

    /// The wire spelling of this operator.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::In => "$in",
            Self::Nin => "$nin",
            Self::Like => "$like",
            Self::Ilike => "$ilike",
            Self::IsNull => "$null",
            Self::Between => "$between",
            Self::Contains => "$contains",
            Self::Contained => "$contained",
            Self::Overlap => "$overlap",
            Self::StartsWith => "$startsWith",
            Self::EndsWith => "$endsWith",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A primitive operand value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
    Null,
}

impl Scalar {
    /// Returns `None` for arrays and objects, which are not scalars.
    pub(crate) fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::String(s) => Some(Self::String(s.clone())),
            JsonValue::Number(n) => Some(Self::Number(n.clone())),
            JsonValue::Bool(b) => Some(Self::Bool(*b)),
            JsonValue::Null => Some(Self::Null),
            JsonValue::Array(_) | JsonValue::Object(_) => None,
        }
    }

    pub(crate) fn to_json(&self) -> JsonValue {
        match self {
            Self::String(s) => JsonValue::String(s.clone()),
            Self::Number(n) => JsonValue::Number(n.clone()),
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Null => JsonValue::Null,
        }
    }
}

/// Operand of a condition: one scalar, or an ordered list of scalars
/// (required by `$in`, `$nin`, `$between` and the array operators).
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

/// A bare field, or one level of relation traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    Field(String),
    Relation { relation: String, field: String },
}

impl FieldPath {
    /// Split a raw key on `.`. At most one level of traversal is
    /// supported.
    pub(crate) fn parse(raw: &str) -> Result<Self, CompileError> {
        let mut segments = raw.split('.');
        let first = segments.next().unwrap_or_default();
        let second = segments.next();
        if first.is_empty()
            || second.is_some_and(str::is_empty)
            || segments.next().is_some()
        {
            return Err(CompileError::InvalidFilter(format!(
                "invalid field path: {raw}"
            )));
        }
        Ok(match second {
            None => Self::Field(first.to_string()),
            Some(field) => Self::Relation {
                relation: first.to_string(),
                field: field.to_string(),
            },
        })
    }
}

/// A parsed filter tree.
///
/// `Not` always has exactly one child. `And`/`Or` keep their children in
/// input order; the empty cases are resolved at compile time.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Condition {
        path: FieldPath,
        operator: Operator,
        operand: Operand,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_key_round_trip() {
        let all = [
            Operator::Eq,
            Operator::Ne,
            Operator::Gt,
            Operator::Gte,
            Operator::Lt,
            Operator::Lte,
            Operator::In,
            Operator::Nin,
            Operator::Like,
            Operator::Ilike,
            Operator::IsNull,
            Operator::Between,
            Operator::Contains,
            Operator::Contained,
            Operator::Overlap,
            Operator::StartsWith,
            Operator::EndsWith,
        ];
        for op in all {
            assert_eq!(Operator::from_key(op.key()), Some(op));
        }
    }

    #[test]
    fn operator_unknown_key() {
        assert_eq!(Operator::from_key("$regex"), None);
        assert_eq!(Operator::from_key("eq"), None);
    }

    #[test]
    fn scalar_from_json() {
        assert_eq!(
            Scalar::from_json(&serde_json::json!("x")),
            Some(Scalar::String("x".to_string()))
        );
        assert_eq!(Scalar::from_json(&serde_json::json!(null)), Some(Scalar::Null));
        assert_eq!(Scalar::from_json(&serde_json::json!([1])), None);
        assert_eq!(Scalar::from_json(&serde_json::json!({})), None);
    }

    #[test]
    fn field_path_bare() {
        assert_eq!(
            FieldPath::parse("age").unwrap(),
            FieldPath::Field("age".to_string())
        );
    }

    #[test]
    fn field_path_relation() {
        assert_eq!(
            FieldPath::parse("skills.score").unwrap(),
            FieldPath::Relation {
                relation: "skills".to_string(),
                field: "score".to_string(),
            }
        );
    }

    #[test]
    fn field_path_too_deep() {
        assert!(FieldPath::parse("a.b.c").is_err());
        assert!(FieldPath::parse("").is_err());
        assert!(FieldPath::parse(".score").is_err());
        assert!(FieldPath::parse("skills.").is_err());
    }
}
