//! Filter parsing and normalization
//!
//! Turns a raw filter value (already-structured JSON, or a JSON-encoded
//! string of the same shape) into a [`Filter`] tree. All the input sugar
//! is resolved here:
//!
//! - a bare operand (`{"age": 18}`) becomes `$eq`;
//! - a `null` operand becomes `{"$null": true}`;
//! - an operator map with several keys (`{"age": {"$gt": 1, "$lt": 9}}`)
//!   fans out into an explicit `$and`;
//! - an object with several keys at one level is the `$and` of its
//!   entries.

use serde_json::Value as JsonValue;

use crate::error::CompileError;
use crate::filter::types::{FieldPath, Filter, Operand, Operator, Scalar};

/// What to do when a filter *string* is not decodable JSON.
///
/// The lenient mode is the historical contract of the original API: a
/// garbled filter quietly degrades to an unfiltered query. Callers that
/// would rather reject the request opt into [`ParsePolicy::Strict`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParsePolicy {
    /// Undecodable filter strings compile to "match everything".
    #[default]
    Lenient,
    /// Undecodable filter strings fail with [`CompileError::InvalidJson`].
    Strict,
}

/// Parse a raw filter value. `Ok(None)` means "no filter".
pub fn parse_filter(
    raw: &JsonValue,
    policy: ParsePolicy,
) -> Result<Option<Filter>, CompileError> {
    match raw {
        JsonValue::Null => Ok(None),
        JsonValue::String(s) => parse_filter_str(s, policy),
        JsonValue::Object(map) if map.is_empty() => Ok(None),
        JsonValue::Object(map) => parse_object(map, policy).map(Some),
        other => Err(CompileError::InvalidFilter(format!(
            "expected a filter object, got {}",
            type_name(other)
        ))),
    }
}

/// Parse a JSON-encoded filter string. `Ok(None)` means "no filter".
pub fn parse_filter_str(
    raw: &str,
    policy: ParsePolicy,
) -> Result<Option<Filter>, CompileError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let decoded: JsonValue = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            return match policy {
                ParsePolicy::Lenient => {
                    tracing::debug!(error = %err, "filter string is not valid JSON, treating as unfiltered");
                    Ok(None)
                }
                ParsePolicy::Strict => Err(err.into()),
            };
        }
    };
    match &decoded {
        JsonValue::Null => Ok(None),
        JsonValue::Object(map) if map.is_empty() => Ok(None),
        JsonValue::Object(map) => parse_object(map, policy).map(Some),
        // Decoded but not a filter object; a nested string is not
        // re-decoded.
        other => match policy {
            ParsePolicy::Lenient => {
                tracing::debug!(got = type_name(other), "decoded filter is not an object, treating as unfiltered");
                Ok(None)
            }
            ParsePolicy::Strict => Err(CompileError::InvalidFilter(format!(
                "expected a filter object, got {}",
                type_name(other)
            ))),
        },
    }
}

fn parse_object(
    map: &serde_json::Map<String, JsonValue>,
    policy: ParsePolicy,
) -> Result<Filter, CompileError> {
    let mut entries = Vec::with_capacity(map.len());
    for (key, value) in map {
        match key.as_str() {
            "$and" => {
                if let Some(children) = parse_children(key, value, policy)? {
                    entries.push(Filter::And(children));
                }
            }
            "$or" => {
                if let Some(children) = parse_children(key, value, policy)? {
                    entries.push(Filter::Or(children));
                }
            }
            "$not" => {
                // A lenient-degraded child leaves nothing to negate.
                if let Some(child) = parse_child(value, policy)? {
                    entries.push(Filter::Not(Box::new(child)));
                }
            }
            key if key.starts_with('$') => {
                return Err(CompileError::UnsupportedOperator(key.to_string()));
            }
            key => {
                let path = FieldPath::parse(key)?;
                entries.extend(parse_condition(path, value)?);
            }
        }
    }
    if entries.len() == 1 {
        return Ok(entries.swap_remove(0));
    }
    Ok(Filter::And(entries))
}

/// Parse the child list of `$and`/`$or`. Children degraded away by
/// lenient parsing are dropped; a combinator that loses *all* of its
/// children degrades to no filter (`None`), so a garbled `$or` matches
/// everything instead of flipping to match nothing. An explicitly empty
/// child list stays `Some(vec![])`.
fn parse_children(
    combinator: &str,
    value: &JsonValue,
    policy: ParsePolicy,
) -> Result<Option<Vec<Filter>>, CompileError> {
    let JsonValue::Array(raw_children) = value else {
        return Err(CompileError::InvalidFilter(format!(
            "{combinator} expects an array of filters"
        )));
    };
    let mut children = Vec::with_capacity(raw_children.len());
    for raw_child in raw_children {
        if let Some(child) = parse_child(raw_child, policy)? {
            children.push(child);
        }
    }
    if children.is_empty() && !raw_children.is_empty() {
        tracing::debug!(combinator, "all children degraded, treating as unfiltered");
        return Ok(None);
    }
    Ok(Some(children))
}

/// A nested filter: an object, or a JSON-encoded string of one.
fn parse_child(
    value: &JsonValue,
    policy: ParsePolicy,
) -> Result<Option<Filter>, CompileError> {
    match value {
        JsonValue::Object(map) if map.is_empty() => Ok(None),
        JsonValue::Object(map) => parse_object(map, policy).map(Some),
        JsonValue::String(s) => parse_filter_str(s, policy),
        other => Err(CompileError::InvalidFilter(format!(
            "expected a nested filter object, got {}",
            type_name(other)
        ))),
    }
}

/// Normalize one field entry into single-operator conditions.
fn parse_condition(
    path: FieldPath,
    value: &JsonValue,
) -> Result<Vec<Filter>, CompileError> {
    match value {
        // {"field": null}  ==  {"field": {"$null": true}}
        JsonValue::Null => Ok(vec![Filter::Condition {
            path,
            operator: Operator::IsNull,
            operand: Operand::Scalar(Scalar::Bool(true)),
        }]),
        JsonValue::Object(op_map) => {
            if op_map.is_empty() {
                return Err(CompileError::InvalidFilter(format!(
                    "no operator given for field path {path:?}"
                )));
            }
            let mut conditions = Vec::with_capacity(op_map.len());
            for (op_key, op_value) in op_map {
                let Some(operator) = Operator::from_key(op_key) else {
                    return Err(CompileError::UnsupportedOperator(op_key.clone()));
                };
                conditions.push(Filter::Condition {
                    path: path.clone(),
                    operator,
                    operand: parse_operand(operator, op_value)?,
                });
            }
            Ok(conditions)
        }
        JsonValue::Array(_) => Err(CompileError::InvalidFilter(
            "an array operand requires an explicit operator".to_string(),
        )),
        // Bare scalar is sugar for $eq.
        scalar => {
            let scalar = Scalar::from_json(scalar).ok_or_else(|| {
                CompileError::InvalidFilter("expected a primitive operand".to_string())
            })?;
            Ok(vec![Filter::Condition {
                path,
                operator: Operator::Eq,
                operand: Operand::Scalar(scalar),
            }])
        }
    }
}

fn parse_operand(operator: Operator, value: &JsonValue) -> Result<Operand, CompileError> {
    match value {
        JsonValue::Array(items) => {
            let mut scalars = Vec::with_capacity(items.len());
            for item in items {
                let Some(scalar) = Scalar::from_json(item) else {
                    return Err(CompileError::InvalidOperand {
                        operator,
                        reason: "list elements must be primitives".to_string(),
                    });
                };
                scalars.push(scalar);
            }
            Ok(Operand::List(scalars))
        }
        JsonValue::Object(_) => Err(CompileError::InvalidOperand {
            operator,
            reason: "operand must be a primitive or a list of primitives".to_string(),
        }),
        scalar => {
            let scalar = Scalar::from_json(scalar).ok_or_else(|| CompileError::InvalidOperand {
                operator,
                reason: "operand must be a primitive or a list of primitives".to_string(),
            })?;
            Ok(Operand::Scalar(scalar))
        }
    }
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: serde_json::Value) -> Option<Filter> {
        parse_filter(&value, ParsePolicy::Lenient).unwrap()
    }

    #[test]
    fn absent_filter() {
        assert_eq!(parse(json!(null)), None);
        assert_eq!(parse(json!({})), None);
        assert_eq!(parse_filter_str("", ParsePolicy::Lenient).unwrap(), None);
        assert_eq!(parse_filter_str("  ", ParsePolicy::Lenient).unwrap(), None);
    }

    #[test]
    fn bare_scalar_is_eq() {
        let filter = parse(json!({"age": 18})).unwrap();
        assert_eq!(
            filter,
            Filter::Condition {
                path: FieldPath::Field("age".to_string()),
                operator: Operator::Eq,
                operand: Operand::Scalar(Scalar::Number(18.into())),
            }
        );
    }

    #[test]
    fn null_operand_is_null_check() {
        let filter = parse(json!({"email": null})).unwrap();
        assert_eq!(
            filter,
            Filter::Condition {
                path: FieldPath::Field("email".to_string()),
                operator: Operator::IsNull,
                operand: Operand::Scalar(Scalar::Bool(true)),
            }
        );
    }

    #[test]
    fn multi_operator_map_fans_out_to_and() {
        let fanned = parse(json!({"age": {"$gt": 1, "$lt": 9}})).unwrap();
        let explicit = parse(json!({
            "$and": [{"age": {"$gt": 1}}, {"age": {"$lt": 9}}]
        }))
        .unwrap();
        assert_eq!(fanned, explicit);
    }

    #[test]
    fn sibling_field_keys_fan_out_to_and() {
        let filter = parse(json!({"age": 18, "name": "Ada"})).unwrap();
        let Filter::And(children) = filter else {
            panic!("expected an $and");
        };
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn string_form_matches_structured_form() {
        let structured = parse(json!({"age": {"$gt": 18}}));
        let stringly = parse(json!(r#"{"age":{"$gt":18}}"#));
        assert_eq!(structured, stringly);
        assert!(structured.is_some());
    }

    #[test]
    fn lenient_policy_degrades_bad_json() {
        assert_eq!(parse_filter_str("not json", ParsePolicy::Lenient).unwrap(), None);
        assert_eq!(parse(json!("not json")), None);
    }

    #[test]
    fn strict_policy_rejects_bad_json() {
        let err = parse_filter_str("not json", ParsePolicy::Strict).unwrap_err();
        assert!(matches!(err, CompileError::InvalidJson(_)));
    }

    #[test]
    fn strict_policy_rejects_non_object_string() {
        let err = parse_filter_str("42", ParsePolicy::Strict).unwrap_err();
        assert!(matches!(err, CompileError::InvalidFilter(_)));
    }

    #[test]
    fn unknown_combinator_is_unsupported() {
        let err = parse_filter(&json!({"$xor": []}), ParsePolicy::Lenient).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedOperator(key) if key == "$xor"));
    }

    #[test]
    fn unknown_operator_is_unsupported() {
        let err =
            parse_filter(&json!({"age": {"$regex": ".*"}}), ParsePolicy::Lenient).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedOperator(key) if key == "$regex"));
    }

    #[test]
    fn logical_combinator_requires_array() {
        let err = parse_filter(&json!({"$or": {"age": 1}}), ParsePolicy::Lenient).unwrap_err();
        assert!(matches!(err, CompileError::InvalidFilter(_)));
    }

    #[test]
    fn top_level_array_is_invalid() {
        let err = parse_filter(&json!([{"age": 1}]), ParsePolicy::Lenient).unwrap_err();
        assert!(matches!(err, CompileError::InvalidFilter(_)));
    }

    #[test]
    fn bare_array_operand_is_invalid() {
        let err = parse_filter(&json!({"age": [1, 2]}), ParsePolicy::Lenient).unwrap_err();
        assert!(matches!(err, CompileError::InvalidFilter(_)));
    }

    #[test]
    fn empty_operator_map_is_invalid() {
        let err = parse_filter(&json!({"age": {}}), ParsePolicy::Lenient).unwrap_err();
        assert!(matches!(err, CompileError::InvalidFilter(_)));
    }

    #[test]
    fn nested_operand_object_is_invalid() {
        let err = parse_filter(&json!({"age": {"$eq": {"x": 1}}}), ParsePolicy::Lenient)
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidOperand { .. }));
    }

    #[test]
    fn not_takes_one_child() {
        let filter = parse(json!({"$not": {"age": 18}})).unwrap();
        assert!(matches!(filter, Filter::Not(_)));
    }

    #[test]
    fn combinator_with_only_degraded_children_is_dropped() {
        // A garbled $or must not tighten into "match nothing".
        let degraded = parse(json!({"$or": ["garbage"], "age": 18})).unwrap();
        let plain = parse(json!({"age": 18})).unwrap();
        assert_eq!(degraded, plain);
    }

    #[test]
    fn combinator_keeps_surviving_children() {
        let mixed = parse(json!({"$or": ["garbage", {"age": 18}]})).unwrap();
        let plain = parse(json!({"$or": [{"age": 18}]})).unwrap();
        assert_eq!(mixed, plain);
    }

    #[test]
    fn strict_policy_rejects_degraded_children() {
        let err = parse_filter(&json!({"$or": ["garbage"]}), ParsePolicy::Strict).unwrap_err();
        assert!(matches!(err, CompileError::InvalidJson(_)));
    }

    #[test]
    fn nested_string_children_are_decoded() {
        let nested = parse(json!({"$and": [r#"{"age":{"$gt":18}}"#]})).unwrap();
        let plain = parse(json!({"$and": [{"age": {"$gt": 18}}]})).unwrap();
        assert_eq!(nested, plain);
    }
}
