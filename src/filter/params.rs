//! Parameter binding
//!
//! Collects named bound parameters while a filter compiles. One binder is
//! created per compile call, so concurrent compiles can never hand out
//! colliding names.

use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};

/// The output of a compile: a boolean condition and its bound parameters.
///
/// `text` references parameters as `:{name}` (spread as `:...{name}` for
/// list parameters); `parameters` maps each name to its value in binding
/// order. The caller embeds both into its own query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionFragment {
    pub text: String,
    pub parameters: JsonMap<String, JsonValue>,
}

impl ConditionFragment {
    /// The fragment that matches every row. Produced for absent filters
    /// and for lenient parse degradation.
    pub fn unrestricted() -> Self {
        Self {
            text: "1=1".to_string(),
            parameters: JsonMap::new(),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.text == "1=1" && self.parameters.is_empty()
    }
}

/// Allocates unique parameter names and subquery aliases for one compile
/// call.
///
/// Names are `{hint}_{n}` with a counter scoped to this binder. The hint
/// is only for readability of the generated SQL; uniqueness comes from
/// the counter.
#[derive(Debug, Default)]
pub(crate) struct ParamBinder {
    counter: usize,
    parameters: JsonMap<String, JsonValue>,
}

impl ParamBinder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Bind a value, returning its allocated name.
    pub(crate) fn bind(&mut self, hint: &str, value: JsonValue) -> String {
        let name = format!("{}_{}", sanitize(hint), self.next());
        self.parameters.insert(name.clone(), value);
        name
    }

    /// Allocate a table alias for a subquery.
    pub(crate) fn alias(&mut self, base: &str) -> String {
        format!("{}_{}", sanitize(base), self.next())
    }

    pub(crate) fn into_parameters(self) -> JsonMap<String, JsonValue> {
        self.parameters
    }

    fn next(&mut self) -> usize {
        let n = self.counter;
        self.counter += 1;
        n
    }
}

/// Parameter names must stay plain identifiers regardless of the field
/// spelling they derive from.
fn sanitize(hint: &str) -> String {
    let cleaned: String = hint
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "p".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn names_are_unique_per_binder() {
        let mut binder = ParamBinder::new();
        let a = binder.bind("age", json!(1));
        let b = binder.bind("age", json!(2));
        assert_eq!(a, "age_0");
        assert_eq!(b, "age_1");
        assert_ne!(a, b);
    }

    #[test]
    fn aliases_share_the_counter() {
        let mut binder = ParamBinder::new();
        assert_eq!(binder.alias("u_sub"), "u_sub_0");
        assert_eq!(binder.bind("score", json!(5)), "score_1");
        assert_eq!(binder.alias("u_sub"), "u_sub_2");
    }

    #[test]
    fn binding_order_is_preserved() {
        let mut binder = ParamBinder::new();
        binder.bind("b", json!(1));
        binder.bind("a", json!(2));
        let parameters = binder.into_parameters();
        let names: Vec<&String> = parameters.keys().collect();
        assert_eq!(names, ["b_0", "a_1"]);
    }

    #[test]
    fn hints_are_sanitized() {
        let mut binder = ParamBinder::new();
        assert_eq!(binder.bind("created-at", json!(0)), "created_at_0");
        assert_eq!(binder.bind("", json!(0)), "p_1");
    }

    #[test]
    fn unrestricted_fragment() {
        let fragment = ConditionFragment::unrestricted();
        assert_eq!(fragment.text, "1=1");
        assert!(fragment.is_unrestricted());
        assert!(fragment.parameters.is_empty());
    }
}
