//! Filter-to-SQL compilation
//!
//! Walks a parsed [`Filter`] tree and produces one boolean condition with
//! named bound parameters. Operand values are always bound, never spliced
//! into the condition text.
//!
//! Relation conditions (`relation.field`) compile to a decorrelated
//! `IN (SELECT ...)` existence check instead of a join: with a join, two
//! independent conditions on the same one-to-many relation would have to
//! hold on a single joined row, which is not what the filter says.

use serde_json::Value as JsonValue;

use crate::error::CompileError;
use crate::filter::params::{ConditionFragment, ParamBinder};
use crate::filter::parser::{parse_filter, parse_filter_str, ParsePolicy};
use crate::filter::types::{FieldPath, Filter, Operand, Operator, Scalar};
use crate::schema::{EntityDescriptor, SchemaCatalog};
use crate::utils::sql::escape_like_pattern;

/// Compiles raw filter values into [`ConditionFragment`]s against one
/// schema catalog.
///
/// Compilation is pure and synchronous; the compiler holds no per-call
/// state, so one instance can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct FilterCompiler<'a> {
    catalog: &'a SchemaCatalog,
    parse_policy: ParsePolicy,
}

impl<'a> FilterCompiler<'a> {
    /// A compiler with the default lenient parse policy.
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self {
            catalog,
            parse_policy: ParsePolicy::default(),
        }
    }

    pub fn with_parse_policy(mut self, policy: ParsePolicy) -> Self {
        self.parse_policy = policy;
        self
    }

    /// Compile a raw filter value (structured JSON, or a JSON-encoded
    /// string of one) for `entity`, aliased as `alias` in the caller's
    /// query.
    pub fn compile(
        &self,
        entity: &str,
        alias: &str,
        raw: &JsonValue,
    ) -> Result<ConditionFragment, CompileError> {
        let parsed = parse_filter(raw, self.parse_policy)?;
        self.compile_parsed(entity, alias, parsed)
    }

    /// Compile a filter passed as a JSON string, e.g. straight from a
    /// query-string parameter.
    pub fn compile_str(
        &self,
        entity: &str,
        alias: &str,
        raw: &str,
    ) -> Result<ConditionFragment, CompileError> {
        let parsed = parse_filter_str(raw, self.parse_policy)?;
        self.compile_parsed(entity, alias, parsed)
    }

    fn compile_parsed(
        &self,
        entity: &str,
        alias: &str,
        parsed: Option<Filter>,
    ) -> Result<ConditionFragment, CompileError> {
        let descriptor = self
            .catalog
            .get(entity)
            .ok_or_else(|| CompileError::UnknownEntity(entity.to_string()))?;
        let Some(filter) = parsed else {
            return Ok(ConditionFragment::unrestricted());
        };
        let mut binder = ParamBinder::new();
        let text = self.compile_node(descriptor, alias, &filter, &mut binder)?;
        let fragment = ConditionFragment {
            text,
            parameters: binder.into_parameters(),
        };
        tracing::debug!(
            entity,
            parameters = fragment.parameters.len(),
            "compiled filter condition"
        );
        Ok(fragment)
    }

    fn compile_node(
        &self,
        entity: &EntityDescriptor,
        alias: &str,
        node: &Filter,
        binder: &mut ParamBinder,
    ) -> Result<String, CompileError> {
        match node {
            // An empty $and restricts nothing; an empty $or can be
            // satisfied by nothing.
            Filter::And(children) if children.is_empty() => Ok("1=1".to_string()),
            Filter::Or(children) if children.is_empty() => Ok("1=0".to_string()),
            Filter::And(children) => self.compile_children(entity, alias, children, " AND ", binder),
            Filter::Or(children) => self.compile_children(entity, alias, children, " OR ", binder),
            Filter::Not(child) => {
                let inner = self.compile_node(entity, alias, child, binder)?;
                Ok(format!("NOT ({inner})"))
            }
            Filter::Condition {
                path,
                operator,
                operand,
            } => match path {
                FieldPath::Field(field) => {
                    if !entity.has_field(field) {
                        return Err(CompileError::UnknownField {
                            entity: entity.name().to_string(),
                            field: field.clone(),
                        });
                    }
                    self.compile_leaf(&format!("{alias}.{field}"), field, *operator, operand, binder)
                }
                FieldPath::Relation { relation, field } => {
                    self.compile_relation(entity, alias, relation, field, *operator, operand, binder)
                }
            },
        }
    }

    fn compile_children(
        &self,
        entity: &EntityDescriptor,
        alias: &str,
        children: &[Filter],
        joiner: &str,
        binder: &mut ParamBinder,
    ) -> Result<String, CompileError> {
        let mut parts = Vec::with_capacity(children.len());
        for child in children {
            parts.push(self.compile_node(entity, alias, child, binder)?);
        }
        Ok(format!("({})", parts.join(joiner)))
    }

    /// One condition template per operator; unknown operators never get
    /// this far (the parser already rejects them).
    fn compile_leaf(
        &self,
        column: &str,
        hint: &str,
        operator: Operator,
        operand: &Operand,
        binder: &mut ParamBinder,
    ) -> Result<String, CompileError> {
        match operator {
            Operator::Eq
            | Operator::Ne
            | Operator::Gt
            | Operator::Gte
            | Operator::Lt
            | Operator::Lte => {
                let scalar = expect_scalar(operator, operand)?;
                let sql_op = match operator {
                    Operator::Eq => "=",
                    Operator::Ne => "!=",
                    Operator::Gt => ">",
                    Operator::Gte => ">=",
                    Operator::Lt => "<",
                    _ => "<=",
                };
                let name = binder.bind(hint, scalar.to_json());
                Ok(format!("{column} {sql_op} :{name}"))
            }
            Operator::In | Operator::Nin => {
                let list = expect_list(operator, operand)?;
                if list.is_empty() {
                    return Err(CompileError::InvalidOperand {
                        operator,
                        reason: "expected a non-empty list".to_string(),
                    });
                }
                let name = binder.bind(hint, list_to_json(list));
                let sql_op = if operator == Operator::In {
                    "IN"
                } else {
                    "NOT IN"
                };
                Ok(format!("{column} {sql_op} (:...{name})"))
            }
            Operator::Like | Operator::Ilike => {
                let pattern = expect_string(operator, operand)?;
                let sql_op = if operator == Operator::Like {
                    "LIKE"
                } else {
                    "ILIKE"
                };
                // The caller owns the wildcards here; nothing is escaped.
                let name = binder.bind(hint, JsonValue::String(pattern.to_string()));
                Ok(format!("{column} {sql_op} :{name}"))
            }
            Operator::IsNull => match expect_scalar(operator, operand)? {
                Scalar::Bool(true) => Ok(format!("{column} IS NULL")),
                Scalar::Bool(false) => Ok(format!("{column} IS NOT NULL")),
                _ => Err(CompileError::InvalidOperand {
                    operator,
                    reason: "expected a boolean".to_string(),
                }),
            },
            Operator::Between => {
                let list = expect_list(operator, operand)?;
                let [lo, hi] = list else {
                    return Err(CompileError::InvalidOperand {
                        operator,
                        reason: format!("expected exactly 2 elements, got {}", list.len()),
                    });
                };
                let lo_name = binder.bind(hint, lo.to_json());
                let hi_name = binder.bind(hint, hi.to_json());
                Ok(format!("{column} BETWEEN :{lo_name} AND :{hi_name}"))
            }
            Operator::Contains | Operator::Contained | Operator::Overlap => {
                let list = expect_list(operator, operand)?;
                let sql_op = match operator {
                    Operator::Contains => "@>",
                    Operator::Contained => "<@",
                    _ => "&&",
                };
                let name = binder.bind(hint, list_to_json(list));
                Ok(format!("{column} {sql_op} :{name}"))
            }
            Operator::StartsWith | Operator::EndsWith => {
                let value = expect_string(operator, operand)?;
                // Wildcards are appended here, so the stored value gets
                // escaped; callers must not pre-escape.
                let escaped = escape_like_pattern(value);
                let pattern = if operator == Operator::StartsWith {
                    format!("{escaped}%")
                } else {
                    format!("%{escaped}")
                };
                let name = binder.bind(hint, JsonValue::String(pattern));
                Ok(format!("{column} LIKE :{name} ESCAPE '\\'"))
            }
        }
    }

    /// Decorrelated existence check for a `relation.field` condition:
    ///
    /// ```text
    /// alias.pk IN (
    ///     SELECT sub.pk FROM root_table sub
    ///     JOIN related_table rel ON rel.join_column = sub.pk
    ///     WHERE <leaf condition on rel.field>
    /// )
    /// ```
    ///
    /// Subquery aliases come from the binder, so sibling relation
    /// conditions stay independent of each other.
    #[allow(clippy::too_many_arguments)]
    fn compile_relation(
        &self,
        entity: &EntityDescriptor,
        alias: &str,
        relation: &str,
        field: &str,
        operator: Operator,
        operand: &Operand,
        binder: &mut ParamBinder,
    ) -> Result<String, CompileError> {
        let descriptor = entity.relation_named(relation).ok_or_else(|| {
            CompileError::UnknownRelation {
                entity: entity.name().to_string(),
                relation: relation.to_string(),
            }
        })?;
        let target = self
            .catalog
            .get(&descriptor.target_entity)
            .ok_or_else(|| CompileError::UnknownEntity(descriptor.target_entity.clone()))?;
        if !target.has_field(field) {
            return Err(CompileError::UnknownField {
                entity: target.name().to_string(),
                field: field.to_string(),
            });
        }

        let sub = binder.alias(&format!("{alias}_sub"));
        let rel = binder.alias(&format!("{alias}_{relation}"));
        let leaf = self.compile_leaf(&format!("{rel}.{field}"), field, operator, operand, binder)?;

        let pk = entity.primary_key();
        Ok(format!(
            "{alias}.{pk} IN (SELECT {sub}.{pk} FROM {root_table} {sub} \
             JOIN {rel_table} {rel} ON {rel}.{join_column} = {sub}.{pk} WHERE {leaf})",
            root_table = entity.table_name(),
            rel_table = target.table_name(),
            join_column = descriptor.join_column,
        ))
    }
}

fn expect_scalar<'o>(
    operator: Operator,
    operand: &'o Operand,
) -> Result<&'o Scalar, CompileError> {
    match operand {
        Operand::Scalar(scalar) => Ok(scalar),
        Operand::List(_) => Err(CompileError::InvalidOperand {
            operator,
            reason: "expected a single primitive, got a list".to_string(),
        }),
    }
}

fn expect_list<'o>(
    operator: Operator,
    operand: &'o Operand,
) -> Result<&'o [Scalar], CompileError> {
    match operand {
        Operand::List(list) => Ok(list),
        Operand::Scalar(_) => Err(CompileError::InvalidOperand {
            operator,
            reason: "expected a list of primitives".to_string(),
        }),
    }
}

fn expect_string<'o>(operator: Operator, operand: &'o Operand) -> Result<&'o str, CompileError> {
    match expect_scalar(operator, operand)? {
        Scalar::String(s) => Ok(s),
        _ => Err(CompileError::InvalidOperand {
            operator,
            reason: "expected a string".to_string(),
        }),
    }
}

fn list_to_json(list: &[Scalar]) -> JsonValue {
    JsonValue::Array(list.iter().map(Scalar::to_json).collect())
}
