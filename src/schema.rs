//! Entity metadata consumed by the filter compiler
//!
//! The compiler never introspects anything at runtime: the host describes
//! its entities once, up front, and the catalog is read-only afterwards.
//! A shared `&SchemaCatalog` is safe across concurrent compiles.

use std::collections::{HashMap, HashSet};

/// How many related rows an entity can have through a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// A declared relation from one entity to another.
///
/// `join_column` is the column on the *target* table that references the
/// root entity's primary key (e.g. `userId` on `user_skill`).
#[derive(Debug, Clone)]
pub struct RelationDescriptor {
    pub name: String,
    pub target_entity: String,
    pub join_column: String,
    pub cardinality: Cardinality,
}

impl RelationDescriptor {
    pub fn one(
        name: impl Into<String>,
        target_entity: impl Into<String>,
        join_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target_entity: target_entity.into(),
            join_column: join_column.into(),
            cardinality: Cardinality::One,
        }
    }

    pub fn many(
        name: impl Into<String>,
        target_entity: impl Into<String>,
        join_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target_entity: target_entity.into(),
            join_column: join_column.into(),
            cardinality: Cardinality::Many,
        }
    }
}

/// Metadata for one entity: its table, primary key, filterable scalar
/// fields, and declared relations.
///
/// Scalar fields double as the filter whitelist: a condition on a field
/// that is not listed here is rejected at compile time.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    name: String,
    table_name: String,
    primary_key: String,
    scalar_fields: HashSet<String>,
    relations: HashMap<String, RelationDescriptor>,
}

impl EntityDescriptor {
    /// The primary key counts as a filterable scalar field.
    pub fn new(
        name: impl Into<String>,
        table_name: impl Into<String>,
        primary_key: impl Into<String>,
    ) -> Self {
        let primary_key = primary_key.into();
        let mut scalar_fields = HashSet::new();
        scalar_fields.insert(primary_key.clone());
        Self {
            name: name.into(),
            table_name: table_name.into(),
            primary_key,
            scalar_fields,
            relations: HashMap::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.scalar_fields.insert(name.into());
        self
    }

    pub fn fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scalar_fields
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn relation(mut self, relation: RelationDescriptor) -> Self {
        self.relations.insert(relation.name.clone(), relation);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.scalar_fields.contains(name)
    }

    pub fn relation_named(&self, name: &str) -> Option<&RelationDescriptor> {
        self.relations.get(name)
    }
}

/// Read-only registry of entity descriptors, keyed by entity name.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    entities: HashMap<String, EntityDescriptor>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(mut self, descriptor: EntityDescriptor) -> Self {
        self.entities
            .insert(descriptor.name().to_string(), descriptor);
        self
    }

    pub fn get(&self, entity: &str) -> Option<&EntityDescriptor> {
        self.entities.get(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_entity() -> EntityDescriptor {
        EntityDescriptor::new("user", "users", "id")
            .fields(["name", "age"])
            .relation(RelationDescriptor::many("skills", "user_skill", "userId"))
    }

    #[test]
    fn primary_key_is_a_scalar_field() {
        let entity = user_entity();
        assert!(entity.has_field("id"));
        assert!(entity.has_field("age"));
        assert!(!entity.has_field("salary"));
    }

    #[test]
    fn relation_lookup() {
        let entity = user_entity();
        let rel = entity.relation_named("skills").unwrap();
        assert_eq!(rel.target_entity, "user_skill");
        assert_eq!(rel.join_column, "userId");
        assert_eq!(rel.cardinality, Cardinality::Many);
        assert!(entity.relation_named("projects").is_none());
    }

    #[test]
    fn catalog_lookup() {
        let catalog = SchemaCatalog::new().entity(user_entity());
        assert_eq!(catalog.get("user").unwrap().table_name(), "users");
        assert!(catalog.get("ghost").is_none());
    }

    #[test]
    fn one_to_one_relation() {
        let rel = RelationDescriptor::one("profile", "profile", "userId");
        assert_eq!(rel.cardinality, Cardinality::One);
    }
}
