//! # sqlsift
//!
//! Compile JSON-shaped declarative filters into parameterized SQL
//! conditions.
//!
//! A filter like
//!
//! ```json
//! { "$or": [ { "age": { "$gte": 18 } }, { "skills.score": { "$gt": 5 } } ] }
//! ```
//!
//! compiles into one boolean condition plus named bound parameters,
//! ready to embed into a `WHERE` clause. The compiler is a pure
//! syntax-to-syntax transform: it never executes queries, never touches
//! connections, and only consumes the entity metadata the host supplies
//! through a [`SchemaCatalog`].
//!
//! Conditions on one-to-many relations (`"skills.score"`) compile to
//! decorrelated `IN (SELECT ...)` existence checks rather than joins, so
//! independent conditions on the same relation can each be satisfied by
//! a different related row.
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//! use sqlsift::{EntityDescriptor, FilterCompiler, RelationDescriptor, SchemaCatalog};
//!
//! let catalog = SchemaCatalog::new()
//!     .entity(
//!         EntityDescriptor::new("user", "users", "id")
//!             .fields(["name", "age"])
//!             .relation(RelationDescriptor::many("skills", "user_skill", "userId")),
//!     )
//!     .entity(EntityDescriptor::new("user_skill", "user_skills", "id").field("score"));
//!
//! let compiler = FilterCompiler::new(&catalog);
//!
//! // Structured filters and their JSON-string form compile identically.
//! let fragment = compiler
//!     .compile_str("user", "u", r#"{"age":{"$gt":18}}"#)
//!     .unwrap();
//! assert_eq!(fragment.text, "u.age > :age_0");
//! assert_eq!(fragment.parameters["age_0"], json!(18));
//! ```

pub mod error;
pub mod filter;
pub mod schema;
pub mod utils;

pub use error::CompileError;
pub use filter::{
    ConditionFragment, FieldPath, Filter, FilterCompiler, Operand, Operator, ParsePolicy, Scalar,
};
pub use schema::{Cardinality, EntityDescriptor, RelationDescriptor, SchemaCatalog};
