//! Declarative filter compilation
//!
//! Parses JSON-shaped filter expressions and compiles them into
//! parameterized SQL condition fragments.
//!
//! ## Usage
//!
//! ```
//! use serde_json::json;
//! use sqlsift::{EntityDescriptor, FilterCompiler, SchemaCatalog};
//!
//! let catalog = SchemaCatalog::new()
//!     .entity(EntityDescriptor::new("user", "users", "id").fields(["name", "age"]));
//!
//! let compiler = FilterCompiler::new(&catalog);
//! let fragment = compiler
//!     .compile("user", "u", &json!({"age": {"$gt": 18}}))
//!     .unwrap();
//!
//! assert_eq!(fragment.text, "u.age > :age_0");
//! assert_eq!(fragment.parameters["age_0"], json!(18));
//! ```

mod compiler;
mod params;
mod parser;
mod types;

pub use compiler::FilterCompiler;
pub use params::ConditionFragment;
pub use parser::{parse_filter, parse_filter_str, ParsePolicy};
pub use types::{FieldPath, Filter, Operand, Operator, Scalar};
