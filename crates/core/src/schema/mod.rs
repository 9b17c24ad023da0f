pub mod catalog;
pub mod field;
pub mod validate;

pub use field::{FieldDefault, FieldKind, FieldSpec, ResourceSchema, VirtualField};
pub use validate::{validate_candidate, ValidFields, ValidationError};
