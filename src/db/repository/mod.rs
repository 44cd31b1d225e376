//! Repository layer: entity-scoped database operations.

mod object_code_mapping;

pub use object_code_mapping::*;
