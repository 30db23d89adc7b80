//! Model definition helpers

#[macro_use]
pub mod macros;
