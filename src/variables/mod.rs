//! Variable and register-handle registry (spec §3, §4.5).
//!
//! Grounded on `dap_server/server/core_data.rs` and
//! `dap_server/peripherals/svd_variables.rs` — see
//! [`engine`]'s module doc for specifics.

pub mod containers;
pub mod engine;
pub mod eval_name;
pub mod object;
pub mod reference;
pub mod registers;

pub use engine::VariableEngine;
pub use eval_name::{child_eval_name, is_transparent_wrapper, type_is_pointer};
pub use object::{VariableKey, VariableObject};
pub use reference::{decode, encode, is_variable_handle, scope_of, Scope, VARIABLE_TYPE_MASK};
