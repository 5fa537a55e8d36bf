//! Per-source/per-function/per-data breakpoint books and the
//! halt-apply-resume discipline that guards every mutation (spec §4.3).
//!
//! Grounded on `dap_server/debug_adapter/dap/repl_commands/breakpoint.rs`
//! for the per-kind bookkeeping shape, and design note §9's suggestion to
//! replace the source's closure-based `executeWhileStopped` with an
//! explicit RAII-shaped guard (see [`manager::HaltGuard`]).

mod book;
mod manager;

pub use book::{BookEntry, BreakpointBook};
pub use manager::{
    BreakpointManager, BreakpointResult, DataAccessType, DataBreakpointSpec,
    FunctionBreakpointSpec, SourceBreakpointSpec,
};
