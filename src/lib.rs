#![warn(clippy::unwrap_used, clippy::panic, clippy::expect_used)]

//! Core transport and orchestration layer for an embedded-MCU debug adapter.
//!
//! This crate bridges a DAP-speaking editor client to a GDB/MI backend that
//! drives a remote `gdbserver` (OpenOCD, J-Link, pyOCD, ...). It owns the
//! GDB/MI transport, the session state machine, the breakpoint manager, the
//! live-target RTT transport and the variable/handle registry. Everything
//! else — UI, configuration loading, symbol table parsing, disassembly
//! formatting and vendor-specific server spawning — is modeled as an
//! external collaborator accessed through a trait (see [`server_controller`]
//! and [`symbol_index`]).

pub mod breakpoints;
pub mod dap;
pub mod error;
pub mod gdb_instance;
pub mod handle_registry;
pub mod live_watch;
pub mod memory_bridge;
pub mod mi;
pub mod mi_commands;
pub mod net;
pub mod rtt;
pub mod server_controller;
pub mod session;
pub mod symbol_index;
pub mod variables;

pub use error::CoreError;
