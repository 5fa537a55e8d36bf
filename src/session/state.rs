//! The `Session` lifecycle states (spec §4.4).
//!
//! Grounded on `dap_server/state.rs`'s `ServerState` enum, adapted from
//! that file's atomic-u8 single-value state to a plain
//! `tokio::sync::RwLock<SessionState>` — this crate already uses that
//! shape for [`crate::gdb_instance::GdbInstance::status`], and `Session`
//! needs ordinary `&self` read access alongside it, not just atomics.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Launching,
    Configured,
    Running,
    Stopped,
    Terminating,
    Terminated,
}
