//! Crate-wide error taxonomy.
//!
//! Mirrors the teacher's `DebuggerError` (`cmd/dap_server/mod.rs`): a flat
//! `thiserror` enum with `#[from]` conversions for common sources and a
//! trailing `anyhow`-style catch-all for the outermost DAP boundary.

use std::path::PathBuf;

/// Errors produced anywhere in the GDB/MI bridge, breakpoint manager,
/// session state machine, RTT engine or variable registry.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The GDB or gdbserver binary could not be spawned.
    #[error("failed to spawn '{binary}': {source}")]
    ProcessSpawnFailed {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// A command sent to GDB did not receive a matching result record
    /// before its deadline.
    #[error("command '{0}' timed out")]
    Timeout(String),

    /// A line read from GDB's stdout did not match the MI grammar.
    #[error("malformed MI record: {0:?}")]
    MalformedMiRecord(String),

    /// GDB answered a command with `^error,msg="..."`.
    #[error("{0}")]
    MiError(String),

    /// One breakpoint in a batch failed to insert; other breakpoints in
    /// the same batch are unaffected.
    #[error("breakpoint insert failed: {message}")]
    BreakpointInsertFailed { message: String },

    /// The client asked for an operation that requires a stopped target
    /// while the target is running.
    #[error("target is running, not stopped")]
    TargetBusy,

    /// A DAP variables/evaluate request referenced an unknown handle.
    #[error("no such variable")]
    NoSuchVariable,

    /// A DAP request used a `variablesReference` that does not decode to
    /// a live handle.
    #[error("invalid variable reference: {0}")]
    InvalidReference(u64),

    /// RTT control block search exhausted its retry budget, or target
    /// memory held implausible metadata. RTT is disabled; the session
    /// itself is unaffected.
    #[error("RTT unavailable: {0}")]
    RttAbort(String),

    /// GDB or the session was asked to shut down while this command's
    /// reply was still pending.
    #[error("shutdown in progress")]
    Shutdown,

    /// A source path could not be canonicalized.
    #[error("cannot canonicalize path '{}': {source}", .path.display())]
    PathCanonicalization {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Lowest-level I/O failure (stdin write, socket read/write, ...).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Catch-all for errors that cross a component boundary without a
    /// dedicated variant; kept narrow per design note in spec §9.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    /// Render this error the way [`crate::session::Session`] prefixes
    /// messages on the DAP error-response surface (spec §7).
    pub fn as_dap_message(&self) -> String {
        format!("mcu-debug: {self}")
    }
}
