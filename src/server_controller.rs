//! `ServerController`: the vendor-specific gdbserver lifecycle, modeled
//! as a trait seam rather than implemented here (spec §1 "Server
//! controller specifics" is explicitly out of scope).
//!
//! Grounded on `dap_server/server/configuration.rs`'s trait-shaped split
//! between session sequencing and vendor startup logic.

/// One configured target core/connection, as handed to [`ServerController`]
/// methods. Opaque beyond what command interpolation needs.
#[derive(Debug, Clone, Default)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
}

/// Spawns and tears down the vendor gdbserver (OpenOCD, J-Link GDB
/// server, pyOCD, ...) and supplies the MI command lists that bracket
/// each session phase. Every method returns raw command strings; `Session`
/// is responsible for interpolation (spec §4.4 "Command interpolation")
/// before sending them to [`crate::gdb_instance::GdbInstance`].
///
/// Implementations are used as a type parameter rather than a trait
/// object (its `start`/`stop` methods are `async fn`s, which native
/// Rust traits cannot yet expose as `dyn`-safe without an extra
/// indirection crate the teacher stack doesn't otherwise need).
pub trait ServerController: Send + Sync {
    /// Start the vendor server process (or connect to one already
    /// running) and return where GDB should connect.
    async fn start(&self) -> anyhow::Result<ConnectTarget>;

    /// Stop the vendor server process, if this controller owns one.
    async fn stop(&self) -> anyhow::Result<()>;

    /// Commands run once GDB has connected, before any session-mode
    /// commands (e.g. `target extended-remote host:port`).
    fn connect_commands(&self, target: &ConnectTarget) -> Vec<String>;

    /// Commands run for a `launch` request (e.g. `load`, `monitor reset`).
    fn launch_commands(&self) -> Vec<String>;

    /// Commands run for an `attach` request.
    fn attach_commands(&self) -> Vec<String>;

    /// Commands run to reset the target without restarting the session.
    fn reset_commands(&self) -> Vec<String>;

    /// Commands that enable SWO/RTT forwarding on the vendor server side,
    /// if it needs to be told explicitly.
    fn swo_rtt_commands(&self) -> Vec<String>;

    /// Commands run just before `-target-disconnect` on session teardown
    /// (spec §4.4 "Terminating" — `overridePreEndSessionCommands`).
    fn pre_end_session_commands(&self) -> Vec<String> {
        Vec::new()
    }
}
