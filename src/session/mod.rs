//! `Session`: the state machine sequencing launch/attach, the client's
//! `configurationDone`, run/stop transitions and teardown (spec §4.4).
//!
//! Grounded on `dap_server/server/debugger.rs` (the `Debugger` struct
//! sequencing launch → configure → run/stop → terminate) and
//! `server/session_data.rs` (the per-session state container), adapted
//! from probe-rs's direct-probe `Core`/`CoreData` pair to a single
//! `GdbInstance` plus the breakpoint/variable engines this crate owns.

mod flags;
mod state;

pub use flags::SessionFlags;
pub use state::SessionState;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::breakpoints::BreakpointManager;
use crate::error::CoreError;
use crate::gdb_instance::{GdbInstance, StopReason, TargetStatus};
use crate::mi_commands::{escape, MiCommands, ThreadInfoList};
use crate::server_controller::ServerController;
use crate::symbol_index::SymbolIndex;
use crate::variables::VariableEngine;

/// Mutually exclusive session-mode behavior applied at `configurationDone`
/// (spec §4.4, and Open Question 1 in spec §9 / `DESIGN.md`): `no_debug`
/// takes precedence over `break_after_reset`, which takes precedence over
/// `run_to_entry_point`.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub no_debug: bool,
    pub break_after_reset: bool,
    pub run_to_entry_point: bool,
    pub entry_point_symbol: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Continue,
    Step,
    Next,
    Finish,
}

/// A DAP-facing `stopped` notification, or `None` if it was suppressed
/// (spec §4.4 "Concurrency guards" — `suppress_stopped_events`).
#[derive(Debug, Clone)]
pub struct StoppedNotice {
    pub reason: StopReason,
    pub thread_id: Option<u32>,
}

pub struct Session<C: ServerController> {
    gdb: GdbInstance,
    controller: C,
    symbols: Option<Arc<dyn SymbolIndex>>,
    state: RwLock<SessionState>,
    flags: SessionFlags,
    pub breakpoints: Mutex<BreakpointManager>,
    pub variables: Mutex<VariableEngine>,
    threads: RwLock<ThreadInfoList>,
    config: SessionConfig,
}

impl<C: ServerController> Session<C> {
    async fn start(
        gdb_path: &str,
        gdb_argv: &[String],
        cwd: Option<&Path>,
        controller: C,
        symbols: Option<Arc<dyn SymbolIndex>>,
        config: SessionConfig,
        attach: bool,
    ) -> Result<Self, CoreError> {
        // Idle -> Launching: start the vendor server in the background
        // while GDB starts in the foreground (spec §4.4).
        let (target, gdb) = tokio::try_join!(
            async { controller.start().await.map_err(CoreError::Other) },
            GdbInstance::start(gdb_path, gdb_argv, cwd, &[]),
        )?;

        let session = Self {
            gdb,
            controller,
            symbols,
            state: RwLock::new(SessionState::Launching),
            flags: SessionFlags::new(),
            breakpoints: Mutex::new(BreakpointManager::new()),
            variables: Mutex::new(VariableEngine::new()),
            threads: RwLock::new(ThreadInfoList::default()),
            config,
        };

        // Launching -> Configured: connect, then the mode-specific
        // commands, interpolated the way user-supplied command lists are
        // (spec §4.4 "Command interpolation").
        let mi = MiCommands::new(&session.gdb);
        for cmd in session.controller.connect_commands(&target) {
            session.run_interpolated(&mi, &cmd).await?;
        }
        let mode_commands = if attach {
            session.controller.attach_commands()
        } else {
            session.controller.launch_commands()
        };
        for cmd in mode_commands {
            session.run_interpolated(&mi, &cmd).await?;
        }

        *session.state.write().await = SessionState::Configured;
        Ok(session)
    }

    pub async fn launch(
        gdb_path: &str,
        gdb_argv: &[String],
        cwd: Option<&Path>,
        controller: C,
        symbols: Option<Arc<dyn SymbolIndex>>,
        config: SessionConfig,
    ) -> Result<Self, CoreError> {
        Self::start(gdb_path, gdb_argv, cwd, controller, symbols, config, false).await
    }

    pub async fn attach(
        gdb_path: &str,
        gdb_argv: &[String],
        cwd: Option<&Path>,
        controller: C,
        symbols: Option<Arc<dyn SymbolIndex>>,
        config: SessionConfig,
    ) -> Result<Self, CoreError> {
        Self::start(gdb_path, gdb_argv, cwd, controller, symbols, config, true).await
    }

    pub fn gdb(&self) -> &GdbInstance {
        &self.gdb
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    pub fn flags(&self) -> &SessionFlags {
        &self.flags
    }

    async fn run_interpolated(&self, mi: &MiCommands<'_>, raw: &str) -> Result<(), CoreError> {
        mi.raw(&interpolate_command(raw)).await?;
        Ok(())
    }

    /// Configured -> Running or Stopped: apply the session-mode
    /// precedence decided in `DESIGN.md` (spec §9 Open Question 1).
    pub async fn configuration_done(&self) -> Result<(), CoreError> {
        self.flags.set_configuration_done(true);
        let mi = MiCommands::new(&self.gdb);

        if self.config.no_debug {
            mi.exec_continue(true).await?;
            *self.state.write().await = SessionState::Running;
            return Ok(());
        }

        if self.config.break_after_reset {
            *self.state.write().await = SessionState::Stopped;
            return Ok(());
        }

        if self.config.run_to_entry_point {
            if let Some(symbol) = self.config.entry_point_symbol.clone() {
                let resolved = self
                    .symbols
                    .as_ref()
                    .and_then(|s| s.function_range(&symbol))
                    .is_some();
                if resolved {
                    self.breakpoints
                        .lock()
                        .await
                        .set_temporary_entry_breakpoint(&self.gdb, &symbol)
                        .await?;
                } else {
                    tracing::warn!(%symbol, "run-to-entry-point symbol not found in symbol index");
                }
            }
        }

        mi.exec_continue(true).await?;
        *self.state.write().await = SessionState::Running;
        Ok(())
    }

    /// Running -> Stopped: refresh thread bookkeeping and clear the
    /// Local/Registers containers (spec §4.4, §3 "Lifetimes").
    pub async fn handle_stopped(
        &self,
        reason: StopReason,
    ) -> Result<Option<StoppedNotice>, CoreError> {
        *self.state.write().await = SessionState::Stopped;
        self.flags.set_continuing(false);
        self.variables.lock().await.clear_locals(&self.gdb).await;

        let mi = MiCommands::new(&self.gdb);
        let mut list = mi.thread_info().await?;
        let current_present = list
            .current_thread_id
            .is_some_and(|id| list.threads.iter().any(|t| t.id == id));
        if !current_present {
            if let Some(first) = list.threads.first() {
                mi.thread_select(first.id).await?;
                list.current_thread_id = Some(first.id);
            }
        }
        let thread_id = list.current_thread_id;
        *self.threads.write().await = list;

        if self.flags.suppress_stopped_events() {
            return Ok(None);
        }
        Ok(Some(StoppedNotice { reason, thread_id }))
    }

    /// GDB's `*running` record landed: clears the `continuing` guard so a
    /// subsequent continue/step request is no longer rejected.
    pub async fn handle_running(&self) {
        *self.state.write().await = SessionState::Running;
        self.flags.set_continuing(false);
    }

    pub async fn threads(&self) -> ThreadInfoList {
        self.threads.read().await.clone()
    }

    /// Stopped -> Running: clear locals eagerly (the stop-side clear
    /// covers the next halt; this covers GDB var objects that referenced
    /// the frame we are about to leave) and issue the requested step.
    pub async fn continue_request(&self, kind: StepKind) -> Result<(), CoreError> {
        if self.flags.continuing() {
            return Err(CoreError::TargetBusy);
        }
        self.variables.lock().await.clear_locals(&self.gdb).await;
        self.flags.set_continuing(true);
        let mi = MiCommands::new(&self.gdb);
        match kind {
            StepKind::Continue => mi.exec_continue(true).await,
            StepKind::Step => mi.exec_step().await,
            StepKind::Next => mi.exec_next().await,
            StepKind::Finish => mi.exec_finish().await,
        }
    }

    /// any -> Terminating -> Terminated. Idempotent (spec §5
    /// "`finishSession` ... is idempotent").
    pub async fn disconnect(&self) -> Result<(), CoreError> {
        if !self.flags.begin_end_session() {
            return Ok(());
        }
        *self.state.write().await = SessionState::Terminating;
        self.flags.set_suppress_stopped_events(true);

        let mi = MiCommands::new(&self.gdb);
        if self.gdb.status().await == TargetStatus::Running {
            let _ = mi.exec_interrupt().await;
        }
        self.breakpoints.lock().await.delete_all(&self.gdb).await.ok();
        for cmd in self.controller.pre_end_session_commands() {
            let _ = self.run_interpolated(&mi, &cmd).await;
        }
        let _ = mi.target_disconnect().await;
        self.gdb.stop().await;
        let _ = self.controller.stop().await;

        *self.state.write().await = SessionState::Terminated;
        Ok(())
    }
}

/// `continue|c|cont` becomes `-exec-continue --all`; other bare words are
/// wrapped as a console command; anything starting with `-` is passed
/// verbatim (spec §4.4 "Command interpolation").
pub fn interpolate_command(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('-') {
        return trimmed.to_string();
    }
    match trimmed {
        "continue" | "c" | "cont" => "-exec-continue --all".to_string(),
        other => format!("-interpreter-exec console \"{}\"", escape(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continue_shorthand_rewritten() {
        assert_eq!(interpolate_command("continue"), "-exec-continue --all");
        assert_eq!(interpolate_command("c"), "-exec-continue --all");
        assert_eq!(interpolate_command("cont"), "-exec-continue --all");
    }

    #[test]
    fn dash_prefixed_passed_verbatim() {
        assert_eq!(interpolate_command("-exec-next"), "-exec-next");
    }

    #[test]
    fn bare_word_wrapped_as_console() {
        assert_eq!(
            interpolate_command("monitor reset"),
            "-interpreter-exec console \"monitor reset\""
        );
    }
}
