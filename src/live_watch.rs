//! `LiveWatch`: a second [`GdbInstance`], attached in extended-remote
//! mode, that keeps talking to the target while the primary session's
//! `GdbInstance` runs it (spec §4 component table; design note §9 "Two
//! GDB instances sharing a target").
//!
//! Grounded on `Session::start`'s connect-then-mode-commands sequencing
//! reused for a narrower attach, and on `VariableEngine`'s watch
//! container for the `*Live` evaluate/variables/set-variable/
//! set-expression requests (spec §6). The "never `-exec-*`" restriction
//! is enforced structurally: this type has no method that could send
//! one — only [`MemoryBridge`] reads/writes and the variable engine's
//! `-var-*` commands are reachable here.

use std::path::Path;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::error::CoreError;
use crate::gdb_instance::GdbInstance;
use crate::memory_bridge::MemoryBridge;
use crate::mi_commands::{escape, MiCommands};
use crate::session::interpolate_command;
use crate::variables::{VariableEngine, VariableObject};

pub struct LiveWatch {
    gdb: GdbInstance,
    variables: Mutex<VariableEngine>,
}

impl LiveWatch {
    pub async fn attach(
        gdb_path: &str,
        gdb_argv: &[String],
        cwd: Option<&Path>,
        connect_commands: &[String],
    ) -> Result<Self, CoreError> {
        let gdb = GdbInstance::start(gdb_path, gdb_argv, cwd, &[]).await?;
        let mi = MiCommands::new(&gdb);
        for cmd in connect_commands {
            mi.raw(&interpolate_command(cmd)).await?;
        }
        Ok(Self { gdb, variables: Mutex::new(VariableEngine::new()) })
    }

    pub async fn read_memory(&self, addr: u64, len: usize) -> Result<Vec<u8>, CoreError> {
        MemoryBridge::new(&self.gdb).read_memory(addr, len).await
    }

    pub async fn write_memory(&self, addr: u64, bytes: &[u8]) -> Result<(), CoreError> {
        MemoryBridge::new(&self.gdb).write_memory(addr, bytes).await
    }

    /// `evaluateLive`: create a watch expression, optionally scoped to a
    /// `(thread, frame)` pair, and return its variable handle.
    pub async fn evaluate(
        &self,
        expr: &str,
        frame: Option<(u32, u32)>,
    ) -> Result<u64, CoreError> {
        let mut vars = self.variables.lock().await;
        match frame {
            Some((thread, frame_id)) => {
                vars.create_watch(&self.gdb, thread, Some(frame_id), 0, expr, expr).await
            }
            None => vars.create_watch(&self.gdb, 0, None, 0, expr, expr).await,
        }
    }

    pub async fn variable(&self, handle: u64) -> Option<VariableObject> {
        self.variables.lock().await.get_variable(handle).cloned()
    }

    /// `variablesLive`: expand one variable's children.
    pub async fn list_children(&self, handle: u64) -> Result<Vec<u64>, CoreError> {
        self.variables.lock().await.list_children(&self.gdb, handle).await
    }

    /// `setVariableLive`: assign through the existing `-var-create`
    /// object, then refresh every tracked value the same way a normal
    /// stop would (spec §4.5 "Updating on stop").
    pub async fn set_variable(&self, handle: u64, value: &str) -> Result<String, CoreError> {
        let gdb_name = {
            let vars = self.variables.lock().await;
            vars.get_variable(handle).and_then(|v| v.gdb_var_name.clone())
        };
        let Some(gdb_name) = gdb_name else {
            return Err(CoreError::InvalidReference(handle));
        };

        let mi = MiCommands::new(&self.gdb);
        let fields = mi.raw(&format!("-var-assign {gdb_name} \"{}\"", escape(value))).await?;
        let new_value = fields.get_const("value").unwrap_or(value).to_string();
        self.variables.lock().await.update_on_stop(&self.gdb).await?;
        Ok(new_value)
    }

    /// `setExpressionLive`: no variable object is required, so this goes
    /// straight through the console `print` form GDB uses for one-off
    /// assignment expressions; the result is only ever observable on the
    /// console stream, not in the result record's fields.
    pub async fn set_expression(&self, expression: &str, value: &str) -> Result<String, CoreError> {
        let cmd = format!(
            "-interpreter-exec console \"print {} = {}\"",
            escape(expression),
            escape(value)
        );
        let (_, console) = self.gdb.send_command_capture_console(&cmd, Duration::from_secs(5)).await?;
        Ok(console.concat())
    }

    /// `deleteLiveGdbVariables`: release every GDB var object this
    /// instance has created. `evaluate` only ever stores into the watch
    /// container, so this clears that container rather than locals.
    pub async fn delete_all(&self) {
        self.variables.lock().await.clear_watches(&self.gdb).await;
    }

    pub async fn stop(&self) {
        self.gdb.stop().await;
    }
}
