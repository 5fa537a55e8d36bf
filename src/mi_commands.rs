//! Thin typed wrappers around the common `-exec-*`, `-thread-*`,
//! `-stack-*`, `-data-*` MI commands (spec §4 component table).
//!
//! Grounded on `dap_server/server/debugger.rs`'s pattern of small typed
//! methods, each building one command string and awaiting a typed reply.

use std::time::Duration;

use crate::error::CoreError;
use crate::gdb_instance::GdbInstance;
use crate::mi::{MiRecord, MiTuple, ResultClass};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// One entry of `-thread-info`.
#[derive(Debug, Clone)]
pub struct ThreadInfo {
    pub id: u32,
    pub state: String,
}

#[derive(Debug, Clone, Default)]
pub struct ThreadInfoList {
    pub threads: Vec<ThreadInfo>,
    pub current_thread_id: Option<u32>,
}

/// One entry of `-stack-list-frames`.
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub level: u32,
    pub func: String,
    pub addr: u64,
    pub file: Option<String>,
    pub line: Option<u32>,
}

pub struct MiCommands<'a> {
    gdb: &'a GdbInstance,
}

impl<'a> MiCommands<'a> {
    pub fn new(gdb: &'a GdbInstance) -> Self {
        Self { gdb }
    }

    async fn run(&self, cmd: &str) -> Result<MiTuple, CoreError> {
        self.run_with_timeout(cmd, DEFAULT_TIMEOUT).await
    }

    async fn run_with_timeout(&self, cmd: &str, timeout: Duration) -> Result<MiTuple, CoreError> {
        match self.gdb.send_command(cmd, timeout).await? {
            MiRecord::Result { class: ResultClass::Error, fields, .. } => {
                let msg = fields.get_const("msg").unwrap_or("unknown error").to_string();
                Err(CoreError::MiError(msg))
            }
            MiRecord::Result { fields, .. } => Ok(fields),
            other => Err(CoreError::Other(anyhow::anyhow!(
                "expected a result record, got {other:?}"
            ))),
        }
    }

    pub async fn exec_continue(&self, all: bool) -> Result<(), CoreError> {
        let cmd = if all { "-exec-continue --all" } else { "-exec-continue" };
        self.run(cmd).await?;
        Ok(())
    }

    pub async fn exec_interrupt(&self) -> Result<(), CoreError> {
        self.run("-exec-interrupt").await?;
        Ok(())
    }

    pub async fn exec_step(&self) -> Result<(), CoreError> {
        self.run("-exec-step").await?;
        Ok(())
    }

    pub async fn exec_next(&self) -> Result<(), CoreError> {
        self.run("-exec-next").await?;
        Ok(())
    }

    pub async fn exec_finish(&self) -> Result<(), CoreError> {
        self.run("-exec-finish").await?;
        Ok(())
    }

    pub async fn thread_info(&self) -> Result<ThreadInfoList, CoreError> {
        let fields = self.run("-thread-info").await?;
        let current_thread_id = fields
            .get_const("current-thread-id")
            .ok()
            .and_then(|s| s.parse().ok());
        let mut threads = Vec::new();
        if let Ok(list) = fields.get_list("threads") {
            for item in list {
                if let Some(t) = item.as_tuple() {
                    let id = t.get_const("id").ok().and_then(|s| s.parse().ok());
                    let state = t.get_const("state").unwrap_or("unknown").to_string();
                    if let Some(id) = id {
                        threads.push(ThreadInfo { id, state });
                    }
                }
            }
        }
        Ok(ThreadInfoList {
            threads,
            current_thread_id,
        })
    }

    pub async fn thread_select(&self, thread_id: u32) -> Result<(), CoreError> {
        self.run(&format!("-thread-select {thread_id}")).await?;
        Ok(())
    }

    pub async fn stack_list_frames(&self, thread_id: u32) -> Result<Vec<StackFrame>, CoreError> {
        let fields = self
            .run(&format!("-stack-list-frames --thread {thread_id}"))
            .await?;
        let mut frames = Vec::new();
        if let Ok(list) = fields.get_list("stack") {
            for item in list {
                let Some(t) = item.as_tuple() else { continue };
                let frame = t.get_tuple("frame").unwrap_or(t);
                let level = frame.get_const("level").ok().and_then(|s| s.parse().ok()).unwrap_or(0);
                let func = frame.get_const("func").unwrap_or("??").to_string();
                let addr = frame
                    .get_const("addr")
                    .ok()
                    .and_then(|s| crate::memory_bridge::parse_address(s).ok())
                    .unwrap_or(0);
                let file = frame.get_const("file").ok().map(str::to_string);
                let line = frame.get_const("line").ok().and_then(|s| s.parse().ok());
                frames.push(StackFrame {
                    level,
                    func,
                    addr,
                    file,
                    line,
                });
            }
        }
        Ok(frames)
    }

    pub async fn var_create(
        &self,
        name: &str,
        frame: &str,
        expr: &str,
    ) -> Result<MiTuple, CoreError> {
        self.run(&format!("-var-create {name} {frame} \"{}\"", escape(expr)))
            .await
    }

    pub async fn var_delete(&self, name: &str) -> Result<(), CoreError> {
        // Best-effort per spec §3 variable lifetime rules.
        let _ = self.run(&format!("-var-delete {name}")).await;
        Ok(())
    }

    pub async fn var_update_all(&self) -> Result<Vec<MiTuple>, CoreError> {
        let fields = self.run("-var-update --all-values *").await?;
        let mut changes = Vec::new();
        if let Ok(list) = fields.get_list("changelist") {
            for item in list {
                if let Some(t) = item.as_tuple() {
                    changes.push(t.clone());
                }
            }
        }
        Ok(changes)
    }

    pub async fn var_list_children(&self, name: &str) -> Result<MiTuple, CoreError> {
        self.run(&format!("-var-list-children --all-values {name}"))
            .await
    }

    pub async fn var_set_format(&self, name: &str, fmt: char) -> Result<(), CoreError> {
        self.run(&format!("-var-set-format {name} {fmt}")).await?;
        Ok(())
    }

    pub async fn var_info_path_expression(&self, name: &str) -> Result<String, CoreError> {
        let fields = self.run(&format!("-var-info-path-expression {name}")).await?;
        fields
            .get_const("path_expr")
            .map(str::to_string)
            .map_err(|e| CoreError::Other(anyhow::anyhow!(e)))
    }

    pub async fn data_list_register_values(&self, fmt: char) -> Result<MiTuple, CoreError> {
        self.run(&format!("-data-list-register-values {fmt}")).await
    }

    pub async fn console(&self, command: &str) -> Result<MiTuple, CoreError> {
        self.run(&format!(
            "-interpreter-exec console \"{}\"",
            escape(command)
        ))
        .await
    }

    pub async fn break_delete(&self, ids: &[u32]) -> Result<(), CoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let ids = ids.iter().map(u32::to_string).collect::<Vec<_>>().join(" ");
        self.run(&format!("-break-delete {ids}")).await?;
        Ok(())
    }

    pub async fn target_disconnect(&self) -> Result<(), CoreError> {
        self.run("-target-disconnect").await?;
        Ok(())
    }

    /// Run a raw MI command and return its fields, for operations
    /// (`-break-insert`, `-break-watch`, `-dprintf-insert`, ...) whose
    /// argument construction is owned by the breakpoint manager.
    pub async fn raw(&self, cmd: &str) -> Result<MiTuple, CoreError> {
        self.run(cmd).await
    }

    pub async fn raw_with_timeout(&self, cmd: &str, timeout: Duration) -> Result<MiTuple, CoreError> {
        self.run_with_timeout(cmd, timeout).await
    }
}

/// Escape a string for inclusion inside a double-quoted MI argument:
/// `\` → `\\`, `"` → `\"` (spec §4.3 "Condition and hit-count syntax").
pub fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
