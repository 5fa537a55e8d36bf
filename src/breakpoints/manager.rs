//! `BreakpointManager`: canonicalizes source paths, applies the
//! halt-apply-resume discipline, and drives `-break-insert` /
//! `-dprintf-insert` / `-break-watch` / `-break-delete` (spec §4.3).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use futures_util::future::join_all;

use crate::error::CoreError;
use crate::gdb_instance::{GdbEvent, GdbInstance, TargetStatus};
use crate::mi_commands::{escape, MiCommands};

use super::book::{BookEntry, BreakpointBook};

#[derive(Debug, Clone, Default)]
pub struct SourceBreakpointSpec {
    pub line: u32,
    pub condition: Option<String>,
    pub hit_condition: Option<String>,
    pub hardware_required: bool,
    pub log_message: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionBreakpointSpec {
    pub function: String,
    pub condition: Option<String>,
    pub hit_condition: Option<String>,
    pub hardware_required: bool,
    pub log_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataAccessType {
    Read,
    ReadWrite,
    Write,
}

#[derive(Debug, Clone)]
pub struct DataBreakpointSpec {
    /// The full evaluate-name path of the variable, as returned by an
    /// earlier `data_breakpoint_info` call.
    pub data_id: String,
    pub access_type: DataAccessType,
}

/// The outcome the client sees for one requested breakpoint.
#[derive(Debug, Clone)]
pub struct BreakpointResult {
    pub gdb_id: Option<u32>,
    pub verified: bool,
    pub line: Option<u32>,
    pub message: Option<String>,
}

/// RAII-shaped halt/resume bracket (design note §9). Rust's `Drop` cannot
/// await, so unlike a true RAII guard the resume half is an explicit async
/// call (`release`) rather than running on drop; forgetting to call it is
/// a logic bug in this module, not a memory-safety one.
pub struct HaltGuard {
    interrupted: bool,
}

impl HaltGuard {
    pub async fn acquire(gdb: &GdbInstance, mi: &MiCommands<'_>) -> Result<Self, CoreError> {
        if gdb.status().await != TargetStatus::Running {
            return Ok(Self { interrupted: false });
        }
        let mut events = gdb.subscribe();
        mi.exec_interrupt().await?;
        loop {
            match events.recv().await {
                Ok(GdbEvent::Stopped { .. }) => break,
                Ok(GdbEvent::Exit) => break,
                Err(_) => break,
                Ok(_) => continue,
            }
        }
        Ok(Self { interrupted: true })
    }

    pub async fn release(self, mi: &MiCommands<'_>) -> Result<(), CoreError> {
        if self.interrupted {
            mi.exec_continue(true).await?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct BreakpointManager {
    source_books: HashMap<PathBuf, BreakpointBook<SourceBreakpointSpec>>,
    function_book: BreakpointBook<FunctionBreakpointSpec>,
    data_book: BreakpointBook<DataBreakpointSpec>,
}

impl BreakpointManager {
    pub fn new() -> Self {
        Self::default()
    }

    async fn canonicalize(path: &Path) -> Result<PathBuf, CoreError> {
        tokio::fs::canonicalize(path)
            .await
            .map_err(|source| CoreError::PathCanonicalization {
                path: path.to_path_buf(),
                source,
            })
    }

    pub async fn set_source_breakpoints(
        &mut self,
        gdb: &GdbInstance,
        path: &Path,
        specs: Vec<SourceBreakpointSpec>,
    ) -> Result<Vec<BreakpointResult>, CoreError> {
        let canonical = Self::canonicalize(path).await?;
        let mi = MiCommands::new(gdb);
        let guard = HaltGuard::acquire(gdb, &mi).await?;

        let previous_ids = self
            .source_books
            .get(&canonical)
            .map(BreakpointBook::ids)
            .unwrap_or_default();
        mi.break_delete(&previous_ids).await?;

        let commands: Vec<String> = specs
            .iter()
            .map(|spec| build_source_command(&canonical, spec))
            .collect();
        let outcomes = run_inserts(&mi, &commands).await;

        let mut results = Vec::with_capacity(specs.len());
        let mut entries = Vec::new();
        for (spec, outcome) in specs.into_iter().zip(outcomes) {
            results.push(BreakpointResult {
                gdb_id: outcome.id,
                verified: outcome.verified,
                line: outcome.line.or(Some(spec.line)).filter(|_| outcome.verified),
                message: outcome.message,
            });
            if let Some(gdb_id) = outcome.id {
                entries.push(BookEntry { gdb_id, requested: spec });
            }
        }
        self.source_books.entry(canonical).or_default().replace(entries);

        guard.release(&mi).await?;
        Ok(results)
    }

    pub async fn set_function_breakpoints(
        &mut self,
        gdb: &GdbInstance,
        specs: Vec<FunctionBreakpointSpec>,
    ) -> Result<Vec<BreakpointResult>, CoreError> {
        let mi = MiCommands::new(gdb);
        let guard = HaltGuard::acquire(gdb, &mi).await?;

        mi.break_delete(&self.function_book.ids()).await?;

        let commands: Vec<String> = specs.iter().map(build_function_command).collect();
        let outcomes = run_inserts(&mi, &commands).await;

        let mut results = Vec::with_capacity(specs.len());
        let mut entries = Vec::new();
        for (spec, outcome) in specs.into_iter().zip(outcomes) {
            results.push(BreakpointResult {
                gdb_id: outcome.id,
                verified: outcome.verified,
                line: outcome.line,
                message: outcome.message,
            });
            if let Some(gdb_id) = outcome.id {
                entries.push(BookEntry { gdb_id, requested: spec });
            }
        }
        self.function_book.replace(entries);

        guard.release(&mi).await?;
        Ok(results)
    }

    pub async fn set_data_breakpoints(
        &mut self,
        gdb: &GdbInstance,
        specs: Vec<DataBreakpointSpec>,
    ) -> Result<Vec<BreakpointResult>, CoreError> {
        let mi = MiCommands::new(gdb);
        let guard = HaltGuard::acquire(gdb, &mi).await?;

        mi.break_delete(&self.data_book.ids()).await?;

        let commands: Vec<String> = specs.iter().map(build_data_command).collect();
        let outcomes = run_inserts(&mi, &commands).await;

        let mut results = Vec::with_capacity(specs.len());
        let mut entries = Vec::new();
        for (spec, outcome) in specs.into_iter().zip(outcomes) {
            results.push(BreakpointResult {
                gdb_id: outcome.id,
                verified: outcome.verified,
                line: None,
                message: outcome.message,
            });
            if let Some(gdb_id) = outcome.id {
                entries.push(BookEntry { gdb_id, requested: spec });
            }
        }
        self.data_book.replace(entries);

        guard.release(&mi).await?;
        Ok(results)
    }

    /// Plant a one-shot temporary breakpoint at `symbol` for
    /// `run-to-entry-point` (spec.md:154 / SPEC_FULL.md §4.4). GDB deletes
    /// a temporary breakpoint itself once it fires, so this never touches
    /// `function_book` and never runs `break_delete` against the client's
    /// own function breakpoints.
    pub async fn set_temporary_entry_breakpoint(
        &mut self,
        gdb: &GdbInstance,
        symbol: &str,
    ) -> Result<(), CoreError> {
        let mi = MiCommands::new(gdb);
        let guard = HaltGuard::acquire(gdb, &mi).await?;
        let result = mi.raw(&format!("-break-insert -t --function {symbol}")).await;
        guard.release(&mi).await?;
        result.map(drop)
    }

    /// Delete every breakpoint this manager knows about, across all
    /// scopes — used when tearing down a session (spec §4.4 "Terminating").
    pub async fn delete_all(&mut self, gdb: &GdbInstance) -> Result<(), CoreError> {
        let mi = MiCommands::new(gdb);
        let guard = HaltGuard::acquire(gdb, &mi).await?;

        let mut ids: Vec<u32> = self.function_book.ids();
        ids.extend(self.data_book.ids());
        for book in self.source_books.values() {
            ids.extend(book.ids());
        }
        mi.break_delete(&ids).await?;

        self.source_books.clear();
        self.function_book = BreakpointBook::new();
        self.data_book = BreakpointBook::new();

        guard.release(&mi).await?;
        Ok(())
    }
}

struct InsertOutcome {
    id: Option<u32>,
    verified: bool,
    line: Option<u32>,
    message: Option<String>,
}

async fn run_inserts(mi: &MiCommands<'_>, commands: &[String]) -> Vec<InsertOutcome> {
    // N independent futures; a failure on one must not cancel the others
    // (spec §4.3 "Partial failure") — `join_all` never short-circuits.
    let futures = commands.iter().map(|cmd| mi.raw(cmd));
    join_all(futures)
        .await
        .into_iter()
        .map(|result| match result {
            Ok(fields) => parse_insert_result(&fields),
            Err(error) => InsertOutcome {
                id: None,
                verified: false,
                line: None,
                message: Some(error.to_string()),
            },
        })
        .collect()
}

fn parse_insert_result(fields: &crate::mi::MiTuple) -> InsertOutcome {
    if let Ok(bkpt) = fields.get_tuple("bkpt") {
        let id = bkpt.get_const("number").ok().and_then(|s| s.parse().ok());
        let line = bkpt.get_const("line").ok().and_then(|s| s.parse().ok());
        return InsertOutcome { verified: id.is_some(), id, line, message: None };
    }
    if let Ok(wpt) = fields.get_tuple("wpt") {
        let id = wpt.get_const("number").ok().and_then(|s| s.parse().ok());
        return InsertOutcome { verified: id.is_some(), id, line: None, message: None };
    }
    let message = fields.get_const("msg").ok().map(str::to_string);
    InsertOutcome { id: None, verified: false, line: None, message }
}

/// `">N"` → `-i N` (permanent, ignore first N hits); bare `"N"` →
/// `-t -i N` (temporary, fires after N ignored hits); anything else is
/// dropped with a warning (spec §4.3).
fn hit_condition_args(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix('>') {
        if let Ok(n) = rest.trim().parse::<u32>() {
            return Some(format!("-i {n}"));
        }
    } else if let Ok(n) = trimmed.parse::<u32>() {
        return Some(format!("-t -i {n}"));
    }
    tracing::warn!(hit_condition = %raw, "unsupported hit_condition syntax, ignoring");
    None
}

fn build_source_command(path: &Path, spec: &SourceBreakpointSpec) -> String {
    let location = format!("--source \"{}\" --line {}", path.display(), spec.line);
    build_insert_command(
        &location,
        spec.condition.as_deref(),
        spec.hit_condition.as_deref(),
        spec.hardware_required,
        spec.log_message.as_deref(),
    )
}

fn build_function_command(spec: &FunctionBreakpointSpec) -> String {
    let location = format!("--function {}", spec.function);
    build_insert_command(
        &location,
        spec.condition.as_deref(),
        spec.hit_condition.as_deref(),
        spec.hardware_required,
        spec.log_message.as_deref(),
    )
}

fn build_insert_command(
    location: &str,
    condition: Option<&str>,
    hit_condition: Option<&str>,
    hardware_required: bool,
    log_message: Option<&str>,
) -> String {
    let mut args = String::new();
    if let Some(cond) = condition {
        args.push_str(&format!(" -c \"{}\"", escape(cond)));
    }
    if let Some(hit) = hit_condition {
        if let Some(extra) = hit_condition_args(hit) {
            args.push(' ');
            args.push_str(&extra);
        }
    }
    let logpoint = log_message.is_some();
    if hardware_required {
        if logpoint {
            tracing::warn!("hardware_required is ignored on a logpoint");
        } else {
            args.push_str(" -h");
        }
    }

    match log_message {
        Some(message) => format!("-dprintf-insert {location}{args} \"{}\"", escape(message)),
        None => format!("-break-insert {location}{args}"),
    }
}

fn build_data_command(spec: &DataBreakpointSpec) -> String {
    let flag = match spec.access_type {
        DataAccessType::Read => " -r",
        DataAccessType::ReadWrite => " -a",
        DataAccessType::Write => "",
    };
    format!("-break-watch{flag} \"{}\"", escape(&spec.data_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_condition_greater_than() {
        assert_eq!(hit_condition_args(">3"), Some("-i 3".to_string()));
    }

    #[test]
    fn hit_condition_bare_number() {
        assert_eq!(hit_condition_args("3"), Some("-t -i 3".to_string()));
    }

    #[test]
    fn hit_condition_unsupported_is_dropped() {
        assert_eq!(hit_condition_args(">= 3"), None);
    }

    #[test]
    fn data_command_flags() {
        let spec = DataBreakpointSpec { data_id: "x".to_string(), access_type: DataAccessType::Read };
        assert_eq!(build_data_command(&spec), "-break-watch -r \"x\"");
        let spec = DataBreakpointSpec { data_id: "x".to_string(), access_type: DataAccessType::Write };
        assert_eq!(build_data_command(&spec), "-break-watch \"x\"");
    }

    #[test]
    fn logpoint_drops_hardware_flag() {
        let cmd = build_insert_command("--line 10", None, None, true, Some("hit"));
        assert!(cmd.starts_with("-dprintf-insert --line 10 \""));
        assert!(!cmd.contains(" -h"));
    }
}
