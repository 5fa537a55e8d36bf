//! Owns one long-lived `gdb --interpreter=mi3` child process: frames its
//! stdout into records, correlates token-tagged replies, and demultiplexes
//! asynchronous notifications (spec §4.2).
//!
//! Grounded on the teacher's `dap_server/server/startup.rs` accept-loop
//! idiom (a `tokio` task owns one I/O source and dispatches what it
//! reads), adapted from a TCP listener loop to a child-process stdio
//! reader loop.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{broadcast, oneshot, Mutex, RwLock};

use crate::error::CoreError;
use crate::mi::{AsyncClass, MiParser, MiRecord, MiTuple, StreamKind};

/// Target run state as tracked from GDB's async records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStatus {
    Running,
    Stopped,
    Terminated,
}

/// A demultiplexed async notification, named per spec §4.2's reduced
/// event set.
#[derive(Debug, Clone)]
pub enum GdbEvent {
    Running,
    Stopped { reason: StopReason, fields: MiTuple },
    BreakpointDeleted { fields: MiTuple },
    ThreadCreated { fields: MiTuple },
    ThreadExited { fields: MiTuple },
    ThreadSelected { fields: MiTuple },
    ThreadGroupExited { fields: MiTuple },
    Console(String),
    Target(String),
    Log(String),
    /// The child process exited or stdin/stdout failed irrecoverably.
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    BreakpointHit,
    WatchpointTrigger,
    WatchpointScope,
    EndSteppingRange,
    FunctionFinished,
    SignalReceived,
    Exited,
    ExitedNormally,
    /// Synthesized for the first-ever stop when GDB reports no reason
    /// (spec §4.2).
    Entry,
    None,
}

impl StopReason {
    fn parse(s: Option<&str>) -> Self {
        match s {
            Some("breakpoint-hit") => StopReason::BreakpointHit,
            Some("watchpoint-trigger") => StopReason::WatchpointTrigger,
            Some("watchpoint-scope") => StopReason::WatchpointScope,
            Some("end-stepping-range") => StopReason::EndSteppingRange,
            Some("function-finished") => StopReason::FunctionFinished,
            Some("signal-received") => StopReason::SignalReceived,
            Some("exited") => StopReason::Exited,
            Some("exited-normally") => StopReason::ExitedNormally,
            Some(_) | None => StopReason::None,
        }
    }
}

struct PendingEntry {
    tx: oneshot::Sender<MiRecord>,
}

/// Owns a single `gdb --interpreter=mi3` subprocess.
pub struct GdbInstance {
    stdin: Mutex<ChildStdin>,
    child: Mutex<Child>,
    next_seq: AtomicU64,
    pending: Arc<Mutex<HashMap<u64, PendingEntry>>>,
    status: Arc<RwLock<TargetStatus>>,
    events_tx: broadcast::Sender<GdbEvent>,
    default_events_rx: Mutex<broadcast::Receiver<GdbEvent>>,
    seen_first_stop: Arc<Mutex<bool>>,
}

impl GdbInstance {
    /// Spawn `path argv...` in `cwd`, then run `init_cmds` serially. Any
    /// `init_cmds` failure aborts startup (spec §4.2 "Startup contract").
    pub async fn start(
        path: &str,
        argv: &[String],
        cwd: Option<&std::path::Path>,
        init_cmds: &[String],
    ) -> Result<Self, CoreError> {
        let mut cmd = Command::new(path);
        cmd.args(argv)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn().map_err(|source| CoreError::ProcessSpawnFailed {
            binary: path.to_string(),
            source,
        })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            CoreError::Other(anyhow::anyhow!("gdb child has no stdin pipe"))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            CoreError::Other(anyhow::anyhow!("gdb child has no stdout pipe"))
        })?;

        let pending: Arc<Mutex<HashMap<u64, PendingEntry>>> = Arc::new(Mutex::new(HashMap::new()));
        let status = Arc::new(RwLock::new(TargetStatus::Stopped));
        let seen_first_stop = Arc::new(Mutex::new(false));
        let (events_tx, default_events_rx) = broadcast::channel(1024);

        spawn_reader(
            BufReader::new(stdout),
            pending.clone(),
            status.clone(),
            seen_first_stop.clone(),
            events_tx.clone(),
        );

        let instance = Self {
            stdin: Mutex::new(stdin),
            child: Mutex::new(child),
            next_seq: AtomicU64::new(1),
            pending,
            status,
            events_tx,
            default_events_rx: Mutex::new(default_events_rx),
            seen_first_stop,
        };

        // Version probe: "capture" the reply but don't fail startup on an
        // old version, only warn (spec §4.2 step 3).
        if let Ok(reply) = instance
            .send_command("-interpreter-exec console \"show version\"", Duration::from_secs(5))
            .await
        {
            if let Some(fields) = reply.fields() {
                if let Ok(text) = fields.get_const("msg") {
                    warn_if_old_gdb(text);
                }
            }
        }

        for cmd in init_cmds {
            instance.send_command(cmd, Duration::from_secs(10)).await?;
        }

        Ok(instance)
    }

    pub async fn status(&self) -> TargetStatus {
        *self.status.read().await
    }

    /// Receive the next demultiplexed async event on this instance's
    /// default subscription. Returns `None` once the instance has shut
    /// down and the channel is closed.
    pub async fn next_event(&self) -> Option<GdbEvent> {
        loop {
            match self.default_events_rx.lock().await.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Closed) => return None,
                // A slow consumer fell behind the broadcast buffer; skip
                // forward rather than deadlocking the caller.
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    }

    /// Subscribe a new, independent receiver of demultiplexed events —
    /// used by callers (e.g. console-output capture around one command)
    /// that need to observe events without competing with the main event
    /// loop for them.
    pub fn subscribe(&self) -> broadcast::Receiver<GdbEvent> {
        self.events_tx.subscribe()
    }

    /// Send one command and collect every `console` stream event emitted
    /// while it was pending, in arrival order — used for commands whose
    /// payload only exists as console text (`maint print ...`), per the
    /// "capture mode" mentioned in spec §4.2 step 3.
    pub async fn send_command_capture_console(
        &self,
        cmd: &str,
        timeout: Duration,
    ) -> Result<(MiRecord, Vec<String>), CoreError> {
        let mut rx = self.subscribe();
        let result = self.send_command(cmd, timeout).await?;
        let mut console = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let GdbEvent::Console(text) = event {
                console.push(text);
            }
        }
        Ok((result, console))
    }

    /// Send one MI command (must be the `-...` form; console commands are
    /// the caller's responsibility to wrap as
    /// `-interpreter-exec console "..."`) and await its matching result
    /// record, or fail with [`CoreError::Timeout`] after `timeout`.
    pub async fn send_command(&self, cmd: &str, timeout: Duration) -> Result<MiRecord, CoreError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(seq, PendingEntry { tx });

        let line = format!("{seq}{cmd}\n");
        {
            let mut stdin = self.stdin.lock().await;
            if let Err(source) = stdin.write_all(line.as_bytes()).await {
                self.pending.lock().await.remove(&seq);
                self.fail_and_terminate().await;
                return Err(CoreError::Io(source));
            }
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(record)) => Ok(record),
            Ok(Err(_canceled)) => Err(CoreError::Shutdown),
            Err(_elapsed) => {
                self.pending.lock().await.remove(&seq);
                Err(CoreError::Timeout(cmd.to_string()))
            }
        }
    }

    async fn fail_and_terminate(&self) {
        *self.status.write().await = TargetStatus::Terminated;
        for (_, entry) in self.pending.lock().await.drain() {
            drop(entry); // drops tx, resolving awaiters with RecvError => Shutdown
        }
    }

    /// Clean shutdown: reject pending commands, try `-gdb-exit`, escalate
    /// to SIGKILL after 500 ms, wait 100 ms more. Idempotent (spec §4.2
    /// "Shutdown contract").
    pub async fn stop(&self) {
        for (_, entry) in self.pending.lock().await.drain() {
            drop(entry);
        }
        {
            let mut stdin = self.stdin.lock().await;
            let _ = stdin.write_all(b"-gdb-exit\n").await;
        }

        let mut child = self.child.lock().await;
        let exited = tokio::time::timeout(Duration::from_millis(500), child.wait()).await;
        if exited.is_err() {
            let _ = child.start_kill();
            let _ = tokio::time::timeout(Duration::from_millis(100), child.wait()).await;
        }
        *self.status.write().await = TargetStatus::Terminated;
    }
}

fn warn_if_old_gdb(banner: &str) {
    if let Some(rest) = banner.split("GNU gdb").nth(1) {
        let version = rest
            .trim()
            .split(|c: char| !c.is_ascii_digit() && c != '.')
            .next()
            .unwrap_or("");
        let mut parts = version.splitn(2, '.');
        let major: Option<u32> = parts.next().and_then(|s| s.parse().ok());
        let minor: Option<u32> = parts.next().and_then(|s| s.split('.').next()?.parse().ok());
        if let (Some(major), Some(minor)) = (major, minor) {
            if (major, minor) < (9, 1) {
                tracing::warn!(major, minor, "GDB version is older than 9.1");
            }
        }
    }
}

fn spawn_reader(
    mut reader: BufReader<tokio::process::ChildStdout>,
    pending: Arc<Mutex<HashMap<u64, PendingEntry>>>,
    status: Arc<RwLock<TargetStatus>>,
    seen_first_stop: Arc<Mutex<bool>>,
    events_tx: broadcast::Sender<GdbEvent>,
) {
    tokio::spawn(async move {
        let mut line = String::new();
        loop {
            line.clear();
            let n = match reader.read_line(&mut line).await {
                Ok(n) => n,
                Err(error) => {
                    tracing::warn!(%error, "gdb stdout read failed");
                    break;
                }
            };
            if n == 0 {
                break;
            }
            let trimmed = line.trim_end_matches('\n');
            if trimmed.is_empty() {
                continue;
            }

            let record = match MiParser::parse_line(trimmed) {
                Ok(record) => record,
                Err(error) => {
                    tracing::debug!(line = %error.0, "malformed MI record, dropping");
                    let _ = events_tx.send(GdbEvent::Log(format!("malformed MI record: {}", error.0)));
                    continue;
                }
            };

            route_record(
                record,
                &pending,
                &status,
                &seen_first_stop,
                &events_tx,
            )
            .await;
        }
        *status.write().await = TargetStatus::Terminated;
        let _ = events_tx.send(GdbEvent::Exit);
    });
}

async fn route_record(
    record: MiRecord,
    pending: &Arc<Mutex<HashMap<u64, PendingEntry>>>,
    status: &Arc<RwLock<TargetStatus>>,
    seen_first_stop: &Arc<Mutex<bool>>,
    events_tx: &broadcast::Sender<GdbEvent>,
) {
    match record {
        MiRecord::Terminator => {}
        MiRecord::Result { token: Some(seq), .. } => {
            if let Some(entry) = pending.lock().await.remove(&seq) {
                let _ = entry.tx.send(record);
            }
            // No pending entry: the deadline already fired. Discard
            // silently per spec §5 "Late replies are discarded silently".
        }
        MiRecord::Result { token: None, .. } => {
            // A result with no token cannot be correlated; nothing to do.
        }
        MiRecord::Async {
            class: AsyncClass::Exec,
            ref name,
            ref fields,
            ..
        } => match name.as_str() {
            "running" => {
                *status.write().await = TargetStatus::Running;
                let _ = events_tx.send(GdbEvent::Running);
            }
            "stopped" => {
                *status.write().await = TargetStatus::Stopped;
                let mut first = seen_first_stop.lock().await;
                let raw_reason = fields.get_const("reason").ok();
                let reason = if !*first && raw_reason.is_none() {
                    StopReason::Entry
                } else {
                    StopReason::parse(raw_reason)
                };
                *first = true;
                let _ = events_tx.send(GdbEvent::Stopped {
                    reason,
                    fields: fields.clone(),
                });
            }
            _ => {}
        },
        MiRecord::Async {
            class: AsyncClass::Notify,
            ref name,
            ref fields,
            ..
        } => {
            let event = match name.as_str() {
                "breakpoint-deleted" => Some(GdbEvent::BreakpointDeleted { fields: fields.clone() }),
                "thread-created" => Some(GdbEvent::ThreadCreated { fields: fields.clone() }),
                "thread-exited" => Some(GdbEvent::ThreadExited { fields: fields.clone() }),
                "thread-selected" => Some(GdbEvent::ThreadSelected { fields: fields.clone() }),
                "thread-group-exited" => Some(GdbEvent::ThreadGroupExited { fields: fields.clone() }),
                _ => None,
            };
            if let Some(event) = event {
                let _ = events_tx.send(event);
            }
        }
        MiRecord::Async { class: AsyncClass::Status, .. } => {}
        MiRecord::Stream { kind, text } => {
            let event = match kind {
                StreamKind::Console => GdbEvent::Console(text),
                StreamKind::Target => GdbEvent::Target(text),
                StreamKind::Log => GdbEvent::Log(text),
            };
            let _ = events_tx.send(event);
        }
    }
}
