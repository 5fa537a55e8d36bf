//! Chunked memory read/write over `-data-read/write-memory-bytes`,
//! returning contiguous byte regions (spec §4.6).
//!
//! Grounded on `util/rtt/client.rs`'s paired `poll_channel` /
//! `write_down_channel` read/write helpers around one shared resource.

use std::time::Duration;

use crate::error::CoreError;
use crate::gdb_instance::GdbInstance;
use crate::mi_commands::MiCommands;

/// Maximum bytes requested per `-data-read-memory-bytes` chunk (spec §4.6).
pub const MAX_CHUNK: usize = 512;

pub struct MemoryBridge<'a> {
    mi: MiCommands<'a>,
}

impl<'a> MemoryBridge<'a> {
    pub fn new(gdb: &'a GdbInstance) -> Self {
        Self { mi: MiCommands::new(gdb) }
    }

    /// Read `len` bytes starting at `addr`, in chunks of at most
    /// [`MAX_CHUNK`]. If a chunk returns fewer bytes than requested, the
    /// read stops there and the partial result is returned (spec §4.6).
    pub async fn read_memory(&self, addr: u64, len: usize) -> Result<Vec<u8>, CoreError> {
        self.read_memory_with_callback(addr, len, |_, _| async { Ok(()) })
            .await
    }

    /// Streaming read: `on_chunk(chunk_addr, bytes)` is awaited after each
    /// chunk and before the next chunk is requested, so a caller (the RTT
    /// engine) can atomically advance a read pointer only once the bytes
    /// are acknowledged.
    pub async fn read_memory_with_callback<F, Fut>(
        &self,
        addr: u64,
        len: usize,
        mut on_chunk: F,
    ) -> Result<Vec<u8>, CoreError>
    where
        F: FnMut(u64, &[u8]) -> Fut,
        Fut: std::future::Future<Output = Result<(), CoreError>>,
    {
        let mut out = Vec::with_capacity(len);
        let mut offset = 0usize;
        while offset < len {
            let want = (len - offset).min(MAX_CHUNK);
            let chunk_addr = addr + offset as u64;
            let cmd = format!(
                "-data-read-memory-bytes \"{}\" {want}",
                format_address(chunk_addr)
            );
            let fields = self.mi.raw(&cmd).await?;
            let memory = fields
                .get_list("memory")
                .map_err(|e| CoreError::Other(anyhow::anyhow!(e)))?;
            if memory.len() != 1 {
                return Err(CoreError::Other(anyhow::anyhow!(
                    "memory read returned {} regions, expected exactly 1 (region boundary)",
                    memory.len()
                )));
            }
            let region = memory[0]
                .as_tuple()
                .ok_or_else(|| CoreError::Other(anyhow::anyhow!("malformed memory region")))?;
            let hex = region
                .get_const("contents")
                .map_err(|e| CoreError::Other(anyhow::anyhow!(e)))?;
            let bytes = decode_hex(hex)?;

            on_chunk(chunk_addr, &bytes).await?;
            let got = bytes.len();
            out.extend_from_slice(&bytes);
            offset += got;
            if got < want {
                break;
            }
        }
        Ok(out)
    }

    /// Write `bytes` at `addr` in a single `-data-write-memory-bytes`
    /// command.
    pub async fn write_memory(&self, addr: u64, bytes: &[u8]) -> Result<(), CoreError> {
        let cmd = format!(
            "-data-write-memory-bytes \"{}\" \"{}\"",
            format_address(addr),
            encode_hex(bytes)
        );
        self.mi.raw_with_timeout(&cmd, Duration::from_secs(5)).await?;
        Ok(())
    }
}

/// `0x` followed by at most 16 lower-case hex digits, no padding.
pub fn format_address(addr: u64) -> String {
    format!("0x{addr:x}")
}

/// Accepts `0x...` hex or plain decimal.
pub fn parse_address(s: &str) -> Result<u64, CoreError> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
            .map_err(|e| CoreError::Other(anyhow::anyhow!("invalid address '{s}': {e}")))
    } else {
        s.parse()
            .map_err(|e| CoreError::Other(anyhow::anyhow!("invalid address '{s}': {e}")))
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn decode_hex(s: &str) -> Result<Vec<u8>, CoreError> {
    if s.len() % 2 != 0 {
        return Err(CoreError::Other(anyhow::anyhow!("odd-length hex string")));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|e| CoreError::Other(anyhow::anyhow!("invalid hex byte: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trip() {
        for addr in [0u64, 1, 0xdead_beef, u64::MAX] {
            let formatted = format_address(addr);
            assert_eq!(parse_address(&formatted).unwrap(), addr);
        }
    }

    #[test]
    fn address_accepts_decimal() {
        assert_eq!(parse_address("4096").unwrap(), 4096);
    }

    #[test]
    fn hex_round_trip() {
        let bytes = vec![0u8, 1, 0xff, 0x42];
        let hex = encode_hex(&bytes);
        assert_eq!(decode_hex(&hex).unwrap(), bytes);
    }
}
