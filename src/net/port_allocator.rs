//! Cross-process port reservation (spec §4.9).
//!
//! Grounded on no single teacher file (`probe-rs` never allocates its
//! own listen ports), but built in the teacher's resource-guard idiom:
//! an RAII guard that releases what it reserved on drop, the same
//! shape `HaltGuard` in `breakpoints/manager.rs` uses for interrupt
//! cycles.

use std::fs::{self, File};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use fs4::fs_std::FileExt;
use tokio::net::TcpListener;

use crate::error::CoreError;

const DEFAULT_START: u16 = 30_000;
const STEP: u16 = 10;
const STALE_AFTER: Duration = Duration::from_secs(30);

fn lock_path(port: u16) -> PathBuf {
    std::env::temp_dir().join(format!("mcu-debug-port-{port}.lock"))
}

/// Holds one file lock per reserved port; releasing the lock (dropping
/// the open handle closes it, which releases a POSIX advisory lock
/// even without an explicit unlock call) and removing the lock file
/// happens on drop.
pub struct PortRangeLock {
    ports: Vec<u16>,
    _locks: Vec<File>,
}

impl PortRangeLock {
    pub fn ports(&self) -> &[u16] {
        &self.ports
    }
}

impl Drop for PortRangeLock {
    fn drop(&mut self) {
        for port in &self.ports {
            let _ = fs::remove_file(lock_path(*port));
        }
    }
}

/// Reserve `count` ports starting from candidate bases `start, start+10,
/// start+20, …`. When `consecutive` is `true` all `count` ports within
/// one base must be free or that base is abandoned; when `false` each
/// port is claimed independently as soon as it's found free.
pub async fn allocate(
    count: usize,
    consecutive: bool,
    start: u16,
) -> Result<PortRangeLock, CoreError> {
    let mut ports = Vec::with_capacity(count);
    let mut locks = Vec::with_capacity(count);
    let mut base = start;

    'bases: loop {
        let mut candidates: Vec<u16> = Vec::with_capacity(count);
        for i in 0..count as u16 {
            let port = base.checked_add(if consecutive { i } else { 0 }).ok_or_else(|| {
                CoreError::Other(anyhow::anyhow!("port range exhausted above {base}"))
            })?;
            candidates.push(port);
        }

        for port in candidates {
            if ports.len() == count {
                break;
            }
            match try_claim(port).await {
                Some(file) => {
                    ports.push(port);
                    locks.push(file);
                }
                None => {
                    if consecutive {
                        // release what this base claimed and try the next base
                        ports.clear();
                        locks.clear();
                        base = base
                            .checked_add(STEP)
                            .ok_or_else(|| CoreError::Other(anyhow::anyhow!("no ports left")))?;
                        continue 'bases;
                    }
                }
            }
        }

        if ports.len() == count {
            return Ok(PortRangeLock { ports, _locks: locks });
        }
        base = base
            .checked_add(STEP)
            .ok_or_else(|| CoreError::Other(anyhow::anyhow!("no ports left")))?;
    }
}

pub async fn allocate_one(start: u16) -> Result<PortRangeLock, CoreError> {
    allocate(1, false, start).await
}

pub fn default_start() -> u16 {
    DEFAULT_START
}

/// A port is free iff its lock file can be locked (clearing a stale
/// lock first if the holder crashed more than [`STALE_AFTER`] ago) and
/// a test listener binds successfully on both loopback and all
/// interfaces.
async fn try_claim(port: u16) -> Option<File> {
    let path = lock_path(port);
    clear_if_stale(&path);

    let file = File::options().create(true).write(true).truncate(false).open(&path).ok()?;
    file.try_lock_exclusive().ok()?;

    if bind_test(port).await {
        Some(file)
    } else {
        drop(file);
        let _ = fs::remove_file(&path);
        None
    }
}

fn clear_if_stale(path: &PathBuf) {
    let Ok(meta) = fs::metadata(path) else { return };
    let Ok(age) = meta.modified().and_then(|m| SystemTime::now().duration_since(m).or(Ok(Duration::ZERO))) else {
        return;
    };
    if age > STALE_AFTER {
        let _ = fs::remove_file(path);
    }
}

async fn bind_test(port: u16) -> bool {
    let loopback = TcpListener::bind(("127.0.0.1", port)).await;
    let any = TcpListener::bind(("0.0.0.0", port)).await;
    loopback.is_ok() && any.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allocates_distinct_ports() {
        let lock = allocate(2, false, 31_000).await.unwrap();
        assert_eq!(lock.ports().len(), 2);
        assert_ne!(lock.ports()[0], lock.ports()[1]);
    }

    #[tokio::test]
    async fn reused_port_after_drop() {
        let first = allocate_one(31_200).await.unwrap();
        let port = first.ports()[0];
        drop(first);
        let second = allocate_one(31_200).await.unwrap();
        assert_eq!(second.ports()[0], port);
    }
}
