//! Readiness probe for a `gdbserver`/vendor-server listen port (spec
//! §4.9), grounded on the same resource-guard idiom as
//! [`crate::net::port_allocator`] — there is no teacher file for this
//! either, probe-rs talks to probes, not TCP servers it spawned itself.

use std::io::ErrorKind;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Http,
}

const PER_ATTEMPT: Duration = Duration::from_secs(1);

/// Poll `host:port` until it accepts a connection (and, for
/// [`Protocol::Http`], answers with a `2xx` status line) or `timeout`
/// elapses.
pub async fn wait_for_port(
    host: &str,
    port: u16,
    timeout: Duration,
    interval: Duration,
    protocol: Protocol,
) -> Result<TcpStream, CoreError> {
    let deadline = Instant::now() + timeout;
    let mut prefer_v6 = false;
    let mut v6_disabled = false;

    loop {
        let attempt = try_once(host, port, prefer_v6 && !v6_disabled, protocol).await;
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(e) if e.kind() == ErrorKind::AddrNotAvailable => {
                if prefer_v6 {
                    v6_disabled = true;
                    prefer_v6 = false;
                } else {
                    prefer_v6 = true;
                }
            }
            Err(_) => {}
        }

        if Instant::now() >= deadline {
            return Err(CoreError::Timeout(format!("{host}:{port} not ready")));
        }
        tokio::time::sleep(interval).await;
    }
}

async fn try_once(
    host: &str,
    port: u16,
    prefer_v6: bool,
    protocol: Protocol,
) -> std::io::Result<TcpStream> {
    let candidates = tokio::net::lookup_host((host, port)).await?;
    let mut addrs: Vec<_> = candidates.collect();
    addrs.sort_by_key(|a| (a.is_ipv6() != prefer_v6, 0));

    let addr = addrs
        .into_iter()
        .next()
        .ok_or_else(|| std::io::Error::new(ErrorKind::AddrNotAvailable, "no addresses resolved"))?;

    let mut stream = tokio::time::timeout(PER_ATTEMPT, TcpStream::connect(addr))
        .await
        .map_err(|_| std::io::Error::new(ErrorKind::TimedOut, "connect timed out"))??;

    if protocol == Protocol::Http {
        let request = format!("GET / HTTP/1.1\r\nHost: {host}\r\n\r\n");
        stream.write_all(request.as_bytes()).await?;
        let mut buf = vec![0u8; 256];
        let n = stream.read(&mut buf).await?;
        let line = String::from_utf8_lossy(&buf[..n]);
        let status_ok = line
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse::<u16>().ok())
            .is_some_and(|code| (200..300).contains(&code));
        if !status_ok {
            return Err(std::io::Error::new(
                ErrorKind::InvalidData,
                format!("non-2xx readiness response: {line}"),
            ));
        }
    }

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connects_once_listener_is_up() {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });
        let result = wait_for_port(
            "127.0.0.1",
            port,
            Duration::from_secs(2),
            Duration::from_millis(50),
            Protocol::Tcp,
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn times_out_when_nothing_listens() {
        let result = wait_for_port(
            "127.0.0.1",
            1,
            Duration::from_millis(200),
            Duration::from_millis(50),
            Protocol::Tcp,
        )
        .await;
        assert!(matches!(result, Err(CoreError::Timeout(_))));
    }
}
