//! Per-channel TCP fan-out (spec §4.7 "Multiplexing").
//!
//! Grounded on `dap_server/server/startup.rs`'s `TcpListener::bind` +
//! `accept` loop, adapted from "one socket owns the whole session" to
//! "any number of sockets share one channel's byte stream" and scaled
//! down to non-blocking polls so one `RttEngine` tick can service every
//! channel without spawning a task per connection.

use futures_util::FutureExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub struct RttChannel {
    pub index: u32,
    pub port: u16,
    listener: TcpListener,
    sockets: Vec<TcpStream>,
}

impl RttChannel {
    pub fn new(index: u32, port: u16, listener: TcpListener) -> Self {
        Self { index, port, listener, sockets: Vec::new() }
    }

    /// Accept any sockets that are ready without blocking the poll tick.
    pub fn accept_pending(&mut self) {
        while let Some(Ok((socket, _addr))) = self.listener.accept().now_or_never() {
            self.sockets.push(socket);
        }
    }

    /// Write `bytes` to every connected socket; a socket whose write
    /// fails is dropped from the fan-out set (spec §4.7 "sockets with
    /// `writable==false` are skipped" — here, closed sockets are pruned
    /// outright rather than tracked as a separate flag).
    pub async fn broadcast(&mut self, bytes: &[u8]) {
        if bytes.is_empty() || self.sockets.is_empty() {
            return;
        }
        let mut keep = Vec::with_capacity(self.sockets.len());
        for mut socket in self.sockets.drain(..) {
            if socket.write_all(bytes).await.is_ok() {
                keep.push(socket);
            }
        }
        self.sockets = keep;
    }

    /// Drain whatever bytes any connected client has sent, for the next
    /// down-channel write pass. Non-blocking: a socket with nothing
    /// buffered contributes nothing this tick.
    pub fn drain_inbound(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut keep = Vec::with_capacity(self.sockets.len());
        for mut socket in self.sockets.drain(..) {
            let mut buf = [0u8; 4096];
            match socket.read(&mut buf).now_or_never() {
                Some(Ok(0)) => continue, // peer closed
                Some(Ok(n)) => {
                    out.extend_from_slice(&buf[..n]);
                    keep.push(socket);
                }
                Some(Err(_)) => continue,
                None => keep.push(socket), // nothing ready right now
            }
        }
        self.sockets = keep;
        out
    }

    pub fn connected(&self) -> bool {
        !self.sockets.is_empty()
    }
}
