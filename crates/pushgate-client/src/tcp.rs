//! Plain TCP transport over `std::net`.
//!
//! Writes block until the kernel accepts the bytes. Reads are split in two:
//! [`Transport::available`] drains the socket without blocking, which keeps
//! the driver's response poll non-blocking, while [`Transport::read_line`]
//! waits up to the read timeout for the rest of a line.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, warn};

use crate::transport::Transport;

const READ_CHUNK: usize = 512;
const MIN_TIMEOUT: Duration = Duration::from_millis(1);

/// [`Transport`] backed by a [`TcpStream`].
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
    rx: VecDeque<u8>,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl TcpTransport {
    /// A transport with a 5s connect timeout and a 1s line read timeout.
    pub fn new() -> Self {
        Self::with_timeouts(Duration::from_secs(5), Duration::from_secs(1))
    }

    /// Zero timeouts are raised to 1 ms; the socket API treats zero as an
    /// error and would leave reads unbounded.
    pub fn with_timeouts(connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            stream: None,
            rx: VecDeque::new(),
            connect_timeout: connect_timeout.max(MIN_TIMEOUT),
            read_timeout: read_timeout.max(MIN_TIMEOUT),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Move whatever the socket holds into the receive buffer without blocking.
    fn fill_nonblocking(&mut self) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        if stream.set_nonblocking(true).is_err() {
            return;
        }
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => self.rx.extend(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!(error = %e, "tcp read failed");
                    break;
                }
            }
        }
        let _ = stream.set_nonblocking(false);
    }

    /// Wait up to the read timeout for more bytes. Returns `false` on
    /// timeout, EOF, or error.
    fn fill_blocking(&mut self) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        let mut buf = [0u8; READ_CHUNK];
        match stream.read(&mut buf) {
            Ok(0) => false,
            Ok(n) => {
                self.rx.extend(&buf[..n]);
                true
            }
            Err(e) => {
                debug!(error = %e, "tcp read timed out or failed");
                false
            }
        }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, host: &str, port: u16) -> bool {
        self.stop();

        let addrs = match (host, port).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                debug!(error = %e, %host, port, "address resolution failed");
                return false;
            }
        };

        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    let _ = stream.set_nodelay(true);
                    if let Err(e) = stream.set_read_timeout(Some(self.read_timeout)) {
                        debug!(error = %e, "could not set read timeout");
                    }
                    debug!(%addr, "tcp connected");
                    self.stream = Some(stream);
                    return true;
                }
                Err(e) => debug!(error = %e, %addr, "tcp connect failed"),
            }
        }
        false
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.rx.clear();
    }

    fn available(&mut self) -> usize {
        self.fill_nonblocking();
        self.rx.len()
    }

    fn read(&mut self) -> Option<u8> {
        if self.rx.is_empty() {
            self.fill_nonblocking();
        }
        self.rx.pop_front()
    }

    fn write(&mut self, data: &[u8]) -> usize {
        let Some(stream) = self.stream.as_mut() else {
            return 0;
        };
        let mut sent = 0;
        while sent < data.len() {
            match stream.write(&data[sent..]) {
                Ok(0) => break,
                Ok(n) => sent += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, sent, len = data.len(), "tcp write failed");
                    break;
                }
            }
        }
        sent
    }

    fn read_line(&mut self, delimiter: u8) -> String {
        let mut line = Vec::new();
        loop {
            match self.rx.pop_front() {
                Some(b) if b == delimiter => break,
                Some(b) => line.push(b),
                None => {
                    if !self.fill_blocking() {
                        break;
                    }
                }
            }
        }
        String::from_utf8_lossy(&line).into_owned()
    }
}
