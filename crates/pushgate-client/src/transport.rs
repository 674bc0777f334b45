//! Byte-stream transport consumed by the push driver.
//!
//! The driver never opens sockets itself. Anything that can connect to a
//! host, move bytes, and report how many bytes are waiting can carry a push:
//! [`TcpTransport`](crate::TcpTransport) on hosted targets, a board's network
//! stack on devices, or a scripted mock in tests.

/// A bidirectional byte stream to a single peer.
pub trait Transport {
    /// Open a connection to `host:port`. Returns `false` if it was refused.
    fn connect(&mut self, host: &str, port: u16) -> bool;

    /// Close the connection and discard anything still buffered.
    fn stop(&mut self);

    /// Number of received bytes that can be read without blocking.
    fn available(&mut self) -> usize;

    /// Take one received byte, or `None` if nothing is buffered.
    fn read(&mut self) -> Option<u8>;

    /// Send bytes. Returns how many were accepted.
    fn write(&mut self, data: &[u8]) -> usize;

    /// Read up to (not including) `delimiter`, or until no more bytes are
    /// available. Invalid UTF-8 is replaced, not rejected.
    fn read_line(&mut self, delimiter: u8) -> String {
        let mut line = Vec::new();
        while let Some(b) = self.read() {
            if b == delimiter {
                break;
            }
            line.push(b);
        }
        String::from_utf8_lossy(&line).into_owned()
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn connect(&mut self, host: &str, port: u16) -> bool {
        (**self).connect(host, port)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn available(&mut self) -> usize {
        (**self).available()
    }

    fn read(&mut self) -> Option<u8> {
        (**self).read()
    }

    fn write(&mut self, data: &[u8]) -> usize {
        (**self).write(data)
    }

    fn read_line(&mut self, delimiter: u8) -> String {
        (**self).read_line(delimiter)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self, host: &str, port: u16) -> bool {
        (**self).connect(host, port)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn available(&mut self) -> usize {
        (**self).available()
    }

    fn read(&mut self) -> Option<u8> {
        (**self).read()
    }

    fn write(&mut self, data: &[u8]) -> usize {
        (**self).write(data)
    }

    fn read_line(&mut self, delimiter: u8) -> String {
        (**self).read_line(delimiter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays a fixed response; only reads are meaningful.
    #[derive(Default)]
    struct Replay {
        rx: VecDeque<u8>,
    }

    impl Transport for Replay {
        fn connect(&mut self, _: &str, _: u16) -> bool {
            true
        }
        fn stop(&mut self) {
            self.rx.clear();
        }
        fn available(&mut self) -> usize {
            self.rx.len()
        }
        fn read(&mut self) -> Option<u8> {
            self.rx.pop_front()
        }
        fn write(&mut self, data: &[u8]) -> usize {
            data.len()
        }
    }

    fn replay(bytes: &[u8]) -> Replay {
        Replay {
            rx: bytes.iter().copied().collect(),
        }
    }

    #[test]
    fn read_line_stops_at_delimiter() {
        let mut t = replay(b"HTTP/1.1 200 OK\r\nrest");
        assert_eq!(t.read_line(b'\n'), "HTTP/1.1 200 OK\r");
        assert_eq!(t.available(), 4);
    }

    #[test]
    fn read_line_without_delimiter_takes_everything() {
        let mut t = replay(b"partial");
        assert_eq!(t.read_line(b'\n'), "partial");
        assert_eq!(t.available(), 0);
    }

    #[test]
    fn read_line_replaces_invalid_utf8() {
        let mut t = replay(b"a\xffb\n");
        assert_eq!(t.read_line(b'\n'), "a\u{fffd}b");
    }

    #[test]
    fn mut_ref_forwards() {
        let mut inner = replay(b"x\n");
        let mut by_ref = &mut inner;
        assert_eq!(Transport::available(&mut by_ref), 2);
        assert_eq!(by_ref.read_line(b'\n'), "x");
        assert_eq!(inner.available(), 0);
    }

    #[test]
    fn boxed_dyn_transport_works() {
        let mut boxed: Box<dyn Transport> = Box::new(replay(b"ok\n"));
        assert!(boxed.connect("gateway", 9091));
        assert_eq!(boxed.write(b"abc"), 3);
        assert_eq!(boxed.read_line(b'\n'), "ok");
    }
}
