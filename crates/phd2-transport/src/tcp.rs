//! TCP line stream
//!
//! Reader and writer share one socket through `try_clone`. The reader uses a
//! socket read timeout so a blocked read returns periodically; the writer's
//! `close` shuts the socket down in both directions, which wakes the reader
//! immediately with end-of-stream.

use crate::{LineReader, LineSplitter, LineWriter, SplittableStream, TransportError};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, trace, warn};

const READ_CHUNK: usize = 4096;

/// Connected TCP stream, not yet split
#[derive(Debug)]
pub struct TcpLineStream {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpLineStream {
    /// Resolve `host` and connect to the first address that accepts.
    pub fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|_| TransportError::Resolve {
                host: host.to_string(),
            })?
            .collect();

        if addrs.is_empty() {
            return Err(TransportError::Resolve {
                host: host.to_string(),
            });
        }

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(read_timeout))?;
                    stream.set_nodelay(true)?;
                    debug!("Connected to {}", addr);
                    return Ok(Self { stream, peer: addr });
                },
                Err(e) => {
                    debug!("Connect to {} failed: {}", addr, e);
                    last_err = Some(TransportError::Connect {
                        addr: addr.to_string(),
                        source: e,
                    });
                },
            }
        }

        Err(last_err.unwrap_or(TransportError::Resolve {
            host: host.to_string(),
        }))
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl SplittableStream for TcpLineStream {
    type Reader = TcpLineReader;
    type Writer = TcpLineWriter;

    fn split(self) -> Result<(Self::Reader, Self::Writer), TransportError> {
        let read_half = self.stream.try_clone()?;
        Ok((
            TcpLineReader {
                stream: read_half,
                splitter: LineSplitter::new(),
                buf: [0u8; READ_CHUNK],
            },
            TcpLineWriter {
                stream: self.stream,
                closed: false,
            },
        ))
    }
}

/// Receiving half of a [`TcpLineStream`]
pub struct TcpLineReader {
    stream: TcpStream,
    splitter: LineSplitter,
    buf: [u8; READ_CHUNK],
}

impl LineReader for TcpLineReader {
    fn read_line(&mut self) -> Result<String, TransportError> {
        loop {
            if let Some(line) = self.splitter.next_line() {
                let line = line?;
                trace!("<- {}", line);
                return Ok(line);
            }

            match self.stream.read(&mut self.buf) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => self.splitter.push(&self.buf[..n]),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(TransportError::Timeout);
                },
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::Io(e)),
            }
        }
    }
}

/// Sending half of a [`TcpLineStream`]; `close` shuts the socket down both ways.
pub struct TcpLineWriter {
    stream: TcpStream,
    closed: bool,
}

impl LineWriter for TcpLineWriter {
    fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        trace!("-> {}", line.trim_end());
        self.stream.write_all(line.as_bytes())?;
        self.stream.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // peer already gone
            Err(e) if e.kind() == ErrorKind::NotConnected => Ok(()),
            Err(e) => {
                warn!("Socket shutdown failed: {}", e);
                Err(TransportError::Io(e))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::thread;

    fn listener() -> (TcpListener, u16) {
        let l = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = l.local_addr().unwrap().port();
        (l, port)
    }

    #[test]
    fn test_connect_and_exchange_lines() {
        let (l, port) = listener();
        let server = thread::spawn(move || {
            let (mut sock, _) = l.accept().unwrap();
            sock.write_all(b"{\"Event\":\"Version\"}\r\n").unwrap();
            let mut reader = BufReader::new(sock.try_clone().unwrap());
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            line
        });

        let stream = TcpLineStream::connect(
            "127.0.0.1",
            port,
            Duration::from_secs(2),
            Duration::from_secs(2),
        )
        .unwrap();
        assert_eq!(stream.peer_addr().port(), port);
        let (mut rx, mut tx) = stream.split().unwrap();

        assert_eq!(rx.read_line().unwrap(), "{\"Event\":\"Version\"}");
        tx.write_line("{\"method\":\"get_app_state\",\"id\":1}\r\n").unwrap();

        let received = server.join().unwrap();
        assert_eq!(received, "{\"method\":\"get_app_state\",\"id\":1}\r\n");
    }

    #[test]
    fn test_read_timeout() {
        let (l, port) = listener();
        let server = thread::spawn(move || {
            let (sock, _) = l.accept().unwrap();
            thread::sleep(Duration::from_millis(300));
            drop(sock);
        });

        let stream = TcpLineStream::connect(
            "127.0.0.1",
            port,
            Duration::from_secs(2),
            Duration::from_millis(50),
        )
        .unwrap();
        let (mut rx, _tx) = stream.split().unwrap();
        assert!(matches!(rx.read_line(), Err(TransportError::Timeout)));
        server.join().unwrap();
    }

    #[test]
    fn test_peer_close_is_closed() {
        let (l, port) = listener();
        let server = thread::spawn(move || {
            let (sock, _) = l.accept().unwrap();
            drop(sock);
        });

        let stream = TcpLineStream::connect(
            "127.0.0.1",
            port,
            Duration::from_secs(2),
            Duration::from_secs(2),
        )
        .unwrap();
        let (mut rx, _tx) = stream.split().unwrap();
        server.join().unwrap();
        assert!(matches!(rx.read_line(), Err(TransportError::Closed)));
    }

    #[test]
    fn test_local_close_unblocks_reader() {
        let (l, port) = listener();
        let server = thread::spawn(move || {
            let (sock, _) = l.accept().unwrap();
            thread::sleep(Duration::from_millis(500));
            drop(sock);
        });

        let stream = TcpLineStream::connect(
            "127.0.0.1",
            port,
            Duration::from_secs(2),
            Duration::from_secs(5),
        )
        .unwrap();
        let (mut rx, mut tx) = stream.split().unwrap();

        let reader = thread::spawn(move || rx.read_line());
        thread::sleep(Duration::from_millis(50));
        tx.close().unwrap();

        let result = reader.join().unwrap();
        assert!(result.is_err());
        assert!(matches!(
            tx.write_line("{}\r\n"),
            Err(TransportError::Closed)
        ));
        server.join().unwrap();
    }

    #[test]
    fn test_connection_refused() {
        let (l, port) = listener();
        drop(l);
        let err = TcpLineStream::connect(
            "127.0.0.1",
            port,
            Duration::from_millis(500),
            Duration::from_millis(500),
        )
        .unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }
}
