//! In-memory line stream for tests
//!
//! [`mock_pair`] returns the client-side stream plus a [`MockPeer`] standing in
//! for the server. The peer pushes raw text (which goes through the same
//! framing as TCP, so partial lines work) and reads back what the client wrote.

use crate::{LineReader, LineSplitter, LineWriter, SplittableStream, TransportError};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Debug)]
enum Chunk {
    Data(String),
    Eof,
}

/// Build a connected client stream / server peer pair.
pub fn mock_pair(read_timeout: Duration) -> (MockLineStream, MockPeer) {
    let (to_client, client_rx) = unbounded();
    let (client_tx, from_client) = unbounded();
    let aborted = Arc::new(AtomicBool::new(false));

    let stream = MockLineStream {
        rx: client_rx,
        tx: client_tx,
        wake: to_client.clone(),
        aborted: aborted.clone(),
        read_timeout,
    };
    let peer = MockPeer {
        to_client,
        from_client,
        aborted,
    };
    (stream, peer)
}

pub struct MockLineStream {
    rx: Receiver<Chunk>,
    tx: Sender<String>,
    wake: Sender<Chunk>,
    aborted: Arc<AtomicBool>,
    read_timeout: Duration,
}

impl SplittableStream for MockLineStream {
    type Reader = MockLineReader;
    type Writer = MockLineWriter;

    fn split(self) -> Result<(Self::Reader, Self::Writer), TransportError> {
        Ok((
            MockLineReader {
                rx: self.rx,
                splitter: LineSplitter::new(),
                aborted: self.aborted.clone(),
                eof: false,
                read_timeout: self.read_timeout,
            },
            MockLineWriter {
                tx: self.tx,
                wake: self.wake,
                aborted: self.aborted,
            },
        ))
    }
}

pub struct MockLineReader {
    rx: Receiver<Chunk>,
    splitter: LineSplitter,
    aborted: Arc<AtomicBool>,
    eof: bool,
    read_timeout: Duration,
}

impl LineReader for MockLineReader {
    fn read_line(&mut self) -> Result<String, TransportError> {
        loop {
            if let Some(line) = self.splitter.next_line() {
                return line;
            }
            if self.eof || self.aborted.load(Ordering::Acquire) {
                return Err(TransportError::Closed);
            }
            match self.rx.recv_timeout(self.read_timeout) {
                Ok(Chunk::Data(text)) => self.splitter.push(text.as_bytes()),
                Ok(Chunk::Eof) | Err(RecvTimeoutError::Disconnected) => self.eof = true,
                Err(RecvTimeoutError::Timeout) => return Err(TransportError::Timeout),
            }
        }
    }
}

pub struct MockLineWriter {
    tx: Sender<String>,
    wake: Sender<Chunk>,
    aborted: Arc<AtomicBool>,
}

impl LineWriter for MockLineWriter {
    fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        if self.aborted.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        self.tx.send(line.to_string()).map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.aborted.store(true, Ordering::Release);
        let _ = self.wake.send(Chunk::Eof);
        Ok(())
    }
}

/// Server side of a mock connection. Clones share the same connection.
#[derive(Clone)]
pub struct MockPeer {
    to_client: Sender<Chunk>,
    from_client: Receiver<String>,
    aborted: Arc<AtomicBool>,
}

impl MockPeer {
    /// Send raw text; no terminator is added.
    pub fn send_raw(&self, text: &str) {
        let _ = self.to_client.send(Chunk::Data(text.to_string()));
    }

    /// Send one line terminated with CR/LF.
    pub fn send_line(&self, line: &str) {
        self.send_raw(&format!("{}\r\n", line));
    }

    /// Next line written by the client, terminator stripped.
    pub fn recv_line_timeout(&self, timeout: Duration) -> Option<String> {
        self.from_client
            .recv_timeout(timeout)
            .ok()
            .map(|line| line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// End the stream as if the server hung up.
    pub fn close(&self) {
        let _ = self.to_client.send(Chunk::Eof);
    }

    /// Whether the client forced the stream closed
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_flow_both_ways() {
        let (stream, peer) = mock_pair(Duration::from_millis(100));
        let (mut rx, mut tx) = stream.split().unwrap();

        peer.send_raw("{\"Event\":");
        peer.send_raw("\"Paused\"}\r\n");
        assert_eq!(rx.read_line().unwrap(), "{\"Event\":\"Paused\"}");

        tx.write_line("{\"method\":\"loop\",\"id\":1}\r\n").unwrap();
        assert_eq!(
            peer.recv_line_timeout(Duration::from_millis(100)).as_deref(),
            Some("{\"method\":\"loop\",\"id\":1}")
        );
    }

    #[test]
    fn test_timeout_then_peer_close() {
        let (stream, peer) = mock_pair(Duration::from_millis(20));
        let (mut rx, _tx) = stream.split().unwrap();

        assert!(matches!(rx.read_line(), Err(TransportError::Timeout)));

        peer.send_line("last");
        peer.close();
        assert_eq!(rx.read_line().unwrap(), "last");
        assert!(matches!(rx.read_line(), Err(TransportError::Closed)));
        assert!(matches!(rx.read_line(), Err(TransportError::Closed)));
    }

    #[test]
    fn test_writer_close_aborts_reader() {
        let (stream, peer) = mock_pair(Duration::from_secs(5));
        let (mut rx, mut tx) = stream.split().unwrap();

        let handle = std::thread::spawn(move || rx.read_line());
        tx.close().unwrap();

        assert!(matches!(handle.join().unwrap(), Err(TransportError::Closed)));
        assert!(peer.is_aborted());
        assert!(matches!(tx.write_line("x\r\n"), Err(TransportError::Closed)));
    }
}
