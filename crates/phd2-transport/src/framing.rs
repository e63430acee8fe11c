//! CR/LF line framing
//!
//! The server terminates lines with `\r\n`, but either byte alone also ends a
//! line. Empty lines (including the gap inside `\r\n`) are dropped. Partial
//! input stays buffered until its terminator arrives, up to
//! [`MAX_LINE_LEN`] bytes; a longer line is discarded through its terminator
//! and reported as [`TransportError::LineTooLong`].

use crate::TransportError;
use std::collections::VecDeque;

/// Longest line accepted from the peer, excluding the terminator
pub const MAX_LINE_LEN: usize = 64 * 1024;

#[derive(Debug)]
enum Frame {
    Line(String),
    Oversized,
}

/// Splits a byte stream into lines.
///
/// ```
/// use phd2_transport::LineSplitter;
///
/// let mut s = LineSplitter::new();
/// s.push(b"{\"Event\":\"Paused\"}\r\n{\"Ev");
/// assert_eq!(s.next_line().unwrap().unwrap(), "{\"Event\":\"Paused\"}");
/// assert!(s.next_line().is_none());
/// ```
#[derive(Debug)]
pub struct LineSplitter {
    pending: Vec<u8>,
    frames: VecDeque<Frame>,
    limit: usize,
    discarding: bool,
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self::with_limit(MAX_LINE_LEN)
    }
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splitter that rejects lines longer than `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            frames: VecDeque::new(),
            limit,
            discarding: false,
        }
    }

    /// Append raw bytes, queueing every line they complete.
    pub fn push(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if b == b'\r' || b == b'\n' {
                if self.discarding {
                    self.frames.push_back(Frame::Oversized);
                    self.discarding = false;
                } else if !self.pending.is_empty() {
                    let line = String::from_utf8_lossy(&self.pending).into_owned();
                    self.frames.push_back(Frame::Line(line));
                    self.pending.clear();
                }
            } else if self.discarding {
                continue;
            } else if self.pending.len() >= self.limit {
                self.pending = Vec::new();
                self.discarding = true;
            } else {
                self.pending.push(b);
            }
        }
    }

    /// Next complete line, if any. An oversized line yields
    /// [`TransportError::LineTooLong`] in its place; the stream stays usable.
    pub fn next_line(&mut self) -> Option<Result<String, TransportError>> {
        self.frames.pop_front().map(|frame| match frame {
            Frame::Line(line) => Ok(line),
            Frame::Oversized => Err(TransportError::LineTooLong { limit: self.limit }),
        })
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(s: &mut LineSplitter) -> Option<String> {
        s.next_line().map(|r| r.unwrap())
    }

    #[test]
    fn test_crlf_lines() {
        let mut s = LineSplitter::new();
        s.push(b"{\"a\":1}\r\n{\"b\":2}\r\n");
        assert_eq!(line(&mut s).as_deref(), Some("{\"a\":1}"));
        assert_eq!(line(&mut s).as_deref(), Some("{\"b\":2}"));
        assert_eq!(line(&mut s), None);
    }

    #[test]
    fn test_partial_line_is_buffered() {
        let mut s = LineSplitter::new();
        s.push(b"{\"Event\":\"Pa");
        assert_eq!(line(&mut s), None);
        assert_eq!(s.pending_len(), 12);

        s.push(b"used\"}\r");
        assert_eq!(line(&mut s).as_deref(), Some("{\"Event\":\"Paused\"}"));
        assert_eq!(s.pending_len(), 0);

        // trailing LF of the split CRLF produces no empty line
        s.push(b"\n");
        assert_eq!(line(&mut s), None);
    }

    #[test]
    fn test_bare_lf_and_blank_lines() {
        let mut s = LineSplitter::new();
        s.push(b"one\n\n\r\ntwo\n");
        assert_eq!(line(&mut s).as_deref(), Some("one"));
        assert_eq!(line(&mut s).as_deref(), Some("two"));
        assert_eq!(line(&mut s), None);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut s = LineSplitter::new();
        s.push(&[b'o', b'k', 0xff, b'\n']);
        assert_eq!(line(&mut s).as_deref(), Some("ok\u{fffd}"));
    }

    #[test]
    fn test_line_at_limit_is_kept() {
        let mut s = LineSplitter::with_limit(4);
        s.push(b"abcd\r\n");
        assert_eq!(line(&mut s).as_deref(), Some("abcd"));
    }

    #[test]
    fn test_oversized_line_is_dropped_and_reported() {
        let mut s = LineSplitter::with_limit(4);
        s.push(b"abc");
        s.push(b"defgh");
        // buffer no longer grows while the rest of the line is skipped
        assert_eq!(s.pending_len(), 0);
        s.push(b"ij\r\nok\r\n");

        match s.next_line() {
            Some(Err(TransportError::LineTooLong { limit })) => assert_eq!(limit, 4),
            other => panic!("expected LineTooLong, got {:?}", other),
        }
        assert_eq!(line(&mut s).as_deref(), Some("ok"));
        assert_eq!(line(&mut s), None);
    }
}
