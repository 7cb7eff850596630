//! Buffered logical-line reading with byte-offset bookkeeping.
//!
//! Reads the stream in chunks, never loading more than one refill at a
//! time, and yields each physical line together with the offset of its
//! first byte. One line of lookahead is supported so callers can classify
//! a line (boundary delimiter, blank separator) before deciding whether
//! the current scope consumes it.

use crate::error::{ParseError, Result};
use crate::stream::Stream;

/// Size of one refill chunk.
const READ_CHUNK: usize = 8 * 1024;

/// One physical line, terminator included.
#[derive(Debug, Clone)]
pub struct Line {
    offset: u64,
    bytes: Vec<u8>,
}

impl Line {
    /// Byte offset of the line's first byte in the source.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The raw line including its terminator (if the source had one).
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The line without its `\n` / `\r\n` terminator.
    pub fn content(&self) -> &[u8] {
        let mut end = self.bytes.len();
        if end > 0 && self.bytes[end - 1] == b'\n' {
            end -= 1;
        }
        if end > 0 && self.bytes[end - 1] == b'\r' {
            end -= 1;
        }
        &self.bytes[..end]
    }

    /// Length in bytes, terminator included.
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether this line is a bare terminator (the header/body separator).
    pub fn is_blank(&self) -> bool {
        self.content().is_empty()
    }
}

/// Offset-tracking line reader over any [`Stream`].
#[derive(Debug)]
pub struct LineReader<S: Stream> {
    stream: S,
    buf: Vec<u8>,
    pos: usize,
    /// Source offset of `buf[pos]`.
    offset: u64,
    pending: Option<Line>,
    hit_eof: bool,
}

impl<S: Stream> LineReader<S> {
    /// Wrap a stream, picking up at its current position.
    pub fn new(stream: S) -> Self {
        let offset = stream.tell();
        Self {
            stream,
            buf: Vec::with_capacity(READ_CHUNK),
            pos: 0,
            offset,
            pending: None,
            hit_eof: false,
        }
    }

    /// Offset of the next byte this reader will yield.
    pub fn tell(&self) -> u64 {
        match &self.pending {
            Some(line) => line.offset,
            None => self.offset,
        }
    }

    /// Whether all input has been yielded.
    pub fn eos(&self) -> bool {
        self.pending.is_none() && self.pos >= self.buf.len() && (self.hit_eof || self.stream.eos())
    }

    /// Next line, consuming it.
    pub fn next_line(&mut self) -> Result<Option<Line>> {
        if let Some(line) = self.pending.take() {
            return Ok(Some(line));
        }
        loop {
            if let Some(nl) = self.buf[self.pos..].iter().position(|&b| b == b'\n') {
                return Ok(Some(self.take_line(self.pos + nl + 1)));
            }
            if self.hit_eof {
                if self.pos < self.buf.len() {
                    // Final line without terminator
                    return Ok(Some(self.take_line(self.buf.len())));
                }
                return Ok(None);
            }
            self.fill()?;
        }
    }

    /// Next line without consuming it. Stable across repeated calls.
    pub fn peek_line(&mut self) -> Result<Option<&Line>> {
        if self.pending.is_none() {
            self.pending = self.next_line()?;
        }
        Ok(self.pending.as_ref())
    }

    /// Reposition to an absolute offset, dropping all buffered state.
    ///
    /// Requires the underlying stream to support `seek`.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        let pos = self.stream.seek(offset)?;
        self.buf.clear();
        self.pos = 0;
        self.offset = pos;
        self.pending = None;
        self.hit_eof = false;
        Ok(())
    }

    /// Consume the wrapper, returning the stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    fn take_line(&mut self, end: usize) -> Line {
        let line = Line {
            offset: self.offset,
            bytes: self.buf[self.pos..end].to_vec(),
        };
        self.offset += (end - self.pos) as u64;
        self.pos = end;
        line
    }

    fn fill(&mut self) -> Result<()> {
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        let read_at = self.offset + self.buf.len() as u64;
        let mut chunk = [0u8; READ_CHUNK];
        let n = self
            .stream
            .read(&mut chunk)
            .map_err(|e| ParseError::stream(read_at, e))?;
        if n == 0 {
            self.hit_eof = true;
        } else {
            self.buf.extend_from_slice(&chunk[..n]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemStream;

    fn reader(data: &[u8]) -> LineReader<MemStream<Vec<u8>>> {
        LineReader::new(MemStream::new(data.to_vec()))
    }

    #[test]
    fn test_lines_and_offsets() {
        let mut r = reader(b"alpha\nbeta\r\ngamma");
        let a = r.next_line().unwrap().unwrap();
        assert_eq!(a.offset(), 0);
        assert_eq!(a.content(), b"alpha");
        let b = r.next_line().unwrap().unwrap();
        assert_eq!(b.offset(), 6);
        assert_eq!(b.content(), b"beta");
        assert_eq!(b.as_bytes(), b"beta\r\n");
        let c = r.next_line().unwrap().unwrap();
        assert_eq!(c.offset(), 12);
        assert_eq!(c.content(), b"gamma");
        assert!(r.next_line().unwrap().is_none());
        assert!(r.eos());
    }

    #[test]
    fn test_peek_does_not_advance_tell() {
        let mut r = reader(b"one\ntwo\n");
        assert_eq!(r.tell(), 0);
        let peeked = r.peek_line().unwrap().unwrap().offset();
        assert_eq!(peeked, 0);
        assert_eq!(r.tell(), 0);
        // Peek is idempotent
        assert_eq!(r.peek_line().unwrap().unwrap().content(), b"one");
        r.next_line().unwrap();
        assert_eq!(r.tell(), 4);
    }

    #[test]
    fn test_blank_line_detection() {
        let mut r = reader(b"a\n\n\r\nb\n");
        assert!(!r.next_line().unwrap().unwrap().is_blank());
        assert!(r.next_line().unwrap().unwrap().is_blank());
        assert!(r.next_line().unwrap().unwrap().is_blank());
        assert!(!r.next_line().unwrap().unwrap().is_blank());
    }

    #[test]
    fn test_long_line_spanning_chunks() {
        let mut data = vec![b'x'; READ_CHUNK + 100];
        data.push(b'\n');
        data.extend_from_slice(b"tail\n");
        let mut r = reader(&data);
        let long = r.next_line().unwrap().unwrap();
        assert_eq!(long.len() as usize, READ_CHUNK + 101);
        let tail = r.next_line().unwrap().unwrap();
        assert_eq!(tail.offset() as usize, READ_CHUNK + 101);
        assert_eq!(tail.content(), b"tail");
    }

    #[test]
    fn test_seek_resets_state() {
        let mut r = reader(b"first\nsecond\n");
        r.next_line().unwrap();
        r.peek_line().unwrap();
        r.seek(0).unwrap();
        assert_eq!(r.tell(), 0);
        assert_eq!(r.next_line().unwrap().unwrap().content(), b"first");
    }

    #[test]
    fn test_empty_input() {
        let mut r = reader(b"");
        assert!(r.peek_line().unwrap().is_none());
        assert!(r.next_line().unwrap().is_none());
        assert!(r.eos());
        assert_eq!(r.tell(), 0);
    }
}
