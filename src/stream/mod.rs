//! Byte stream abstraction: sequential read, position query, optional seek.
//!
//! The parser only ever needs these four capabilities, so anything from an
//! in-memory slice to a socket can feed it. Forward-only sources work for a
//! single parse; resuming at an arbitrary offset additionally needs `seek`.

pub mod fs;
pub mod mmap;

use crate::error::{ParseError, Result};

pub use fs::FsStream;
pub use mmap::MapStream;

/// A positioned byte source.
pub trait Stream {
    /// Read up to `buf.len()` bytes. `Ok(0)` means end of input.
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Current byte offset from the start of the source.
    fn tell(&self) -> u64;

    /// Whether further bytes are available.
    fn eos(&self) -> bool;

    /// Reposition to an absolute offset.
    ///
    /// Sources that cannot rewind keep the default, which fails with
    /// [`ParseError::SeekUnsupported`].
    fn seek(&mut self, offset: u64) -> Result<u64> {
        let _ = offset;
        Err(ParseError::SeekUnsupported)
    }
}

/// In-memory stream over any byte container.
///
/// Always seekable. The cheapest way to feed the parser in tests and when
/// the message is already resident.
#[derive(Debug)]
pub struct MemStream<T: AsRef<[u8]>> {
    data: T,
    pos: u64,
}

impl<T: AsRef<[u8]>> MemStream<T> {
    pub fn new(data: T) -> Self {
        Self { data, pos: 0 }
    }

    /// Total length of the underlying buffer.
    pub fn len(&self) -> u64 {
        self.data.as_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.as_ref().is_empty()
    }
}

impl<T: AsRef<[u8]>> Stream for MemStream<T> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let data = self.data.as_ref();
        let start = self.pos.min(data.len() as u64) as usize;
        let n = (data.len() - start).min(buf.len());
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn eos(&self) -> bool {
        self.pos >= self.data.as_ref().len() as u64
    }

    fn seek(&mut self, offset: u64) -> Result<u64> {
        self.pos = offset.min(self.data.as_ref().len() as u64);
        Ok(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_stream_read_and_tell() {
        let mut stream = MemStream::new(b"hello world".to_vec());
        let mut buf = [0u8; 5];
        assert_eq!(stream.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
        assert_eq!(stream.tell(), 5);
        assert!(!stream.eos());
    }

    #[test]
    fn test_mem_stream_eos() {
        let mut stream = MemStream::new(&b"ab"[..]);
        let mut buf = [0u8; 8];
        assert_eq!(stream.read(&mut buf).unwrap(), 2);
        assert!(stream.eos());
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_mem_stream_seek() {
        let mut stream = MemStream::new(b"abcdef".to_vec());
        stream.seek(4).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(stream.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
    }

    #[test]
    fn test_tell_idempotent() {
        let stream = MemStream::new(b"abc".to_vec());
        assert_eq!(stream.tell(), stream.tell());
        assert_eq!(stream.eos(), stream.eos());
    }
}
