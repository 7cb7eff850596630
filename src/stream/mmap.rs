//! Memory-mapped stream for large files.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::error::{ParseError, Result};
use crate::stream::Stream;

/// Stream over a memory-mapped file.
///
/// Reads are plain slice copies out of the map, so repeated parsing of a
/// multi-gigabyte mbox never touches the allocator for file content. Seeks
/// are free.
#[derive(Debug)]
pub struct MapStream {
    path: PathBuf,
    map: Mmap,
    pos: u64,
}

impl MapStream {
    /// Map a file for parsing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ParseError::FileNotFound(path.clone())
            } else {
                ParseError::io(&path, e)
            }
        })?;
        // Safety: the map is read-only and private to this stream.
        let map = unsafe { Mmap::map(&file) }.map_err(|e| ParseError::io(&path, e))?;
        Ok(Self { path, map, pos: 0 })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mapped length in bytes.
    pub fn len(&self) -> u64 {
        self.map.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Borrow a byte range directly from the map, e.g. a leaf part's
    /// content range produced by the parser.
    pub fn slice(&self, start: u64, end: u64) -> &[u8] {
        let end = end.min(self.map.len() as u64) as usize;
        let start = (start as usize).min(end);
        &self.map[start..end]
    }
}

impl Stream for MapStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let start = self.pos.min(self.map.len() as u64) as usize;
        let n = (self.map.len() - start).min(buf.len());
        buf[..n].copy_from_slice(&self.map[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn eos(&self) -> bool {
        self.pos >= self.map.len() as u64
    }

    fn seek(&mut self, offset: u64) -> Result<u64> {
        self.pos = offset.min(self.map.len() as u64);
        Ok(self.pos)
    }
}
