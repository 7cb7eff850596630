//! File-backed stream.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{ParseError, Result};
use crate::stream::Stream;

/// Seekable stream over a regular file.
///
/// The length is captured at open time; `eos` compares against it rather
/// than probing the file, so `tell`/`eos` stay cheap and side-effect free.
#[derive(Debug)]
pub struct FsStream {
    path: PathBuf,
    file: File,
    pos: u64,
    len: u64,
}

impl FsStream {
    /// Open a file for parsing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ParseError::FileNotFound(path.clone())
            } else {
                ParseError::io(&path, e)
            }
        })?;
        let len = file
            .metadata()
            .map_err(|e| ParseError::io(&path, e))?
            .len();
        Ok(Self {
            path,
            file,
            pos: 0,
            len,
        })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size in bytes, as seen at open time.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Stream for FsStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.file.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn eos(&self) -> bool {
        self.pos >= self.len
    }

    fn seek(&mut self, offset: u64) -> Result<u64> {
        let pos = self
            .file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| ParseError::Seek { offset, source: e })?;
        self.pos = pos;
        Ok(pos)
    }
}
