use std::fs::{metadata, File};
use std::io::prelude::*;
use std::io::{self, BufReader, ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::scheduler::Partition;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A byte range of a text file.
///
/// A chunk owns every line whose first byte lies in `(start, end]`; the chunk starting at
/// zero also owns the line at offset zero.  Chunks produced by `split_file` therefore
/// hand out each line of the file exactly once, however the boundaries fall.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    path: Arc<PathBuf>,
    start: u64,
    end: u64
}

impl Chunk {

    /// Creates a chunk covering `start..end` of `path`.
    pub fn new(path: Arc<PathBuf>, start: u64, end: u64) -> Self {
        Chunk { path: path, start: start, end: end }
    }

    /// File the chunk reads from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// First byte of the range
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last byte of the range
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Opens the file and positions a reader on the first line owned by this chunk.
    pub fn lines(&self) -> io::Result<ChunkLines> {
        let f = File::open(self.path.as_path())?;
        let mut reader = BufReader::new(f);
        reader.seek(SeekFrom::Start(self.start))?;

        let pos = if self.start > 0 {
            // Skip first line, which belongs to the previous chunk
            let mut s = Vec::new();
            let size = reader.read_until(b'\n', &mut s)?;
            self.start + size as u64
        } else {
            0
        };

        Ok(ChunkLines {
            reader: reader,
            pos: pos,
            end: self.end,
            done: false
        })
    }
}

impl Partition for Chunk {
    fn weight(&self) -> u64 {
        self.end - self.start
    }
}

/// Iterator over the lines owned by a `Chunk`, yielding each line's byte offset and its
/// text with the line terminator removed.
///
/// Bytes that are not valid UTF-8 decode to U+FFFD rather than failing the read, and a
/// byte order mark at the very start of the file is dropped.
pub struct ChunkLines {
    reader: BufReader<File>,
    pos: u64,
    end: u64,
    done: bool
}

impl Iterator for ChunkLines {
    type Item = io::Result<(u64, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos > self.end {
            return None;
        }

        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                self.done = true;
                None
            },
            Ok(size) => {
                let offset = self.pos;
                self.pos += size as u64;
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                if offset == 0 && buf.starts_with(UTF8_BOM) {
                    buf.drain(..UTF8_BOM.len());
                }
                let line = match String::from_utf8(buf) {
                    Ok(line) => line,
                    Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned()
                };
                Some(Ok((offset, line)))
            },
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Splits a file into chunks of roughly `chunk_size` bytes.  An empty file yields no
/// chunks.
pub fn split_file<P: AsRef<Path>>(path: P, chunk_size: u64) -> io::Result<Vec<Chunk>> {
    let path = Arc::new(path.as_ref().to_path_buf());
    let file_size = metadata(path.as_path())?.len();
    let chunk_size = chunk_size.max(1);

    let mut chunks = Vec::new();
    let mut cur_offset = 0u64;
    while cur_offset < file_size {
        chunks.push(Chunk::new(path.clone(), cur_offset, cur_offset + chunk_size));
        cur_offset += chunk_size;
    }
    debug!("Split {:?} ({} bytes) into {} chunks", path, file_size, chunks.len());
    Ok(chunks)
}

/// Returns the 1-based number of the line starting at byte `offset`.
///
/// Only meant for diagnostics: it rescans the file up to `offset`.
pub fn line_number_at<P: AsRef<Path>>(path: P, offset: u64) -> io::Result<usize> {
    let mut reader = BufReader::new(File::open(path)?).take(offset);
    let mut buf = [0u8; 64 * 1024];
    let mut line = 1;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e)
        };
        line += buf[..n].iter().filter(|b| **b == b'\n').count();
    }
    Ok(line)
}
