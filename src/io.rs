//! Line sources for the parser: buffered or memory-mapped file readers and a
//! wrapper over any `BufRead`.
//!
//! Every source yields the raw bytes of each line with the terminator (and a
//! trailing `\r`) removed. Nothing is decoded here: dumps are rarely valid
//! UTF-8, and the dedup ledger compares lines byte for byte.
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use memmap2::Mmap;

use crate::failure::IngestError;

/// Threshold in bytes above which we attempt to use mmap for reading.
pub const DEFAULT_MMAP_THRESHOLD_BYTES: u64 = 16 * 1024 * 1024; // 16 MiB

pub type LineIter = Box<dyn Iterator<Item = io::Result<Vec<u8>>> + Send + 'static>;

/// Decide whether to use mmap based on file size and threshold.
pub fn should_use_mmap(file_size_bytes: u64, threshold_bytes: u64) -> bool {
    file_size_bytes >= threshold_bytes
}

/// Iterate lines of any buffered reader.
pub fn iter_lines_reader<R: BufRead>(reader: R) -> ReaderLines<R> {
    ReaderLines { reader, buf: Vec::new() }
}

/// Iterate lines from a file path using a buffered reader (non-mmap).
pub fn iter_lines_bufread<P: AsRef<Path>>(path: P) -> Result<LineIter, IngestError> {
    let file = open(path.as_ref())?;
    Ok(Box::new(iter_lines_reader(BufReader::new(file))))
}

/// Iterate lines from a file path using mmap, scanning for '\n' boundaries.
pub fn iter_lines_mmap<P: AsRef<Path>>(path: P) -> Result<LineIter, IngestError> {
    let path = path.as_ref();
    let file = open(path)?;
    // SAFETY: the map is read-only; a dump modified while we scan it only
    // changes which bytes we see.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|source| IngestError::Map {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Box::new(MmapLines { mmap, pos: 0 }))
}

/// Choose mmap or bufread and return an iterator over lines.
pub fn iter_lines_auto<P: AsRef<Path>>(path: P, threshold_bytes: u64) -> Result<LineIter, IngestError> {
    let path = path.as_ref();
    let meta = std::fs::metadata(path).map_err(|source| IngestError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    if meta.is_file() && should_use_mmap(meta.len(), threshold_bytes) {
        log::debug!("reading {} via mmap ({} bytes)", path.display(), meta.len());
        iter_lines_mmap(path)
    } else {
        iter_lines_bufread(path)
    }
}

fn open(path: &Path) -> Result<File, IngestError> {
    File::open(path).map_err(|source| IngestError::Open {
        path: path.to_path_buf(),
        source,
    })
}

pub struct ReaderLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> Iterator for ReaderLines<R> {
    type Item = io::Result<Vec<u8>>;
    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                let line = self.buf.strip_suffix(b"\n").unwrap_or(&self.buf[..]);
                Some(Ok(line_from_bytes(line)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

struct MmapLines {
    mmap: Mmap,
    pos: usize,
}

impl Iterator for MmapLines {
    type Item = io::Result<Vec<u8>>;
    fn next(&mut self) -> Option<Self::Item> {
        let data: &[u8] = &self.mmap;
        if self.pos >= data.len() {
            return None;
        }
        let start = self.pos;
        if let Some(off) = memchr::memchr(b'\n', &data[start..]) {
            let end = start + off;
            self.pos = end + 1;
            Some(Ok(line_from_bytes(&data[start..end])))
        } else {
            // Last line without trailing newline
            self.pos = data.len();
            Some(Ok(line_from_bytes(&data[start..])))
        }
    }
}

fn line_from_bytes(bytes: &[u8]) -> Vec<u8> {
    bytes.strip_suffix(b"\r").unwrap_or(bytes).to_vec()
}
