//! Tag reading and navigation over a positioned byte source.
//!
//! Tags form a singly linked chain: `next == 0` continues right after the
//! payload, a positive `next` is an absolute position, a negative one ends
//! the chain. A trailing directory tag, when present, indexes every tag so
//! lookups by kind become a single seek.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use bytes::BytesMut;
use tracing::{debug, instrument, trace};

use super::config::StreamConfig;
use crate::format::constants::{
    FIFF_BLOCK_END, FIFF_BLOCK_START, FIFF_DIR, FIFF_DIR_POINTER, FIFF_FILE_ID,
};
use crate::format::metrics::{Metrics, TagDirection};
use crate::format::{DirEntry, Error, HEADER_SIZE, Next, Result, Tag, TagHeader};

/// FIFF reader over any seekable byte source.
#[derive(Debug)]
pub struct FiffStream<S> {
    inner: S,
    config: StreamConfig,
    directory: Option<Vec<DirEntry>>,
}

impl FiffStream<BufReader<File>> {
    /// Open a file with the default configuration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<S: Read + Seek> FiffStream<S> {
    /// Wrap a byte source with the default configuration.
    pub fn new(inner: S) -> Self {
        Self::with_config(inner, StreamConfig::default())
    }

    /// Wrap a byte source with an explicit configuration.
    pub fn with_config(inner: S, config: StreamConfig) -> Self {
        Self {
            inner,
            config,
            directory: None,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Unwrap the underlying source.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Current position.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Move to an absolute position.
    pub fn seek_to(&mut self, pos: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    fn read_full(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut got = 0;
        while got < buf.len() {
            match self.inner.read(&mut buf[got..]) {
                Ok(0) => {
                    Metrics::record_short_read();
                    return Err(Error::ShortRead {
                        needed: buf.len(),
                        got,
                    });
                }
                Ok(n) => got += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    /// Run `f`, returning to `start` if it fails.
    fn restoring<T>(&mut self, start: u64, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = f(self);
        if result.is_err() {
            let _ = self.inner.seek(SeekFrom::Start(start));
        }
        result
    }

    fn skip_to_following(&mut self, header: &TagHeader) -> Result<()> {
        match header.next_tag() {
            Next::Seek(pos) => {
                self.inner.seek(SeekFrom::Start(pos))?;
            }
            _ => {
                let size = header.payload_len(self.config.max_tag_size)?;
                self.inner.seek(SeekFrom::Current(size as i64))?;
            }
        }
        Ok(())
    }

    /// Read a tag header at `pos` (or the current position).
    ///
    /// With `skip_payload` the stream moves on to the following tag;
    /// otherwise it stays at the start of the payload. Fewer than
    /// [`HEADER_SIZE`] bytes is a [`Error::ShortRead`] and the position is
    /// left where it was.
    #[instrument(level = "trace", skip(self))]
    pub fn read_tag_info(&mut self, pos: Option<u64>, skip_payload: bool) -> Result<TagHeader> {
        let start = self.position()?;
        self.restoring(start, |this| {
            if let Some(pos) = pos {
                this.seek_to(pos)?;
            }
            let mut bytes = [0u8; HEADER_SIZE];
            this.read_full(&mut bytes)?;
            let header = TagHeader::from_bytes(&bytes, this.config.byte_order)?;
            #[cfg(feature = "debug-tools")]
            trace!(raw = %super::debug::hex(&bytes), "tag header bytes");
            trace!(kind = header.kind, type_code = %header.type_code, size = header.size, next = header.next, "read tag header");
            if skip_payload {
                this.skip_to_following(&header)?;
            }
            Ok(header)
        })
    }

    /// Read the payload belonging to `header`, which must just have been
    /// read with `skip_payload == false`.
    #[instrument(level = "trace", skip(self, header), fields(kind = header.kind))]
    pub fn read_tag_data(&mut self, header: &TagHeader) -> Result<Tag> {
        let size = header.payload_len(self.config.max_tag_size)?;
        let mut payload = BytesMut::zeroed(size);
        self.read_full(&mut payload)?;
        Metrics::record_tag(TagDirection::Read, size);

        let tag = Tag::from_wire(header, payload, self.config.byte_order);
        if let Next::Seek(pos) = header.next_tag() {
            self.inner.seek(SeekFrom::Start(pos))?;
        }
        Ok(tag)
    }

    /// Read a complete tag at `pos` (or the current position).
    pub fn read_tag(&mut self, pos: Option<u64>) -> Result<Tag> {
        let start = self.position()?;
        self.restoring(start, |this| {
            let header = this.read_tag_info(pos, false)?;
            this.read_tag_data(&header)
        })
    }

    /// Iterate over the tag chain from the current position.
    pub fn tags(&mut self) -> Tags<'_, S> {
        Tags {
            stream: self,
            visited: HashSet::new(),
            done: false,
        }
    }

    /// Directory of the stream, read once and cached.
    ///
    /// Uses the directory tag referenced by the file's directory pointer
    /// when there is one; otherwise scans every header in the chain.
    #[instrument(level = "debug", skip(self))]
    pub fn directory(&mut self) -> Result<&[DirEntry]> {
        if self.directory.is_none() {
            let entries = match self.read_stored_directory()? {
                Some(entries) => entries,
                None => self.scan_directory()?,
            };
            debug!(entries = entries.len(), "directory ready");
            self.directory = Some(entries);
        }
        Ok(self.directory.as_deref().unwrap_or_default())
    }

    fn read_stored_directory(&mut self) -> Result<Option<Vec<DirEntry>>> {
        let first = match self.read_tag(Some(0)) {
            Ok(tag) => tag,
            Err(Error::ShortRead { .. }) => return Ok(None),
            Err(err) => return Err(err),
        };
        if first.kind() != FIFF_FILE_ID || first.next_tag() == Next::None {
            return Ok(None);
        }
        let pointer = match self.read_tag(None) {
            Ok(tag) => tag,
            Err(Error::ShortRead { .. }) => return Ok(None),
            Err(err) => return Err(err),
        };
        if pointer.kind() != FIFF_DIR_POINTER {
            return Ok(None);
        }
        let Some(pos) = pointer.to_int().and_then(|p| u64::try_from(p).ok()).filter(|&p| p > 0)
        else {
            return Ok(None);
        };
        let dir = self.read_tag(Some(pos))?;
        if dir.kind() != FIFF_DIR {
            debug!(pos, kind = dir.kind(), "directory pointer does not lead to a directory");
            return Ok(None);
        }
        Ok(dir.to_dir_entries().map(<[DirEntry]>::to_vec))
    }

    fn scan_directory(&mut self) -> Result<Vec<DirEntry>> {
        self.seek_to(0)?;
        let mut entries = Vec::new();
        let mut visited = HashSet::new();
        loop {
            let pos = self.position()?;
            if !visited.insert(pos) {
                return Err(Error::CyclicChain { pos });
            }
            let header = match self.read_tag_info(None, true) {
                Ok(header) => header,
                Err(Error::ShortRead { got: 0, .. }) => break,
                Err(err) => return Err(err),
            };
            entries.push(DirEntry {
                kind: header.kind,
                type_code: header.type_code,
                size: header.size,
                pos: i32::try_from(pos).map_err(|_| {
                    Error::Io(io::Error::other("tag position beyond 2 GiB"))
                })?,
            });
            if header.next_tag() == Next::None {
                break;
            }
        }
        debug!(entries = entries.len(), "scanned tag chain");
        Ok(entries)
    }

    /// Read the tag a directory entry points at.
    pub fn read_entry(&mut self, entry: &DirEntry) -> Result<Tag> {
        let pos = u64::try_from(entry.pos)
            .map_err(|_| Error::Io(io::Error::other("negative directory position")))?;
        self.read_tag(Some(pos))
    }

    /// First tag of the given kind.
    pub fn find(&mut self, kind: i32) -> Result<Option<Tag>> {
        let entry = self.directory()?.iter().find(|e| e.kind == kind).copied();
        entry.map(|e| self.read_entry(&e)).transpose()
    }

    /// Every tag of the given kind, in file order.
    pub fn find_all(&mut self, kind: i32) -> Result<Vec<Tag>> {
        let entries: Vec<DirEntry> = self
            .directory()?
            .iter()
            .filter(|e| e.kind == kind)
            .copied()
            .collect();
        entries.iter().map(|e| self.read_entry(e)).collect()
    }

    /// Directory entries inside each block of the given kind.
    ///
    /// The block start and end markers are excluded; nested blocks are
    /// included in full.
    pub fn blocks(&mut self, block_kind: i32) -> Result<Vec<Vec<DirEntry>>> {
        let entries = self.directory()?.to_vec();
        let mut blocks = Vec::new();
        let mut open: Vec<(i32, Vec<DirEntry>)> = Vec::new();

        for entry in entries {
            match entry.kind {
                FIFF_BLOCK_START => {
                    let kind = self.read_entry(&entry)?.try_int()?;
                    open.iter_mut().for_each(|(_, body)| body.push(entry));
                    open.push((kind, Vec::new()));
                }
                FIFF_BLOCK_END => {
                    if let Some((kind, body)) = open.pop() {
                        if kind == block_kind {
                            blocks.push(body);
                        }
                    }
                    open.iter_mut().for_each(|(_, body)| body.push(entry));
                }
                _ => open.iter_mut().for_each(|(_, body)| body.push(entry)),
            }
        }
        debug!(block_kind, found = blocks.len(), "collected blocks");
        Ok(blocks)
    }
}

/// Iterator over a tag chain.
///
/// Ends cleanly at a tag whose `next` is negative or when the source is
/// exhausted exactly at a tag boundary; any other failure, including a
/// `next` pointer back to a tag already read, is yielded once.
pub struct Tags<'a, S> {
    stream: &'a mut FiffStream<S>,
    visited: HashSet<u64>,
    done: bool,
}

impl<S: Read + Seek> Iterator for Tags<'_, S> {
    type Item = Result<Tag>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let pos = match self.stream.position() {
            Ok(pos) => pos,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };
        if !self.visited.insert(pos) {
            self.done = true;
            return Some(Err(Error::CyclicChain { pos }));
        }
        match self.stream.read_tag(None) {
            Ok(tag) => {
                self.done = tag.next_tag() == Next::None;
                Some(Ok(tag))
            }
            Err(Error::ShortRead { got: 0, .. }) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
