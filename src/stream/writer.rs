//! Tag writing with block and file framing.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use bytes::BytesMut;
use tracing::{debug, instrument, trace};

use super::config::StreamConfig;
use crate::format::constants::{
    FIFF_BLOCK_END, FIFF_BLOCK_START, FIFF_DIR, FIFF_DIR_POINTER, FIFF_FILE_ID, FIFFV_NEXT_NONE,
};
use crate::format::metrics::{Metrics, TagDirection};
use crate::format::types::FIFFT_DIR_ENTRY_STRUCT;
use crate::format::{
    ChInfo, CoordTrans, DenseMatrix, DigPoint, DirEntry, Error, FiffId, HEADER_SIZE,
    MatrixCoding, Result, SparseMatrix, Tag, TypeCode,
};

/// FIFF writer over any seekable byte sink.
///
/// Every tag written is recorded so [`FiffWriter::end_file`] can emit a
/// directory. Tags are encoded completely before touching the sink.
#[derive(Debug)]
pub struct FiffWriter<W: Write> {
    inner: W,
    config: StreamConfig,
    pos: u64,
    entries: Vec<DirEntry>,
    dir_pointer: Option<u64>,
    scratch: BytesMut,
}

impl FiffWriter<BufWriter<File>> {
    /// Create (or truncate) a file with the default configuration.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write + Seek> FiffWriter<W> {
    /// Wrap a sink with the default configuration.
    pub fn new(inner: W) -> Result<Self> {
        Self::with_config(inner, StreamConfig::default())
    }

    /// Wrap a sink with an explicit configuration.
    pub fn with_config(mut inner: W, config: StreamConfig) -> Result<Self> {
        let pos = inner.stream_position()?;
        Ok(Self {
            inner,
            config,
            pos,
            entries: Vec::new(),
            dir_pointer: None,
            scratch: BytesMut::with_capacity(1024),
        })
    }

    /// Position the next tag will be written at.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.pos
    }

    /// Tags written so far.
    #[must_use]
    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    /// Write one tag, returning its position.
    #[instrument(level = "trace", skip(self, tag), fields(kind = tag.kind(), size = tag.size()))]
    pub fn write_tag(&mut self, tag: &Tag) -> Result<u64> {
        self.scratch.clear();
        tag.encode(self.config.byte_order, &mut self.scratch)?;
        let header = tag.header()?;
        let pos = self.pos;
        let entry = DirEntry {
            kind: header.kind,
            type_code: header.type_code,
            size: header.size,
            pos: i32::try_from(pos).map_err(|_| Error::TagTooLarge {
                size: pos as i64,
                max: i32::MAX as usize,
            })?,
        };

        self.inner.write_all(&self.scratch)?;
        self.pos += self.scratch.len() as u64;
        self.entries.push(entry);
        Metrics::record_tag(TagDirection::Written, tag.size());
        trace!(pos, type_code = %header.type_code, "wrote tag");
        Ok(pos)
    }

    /// Write a byte array.
    pub fn write_bytes(&mut self, kind: i32, values: &[u8]) -> Result<u64> {
        self.write_tag(&Tag::bytes(kind, values))
    }

    /// Write a short array.
    pub fn write_shorts(&mut self, kind: i32, values: &[i16]) -> Result<u64> {
        self.write_tag(&Tag::shorts(kind, values))
    }

    /// Write an unsigned short array.
    pub fn write_ushorts(&mut self, kind: i32, values: &[u16]) -> Result<u64> {
        self.write_tag(&Tag::ushorts(kind, values))
    }

    /// Write an unsigned int array.
    pub fn write_uints(&mut self, kind: i32, values: &[u32]) -> Result<u64> {
        self.write_tag(&Tag::uints(kind, values))
    }

    /// Write Julian day numbers.
    pub fn write_julian(&mut self, kind: i32, days: &[i32]) -> Result<u64> {
        self.write_tag(&Tag::julian(kind, days))
    }

    /// Write 16-bit packed samples.
    pub fn write_dau_pack16(&mut self, kind: i32, samples: &[i16]) -> Result<u64> {
        self.write_tag(&Tag::dau_pack16(kind, samples))
    }

    /// Write an int.
    pub fn write_int(&mut self, kind: i32, value: i32) -> Result<u64> {
        self.write_tag(&Tag::int(kind, value))
    }

    /// Write an int array.
    pub fn write_ints(&mut self, kind: i32, values: &[i32]) -> Result<u64> {
        self.write_tag(&Tag::ints(kind, values))
    }

    /// Write a float.
    pub fn write_float(&mut self, kind: i32, value: f32) -> Result<u64> {
        self.write_tag(&Tag::float(kind, value))
    }

    /// Write a float array.
    pub fn write_floats(&mut self, kind: i32, values: &[f32]) -> Result<u64> {
        self.write_tag(&Tag::floats(kind, values))
    }

    /// Write a double.
    pub fn write_double(&mut self, kind: i32, value: f64) -> Result<u64> {
        self.write_tag(&Tag::double(kind, value))
    }

    /// Write a string.
    pub fn write_string(&mut self, kind: i32, value: &str) -> Result<u64> {
        self.write_tag(&Tag::string(kind, value))
    }

    /// Write an identifier.
    pub fn write_id(&mut self, kind: i32, id: &FiffId) -> Result<u64> {
        self.write_tag(&Tag::id(kind, id))
    }

    /// Write a digitization point.
    pub fn write_dig_point(&mut self, kind: i32, point: &DigPoint) -> Result<u64> {
        self.write_tag(&Tag::dig_point(kind, point))
    }

    /// Write a coordinate transformation.
    pub fn write_coord_trans(&mut self, kind: i32, trans: &CoordTrans) -> Result<u64> {
        self.write_tag(&Tag::coord_trans(kind, trans))
    }

    /// Write a channel descriptor.
    pub fn write_ch_info(&mut self, kind: i32, info: &ChInfo) -> Result<u64> {
        self.write_tag(&Tag::ch_info(kind, info))
    }

    /// Write a dense int matrix.
    pub fn write_int_matrix(&mut self, kind: i32, m: &DenseMatrix<i32>) -> Result<u64> {
        self.write_tag(&Tag::int_matrix(kind, m)?)
    }

    /// Write a dense float matrix.
    pub fn write_float_matrix(&mut self, kind: i32, m: &DenseMatrix<f32>) -> Result<u64> {
        self.write_tag(&Tag::float_matrix(kind, m)?)
    }

    /// Write a sparse matrix in compressed-column coding.
    pub fn write_float_sparse_ccs(&mut self, kind: i32, m: &SparseMatrix) -> Result<u64> {
        self.write_tag(&Tag::sparse_float_matrix(kind, m, MatrixCoding::Ccs)?)
    }

    /// Write a sparse matrix in compressed-row coding.
    pub fn write_float_sparse_rcs(&mut self, kind: i32, m: &SparseMatrix) -> Result<u64> {
        self.write_tag(&Tag::sparse_float_matrix(kind, m, MatrixCoding::Rcs)?)
    }

    /// Open a block.
    pub fn start_block(&mut self, block_kind: i32) -> Result<u64> {
        debug!(block_kind, "start block");
        self.write_int(FIFF_BLOCK_START, block_kind)
    }

    /// Close a block.
    pub fn end_block(&mut self, block_kind: i32) -> Result<u64> {
        debug!(block_kind, "end block");
        self.write_int(FIFF_BLOCK_END, block_kind)
    }

    /// Write the file identifier and a directory pointer placeholder.
    pub fn start_file(&mut self) -> Result<()> {
        self.write_id(FIFF_FILE_ID, &FiffId::generate())?;
        let pointer = self.write_int(FIFF_DIR_POINTER, -1)?;
        self.dir_pointer = Some(pointer);
        Ok(())
    }

    /// Write the directory, patch the pointer to it and flush.
    #[instrument(level = "debug", skip(self))]
    pub fn end_file(&mut self) -> Result<()> {
        let dir_pos = self.pos;
        let mut entries = self.entries.clone();
        let count = entries.len() + 1;
        entries.push(DirEntry {
            kind: FIFF_DIR,
            type_code: TypeCode::new(FIFFT_DIR_ENTRY_STRUCT),
            size: (count * DirEntry::SIZE) as i32,
            pos: i32::try_from(dir_pos).map_err(|_| Error::TagTooLarge {
                size: dir_pos as i64,
                max: i32::MAX as usize,
            })?,
        });
        let dir = Tag::dir_entries(FIFF_DIR, &entries).with_next(FIFFV_NEXT_NONE);
        self.write_tag(&dir)?;

        if let Some(pointer) = self.dir_pointer {
            let value = self.config.byte_order.write_i32(dir_pos as i32);
            self.inner
                .seek(SeekFrom::Start(pointer + HEADER_SIZE as u64))?;
            self.inner.write_all(&value)?;
            self.inner.seek(SeekFrom::Start(self.pos))?;
        }
        self.inner.flush()?;
        debug!(dir_pos, entries = count, "file finished");
        Ok(())
    }

    /// Flush and unwrap the sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}
