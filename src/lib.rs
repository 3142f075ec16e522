//! FIFF - tagged binary container used for MEG/EEG data, and BEM surface geometry
//!
//! This library reads and writes FIFF streams: self-describing tags with
//! typed payloads (scalars, fixed-layout structs, dense and sparse
//! matrices), chained through `next` links and indexed by an optional
//! directory. On top of the codec it provides triangulated surface geometry
//! and BEM model persistence.
//!
//! # Quick Start
//!
//! ```rust
//! use std::io::Cursor;
//! use fiff::{FiffStream, FiffWriter, Tag};
//!
//! let mut writer = FiffWriter::new(Cursor::new(Vec::new()))?;
//! writer.write_int(101, 42)?;
//! let bytes = writer.into_inner()?.into_inner();
//!
//! let mut stream = FiffStream::new(Cursor::new(bytes));
//! let tag: Tag = stream.read_tag(None)?;
//! assert_eq!(tag.to_int(), Some(42));
//! assert_eq!(tag.to_float(), None);
//! # Ok::<(), fiff::Error>(())
//! ```
//!
//! # Features
//!
//! - **Eager typed decoding** - each tag is decoded once into [`TagData`]
//! - **Byte order conversion** - big-endian files, runtime-probed native order
//! - **Dense and sparse matrices** - CCS/RCS payloads widened to double
//! - **Bounded live reads** - timeout and cancellation on blocking reads
//! - **Surface geometry** - triangle centroids, normals, areas, vertex normals

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod format;
pub mod geometry;
pub mod stream;

pub use format::{
    ByteOrder, ChInfo, ChPos, CoordTrans, DenseMatrix, DigPoint, DirEntry, Error, FiffId,
    HEADER_SIZE, MatrixCoding, PayloadError, Result, SparseMatrix, Tag, TagData, TagHeader,
    TypeCode, metrics,
};
pub use geometry::{Bem, Surface};
pub use stream::{FiffStream, FiffWriter, StreamConfig};

/// FIFF format version written into file identifiers
pub const VERSION: &str = "1.3";
