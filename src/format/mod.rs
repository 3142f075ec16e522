//! FIFF wire format
//!
//! Tag header, type codes, byte order conversion, struct and matrix
//! payloads, and the [`Tag`] that ties them together.

pub mod constants;
mod endian;
mod error;
mod header;
pub mod matrix;
pub mod metrics;
mod structs;
mod tag;
pub mod types;

pub use endian::{ByteOrder, CH_INFO_NAME_OFFSET, convert_tag_data};
pub use error::{Error, PayloadError, Result};
pub use header::{Next, TagHeader};
pub use matrix::{DenseMatrix, SparseMatrix, Triplet};
pub use structs::{ChInfo, ChPos, CoordTrans, DigPoint, DirEntry, FiffId};
pub use tag::{Tag, TagData};
pub use types::{Complex, MatrixCoding, TypeCode};

/// Tag header size in bytes
pub const HEADER_SIZE: usize = 16;

/// Default upper bound on a single payload (256 MB)
pub const DEFAULT_MAX_TAG_SIZE: usize = 256 * 1024 * 1024;
