//! FIFF error types

use thiserror::Error;

/// Reasons a tag payload could not be decoded into its typed value.
///
/// These are kept on the tag itself when eager decoding fails, so the raw
/// bytes stay available to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// Payload is shorter than its type requires
    #[error("payload too short: need {needed} bytes, got {got}")]
    Short {
        /// Needed size
        needed: usize,
        /// Actual size
        got: usize,
    },

    /// Matrix has a dimensionality other than two
    #[error("Only two-dimensional matrices are supported at this time (ndim = {ndim})")]
    UnsupportedDimensions {
        /// Dimension count found in the footer
        ndim: i32,
    },

    /// Matrix coding is neither dense, CCS nor RCS
    #[error("unsupported matrix coding: {coding:#06x}")]
    UnsupportedCoding {
        /// Coding sub-field of the type code
        coding: u32,
    },

    /// Matrix element type has no numeric decoder
    #[error("unsupported matrix element type: {base}")]
    UnsupportedElement {
        /// Base type of the matrix elements
        base: i32,
    },

    /// Matrix dimensions or sparse indices are inconsistent with the payload
    #[error("invalid matrix layout: {0}")]
    InvalidLayout(&'static str),

    /// String payload is not valid UTF-8
    #[error("invalid UTF-8 in string payload")]
    InvalidUtf8,
}

/// FIFF codec, stream and geometry errors
#[derive(Error, Debug)]
pub enum Error {
    /// Fewer bytes available than a fixed-size header or payload requires
    #[error("short read: need {needed} bytes, got {got}")]
    ShortRead {
        /// Needed size
        needed: usize,
        /// Bytes actually available
        got: usize,
    },

    /// Accessor invoked against an incompatible tag type
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Requested type
        expected: &'static str,
        /// Type description of the tag
        found: String,
    },

    /// Payload could not be interpreted
    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),

    /// Size field in a tag header is negative or above the configured limit
    #[error("tag size {size} out of range (max {max})")]
    TagTooLarge {
        /// Size field from the header
        size: i64,
        /// Configured maximum
        max: usize,
    },

    /// A `next` pointer leads back to a tag already visited
    #[error("tag chain revisits position {pos}")]
    CyclicChain {
        /// Position reached a second time
        pos: u64,
    },

    /// Triangle references a vertex outside `[0, np)`
    #[error("triangle {triangle} references vertex {vertex} (surface has {np} vertices)")]
    VertexOutOfRange {
        /// Triangle index
        triangle: usize,
        /// Offending vertex index
        vertex: i64,
        /// Vertex count
        np: usize,
    },

    /// Triangle with zero area, its normal is undefined
    #[error("triangle {triangle} is degenerate (zero area)")]
    DegenerateTriangle {
        /// Triangle index
        triangle: usize,
    },

    /// Vertex normals requested before triangle data was computed
    #[error("triangle data missing: call add_triangle_data first")]
    MissingTriangleData,

    /// Surface fields disagree with each other
    #[error("invalid surface: {0}")]
    InvalidSurface(String),

    /// Blocking read gave up after its timeout
    #[error("timed out waiting for {needed} bytes")]
    Timeout {
        /// Bytes the reader was waiting for
        needed: usize,
    },

    /// Blocking read was cancelled through its token
    #[error("read cancelled")]
    Cancelled,

    /// Live source closed before a complete tag arrived
    #[error("live source closed")]
    Closed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
