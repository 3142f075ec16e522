//! FIFF data type codes and matrix coding

use std::fmt;

/// Base data types (low 16 bits of a type code)
pub const FIFFT_VOID: i32 = 0;
/// 8-bit unsigned
pub const FIFFT_BYTE: i32 = 1;
/// 16-bit signed
pub const FIFFT_SHORT: i32 = 2;
/// 32-bit signed
pub const FIFFT_INT: i32 = 3;
/// 32-bit IEEE float
pub const FIFFT_FLOAT: i32 = 4;
/// 64-bit IEEE float
pub const FIFFT_DOUBLE: i32 = 5;
/// Julian day number (32-bit)
pub const FIFFT_JULIAN: i32 = 6;
/// 16-bit unsigned
pub const FIFFT_USHORT: i32 = 7;
/// 32-bit unsigned
pub const FIFFT_UINT: i32 = 8;
/// 64-bit unsigned
pub const FIFFT_ULONG: i32 = 9;
/// Character string
pub const FIFFT_STRING: i32 = 10;
/// 64-bit signed
pub const FIFFT_LONG: i32 = 11;
/// 13-bit packed samples in shorts
pub const FIFFT_DAU_PACK13: i32 = 13;
/// 14-bit packed samples in shorts
pub const FIFFT_DAU_PACK14: i32 = 14;
/// 16-bit packed samples
pub const FIFFT_DAU_PACK16: i32 = 16;
/// Complex of two floats
pub const FIFFT_COMPLEX_FLOAT: i32 = 20;
/// Complex of two doubles
pub const FIFFT_COMPLEX_DOUBLE: i32 = 21;
/// Offset/scale packed shorts
pub const FIFFT_OLD_PACK: i32 = 23;
/// Channel info structure
pub const FIFFT_CH_INFO_STRUCT: i32 = 30;
/// File/block identifier structure
pub const FIFFT_ID_STRUCT: i32 = 31;
/// Directory entry structure
pub const FIFFT_DIR_ENTRY_STRUCT: i32 = 32;
/// Digitization point structure
pub const FIFFT_DIG_POINT_STRUCT: i32 = 33;
/// Coil position structure
pub const FIFFT_CH_POS_STRUCT: i32 = 34;
/// Coordinate transformation structure
pub const FIFFT_COORD_TRANS_STRUCT: i32 = 35;
/// Digitization string structure
pub const FIFFT_DIG_STRING_STRUCT: i32 = 36;
/// Stream segment structure
pub const FIFFT_STREAM_SEGMENT_STRUCT: i32 = 37;

/// Mask selecting the matrix/flag region of a type code
pub const IS_MATRIX: u32 = 0xFFFF_0000;
/// Mask selecting the base data type
pub const DATA_TYPE: u32 = 0x0000_FFFF;
/// Mask selecting the fundamental (scalar/vector/matrix) class
pub const FUNDAMENTAL_MASK: u32 = 0xFF00_0000;

/// Matrix storage encodings (upper 16 bits of a type code)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MatrixCoding {
    /// Full grid
    Dense = 0x4000,
    /// Compressed sparse column
    Ccs = 0x4010,
    /// Compressed sparse row
    Rcs = 0x4020,
}

impl MatrixCoding {
    /// Convert from the coding sub-field
    #[must_use]
    pub const fn from_bits(value: u32) -> Option<Self> {
        match value {
            0x4000 => Some(Self::Dense),
            0x4010 => Some(Self::Ccs),
            0x4020 => Some(Self::Rcs),
            _ => None,
        }
    }

    /// Convert to the coding sub-field
    #[must_use]
    pub const fn as_bits(self) -> u32 {
        self as u32
    }

    /// Whether this is one of the compressed encodings
    #[must_use]
    pub const fn is_sparse(self) -> bool {
        matches!(self, Self::Ccs | Self::Rcs)
    }
}

impl fmt::Display for MatrixCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dense => "dense",
            Self::Ccs => "CCS",
            Self::Rcs => "RCS",
        };
        write!(f, "{name}")
    }
}

/// Tag type code: base data type in the low 16 bits, matrix coding above
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeCode(i32);

impl TypeCode {
    /// Wrap a raw type code
    #[must_use]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Matrix type code for the given base type and coding
    #[must_use]
    pub const fn matrix(base: i32, coding: MatrixCoding) -> Self {
        Self(((coding.as_bits() << 16) | (base as u32 & DATA_TYPE)) as i32)
    }

    /// Raw value as stored on the wire
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Base data type
    #[must_use]
    pub const fn base(self) -> i32 {
        (self.0 as u32 & DATA_TYPE) as i32
    }

    /// Fundamental class bits
    #[must_use]
    pub const fn fundamental(self) -> u32 {
        self.0 as u32 & FUNDAMENTAL_MASK
    }

    /// Check if the matrix flag region is set
    #[must_use]
    pub const fn is_matrix(self) -> bool {
        self.0 as u32 & IS_MATRIX != 0
    }

    /// Raw matrix coding sub-field (zero for scalars)
    #[must_use]
    pub const fn matrix_coding(self) -> u32 {
        (self.0 as u32 & IS_MATRIX) >> 16
    }

    /// Decoded matrix coding, if the sub-field is a known encoding
    #[must_use]
    pub const fn coding(self) -> Option<MatrixCoding> {
        MatrixCoding::from_bits(self.matrix_coding())
    }

    /// Check for a plain (non-matrix) tag of the given base type
    #[must_use]
    pub const fn is_scalar_of(self, base: i32) -> bool {
        !self.is_matrix() && self.base() == base
    }

    /// Width in bytes of one element of the base type, when fixed
    #[must_use]
    pub const fn element_size(self) -> Option<usize> {
        match self.base() {
            FIFFT_BYTE | FIFFT_STRING => Some(1),
            FIFFT_SHORT | FIFFT_USHORT | FIFFT_DAU_PACK13 | FIFFT_DAU_PACK14
            | FIFFT_DAU_PACK16 => Some(2),
            FIFFT_INT | FIFFT_FLOAT | FIFFT_JULIAN | FIFFT_UINT => Some(4),
            FIFFT_DOUBLE | FIFFT_ULONG | FIFFT_LONG | FIFFT_COMPLEX_FLOAT => Some(8),
            FIFFT_COMPLEX_DOUBLE => Some(16),
            _ => None,
        }
    }
}

impl From<i32> for TypeCode {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

/// Symbolic name of a base data type
#[must_use]
pub fn type_name(base: i32) -> &'static str {
    match base {
        FIFFT_VOID => "FIFFT_VOID",
        FIFFT_BYTE => "FIFFT_BYTE",
        FIFFT_SHORT => "FIFFT_SHORT",
        FIFFT_INT => "FIFFT_INT",
        FIFFT_FLOAT => "FIFFT_FLOAT",
        FIFFT_DOUBLE => "FIFFT_DOUBLE",
        FIFFT_JULIAN => "FIFFT_JULIAN",
        FIFFT_USHORT => "FIFFT_USHORT",
        FIFFT_UINT => "FIFFT_UINT",
        FIFFT_ULONG => "FIFFT_ULONG",
        FIFFT_STRING => "FIFFT_STRING",
        FIFFT_LONG => "FIFFT_LONG",
        FIFFT_DAU_PACK13 => "FIFFT_DAU_PACK13",
        FIFFT_DAU_PACK14 => "FIFFT_DAU_PACK14",
        FIFFT_DAU_PACK16 => "FIFFT_DAU_PACK16",
        FIFFT_COMPLEX_FLOAT => "FIFFT_COMPLEX_FLOAT",
        FIFFT_COMPLEX_DOUBLE => "FIFFT_COMPLEX_DOUBLE",
        FIFFT_OLD_PACK => "FIFFT_OLD_PACK",
        FIFFT_CH_INFO_STRUCT => "FIFFT_CH_INFO_STRUCT",
        FIFFT_ID_STRUCT => "FIFFT_ID_STRUCT",
        FIFFT_DIR_ENTRY_STRUCT => "FIFFT_DIR_ENTRY_STRUCT",
        FIFFT_DIG_POINT_STRUCT => "FIFFT_DIG_POINT_STRUCT",
        FIFFT_CH_POS_STRUCT => "FIFFT_CH_POS_STRUCT",
        FIFFT_COORD_TRANS_STRUCT => "FIFFT_COORD_TRANS_STRUCT",
        FIFFT_DIG_STRING_STRUCT => "FIFFT_DIG_STRING_STRUCT",
        FIFFT_STREAM_SEGMENT_STRUCT => "FIFFT_STREAM_SEGMENT_STRUCT",
        _ => "unknown",
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = type_name(self.base());
        if !self.is_matrix() {
            return write!(f, "{name}");
        }
        match self.coding() {
            Some(coding) => write!(f, "Matrix of type {name} ({coding})"),
            None => write!(f, "Matrix of type {name} (coding {:#06x})", self.matrix_coding()),
        }
    }
}

/// Complex value decoded from a pair of reals
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Complex<T> {
    /// Real part
    pub re: T,
    /// Imaginary part
    pub im: T,
}

impl<T> Complex<T> {
    /// Create from real and imaginary parts
    pub const fn new(re: T, im: T) -> Self {
        Self { re, im }
    }
}
