//! Machine-independent byte order conversion of tag payloads.
//!
//! Each payload is rewritten in place according to its type code: scalars
//! are swapped element by element, structs field by field, and matrices
//! element by element followed by their integer footer. Conversion between
//! identical byte orders is a no-op.

use std::sync::OnceLock;

use super::types::{
    FIFFT_CH_INFO_STRUCT, FIFFT_CH_POS_STRUCT, FIFFT_COMPLEX_DOUBLE, FIFFT_COMPLEX_FLOAT,
    FIFFT_COORD_TRANS_STRUCT, FIFFT_DIG_POINT_STRUCT, FIFFT_DIR_ENTRY_STRUCT, FIFFT_DOUBLE,
    FIFFT_ID_STRUCT, FIFFT_OLD_PACK, MatrixCoding, TypeCode,
};

/// Byte offset of the name field inside a channel info struct
pub const CH_INFO_NAME_OFFSET: usize = 80;

/// Byte order of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ByteOrder {
    /// Least significant byte first
    Little,
    /// Most significant byte first (the FIFF file convention)
    Big,
    /// Whatever the running process uses
    Native,
}

static NATIVE: OnceLock<ByteOrder> = OnceLock::new();

impl ByteOrder {
    /// Byte order of the running process, probed once on first use
    pub fn native() -> Self {
        *NATIVE.get_or_init(|| {
            let probe: u16 = 0x0102;
            if probe.to_ne_bytes()[0] == 0x02 {
                Self::Little
            } else {
                Self::Big
            }
        })
    }

    /// Replace `Native` with the concrete order
    #[must_use]
    pub fn resolve(self) -> Self {
        match self {
            Self::Native => Self::native(),
            other => other,
        }
    }

    /// Read an `i32` stored in this byte order
    #[must_use]
    pub fn read_i32(self, bytes: [u8; 4]) -> i32 {
        match self.resolve() {
            Self::Big => i32::from_be_bytes(bytes),
            _ => i32::from_le_bytes(bytes),
        }
    }

    /// Encode an `i32` in this byte order
    #[must_use]
    pub fn write_i32(self, value: i32) -> [u8; 4] {
        match self.resolve() {
            Self::Big => value.to_be_bytes(),
            _ => value.to_le_bytes(),
        }
    }
}

fn swap_words(data: &mut [u8], width: usize) {
    if width < 2 {
        return;
    }
    for chunk in data.chunks_exact_mut(width) {
        chunk.reverse();
    }
}

/// Convert a payload between byte orders according to its type code.
///
/// Trailing bytes that do not fill a whole element are left untouched.
pub fn convert_tag_data(type_code: TypeCode, data: &mut [u8], from: ByteOrder, to: ByteOrder) {
    let from = from.resolve();
    if from == to.resolve() || data.is_empty() {
        return;
    }
    if type_code.is_matrix() {
        convert_matrix_data(type_code, data, from);
        return;
    }
    convert_scalar_data(type_code.base(), data);
}

fn convert_scalar_data(base: i32, data: &mut [u8]) {
    match base {
        FIFFT_COMPLEX_FLOAT => swap_words(data, 4),
        FIFFT_COMPLEX_DOUBLE | FIFFT_DOUBLE => swap_words(data, 8),
        FIFFT_ID_STRUCT
        | FIFFT_DIG_POINT_STRUCT
        | FIFFT_COORD_TRANS_STRUCT
        | FIFFT_DIR_ENTRY_STRUCT
        | FIFFT_CH_POS_STRUCT => swap_words(data, 4),
        FIFFT_CH_INFO_STRUCT => {
            // Numeric fields precede the name, which is plain bytes.
            let numeric = CH_INFO_NAME_OFFSET.min(data.len());
            swap_words(&mut data[..numeric], 4);
        }
        FIFFT_OLD_PACK => {
            // Offset and scale floats, then packed shorts.
            let head = 8.min(data.len());
            let (floats, shorts) = data.split_at_mut(head);
            swap_words(floats, 4);
            swap_words(shorts, 2);
        }
        other => swap_words(data, swap_width(other).unwrap_or(1)),
    }
}

/// Width of the independently swapped unit of a base type
fn swap_width(base: i32) -> Option<usize> {
    match base {
        FIFFT_COMPLEX_FLOAT => Some(4),
        FIFFT_COMPLEX_DOUBLE => Some(8),
        other => TypeCode::new(other).element_size(),
    }
}

fn convert_matrix_data(type_code: TypeCode, data: &mut [u8], from: ByteOrder) {
    let len = data.len();
    if len < 4 {
        return;
    }
    let ndim = from.read_i32([data[len - 4], data[len - 3], data[len - 2], data[len - 1]]);
    let Ok(ndim) = usize::try_from(ndim) else {
        return;
    };
    let width = swap_width(type_code.base()).unwrap_or(4);

    match type_code.coding() {
        Some(MatrixCoding::Dense) => {
            let Some(footer) = ndim.checked_add(1).and_then(|n| n.checked_mul(4)) else {
                return;
            };
            if footer > len {
                return;
            }
            let (body, tail) = data.split_at_mut(len - footer);
            swap_words(tail, 4);
            swap_words(body, width);
        }
        Some(MatrixCoding::Ccs | MatrixCoding::Rcs) => {
            // Footer: nnz, the ndim sizes, ndim.
            let Some(footer) = ndim.checked_add(2).and_then(|n| n.checked_mul(4)) else {
                return;
            };
            if footer > len {
                return;
            }
            let nnz = from.read_i32([
                data[len - footer],
                data[len - footer + 1],
                data[len - footer + 2],
                data[len - footer + 3],
            ]);
            let Ok(nnz) = usize::try_from(nnz) else {
                return;
            };
            let values = nnz.saturating_mul(width).min(len - footer);
            let (body, tail) = data.split_at_mut(len - footer);
            swap_words(tail, 4);
            let (vals, ints) = body.split_at_mut(values);
            swap_words(vals, width);
            swap_words(ints, 4);
        }
        None => swap_words(data, width),
    }
}
