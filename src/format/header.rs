//! FIFF tag header
//!
//! Every tag starts with four 32-bit signed integers in the stream byte order.

use super::constants::{FIFFV_NEXT_NONE, FIFFV_NEXT_SEQ};
use super::endian::ByteOrder;
use super::types::TypeCode;
use super::{Error, HEADER_SIZE, Result};

/// Where the tag following this one lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Immediately after this tag's payload
    Sequential,
    /// Nothing follows
    None,
    /// Absolute stream position
    Seek(u64),
}

impl Next {
    /// Interpret a raw `next` field
    #[must_use]
    pub const fn from_raw(next: i32) -> Self {
        match next {
            FIFFV_NEXT_SEQ => Self::Sequential,
            n if n < 0 => Self::None,
            n => Self::Seek(n as u64),
        }
    }

    /// Raw field value
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Sequential => FIFFV_NEXT_SEQ,
            Self::None => FIFFV_NEXT_NONE,
            Self::Seek(pos) => pos as i32,
        }
    }
}

/// FIFF tag header (16 bytes)
///
/// # Wire Format
///
/// ```text
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Kind (4)                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Type (4)                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                       Payload Size (4)                        |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Next (4)                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TagHeader {
    /// Tag kind
    pub kind: i32,
    /// Type code of the payload
    pub type_code: TypeCode,
    /// Payload size in bytes
    pub size: i32,
    /// Raw next field
    pub next: i32,
}

impl TagHeader {
    /// Create a new header
    #[must_use]
    pub const fn new(kind: i32, type_code: TypeCode, size: i32, next: i32) -> Self {
        Self {
            kind,
            type_code,
            size,
            next,
        }
    }

    /// Decoded next field
    #[must_use]
    pub const fn next_tag(&self) -> Next {
        Next::from_raw(self.next)
    }

    /// Payload size, checked against a limit
    pub fn payload_len(&self, max: usize) -> Result<usize> {
        usize::try_from(self.size)
            .ok()
            .filter(|&size| size <= max)
            .ok_or(Error::TagTooLarge {
                size: i64::from(self.size),
                max,
            })
    }

    /// Convert to bytes in the given order
    #[must_use]
    pub fn to_bytes(&self, order: ByteOrder) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];

        bytes[0..4].copy_from_slice(&order.write_i32(self.kind));
        bytes[4..8].copy_from_slice(&order.write_i32(self.type_code.raw()));
        bytes[8..12].copy_from_slice(&order.write_i32(self.size));
        bytes[12..16].copy_from_slice(&order.write_i32(self.next));

        bytes
    }

    /// Parse from bytes in the given order
    pub fn from_bytes(bytes: &[u8], order: ByteOrder) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::ShortRead {
                needed: HEADER_SIZE,
                got: bytes.len(),
            });
        }
        let word = |at: usize| order.read_i32([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

        Ok(Self {
            kind: word(0),
            type_code: TypeCode::new(word(4)),
            size: word(8),
            next: word(12),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::types::FIFFT_INT;

    #[test]
    fn test_header_big_endian_layout() {
        let header = TagHeader::new(101, TypeCode::new(FIFFT_INT), 4, 0);
        let bytes = header.to_bytes(ByteOrder::Big);
        assert_eq!(bytes, [0, 0, 0, 101, 0, 0, 0, 3, 0, 0, 0, 4, 0, 0, 0, 0]);
    }

    #[test]
    fn test_header_roundtrip() {
        let header = TagHeader::new(3105, TypeCode::new(0x4000_0004), 1234, -1);
        for order in [ByteOrder::Big, ByteOrder::Little, ByteOrder::Native] {
            let decoded = TagHeader::from_bytes(&header.to_bytes(order), order).unwrap();
            assert_eq!(decoded, header);
        }
    }

    #[test]
    fn test_short_header() {
        let result = TagHeader::from_bytes(&[0, 0, 1], ByteOrder::Big);
        assert!(matches!(result, Err(Error::ShortRead { needed: 16, got: 3 })));
    }

    #[test]
    fn test_next_field() {
        assert_eq!(Next::from_raw(0), Next::Sequential);
        assert_eq!(Next::from_raw(-1), Next::None);
        assert_eq!(Next::from_raw(-7), Next::None);
        assert_eq!(Next::from_raw(4096), Next::Seek(4096));
        assert_eq!(Next::Seek(4096).as_raw(), 4096);
    }

    #[test]
    fn test_payload_len_limit() {
        let header = TagHeader::new(1, TypeCode::new(FIFFT_INT), -4, 0);
        assert!(matches!(header.payload_len(100), Err(Error::TagTooLarge { size: -4, .. })));
        let header = TagHeader::new(1, TypeCode::new(FIFFT_INT), 101, 0);
        assert!(header.payload_len(100).is_err());
        assert_eq!(header.payload_len(101).unwrap(), 101);
    }
}
