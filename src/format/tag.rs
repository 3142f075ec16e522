//! FIFF tag: header fields plus an eagerly decoded payload.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::warn;

use super::endian::{ByteOrder, convert_tag_data};
use super::header::{Next, TagHeader};
use super::matrix::{
    self, DenseMatrix, SparseMatrix, decode_dense, decode_sparse, dense_type, sparse_type,
};
use super::metrics::Metrics;
use super::structs::{ChInfo, ChPos, CoordTrans, DigPoint, DirEntry, FiffId};
use super::types::{
    Complex, FIFFT_BYTE, FIFFT_CH_INFO_STRUCT, FIFFT_CH_POS_STRUCT, FIFFT_COMPLEX_DOUBLE,
    FIFFT_COMPLEX_FLOAT, FIFFT_COORD_TRANS_STRUCT, FIFFT_DAU_PACK16, FIFFT_DIG_POINT_STRUCT,
    FIFFT_DIR_ENTRY_STRUCT, FIFFT_DOUBLE, FIFFT_FLOAT, FIFFT_ID_STRUCT, FIFFT_INT, FIFFT_JULIAN,
    FIFFT_SHORT, FIFFT_STRING, FIFFT_UINT, FIFFT_USHORT, FIFFT_VOID, MatrixCoding, TypeCode,
};
use super::{Error, HEADER_SIZE, PayloadError, Result};

/// Typed view of a tag payload, decoded once when the tag is built
#[derive(Debug, Clone, PartialEq)]
pub enum TagData {
    /// No payload
    Void,
    /// Unsigned bytes
    Byte(Vec<u8>),
    /// Signed shorts
    Short(Vec<i16>),
    /// Unsigned shorts
    UShort(Vec<u16>),
    /// Signed ints
    Int(Vec<i32>),
    /// Unsigned ints
    UInt(Vec<u32>),
    /// Julian day numbers
    Julian(Vec<i32>),
    /// Floats
    Float(Vec<f32>),
    /// Doubles
    Double(Vec<f64>),
    /// Text
    String(String),
    /// 16-bit packed samples
    DauPack16(Vec<i16>),
    /// Single-precision complex value (first element only)
    ComplexFloat(Complex<f32>),
    /// Double-precision complex value (first element only)
    ComplexDouble(Complex<f64>),
    /// File or block identifier
    Id(FiffId),
    /// Digitization point
    DigPoint(DigPoint),
    /// Coordinate transformation
    CoordTrans(CoordTrans),
    /// Channel descriptor
    ChInfo(Box<ChInfo>),
    /// Coil position
    ChPos(ChPos),
    /// Directory entries
    DirEntries(Vec<DirEntry>),
    /// Dense int matrix
    IntMatrix(DenseMatrix<i32>),
    /// Dense float matrix
    FloatMatrix(DenseMatrix<f32>),
    /// CCS or RCS float matrix, widened to double
    SparseFloat(SparseMatrix),
    /// Type without a typed decoder; see [`Tag::payload`]
    Raw,
    /// Typed decoding failed; the raw payload is still available
    Malformed(PayloadError),
}

fn elements<T>(payload: &[u8], width: usize, mut get: impl FnMut(&mut &[u8]) -> T) -> Vec<T> {
    let mut buf = payload;
    let mut out = Vec::with_capacity(payload.len() / width);
    while buf.remaining() >= width {
        out.push(get(&mut buf));
    }
    out
}

fn complex_pair<T>(
    payload: &[u8],
    width: usize,
    mut get: impl FnMut(&mut &[u8]) -> T,
) -> std::result::Result<Complex<T>, PayloadError> {
    if payload.len() < 2 * width {
        return Err(PayloadError::Short {
            needed: 2 * width,
            got: payload.len(),
        });
    }
    let mut buf = payload;
    let re = get(&mut buf);
    let im = get(&mut buf);
    Ok(Complex::new(re, im))
}

fn decode_string(payload: &[u8]) -> std::result::Result<String, PayloadError> {
    let end = payload
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |last| last + 1);
    std::str::from_utf8(&payload[..end])
        .map(str::to_owned)
        .map_err(|_| PayloadError::InvalidUtf8)
}

impl TagData {
    /// Decode a native-order payload according to its type code
    pub fn decode(type_code: TypeCode, payload: &[u8]) -> std::result::Result<Self, PayloadError> {
        if type_code.is_matrix() {
            return Self::decode_matrix(type_code, payload);
        }
        let data = match type_code.base() {
            FIFFT_VOID => Self::Void,
            FIFFT_BYTE => Self::Byte(payload.to_vec()),
            FIFFT_SHORT => Self::Short(elements(payload, 2, |b| b.get_i16_ne())),
            FIFFT_USHORT => Self::UShort(elements(payload, 2, |b| b.get_u16_ne())),
            FIFFT_INT => Self::Int(elements(payload, 4, |b| b.get_i32_ne())),
            FIFFT_UINT => Self::UInt(elements(payload, 4, |b| b.get_u32_ne())),
            FIFFT_JULIAN => Self::Julian(elements(payload, 4, |b| b.get_i32_ne())),
            FIFFT_FLOAT => Self::Float(elements(payload, 4, |b| b.get_f32_ne())),
            FIFFT_DOUBLE => Self::Double(elements(payload, 8, |b| b.get_f64_ne())),
            FIFFT_STRING => Self::String(decode_string(payload)?),
            FIFFT_DAU_PACK16 => Self::DauPack16(elements(payload, 2, |b| b.get_i16_ne())),
            FIFFT_COMPLEX_FLOAT => Self::ComplexFloat(complex_pair(payload, 4, |b| b.get_f32_ne())?),
            FIFFT_COMPLEX_DOUBLE => {
                Self::ComplexDouble(complex_pair(payload, 8, |b| b.get_f64_ne())?)
            }
            FIFFT_ID_STRUCT => Self::Id(FiffId::decode(payload)?),
            FIFFT_DIG_POINT_STRUCT => Self::DigPoint(DigPoint::decode(payload)?),
            FIFFT_COORD_TRANS_STRUCT => Self::CoordTrans(CoordTrans::decode(payload)?),
            FIFFT_CH_INFO_STRUCT => Self::ChInfo(Box::new(ChInfo::decode(payload)?)),
            FIFFT_CH_POS_STRUCT => Self::ChPos(ChPos::decode(payload)?),
            FIFFT_DIR_ENTRY_STRUCT => Self::DirEntries(DirEntry::decode_list(payload)),
            _ => Self::Raw,
        };
        Ok(data)
    }

    fn decode_matrix(
        type_code: TypeCode,
        payload: &[u8],
    ) -> std::result::Result<Self, PayloadError> {
        match (type_code.coding(), type_code.base()) {
            (Some(MatrixCoding::Dense), FIFFT_INT) => {
                Ok(Self::IntMatrix(decode_dense(type_code, payload)?))
            }
            (Some(MatrixCoding::Dense), FIFFT_FLOAT) => {
                Ok(Self::FloatMatrix(decode_dense(type_code, payload)?))
            }
            (Some(MatrixCoding::Dense), base) => Err(PayloadError::UnsupportedElement { base }),
            (Some(_), _) => Ok(Self::SparseFloat(decode_sparse(type_code, payload)?)),
            (None, _) => Err(PayloadError::UnsupportedCoding {
                coding: type_code.matrix_coding(),
            }),
        }
    }
}

/// One FIFF tag.
///
/// The payload is held in native byte order; conversion to and from the
/// stream order happens when the tag crosses a stream boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    kind: i32,
    type_code: TypeCode,
    next: i32,
    payload: Bytes,
    data: TagData,
}

impl Tag {
    /// Build a tag from a native-order payload, decoding it eagerly
    #[must_use]
    pub fn from_native(kind: i32, type_code: TypeCode, payload: Bytes) -> Self {
        let data = match TagData::decode(type_code, &payload) {
            Ok(data) => data,
            Err(error) => {
                Metrics::record_decode_failure();
                warn!(kind, type_code = %type_code, size = payload.len(), %error, "keeping tag payload raw");
                TagData::Malformed(error)
            }
        };
        Self {
            kind,
            type_code,
            next: Next::Sequential.as_raw(),
            payload,
            data,
        }
    }

    /// Build a tag from a payload in stream byte order
    #[must_use]
    pub fn from_wire(header: &TagHeader, mut payload: BytesMut, order: ByteOrder) -> Self {
        convert_tag_data(header.type_code, &mut payload, order, ByteOrder::Native);
        let mut tag = Self::from_native(header.kind, header.type_code, payload.freeze());
        tag.next = header.next;
        tag
    }

    fn build(kind: i32, type_code: TypeCode, fill: impl FnOnce(&mut BytesMut)) -> Self {
        let mut payload = BytesMut::new();
        fill(&mut payload);
        Self::from_native(kind, type_code, payload.freeze())
    }

    fn try_build(
        kind: i32,
        type_code: TypeCode,
        fill: impl FnOnce(&mut BytesMut) -> std::result::Result<(), PayloadError>,
    ) -> Result<Self> {
        let mut payload = BytesMut::new();
        fill(&mut payload)?;
        Ok(Self::from_native(kind, type_code, payload.freeze()))
    }

    /// Tag without payload
    #[must_use]
    pub fn void(kind: i32) -> Self {
        Self::from_native(kind, TypeCode::new(FIFFT_VOID), Bytes::new())
    }

    /// Byte array
    #[must_use]
    pub fn bytes(kind: i32, values: &[u8]) -> Self {
        Self::build(kind, TypeCode::new(FIFFT_BYTE), |out| out.put_slice(values))
    }

    /// Short array
    #[must_use]
    pub fn shorts(kind: i32, values: &[i16]) -> Self {
        Self::build(kind, TypeCode::new(FIFFT_SHORT), |out| {
            values.iter().for_each(|&v| out.put_i16_ne(v));
        })
    }

    /// Unsigned short array
    #[must_use]
    pub fn ushorts(kind: i32, values: &[u16]) -> Self {
        Self::build(kind, TypeCode::new(FIFFT_USHORT), |out| {
            values.iter().for_each(|&v| out.put_u16_ne(v));
        })
    }

    /// Unsigned int array
    #[must_use]
    pub fn uints(kind: i32, values: &[u32]) -> Self {
        Self::build(kind, TypeCode::new(FIFFT_UINT), |out| {
            values.iter().for_each(|&v| out.put_u32_ne(v));
        })
    }

    /// Julian day numbers
    #[must_use]
    pub fn julian(kind: i32, days: &[i32]) -> Self {
        Self::build(kind, TypeCode::new(FIFFT_JULIAN), |out| {
            days.iter().for_each(|&v| out.put_i32_ne(v));
        })
    }

    /// 16-bit packed samples
    #[must_use]
    pub fn dau_pack16(kind: i32, samples: &[i16]) -> Self {
        Self::build(kind, TypeCode::new(FIFFT_DAU_PACK16), |out| {
            samples.iter().for_each(|&v| out.put_i16_ne(v));
        })
    }

    /// Single int
    #[must_use]
    pub fn int(kind: i32, value: i32) -> Self {
        Self::ints(kind, &[value])
    }

    /// Int array
    #[must_use]
    pub fn ints(kind: i32, values: &[i32]) -> Self {
        Self::build(kind, TypeCode::new(FIFFT_INT), |out| {
            values.iter().for_each(|&v| out.put_i32_ne(v));
        })
    }

    /// Single float
    #[must_use]
    pub fn float(kind: i32, value: f32) -> Self {
        Self::floats(kind, &[value])
    }

    /// Float array
    #[must_use]
    pub fn floats(kind: i32, values: &[f32]) -> Self {
        Self::build(kind, TypeCode::new(FIFFT_FLOAT), |out| {
            values.iter().for_each(|&v| out.put_f32_ne(v));
        })
    }

    /// Single double
    #[must_use]
    pub fn double(kind: i32, value: f64) -> Self {
        Self::build(kind, TypeCode::new(FIFFT_DOUBLE), |out| out.put_f64_ne(value))
    }

    /// Text
    #[must_use]
    pub fn string(kind: i32, value: &str) -> Self {
        Self::build(kind, TypeCode::new(FIFFT_STRING), |out| {
            out.put_slice(value.as_bytes());
        })
    }

    /// Single-precision complex value
    #[must_use]
    pub fn complex_float(kind: i32, value: Complex<f32>) -> Self {
        Self::build(kind, TypeCode::new(FIFFT_COMPLEX_FLOAT), |out| {
            out.put_f32_ne(value.re);
            out.put_f32_ne(value.im);
        })
    }

    /// Double-precision complex value
    #[must_use]
    pub fn complex_double(kind: i32, value: Complex<f64>) -> Self {
        Self::build(kind, TypeCode::new(FIFFT_COMPLEX_DOUBLE), |out| {
            out.put_f64_ne(value.re);
            out.put_f64_ne(value.im);
        })
    }

    /// File or block identifier
    #[must_use]
    pub fn id(kind: i32, id: &FiffId) -> Self {
        Self::build(kind, TypeCode::new(FIFFT_ID_STRUCT), |out| id.encode(out))
    }

    /// Digitization point
    #[must_use]
    pub fn dig_point(kind: i32, point: &DigPoint) -> Self {
        Self::build(kind, TypeCode::new(FIFFT_DIG_POINT_STRUCT), |out| {
            point.encode(out);
        })
    }

    /// Coordinate transformation
    #[must_use]
    pub fn coord_trans(kind: i32, trans: &CoordTrans) -> Self {
        Self::build(kind, TypeCode::new(FIFFT_COORD_TRANS_STRUCT), |out| {
            trans.encode(out);
        })
    }

    /// Channel descriptor
    #[must_use]
    pub fn ch_info(kind: i32, info: &ChInfo) -> Self {
        Self::build(kind, TypeCode::new(FIFFT_CH_INFO_STRUCT), |out| info.encode(out))
    }

    /// Coil position
    #[must_use]
    pub fn ch_pos(kind: i32, pos: &ChPos) -> Self {
        Self::build(kind, TypeCode::new(FIFFT_CH_POS_STRUCT), |out| pos.encode(out))
    }

    /// Directory entries
    #[must_use]
    pub fn dir_entries(kind: i32, entries: &[DirEntry]) -> Self {
        Self::build(kind, TypeCode::new(FIFFT_DIR_ENTRY_STRUCT), |out| {
            entries.iter().for_each(|e| e.encode(out));
        })
    }

    /// Dense int matrix; fails if a dimension does not fit in 32 bits
    pub fn int_matrix(kind: i32, m: &DenseMatrix<i32>) -> Result<Self> {
        Self::try_build(kind, dense_type::<i32>(), |out| matrix::encode_dense(m, out))
    }

    /// Dense float matrix; fails if a dimension does not fit in 32 bits
    pub fn float_matrix(kind: i32, m: &DenseMatrix<f32>) -> Result<Self> {
        Self::try_build(kind, dense_type::<f32>(), |out| matrix::encode_dense(m, out))
    }

    /// Sparse float matrix in CCS or RCS coding.
    ///
    /// [`MatrixCoding::Dense`] is rejected with
    /// [`PayloadError::UnsupportedCoding`].
    pub fn sparse_float_matrix(kind: i32, m: &SparseMatrix, coding: MatrixCoding) -> Result<Self> {
        Self::try_build(kind, sparse_type(coding), |out| {
            matrix::encode_sparse(m, coding, out)
        })
    }

    /// Tag kind
    #[must_use]
    pub const fn kind(&self) -> i32 {
        self.kind
    }

    /// Type code
    #[must_use]
    pub const fn type_code(&self) -> TypeCode {
        self.type_code
    }

    /// Raw next field
    #[must_use]
    pub const fn next(&self) -> i32 {
        self.next
    }

    /// Decoded next field
    #[must_use]
    pub const fn next_tag(&self) -> Next {
        Next::from_raw(self.next)
    }

    /// Set the raw next field
    pub fn set_next(&mut self, next: i32) {
        self.next = next;
    }

    /// Builder-style variant of [`Tag::set_next`]
    #[must_use]
    pub fn with_next(mut self, next: i32) -> Self {
        self.next = next;
        self
    }

    /// Payload size in bytes
    #[must_use]
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Payload in native byte order
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Decoded payload
    #[must_use]
    pub const fn data(&self) -> &TagData {
        &self.data
    }

    /// Why typed decoding failed, if it did
    #[must_use]
    pub fn decode_error(&self) -> Option<&PayloadError> {
        match &self.data {
            TagData::Malformed(error) => Some(error),
            _ => None,
        }
    }

    /// Check if the type code carries the matrix flag
    #[must_use]
    pub const fn is_matrix(&self) -> bool {
        self.type_code.is_matrix()
    }

    /// Human-readable type description
    #[must_use]
    pub fn info(&self) -> String {
        self.type_code.to_string()
    }

    /// Header describing this tag
    pub fn header(&self) -> Result<TagHeader> {
        let size = i32::try_from(self.payload.len()).map_err(|_| Error::TagTooLarge {
            size: self.payload.len() as i64,
            max: i32::MAX as usize,
        })?;
        Ok(TagHeader::new(self.kind, self.type_code, size, self.next))
    }

    /// Append header and payload in the given byte order
    pub fn encode(&self, order: ByteOrder, out: &mut BytesMut) -> Result<()> {
        let header = self.header()?;
        out.reserve(HEADER_SIZE + self.payload.len());
        out.put_slice(&header.to_bytes(order));
        let start = out.len();
        out.put_slice(&self.payload);
        convert_tag_data(self.type_code, &mut out[start..], ByteOrder::Native, order);
        Ok(())
    }

    /// `ndim` and dimension sizes of a matrix tag, in footer order
    #[must_use]
    pub fn matrix_dimensions(&self) -> Option<(i32, Vec<i32>)> {
        if !self.is_matrix() {
            return None;
        }
        matrix::matrix_dimensions(self.type_code, &self.payload).ok()
    }

    /// First byte
    #[must_use]
    pub fn to_byte(&self) -> Option<u8> {
        match &self.data {
            TagData::Byte(v) => v.first().copied(),
            _ => None,
        }
    }

    /// First short
    #[must_use]
    pub fn to_short(&self) -> Option<i16> {
        self.as_shorts()?.first().copied()
    }

    /// First unsigned short
    #[must_use]
    pub fn to_ushort(&self) -> Option<u16> {
        match &self.data {
            TagData::UShort(v) => v.first().copied(),
            _ => None,
        }
    }

    /// First int
    #[must_use]
    pub fn to_int(&self) -> Option<i32> {
        self.as_ints()?.first().copied()
    }

    /// First unsigned int
    #[must_use]
    pub fn to_uint(&self) -> Option<u32> {
        match &self.data {
            TagData::UInt(v) => v.first().copied(),
            _ => None,
        }
    }

    /// First Julian day number
    #[must_use]
    pub fn to_julian(&self) -> Option<i32> {
        match &self.data {
            TagData::Julian(v) => v.first().copied(),
            _ => None,
        }
    }

    /// First float
    #[must_use]
    pub fn to_float(&self) -> Option<f32> {
        self.as_floats()?.first().copied()
    }

    /// First double
    #[must_use]
    pub fn to_double(&self) -> Option<f64> {
        self.as_doubles()?.first().copied()
    }

    /// Text payload
    #[must_use]
    pub fn to_str(&self) -> Option<&str> {
        match &self.data {
            TagData::String(s) => Some(s),
            _ => None,
        }
    }

    /// Packed 16-bit samples
    #[must_use]
    pub fn to_dau_pack16(&self) -> Option<&[i16]> {
        match &self.data {
            TagData::DauPack16(v) => Some(v),
            _ => None,
        }
    }

    /// Single-precision complex value
    #[must_use]
    pub fn to_complex_float(&self) -> Option<Complex<f32>> {
        match self.data {
            TagData::ComplexFloat(c) => Some(c),
            _ => None,
        }
    }

    /// Double-precision complex value
    #[must_use]
    pub fn to_complex_double(&self) -> Option<Complex<f64>> {
        match self.data {
            TagData::ComplexDouble(c) => Some(c),
            _ => None,
        }
    }

    /// File or block identifier
    #[must_use]
    pub fn to_fiff_id(&self) -> Option<&FiffId> {
        match &self.data {
            TagData::Id(id) => Some(id),
            _ => None,
        }
    }

    /// Digitization point
    #[must_use]
    pub fn to_dig_point(&self) -> Option<&DigPoint> {
        match &self.data {
            TagData::DigPoint(p) => Some(p),
            _ => None,
        }
    }

    /// Coordinate transformation
    #[must_use]
    pub fn to_coord_trans(&self) -> Option<&CoordTrans> {
        match &self.data {
            TagData::CoordTrans(t) => Some(t),
            _ => None,
        }
    }

    /// Channel descriptor
    #[must_use]
    pub fn to_ch_info(&self) -> Option<&ChInfo> {
        match &self.data {
            TagData::ChInfo(info) => Some(info),
            _ => None,
        }
    }

    /// Coil position
    #[must_use]
    pub fn to_ch_pos(&self) -> Option<&ChPos> {
        match &self.data {
            TagData::ChPos(pos) => Some(pos),
            _ => None,
        }
    }

    /// Directory entries
    #[must_use]
    pub fn to_dir_entries(&self) -> Option<&[DirEntry]> {
        match &self.data {
            TagData::DirEntries(entries) => Some(entries),
            _ => None,
        }
    }

    /// Dense int matrix
    #[must_use]
    pub fn to_int_matrix(&self) -> Option<&DenseMatrix<i32>> {
        match &self.data {
            TagData::IntMatrix(m) => Some(m),
            _ => None,
        }
    }

    /// Dense float matrix
    #[must_use]
    pub fn to_float_matrix(&self) -> Option<&DenseMatrix<f32>> {
        match &self.data {
            TagData::FloatMatrix(m) => Some(m),
            _ => None,
        }
    }

    /// Sparse float matrix, widened to double
    #[must_use]
    pub fn to_sparse_float_matrix(&self) -> Option<&SparseMatrix> {
        match &self.data {
            TagData::SparseFloat(m) => Some(m),
            _ => None,
        }
    }

    /// All shorts
    #[must_use]
    pub fn as_shorts(&self) -> Option<&[i16]> {
        match &self.data {
            TagData::Short(v) => Some(v),
            _ => None,
        }
    }

    /// All ints
    #[must_use]
    pub fn as_ints(&self) -> Option<&[i32]> {
        match &self.data {
            TagData::Int(v) => Some(v),
            _ => None,
        }
    }

    /// All floats
    #[must_use]
    pub fn as_floats(&self) -> Option<&[f32]> {
        match &self.data {
            TagData::Float(v) => Some(v),
            _ => None,
        }
    }

    /// All doubles
    #[must_use]
    pub fn as_doubles(&self) -> Option<&[f64]> {
        match &self.data {
            TagData::Double(v) => Some(v),
            _ => None,
        }
    }

    fn require<T>(&self, expected: &'static str, value: Option<T>) -> Result<T> {
        if let TagData::Malformed(error) = &self.data {
            return Err(Error::Payload(error.clone()));
        }
        value.ok_or_else(|| Error::TypeMismatch {
            expected,
            found: self.info(),
        })
    }

    fn require_first<T: Copy>(&self, expected: &'static str, values: Option<&[T]>) -> Result<T> {
        let values = self.require(expected, values)?;
        values.first().copied().ok_or(Error::Payload(PayloadError::Short {
            needed: std::mem::size_of::<T>(),
            got: 0,
        }))
    }

    /// First int, or why there is none
    pub fn try_int(&self) -> Result<i32> {
        self.require_first("FIFFT_INT", self.as_ints())
    }

    /// First float, or why there is none
    pub fn try_float(&self) -> Result<f32> {
        self.require_first("FIFFT_FLOAT", self.as_floats())
    }

    /// First double, or why there is none
    pub fn try_double(&self) -> Result<f64> {
        self.require_first("FIFFT_DOUBLE", self.as_doubles())
    }

    /// Text payload, or why there is none
    pub fn try_str(&self) -> Result<&str> {
        self.require("FIFFT_STRING", self.to_str())
    }

    /// Identifier, or why there is none
    pub fn try_fiff_id(&self) -> Result<&FiffId> {
        self.require("FIFFT_ID_STRUCT", self.to_fiff_id())
    }

    /// Coordinate transformation, or why there is none
    pub fn try_coord_trans(&self) -> Result<&CoordTrans> {
        self.require("FIFFT_COORD_TRANS_STRUCT", self.to_coord_trans())
    }

    /// Directory entries, or why there are none
    pub fn try_dir_entries(&self) -> Result<&[DirEntry]> {
        self.require("FIFFT_DIR_ENTRY_STRUCT", self.to_dir_entries())
    }

    /// Dense int matrix, or why there is none
    pub fn try_int_matrix(&self) -> Result<&DenseMatrix<i32>> {
        self.require("Matrix of type FIFFT_INT (dense)", self.to_int_matrix())
    }

    /// Dense float matrix, or why there is none
    pub fn try_float_matrix(&self) -> Result<&DenseMatrix<f32>> {
        self.require("Matrix of type FIFFT_FLOAT (dense)", self.to_float_matrix())
    }

    /// Sparse float matrix, or why there is none
    pub fn try_sparse_float_matrix(&self) -> Result<&SparseMatrix> {
        self.require("Matrix of type FIFFT_FLOAT (CCS/RCS)", self.to_sparse_float_matrix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::constants::{FIFF_BEM_SURF_NODES, FIFF_DIR_POINTER, FIFF_FILE_ID};
    use glam::Vec3;

    fn wire_roundtrip(tag: &Tag, order: ByteOrder) -> Tag {
        let mut out = BytesMut::new();
        tag.encode(order, &mut out).unwrap();
        let header = TagHeader::from_bytes(&out, order).unwrap();
        Tag::from_wire(&header, out.split_off(HEADER_SIZE), order)
    }

    #[test]
    fn test_int_is_not_a_float() {
        let tag = Tag::int(FIFF_DIR_POINTER, 42);
        assert_eq!(tag.to_int(), Some(42));
        assert_eq!(tag.to_float(), None);
        assert_eq!(tag.to_double(), None);
        assert_eq!(tag.to_str(), None);
        assert!(tag.to_int_matrix().is_none());
        assert!(matches!(tag.try_float(), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_big_endian_wire_bytes() {
        let tag = Tag::int(FIFF_DIR_POINTER, 42);
        let mut out = BytesMut::new();
        tag.encode(ByteOrder::Big, &mut out).unwrap();
        assert_eq!(
            &out[..],
            &[0, 0, 0, 101, 0, 0, 0, 3, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0, 42]
        );
    }

    #[test]
    fn test_scalar_roundtrip_both_orders() {
        for order in [ByteOrder::Big, ByteOrder::Little] {
            let tag = Tag::floats(1, &[1.5, -2.25]);
            assert_eq!(wire_roundtrip(&tag, order).as_floats(), Some(&[1.5, -2.25][..]));

            let tag = Tag::double(2, std::f64::consts::PI);
            assert_eq!(wire_roundtrip(&tag, order).to_double(), Some(std::f64::consts::PI));

            let tag = Tag::string(3, "left hemisphere");
            assert_eq!(wire_roundtrip(&tag, order).to_str(), Some("left hemisphere"));
        }
    }

    #[test]
    fn test_complex_takes_first_pair() {
        let tag = Tag::complex_double(1, Complex::new(1.0, -2.0));
        let decoded = wire_roundtrip(&tag, ByteOrder::Big);
        assert_eq!(decoded.to_complex_double(), Some(Complex::new(1.0, -2.0)));
        assert_eq!(decoded.to_complex_float(), None);

        let short = Tag::from_native(1, TypeCode::new(FIFFT_COMPLEX_FLOAT), Bytes::from_static(&[0; 4]));
        assert!(short.to_complex_float().is_none());
        assert!(matches!(short.decode_error(), Some(PayloadError::Short { needed: 8, got: 4 })));
    }

    #[test]
    fn test_struct_tags() {
        let id = FiffId::generate();
        let tag = wire_roundtrip(&Tag::id(FIFF_FILE_ID, &id), ByteOrder::Big);
        assert_eq!(tag.to_fiff_id(), Some(&id));
        assert!(tag.to_dig_point().is_none());

        let point = DigPoint {
            kind: 1,
            ident: 2,
            r: Vec3::new(0.01, -0.02, 0.03),
            coord_frame: 0,
        };
        let tag = wire_roundtrip(&Tag::dig_point(213, &point), ByteOrder::Big);
        assert_eq!(tag.to_dig_point(), Some(&point));
    }

    #[test]
    fn test_float_matrix_tag() {
        let m = DenseMatrix::from_rows(&[[0.0_f32, 1.0, 2.0], [3.0, 4.0, 5.0]]);
        let tag = wire_roundtrip(&Tag::float_matrix(FIFF_BEM_SURF_NODES, &m).unwrap(), ByteOrder::Big);
        assert!(tag.is_matrix());
        assert_eq!(tag.to_float_matrix(), Some(&m));
        assert!(tag.to_int_matrix().is_none());
        assert_eq!(tag.matrix_dimensions(), Some((2, vec![3, 2])));
        assert_eq!(tag.info(), "Matrix of type FIFFT_FLOAT (dense)");
    }

    #[test]
    fn test_sparse_tag() {
        let m = SparseMatrix::from_triplets(2, 3, [matrix::Triplet::new(0, 2, 7.0)]);
        let tag = Tag::sparse_float_matrix(1, &m, MatrixCoding::Rcs).unwrap();
        let decoded = wire_roundtrip(&tag, ByteOrder::Big);
        let sparse = decoded.to_sparse_float_matrix().unwrap();
        assert_eq!(sparse.get(0, 2), 7.0);
        assert!(sparse.contains(1, 2));
    }

    #[test]
    fn test_sparse_tag_rejects_dense_coding() {
        let m = SparseMatrix::from_triplets(2, 2, [matrix::Triplet::new(1, 1, 1.0)]);
        assert!(matches!(
            Tag::sparse_float_matrix(1, &m, MatrixCoding::Dense),
            Err(Error::Payload(PayloadError::UnsupportedCoding { coding: 0x4000 }))
        ));
    }

    #[test]
    fn test_small_scalars_on_the_wire() {
        let tag = Tag::shorts(1, &[-2, 0x0102]);
        let mut out = BytesMut::new();
        tag.encode(ByteOrder::Big, &mut out).unwrap();
        assert_eq!(&out[HEADER_SIZE..], &[0xff, 0xfe, 0x01, 0x02]);
        assert_eq!(wire_roundtrip(&tag, ByteOrder::Big).to_short(), Some(-2));

        let tag = wire_roundtrip(&Tag::bytes(2, b"\x07\x08"), ByteOrder::Little);
        assert_eq!(tag.to_byte(), Some(7));
        assert_eq!(wire_roundtrip(&Tag::uints(3, &[u32::MAX]), ByteOrder::Big).to_uint(), Some(u32::MAX));
        assert_eq!(wire_roundtrip(&Tag::julian(4, &[2_451_545]), ByteOrder::Big).to_julian(), Some(2_451_545));
    }

    #[test]
    fn test_malformed_matrix_kept_raw() {
        let mut payload = BytesMut::new();
        for v in [0_i32, 0, 0, 0, 1, 1, 1, 1, 3] {
            payload.put_i32_ne(v);
        }
        let tag = Tag::from_native(1, dense_type::<i32>(), payload.freeze());
        assert_eq!(tag.size(), 36);
        assert!(tag.to_int_matrix().is_none());
        assert!(matches!(
            tag.try_int_matrix(),
            Err(Error::Payload(PayloadError::UnsupportedDimensions { ndim: 3 }))
        ));
    }

    #[test]
    fn test_unknown_type_is_raw() {
        let tag = Tag::from_native(1, TypeCode::new(999), Bytes::from_static(b"abc"));
        assert_eq!(tag.data(), &TagData::Raw);
        assert_eq!(&tag.payload()[..], b"abc");
    }

    #[test]
    fn test_empty_int_array() {
        let tag = Tag::ints(1, &[]);
        assert_eq!(tag.to_int(), None);
        assert!(matches!(tag.try_int(), Err(Error::Payload(PayloadError::Short { .. }))));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: int arrays survive encoding in either byte order
            #[test]
            fn prop_int_array_roundtrip(values in prop::collection::vec(any::<i32>(), 0..64),
                                        big in any::<bool>()) {
                let order = if big { ByteOrder::Big } else { ByteOrder::Little };
                let tag = Tag::ints(7, &values);
                let decoded = wire_roundtrip(&tag, order);
                prop_assert_eq!(decoded.as_ints(), Some(&values[..]));
                prop_assert_eq!(decoded, tag);
            }

            /// Property: every integer scalar type survives either byte order
            #[test]
            fn prop_integer_scalars_roundtrip(
                bytes in prop::collection::vec(any::<u8>(), 0..32),
                shorts in prop::collection::vec(any::<i16>(), 0..32),
                ushorts in prop::collection::vec(any::<u16>(), 0..32),
                uints in prop::collection::vec(any::<u32>(), 0..32),
                days in prop::collection::vec(any::<i32>(), 0..32),
                samples in prop::collection::vec(any::<i16>(), 0..32),
            ) {
                let cases = [
                    (Tag::bytes(1, &bytes), TagData::Byte(bytes.clone())),
                    (Tag::shorts(2, &shorts), TagData::Short(shorts.clone())),
                    (Tag::ushorts(3, &ushorts), TagData::UShort(ushorts.clone())),
                    (Tag::uints(4, &uints), TagData::UInt(uints.clone())),
                    (Tag::julian(5, &days), TagData::Julian(days.clone())),
                    (Tag::dau_pack16(6, &samples), TagData::DauPack16(samples.clone())),
                ];
                for (tag, expected) in &cases {
                    for order in [ByteOrder::Big, ByteOrder::Little] {
                        let decoded = wire_roundtrip(tag, order);
                        prop_assert_eq!(decoded.data(), expected);
                        prop_assert_eq!(&decoded, tag);
                    }
                }
            }

            /// Property: doubles are bit-exact after a round trip
            #[test]
            fn prop_double_roundtrip(bits in any::<u64>()) {
                let value = f64::from_bits(bits);
                let decoded = wire_roundtrip(&Tag::double(1, value), ByteOrder::Big);
                prop_assert_eq!(decoded.to_double().map(f64::to_bits), Some(bits));
            }

            /// Property: float arrays are bit-exact after a round trip
            #[test]
            fn prop_float_roundtrip(bits in prop::collection::vec(any::<u32>(), 1..32)) {
                let values: Vec<f32> = bits.iter().copied().map(f32::from_bits).collect();
                let decoded = wire_roundtrip(&Tag::floats(1, &values), ByteOrder::Big);
                let got: Vec<u32> = decoded.as_floats().unwrap().iter().map(|v| v.to_bits()).collect();
                prop_assert_eq!(got, bits);
            }
        }
    }
}
