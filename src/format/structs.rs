//! Fixed-layout struct payloads.
//!
//! Every struct is a run of 32-bit words (plus a fixed-width name for channel
//! info). Decoders take payloads already converted to native byte order and
//! encoders produce native byte order; the tag layer converts to and from
//! the stream's order.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut};
use glam::{Mat4, Vec3, Vec4};

use super::PayloadError;
use super::constants::{
    FIFFC_VERSION, FIFFV_COORD_DEVICE, FIFFV_COORD_HEAD, FIFFV_COORD_UNKNOWN, FIFFV_EEG_CH,
    FIFFV_MEG_CH, FIFFV_REF_MEG_CH,
};
use super::endian::CH_INFO_NAME_OFFSET;
use super::types::TypeCode;

fn ensure_len(data: &[u8], needed: usize) -> Result<(), PayloadError> {
    if data.len() < needed {
        return Err(PayloadError::Short {
            needed,
            got: data.len(),
        });
    }
    Ok(())
}

fn get_vec3(buf: &mut &[u8]) -> Vec3 {
    let x = buf.get_f32_ne();
    let y = buf.get_f32_ne();
    let z = buf.get_f32_ne();
    Vec3::new(x, y, z)
}

fn put_vec3(out: &mut impl BufMut, v: Vec3) {
    out.put_f32_ne(v.x);
    out.put_f32_ne(v.y);
    out.put_f32_ne(v.z);
}

/// Universally unique identifier of a file or block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FiffId {
    /// File format version
    pub version: i32,
    /// Machine identifier
    pub machid: [i32; 2],
    /// Creation time, seconds
    pub secs: i32,
    /// Creation time, microseconds
    pub usecs: i32,
}

impl FiffId {
    /// Encoded size in bytes
    pub const SIZE: usize = 20;

    /// Fresh identifier stamped with the current time
    #[must_use]
    pub fn generate() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            version: FIFFC_VERSION,
            machid: [std::process::id() as i32, now.subsec_nanos() as i32],
            secs: now.as_secs() as i32,
            usecs: now.subsec_micros() as i32,
        }
    }

    /// Decode from a native-order payload
    pub fn decode(data: &[u8]) -> Result<Self, PayloadError> {
        ensure_len(data, Self::SIZE)?;
        let mut buf = data;
        Ok(Self {
            version: buf.get_i32_ne(),
            machid: [buf.get_i32_ne(), buf.get_i32_ne()],
            secs: buf.get_i32_ne(),
            usecs: buf.get_i32_ne(),
        })
    }

    /// Encode in native order
    pub fn encode(&self, out: &mut impl BufMut) {
        out.put_i32_ne(self.version);
        out.put_i32_ne(self.machid[0]);
        out.put_i32_ne(self.machid[1]);
        out.put_i32_ne(self.secs);
        out.put_i32_ne(self.usecs);
    }
}

/// Digitization point
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DigPoint {
    /// Point kind (cardinal, HPI, EEG, extra)
    pub kind: i32,
    /// Identifier within the kind
    pub ident: i32,
    /// Location
    pub r: Vec3,
    /// Coordinate frame; not stored on the wire, unknown after decoding
    pub coord_frame: i32,
}

impl DigPoint {
    /// Encoded size in bytes
    pub const SIZE: usize = 20;

    /// Decode from a native-order payload
    pub fn decode(data: &[u8]) -> Result<Self, PayloadError> {
        ensure_len(data, Self::SIZE)?;
        let mut buf = data;
        Ok(Self {
            kind: buf.get_i32_ne(),
            ident: buf.get_i32_ne(),
            r: get_vec3(&mut buf),
            coord_frame: FIFFV_COORD_UNKNOWN,
        })
    }

    /// Encode in native order
    pub fn encode(&self, out: &mut impl BufMut) {
        out.put_i32_ne(self.kind);
        out.put_i32_ne(self.ident);
        put_vec3(out, self.r);
    }
}

fn get_affine(buf: &mut &[u8]) -> Mat4 {
    // Rotation is stored row by row, translation after it.
    let mut rot = [0.0_f32; 9];
    for value in &mut rot {
        *value = buf.get_f32_ne();
    }
    let t = get_vec3(buf);
    Mat4::from_cols(
        Vec4::new(rot[0], rot[3], rot[6], 0.0),
        Vec4::new(rot[1], rot[4], rot[7], 0.0),
        Vec4::new(rot[2], rot[5], rot[8], 0.0),
        Vec4::new(t.x, t.y, t.z, 1.0),
    )
}

fn put_affine(out: &mut impl BufMut, m: &Mat4) {
    for r in 0..3 {
        for c in 0..3 {
            out.put_f32_ne(m.col(c)[r]);
        }
    }
    put_vec3(out, m.w_axis.truncate());
}

/// Coordinate transformation between two frames
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoordTrans {
    /// Source frame
    pub from: i32,
    /// Destination frame
    pub to: i32,
    /// Forward transform
    pub trans: Mat4,
    /// Inverse transform
    pub invtrans: Mat4,
}

impl Default for CoordTrans {
    fn default() -> Self {
        Self::identity(FIFFV_COORD_UNKNOWN, FIFFV_COORD_UNKNOWN)
    }
}

impl CoordTrans {
    /// Encoded size in bytes
    pub const SIZE: usize = 104;

    /// Identity transform between two frames
    #[must_use]
    pub fn identity(from: i32, to: i32) -> Self {
        Self {
            from,
            to,
            trans: Mat4::IDENTITY,
            invtrans: Mat4::IDENTITY,
        }
    }

    /// Build from a forward transform, deriving the inverse
    #[must_use]
    pub fn new(from: i32, to: i32, trans: Mat4) -> Self {
        Self {
            from,
            to,
            trans,
            invtrans: trans.inverse(),
        }
    }

    /// Transform a point from `from` into `to`
    #[must_use]
    pub fn apply(&self, point: Vec3) -> Vec3 {
        self.trans.transform_point3(point)
    }

    /// Decode from a native-order payload
    pub fn decode(data: &[u8]) -> Result<Self, PayloadError> {
        ensure_len(data, Self::SIZE)?;
        let mut buf = data;
        let from = buf.get_i32_ne();
        let to = buf.get_i32_ne();
        let trans = get_affine(&mut buf);
        let invtrans = get_affine(&mut buf);
        Ok(Self {
            from,
            to,
            trans,
            invtrans,
        })
    }

    /// Encode in native order
    pub fn encode(&self, out: &mut impl BufMut) {
        out.put_i32_ne(self.from);
        out.put_i32_ne(self.to);
        put_affine(out, &self.trans);
        put_affine(out, &self.invtrans);
    }
}

/// Channel descriptor
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChInfo {
    /// Scanning order number
    pub scanno: i32,
    /// Logical channel number
    pub logno: i32,
    /// Channel kind (MEG, EEG, stimulus, ...)
    pub kind: i32,
    /// Voltmeter range
    pub range: f32,
    /// Calibration factor
    pub cal: f32,
    /// Coil or electrode type
    pub coil_type: i32,
    /// Raw location: origin then three unit vectors
    pub loc: [f32; 12],
    /// Physical unit
    pub unit: i32,
    /// Unit multiplier exponent
    pub unit_mul: i32,
    /// Channel name, at most 15 bytes on the wire
    pub ch_name: String,
    /// Frame `loc` is expressed in, derived from the channel kind
    pub coord_frame: i32,
    /// Coil transform for MEG channels
    pub coil_trans: Mat4,
    /// Electrode location and reference location for EEG channels
    pub eeg_loc: [Vec3; 2],
}

impl Default for ChInfo {
    fn default() -> Self {
        Self {
            scanno: 0,
            logno: 0,
            kind: 0,
            range: 1.0,
            cal: 1.0,
            coil_type: 0,
            loc: [0.0; 12],
            unit: 0,
            unit_mul: 0,
            ch_name: String::new(),
            coord_frame: FIFFV_COORD_UNKNOWN,
            coil_trans: Mat4::IDENTITY,
            eeg_loc: [Vec3::ZERO; 2],
        }
    }
}

impl ChInfo {
    /// Encoded size in bytes
    pub const SIZE: usize = CH_INFO_NAME_OFFSET + Self::NAME_LEN;
    /// Width of the name field
    pub const NAME_LEN: usize = 16;

    /// Decode from a native-order payload
    pub fn decode(data: &[u8]) -> Result<Self, PayloadError> {
        ensure_len(data, Self::SIZE)?;
        let mut buf = data;
        let mut info = Self {
            scanno: buf.get_i32_ne(),
            logno: buf.get_i32_ne(),
            kind: buf.get_i32_ne(),
            range: buf.get_f32_ne(),
            cal: buf.get_f32_ne(),
            coil_type: buf.get_i32_ne(),
            ..Self::default()
        };
        for value in &mut info.loc {
            *value = buf.get_f32_ne();
        }
        info.unit = buf.get_i32_ne();
        info.unit_mul = buf.get_i32_ne();

        let name = &data[CH_INFO_NAME_OFFSET..Self::SIZE];
        let end = name.iter().position(|&b| b == 0).unwrap_or(name.len());
        info.ch_name = std::str::from_utf8(&name[..end])
            .map_err(|_| PayloadError::InvalidUtf8)?
            .to_owned();

        info.derive_location();
        Ok(info)
    }

    /// Fill `coord_frame`, `coil_trans` and `eeg_loc` from `loc` and `kind`
    pub fn derive_location(&mut self) {
        let loc = &self.loc;
        let origin = Vec3::new(loc[0], loc[1], loc[2]);
        self.coord_frame = FIFFV_COORD_UNKNOWN;
        if self.kind == FIFFV_MEG_CH || self.kind == FIFFV_REF_MEG_CH {
            self.coil_trans = Mat4::from_cols(
                Vec4::new(loc[3], loc[4], loc[5], 0.0),
                Vec4::new(loc[6], loc[7], loc[8], 0.0),
                Vec4::new(loc[9], loc[10], loc[11], 0.0),
                origin.extend(1.0),
            );
            self.coord_frame = FIFFV_COORD_DEVICE;
        } else if self.kind == FIFFV_EEG_CH {
            let reference = Vec3::new(loc[3], loc[4], loc[5]);
            self.eeg_loc = if reference.length() > 0.0 {
                [origin, reference]
            } else {
                [origin, Vec3::ZERO]
            };
            self.coord_frame = FIFFV_COORD_HEAD;
        }
    }

    /// Encode in native order
    pub fn encode(&self, out: &mut impl BufMut) {
        out.put_i32_ne(self.scanno);
        out.put_i32_ne(self.logno);
        out.put_i32_ne(self.kind);
        out.put_f32_ne(self.range);
        out.put_f32_ne(self.cal);
        out.put_i32_ne(self.coil_type);
        for value in self.loc {
            out.put_f32_ne(value);
        }
        out.put_i32_ne(self.unit);
        out.put_i32_ne(self.unit_mul);

        let mut name = [0u8; Self::NAME_LEN];
        let mut len = self.ch_name.len().min(Self::NAME_LEN - 1);
        while !self.ch_name.is_char_boundary(len) {
            len -= 1;
        }
        name[..len].copy_from_slice(&self.ch_name.as_bytes()[..len]);
        out.put_slice(&name);
    }
}

/// Coil position descriptor
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChPos {
    /// Coil type
    pub coil_type: i32,
    /// Coil origin
    pub r0: Vec3,
    /// Coil x axis
    pub ex: Vec3,
    /// Coil y axis
    pub ey: Vec3,
    /// Coil z axis
    pub ez: Vec3,
}

impl ChPos {
    /// Encoded size in bytes
    pub const SIZE: usize = 52;

    /// Decode from a native-order payload
    pub fn decode(data: &[u8]) -> Result<Self, PayloadError> {
        ensure_len(data, Self::SIZE)?;
        let mut buf = data;
        Ok(Self {
            coil_type: buf.get_i32_ne(),
            r0: get_vec3(&mut buf),
            ex: get_vec3(&mut buf),
            ey: get_vec3(&mut buf),
            ez: get_vec3(&mut buf),
        })
    }

    /// Encode in native order
    pub fn encode(&self, out: &mut impl BufMut) {
        out.put_i32_ne(self.coil_type);
        for v in [self.r0, self.ex, self.ey, self.ez] {
            put_vec3(out, v);
        }
    }
}

/// Directory record: where a tag lives in the file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirEntry {
    /// Tag kind
    pub kind: i32,
    /// Tag type code
    pub type_code: TypeCode,
    /// Payload size in bytes
    pub size: i32,
    /// Absolute position of the tag header
    pub pos: i32,
}

impl DirEntry {
    /// Encoded size in bytes
    pub const SIZE: usize = 16;

    /// Decode every complete entry in a native-order payload
    #[must_use]
    pub fn decode_list(data: &[u8]) -> Vec<Self> {
        data.chunks_exact(Self::SIZE)
            .map(|mut chunk| Self {
                kind: chunk.get_i32_ne(),
                type_code: TypeCode::new(chunk.get_i32_ne()),
                size: chunk.get_i32_ne(),
                pos: chunk.get_i32_ne(),
            })
            .collect()
    }

    /// Encode in native order
    pub fn encode(&self, out: &mut impl BufMut) {
        out.put_i32_ne(self.kind);
        out.put_i32_ne(self.type_code.raw());
        out.put_i32_ne(self.size);
        out.put_i32_ne(self.pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn encoded(f: impl FnOnce(&mut BytesMut)) -> Vec<u8> {
        let mut out = BytesMut::new();
        f(&mut out);
        out.to_vec()
    }

    #[test]
    fn test_struct_sizes() {
        let id = encoded(|out| FiffId::generate().encode(out));
        assert_eq!(id.len(), FiffId::SIZE);
        let trans = encoded(|out| CoordTrans::default().encode(out));
        assert_eq!(trans.len(), CoordTrans::SIZE);
        let info = encoded(|out| ChInfo::default().encode(out));
        assert_eq!(info.len(), ChInfo::SIZE);
        let pos = encoded(|out| ChPos::default().encode(out));
        assert_eq!(pos.len(), ChPos::SIZE);
    }

    #[test]
    fn test_coord_trans_layout() {
        let trans = Mat4::from_cols(
            Vec4::new(0.0, 1.0, 0.0, 0.0),
            Vec4::new(-1.0, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 0.0, 1.0, 0.0),
            Vec4::new(0.1, 0.2, 0.3, 1.0),
        );
        let ct = CoordTrans::new(FIFFV_COORD_DEVICE, FIFFV_COORD_HEAD, trans);
        let bytes = encoded(|out| ct.encode(out));

        // Row 0 of the rotation, then the translation at word 11.
        let word = |i: usize| f32::from_ne_bytes(bytes[i * 4..i * 4 + 4].try_into().unwrap());
        assert_eq!(word(2), 0.0);
        assert_eq!(word(3), -1.0);
        assert_eq!(word(11), 0.1);
        assert_eq!(word(13), 0.3);

        let decoded = CoordTrans::decode(&bytes).unwrap();
        assert_eq!(decoded, ct);
        let p = decoded.apply(Vec3::new(1.0, 0.0, 0.0));
        assert!((p - Vec3::new(0.1, 1.2, 0.3)).length() < 1e-6);
    }

    #[test]
    fn test_ch_info_meg_derivation() {
        let mut info = ChInfo {
            kind: FIFFV_MEG_CH,
            ch_name: "MEG 0113".to_owned(),
            ..ChInfo::default()
        };
        info.loc = [0.1, 0.2, 0.3, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        let bytes = encoded(|out| info.encode(out));
        assert_eq!(&bytes[80..88], b"MEG 0113");

        let decoded = ChInfo::decode(&bytes).unwrap();
        assert_eq!(decoded.ch_name, "MEG 0113");
        assert_eq!(decoded.coord_frame, FIFFV_COORD_DEVICE);
        assert_eq!(decoded.coil_trans.w_axis, Vec4::new(0.1, 0.2, 0.3, 1.0));
        assert_eq!(decoded.coil_trans.x_axis, Vec4::new(1.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_ch_info_eeg_without_reference() {
        let mut info = ChInfo {
            kind: FIFFV_EEG_CH,
            ..ChInfo::default()
        };
        info.loc[..3].copy_from_slice(&[0.01, 0.02, 0.03]);
        let decoded = ChInfo::decode(&encoded(|out| info.encode(out))).unwrap();
        assert_eq!(decoded.coord_frame, FIFFV_COORD_HEAD);
        assert_eq!(decoded.eeg_loc[0], Vec3::new(0.01, 0.02, 0.03));
        assert_eq!(decoded.eeg_loc[1], Vec3::ZERO);
    }

    #[test]
    fn test_long_name_truncated() {
        let info = ChInfo {
            ch_name: "A-very-long-channel-name".to_owned(),
            ..ChInfo::default()
        };
        let decoded = ChInfo::decode(&encoded(|out| info.encode(out))).unwrap();
        assert_eq!(decoded.ch_name, "A-very-long-cha");
    }

    #[test]
    fn test_short_payload_rejected() {
        assert_eq!(
            FiffId::decode(&[0u8; 12]),
            Err(PayloadError::Short { needed: 20, got: 12 })
        );
        assert!(DirEntry::decode_list(&[0u8; 15]).is_empty());
    }

    mod proptests {
        use super::*;
        use glam::{EulerRot, Quat};
        use proptest::prelude::*;

        fn finite() -> impl Strategy<Value = f32> {
            -1.0e6_f32..1.0e6
        }

        fn vec3() -> impl Strategy<Value = Vec3> {
            (finite(), finite(), finite()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
        }

        proptest! {
            #[test]
            fn prop_fiff_id_roundtrip(version in any::<i32>(), m0 in any::<i32>(), m1 in any::<i32>(),
                                      secs in any::<i32>(), usecs in any::<i32>()) {
                let id = FiffId { version, machid: [m0, m1], secs, usecs };
                let decoded = FiffId::decode(&encoded(|out| id.encode(out))).unwrap();
                prop_assert_eq!(decoded, id);
            }

            #[test]
            fn prop_dig_point_roundtrip(kind in any::<i32>(), ident in any::<i32>(), r in vec3()) {
                let point = DigPoint { kind, ident, r, coord_frame: FIFFV_COORD_UNKNOWN };
                let decoded = DigPoint::decode(&encoded(|out| point.encode(out))).unwrap();
                prop_assert_eq!(decoded, point);
            }

            #[test]
            fn prop_ch_pos_roundtrip(coil_type in any::<i32>(), r0 in vec3(), ex in vec3(),
                                     ey in vec3(), ez in vec3()) {
                let pos = ChPos { coil_type, r0, ex, ey, ez };
                let decoded = ChPos::decode(&encoded(|out| pos.encode(out))).unwrap();
                prop_assert_eq!(decoded, pos);
            }

            #[test]
            fn prop_ch_info_roundtrip(scanno in any::<i32>(), logno in any::<i32>(),
                                      kind in prop_oneof![Just(FIFFV_MEG_CH), Just(FIFFV_EEG_CH),
                                                          Just(FIFFV_REF_MEG_CH), Just(502)],
                                      cal in finite(), loc in prop::array::uniform12(finite()),
                                      unit in any::<i32>(), name in "[A-Z0-9 ]{0,15}") {
                let mut info = ChInfo { scanno, logno, kind, cal, loc, unit,
                                        ch_name: name, ..ChInfo::default() };
                info.derive_location();
                let decoded = ChInfo::decode(&encoded(|out| info.encode(out))).unwrap();
                prop_assert_eq!(decoded, info);
            }

            #[test]
            fn prop_coord_trans_roundtrip(from in any::<i32>(), to in any::<i32>(),
                                          angles in (-3.1_f32..3.1, -3.1_f32..3.1, -3.1_f32..3.1),
                                          t in (-1.0_f32..1.0, -1.0_f32..1.0, -1.0_f32..1.0),
                                          p in (-1.0_f32..1.0, -1.0_f32..1.0, -1.0_f32..1.0)) {
                let rotation = Quat::from_euler(EulerRot::XYZ, angles.0, angles.1, angles.2);
                let trans = Mat4::from_rotation_translation(rotation, Vec3::new(t.0, t.1, t.2));
                let ct = CoordTrans::new(from, to, trans);
                let decoded = CoordTrans::decode(&encoded(|out| ct.encode(out))).unwrap();

                prop_assert_eq!(decoded.from, from);
                prop_assert_eq!(decoded.to, to);
                prop_assert_eq!(decoded.trans, ct.trans);
                // Only the affine rows of the inverse are stored.
                for c in 0..4 {
                    prop_assert_eq!(decoded.invtrans.col(c).truncate(), ct.invtrans.col(c).truncate());
                }
                let point = Vec3::new(p.0, p.1, p.2);
                let back = decoded.invtrans.transform_point3(decoded.apply(point));
                prop_assert!((back - point).length() < 1e-4);
            }

            #[test]
            fn prop_dir_entries_roundtrip(entries in prop::collection::vec(
                (any::<i32>(), any::<i32>(), any::<i32>(), any::<i32>()), 0..32)) {
                let entries: Vec<DirEntry> = entries
                    .into_iter()
                    .map(|(kind, t, size, pos)| DirEntry { kind, type_code: TypeCode::new(t), size, pos })
                    .collect();
                let bytes = encoded(|out| entries.iter().for_each(|e| e.encode(out)));
                prop_assert_eq!(DirEntry::decode_list(&bytes), entries);
            }
        }
    }
}
