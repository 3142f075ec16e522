use std::io::Cursor;

use fiff::format::constants::{FIFF_BLOCK_START, FIFF_DIR_POINTER};
use fiff::format::matrix::Triplet;
use fiff::format::types::FIFFT_INT;
use fiff::{
    ByteOrder, CoordTrans, DenseMatrix, Error, FiffStream, FiffWriter, SparseMatrix, StreamConfig,
    TagData, TypeCode,
};
use glam::{Mat4, Quat, Vec3};

fn int_tag_bytes(kind: i32, type_code: i32, next: i32, value: i32) -> Vec<u8> {
    let mut bytes = Vec::new();
    for word in [kind, type_code, 4, next, value] {
        bytes.extend_from_slice(&word.to_be_bytes());
    }
    bytes
}

#[test]
fn int_tag_decodes_as_int_only() {
    let bytes = int_tag_bytes(FIFF_DIR_POINTER, FIFFT_INT, 0, 42);
    let mut stream = FiffStream::new(Cursor::new(bytes));

    let tag = stream.read_tag(None).unwrap();
    assert_eq!(tag.kind(), 101);
    assert_eq!(tag.type_code(), TypeCode::new(FIFFT_INT));
    assert_eq!(tag.to_int(), Some(42));
    assert_eq!(tag.to_float(), None);
    assert_eq!(tag.to_short(), None);
    assert!(tag.to_float_matrix().is_none());
    assert_eq!(tag.data(), &TagData::Int(vec![42]));
}

#[test]
fn three_header_bytes_are_a_short_read() {
    let mut stream = FiffStream::new(Cursor::new(vec![0u8, 0, 0]));
    let result = stream.read_tag_info(None, true);
    assert!(matches!(result, Err(Error::ShortRead { needed: 16, got: 3 })));
    assert!(stream.read_tag(None).is_err());
    assert_eq!(stream.position().unwrap(), 0);
}

#[test]
fn little_endian_stream() {
    let config = StreamConfig::with_byte_order(ByteOrder::Little);
    let mut writer = FiffWriter::with_config(Cursor::new(Vec::new()), config.clone()).unwrap();
    writer.write_ints(300, &[7, -8, 9]).unwrap();
    let bytes = writer.into_inner().unwrap().into_inner();
    assert_eq!(&bytes[..4], &300_i32.to_le_bytes());

    let mut stream = FiffStream::with_config(Cursor::new(bytes), config);
    let tag = stream.read_tag(None).unwrap();
    assert_eq!(tag.as_ints(), Some(&[7, -8, 9][..]));
}

#[test]
fn matrices_survive_a_file() {
    let ints = DenseMatrix::from_rows(&[[1, 2, 3, 4], [5, 6, 7, 8], [9, 10, 11, 12]]);
    let floats = DenseMatrix::from_rows(&[
        [0.1_f32, -0.2, 0.3, 1.0e-7],
        [4.5, 5.5, -6.5, f32::MAX],
        [f32::MIN_POSITIVE, 8.0, 9.0, -0.0],
    ]);
    let sparse = SparseMatrix::from_triplets(
        4,
        3,
        [
            Triplet::new(0, 0, 1.0),
            Triplet::new(2, 1, 2.5),
            Triplet::new(1, 2, -4.0),
            Triplet::new(2, 1, 0.5),
        ],
    );

    let mut writer = FiffWriter::new(Cursor::new(Vec::new())).unwrap();
    writer.start_file().unwrap();
    writer.write_int_matrix(1, &ints).unwrap();
    writer.write_float_matrix(2, &floats).unwrap();
    writer.write_float_sparse_ccs(3, &sparse).unwrap();
    writer.write_float_sparse_rcs(4, &sparse).unwrap();
    writer.end_file().unwrap();
    let bytes = writer.into_inner().unwrap().into_inner();

    let mut stream = FiffStream::new(Cursor::new(bytes));
    let tag = stream.find(1).unwrap().unwrap();
    assert_eq!(tag.to_int_matrix(), Some(&ints));

    let tag = stream.find(2).unwrap().unwrap();
    let decoded = tag.to_float_matrix().unwrap();
    for (a, b) in decoded.as_slice().iter().zip(floats.as_slice()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }

    let mut expected = sparse.clone();
    expected.ensure_entry(3, 2);
    for kind in [3, 4] {
        let tag = stream.find(kind).unwrap().unwrap();
        let decoded = tag.to_sparse_float_matrix().unwrap();
        assert_eq!(decoded, &expected);
        assert_eq!(decoded.get(2, 1), 3.0);
        assert!(decoded.contains(3, 2));
    }
}

#[test]
fn directory_pointer_and_chain_agree() {
    let mut writer = FiffWriter::new(Cursor::new(Vec::new())).unwrap();
    writer.start_file().unwrap();
    writer.start_block(999).unwrap();
    writer.write_string(500, "first").unwrap();
    writer.write_double(501, 2.5).unwrap();
    writer.end_block(999).unwrap();
    writer.end_file().unwrap();
    let bytes = writer.into_inner().unwrap().into_inner();

    let mut stream = FiffStream::new(Cursor::new(bytes));
    let kinds: Vec<i32> = stream.tags().map(|t| t.unwrap().kind()).collect();
    let dir: Vec<i32> = stream.directory().unwrap().iter().map(|e| e.kind).collect();
    assert_eq!(kinds, dir);
    assert!(dir.contains(&FIFF_BLOCK_START));

    let blocks = stream.blocks(999).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].iter().map(|e| e.kind).collect::<Vec<_>>(), vec![500, 501]);
    assert_eq!(stream.find(501).unwrap().unwrap().to_double(), Some(2.5));
}

#[test]
fn truncated_file_reports_once() {
    let mut writer = FiffWriter::new(Cursor::new(Vec::new())).unwrap();
    writer.write_int(1, 1).unwrap();
    writer.write_ints(2, &[1, 2, 3, 4]).unwrap();
    let mut bytes = writer.into_inner().unwrap().into_inner();
    bytes.truncate(bytes.len() - 3);

    let mut stream = FiffStream::new(Cursor::new(bytes));
    let results: Vec<_> = stream.tags().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(Error::ShortRead { needed: 16, got: 13 })));
}

#[test]
fn coord_trans_survives_a_file() {
    let trans = Mat4::from_rotation_translation(
        Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
        Vec3::new(0.01, -0.02, 0.04),
    );
    let ct = CoordTrans::new(1, 4, trans);
    let mut writer = FiffWriter::new(Cursor::new(Vec::new())).unwrap();
    writer.write_coord_trans(222, &ct).unwrap();
    let bytes = writer.into_inner().unwrap().into_inner();

    let mut stream = FiffStream::new(Cursor::new(bytes));
    let tag = stream.read_tag(None).unwrap();
    let decoded = tag.try_coord_trans().unwrap();
    assert_eq!((decoded.from, decoded.to), (1, 4));
    assert_eq!(decoded.trans, ct.trans);
    let p = decoded.apply(Vec3::X);
    assert!((p - Vec3::new(0.01, 0.98, 0.04)).length() < 1e-5);
    assert!((decoded.invtrans.transform_point3(p) - Vec3::X).length() < 1e-5);
}
