use std::io::Cursor;

use fiff::format::constants::{
    FIFF_BEM_SURF_TRIANGLES, FIFFV_BEM_SURF_ID_BRAIN, FIFFV_BEM_SURF_ID_HEAD, FIFFV_COORD_MRI,
};
use fiff::{Bem, Error, FiffStream, FiffWriter, Surface};
use glam::Vec3;

fn tetrahedron() -> Surface {
    let rr = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
    ];
    let tris = vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
    let mut surface = Surface::new(rr, tris);
    surface.id = FIFFV_BEM_SURF_ID_BRAIN;
    surface.coord_frame = FIFFV_COORD_MRI;
    surface.sigma = 0.3;
    surface
}

fn write(bem: &Bem) -> Vec<u8> {
    let mut writer = FiffWriter::new(Cursor::new(Vec::new())).unwrap();
    bem.write(&mut writer).unwrap();
    writer.into_inner().unwrap().into_inner()
}

#[test]
fn bem_survives_a_file() {
    let mut head = tetrahedron();
    head.id = FIFFV_BEM_SURF_ID_HEAD;
    head.sigma = -1.0;
    head.rr.iter_mut().for_each(|p| *p *= 2.0);
    let bem = Bem::new(vec![tetrahedron(), head]);

    let bytes = write(&bem);
    let mut stream = FiffStream::new(Cursor::new(bytes));

    let triangles = stream.find(FIFF_BEM_SURF_TRIANGLES).unwrap().unwrap();
    let on_disk = triangles.to_int_matrix().unwrap();
    assert_eq!(on_disk.row(0), &[1, 3, 2]);
    assert_eq!(on_disk.row(3), &[2, 3, 4]);

    let read = Bem::read(&mut stream, false).unwrap();
    assert_eq!(read.len(), 2);
    assert_eq!(read, bem);

    let brain = read.surface(FIFFV_BEM_SURF_ID_BRAIN).unwrap();
    assert_eq!(brain.sigma, 0.3);
    assert_eq!(brain.tris[0], [0, 2, 1]);
    let head = read.surface(FIFFV_BEM_SURF_ID_HEAD).unwrap();
    assert_eq!(head.sigma, -1.0);
    assert_eq!(head.rr[3], Vec3::new(0.0, 0.0, 2.0));
}

#[test]
fn geometry_computed_on_read() {
    let bytes = write(&Bem::new(vec![tetrahedron()]));
    let mut stream = FiffStream::new(Cursor::new(bytes));
    let bem = Bem::read(&mut stream, true).unwrap();

    let surface = &bem.surfaces[0];
    assert_eq!(surface.tri_area.len(), 4);
    assert!((surface.tri_area[0] - 0.5).abs() < 1e-12);
    assert!((surface.tri_area[3] - 3.0_f64.sqrt() / 2.0).abs() < 1e-6);
    for (normal, cent) in surface.tri_nn.iter().zip(&surface.tri_cent) {
        assert!((normal.length() - 1.0).abs() < 1e-9);
        let inside = glam::DVec3::splat(0.25);
        assert!(normal.dot(*cent - inside) > 0.0);
    }
    for nn in &surface.nn {
        assert!((nn.length() - 1.0).abs() < 1e-5);
    }
}

#[test]
fn empty_surface_writes_no_triangles() {
    let mut surface = Surface::new(vec![Vec3::ONE, Vec3::X], Vec::new());
    surface.id = 0;
    let bytes = write(&Bem::new(vec![surface]));

    let mut stream = FiffStream::new(Cursor::new(bytes));
    assert!(stream.find(FIFF_BEM_SURF_TRIANGLES).unwrap().is_none());

    let bem = Bem::read(&mut stream, false).unwrap();
    let read = &bem.surfaces[0];
    assert_eq!(read.id, -1);
    assert_eq!(read.sigma, -1.0);
    assert_eq!(read.np(), 2);
    assert_eq!(read.ntri(), 0);
}

#[test]
fn invalid_surface_is_not_written() {
    let mut surface = tetrahedron();
    surface.tris.push([0, 1, 9]);
    let mut writer = FiffWriter::new(Cursor::new(Vec::new())).unwrap();
    let result = Bem::new(vec![surface]).write(&mut writer);
    assert!(matches!(
        result,
        Err(Error::VertexOutOfRange { triangle: 4, vertex: 9, np: 4 })
    ));
}
