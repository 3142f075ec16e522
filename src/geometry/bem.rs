//! BEM model: an ordered set of surfaces stored in a FIFF file.

use std::io::{Read, Seek, Write};

use glam::Vec3;
use tracing::{debug, instrument};

use super::surface::Surface;
use crate::format::constants::{
    FIFF_BEM_SIGMA, FIFF_BEM_SURF_ID, FIFF_BEM_SURF_NNODE, FIFF_BEM_SURF_NODES,
    FIFF_BEM_SURF_NORMALS, FIFF_BEM_SURF_NTRI, FIFF_BEM_SURF_TRIANGLES, FIFF_MNE_COORD_FRAME,
    FIFFB_BEM, FIFFB_BEM_SURF, FIFFV_COORD_MRI, FIFFV_MNE_SURF_UNKNOWN,
};
use crate::format::{DenseMatrix, DirEntry, Error, Result, Tag};
use crate::stream::{FiffStream, FiffWriter};

/// Boundary-element model
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bem {
    /// Surfaces in file order
    pub surfaces: Vec<Surface>,
}

impl Bem {
    /// Wrap a list of surfaces
    #[must_use]
    pub fn new(surfaces: Vec<Surface>) -> Self {
        Self { surfaces }
    }

    /// Number of surfaces
    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// Check if the model has no surfaces
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Surface with the given identifier
    #[must_use]
    pub fn surface(&self, id: i32) -> Option<&Surface> {
        self.surfaces.iter().find(|s| s.id == id)
    }

    /// Read every surface block of a FIFF stream.
    ///
    /// Triangle indices are converted to zero-based and checked against the
    /// vertex count. When `add_geometry` is set, triangle data and vertex
    /// normals are computed for each surface.
    #[instrument(level = "debug", skip(stream))]
    pub fn read<S: Read + Seek>(stream: &mut FiffStream<S>, add_geometry: bool) -> Result<Self> {
        let blocks = stream.blocks(FIFFB_BEM_SURF)?;
        let mut surfaces = Vec::with_capacity(blocks.len());
        for entries in &blocks {
            let mut surface = read_surface(stream, entries)?;
            if add_geometry {
                surface.add_triangle_data()?;
                surface.add_vertex_normals()?;
            }
            surfaces.push(surface);
        }
        debug!(surfaces = surfaces.len(), "BEM read");
        Ok(Self { surfaces })
    }

    /// Write a complete FIFF file holding this model.
    #[instrument(level = "debug", skip(self, writer), fields(surfaces = self.surfaces.len()))]
    pub fn write<W: Write + Seek>(&self, writer: &mut FiffWriter<W>) -> Result<()> {
        writer.start_file()?;
        writer.start_block(FIFFB_BEM)?;
        for surface in &self.surfaces {
            writer.start_block(FIFFB_BEM_SURF)?;
            surface.write_to_stream(writer)?;
            writer.end_block(FIFFB_BEM_SURF)?;
        }
        writer.end_block(FIFFB_BEM)?;
        writer.end_file()
    }
}

fn read_surface<S: Read + Seek>(stream: &mut FiffStream<S>, entries: &[DirEntry]) -> Result<Surface> {
    // Only the first tag of each kind inside the block is used.
    let mut find = |kind: i32| -> Result<Option<Tag>> {
        entries
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| stream.read_entry(e))
            .transpose()
    };

    let sigma = find(FIFF_BEM_SIGMA)?.map(|t| t.try_float()).transpose()?;
    let id = find(FIFF_BEM_SURF_ID)?.map(|t| t.try_int()).transpose()?;
    let coord_frame = find(FIFF_MNE_COORD_FRAME)?.map(|t| t.try_int()).transpose()?;
    let np = required_count(find(FIFF_BEM_SURF_NNODE)?, "vertex count")?;
    let ntri = required_count(find(FIFF_BEM_SURF_NTRI)?, "triangle count")?;

    let nodes = find(FIFF_BEM_SURF_NODES)?
        .ok_or_else(|| Error::InvalidSurface("vertex coordinates missing".to_owned()))?;
    let rr = points(nodes.try_float_matrix()?, np, "vertex coordinates")?;

    let nn = match find(FIFF_BEM_SURF_NORMALS)? {
        Some(tag) => points(tag.try_float_matrix()?, np, "vertex normals")?,
        None => vec![Vec3::ZERO; np],
    };

    let tris = if ntri > 0 {
        let tag = find(FIFF_BEM_SURF_TRIANGLES)?
            .ok_or_else(|| Error::InvalidSurface("triangles missing".to_owned()))?;
        triangles(tag.try_int_matrix()?, ntri, np)?
    } else {
        Vec::new()
    };

    let surface = Surface {
        id: id.unwrap_or(FIFFV_MNE_SURF_UNKNOWN),
        coord_frame: coord_frame.unwrap_or(FIFFV_COORD_MRI),
        sigma: sigma.unwrap_or(-1.0),
        rr,
        nn,
        tris,
        ..Surface::default()
    };
    debug!(id = surface.id, np, ntri, "surface read");
    Ok(surface)
}

fn required_count(tag: Option<Tag>, what: &str) -> Result<usize> {
    let tag = tag.ok_or_else(|| Error::InvalidSurface(format!("{what} missing")))?;
    usize::try_from(tag.try_int()?)
        .map_err(|_| Error::InvalidSurface(format!("negative {what}")))
}

fn check_shape<T>(m: &DenseMatrix<T>, rows: usize, what: &str) -> Result<()> {
    if m.rows() != rows || m.cols() != 3 {
        return Err(Error::InvalidSurface(format!(
            "{what}: expected {rows} x 3, found {} x {}",
            m.rows(),
            m.cols()
        )));
    }
    Ok(())
}

fn points(m: &DenseMatrix<f32>, np: usize, what: &str) -> Result<Vec<Vec3>> {
    check_shape(m, np, what)?;
    Ok(m.iter_rows().map(Vec3::from_slice).collect())
}

fn triangles(m: &DenseMatrix<i32>, ntri: usize, np: usize) -> Result<Vec<[u32; 3]>> {
    check_shape(m, ntri, "triangles")?;
    m.iter_rows()
        .enumerate()
        .map(|(triangle, row)| {
            let mut tri = [0u32; 3];
            for (slot, &one_based) in tri.iter_mut().zip(row) {
                let vertex = i64::from(one_based) - 1;
                if vertex < 0 || vertex >= np as i64 {
                    return Err(Error::VertexOutOfRange { triangle, vertex, np });
                }
                *slot = vertex as u32;
            }
            Ok(tri)
        })
        .collect()
}
