//! Triangulated surface and its derived geometry.

use std::collections::BTreeSet;
use std::io::{Seek, Write};

use glam::{DVec3, Vec3};
use tracing::{debug, warn};

use crate::format::constants::{
    FIFF_BEM_SIGMA, FIFF_BEM_SURF_ID, FIFF_BEM_SURF_NNODE, FIFF_BEM_SURF_NODES,
    FIFF_BEM_SURF_NORMALS, FIFF_BEM_SURF_NTRI, FIFF_BEM_SURF_TRIANGLES, FIFF_MNE_COORD_FRAME,
    FIFFV_MNE_SURF_UNKNOWN,
};
use crate::format::{DenseMatrix, Error, Result};
use crate::stream::FiffWriter;

/// Triangulated surface (BEM compartment boundary or cortex).
///
/// `rr`, `nn` and `tris` are the loaded data; `tri_cent`, `tri_nn`,
/// `tri_area` and the neighbour lists are derived and stay empty until the
/// matching `add_*` / `compute_*` call runs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Surface {
    /// Surface identifier, -1 until assigned
    pub id: i32,
    /// Coordinate frame of `rr`, -1 until assigned
    pub coord_frame: i32,
    /// Compartment conductivity, only meaningful when positive
    pub sigma: f32,
    /// Vertex positions
    pub rr: Vec<Vec3>,
    /// Vertex normals
    pub nn: Vec<Vec3>,
    /// Zero-based vertex indices of each triangle
    pub tris: Vec<[u32; 3]>,
    /// Triangle centroids
    pub tri_cent: Vec<DVec3>,
    /// Triangle unit normals
    pub tri_nn: Vec<DVec3>,
    /// Triangle areas
    pub tri_area: Vec<f64>,
    /// Triangles using each vertex
    pub neighbor_tri: Vec<Vec<usize>>,
    /// Vertices sharing an edge with each vertex, ascending
    pub neighbor_vert: Vec<Vec<usize>>,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            id: -1,
            coord_frame: -1,
            sigma: -1.0,
            rr: Vec::new(),
            nn: Vec::new(),
            tris: Vec::new(),
            tri_cent: Vec::new(),
            tri_nn: Vec::new(),
            tri_area: Vec::new(),
            neighbor_tri: Vec::new(),
            neighbor_vert: Vec::new(),
        }
    }
}

impl Surface {
    /// Surface from vertices and triangles, with zeroed vertex normals.
    #[must_use]
    pub fn new(rr: Vec<Vec3>, tris: Vec<[u32; 3]>) -> Self {
        Self {
            nn: vec![Vec3::ZERO; rr.len()],
            rr,
            tris,
            ..Self::default()
        }
    }

    /// Number of vertices
    #[must_use]
    pub fn np(&self) -> usize {
        self.rr.len()
    }

    /// Number of triangles
    #[must_use]
    pub fn ntri(&self) -> usize {
        self.tris.len()
    }

    /// Reset every field to its empty or -1 state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Check if the surface holds no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rr.is_empty()
    }

    /// Vertex indices of triangle `index`, checked against the vertex count.
    fn checked_triangle(&self, index: usize) -> Result<[usize; 3]> {
        let np = self.np();
        let tri = self.tris[index];
        let mut out = [0usize; 3];
        for (slot, &vertex) in out.iter_mut().zip(&tri) {
            let vertex = vertex as usize;
            if vertex >= np {
                return Err(Error::VertexOutOfRange {
                    triangle: index,
                    vertex: vertex as i64,
                    np,
                });
            }
            *slot = vertex;
        }
        Ok(out)
    }

    fn validate_triangles(&self) -> Result<()> {
        (0..self.ntri()).try_for_each(|i| self.checked_triangle(i).map(|_| ()))
    }

    /// Compute centroid, unit normal and area of every triangle.
    ///
    /// The normal direction is `(v1 - v0) x (v2 - v0)`; area and unit
    /// normal share the same cross-product magnitude. Out-of-range indices
    /// and zero-area triangles are errors, and on error no derived field is
    /// touched.
    pub fn add_triangle_data(&mut self) -> Result<()> {
        let ntri = self.ntri();
        let mut cent = Vec::with_capacity(ntri);
        let mut normals = Vec::with_capacity(ntri);
        let mut areas = Vec::with_capacity(ntri);

        for i in 0..ntri {
            let [a, b, c] = self.checked_triangle(i)?;
            let (v0, v1, v2) = (
                self.rr[a].as_dvec3(),
                self.rr[b].as_dvec3(),
                self.rr[c].as_dvec3(),
            );
            cent.push((v0 + v1 + v2) / 3.0);

            let cross = (v1 - v0).cross(v2 - v0);
            let size = cross.length();
            if !(size > 0.0 && size.is_finite()) {
                return Err(Error::DegenerateTriangle { triangle: i });
            }
            areas.push(size / 2.0);
            normals.push(cross / size);
        }

        debug!(ntri, total_area = areas.iter().sum::<f64>(), "triangle data computed");
        self.tri_cent = cent;
        self.tri_nn = normals;
        self.tri_area = areas;
        Ok(())
    }

    /// Average the triangle normals around each vertex.
    ///
    /// Every triangle normal is accumulated before any vertex normal is
    /// normalized. Vertices used by no triangle keep a zero normal.
    pub fn add_vertex_normals(&mut self) -> Result<()> {
        if self.tri_nn.len() != self.ntri() || (self.ntri() > 0 && self.tri_nn.is_empty()) {
            return Err(Error::MissingTriangleData);
        }
        self.validate_triangles()?;

        let mut sums = vec![DVec3::ZERO; self.np()];
        for (tri, normal) in self.tris.iter().zip(&self.tri_nn) {
            for &vertex in tri {
                sums[vertex as usize] += *normal;
            }
        }

        let mut unreferenced = 0usize;
        self.nn = sums
            .into_iter()
            .map(|sum| {
                let size = sum.length();
                if size > 0.0 {
                    (sum / size).as_vec3()
                } else {
                    unreferenced += 1;
                    Vec3::ZERO
                }
            })
            .collect();
        if unreferenced > 0 {
            warn!(unreferenced, "vertices without a usable normal keep zero");
        }
        debug!(np = self.np(), "vertex normals computed");
        Ok(())
    }

    /// Fill `neighbor_tri` and `neighbor_vert`.
    pub fn compute_neighbors(&mut self) -> Result<()> {
        self.validate_triangles()?;
        let np = self.np();
        let mut tris_of = vec![Vec::new(); np];
        let mut verts_of = vec![BTreeSet::new(); np];

        for (t, tri) in self.tris.iter().enumerate() {
            for (k, &vertex) in tri.iter().enumerate() {
                let vertex = vertex as usize;
                tris_of[vertex].push(t);
                for (j, &other) in tri.iter().enumerate() {
                    if j != k && other as usize != vertex {
                        verts_of[vertex].insert(other as usize);
                    }
                }
            }
        }

        self.neighbor_tri = tris_of;
        self.neighbor_vert = verts_of
            .into_iter()
            .map(|set| set.into_iter().collect())
            .collect();
        Ok(())
    }

    /// Validate the surface, then write its tags.
    ///
    /// Sigma is written only when positive; a non-positive id is written as
    /// [`FIFFV_MNE_SURF_UNKNOWN`]. Triangles go out one-based. Nothing is
    /// written when validation fails.
    pub fn write_to_stream<W: Write + Seek>(&self, writer: &mut FiffWriter<W>) -> Result<()> {
        self.validate_triangles()?;
        if !self.nn.is_empty() && self.nn.len() != self.np() {
            return Err(Error::InvalidSurface(format!(
                "{} normals for {} vertices",
                self.nn.len(),
                self.np()
            )));
        }
        let np = i32::try_from(self.np())
            .map_err(|_| Error::InvalidSurface("too many vertices".to_owned()))?;
        let ntri = i32::try_from(self.ntri())
            .map_err(|_| Error::InvalidSurface("too many triangles".to_owned()))?;

        if self.sigma > 0.0 {
            writer.write_float(FIFF_BEM_SIGMA, self.sigma)?;
        }
        let id = if self.id <= 0 {
            FIFFV_MNE_SURF_UNKNOWN
        } else {
            self.id
        };
        writer.write_int(FIFF_BEM_SURF_ID, id)?;
        writer.write_int(FIFF_MNE_COORD_FRAME, self.coord_frame)?;
        writer.write_int(FIFF_BEM_SURF_NNODE, np)?;
        writer.write_int(FIFF_BEM_SURF_NTRI, ntri)?;
        writer.write_float_matrix(FIFF_BEM_SURF_NODES, &vec3_rows(&self.rr))?;
        if ntri > 0 {
            let one_based: Vec<[i32; 3]> = self
                .tris
                .iter()
                .map(|t| t.map(|v| v as i32 + 1))
                .collect();
            writer.write_int_matrix(FIFF_BEM_SURF_TRIANGLES, &DenseMatrix::from_rows(&one_based))?;
        }
        if !self.nn.is_empty() {
            writer.write_float_matrix(FIFF_BEM_SURF_NORMALS, &vec3_rows(&self.nn))?;
        }
        debug!(id, np, ntri, "surface written");
        Ok(())
    }
}

/// `n x 3` matrix with one point per row
pub(crate) fn vec3_rows(points: &[Vec3]) -> DenseMatrix<f32> {
    let rows: Vec<[f32; 3]> = points.iter().map(|p| p.to_array()).collect();
    DenseMatrix::from_rows(&rows)
}
