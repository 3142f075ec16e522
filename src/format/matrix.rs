//! Matrix payloads.
//!
//! # Wire Format
//!
//! Dense (logical `rows x cols` matrix, elements row by row):
//!
//! ```text
//! [data: rows*cols elements][cols][rows][ndim = 2]
//! ```
//!
//! Read the other way round, the data are the leading `dims[0] * dims[1]`
//! elements of a column-major `dims[0] x dims[1]` grid, with the dimension
//! sizes following in footer order. Both views describe the same bytes.
//!
//! Sparse CCS / RCS (values are floats, everything else 32-bit ints):
//!
//! ```text
//! [values: nnz][indices: nnz][pointers: ncol+1 | nrow+1][nnz][nrow][ncol][ndim = 2]
//! ```
//!
//! Payloads handled here are in native byte order.

use std::collections::BTreeMap;
use std::fmt::Debug;

use bytes::{Buf, BufMut};

use super::PayloadError;
use super::types::{FIFFT_FLOAT, FIFFT_INT, MatrixCoding, TypeCode};

/// Numeric element stored in a dense matrix payload
pub trait Element: Copy + Default + PartialEq + Debug {
    /// Base type code of the element
    const FIFF_TYPE: i32;

    /// Read one element in native order
    fn get(buf: &mut &[u8]) -> Self;

    /// Write one element in native order
    fn put(self, out: &mut impl BufMut);
}

impl Element for i32 {
    const FIFF_TYPE: i32 = FIFFT_INT;

    fn get(buf: &mut &[u8]) -> Self {
        buf.get_i32_ne()
    }

    fn put(self, out: &mut impl BufMut) {
        out.put_i32_ne(self);
    }
}

impl Element for f32 {
    const FIFF_TYPE: i32 = FIFFT_FLOAT;

    fn get(buf: &mut &[u8]) -> Self {
        buf.get_f32_ne()
    }

    fn put(self, out: &mut impl BufMut) {
        out.put_f32_ne(self);
    }
}

/// Dense matrix, stored row by row
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DenseMatrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T> DenseMatrix<T> {
    /// Number of rows
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Borrow one row
    #[must_use]
    pub fn row(&self, row: usize) -> &[T] {
        let start = (row * self.cols).min(self.data.len());
        let end = (start + self.cols).min(self.data.len());
        &self.data[start..end]
    }

    /// Iterate over rows
    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        self.data.chunks_exact(self.cols.max(1)).take(self.rows)
    }

    /// Row-major element slice
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl<T: Copy + Default> DenseMatrix<T> {
    /// Matrix of default-valued elements
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![T::default(); rows * cols],
        }
    }

    /// Wrap row-major data; `None` if the length does not match
    #[must_use]
    pub fn from_row_major(rows: usize, cols: usize, data: Vec<T>) -> Option<Self> {
        (rows.checked_mul(cols)? == data.len()).then_some(Self { rows, cols, data })
    }

    /// Build from fixed-width rows
    #[must_use]
    pub fn from_rows<const N: usize>(rows: &[[T; N]]) -> Self {
        Self {
            rows: rows.len(),
            cols: N,
            data: rows.iter().flatten().copied().collect(),
        }
    }

    /// Element at `(row, col)`
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(row * self.cols + col).copied()
    }

    /// Set the element at `(row, col)`; out-of-range writes are ignored
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        if row < self.rows && col < self.cols {
            self.data[row * self.cols + col] = value;
        }
    }

    /// Transposed copy
    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut out = Self::zeros(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.data[c * self.rows + r] = self.data[r * self.cols + c];
            }
        }
        out
    }
}

fn footer_ints(payload: &[u8], count: usize) -> Result<Vec<i32>, PayloadError> {
    let needed = count * 4;
    if payload.len() < needed {
        return Err(PayloadError::Short {
            needed,
            got: payload.len(),
        });
    }
    let mut buf = &payload[payload.len() - needed..];
    Ok((0..count).map(|_| buf.get_i32_ne()).collect())
}

/// Read `ndim` and the dimension sizes from a matrix footer.
///
/// Dense matrices carry `ndim` sizes, sparse ones `ndim + 1` (the leading
/// value being the non-zero count). Sizes are returned in footer order.
pub fn matrix_dimensions(
    type_code: TypeCode,
    payload: &[u8],
) -> Result<(i32, Vec<i32>), PayloadError> {
    let ndim = footer_ints(payload, 1)?[0];
    let extra = match type_code.coding() {
        Some(MatrixCoding::Dense) => 0,
        Some(MatrixCoding::Ccs | MatrixCoding::Rcs) => 1,
        None => {
            return Err(PayloadError::UnsupportedCoding {
                coding: type_code.matrix_coding(),
            });
        }
    };
    let count = usize::try_from(ndim)
        .ok()
        .and_then(|n| n.checked_add(extra))
        .ok_or(PayloadError::InvalidLayout("negative dimension count"))?;
    let mut ints = footer_ints(payload, count + 1)?;
    ints.pop();
    Ok((ndim, ints))
}

fn dim(value: i32) -> Result<usize, PayloadError> {
    usize::try_from(value).map_err(|_| PayloadError::InvalidLayout("negative dimension"))
}

/// Decode a dense two-dimensional matrix payload.
///
/// The data are copied out of the payload, so the matrix outlives the tag.
pub fn decode_dense<T: Element>(
    type_code: TypeCode,
    payload: &[u8],
) -> Result<DenseMatrix<T>, PayloadError> {
    if type_code.base() != T::FIFF_TYPE {
        return Err(PayloadError::UnsupportedElement {
            base: type_code.base(),
        });
    }
    if type_code.coding() != Some(MatrixCoding::Dense) {
        return Err(PayloadError::UnsupportedCoding {
            coding: type_code.matrix_coding(),
        });
    }
    let (ndim, dims) = matrix_dimensions(type_code, payload)?;
    if ndim != 2 {
        return Err(PayloadError::UnsupportedDimensions { ndim });
    }
    let cols = dim(dims[0])?;
    let rows = dim(dims[1])?;
    let count = rows
        .checked_mul(cols)
        .ok_or(PayloadError::InvalidLayout("matrix size overflows"))?;
    let needed = count
        .checked_mul(std::mem::size_of::<T>())
        .and_then(|n| n.checked_add(12))
        .ok_or(PayloadError::InvalidLayout("matrix size overflows"))?;
    if payload.len() < needed {
        return Err(PayloadError::Short {
            needed,
            got: payload.len(),
        });
    }

    let mut buf = payload;
    let data = (0..count).map(|_| T::get(&mut buf)).collect();
    Ok(DenseMatrix { rows, cols, data })
}

fn wire_int(value: usize) -> Result<i32, PayloadError> {
    i32::try_from(value).map_err(|_| PayloadError::InvalidLayout("dimension exceeds i32"))
}

/// Encode a dense matrix payload with its footer.
///
/// Dimensions that do not fit the 32-bit footer are rejected before
/// anything is written.
pub fn encode_dense<T: Element>(
    matrix: &DenseMatrix<T>,
    out: &mut impl BufMut,
) -> Result<(), PayloadError> {
    let cols = wire_int(matrix.cols)?;
    let rows = wire_int(matrix.rows)?;
    for &value in &matrix.data {
        value.put(out);
    }
    out.put_i32_ne(cols);
    out.put_i32_ne(rows);
    out.put_i32_ne(2);
    Ok(())
}

/// Type code of a dense matrix of `T`
#[must_use]
pub const fn dense_type<T: Element>() -> TypeCode {
    TypeCode::matrix(T::FIFF_TYPE, MatrixCoding::Dense)
}

/// One explicit entry of a sparse matrix
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Triplet {
    /// Row index
    pub row: usize,
    /// Column index
    pub col: usize,
    /// Stored value (may be an explicit zero)
    pub value: f64,
}

impl Triplet {
    /// Create a triplet
    #[must_use]
    pub const fn new(row: usize, col: usize, value: f64) -> Self {
        Self { row, col, value }
    }
}

/// Sparse double-precision matrix holding explicit entries.
///
/// Entries are unique per position and kept in column-major order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SparseMatrix {
    nrows: usize,
    ncols: usize,
    entries: Vec<Triplet>,
}

impl SparseMatrix {
    /// Build from triplets, summing duplicates. Out-of-range triplets are
    /// dropped.
    #[must_use]
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: impl IntoIterator<Item = Triplet>,
    ) -> Self {
        let mut merged: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for t in triplets {
            if t.row < nrows && t.col < ncols {
                *merged.entry((t.col, t.row)).or_insert(0.0) += t.value;
            }
        }
        Self {
            nrows,
            ncols,
            entries: merged
                .into_iter()
                .map(|((col, row), value)| Triplet { row, col, value })
                .collect(),
        }
    }

    /// Number of rows
    #[must_use]
    pub const fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns
    #[must_use]
    pub const fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of explicit entries
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Explicit entries in column-major order
    #[must_use]
    pub fn triplets(&self) -> &[Triplet] {
        &self.entries
    }

    /// Value at `(row, col)`; zero when not stored
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.find(row, col).map_or(0.0, |i| self.entries[i].value)
    }

    /// Whether `(row, col)` is stored explicitly
    #[must_use]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.find(row, col).is_some()
    }

    fn find(&self, row: usize, col: usize) -> Option<usize> {
        self.entries
            .binary_search_by(|t| (t.col, t.row).cmp(&(col, row)))
            .ok()
    }

    /// Store an explicit zero at `(row, col)` unless an entry exists
    pub fn ensure_entry(&mut self, row: usize, col: usize) {
        if row >= self.nrows || col >= self.ncols {
            return;
        }
        if let Err(at) = self
            .entries
            .binary_search_by(|t| (t.col, t.row).cmp(&(col, row)))
        {
            self.entries.insert(at, Triplet::new(row, col, 0.0));
        }
    }
}

/// Type code of a sparse float matrix in the given coding
#[must_use]
pub const fn sparse_type(coding: MatrixCoding) -> TypeCode {
    TypeCode::matrix(FIFFT_FLOAT, coding)
}

fn ints_at(payload: &[u8], offset: usize, count: usize) -> Vec<i32> {
    let mut buf = &payload[offset..offset + count * 4];
    (0..count).map(|_| buf.get_i32_ne()).collect()
}

/// Decode a CCS or RCS float matrix payload into a double matrix.
///
/// The entry at `(nrow - 1, ncol - 1)` is always present afterwards, as an
/// explicit zero if the data did not store it.
pub fn decode_sparse(type_code: TypeCode, payload: &[u8]) -> Result<SparseMatrix, PayloadError> {
    let coding = match type_code.coding() {
        Some(coding @ (MatrixCoding::Ccs | MatrixCoding::Rcs)) => coding,
        _ => {
            return Err(PayloadError::UnsupportedCoding {
                coding: type_code.matrix_coding(),
            });
        }
    };
    if type_code.base() != FIFFT_FLOAT {
        return Err(PayloadError::UnsupportedElement {
            base: type_code.base(),
        });
    }
    let (ndim, dims) = matrix_dimensions(type_code, payload)?;
    if ndim != 2 {
        return Err(PayloadError::UnsupportedDimensions { ndim });
    }
    let nnz = dim(dims[0])?;
    let nrow = dim(dims[1])?;
    let ncol = dim(dims[2])?;
    let (outer, inner) = match coding {
        MatrixCoding::Ccs => (ncol, nrow),
        _ => (nrow, ncol),
    };

    let needed = nnz
        .checked_mul(8)
        .and_then(|n| n.checked_add(outer.checked_add(1)?.checked_mul(4)?))
        .and_then(|n| n.checked_add(16))
        .ok_or(PayloadError::InvalidLayout("matrix size overflows"))?;
    if payload.len() < needed {
        return Err(PayloadError::Short {
            needed,
            got: payload.len(),
        });
    }

    let mut buf = payload;
    let values: Vec<f32> = (0..nnz).map(|_| buf.get_f32_ne()).collect();
    let indices = ints_at(payload, nnz * 4, nnz);
    let pointers = ints_at(payload, nnz * 8, outer + 1);

    let mut triplets = Vec::with_capacity(nnz);
    let mut p = 0usize;
    for j in 0..outer {
        let end = usize::try_from(pointers[j + 1])
            .ok()
            .filter(|&end| end <= nnz)
            .ok_or(PayloadError::InvalidLayout("pointer out of range"))?;
        while p < end {
            let index = usize::try_from(indices[p])
                .ok()
                .filter(|&i| i < inner)
                .ok_or(PayloadError::InvalidLayout("index out of range"))?;
            let value = f64::from(values[p]);
            triplets.push(match coding {
                MatrixCoding::Ccs => Triplet::new(index, j, value),
                _ => Triplet::new(j, index, value),
            });
            p += 1;
        }
    }

    let mut matrix = SparseMatrix::from_triplets(nrow, ncol, triplets);
    if nrow > 0 && ncol > 0 {
        matrix.ensure_entry(nrow - 1, ncol - 1);
    }
    Ok(matrix)
}

/// Encode a sparse matrix as float CCS or RCS payload.
///
/// A dense coding, or a size or index that does not fit in 32 bits, is
/// rejected before anything is written.
pub fn encode_sparse(
    matrix: &SparseMatrix,
    coding: MatrixCoding,
    out: &mut impl BufMut,
) -> Result<(), PayloadError> {
    let rcs = match coding {
        MatrixCoding::Ccs => false,
        MatrixCoding::Rcs => true,
        MatrixCoding::Dense => {
            return Err(PayloadError::UnsupportedCoding {
                coding: coding.as_bits(),
            });
        }
    };
    let mut entries = matrix.entries.clone();
    let outer = if rcs {
        entries.sort_by_key(|t| (t.row, t.col));
        matrix.nrows
    } else {
        matrix.ncols
    };
    let major = |t: &Triplet| if rcs { t.row } else { t.col };

    let nnz = wire_int(entries.len())?;
    let nrows = wire_int(matrix.nrows)?;
    let ncols = wire_int(matrix.ncols)?;
    let indices = entries
        .iter()
        .map(|t| wire_int(if rcs { t.col } else { t.row }))
        .collect::<Result<Vec<_>, _>>()?;

    for t in &entries {
        out.put_f32_ne(t.value as f32);
    }
    for index in indices {
        out.put_i32_ne(index);
    }
    let mut p = 0usize;
    out.put_i32_ne(0);
    for j in 0..outer {
        while p < entries.len() && major(&entries[p]) == j {
            p += 1;
        }
        // p <= nnz, which already fits
        out.put_i32_ne(p as i32);
    }
    out.put_i32_ne(nnz);
    out.put_i32_ne(nrows);
    out.put_i32_ne(ncols);
    out.put_i32_ne(2);
    Ok(())
}
