//! Row-major matrix codec.
//!
//! Design matrices, inverted cross-product matrices (GLM) and vertex-by-time
//! courses (MTC) are stored as dense little-endian f32 blocks in row-major
//! order: the column index varies fastest on disk.

use std::io::{Read, Write};

use ndarray::Array2;

use crate::codec::primitive;
use crate::error::{Error, Result};

/// Read a `rows x cols` row-major f32 matrix.
pub fn read_f32_matrix<R: Read>(reader: &mut R, rows: usize, cols: usize) -> Result<Array2<f32>> {
    let values = primitive::read_f32_array(reader, rows * cols)?;
    Array2::from_shape_vec((rows, cols), values)
        .map_err(|e| Error::Layout(format!("matrix shape ({rows}, {cols}) invalid: {e}")))
}

/// Write a matrix as a row-major f32 block.
pub fn write_f32_matrix<W: Write>(writer: &mut W, matrix: &Array2<f32>) -> Result<()> {
    for row in matrix.rows() {
        for &v in row {
            primitive::write_f32(writer, v)?;
        }
    }
    Ok(())
}
