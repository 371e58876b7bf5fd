//! Format adapters.
//!
//! One module per file format. Each adapter exposes `read`/`write` over
//! file paths plus `read_from`/`write_to` over generic streams, decodes the
//! header into a [`crate::header::Header`], and returns payload buffers in
//! canonical axis order (see [`crate::axis`]).

use std::io::{Read, Write};

use ndarray::{ArrayD, IxDyn};

use crate::codec::primitive;
use crate::error::{Error, Result};

pub mod dmr;
pub mod fbr;
pub mod fmr;
pub mod glm;
pub mod gtc;
pub mod msk;
pub mod mtc;
pub mod poi;
pub mod prt;
pub mod roi;
pub mod sdm;
pub mod smp;
pub mod srf;
pub mod ssm;
pub mod stc;
pub mod trf;
pub mod v16;
pub mod vmr;
pub mod vmp;
pub mod voi;
pub mod vtc;

/// A payload buffer whose element type is chosen by the file, not the API.
///
/// VTC and STC files carry a data-type discriminator selecting between
/// 16-bit integer and 32-bit float voxels, so those adapters return this
/// instead of a concrete `ArrayD`.
#[derive(Debug, Clone, PartialEq)]
pub enum VolumeData {
    U8(ArrayD<u8>),
    I16(ArrayD<i16>),
    U16(ArrayD<u16>),
    F32(ArrayD<f32>),
}

impl VolumeData {
    pub fn shape(&self) -> &[usize] {
        match self {
            VolumeData::U8(a) => a.shape(),
            VolumeData::I16(a) => a.shape(),
            VolumeData::U16(a) => a.shape(),
            VolumeData::F32(a) => a.shape(),
        }
    }

    /// On-disk data-type code used by VTC and STC (1 = 16-bit, 2 = f32).
    pub fn type_code(&self) -> i64 {
        match self {
            VolumeData::U8(_) => 0,
            VolumeData::I16(_) | VolumeData::U16(_) => 1,
            VolumeData::F32(_) => 2,
        }
    }
}

/// Read a native-order u8 volume.
pub(crate) fn read_u8_volume<R: Read>(reader: &mut R, dims: &[usize]) -> Result<ArrayD<u8>> {
    let count = crate::layout::element_count(dims)?;
    let values = primitive::read_bytes(reader, count)?;
    shape_volume(dims, values)
}

pub(crate) fn read_i16_volume<R: Read>(reader: &mut R, dims: &[usize]) -> Result<ArrayD<i16>> {
    let count = crate::layout::element_count(dims)?;
    let values = primitive::read_i16_array(reader, count)?;
    shape_volume(dims, values)
}

pub(crate) fn read_u16_volume<R: Read>(reader: &mut R, dims: &[usize]) -> Result<ArrayD<u16>> {
    let count = crate::layout::element_count(dims)?;
    let values = primitive::read_u16_array(reader, count)?;
    shape_volume(dims, values)
}

pub(crate) fn read_i32_volume<R: Read>(reader: &mut R, dims: &[usize]) -> Result<ArrayD<i32>> {
    let count = crate::layout::element_count(dims)?;
    let values = primitive::read_i32_array(reader, count)?;
    shape_volume(dims, values)
}

pub(crate) fn read_f32_volume<R: Read>(reader: &mut R, dims: &[usize]) -> Result<ArrayD<f32>> {
    let count = crate::layout::element_count(dims)?;
    let values = primitive::read_f32_array(reader, count)?;
    shape_volume(dims, values)
}

fn shape_volume<T>(dims: &[usize], values: Vec<T>) -> Result<ArrayD<T>> {
    ArrayD::from_shape_vec(IxDyn(dims), values)
        .map_err(|e| Error::Layout(format!("payload shape {dims:?} invalid: {e}")))
}

/// Write a volume element by element in its current (native) order.
pub(crate) fn write_u8_volume<W: Write>(writer: &mut W, volume: &ArrayD<u8>) -> Result<()> {
    for &v in volume {
        primitive::write_u8(writer, v)?;
    }
    Ok(())
}

pub(crate) fn write_i16_volume<W: Write>(writer: &mut W, volume: &ArrayD<i16>) -> Result<()> {
    for &v in volume {
        primitive::write_i16(writer, v)?;
    }
    Ok(())
}

pub(crate) fn write_u16_volume<W: Write>(writer: &mut W, volume: &ArrayD<u16>) -> Result<()> {
    for &v in volume {
        primitive::write_u16(writer, v)?;
    }
    Ok(())
}

pub(crate) fn write_i32_volume<W: Write>(writer: &mut W, volume: &ArrayD<i32>) -> Result<()> {
    for &v in volume {
        primitive::write_i32(writer, v)?;
    }
    Ok(())
}

pub(crate) fn write_f32_volume<W: Write>(writer: &mut W, volume: &ArrayD<f32>) -> Result<()> {
    for &v in volume {
        primitive::write_f32(writer, v)?;
    }
    Ok(())
}

/// Check that a payload about to be written matches the shape its header
/// promises.
pub(crate) fn expect_shape(actual: &[usize], expected: &[usize]) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(Error::Layout(format!(
            "payload shape {actual:?} does not match header-derived shape {expected:?}"
        )))
    }
}
