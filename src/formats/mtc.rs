//! MTC mesh time courses.
//!
//! One f32 time course per surface vertex, stored row-major as
//! (vertex, time point). The header names the VTC and PRT files the time
//! courses were sampled from and carries a data-type byte that is always 1
//! (float) in files BrainVoyager writes.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::Array2;

use crate::codec::matrix;
use crate::error::{Error, Result};
use crate::formats;
use crate::header::Header;
use crate::layout;
use crate::schema::{self, ScalarKind, Step};

const HEADER: &[Step] = &[
    Step::scalar("FileVersion", ScalarKind::I32),
    Step::scalar("NrVertices", ScalarKind::I32),
    Step::scalar("NrTimePoints", ScalarKind::I32),
    Step::scalar("NameOfVTCFile", ScalarKind::CString),
    Step::scalar("NameOfProtocolFile", ScalarKind::CString),
    Step::scalar("DataType", ScalarKind::U8),
];

/// Decode an MTC into its header and a (vertex, time point) matrix.
pub fn read_from<R: Read>(reader: &mut R) -> Result<(Header, Array2<f32>)> {
    let header = schema::decode(reader, HEADER)?;
    let data_type = header.require_int("DataType")?;
    if data_type != 1 {
        return Err(Error::UnsupportedDataType(data_type));
    }
    let rows = layout::positive_dim(&header, "NrVertices")?;
    let cols = layout::positive_dim(&header, "NrTimePoints")?;
    let data = matrix::read_f32_matrix(reader, rows, cols)?;
    Ok((header, data))
}

pub fn read<P: AsRef<Path>>(path: P) -> Result<(Header, Array2<f32>)> {
    let mut reader = BufReader::new(File::open(path)?);
    read_from(&mut reader)
}

pub fn write_to<W: Write>(writer: &mut W, header: &Header, data: &Array2<f32>) -> Result<()> {
    let rows = layout::positive_dim(header, "NrVertices")?;
    let cols = layout::positive_dim(header, "NrTimePoints")?;
    formats::expect_shape(data.shape(), &[rows, cols])?;
    schema::encode(writer, HEADER, header)?;
    matrix::write_f32_matrix(writer, data)
}

pub fn write<P: AsRef<Path>>(path: P, header: &Header, data: &Array2<f32>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_to(&mut writer, header, data)
}
