//! SSM surface-to-surface mappings.
//!
//! One value per vertex of the first mesh, pointing into the referenced
//! second mesh. The on-disk values are f32 even though they hold vertex
//! indices.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::codec::primitive;
use crate::error::{Error, Result};
use crate::header::Header;
use crate::layout;
use crate::schema::{self, ScalarKind, Step};

const HEADER: &[Step] = &[
    Step::scalar("FileVersion", ScalarKind::I16),
    Step::scalar("NrVertices1", ScalarKind::I32),
    Step::scalar("NrVertices2", ScalarKind::I32),
];

/// Decode an SSM into its header and the per-vertex mapping values.
pub fn read_from<R: Read>(reader: &mut R) -> Result<(Header, Vec<f32>)> {
    let header = schema::decode(reader, HEADER)?;
    let count = layout::positive_dim(&header, "NrVertices1")?;
    let data = primitive::read_f32_array(reader, count)?;
    Ok((header, data))
}

pub fn read<P: AsRef<Path>>(path: P) -> Result<(Header, Vec<f32>)> {
    let mut reader = BufReader::new(File::open(path)?);
    read_from(&mut reader)
}

pub fn write_to<W: Write>(writer: &mut W, header: &Header, data: &[f32]) -> Result<()> {
    let count = layout::positive_dim(header, "NrVertices1")?;
    if data.len() != count {
        return Err(Error::Layout(format!(
            "mapping has {} entries, header promises {count}",
            data.len()
        )));
    }
    schema::encode(writer, HEADER, header)?;
    primitive::write_f32_array(writer, data)
}

pub fn write<P: AsRef<Path>>(path: P, header: &Header, data: &[f32]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_to(&mut writer, header, data)
}
