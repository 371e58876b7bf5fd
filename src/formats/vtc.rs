//! VTC volume time courses.
//!
//! Functional data cropped to a bounding box in VMR space. The header names
//! the source FMR and, when one is attached, the stimulation protocol; the
//! payload element type is chosen by the data-type discriminator (1 = short
//! int, 2 = float) and runs in Z, Y, X, T loop order. Payload dimensions
//! are not stored: each spatial axis is `(End - Start) / Resolution`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::axis;
use crate::error::{Error, Result};
use crate::formats::{self, VolumeData};
use crate::header::Header;
use crate::layout;
use crate::schema::{self, Presence, ScalarKind, Scope, Step};

fn protocol_attached(scope: &Scope) -> bool {
    scope.local_int("ProtocolAttached") > 0
}

const HEADER: &[Step] = &[
    Step::scalar("FileVersion", ScalarKind::I16),
    Step::scalar("SourceFmrName", ScalarKind::CString),
    Step::scalar("ProtocolAttached", ScalarKind::I16),
    Step::scalar_if(
        "ProtocolName",
        ScalarKind::CString,
        Presence::If(protocol_attached),
    ),
    Step::scalar("CurrentProtocolIndex", ScalarKind::I16),
    Step::scalar("DataType", ScalarKind::I16),
    Step::scalar("NrTimePoints", ScalarKind::I16),
    Step::scalar("Resolution", ScalarKind::I16),
    Step::scalar("XStart", ScalarKind::I16),
    Step::scalar("XEnd", ScalarKind::I16),
    Step::scalar("YStart", ScalarKind::I16),
    Step::scalar("YEnd", ScalarKind::I16),
    Step::scalar("ZStart", ScalarKind::I16),
    Step::scalar("ZEnd", ScalarKind::I16),
    Step::scalar("LeftRightConvention", ScalarKind::U8),
    Step::scalar("ReferenceSpace", ScalarKind::U8),
    Step::scalar("TR", ScalarKind::F32),
];

/// Native (Z, Y, X, T) payload shape derived from the header.
fn native_dims(header: &Header) -> Result<Vec<usize>> {
    let resolution = header.require_int("Resolution")?;
    Ok(vec![
        layout::scaled_dim(
            header.require_int("ZStart")?,
            header.require_int("ZEnd")?,
            resolution,
        )?,
        layout::scaled_dim(
            header.require_int("YStart")?,
            header.require_int("YEnd")?,
            resolution,
        )?,
        layout::scaled_dim(
            header.require_int("XStart")?,
            header.require_int("XEnd")?,
            resolution,
        )?,
        layout::positive_dim(header, "NrTimePoints")?,
    ])
}

pub fn read_from<R: Read>(reader: &mut R) -> Result<(Header, VolumeData)> {
    let header = schema::decode(reader, HEADER)?;
    let dims = native_dims(&header)?;
    let data = match header.require_int("DataType")? {
        1 => VolumeData::I16(axis::VTC.to_canonical(formats::read_i16_volume(reader, &dims)?)),
        2 => VolumeData::F32(axis::VTC.to_canonical(formats::read_f32_volume(reader, &dims)?)),
        other => return Err(Error::UnsupportedDataType(other)),
    };
    Ok((header, data))
}

pub fn read<P: AsRef<Path>>(path: P) -> Result<(Header, VolumeData)> {
    let mut reader = BufReader::new(File::open(path)?);
    read_from(&mut reader)
}

pub fn write_to<W: Write>(writer: &mut W, header: &Header, data: &VolumeData) -> Result<()> {
    let dims = native_dims(header)?;
    let data_type = header.require_int("DataType")?;
    schema::encode(writer, HEADER, header)?;
    match (data_type, data) {
        (1, VolumeData::I16(volume)) => {
            let native = axis::VTC.to_native(volume.clone());
            formats::expect_shape(native.shape(), &dims)?;
            formats::write_i16_volume(writer, &native)
        }
        (2, VolumeData::F32(volume)) => {
            let native = axis::VTC.to_native(volume.clone());
            formats::expect_shape(native.shape(), &dims)?;
            formats::write_f32_volume(writer, &native)
        }
        (1 | 2, _) => Err(Error::Layout(format!(
            "payload element type does not match data type field {data_type}"
        ))),
        (other, _) => Err(Error::UnsupportedDataType(other)),
    }
}

pub fn write<P: AsRef<Path>>(path: P, header: &Header, data: &VolumeData) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_to(&mut writer, header, data)
}
