//! MSK volume masks.
//!
//! A mask over VTC space: the VTC bounding-box header (resolution plus six
//! i16 start/end fields, no file version) followed by one byte per voxel
//! in Z, Y, X order.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::ArrayD;

use crate::axis;
use crate::error::Result;
use crate::formats;
use crate::header::Header;
use crate::layout;
use crate::schema::{self, ScalarKind, Step};

const HEADER: &[Step] = &[
    Step::scalar("Resolution", ScalarKind::I16),
    Step::scalar("XStart", ScalarKind::I16),
    Step::scalar("XEnd", ScalarKind::I16),
    Step::scalar("YStart", ScalarKind::I16),
    Step::scalar("YEnd", ScalarKind::I16),
    Step::scalar("ZStart", ScalarKind::I16),
    Step::scalar("ZEnd", ScalarKind::I16),
];

/// Native (Z, Y, X) payload shape derived from the bounding box.
pub(crate) fn bounding_box_dims(header: &Header) -> Result<Vec<usize>> {
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
    ])
}

pub fn read_from<R: Read>(reader: &mut R) -> Result<(Header, ArrayD<u8>)> {
    let header = schema::decode(reader, HEADER)?;
    let volume = formats::read_u8_volume(reader, &bounding_box_dims(&header)?)?;
    Ok((header, axis::VOLUME_3D.to_canonical(volume)))
}

pub fn read<P: AsRef<Path>>(path: P) -> Result<(Header, ArrayD<u8>)> {
    let mut reader = BufReader::new(File::open(path)?);
    read_from(&mut reader)
}

pub fn write_to<W: Write>(writer: &mut W, header: &Header, volume: &ArrayD<u8>) -> Result<()> {
    let dims = bounding_box_dims(header)?;
    let native = axis::VOLUME_3D.to_native(volume.clone());
    formats::expect_shape(native.shape(), &dims)?;
    schema::encode(writer, HEADER, header)?;
    formats::write_u8_volume(writer, &native)
}

pub fn write<P: AsRef<Path>>(path: P, header: &Header, volume: &ArrayD<u8>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_to(&mut writer, header, volume)
}
