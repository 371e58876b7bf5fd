//! V16 anatomical volumes (2 bytes per voxel).
//!
//! The 16-bit sibling of VMR: three u16 dimensions, then the voxel block
//! in Z, Y, X order. No file version and no post-data header.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::ArrayD;

use crate::axis;
use crate::error::Result;
use crate::formats;
use crate::header::Header;
use crate::schema::{self, ScalarKind, Step};

const HEADER: &[Step] = &[
    Step::scalar("DimX", ScalarKind::U16),
    Step::scalar("DimY", ScalarKind::U16),
    Step::scalar("DimZ", ScalarKind::U16),
];

fn native_dims(header: &Header) -> Result<Vec<usize>> {
    Ok(vec![
        crate::layout::positive_dim(header, "DimZ")?,
        crate::layout::positive_dim(header, "DimY")?,
        crate::layout::positive_dim(header, "DimX")?,
    ])
}

pub fn read_from<R: Read>(reader: &mut R) -> Result<(Header, ArrayD<u16>)> {
    let header = schema::decode(reader, HEADER)?;
    let volume = formats::read_u16_volume(reader, &native_dims(&header)?)?;
    Ok((header, axis::VOLUME_3D.to_canonical(volume)))
}

pub fn read<P: AsRef<Path>>(path: P) -> Result<(Header, ArrayD<u16>)> {
    let mut reader = BufReader::new(File::open(path)?);
    read_from(&mut reader)
}

pub fn write_to<W: Write>(writer: &mut W, header: &Header, volume: &ArrayD<u16>) -> Result<()> {
    let dims = native_dims(header)?;
    let native = axis::VOLUME_3D.to_native(volume.clone());
    formats::expect_shape(native.shape(), &dims)?;
    schema::encode(writer, HEADER, header)?;
    formats::write_u16_volume(writer, &native)
}

pub fn write<P: AsRef<Path>>(path: P, header: &Header, volume: &ArrayD<u16>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_to(&mut writer, header, volume)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;
    use std::io::Cursor;

    #[test]
    fn roundtrip_preserves_intensities() {
        let mut header = Header::new();
        header.set_int("DimX", 3);
        header.set_int("DimY", 2);
        header.set_int("DimZ", 4);
        // Canonical shape (DimZ, DimX, DimY).
        let mut volume: ArrayD<u16> = ArrayD::zeros(IxDyn(&[4, 3, 2]));
        volume[[0, 0, 0]] = 1024;
        volume[[3, 2, 1]] = 65535;

        let mut bytes = Vec::new();
        write_to(&mut bytes, &header, &volume).unwrap();
        assert_eq!(bytes.len(), 6 + 2 * 24);

        let (back_header, back_volume) = read_from(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(back_header, header);
        assert_eq!(back_volume, volume);
    }

    #[test]
    fn shape_mismatch_is_layout_error() {
        let mut header = Header::new();
        header.set_int("DimX", 2);
        header.set_int("DimY", 2);
        header.set_int("DimZ", 2);
        let volume: ArrayD<u16> = ArrayD::zeros(IxDyn(&[2, 2, 3]));
        assert!(matches!(
            write_to(&mut Vec::new(), &header, &volume),
            Err(crate::error::Error::Layout(_))
        ));
    }
}
