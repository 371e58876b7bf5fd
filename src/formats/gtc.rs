//! GTC grid time courses.
//!
//! Depth-grid sampled functional data: five i32 header fields, then i32
//! samples in depth, Y, X, T loop order. No axis flips on the way to
//! canonical order, only a permutation.

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
    Step::scalar("FileVersion", ScalarKind::I32),
    Step::scalar("DimD", ScalarKind::I32),
    Step::scalar("DimX", ScalarKind::I32),
    Step::scalar("DimY", ScalarKind::I32),
    Step::scalar("DimT", ScalarKind::I32),
];

fn native_dims(header: &Header) -> Result<Vec<usize>> {
    Ok(vec![
        crate::layout::positive_dim(header, "DimD")?,
        crate::layout::positive_dim(header, "DimY")?,
        crate::layout::positive_dim(header, "DimX")?,
        crate::layout::positive_dim(header, "DimT")?,
    ])
}

pub fn read_from<R: Read>(reader: &mut R) -> Result<(Header, ArrayD<i32>)> {
    let header = schema::decode(reader, HEADER)?;
    let volume = formats::read_i32_volume(reader, &native_dims(&header)?)?;
    Ok((header, axis::GTC.to_canonical(volume)))
}

pub fn read<P: AsRef<Path>>(path: P) -> Result<(Header, ArrayD<i32>)> {
    let mut reader = BufReader::new(File::open(path)?);
    read_from(&mut reader)
}

pub fn write_to<W: Write>(writer: &mut W, header: &Header, volume: &ArrayD<i32>) -> Result<()> {
    let dims = native_dims(header)?;
    let native = axis::GTC.to_native(volume.clone());
    formats::expect_shape(native.shape(), &dims)?;
    schema::encode(writer, HEADER, header)?;
    formats::write_i32_volume(writer, &native)
}

pub fn write<P: AsRef<Path>>(path: P, header: &Header, volume: &ArrayD<i32>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_to(&mut writer, header, volume)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;
    use std::io::Cursor;

    #[test]
    fn roundtrip_permutes_without_flipping() {
        let mut header = Header::new();
        header.set_int("FileVersion", 1);
        header.set_int("DimD", 2);
        header.set_int("DimX", 3);
        header.set_int("DimY", 4);
        header.set_int("DimT", 5);

        // Canonical shape (X, Y, D, T).
        let mut volume: ArrayD<i32> = ArrayD::zeros(IxDyn(&[3, 4, 2, 5]));
        volume[[0, 0, 0, 0]] = -11;
        volume[[2, 3, 1, 4]] = 13;

        let mut bytes = Vec::new();
        write_to(&mut bytes, &header, &volume).unwrap();
        assert_eq!(bytes.len(), 20 + 4 * 120);

        let (back_header, back_volume) = read_from(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(back_header, header);
        assert_eq!(back_volume, volume);

        // With no flips, the first native sample is the first canonical one.
        assert_eq!(&bytes[20..24], &(-11i32).to_le_bytes());
    }
}
