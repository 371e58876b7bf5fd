//! Primitive field codec.
//!
//! Reads and writes the fixed-width scalars, null-terminated strings and
//! RGB triplets that every BrainVoyager binary header is built from. All
//! multi-byte scalars are little-endian; the formats define no other byte
//! order. Each function advances the stream by exactly the consumed byte
//! count and never over-reads.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::error::{Error, Result};

pub fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    reader.read_u8().map_err(Error::from_read)
}

pub fn read_i8<R: Read>(reader: &mut R) -> Result<i8> {
    reader.read_i8().map_err(Error::from_read)
}

pub fn read_i16<R: Read>(reader: &mut R) -> Result<i16> {
    reader.read_i16::<LittleEndian>().map_err(Error::from_read)
}

pub fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
    reader.read_u16::<LittleEndian>().map_err(Error::from_read)
}

pub fn read_i32<R: Read>(reader: &mut R) -> Result<i32> {
    reader.read_i32::<LittleEndian>().map_err(Error::from_read)
}

pub fn read_f32<R: Read>(reader: &mut R) -> Result<f32> {
    reader.read_f32::<LittleEndian>().map_err(Error::from_read)
}

pub fn write_u8<W: Write>(writer: &mut W, value: u8) -> Result<()> {
    writer.write_u8(value)?;
    Ok(())
}

pub fn write_i8<W: Write>(writer: &mut W, value: i8) -> Result<()> {
    writer.write_i8(value)?;
    Ok(())
}

pub fn write_i16<W: Write>(writer: &mut W, value: i16) -> Result<()> {
    writer.write_i16::<LittleEndian>(value)?;
    Ok(())
}

pub fn write_u16<W: Write>(writer: &mut W, value: u16) -> Result<()> {
    writer.write_u16::<LittleEndian>(value)?;
    Ok(())
}

pub fn write_i32<W: Write>(writer: &mut W, value: i32) -> Result<()> {
    writer.write_i32::<LittleEndian>(value)?;
    Ok(())
}

pub fn write_f32<W: Write>(writer: &mut W, value: f32) -> Result<()> {
    writer.write_f32::<LittleEndian>(value)?;
    Ok(())
}

/// Read a null-terminated variable-length string, scanning byte by byte
/// until the terminator. The terminator is consumed but not returned.
pub fn read_cstring<R: Read>(reader: &mut R) -> Result<String> {
    let mut bytes = Vec::new();
    loop {
        let byte = reader.read_u8().map_err(Error::from_read)?;
        if byte == 0 {
            break;
        }
        bytes.push(byte);
    }
    String::from_utf8(bytes)
        .map_err(|e| Error::Decode(format!("invalid UTF-8 in variable-length string: {e}")))
}

/// Write a string followed by a single null terminator.
pub fn write_cstring<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    writer.write_all(value.as_bytes())?;
    writer.write_u8(0)?;
    Ok(())
}

/// Read three unsigned bytes forming an RGB color.
pub fn read_rgb<R: Read>(reader: &mut R) -> Result<[u8; 3]> {
    let mut rgb = [0u8; 3];
    reader.read_exact(&mut rgb).map_err(Error::from_read)?;
    Ok(rgb)
}

/// Write an RGB color as three unsigned bytes.
pub fn write_rgb<W: Write>(writer: &mut W, rgb: [u8; 3]) -> Result<()> {
    writer.write_all(&rgb)?;
    Ok(())
}

/// Read exactly `len` raw bytes (used for reserved header regions that
/// must survive a round trip untouched).
pub fn read_bytes<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).map_err(Error::from_read)?;
    Ok(buf)
}

/// Read `count` little-endian i16 values.
pub fn read_i16_array<R: Read>(reader: &mut R, count: usize) -> Result<Vec<i16>> {
    let mut values = vec![0i16; count];
    reader
        .read_i16_into::<LittleEndian>(&mut values)
        .map_err(Error::from_read)?;
    Ok(values)
}

/// Read `count` little-endian u16 values.
pub fn read_u16_array<R: Read>(reader: &mut R, count: usize) -> Result<Vec<u16>> {
    let mut values = vec![0u16; count];
    reader
        .read_u16_into::<LittleEndian>(&mut values)
        .map_err(Error::from_read)?;
    Ok(values)
}

/// Read `count` little-endian i32 values.
pub fn read_i32_array<R: Read>(reader: &mut R, count: usize) -> Result<Vec<i32>> {
    let mut values = vec![0i32; count];
    reader
        .read_i32_into::<LittleEndian>(&mut values)
        .map_err(Error::from_read)?;
    Ok(values)
}

/// Read `count` little-endian f32 values.
pub fn read_f32_array<R: Read>(reader: &mut R, count: usize) -> Result<Vec<f32>> {
    let mut values = vec![0f32; count];
    reader
        .read_f32_into::<LittleEndian>(&mut values)
        .map_err(Error::from_read)?;
    Ok(values)
}

pub fn write_i16_array<W: Write>(writer: &mut W, values: &[i16]) -> Result<()> {
    for &v in values {
        writer.write_i16::<LittleEndian>(v)?;
    }
    Ok(())
}

pub fn write_u16_array<W: Write>(writer: &mut W, values: &[u16]) -> Result<()> {
    for &v in values {
        writer.write_u16::<LittleEndian>(v)?;
    }
    Ok(())
}

pub fn write_i32_array<W: Write>(writer: &mut W, values: &[i32]) -> Result<()> {
    for &v in values {
        writer.write_i32::<LittleEndian>(v)?;
    }
    Ok(())
}

pub fn write_f32_array<W: Write>(writer: &mut W, values: &[f32]) -> Result<()> {
    for &v in values {
        writer.write_f32::<LittleEndian>(v)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn scalars_roundtrip_little_endian() {
        let mut buf = Vec::new();
        write_u16(&mut buf, 258).unwrap();
        write_i32(&mut buf, -7).unwrap();
        write_f32(&mut buf, 1.5).unwrap();
        assert_eq!(&buf[..2], &[2, 1]); // LE layout

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_u16(&mut cursor).unwrap(), 258);
        assert_eq!(read_i32(&mut cursor).unwrap(), -7);
        assert_eq!(read_f32(&mut cursor).unwrap(), 1.5);
    }

    #[test]
    fn cstring_roundtrip() {
        let mut buf = Vec::new();
        write_cstring(&mut buf, "ACPC transform").unwrap();
        assert_eq!(buf.last(), Some(&0));

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_cstring(&mut cursor).unwrap(), "ACPC transform");
        // Terminator was consumed: nothing left.
        assert!(matches!(
            read_u8(&mut cursor),
            Err(crate::error::Error::TruncatedInput)
        ));
    }

    #[test]
    fn cstring_empty() {
        let mut cursor = Cursor::new(vec![0u8]);
        assert_eq!(read_cstring(&mut cursor).unwrap(), "");
    }

    #[test]
    fn cstring_rejects_invalid_utf8() {
        let mut cursor = Cursor::new(vec![0xFF, 0xFE, 0]);
        assert!(matches!(
            read_cstring(&mut cursor),
            Err(crate::error::Error::Decode(_))
        ));
    }

    #[test]
    fn unterminated_cstring_is_truncated_input() {
        let mut cursor = Cursor::new(b"abc".to_vec());
        assert!(matches!(
            read_cstring(&mut cursor),
            Err(crate::error::Error::TruncatedInput)
        ));
    }

    #[test]
    fn rgb_roundtrip() {
        let mut buf = Vec::new();
        write_rgb(&mut buf, [224, 243, 248]).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(read_rgb(&mut cursor).unwrap(), [224, 243, 248]);
    }

    #[test]
    fn short_read_is_truncated_input() {
        let mut cursor = Cursor::new(vec![1u8, 2]);
        assert!(matches!(
            read_i32(&mut cursor),
            Err(crate::error::Error::TruncatedInput)
        ));
    }
}
