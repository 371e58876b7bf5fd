//! FBR fiber tracking files (text).
//!
//! Groups of tracked fibers, each fiber a `NrOfPoints` count followed by one
//! row per point: three coordinates and an RGB color. Only the text variant
//! is supported; files opening with the binary-FBR signature are rejected
//! up front.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::codec::text::{self, TextDocument};
use crate::error::{Error, Result};
use crate::header::{FieldValue, Header};

/// Signature of the unsupported binary FBR variant.
const BINARY_FBR_MAGIC: u32 = 0xA4D3_C2B1;

/// One point along a tracked fiber.
#[derive(Debug, Clone, PartialEq)]
pub struct FiberPoint {
    pub position: [f32; 3],
    pub color: [i32; 3],
}

/// One tracked fiber.
#[derive(Debug, Clone, PartialEq)]
pub struct Fiber {
    pub points: Vec<FiberPoint>,
}

fn set_scalar(header: &mut Header, key: &str, value: &str) {
    match text::parse_int(value) {
        Ok(n) => header.set_int(key, n),
        Err(_) => header.set_str(key, value),
    }
}

fn parse_point(line: &str) -> Result<FiberPoint> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != 6 {
        return Err(Error::Decode(format!(
            "fiber point row '{line}' has {} values, expected 6",
            tokens.len()
        )));
    }
    Ok(FiberPoint {
        position: [
            text::parse_f32(tokens[0])?,
            text::parse_f32(tokens[1])?,
            text::parse_f32(tokens[2])?,
        ],
        color: [
            text::parse_int(tokens[3])? as i32,
            text::parse_int(tokens[4])? as i32,
            text::parse_int(tokens[5])? as i32,
        ],
    })
}

/// Parse an FBR document into its header and fiber list.
pub fn parse(content: &str) -> Result<(Header, Vec<Fiber>)> {
    let doc = TextDocument::from_str_content(content);
    let mut header = Header::new();
    let mut fibers: Vec<Fiber> = Vec::new();
    let mut in_fibers = false;

    for line in doc.lines() {
        match text::split_key_value(line) {
            Some(("NrOfPoints", value)) => {
                in_fibers = true;
                let count = text::parse_int(value)?;
                fibers.push(Fiber {
                    points: Vec::with_capacity(count.max(0) as usize),
                });
            }
            Some(("Color", value)) if !in_fibers => {
                let values = text::parse_int_list(value)?;
                let [r, g, b] = values[..] else {
                    return Err(Error::Decode(format!(
                        "expected 3 color values, got '{value}'"
                    )));
                };
                header.set("Color", FieldValue::Rgb([r as u8, g as u8, b as u8]));
            }
            Some((key, value)) if !in_fibers => set_scalar(&mut header, key, value),
            _ if text::is_numeric_row(line) => {
                let fiber = fibers
                    .last_mut()
                    .ok_or_else(|| Error::Decode("fiber point row before NrOfPoints".into()))?;
                fiber.points.push(parse_point(line)?);
            }
            _ => {}
        }
    }
    Ok((header, fibers))
}

/// Read an FBR file, rejecting the binary variant by its signature.
pub fn read<P: AsRef<Path>>(path: P) -> Result<(Header, Vec<Fiber>)> {
    let bytes = fs::read(path)?;
    if bytes.len() >= 4 {
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic == BINARY_FBR_MAGIC {
            return Err(Error::Decode(
                "binary FBR files are not supported, only the text variant".into(),
            ));
        }
    }
    let content = String::from_utf8(bytes)
        .map_err(|e| Error::Decode(format!("FBR text is not valid UTF-8: {e}")))?;
    parse(&content)
}

/// Serialize an FBR document.
pub fn write_content<W: Write>(writer: &mut W, header: &Header, fibers: &[Fiber]) -> Result<()> {
    for (key, value) in header.iter() {
        let tabs = if key.len() < 7 { "\t\t" } else { "\t" };
        match value {
            FieldValue::Int(n) => writeln!(writer, "{key}:{tabs}{n}")?,
            FieldValue::Str(s) => writeln!(writer, "{key}:{tabs}{s}")?,
            FieldValue::Rgb([r, g, b]) => writeln!(writer, "{key}:{tabs}{r} {g} {b}")?,
            other => {
                return Err(Error::Decode(format!(
                    "field value {other:?} has no text form"
                )))
            }
        }
    }
    writeln!(writer)?;

    for fiber in fibers {
        writeln!(writer, "NrOfPoints:\t{}", fiber.points.len())?;
        for point in &fiber.points {
            let [x, y, z] = point.position;
            let [r, g, b] = point.color;
            writeln!(writer, "{x:.3} {y:.3} {z:.3}    {r} {g} {b}")?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

pub fn write<P: AsRef<Path>>(path: P, header: &Header, fibers: &[Fiber]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_content(&mut writer, header, fibers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as IoWrite;

    fn sample_text() -> &'static str {
        "FileVersion:\t4\n\
CoordsType:\tBV I\n\
FibersOriginX:\t128\n\
FibersOriginY:\t128\n\
FibersOriginZ:\t128\n\
\n\
NrOfGroups:\t1\n\
\n\
Name:\t\t\"Tracked From VOI: testvoi_ACPC\"\n\
Visible:\t1\n\
Animate:\t-1\n\
Thickness:\t0.3\n\
Color:\t\t25 25 127\n\
\n\
NrOfFibers:\t2\n\
\n\
NrOfPoints:\t2\n\
101.209 128.266 120.192    156 148 135\n\
101.500 128.000 120.500    156 148 135\n\
\n\
NrOfPoints:\t1\n\
99.000 120.000 121.250    10 20 30\n"
    }

    #[test]
    fn fibers_parsed() {
        let (header, fibers) = parse(sample_text()).unwrap();
        assert_eq!(header.get_int("FileVersion"), Some(4));
        assert_eq!(header.get_int("FibersOriginX"), Some(128));
        // The quoted name itself contains a colon and must survive the split.
        assert_eq!(
            header.get_str("Name"),
            Some("\"Tracked From VOI: testvoi_ACPC\"")
        );
        assert_eq!(header.get_str("Thickness"), Some("0.3"));
        assert_eq!(
            header.get("Color"),
            Some(&FieldValue::Rgb([25, 25, 127]))
        );
        assert_eq!(fibers.len(), 2);
        assert_eq!(fibers[0].points.len(), 2);
        assert_eq!(fibers[1].points[0].position, [99.0, 120.0, 121.25]);
        assert_eq!(fibers[1].points[0].color, [10, 20, 30]);
    }

    #[test]
    fn roundtrip() {
        let (header, fibers) = parse(sample_text()).unwrap();
        let mut out = Vec::new();
        write_content(&mut out, &header, &fibers).unwrap();
        let (back_header, back_fibers) = parse(std::str::from_utf8(&out).unwrap()).unwrap();
        assert_eq!(back_header, header);
        assert_eq!(back_fibers, fibers);
    }

    #[test]
    fn binary_signature_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fibers.fbr");
        let mut file = File::create(&path).unwrap();
        file.write_all(&BINARY_FBR_MAGIC.to_le_bytes()).unwrap();
        file.write_all(&[0u8; 16]).unwrap();
        drop(file);
        assert!(matches!(read(&path), Err(Error::Decode(_))));
    }
}
