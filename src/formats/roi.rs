//! ROI slice-based region lists (text).
//!
//! The in-plane predecessor of VOI: regions defined on functional slices,
//! each block opened by a `NrOfRects` key and followed by slice/rectangle
//! bounds, a voxel count and coordinate triplets. Everything before the
//! first `NrOfRects` line is header, preserved key by key.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::codec::text::{self, TextDocument};
use crate::error::{Error, Result};
use crate::header::{FieldValue, Header};

const REGION_INT_KEYS: &[&str] = &[
    "FromSlice",
    "Left",
    "Right",
    "Top",
    "Bottom",
    "NrOfVoxels",
];

fn set_scalar(header: &mut Header, key: &str, value: &str) {
    match text::parse_int(value) {
        Ok(n) => header.set_int(key, n),
        Err(_) => header.set_str(key, value),
    }
}

/// Parse an ROI document into its header and region list.
pub fn parse(content: &str) -> Result<(Header, Vec<Header>)> {
    let doc = TextDocument::from_str_content(content);
    let mut header = Header::new();
    let mut regions: Vec<Header> = Vec::new();
    let mut coords: Vec<Vec<i32>> = Vec::new();

    for line in doc.lines() {
        match text::split_key_value(line) {
            Some(("NrOfRects", value)) => {
                let mut region = Header::new();
                region.set_int("NrOfRects", text::parse_int(value)?);
                regions.push(region);
                coords.push(Vec::new());
            }
            Some((key, value)) if REGION_INT_KEYS.contains(&key) && !regions.is_empty() => {
                if let Some(region) = regions.last_mut() {
                    region.set_int(key, text::parse_int(value)?);
                }
            }
            Some((key, value)) if regions.is_empty() => set_scalar(&mut header, key, value),
            _ if text::is_numeric_row(line) => {
                let list = coords
                    .last_mut()
                    .ok_or_else(|| Error::Decode("coordinate row before NrOfRects".into()))?;
                let triplet = text::parse_int_list(line)?;
                if triplet.len() != 3 {
                    return Err(Error::Decode(format!(
                        "expected 3 voxel coordinates, got '{line}'"
                    )));
                }
                list.extend(triplet.iter().map(|&v| v as i32));
            }
            _ => {}
        }
    }
    for (region, list) in regions.iter_mut().zip(coords) {
        region.set("Coordinates", FieldValue::IntList(list));
    }
    Ok((header, regions))
}

pub fn read<P: AsRef<Path>>(path: P) -> Result<(Header, Vec<Header>)> {
    parse(&fs::read_to_string(path)?)
}

/// Serialize an ROI document.
pub fn write_content<W: Write>(writer: &mut W, header: &Header, regions: &[Header]) -> Result<()> {
    writeln!(writer)?;
    for (key, value) in header.iter() {
        match value {
            FieldValue::Int(n) => writeln!(writer, "{:<20}{n}", format!("{key}:"))?,
            FieldValue::Str(s) => writeln!(writer, "{:<20}{s}", format!("{key}:"))?,
            other => {
                return Err(Error::Decode(format!(
                    "field value {other:?} has no text form"
                )))
            }
        }
    }
    writeln!(writer)?;

    for region in regions {
        writeln!(writer, "NrOfRects: {}", region.require_int("NrOfRects")?)?;
        for key in REGION_INT_KEYS {
            if let Some(n) = region.get_int(key) {
                writeln!(writer, "{key}: {n}")?;
            }
        }
        for triplet in region.require_int_list("Coordinates")?.chunks_exact(3) {
            writeln!(writer, "{} {} {}", triplet[0], triplet[1], triplet[2])?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

pub fn write<P: AsRef<Path>>(path: P, header: &Header, regions: &[Header]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_content(&mut writer, header, regions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text() -> &'static str {
        "\n\
FileVersion:        6\n\
Type:               1\n\
SourceImage:        run-01.fmr\n\
\n\
NrOfRects: 1\n\
FromSlice: 12\n\
Left: 20\n\
Right: 30\n\
Top: 14\n\
Bottom: 24\n\
NrOfVoxels: 2\n\
21 15 12\n\
22 15 12\n\
\n\
NrOfRects: 0\n\
FromSlice: 13\n\
NrOfVoxels: 1\n\
40 40 13\n"
    }

    #[test]
    fn header_ends_at_first_region() {
        let (header, regions) = parse(sample_text()).unwrap();
        assert_eq!(header.get_int("FileVersion"), Some(6));
        assert_eq!(header.get_str("SourceImage"), Some("run-01.fmr"));
        assert!(!header.contains("FromSlice"));
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].require_int("Bottom").unwrap(), 24);
        assert_eq!(
            regions[0].require_int_list("Coordinates").unwrap(),
            &[21, 15, 12, 22, 15, 12]
        );
        assert_eq!(regions[1].require_int_list("Coordinates").unwrap(), &[40, 40, 13]);
    }

    #[test]
    fn roundtrip() {
        let (header, regions) = parse(sample_text()).unwrap();
        let mut out = Vec::new();
        write_content(&mut out, &header, &regions).unwrap();
        let (back_header, back_regions) = parse(std::str::from_utf8(&out).unwrap()).unwrap();
        assert_eq!(back_header, header);
        assert_eq!(back_regions, regions);
    }
}
