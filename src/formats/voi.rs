//! VOI voxel-of-interest region lists (text).
//!
//! A VOI file is a text header followed by one block per region
//! (`NameOfVOI`, `ColorOfVOI`, `NrOfVoxels`, then one coordinate triplet per
//! line) and a trailing linked-VTC section. The desktop application added
//! header keys across versions, so every `Key: value` line before the first
//! region is kept in order, recognized or not, and written back on encode.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::codec::text::{self, TextDocument};
use crate::error::{Error, Result};
use crate::header::{FieldValue, Header};

/// Keys that belong to the section after the region blocks.
const TRAILING_KEYS: &[&str] = &["NrOfVOIVTCs", "VOIVTCs"];

fn set_scalar(header: &mut Header, key: &str, value: &str) {
    match text::parse_int(value) {
        Ok(n) => header.set_int(key, n),
        Err(_) => header.set_str(key, value),
    }
}

fn parse_rgb(value: &str) -> Result<[u8; 3]> {
    let values = text::parse_int_list(value)?;
    let [r, g, b] = values[..] else {
        return Err(Error::Decode(format!("expected 3 color values, got '{value}'")));
    };
    Ok([r as u8, g as u8, b as u8])
}

/// Parse a VOI document into its header and region list.
pub fn parse(content: &str) -> Result<(Header, Vec<Header>)> {
    let doc = TextDocument::from_str_content(content);
    let mut header = Header::new();
    let mut regions: Vec<Header> = Vec::new();
    let mut coords: Vec<Vec<i32>> = Vec::new();
    let mut vtc_paths: Vec<String> = Vec::new();
    let mut in_vtc_section = false;

    for line in doc.lines() {
        if in_vtc_section {
            vtc_paths.push(line.clone());
            continue;
        }
        match text::split_key_value(line) {
            Some(("NameOfVOI", value)) => {
                let mut region = Header::new();
                region.set_str("NameOfVOI", value);
                regions.push(region);
                coords.push(Vec::new());
            }
            Some(("ColorOfVOI", value)) => {
                let region = regions
                    .last_mut()
                    .ok_or_else(|| Error::Decode("ColorOfVOI before NameOfVOI".into()))?;
                region.set("ColorOfVOI", FieldValue::Rgb(parse_rgb(value)?));
            }
            Some(("NrOfVoxels", value)) => {
                let region = regions
                    .last_mut()
                    .ok_or_else(|| Error::Decode("NrOfVoxels before NameOfVOI".into()))?;
                region.set_int("NrOfVoxels", text::parse_int(value)?);
            }
            Some(("NrOfVOIVTCs", value)) => {
                header.set_int("NrOfVOIVTCs", text::parse_int(value)?);
                in_vtc_section = true;
            }
            Some((key, value)) if regions.is_empty() => set_scalar(&mut header, key, value),
            _ if text::is_numeric_row(line) => {
                let list = coords
                    .last_mut()
                    .ok_or_else(|| Error::Decode("coordinate row before NameOfVOI".into()))?;
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
    if !vtc_paths.is_empty() {
        header.set_str("VOIVTCs", vtc_paths.join("\n"));
    }
    Ok((header, regions))
}

pub fn read<P: AsRef<Path>>(path: P) -> Result<(Header, Vec<Header>)> {
    parse(&fs::read_to_string(path)?)
}

fn write_value<W: Write>(writer: &mut W, value: &FieldValue) -> Result<()> {
    match value {
        FieldValue::Int(n) => writeln!(writer, "{n}")?,
        FieldValue::Str(s) => writeln!(writer, "{s}")?,
        other => {
            return Err(Error::Decode(format!(
                "field value {other:?} has no text form"
            )))
        }
    }
    Ok(())
}

/// Serialize a VOI document.
pub fn write_content<W: Write>(writer: &mut W, header: &Header, regions: &[Header]) -> Result<()> {
    writeln!(writer)?;
    for (key, value) in header.iter() {
        if TRAILING_KEYS.contains(&key) {
            continue;
        }
        write!(writer, "{:<31}", format!("{key}:"))?;
        write_value(writer, value)?;
        writeln!(writer)?;
    }
    writeln!(writer)?;

    for region in regions {
        writeln!(writer, "{:<12}{}", "NameOfVOI:", region.require_str("NameOfVOI")?)?;
        let [r, g, b] = region.require_rgb("ColorOfVOI")?;
        writeln!(writer, "{:<12}{r} {g} {b}", "ColorOfVOI:")?;
        writeln!(writer)?;
        writeln!(writer, "{:<12}{}", "NrOfVoxels:", region.require_int("NrOfVoxels")?)?;
        for triplet in region.require_int_list("Coordinates")?.chunks_exact(3) {
            writeln!(writer, "{} {} {}", triplet[0], triplet[1], triplet[2])?;
        }
        writeln!(writer)?;
    }

    writeln!(writer)?;
    if let Some(n) = header.get_int("NrOfVOIVTCs") {
        writeln!(writer, "NrOfVOIVTCs: {n}")?;
        if let Some(paths) = header.get_str("VOIVTCs") {
            writeln!(writer, "{paths}")?;
        }
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
FileVersion:                   4\n\
\n\
ReferenceSpace:                TAL\n\
\n\
OriginalVMRResolutionX:        1\n\
OriginalVMRResolutionY:        1\n\
OriginalVMRResolutionZ:        1\n\
OriginalVMROffsetX:            0\n\
OriginalVMROffsetY:            0\n\
OriginalVMROffsetZ:            0\n\
OriginalVMRFramingCubeDim:     256\n\
\n\
LeftRightConvention:           1\n\
SubjectVOINamingConvention:    \"<VOI>_<SUBJ>\"\n\
\n\
NrOfVOIs:                      2\n\
\n\
NameOfVOI:  left_v1\n\
ColorOfVOI: 255 0 0\n\
\n\
NrOfVoxels: 2\n\
128 130 132\n\
129 130 132\n\
\n\
NameOfVOI:  right_v1\n\
ColorOfVOI: 0 255 0\n\
\n\
NrOfVoxels: 1\n\
-64 30 12\n\
\n\
NrOfVOIVTCs: 1\n\
C:/study/sub-01/run-01.vtc\n"
    }

    #[test]
    fn regions_and_coordinates_parsed() {
        let (header, regions) = parse(sample_text()).unwrap();
        assert_eq!(header.get_int("FileVersion"), Some(4));
        assert_eq!(header.get_str("ReferenceSpace"), Some("TAL"));
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].require_str("NameOfVOI").unwrap(), "left_v1");
        assert_eq!(
            regions[0].require_int_list("Coordinates").unwrap(),
            &[128, 130, 132, 129, 130, 132]
        );
        assert_eq!(regions[1].require_rgb("ColorOfVOI").unwrap(), [0, 255, 0]);
        assert_eq!(regions[1].require_int_list("Coordinates").unwrap(), &[-64, 30, 12]);
        assert_eq!(
            header.get_str("VOIVTCs"),
            Some("C:/study/sub-01/run-01.vtc")
        );
    }

    #[test]
    fn unknown_header_keys_survive_roundtrip() {
        let text = sample_text().replace(
            "LeftRightConvention:           1\n",
            "LeftRightConvention:           1\nSomeFutureKey:                 maybe\n",
        );
        let (header, regions) = parse(&text).unwrap();
        assert_eq!(header.get_str("SomeFutureKey"), Some("maybe"));

        let mut out = Vec::new();
        write_content(&mut out, &header, &regions).unwrap();
        let (reparsed, _) = parse(std::str::from_utf8(&out).unwrap()).unwrap();
        assert_eq!(reparsed.get_str("SomeFutureKey"), Some("maybe"));
        assert_eq!(reparsed, header);
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

    #[test]
    fn coordinate_row_before_any_region_is_an_error() {
        let text = "FileVersion: 4\n128 130 132\nNameOfVOI: x\n";
        assert!(matches!(parse(text), Err(Error::Decode(_))));
    }
}
