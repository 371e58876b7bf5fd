//! POI patch-of-interest lists (text).
//!
//! The surface counterpart of VOI: named sets of mesh vertex indices, one
//! index per line inside each patch block. Header keys before the first
//! patch are preserved in order, recognized or not.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::codec::text::{self, TextDocument};
use crate::error::{Error, Result};
use crate::header::{FieldValue, Header};

fn set_scalar(header: &mut Header, key: &str, value: &str) {
    match text::parse_int(value) {
        Ok(n) => header.set_int(key, n),
        Err(_) => header.set_str(key, value),
    }
}

fn parse_rgb(value: &str) -> Result<[u8; 3]> {
    let values = text::parse_int_list(value)?;
    let [r, g, b] = values[..] else {
        return Err(Error::Decode(format!(
            "expected 3 color values, got '{value}'"
        )));
    };
    Ok([r as u8, g as u8, b as u8])
}

/// Parse a POI document into its header and patch list.
pub fn parse(content: &str) -> Result<(Header, Vec<Header>)> {
    let doc = TextDocument::from_str_content(content);
    let mut header = Header::new();
    let mut patches: Vec<Header> = Vec::new();
    let mut vertices: Vec<Vec<i32>> = Vec::new();

    for line in doc.lines() {
        match text::split_key_value(line) {
            Some(("NameOfPOI", value)) => {
                let mut patch = Header::new();
                patch.set_str("NameOfPOI", value);
                patches.push(patch);
                vertices.push(Vec::new());
            }
            Some((key @ ("InfoTextFile" | "LabelVertex" | "NrOfVertices"), value)) => {
                let patch = patches
                    .last_mut()
                    .ok_or_else(|| Error::Decode(format!("{key} before NameOfPOI")))?;
                set_scalar(patch, key, value);
            }
            Some(("ColorOfPOI", value)) => {
                let patch = patches
                    .last_mut()
                    .ok_or_else(|| Error::Decode("ColorOfPOI before NameOfPOI".into()))?;
                patch.set("ColorOfPOI", FieldValue::Rgb(parse_rgb(value)?));
            }
            Some(("NrOfPOIMTCs", value)) => header.set_int("NrOfPOIMTCs", text::parse_int(value)?),
            Some((key, value)) if patches.is_empty() => set_scalar(&mut header, key, value),
            _ if text::is_numeric_row(line) => {
                let list = vertices
                    .last_mut()
                    .ok_or_else(|| Error::Decode("vertex index before NameOfPOI".into()))?;
                list.push(text::parse_int(line)? as i32);
            }
            _ => {}
        }
    }
    for (patch, list) in patches.iter_mut().zip(vertices) {
        patch.set("Vertices", FieldValue::IntList(list));
    }
    Ok((header, patches))
}

pub fn read<P: AsRef<Path>>(path: P) -> Result<(Header, Vec<Header>)> {
    parse(&fs::read_to_string(path)?)
}

/// Serialize a POI document.
pub fn write_content<W: Write>(writer: &mut W, header: &Header, patches: &[Header]) -> Result<()> {
    writeln!(writer)?;
    for (key, value) in header.iter() {
        if key == "NrOfPOIMTCs" {
            continue;
        }
        match value {
            FieldValue::Int(n) => writeln!(writer, "{:<31}{n}", format!("{key}:"))?,
            FieldValue::Str(s) => writeln!(writer, "{:<31}{s}", format!("{key}:"))?,
            other => {
                return Err(Error::Decode(format!(
                    "field value {other:?} has no text form"
                )))
            }
        }
        writeln!(writer)?;
    }
    writeln!(writer)?;

    for patch in patches {
        writeln!(writer, "NameOfPOI:  {}", patch.require_str("NameOfPOI")?)?;
        if let Some(info) = patch.get_str("InfoTextFile") {
            writeln!(writer, "InfoTextFile:  {info}")?;
        }
        let [r, g, b] = patch.require_rgb("ColorOfPOI")?;
        writeln!(writer, "ColorOfPOI: {r} {g} {b}")?;
        writeln!(writer, "LabelVertex:  {}", patch.require_int("LabelVertex")?)?;
        writeln!(writer, "NrOfVertices: {}", patch.require_int("NrOfVertices")?)?;
        for index in patch.require_int_list("Vertices")? {
            writeln!(writer, "{index}")?;
        }
        writeln!(writer)?;
    }

    writeln!(writer)?;
    if let Some(n) = header.get_int("NrOfPOIMTCs") {
        writeln!(writer, "NrOfPOIMTCs: {n}")?;
    }
    Ok(())
}

pub fn write<P: AsRef<Path>>(path: P, header: &Header, patches: &[Header]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_content(&mut writer, header, patches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text() -> &'static str {
        "\n\
FileVersion:                   2\n\
\n\
FromMeshFile:                  \"sub-01_lh.srf\"\n\
\n\
NrOfMeshVertices:              866\n\
\n\
NrOfPOIs:                      2\n\
\n\
NameOfPOI:  \"calcarine\"\n\
InfoTextFile:  \"\"\n\
ColorOfPOI: 33 120 255\n\
LabelVertex:  731\n\
NrOfVertices: 3\n\
731\n\
732\n\
741\n\
\n\
NameOfPOI:  \"pole\"\n\
InfoTextFile:  \"\"\n\
ColorOfPOI: 168 255 115\n\
LabelVertex:  383\n\
NrOfVertices: 1\n\
383\n\
\n\
NrOfPOIMTCs: 0\n"
    }

    #[test]
    fn patches_parsed() {
        let (header, patches) = parse(sample_text()).unwrap();
        assert_eq!(header.get_int("NrOfMeshVertices"), Some(866));
        assert_eq!(header.get_str("FromMeshFile"), Some("\"sub-01_lh.srf\""));
        assert_eq!(patches.len(), 2);
        assert_eq!(
            patches[0].require_int_list("Vertices").unwrap(),
            &[731, 732, 741]
        );
        assert_eq!(patches[1].require_int("LabelVertex").unwrap(), 383);
        assert_eq!(header.get_int("NrOfPOIMTCs"), Some(0));
    }

    #[test]
    fn roundtrip() {
        let (header, patches) = parse(sample_text()).unwrap();
        let mut out = Vec::new();
        write_content(&mut out, &header, &patches).unwrap();
        let (back_header, back_patches) = parse(std::str::from_utf8(&out).unwrap()).unwrap();
        assert_eq!(back_header, header);
        assert_eq!(back_patches, patches);
    }
}
