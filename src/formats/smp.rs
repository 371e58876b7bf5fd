//! SMP surface maps.
//!
//! Statistical overlays sampled per mesh vertex. Unlike VMP, the vertex
//! values are interleaved with the map headers: each map block is followed
//! immediately by its own column of `NrVertices` floats, so the map loop
//! alternates between header fields and payload.
//!
//! The map block grew across file versions. Version 2 added the RGB/LUT
//! color block, version 3 the cross-correlation lag fields, version 4 the
//! negative RGB pair and the threshold-include flag, version 5 the
//! show-positive-negative flag and the LUT file name. A field gated off by
//! the version is absent from the decoded header, not defaulted.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::Array2;

use crate::codec::primitive;
use crate::error::{Error, Result};
use crate::formats;
use crate::header::{FieldValue, Header};
use crate::layout;

fn read_map<R: Read>(reader: &mut R, version: i64) -> Result<Header> {
    let mut map = Header::new();
    let type_of_map = i64::from(primitive::read_i32(reader)?);
    map.set_int("TypeOfMap", type_of_map);
    if version >= 3 && type_of_map == 3 {
        map.set_int("NrOfLags", i64::from(primitive::read_i32(reader)?));
        map.set_int("DisplayMinLag", i64::from(primitive::read_i32(reader)?));
        map.set_int("DisplayMaxLag", i64::from(primitive::read_i32(reader)?));
        map.set_int(
            "ShowCorrelationOrLag",
            i64::from(primitive::read_i32(reader)?),
        );
    }
    map.set_int(
        "ClusterSizeThreshold",
        i64::from(primitive::read_i32(reader)?),
    );
    map.set_int(
        "EnableClusterSizeThreshold",
        i64::from(primitive::read_u8(reader)?),
    );
    map.set_float("ThresholdMin", f64::from(primitive::read_f32(reader)?));
    map.set_float("ThresholdMax", f64::from(primitive::read_f32(reader)?));
    if version >= 4 {
        map.set_int(
            "IncludeValuesGreaterUpperThreshold",
            i64::from(primitive::read_i32(reader)?),
        );
    }
    map.set_int("DF1", i64::from(primitive::read_i32(reader)?));
    map.set_int("DF2", i64::from(primitive::read_i32(reader)?));
    if version >= 5 {
        map.set_int("ShowPosNegValues", i64::from(primitive::read_i32(reader)?));
    }
    map.set_int("BonferroniValue", i64::from(primitive::read_i32(reader)?));
    if version >= 2 {
        map.set("RgbPositiveMin", FieldValue::Rgb(primitive::read_rgb(reader)?));
        map.set("RgbPositiveMax", FieldValue::Rgb(primitive::read_rgb(reader)?));
        if version >= 4 {
            map.set(
                "RgbNegativeMin",
                FieldValue::Rgb(primitive::read_rgb(reader)?),
            );
            map.set(
                "RgbNegativeMax",
                FieldValue::Rgb(primitive::read_rgb(reader)?),
            );
        }
        map.set_int("UseRgbColor", i64::from(primitive::read_u8(reader)?));
        if version >= 5 {
            map.set_str("LUTFileName", primitive::read_cstring(reader)?);
        }
        map.set_float(
            "TransparentColorFactor",
            f64::from(primitive::read_f32(reader)?),
        );
    }
    map.set_str("MapName", primitive::read_cstring(reader)?);
    Ok(map)
}

fn write_map<W: Write>(writer: &mut W, version: i64, map: &Header) -> Result<()> {
    let type_of_map = map.require_int("TypeOfMap")?;
    primitive::write_i32(writer, type_of_map as i32)?;
    if version >= 3 && type_of_map == 3 {
        primitive::write_i32(writer, map.require_int("NrOfLags")? as i32)?;
        primitive::write_i32(writer, map.require_int("DisplayMinLag")? as i32)?;
        primitive::write_i32(writer, map.require_int("DisplayMaxLag")? as i32)?;
        primitive::write_i32(writer, map.require_int("ShowCorrelationOrLag")? as i32)?;
    }
    primitive::write_i32(writer, map.require_int("ClusterSizeThreshold")? as i32)?;
    primitive::write_u8(writer, map.require_int("EnableClusterSizeThreshold")? as u8)?;
    primitive::write_f32(writer, map.require_float("ThresholdMin")? as f32)?;
    primitive::write_f32(writer, map.require_float("ThresholdMax")? as f32)?;
    if version >= 4 {
        primitive::write_i32(
            writer,
            map.require_int("IncludeValuesGreaterUpperThreshold")? as i32,
        )?;
    }
    primitive::write_i32(writer, map.require_int("DF1")? as i32)?;
    primitive::write_i32(writer, map.require_int("DF2")? as i32)?;
    if version >= 5 {
        primitive::write_i32(writer, map.require_int("ShowPosNegValues")? as i32)?;
    }
    primitive::write_i32(writer, map.require_int("BonferroniValue")? as i32)?;
    if version >= 2 {
        primitive::write_rgb(writer, map.require_rgb("RgbPositiveMin")?)?;
        primitive::write_rgb(writer, map.require_rgb("RgbPositiveMax")?)?;
        if version >= 4 {
            primitive::write_rgb(writer, map.require_rgb("RgbNegativeMin")?)?;
            primitive::write_rgb(writer, map.require_rgb("RgbNegativeMax")?)?;
        }
        primitive::write_u8(writer, map.require_int("UseRgbColor")? as u8)?;
        if version >= 5 {
            primitive::write_cstring(writer, map.require_str("LUTFileName")?)?;
        }
        primitive::write_f32(writer, map.require_float("TransparentColorFactor")? as f32)?;
    }
    primitive::write_cstring(writer, map.require_str("MapName")?)
}

/// Decode an SMP into its header and a (vertex, map) value matrix.
pub fn read_from<R: Read>(reader: &mut R) -> Result<(Header, Array2<f32>)> {
    let mut header = Header::new();
    let version = i64::from(primitive::read_i16(reader)?);
    header.set_int("FileVersion", version);
    header.set_int("NrVertices", i64::from(primitive::read_i32(reader)?));
    header.set_int("NrMaps", i64::from(primitive::read_i16(reader)?));
    header.set_str("NameOfSrfFile", primitive::read_cstring(reader)?);

    let nr_vertices = layout::positive_dim(&header, "NrVertices")?;
    let nr_maps = layout::positive_dim(&header, "NrMaps")?;
    let mut data = Array2::zeros((nr_vertices, nr_maps));
    let mut maps = Vec::with_capacity(nr_maps);
    for m in 0..nr_maps {
        maps.push(read_map(reader, version)?);
        let column = primitive::read_f32_array(reader, nr_vertices)?;
        for (v, value) in column.into_iter().enumerate() {
            data[[v, m]] = value;
        }
    }
    header.set("Map", FieldValue::Blocks(maps));
    Ok((header, data))
}

pub fn read<P: AsRef<Path>>(path: P) -> Result<(Header, Array2<f32>)> {
    let mut reader = BufReader::new(File::open(path)?);
    read_from(&mut reader)
}

pub fn write_to<W: Write>(writer: &mut W, header: &Header, data: &Array2<f32>) -> Result<()> {
    let nr_vertices = layout::positive_dim(header, "NrVertices")?;
    let maps = header.require_blocks("Map")?;
    let nr_maps = layout::positive_dim(header, "NrMaps")?;
    if maps.len() != nr_maps {
        return Err(Error::Layout(format!(
            "header promises {nr_maps} maps but holds {} map blocks",
            maps.len()
        )));
    }
    formats::expect_shape(data.shape(), &[nr_vertices, nr_maps])?;

    let version = header.require_int("FileVersion")?;
    primitive::write_i16(writer, version as i16)?;
    primitive::write_i32(writer, nr_vertices as i32)?;
    primitive::write_i16(writer, nr_maps as i16)?;
    primitive::write_cstring(writer, header.require_str("NameOfSrfFile")?)?;
    for (m, map) in maps.iter().enumerate() {
        write_map(writer, version, map)?;
        for v in 0..nr_vertices {
            primitive::write_f32(writer, data[[v, m]])?;
        }
    }
    Ok(())
}

pub fn write<P: AsRef<Path>>(path: P, header: &Header, data: &Array2<f32>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_to(&mut writer, header, data)
}
