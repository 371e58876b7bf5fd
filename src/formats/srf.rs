//! SRF triangular surface meshes.
//!
//! Vertex coordinates and normals are stored axis-major (all X, then all Y,
//! then all Z); this adapter transposes them into per-vertex rows. After the
//! per-vertex color indices each vertex stores a self-delimited neighbor
//! list, its own count followed by that many vertex indices, so the section
//! has no length field of its own. Triangles, an optional triangle-strip
//! sequence and the associated MTC name close the file.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::Array2;

use crate::codec::{matrix, primitive};
use crate::error::{Error, Result};
use crate::header::{FieldValue, Header};
use crate::layout;

/// Mesh geometry and connectivity, separate from the scalar header fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceMesh {
    /// (vertex, xyz) coordinates.
    pub vertices: Array2<f32>,
    /// (vertex, xyz) normals.
    pub normals: Array2<f32>,
    /// One color index per vertex. Values >= 1_056_964_608 encode RGB
    /// directly; 0 and 1 reference the curvature colors in the header.
    pub color_indices: Vec<i32>,
    /// One neighbor list per vertex.
    pub neighbors: Vec<Vec<i32>>,
    /// (triangle, corner) vertex indices.
    pub triangles: Array2<i32>,
    /// Triangle strip vertex sequence, empty when the file stores none.
    pub strip_sequence: Vec<i32>,
}

fn read_rgba<R: Read>(reader: &mut R) -> Result<Vec<f32>> {
    primitive::read_f32_array(reader, 4)
}

/// Decode an SRF mesh.
pub fn read_from<R: Read>(reader: &mut R) -> Result<(Header, SurfaceMesh)> {
    let mut header = Header::new();
    header.set_float("FileVersion", f64::from(primitive::read_f32(reader)?));
    header.set_int("Reserved", i64::from(primitive::read_i32(reader)?));
    header.set_int("NrVertices", i64::from(primitive::read_i32(reader)?));
    header.set_int("NrTriangles", i64::from(primitive::read_i32(reader)?));
    header.set_float("MeshCenterX", f64::from(primitive::read_f32(reader)?));
    header.set_float("MeshCenterY", f64::from(primitive::read_f32(reader)?));
    header.set_float("MeshCenterZ", f64::from(primitive::read_f32(reader)?));

    let nr_vertices = layout::positive_dim(&header, "NrVertices")?;
    let nr_triangles = layout::positive_dim(&header, "NrTriangles")?;

    // Axis-major on disk, per-vertex rows in memory.
    let vertices = matrix::read_f32_matrix(reader, 3, nr_vertices)?.t().to_owned();
    let normals = matrix::read_f32_matrix(reader, 3, nr_vertices)?.t().to_owned();

    header.set(
        "ConvexCurvatureColor",
        FieldValue::FloatList(read_rgba(reader)?),
    );
    header.set(
        "ConcaveCurvatureColor",
        FieldValue::FloatList(read_rgba(reader)?),
    );

    let color_indices = primitive::read_i32_array(reader, nr_vertices)?;

    let mut neighbors = Vec::with_capacity(nr_vertices);
    for _ in 0..nr_vertices {
        let count = primitive::read_i32(reader)?;
        if count < 0 {
            return Err(Error::Layout(format!("negative neighbor count {count}")));
        }
        neighbors.push(primitive::read_i32_array(reader, count as usize)?);
    }

    let triangle_indices = primitive::read_i32_array(reader, nr_triangles * 3)?;
    let triangles = Array2::from_shape_vec((nr_triangles, 3), triangle_indices)
        .map_err(|e| Error::Decode(e.to_string()))?;

    let strip_len = primitive::read_i32(reader)?;
    if strip_len < 0 {
        return Err(Error::Layout(format!(
            "negative triangle strip length {strip_len}"
        )));
    }
    let strip_sequence = primitive::read_i32_array(reader, strip_len as usize)?;
    header.set_int("NrOfTriangleStripElements", i64::from(strip_len));
    header.set_str("NameOfMtcFile", primitive::read_cstring(reader)?);

    Ok((
        header,
        SurfaceMesh {
            vertices,
            normals,
            color_indices,
            neighbors,
            triangles,
            strip_sequence,
        },
    ))
}

pub fn read<P: AsRef<Path>>(path: P) -> Result<(Header, SurfaceMesh)> {
    let mut reader = BufReader::new(File::open(path)?);
    read_from(&mut reader)
}

fn write_axis_major<W: Write>(writer: &mut W, rows: &Array2<f32>) -> Result<()> {
    for axis in 0..3 {
        for v in rows.column(axis) {
            primitive::write_f32(writer, *v)?;
        }
    }
    Ok(())
}

pub fn write_to<W: Write>(writer: &mut W, header: &Header, mesh: &SurfaceMesh) -> Result<()> {
    let nr_vertices = layout::positive_dim(header, "NrVertices")?;
    let nr_triangles = layout::positive_dim(header, "NrTriangles")?;
    crate::formats::expect_shape(mesh.vertices.shape(), &[nr_vertices, 3])?;
    crate::formats::expect_shape(mesh.normals.shape(), &[nr_vertices, 3])?;
    crate::formats::expect_shape(mesh.triangles.shape(), &[nr_triangles, 3])?;
    if mesh.color_indices.len() != nr_vertices || mesh.neighbors.len() != nr_vertices {
        return Err(Error::Layout(format!(
            "per-vertex sections ({} colors, {} neighbor lists) do not match {nr_vertices} vertices",
            mesh.color_indices.len(),
            mesh.neighbors.len()
        )));
    }

    primitive::write_f32(writer, header.require_float("FileVersion")? as f32)?;
    primitive::write_i32(writer, header.require_int("Reserved")? as i32)?;
    primitive::write_i32(writer, nr_vertices as i32)?;
    primitive::write_i32(writer, nr_triangles as i32)?;
    primitive::write_f32(writer, header.require_float("MeshCenterX")? as f32)?;
    primitive::write_f32(writer, header.require_float("MeshCenterY")? as f32)?;
    primitive::write_f32(writer, header.require_float("MeshCenterZ")? as f32)?;

    write_axis_major(writer, &mesh.vertices)?;
    write_axis_major(writer, &mesh.normals)?;

    primitive::write_f32_array(writer, header.require_float_list("ConvexCurvatureColor")?)?;
    primitive::write_f32_array(writer, header.require_float_list("ConcaveCurvatureColor")?)?;
    primitive::write_i32_array(writer, &mesh.color_indices)?;

    for list in &mesh.neighbors {
        primitive::write_i32(writer, list.len() as i32)?;
        primitive::write_i32_array(writer, list)?;
    }

    for corner in &mesh.triangles {
        primitive::write_i32(writer, *corner)?;
    }

    primitive::write_i32(writer, mesh.strip_sequence.len() as i32)?;
    primitive::write_i32_array(writer, &mesh.strip_sequence)?;
    primitive::write_cstring(writer, header.require_str("NameOfMtcFile")?)
}

pub fn write<P: AsRef<Path>>(path: P, header: &Header, mesh: &SurfaceMesh) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_to(&mut writer, header, mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    // A tetrahedron: 4 vertices, 4 faces, every vertex adjacent to the rest.
    fn sample() -> (Header, SurfaceMesh) {
        let mut header = Header::new();
        header.set_float("FileVersion", 4.0);
        header.set_int("Reserved", 0);
        header.set_int("NrVertices", 4);
        header.set_int("NrTriangles", 4);
        header.set_float("MeshCenterX", 128.0);
        header.set_float("MeshCenterY", 128.0);
        header.set_float("MeshCenterZ", 128.0);
        header.set(
            "ConvexCurvatureColor",
            FieldValue::FloatList(vec![0.322, 0.733, 0.98, 1.0]),
        );
        header.set(
            "ConcaveCurvatureColor",
            FieldValue::FloatList(vec![0.1, 0.24, 0.32, 1.0]),
        );
        header.set_int("NrOfTriangleStripElements", 0);
        header.set_str("NameOfMtcFile", "");

        let vertices = Array2::from_shape_vec(
            (4, 3),
            vec![
                0.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, //
                0.0, 0.0, 1.0,
            ],
        )
        .unwrap();
        let normals = vertices.map(|v| -v);
        let mesh = SurfaceMesh {
            vertices,
            normals,
            color_indices: vec![0, 0, 1, 1_056_964_610],
            neighbors: vec![vec![1, 2, 3], vec![0, 2, 3], vec![0, 1, 3], vec![0, 1, 2]],
            triangles: Array2::from_shape_vec(
                (4, 3),
                vec![0, 1, 2, 0, 1, 3, 0, 2, 3, 1, 2, 3],
            )
            .unwrap(),
            strip_sequence: Vec::new(),
        };
        (header, mesh)
    }

    #[test]
    fn roundtrip() {
        let (header, mesh) = sample();
        let mut bytes = Vec::new();
        write_to(&mut bytes, &header, &mesh).unwrap();
        let (back_header, back_mesh) = read_from(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(back_header, header);
        assert_eq!(back_mesh, mesh);
    }

    #[test]
    fn coordinates_are_axis_major_on_disk() {
        let (header, mesh) = sample();
        let mut bytes = Vec::new();
        write_to(&mut bytes, &header, &mesh).unwrap();
        // After the 28-byte fixed header come the 4 X coordinates.
        let xs: Vec<f32> = bytes[28..44]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(xs, vec![0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn neighbor_section_consumes_count_plus_indices() {
        let (header, mesh) = sample();
        let mut bytes = Vec::new();
        write_to(&mut bytes, &header, &mesh).unwrap();
        let fixed = 28; // scalar header
        let geometry = 4 * 3 * 4 * 2; // coords + normals
        let colors = 4 * 4 * 2; // curvature RGBA pairs
        let indices = 4 * 4; // per-vertex color indices
        let neighbor_ints: usize = 4 + mesh.neighbors.iter().map(Vec::len).sum::<usize>();
        let triangles = 4 * 3 * 4;
        let strip = 4; // length field only
        let name = 1; // empty string terminator
        assert_eq!(
            bytes.len(),
            fixed + geometry + colors + indices + neighbor_ints * 4 + triangles + strip + name
        );
    }

    #[test]
    fn truncated_neighbor_list_is_reported() {
        let (header, mesh) = sample();
        let mut bytes = Vec::new();
        write_to(&mut bytes, &header, &mesh).unwrap();
        bytes.truncate(bytes.len() - 40);
        assert!(matches!(
            read_from(&mut Cursor::new(&bytes)),
            Err(Error::TruncatedInput)
        ));
    }
}
