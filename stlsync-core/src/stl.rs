/// STL file reader for binary and ASCII formats
use std::fs;
use std::path::Path;

use nom::{
    bytes::complete::{tag, take},
    character::complete::{multispace0, multispace1, not_line_ending},
    combinator::opt,
    multi::{count, many0},
    number::complete::{float, le_f32},
    sequence::{preceded, tuple},
    IResult,
};

use crate::error::StlError;
use crate::geometry::{ImportedMesh, Mesh, Triangle, Vertex};

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;

/// Read an STL file from disk into indexed geometry
pub fn read_stl(path: &Path) -> Result<ImportedMesh, StlError> {
    let data = fs::read(path).map_err(|source| StlError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_stl(&data)?.to_indexed())
}

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, StlError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(StlError::TooShort { len: data.len() });
    }

    let body = &data[HEADER_LEN..];
    let declared = u32::from_le_bytes([body[0], body[1], body[2], body[3]]) as usize;
    let available = (body.len() - 4) / TRIANGLE_LEN;
    if available < declared {
        return Err(StlError::Truncated {
            expected: declared,
            actual: available,
        });
    }

    match parse_binary_body(&body[4..], declared) {
        Ok((_, triangles)) => {
            let mut mesh = Mesh::with_capacity(triangles.len());
            for triangle in triangles {
                mesh.add_triangle(triangle);
            }
            Ok(mesh)
        }
        Err(_) => Err(StlError::Truncated {
            expected: declared,
            actual: available,
        }),
    }
}

fn parse_binary_body(input: &[u8], triangles: usize) -> IResult<&[u8], Vec<Triangle>> {
    count(parse_binary_facet, triangles)(input)
}

fn parse_binary_facet(input: &[u8]) -> IResult<&[u8], Triangle> {
    let (input, normal) = parse_binary_vector3(input)?;
    let (input, v1) = parse_binary_vector3(input)?;
    let (input, v2) = parse_binary_vector3(input)?;
    let (input, v3) = parse_binary_vector3(input)?;
    // Attribute byte count
    let (input, _) = take(2usize)(input)?;

    let vertex = |(x, y, z): (f32, f32, f32)| Vertex::new(x, y, z, normal.0, normal.1, normal.2);
    Ok((input, Triangle::new(vertex(v1), vertex(v2), vertex(v3))))
}

fn parse_binary_vector3(input: &[u8]) -> IResult<&[u8], (f32, f32, f32)> {
    tuple((le_f32, le_f32, le_f32))(input)
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, StlError> {
    match parse_ascii_stl_impl(input) {
        Ok((_, mesh)) => Ok(mesh),
        Err(e) => Err(StlError::Ascii(format!("{:?}", e))),
    }
}

fn parse_ascii_stl_impl(input: &str) -> IResult<&str, Mesh> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    // Optional solid name runs to the end of the line
    let (input, _) = opt(not_line_ending)(input)?;
    let (input, triangles) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;

    let mut mesh = Mesh::with_capacity(triangles.len());
    for triangle in triangles {
        mesh.add_triangle(triangle);
    }

    Ok((input, mesh))
}

fn parse_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, v1) = parse_vertex(input, normal)?;
    let (input, v2) = parse_vertex(input, normal)?;
    let (input, v3) = parse_vertex(input, normal)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((input, Triangle::new(v1, v2, v3)))
}

fn parse_vertex(input: &str, normal: (f32, f32, f32)) -> IResult<&str, Vertex> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    let (input, (x, y, z)) = parse_vector3(input)?;
    Ok((input, Vertex::new(x, y, z, normal.0, normal.1, normal.2)))
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, (x, y, z)))
}

/// Detect and parse STL data (binary or ASCII).
///
/// Binary files whose header happens to start with `solid` fall back to the
/// binary reader when the ASCII grammar does not match.
pub fn parse_stl(data: &[u8]) -> Result<Mesh, StlError> {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let looks_ascii = data[start..].starts_with(b"solid");
    let ascii_error = if looks_ascii {
        match std::str::from_utf8(data) {
            Ok(text) => match parse_ascii_stl(text) {
                Ok(mesh) => return Ok(mesh),
                Err(e) => Some(e),
            },
            Err(_) => None,
        }
    } else {
        None
    };

    match parse_binary_stl(data) {
        Ok(mesh) => Ok(mesh),
        Err(binary_error) => Err(ascii_error.unwrap_or(binary_error)),
    }
}
