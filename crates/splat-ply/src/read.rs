use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::point_set::PointSet;
use crate::schema::{Property, Schema};
use crate::{BINARY_LITTLE_ENDIAN, END_HEADER, VERTEX_ELEMENT};

// Total header bytes we are willing to buffer before giving up on a file.
const MAX_HEADER_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error while reading ply file.")]
    Io(#[from] io::Error),

    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Malformed header at line {line}: {reason}")]
    MalformedHeader { line: usize, reason: String },

    #[error("Unknown property '{name}' at header line {line}")]
    UnknownProperty { line: usize, name: String },

    #[error("Truncated body: expected {expected} bytes, only {available} available")]
    TruncatedBody { expected: u64, available: u64 },
}

fn malformed(line: usize, reason: impl Into<String>) -> ReadError {
    ReadError::MalformedHeader {
        line,
        reason: reason.into(),
    }
}

/// Parsed header of a binary splat ply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlyHeader {
    pub schema: Schema,
    pub count: usize,
    pub comments: Vec<String>,
}

impl PlyHeader {
    /// Exact byte length of the body this header announces.
    pub fn body_len(&self) -> Option<u64> {
        (self.count as u64).checked_mul(self.schema.record_size() as u64)
    }

    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<Self, ReadError> {
        let mut lines = HeaderLines::new(reader);

        match lines.next_line()? {
            Some((_, magic)) if magic == "ply" => {}
            Some((n, _)) => return Err(malformed(n, "missing 'ply' magic")),
            None => return Err(malformed(0, "empty file")),
        }

        let mut has_format = false;
        let mut vertex: Option<(usize, Vec<Property>)> = None;
        let mut comments = Vec::new();

        loop {
            let Some((n, line)) = lines.next_line()? else {
                return Err(malformed(lines.line, format!("missing '{END_HEADER}'")));
            };

            let (keyword, rest) = line.split_once(' ').unwrap_or((line.as_str(), ""));
            match keyword {
                END_HEADER => break,
                "comment" | "obj_info" => comments.push(rest.to_owned()),
                "format" => {
                    if has_format {
                        return Err(malformed(n, "duplicate format line"));
                    }
                    let mut parts = rest.split_ascii_whitespace();
                    let (Some(enc), Some(version), None) =
                        (parts.next(), parts.next(), parts.next())
                    else {
                        return Err(malformed(n, format!("invalid format line '{line}'")));
                    };
                    if enc != BINARY_LITTLE_ENDIAN {
                        return Err(ReadError::UnsupportedEncoding(enc.to_owned()));
                    }
                    if version != "1.0" {
                        return Err(malformed(n, format!("unsupported ply version {version}")));
                    }
                    has_format = true;
                }
                "element" => {
                    let mut parts = rest.split_ascii_whitespace();
                    let (Some(name), Some(count), None) = (parts.next(), parts.next(), parts.next())
                    else {
                        return Err(malformed(n, format!("invalid element line '{line}'")));
                    };
                    if name != VERTEX_ELEMENT {
                        return Err(malformed(n, format!("unsupported element '{name}'")));
                    }
                    if vertex.is_some() {
                        return Err(malformed(n, "duplicate vertex element"));
                    }
                    let count = count
                        .parse::<usize>()
                        .map_err(|_e| malformed(n, format!("invalid record count '{count}'")))?;
                    vertex = Some((count, Vec::new()));
                }
                "property" => {
                    let Some((_, properties)) = vertex.as_mut() else {
                        return Err(malformed(n, "property declared before any element"));
                    };
                    let mut parts = rest.split_ascii_whitespace();
                    let (Some(ty), Some(name)) = (parts.next(), parts.next()) else {
                        return Err(malformed(n, format!("invalid property line '{line}'")));
                    };
                    if ty == "list" {
                        return Err(ReadError::UnsupportedEncoding(format!(
                            "list property '{line}'"
                        )));
                    }
                    if parts.next().is_some() {
                        return Err(malformed(n, format!("invalid property line '{line}'")));
                    }
                    if !matches!(ty, "float" | "float32") {
                        return Err(ReadError::UnsupportedEncoding(format!(
                            "property '{name}' has type {ty}, only float32 is supported"
                        )));
                    }
                    let prop = Property::from_name(name).ok_or_else(|| {
                        ReadError::UnknownProperty {
                            line: n,
                            name: name.to_owned(),
                        }
                    })?;
                    if properties.contains(&prop) {
                        return Err(malformed(n, format!("duplicate property '{name}'")));
                    }
                    properties.push(prop);
                }
                other => return Err(malformed(n, format!("unknown keyword '{other}'"))),
            }
        }

        if !has_format {
            return Err(malformed(lines.line, "missing format line"));
        }
        let Some((count, properties)) = vertex else {
            return Err(malformed(lines.line, "missing vertex element"));
        };
        if properties.is_empty() {
            return Err(malformed(lines.line, "vertex element declares no properties"));
        }

        Ok(Self {
            schema: Schema::from_properties(properties),
            count,
            comments,
        })
    }
}

struct HeaderLines<'a, R> {
    reader: &'a mut R,
    buf: Vec<u8>,
    line: usize,
    remaining: u64,
}

impl<'a, R: BufRead> HeaderLines<'a, R> {
    fn new(reader: &'a mut R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line: 0,
            remaining: MAX_HEADER_SIZE,
        }
    }

    fn next_line(&mut self) -> Result<Option<(usize, String)>, ReadError> {
        self.buf.clear();
        let read = self
            .reader
            .by_ref()
            .take(self.remaining)
            .read_until(b'\n', &mut self.buf)?;
        self.remaining -= read as u64;
        if self.remaining == 0 && self.buf.last() != Some(&b'\n') {
            return Err(malformed(self.line + 1, "header exceeds 1 MiB"));
        }
        if read == 0 {
            return Ok(None);
        }
        self.line += 1;
        if self.buf.last() != Some(&b'\n') {
            return Err(malformed(self.line, "unterminated header line"));
        }
        let text = std::str::from_utf8(&self.buf)
            .map_err(|_e| malformed(self.line, "header is not valid text"))?;
        Ok(Some((self.line, text.trim().to_owned())))
    }
}

/// Parse a header and its body from a reader.
///
/// Reads exactly the announced body, anything after it is left in the reader.
pub fn read_ply<R: BufRead>(mut reader: R) -> Result<(PlyHeader, PointSet), ReadError> {
    let header = PlyHeader::read_from(&mut reader)?;
    log::debug!(
        "Parsed ply header: {} records of {} properties",
        header.count,
        header.schema.len()
    );

    let expected = header
        .body_len()
        .ok_or_else(|| malformed(0, "record count overflows the body size"))?;

    let mut data = Vec::new();
    let available = reader.by_ref().take(expected).read_to_end(&mut data)? as u64;
    if available < expected {
        return Err(ReadError::TruncatedBody {
            expected,
            available,
        });
    }

    let points = PointSet::from_bytes(data, header.schema.record_size())
        .ok_or_else(|| io::Error::other("body is not a whole number of records"))?;
    Ok((header, points))
}

/// Read a splat ply from disk. The file is closed again before returning.
pub fn open(path: &Path) -> Result<(Schema, PointSet), ReadError> {
    let (header, points) = open_with_header(path)?;
    Ok((header.schema, points))
}

pub fn open_with_header(path: &Path) -> Result<(PlyHeader, PointSet), ReadError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ReadError::NotFound(path.to_owned()),
        _ => ReadError::Io(e),
    })?;
    read_ply(BufReader::with_capacity(1024 * 32, file))
}
