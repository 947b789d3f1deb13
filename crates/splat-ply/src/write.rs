use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::point_set::PointSet;
use crate::read::PlyHeader;
use crate::schema::Schema;
use crate::{BINARY_LITTLE_ENDIAN, END_HEADER, VERTEX_ELEMENT};

/// File name used when the output path names a directory.
pub const DEFAULT_FILE_NAME: &str = "point_cloud.ply";

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Records are {records} bytes wide but the schema describes {schema} bytes")]
    RecordSize { schema: usize, records: usize },
}

impl PlyHeader {
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "ply")?;
        writeln!(writer, "format {BINARY_LITTLE_ENDIAN} 1.0")?;
        for comment in &self.comments {
            // A newline would end the comment early and corrupt the header.
            writeln!(writer, "comment {}", comment.replace(['\n', '\r'], " "))?;
        }
        writeln!(writer, "element {VERTEX_ELEMENT} {}", self.count)?;
        for prop in self.schema.properties() {
            writeln!(writer, "property float {prop}")?;
        }
        writeln!(writer, "{END_HEADER}")
    }
}

/// Write a header and the records verbatim.
pub fn write_ply<W: Write>(
    mut writer: W,
    schema: &Schema,
    points: &PointSet,
    comments: &[String],
) -> Result<(), WriteError> {
    if points.record_size() != schema.record_size() {
        return Err(WriteError::RecordSize {
            schema: schema.record_size(),
            records: points.record_size(),
        });
    }

    let header = PlyHeader {
        schema: schema.clone(),
        count: points.len(),
        comments: comments.to_vec(),
    };

    let io_err = |source| WriteError::Io {
        path: PathBuf::new(),
        source,
    };
    header.write_to(&mut writer).map_err(io_err)?;
    writer.write_all(points.as_bytes()).map_err(io_err)?;
    writer.flush().map_err(io_err)
}

/// Paths that are a directory, or that don't end in `.ply`, get [`DEFAULT_FILE_NAME`] appended.
pub fn resolve_output_path(path: &Path) -> PathBuf {
    let is_ply = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ply"));
    if path.is_dir() || !is_ply {
        path.join(DEFAULT_FILE_NAME)
    } else {
        path.to_owned()
    }
}

/// Write `points` to `path` after [`resolve_output_path`], returning the path written.
pub fn write(
    path: &Path,
    schema: &Schema,
    points: &PointSet,
    comments: &[String],
) -> Result<PathBuf, WriteError> {
    let path = resolve_output_path(path);
    write_file(&path, schema, points, comments)?;
    Ok(path)
}

/// Write `points` to exactly `path`, creating missing parent directories.
///
/// An existing file is overwritten in place. A failure midway can leave a partial file.
pub fn write_file(
    path: &Path,
    schema: &Schema,
    points: &PointSet,
    comments: &[String],
) -> Result<(), WriteError> {
    let with_path = |source| WriteError::Io {
        path: path.to_owned(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(with_path)?;
    }
    let file = File::create(path).map_err(with_path)?;

    write_ply(BufWriter::new(file), schema, points, comments).map_err(|e| match e {
        WriteError::Io { source, .. } => with_path(source),
        e @ WriteError::RecordSize { .. } => e,
    })
}
