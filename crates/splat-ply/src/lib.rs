pub mod point_set;
pub mod read;
pub mod schema;
pub mod write;

pub use point_set::PointSet;
pub use read::{PlyHeader, ReadError, open, open_with_header, read_ply};
pub use schema::{
    MAX_SH_DEGREE, Property, Schema, SchemaDiff, SchemaError, SchemaOptions, ShDegree,
    sh_coeffs_for_degree,
};
pub use write::{DEFAULT_FILE_NAME, WriteError, resolve_output_path, write, write_file, write_ply};

/// Encoding tag of the only body layout this crate reads and writes.
pub const BINARY_LITTLE_ENDIAN: &str = "binary_little_endian";
/// Marker line closing the textual header.
pub const END_HEADER: &str = "end_header";
/// Name of the element holding one record per splat.
pub const VERTEX_ELEMENT: &str = "vertex";
