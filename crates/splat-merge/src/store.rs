use splat_ply::{PointSet, Schema, SchemaDiff};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Schema does not match the accumulated records, {0}")]
pub struct SchemaMismatch(pub SchemaDiff);

/// Accumulates records from successive point sets that share one schema.
#[derive(Debug, Default)]
pub enum RecordStore {
    #[default]
    Empty,
    Established { schema: Schema, points: PointSet },
}

impl RecordStore {
    pub fn new() -> Self {
        Self::Empty
    }

    /// Append all records of `points` after the records already held.
    ///
    /// The first append fixes the schema. Later appends must match it exactly.
    pub fn append(&mut self, schema: Schema, points: PointSet) -> Result<(), SchemaMismatch> {
        match self {
            Self::Empty => {
                *self = Self::Established { schema, points };
            }
            Self::Established {
                schema: established,
                points: held,
            } => {
                if let Some(diff) = established.diff(&schema) {
                    return Err(SchemaMismatch(diff));
                }
                held.append(points);
            }
        }
        Ok(())
    }

    pub fn schema(&self) -> Option<&Schema> {
        match self {
            Self::Empty => None,
            Self::Established { schema, .. } => Some(schema),
        }
    }

    /// Total number of records held.
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Established { points, .. } => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hand the accumulated records to the writer. `None` if nothing was ever appended.
    pub fn finish(self) -> Option<(Schema, PointSet)> {
        match self {
            Self::Empty => None,
            Self::Established { schema, points } => Some((schema, points)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splat_ply::{Property, SchemaOptions, ShDegree};

    fn schema(degree: u32, radius: bool) -> Schema {
        Schema::for_degree(
            ShDegree::new(degree).unwrap(),
            SchemaOptions {
                normals: false,
                radius,
            },
        )
    }

    fn points(schema: &Schema, count: usize, fill: u8) -> PointSet {
        PointSet::from_bytes(vec![fill; count * schema.record_size()], schema.record_size())
            .unwrap()
    }

    #[test]
    fn test_first_append_establishes_schema() {
        let mut store = RecordStore::new();
        assert!(store.schema().is_none());
        assert!(store.is_empty());

        let s = schema(3, false);
        store.append(s.clone(), points(&s, 4, 1)).unwrap();
        assert_eq!(store.schema(), Some(&s));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_append_is_ordered() {
        let s = schema(2, true);
        let mut store = RecordStore::new();
        store.append(s.clone(), points(&s, 2, 1)).unwrap();
        store.append(s.clone(), points(&s, 0, 9)).unwrap();
        store.append(s.clone(), points(&s, 3, 2)).unwrap();
        assert_eq!(store.len(), 5);

        let (schema, merged) = store.finish().unwrap();
        assert_eq!(schema, s);
        let firsts: Vec<u8> = merged.records().map(|r| r[0]).collect();
        assert_eq!(firsts, vec![1, 1, 2, 2, 2]);
    }

    #[test]
    fn test_mismatch_leaves_store_untouched() {
        let d3 = schema(3, false);
        let d1 = schema(1, false);
        let mut store = RecordStore::new();
        store.append(d3.clone(), points(&d3, 2, 1)).unwrap();

        let err = store.append(d1.clone(), points(&d1, 5, 2)).unwrap_err();
        assert_eq!(err.0.index, 15);
        assert_eq!(err.0.found, Some(Property::Opacity));
        assert_eq!(store.len(), 2);

        let radius = schema(3, true);
        let err = store.append(radius.clone(), points(&radius, 1, 3)).unwrap_err();
        assert_eq!(err.0.found, Some(Property::Radius));
        assert_eq!(err.0.expected, None);
    }

    #[test]
    fn test_finish_empty() {
        assert!(RecordStore::new().finish().is_none());
    }
}
