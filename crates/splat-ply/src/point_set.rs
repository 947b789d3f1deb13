use std::slice::ChunksExact;

use crate::schema::PROPERTY_SIZE;

/// Raw fixed-width records, kept as the bytes found in the file body.
///
/// Fields are never decoded on the merge path, the bytes only move between buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointSet {
    data: Vec<u8>,
    record_size: usize,
}

impl PointSet {
    /// Wrap a body buffer. Returns `None` unless it holds a whole number of records.
    pub fn from_bytes(data: Vec<u8>, record_size: usize) -> Option<Self> {
        data.len()
            .is_multiple_of(record_size)
            .then_some(Self { data, record_size })
    }

    pub fn len(&self) -> usize {
        self.data.len().checked_div(self.record_size).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn record(&self, index: usize) -> Option<&[u8]> {
        let start = index.checked_mul(self.record_size)?;
        self.data.get(start..start + self.record_size)
    }

    pub fn records(&self) -> ChunksExact<'_, u8> {
        self.data.chunks_exact(self.record_size.max(1))
    }

    /// Decoded field values of one record, for inspection.
    pub fn values(&self, index: usize) -> Option<Vec<f32>> {
        let record = self.record(index)?;
        Some(
            record
                .chunks_exact(PROPERTY_SIZE)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        )
    }

    /// Move all records of `other` behind the records of `self`.
    ///
    /// Panics if the record sizes differ.
    pub fn append(&mut self, other: Self) {
        assert_eq!(
            self.record_size, other.record_size,
            "Cannot append records of a different size"
        );
        if self.data.is_empty() {
            self.data = other.data;
        } else {
            self.data.extend_from_slice(&other.data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn no_records(record_size: usize) -> PointSet {
        PointSet::from_bytes(Vec::new(), record_size).unwrap()
    }

    #[test]
    fn test_records() {
        let set = PointSet::from_bytes(floats(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]), 8).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.values(1), Some(vec![3.0, 4.0]));
        assert_eq!(set.values(3), None);
        assert_eq!(set.records().count(), 3);
        assert_eq!(set.record(2), Some(&floats(&[5.0, 6.0])[..]));
    }

    #[test]
    fn test_partial_record_rejected() {
        assert!(PointSet::from_bytes(vec![0; 7], 8).is_none());
        assert!(PointSet::from_bytes(vec![0; 4], 0).is_none());
        assert_eq!(PointSet::from_bytes(Vec::new(), 0).map(|s| s.len()), Some(0));
    }

    #[test]
    fn test_append_preserves_order() {
        let mut set = no_records(4);
        set.append(PointSet::from_bytes(floats(&[1.0, 2.0]), 4).unwrap());
        set.append(PointSet::from_bytes(floats(&[3.0]), 4).unwrap());
        set.append(no_records(4));
        assert_eq!(set.as_bytes(), floats(&[1.0, 2.0, 3.0]));
    }

    #[test]
    #[should_panic(expected = "different size")]
    fn test_append_size_mismatch() {
        let mut set = no_records(4);
        set.append(no_records(8));
    }
}
