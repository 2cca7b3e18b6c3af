//! Helpers over the tabular result currency (`Vec<RecordBatch>`)

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

/// Total number of rows across all batches.
pub fn row_count(batches: &[RecordBatch]) -> usize {
    batches.iter().map(|batch| batch.num_rows()).sum()
}

/// A result with zero rows. Zero batches counts as empty, as do batches
/// that all carry zero rows.
pub fn is_empty(batches: &[RecordBatch]) -> bool {
    row_count(batches) == 0
}

/// Schema of the result, if it has at least one batch.
pub fn schema(batches: &[RecordBatch]) -> Option<SchemaRef> {
    batches.first().map(|batch| batch.schema())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int64Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn batch(values: Vec<i64>) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int64, false)]));
        RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(values))]).unwrap()
    }

    #[test]
    fn test_row_count() {
        assert_eq!(row_count(&[]), 0);
        assert_eq!(row_count(&[batch(vec![1, 2, 3])]), 3);
        assert_eq!(row_count(&[batch(vec![1]), batch(vec![2, 3])]), 3);
    }

    #[test]
    fn test_is_empty() {
        assert!(is_empty(&[]));
        assert!(is_empty(&[batch(vec![])]));
        assert!(!is_empty(&[batch(vec![42])]));
    }

    #[test]
    fn test_schema() {
        assert!(schema(&[]).is_none());
        let s = schema(&[batch(vec![1])]).unwrap();
        assert_eq!(s.field(0).name(), "id");
    }
}
