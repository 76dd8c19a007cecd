//! Test utilities for feather-core

#[cfg(test)]
pub mod test {
    use crate::{Basis, DataFrame, FeatherValue, FeatherWriter, WriteMode};
    use bytes::Bytes;
    use std::sync::Arc;

    /// Write a small mixed-type table and decode it again
    pub fn sample_frame(basis: Basis) -> DataFrame {
        let mut writer = FeatherWriter::new(Vec::new(), WriteMode::Eager);
        writer
            .add_column("id", vec![1_i64, 2, 3, 4])
            .unwrap();
        writer
            .add_column("name", vec![Some("ada"), Some("bo"), None, Some("cy")])
            .unwrap();
        writer
            .add_column("score", vec![0.25_f64, 0.5, 0.75, 1.0])
            .unwrap();
        writer
            .add_values(
                "kind",
                vec![
                    FeatherValue::Enum(Arc::from("lo")),
                    FeatherValue::Enum(Arc::from("hi")),
                    FeatherValue::Enum(Arc::from("hi")),
                    FeatherValue::Enum(Arc::from("lo")),
                ],
            )
            .unwrap();
        let bytes = Bytes::from(writer.finish().unwrap());
        DataFrame::from_bytes(bytes, basis).unwrap()
    }

    #[test]
    fn test_sample_frame_shape() {
        let frame = sample_frame(Basis::Zero);
        assert_eq!(frame.row_count(), 4);
        assert_eq!(frame.column_count(), 4);
        assert_eq!(frame.column(3).unwrap().name(), "kind");
    }
}
