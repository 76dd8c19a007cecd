use bytes::Bytes;
use feather_core::*;
use std::sync::Arc;

fn sample_bytes() -> Bytes {
    let mut writer = FeatherWriter::new(Vec::new(), WriteMode::Eager);
    writer.add_column("id", vec![10_i32, 20, 30]).unwrap();
    writer
        .add_column("who", vec![Some("ann"), None, Some("cruz")])
        .unwrap();
    writer
        .add_values(
            "kind",
            vec![
                FeatherValue::Enum(Arc::from("cat")),
                FeatherValue::Enum(Arc::from("dog")),
                FeatherValue::Enum(Arc::from("cat")),
            ],
        )
        .unwrap();
    Bytes::from(writer.finish().unwrap())
}

#[test]
fn test_untyped_access() {
    let frame = DataFrame::from_bytes(sample_bytes(), Basis::Zero).unwrap();
    assert_eq!(frame.value(0, 0).unwrap(), FeatherValue::Int32(10));
    assert_eq!(frame.value(1, 1).unwrap(), FeatherValue::Null);
    assert_eq!(
        frame.value(2, 1).unwrap(),
        FeatherValue::String(Arc::from("cruz"))
    );
    // a category cell's natural value is its code
    assert_eq!(frame.value(1, 2).unwrap(), FeatherValue::Int32(1));
    assert_eq!(frame.value_by_name(0, "kind").unwrap(), FeatherValue::Int32(0));
}

#[test]
fn test_basis_shifts_every_index() {
    let zero = DataFrame::from_bytes(sample_bytes(), Basis::Zero).unwrap();
    let one = DataFrame::from_bytes(sample_bytes(), Basis::One).unwrap();

    for row in 0..3 {
        for col in 0..3 {
            assert_eq!(
                zero.value(row, col).unwrap(),
                one.value(row + 1, col + 1).unwrap()
            );
        }
    }

    assert!(one.value(0, 1).is_err());
    assert!(one.value(4, 1).is_err());
    assert!(one.column(0).is_err());
    assert!(one.column(4).is_err());
    assert_eq!(one.column(3).unwrap().name(), "kind");
    // name lookup reports a position under the frame's basis
    assert_eq!(one.column_by_name("id").unwrap().position(), 1);
    assert_eq!(zero.column_by_name("id").unwrap().position(), 0);
}

#[test]
fn test_column_views() {
    let frame = DataFrame::from_bytes(sample_bytes(), Basis::Zero).unwrap();
    let names: Vec<&str> = frame.columns().map(|c| c.name()).collect();
    assert_eq!(names, ["id", "who", "kind"]);

    let who = frame.column(1).unwrap();
    assert_eq!(who.len(), 3);
    assert_eq!(who.null_count(), 1);
    assert!(who.is_null(1).unwrap());
    assert!(!who.is_null(0).unwrap());
    assert!(who.is_null(3).is_err());

    let kind = frame.column_by_name("kind").unwrap();
    assert!(kind.annotation().is_category());
    assert_eq!(kind.wire_type(), WireType::Int32);
}

#[test]
fn test_lazy_iteration() {
    let frame = DataFrame::from_bytes(sample_bytes(), Basis::One).unwrap();
    let id = frame.column(1).unwrap();

    let natural: Vec<FeatherValue> = id.iter().map(|v| v.unwrap()).collect();
    assert_eq!(
        natural,
        [
            FeatherValue::Int32(10),
            FeatherValue::Int32(20),
            FeatherValue::Int32(30)
        ]
    );

    let doubled: Vec<i64> = id
        .cast::<i64>()
        .unwrap()
        .map(|v| v.unwrap() * 2)
        .collect();
    assert_eq!(doubled, [20, 40, 60]);

    // category columns iterate labels when cast to strings
    let labels: Vec<String> = frame
        .column_by_name("kind")
        .unwrap()
        .cast::<String>()
        .unwrap()
        .map(|v| v.unwrap())
        .collect();
    assert_eq!(labels, ["cat", "dog", "cat"]);
}

#[test]
fn test_integer_and_category_end_to_end() {
    let mut writer = FeatherWriter::new(Vec::new(), WriteMode::Eager);
    writer
        .add_column("Integer", vec![-1_i32, 0, 1, 2, 3])
        .unwrap();
    let labels = ["A", "A", "B", "B", "C"];
    writer
        .add_values(
            "Category",
            labels.iter().map(|l| FeatherValue::Enum(Arc::from(*l))),
        )
        .unwrap();
    let frame =
        DataFrame::from_bytes(Bytes::from(writer.finish().unwrap()), Basis::Zero).unwrap();

    assert_eq!(frame.get_by_name::<i32>(2, "Integer").unwrap(), 1);
    for (row, label) in labels.iter().enumerate() {
        assert_eq!(frame.get_by_name::<String>(row, "Category").unwrap(), *label);
    }
}

#[test]
fn test_empty_frame() {
    let writer = FeatherWriter::new(Vec::new(), WriteMode::Eager);
    let bytes = Bytes::from(writer.finish().unwrap());
    let frame = DataFrame::from_bytes(bytes, Basis::Zero).unwrap();
    assert_eq!(frame.row_count(), 0);
    assert_eq!(frame.column_count(), 0);
    assert!(frame.column(0).is_err());
    assert!(frame.column_by_name("x").is_none());
}
