use bytes::Bytes;
use feather_core::*;

fn one_column_frame(writer: FeatherWriter<Vec<u8>>) -> DataFrame {
    DataFrame::from_bytes(Bytes::from(writer.finish().unwrap()), Basis::Zero).unwrap()
}

fn int_frame(values: Vec<i32>) -> DataFrame {
    let mut writer = FeatherWriter::new(Vec::new(), WriteMode::Eager);
    writer.add_column("n", values).unwrap();
    one_column_frame(writer)
}

#[test]
fn test_widening_always_succeeds() {
    let frame = int_frame(vec![-7, 1000]);
    assert_eq!(frame.get::<i64>(0, 0).unwrap(), -7);
    assert_eq!(frame.get::<f64>(1, 0).unwrap(), 1000.0);
    assert_eq!(frame.get::<f32>(0, 0).unwrap(), -7.0);
}

#[test]
fn test_narrowing_is_per_value() {
    let frame = int_frame(vec![100, 1000]);
    // same column, same target: one row fits, the other doesn't
    assert_eq!(frame.get::<i8>(0, 0).unwrap(), 100);
    assert!(matches!(
        frame.get::<i8>(1, 0),
        Err(FeatherError::LossyConversion(_))
    ));
    assert_eq!(frame.get::<u16>(1, 0).unwrap(), 1000);
}

#[test]
fn test_signedness_is_value_level() {
    let frame = int_frame(vec![-1, 5]);
    assert!(matches!(
        frame.get::<u64>(0, 0),
        Err(FeatherError::LossyConversion(_))
    ));
    assert_eq!(frame.get::<u64>(1, 0).unwrap(), 5);
}

#[test]
fn test_float_to_int_fails_at_bind() {
    let mut writer = FeatherWriter::new(Vec::new(), WriteMode::Eager);
    writer.add_column("f", vec![1.0_f64, 2.0]).unwrap();
    let frame = one_column_frame(writer);
    // even an integral float never narrows; the cast fails before any row
    assert!(matches!(
        frame.column(0).unwrap().cast::<i64>(),
        Err(FeatherError::LossyConversion(_))
    ));
    assert_eq!(frame.get::<f32>(0, 0).unwrap(), 1.0);
}

#[test]
fn test_bool_reads_as_numeric_but_not_string() {
    let mut writer = FeatherWriter::new(Vec::new(), WriteMode::Eager);
    writer.add_column("b", vec![true, false]).unwrap();
    let frame = one_column_frame(writer);
    assert_eq!(frame.get::<i32>(0, 0).unwrap(), 1);
    assert_eq!(frame.get::<f64>(1, 0).unwrap(), 0.0);
    assert!(matches!(
        frame.get::<String>(0, 0),
        Err(FeatherError::UnsupportedCoercion(_))
    ));
    // and nothing numeric reads as bool
    let ints = int_frame(vec![1]);
    assert!(matches!(
        ints.get::<bool>(0, 0),
        Err(FeatherError::UnsupportedCoercion(_))
    ));
}

#[test]
fn test_strings_as_bytes() {
    let mut writer = FeatherWriter::new(Vec::new(), WriteMode::Eager);
    writer.add_column("s", vec!["ab"]).unwrap();
    let frame = one_column_frame(writer);
    assert_eq!(frame.get::<Bytes>(0, 0).unwrap(), Bytes::from_static(b"ab"));
    // the reverse is not offered: arbitrary bytes are not a string
    let mut writer = FeatherWriter::new(Vec::new(), WriteMode::Eager);
    writer
        .add_column("b", vec![Bytes::from_static(&[0xFF])])
        .unwrap();
    let frame = one_column_frame(writer);
    assert!(matches!(
        frame.get::<String>(0, 0),
        Err(FeatherError::UnsupportedCoercion(_))
    ));
}

#[test]
fn test_null_rejection_names_the_row() {
    let mut writer = FeatherWriter::new(Vec::new(), WriteMode::Eager);
    writer
        .add_column("n", vec![Some(1_i32), None])
        .unwrap();
    let frame = one_column_frame(writer);
    let err = frame.get::<i32>(1, 0).unwrap_err();
    match err {
        FeatherError::NullNotAllowed(msg) => {
            assert!(msg.contains("'n'"));
            assert!(msg.contains("row 1"));
        }
        other => panic!("expected NullNotAllowed, got {:?}", other),
    }
}

#[test]
fn test_option_of_everything() {
    let mut writer = FeatherWriter::new(Vec::new(), WriteMode::Eager);
    writer
        .add_column("n", vec![Some(3_i16), None])
        .unwrap();
    let frame = one_column_frame(writer);
    // Option wraps any coercible target, including widened ones
    assert_eq!(frame.get::<Option<i64>>(0, 0).unwrap(), Some(3));
    assert_eq!(frame.get::<Option<i64>>(1, 0).unwrap(), None);
    assert_eq!(frame.get::<Option<f32>>(0, 0).unwrap(), Some(3.0));
    // the null row still fails value-level checks only when non-null
    assert_eq!(frame.get::<Option<i8>>(1, 0).unwrap(), None);
}
