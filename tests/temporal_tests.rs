use bytes::Bytes;
use feather_core::*;
use jiff::civil::date;
use jiff::{SignedDuration, Timestamp};

fn frame_from(writer: FeatherWriter<Vec<u8>>) -> DataFrame {
    DataFrame::from_bytes(Bytes::from(writer.finish().unwrap()), Basis::Zero).unwrap()
}

#[test]
fn test_timestamp_roundtrip_microseconds() {
    let instants = vec![
        Timestamp::UNIX_EPOCH,
        Timestamp::from_microsecond(1_234_567_890_123_456).unwrap(),
        Timestamp::from_microsecond(-456).unwrap(),
    ];
    let mut writer = FeatherWriter::new(Vec::new(), WriteMode::Eager);
    writer.add_column("at", instants.clone()).unwrap();
    let frame = frame_from(writer);

    match frame.column(0).unwrap().annotation() {
        Annotation::Timestamp { unit } => assert_eq!(*unit, TimeUnit::Microsecond),
        other => panic!("expected timestamp, got {:?}", other),
    }
    for (i, expected) in instants.iter().enumerate() {
        assert_eq!(frame.get::<Timestamp>(i, 0).unwrap(), *expected);
        assert_eq!(frame.value(i, 0).unwrap(), FeatherValue::Timestamp(*expected));
    }
}

#[test]
fn test_timestamp_as_zoned_is_utc() {
    let ts = Timestamp::from_second(1_600_000_000).unwrap();
    let mut writer = FeatherWriter::new(Vec::new(), WriteMode::Eager);
    writer.add_column("at", vec![ts]).unwrap();
    let frame = frame_from(writer);

    let zoned = frame.get::<jiff::Zoned>(0, 0).unwrap();
    assert_eq!(zoned.timestamp(), ts);
    assert_eq!(zoned.offset().seconds(), 0);
}

#[test]
fn test_date_roundtrip_including_pre_epoch() {
    let days = vec![date(1970, 1, 1), date(2020, 2, 29), date(1969, 12, 31)];
    let mut writer = FeatherWriter::new(Vec::new(), WriteMode::Eager);
    writer.add_column("day", days.clone()).unwrap();
    let frame = frame_from(writer);

    assert_eq!(frame.column(0).unwrap().annotation(), &Annotation::Date);
    assert_eq!(frame.column(0).unwrap().wire_type(), WireType::Int32);
    for (i, expected) in days.iter().enumerate() {
        assert_eq!(frame.get::<jiff::civil::Date>(i, 0).unwrap(), *expected);
    }
    // a date also reads as the midnight UTC instant of that day
    assert_eq!(
        frame.get::<Timestamp>(2, 0).unwrap(),
        Timestamp::from_second(-86_400).unwrap()
    );
}

#[test]
fn test_time_of_day_roundtrip() {
    let times = vec![
        SignedDuration::ZERO,
        SignedDuration::from_micros(12 * 3_600_000_000 + 345),
    ];
    let mut writer = FeatherWriter::new(Vec::new(), WriteMode::Eager);
    writer.add_column("tod", times.clone()).unwrap();
    let frame = frame_from(writer);

    match frame.column(0).unwrap().annotation() {
        Annotation::Time { unit } => assert_eq!(*unit, TimeUnit::Microsecond),
        other => panic!("expected time, got {:?}", other),
    }
    for (i, expected) in times.iter().enumerate() {
        assert_eq!(frame.get::<SignedDuration>(i, 0).unwrap(), *expected);
    }
}

#[test]
fn test_temporal_types_do_not_cross() {
    let mut writer = FeatherWriter::new(Vec::new(), WriteMode::Eager);
    writer
        .add_column("at", vec![Timestamp::UNIX_EPOCH])
        .unwrap();
    writer.add_column("tod", vec![SignedDuration::ZERO]).unwrap();
    let frame = frame_from(writer);

    // a timestamp is not a civil date or a duration
    assert!(frame.get::<jiff::civil::Date>(0, 0).is_err());
    assert!(frame.get::<SignedDuration>(0, 0).is_err());
    // a time of day is neither a timestamp nor a date
    assert!(frame.get::<Timestamp>(0, 1).is_err());
    assert!(frame.get::<jiff::civil::Date>(0, 1).is_err());
    // but the raw epoch integers stay reachable
    assert_eq!(frame.get::<i64>(0, 0).unwrap(), 0);
}

#[test]
fn test_nullable_temporal_columns() {
    let mut writer = FeatherWriter::new(Vec::new(), WriteMode::Eager);
    writer
        .add_column("day", vec![Some(date(2021, 6, 1)), None])
        .unwrap();
    let frame = frame_from(writer);
    assert_eq!(
        frame.get::<Option<jiff::civil::Date>>(0, 0).unwrap(),
        Some(date(2021, 6, 1))
    );
    assert_eq!(frame.get::<Option<jiff::civil::Date>>(1, 0).unwrap(), None);
    assert_eq!(frame.value(1, 0).unwrap(), FeatherValue::Null);
}
