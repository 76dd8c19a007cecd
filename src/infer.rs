//! Write-side type inference for dynamically typed columns.
//!
//! A sequence of [`FeatherValue`]s is classified into the narrowest wire
//! type that represents every element. Nulls never influence the choice;
//! they only populate the validity bitmap. Sequences that do not unify
//! into one family fall back to a UTF8 column of canonical text forms.

use crate::buffers::ColumnData;
use crate::error::{FeatherError, Result};
use crate::schema::{Annotation, TimeUnit, WireType};
use crate::value::FeatherValue;
use crate::writer::{build_validity, PendingColumn};
use indexmap::IndexSet;
use std::sync::Arc;

pub(crate) fn infer_column(name: &str, values: Vec<FeatherValue>) -> Result<PendingColumn> {
    let nulls: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_null())
        .map(|(i, _)| i)
        .collect();

    let survey = Survey::of(&values);
    let (annotation, data) = if survey.total == 0 {
        // no non-null values to classify; an all-null string column
        (
            Annotation::None,
            ColumnData::Utf8(vec![Arc::from(""); values.len()]),
        )
    } else if survey.enums == survey.total {
        build_category(&values)
    } else if survey.bools + survey.ints + survey.floats == survey.total {
        if survey.bools == survey.total {
            (
                Annotation::None,
                ColumnData::Bool(
                    values
                        .iter()
                        .map(|v| matches!(v, FeatherValue::Bool(true)))
                        .collect(),
                ),
            )
        } else if survey.floats > 0 {
            (Annotation::None, unify_floats(&values))
        } else {
            (Annotation::None, unify_ints(name, &values)?)
        }
    } else if survey.dates == survey.total {
        (
            Annotation::Date,
            ColumnData::Int32(
                collect_or_default(&values, |v| match v {
                    FeatherValue::Date(d) => Some(crate::coerce::encode_date(*d)),
                    _ => None,
                })?,
            ),
        )
    } else if survey.timestamps + survey.dates == survey.total {
        // dates widen to midnight UTC instants
        (
            Annotation::Timestamp {
                unit: TimeUnit::Microsecond,
            },
            ColumnData::Int64(
                collect_or_default(&values, |v| match v {
                    FeatherValue::Timestamp(ts) => Some(Ok(ts.as_microsecond())),
                    FeatherValue::Date(d) => Some(date_micros(*d)),
                    _ => None,
                })?,
            ),
        )
    } else if survey.times == survey.total {
        (
            Annotation::Time {
                unit: TimeUnit::Microsecond,
            },
            ColumnData::Int64(
                collect_or_default(&values, |v| match v {
                    FeatherValue::Time(t) => Some(crate::coerce::encode_time_micros(*t)),
                    _ => None,
                })?,
            ),
        )
    } else if survey.strings == survey.total {
        (
            Annotation::None,
            ColumnData::Utf8(
                values
                    .iter()
                    .map(|v| match v {
                        FeatherValue::String(s) => s.clone(),
                        _ => Arc::from(""),
                    })
                    .collect(),
            ),
        )
    } else if survey.bytes == survey.total {
        (
            Annotation::None,
            ColumnData::Binary(
                values
                    .iter()
                    .map(|v| match v {
                        FeatherValue::Bytes(b) => b.clone(),
                        _ => bytes::Bytes::new(),
                    })
                    .collect(),
            ),
        )
    } else {
        // genuinely mixed: canonical text forms
        (
            Annotation::None,
            ColumnData::Utf8(values.iter().map(canonical).collect()),
        )
    };

    Ok(PendingColumn {
        name: name.to_string(),
        annotation,
        data,
        validity: build_validity(values.len(), &nulls),
    })
}

#[derive(Default)]
struct Survey {
    bools: usize,
    ints: usize,
    floats: usize,
    strings: usize,
    bytes: usize,
    timestamps: usize,
    dates: usize,
    times: usize,
    enums: usize,
    total: usize,
}

impl Survey {
    fn of(values: &[FeatherValue]) -> Self {
        let mut s = Survey::default();
        for value in values {
            match value {
                FeatherValue::Null => continue,
                FeatherValue::Bool(_) => s.bools += 1,
                FeatherValue::Int8(_)
                | FeatherValue::Int16(_)
                | FeatherValue::Int32(_)
                | FeatherValue::Int64(_)
                | FeatherValue::UInt8(_)
                | FeatherValue::UInt16(_)
                | FeatherValue::UInt32(_)
                | FeatherValue::UInt64(_) => s.ints += 1,
                FeatherValue::Float(_) | FeatherValue::Double(_) => s.floats += 1,
                FeatherValue::String(_) => s.strings += 1,
                FeatherValue::Bytes(_) => s.bytes += 1,
                FeatherValue::Timestamp(_) => s.timestamps += 1,
                FeatherValue::Date(_) => s.dates += 1,
                FeatherValue::Time(_) => s.times += 1,
                FeatherValue::Enum(_) => s.enums += 1,
            }
            s.total += 1;
        }
        s
    }
}

/// Integer form of a numeric value, with BOOL as 0/1
fn as_int(value: &FeatherValue) -> Option<i128> {
    Some(match value {
        FeatherValue::Bool(b) => *b as i128,
        FeatherValue::Int8(i) => *i as i128,
        FeatherValue::Int16(i) => *i as i128,
        FeatherValue::Int32(i) => *i as i128,
        FeatherValue::Int64(i) => *i as i128,
        FeatherValue::UInt8(i) => *i as i128,
        FeatherValue::UInt16(i) => *i as i128,
        FeatherValue::UInt32(i) => *i as i128,
        FeatherValue::UInt64(i) => *i as i128,
        _ => return None,
    })
}

fn as_float(value: &FeatherValue) -> Option<f64> {
    match value {
        FeatherValue::Float(f) => Some(f.into_inner() as f64),
        FeatherValue::Double(f) => Some(f.into_inner()),
        other => as_int(other).map(|i| i as f64),
    }
}

/// Narrowest integer wire type whose range covers `[min, max]`, trying
/// signed before unsigned at each width.
fn narrowest_int(min: i128, max: i128) -> Option<WireType> {
    const CANDIDATES: &[(WireType, i128, i128)] = &[
        (WireType::Int8, i8::MIN as i128, i8::MAX as i128),
        (WireType::UInt8, 0, u8::MAX as i128),
        (WireType::Int16, i16::MIN as i128, i16::MAX as i128),
        (WireType::UInt16, 0, u16::MAX as i128),
        (WireType::Int32, i32::MIN as i128, i32::MAX as i128),
        (WireType::UInt32, 0, u32::MAX as i128),
        (WireType::Int64, i64::MIN as i128, i64::MAX as i128),
        (WireType::UInt64, 0, u64::MAX as i128),
    ];
    CANDIDATES
        .iter()
        .find(|(_, lo, hi)| min >= *lo && max <= *hi)
        .map(|(wire, _, _)| *wire)
}

fn unify_ints(name: &str, values: &[FeatherValue]) -> Result<ColumnData> {
    let mut min = i128::MAX;
    let mut max = i128::MIN;
    for value in values {
        if let Some(i) = as_int(value) {
            min = min.min(i);
            max = max.max(i);
        }
    }
    let wire = narrowest_int(min, max).ok_or_else(|| {
        FeatherError::invalid_argument(format!(
            "integer values in column '{}' exceed the representable range",
            name
        ))
    })?;
    fn ints(values: &[FeatherValue]) -> impl Iterator<Item = i128> + '_ {
        values.iter().map(|v| as_int(v).unwrap_or(0))
    }
    Ok(match wire {
        WireType::Int8 => ColumnData::Int8(ints(values).map(|i| i as i8).collect()),
        WireType::UInt8 => ColumnData::UInt8(ints(values).map(|i| i as u8).collect()),
        WireType::Int16 => ColumnData::Int16(ints(values).map(|i| i as i16).collect()),
        WireType::UInt16 => ColumnData::UInt16(ints(values).map(|i| i as u16).collect()),
        WireType::Int32 => ColumnData::Int32(ints(values).map(|i| i as i32).collect()),
        WireType::UInt32 => ColumnData::UInt32(ints(values).map(|i| i as u32).collect()),
        WireType::Int64 => ColumnData::Int64(ints(values).map(|i| i as i64).collect()),
        _ => ColumnData::UInt64(ints(values).map(|i| i as u64).collect()),
    })
}

fn unify_floats(values: &[FeatherValue]) -> ColumnData {
    let fits_f32 = values
        .iter()
        .filter_map(as_float)
        .all(|f| f == (f as f32) as f64);
    if fits_f32 {
        ColumnData::Float(
            values
                .iter()
                .map(|v| as_float(v).unwrap_or(0.0) as f32)
                .collect(),
        )
    } else {
        ColumnData::Double(values.iter().map(|v| as_float(v).unwrap_or(0.0)).collect())
    }
}

/// Levels are interned in first-appearance order; null rows get a
/// placeholder code masked by the validity bitmap.
fn build_category(values: &[FeatherValue]) -> (Annotation, ColumnData) {
    let mut levels: IndexSet<Arc<str>> = IndexSet::new();
    let mut codes = Vec::with_capacity(values.len());
    for value in values {
        match value {
            FeatherValue::Enum(label) => {
                let (code, _) = levels.insert_full(label.clone());
                codes.push(code as i32);
            }
            _ => codes.push(0),
        }
    }
    let levels: Vec<Arc<str>> = levels.into_iter().collect();
    (
        Annotation::Category {
            levels: levels.into(),
            ordered: false,
        },
        ColumnData::Int32(codes),
    )
}

fn collect_or_default<T, F>(values: &[FeatherValue], f: F) -> Result<Vec<T>>
where
    T: Default,
    F: Fn(&FeatherValue) -> Option<Result<T>>,
{
    values
        .iter()
        .map(|v| f(v).unwrap_or_else(|| Ok(T::default())))
        .collect()
}

fn date_micros(date: jiff::civil::Date) -> Result<i64> {
    let zoned = date
        .to_zoned(jiff::tz::TimeZone::UTC)
        .map_err(|e| FeatherError::invalid_argument(format!("date out of range: {}", e)))?;
    Ok(zoned.timestamp().as_microsecond())
}

/// Canonical text form used when a mixed sequence falls back to UTF8
fn canonical(value: &FeatherValue) -> Arc<str> {
    match value {
        FeatherValue::Bool(b) => Arc::from(if *b { "true" } else { "false" }),
        FeatherValue::Int8(i) => Arc::from(i.to_string()),
        FeatherValue::Int16(i) => Arc::from(i.to_string()),
        FeatherValue::Int32(i) => Arc::from(i.to_string()),
        FeatherValue::Int64(i) => Arc::from(i.to_string()),
        FeatherValue::UInt8(i) => Arc::from(i.to_string()),
        FeatherValue::UInt16(i) => Arc::from(i.to_string()),
        FeatherValue::UInt32(i) => Arc::from(i.to_string()),
        FeatherValue::UInt64(i) => Arc::from(i.to_string()),
        FeatherValue::Float(f) => Arc::from(f.into_inner().to_string()),
        FeatherValue::Double(f) => Arc::from(f.into_inner().to_string()),
        FeatherValue::String(s) => s.clone(),
        FeatherValue::Bytes(b) => {
            let mut hex = String::with_capacity(b.len() * 2);
            for byte in b.iter() {
                hex.push_str(&format!("{:02x}", byte));
            }
            Arc::from(hex)
        }
        FeatherValue::Timestamp(ts) => {
            let zoned = ts.to_zoned(jiff::tz::TimeZone::UTC);
            let (date, time) = (zoned.date(), zoned.time());
            Arc::from(format!(
                "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:09}Z",
                date.year(),
                date.month(),
                date.day(),
                time.hour(),
                time.minute(),
                time.second(),
                // civil subseconds stay in 0..=999_999_999 even before
                // the epoch, unlike the instant's signed fraction
                time.subsec_nanosecond()
            ))
        }
        FeatherValue::Date(d) => Arc::from(d.to_string()),
        FeatherValue::Time(t) => {
            let total = t.as_secs();
            Arc::from(format!(
                "{}:{:02}:{:02}.{:09}",
                total / 3600,
                (total % 3600) / 60,
                total % 60,
                t.subsec_nanos().unsigned_abs()
            ))
        }
        FeatherValue::Enum(label) => label.clone(),
        FeatherValue::Null => Arc::from(""),
    }
}
