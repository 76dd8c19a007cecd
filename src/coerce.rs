//! The value-coercion matrix: maps a decoded physical column plus a
//! requested output type to values, on demand.
//!
//! Every reader-facing accessor funnels through [`FromColumn`]. The trait
//! splits work into a construction-time `bind` (shape check plus any
//! per-type resolution, such as the category strategy for enums) and a
//! per-row `extract`, so projections resolve once and reuse the state for
//! every row.

use crate::buffers::ColumnData;
use crate::error::{FeatherError, Result};
use crate::schema::{Annotation, Column, TimeUnit};
use crate::value::FeatherValue;
use bytes::Bytes;
use std::sync::Arc;

/// A logical output type an accessor may request from a column.
pub trait FromColumn: Sized {
    /// Per-(column, type) state resolved once at bind time and reused for
    /// every row access.
    type State: Clone;

    /// Shape-check the column and resolve any cached state. Coercions that
    /// can never succeed for this column fail here, not per row.
    fn bind(column: &Column) -> Result<Self::State>;

    /// Extract the value at `row` (zero-based, already bounds-checked).
    fn extract(column: &Column, state: &Self::State, row: usize) -> Result<Self>;

    /// One-shot bind-then-extract for single-value accessors.
    fn get(column: &Column, row: usize) -> Result<Self> {
        let state = Self::bind(column)?;
        Self::extract(column, &state, row)
    }
}

fn null_error(column: &Column, row: usize, dest: &str) -> FeatherError {
    FeatherError::null_not_allowed(format!(
        "column '{}' row {} is null and {} is not nullable",
        column.name(),
        row,
        dest
    ))
}

fn unsupported(column: &Column, dest: &str) -> FeatherError {
    FeatherError::unsupported(format!(
        "cannot read {} column '{}' as {}",
        column.wire_type().type_name(),
        column.name(),
        dest
    ))
}

/// Physical value widened to i128, treating BOOL as 0/1. `None` for
/// non-integer storage.
fn integer_at(data: &ColumnData, row: usize) -> Option<i128> {
    Some(match data {
        ColumnData::Bool(v) => v[row] as i128,
        ColumnData::Int8(v) => v[row] as i128,
        ColumnData::Int16(v) => v[row] as i128,
        ColumnData::Int32(v) => v[row] as i128,
        ColumnData::Int64(v) => v[row] as i128,
        ColumnData::UInt8(v) => v[row] as i128,
        ColumnData::UInt16(v) => v[row] as i128,
        ColumnData::UInt32(v) => v[row] as i128,
        ColumnData::UInt64(v) => v[row] as i128,
        _ => return None,
    })
}

fn float_at(data: &ColumnData, row: usize) -> Option<f64> {
    Some(match data {
        ColumnData::Float(v) => v[row] as f64,
        ColumnData::Double(v) => v[row],
        _ => return None,
    })
}

fn is_integer_storage(data: &ColumnData) -> bool {
    !matches!(
        data,
        ColumnData::Float(_) | ColumnData::Double(_) | ColumnData::Utf8(_) | ColumnData::Binary(_)
    )
}

macro_rules! impl_integer_dest {
    ($($ty:ty),+) => {
        $(
            impl FromColumn for $ty {
                type State = ();

                fn bind(column: &Column) -> Result<()> {
                    match column.data() {
                        // Floating storage can never widen into an integer
                        ColumnData::Float(_) | ColumnData::Double(_) => {
                            Err(FeatherError::lossy(format!(
                                "cannot narrow {} column '{}' to {}",
                                column.wire_type().type_name(),
                                column.name(),
                                stringify!($ty)
                            )))
                        }
                        ColumnData::Utf8(_) | ColumnData::Binary(_) => {
                            Err(unsupported(column, stringify!($ty)))
                        }
                        _ => Ok(()),
                    }
                }

                fn extract(column: &Column, _state: &(), row: usize) -> Result<Self> {
                    if column.is_null(row) {
                        return Err(null_error(column, row, stringify!($ty)));
                    }
                    let wide = integer_at(column.data(), row)
                        .ok_or_else(|| unsupported(column, stringify!($ty)))?;
                    <$ty>::try_from(wide).map_err(|_| {
                        FeatherError::lossy(format!(
                            "value {} in column '{}' does not fit in {}",
                            wide,
                            column.name(),
                            stringify!($ty)
                        ))
                    })
                }
            }
        )+
    };
}

impl_integer_dest!(i8, i16, i32, i64, u8, u16, u32, u64);

macro_rules! impl_float_dest {
    ($($ty:ty),+) => {
        $(
            impl FromColumn for $ty {
                type State = ();

                fn bind(column: &Column) -> Result<()> {
                    match column.data() {
                        ColumnData::Utf8(_) | ColumnData::Binary(_) => {
                            Err(unsupported(column, stringify!($ty)))
                        }
                        // Floating destinations accept lossy narrowing
                        _ => Ok(()),
                    }
                }

                fn extract(column: &Column, _state: &(), row: usize) -> Result<Self> {
                    if column.is_null(row) {
                        return Err(null_error(column, row, stringify!($ty)));
                    }
                    let data = column.data();
                    if let Some(f) = float_at(data, row) {
                        return Ok(f as $ty);
                    }
                    integer_at(data, row)
                        .map(|i| i as $ty)
                        .ok_or_else(|| unsupported(column, stringify!($ty)))
                }
            }
        )+
    };
}

impl_float_dest!(f32, f64);

impl FromColumn for bool {
    type State = ();

    fn bind(column: &Column) -> Result<()> {
        match column.data() {
            ColumnData::Bool(_) => Ok(()),
            _ => Err(unsupported(column, "bool")),
        }
    }

    fn extract(column: &Column, _state: &(), row: usize) -> Result<Self> {
        if column.is_null(row) {
            return Err(null_error(column, row, "bool"));
        }
        match column.data() {
            ColumnData::Bool(v) => Ok(v[row]),
            _ => Err(unsupported(column, "bool")),
        }
    }
}

impl FromColumn for Arc<str> {
    type State = ();

    fn bind(column: &Column) -> Result<()> {
        if column.annotation().is_category() {
            return Ok(());
        }
        match column.data() {
            ColumnData::Utf8(_) => Ok(()),
            _ => Err(unsupported(column, "string")),
        }
    }

    fn extract(column: &Column, _state: &(), row: usize) -> Result<Self> {
        if column.is_null(row) {
            return Err(null_error(column, row, "string"));
        }
        if let Some(levels) = column.levels() {
            let code = integer_at(column.data(), row)
                .ok_or_else(|| unsupported(column, "string"))?;
            return usize::try_from(code)
                .ok()
                .and_then(|c| levels.get(c))
                .cloned()
                .ok_or_else(|| {
                    FeatherError::unresolvable(format!(
                        "code {} in column '{}' has no level",
                        code,
                        column.name()
                    ))
                });
        }
        match column.data() {
            ColumnData::Utf8(v) => Ok(v[row].clone()),
            _ => Err(unsupported(column, "string")),
        }
    }
}

impl FromColumn for String {
    type State = ();

    fn bind(column: &Column) -> Result<()> {
        <Arc<str>>::bind(column)
    }

    fn extract(column: &Column, state: &(), row: usize) -> Result<Self> {
        <Arc<str>>::extract(column, state, row).map(|s| s.to_string())
    }
}

impl FromColumn for Bytes {
    type State = ();

    fn bind(column: &Column) -> Result<()> {
        match column.data() {
            ColumnData::Binary(_) | ColumnData::Utf8(_) => Ok(()),
            _ => Err(unsupported(column, "bytes")),
        }
    }

    fn extract(column: &Column, _state: &(), row: usize) -> Result<Self> {
        if column.is_null(row) {
            return Err(null_error(column, row, "bytes"));
        }
        match column.data() {
            ColumnData::Binary(v) => Ok(v[row].clone()),
            ColumnData::Utf8(v) => Ok(Bytes::copy_from_slice(v[row].as_bytes())),
            _ => Err(unsupported(column, "bytes")),
        }
    }
}

pub(crate) fn epoch_date() -> jiff::civil::Date {
    jiff::civil::date(1970, 1, 1)
}

pub(crate) fn decode_timestamp(unit: TimeUnit, raw: i64) -> Result<jiff::Timestamp> {
    let decoded = match unit {
        TimeUnit::Second => jiff::Timestamp::from_second(raw),
        TimeUnit::Millisecond => jiff::Timestamp::from_millisecond(raw),
        TimeUnit::Microsecond => jiff::Timestamp::from_microsecond(raw),
        TimeUnit::Nanosecond => jiff::Timestamp::from_nanosecond(raw as i128),
    };
    decoded.map_err(|e| FeatherError::lossy(format!("timestamp {} out of range: {}", raw, e)))
}

pub(crate) fn decode_date(days: i64) -> Result<jiff::civil::Date> {
    let span = jiff::Span::new()
        .try_days(days)
        .map_err(|e| FeatherError::lossy(format!("date {} out of range: {}", days, e)))?;
    epoch_date()
        .checked_add(span)
        .map_err(|e| FeatherError::lossy(format!("date {} out of range: {}", days, e)))
}

pub(crate) fn encode_date(date: jiff::civil::Date) -> Result<i32> {
    let span = date
        .since((jiff::Unit::Day, epoch_date()))
        .map_err(|e| FeatherError::invalid_argument(format!("date out of range: {}", e)))?;
    i32::try_from(span.get_days())
        .map_err(|_| FeatherError::invalid_argument("date out of range"))
}

pub(crate) fn encode_time_micros(time: jiff::SignedDuration) -> Result<i64> {
    i64::try_from(time.as_micros())
        .map_err(|_| FeatherError::invalid_argument("time duration out of range"))
}

pub(crate) fn decode_time(unit: TimeUnit, raw: i64) -> jiff::SignedDuration {
    match unit {
        TimeUnit::Second => jiff::SignedDuration::from_secs(raw),
        TimeUnit::Millisecond => jiff::SignedDuration::from_millis(raw),
        TimeUnit::Microsecond => jiff::SignedDuration::from_micros(raw),
        TimeUnit::Nanosecond => jiff::SignedDuration::from_nanos(raw),
    }
}

pub(crate) fn raw_temporal(column: &Column, row: usize, dest: &str) -> Result<i64> {
    let wide = integer_at(column.data(), row).ok_or_else(|| unsupported(column, dest))?;
    i64::try_from(wide).map_err(|_| unsupported(column, dest))
}

impl FromColumn for jiff::Timestamp {
    type State = ();

    fn bind(column: &Column) -> Result<()> {
        match column.annotation() {
            Annotation::Timestamp { .. } | Annotation::Date => Ok(()),
            _ => Err(unsupported(column, "timestamp")),
        }
    }

    fn extract(column: &Column, _state: &(), row: usize) -> Result<Self> {
        if column.is_null(row) {
            return Err(null_error(column, row, "timestamp"));
        }
        match column.annotation() {
            Annotation::Timestamp { unit } => {
                decode_timestamp(*unit, raw_temporal(column, row, "timestamp")?)
            }
            // A date reads as the UTC midnight instant of that day
            Annotation::Date => {
                let date = decode_date(raw_temporal(column, row, "timestamp")?)?;
                let zoned = date
                    .to_zoned(jiff::tz::TimeZone::UTC)
                    .map_err(|e| FeatherError::lossy(format!("date out of range: {}", e)))?;
                Ok(zoned.timestamp())
            }
            _ => Err(unsupported(column, "timestamp")),
        }
    }
}

/// The "timestamp with offset" representation: the same UTC instant,
/// carried in the UTC time zone. No recorded offset is ever applied.
impl FromColumn for jiff::Zoned {
    type State = ();

    fn bind(column: &Column) -> Result<()> {
        <jiff::Timestamp>::bind(column)
    }

    fn extract(column: &Column, state: &(), row: usize) -> Result<Self> {
        let ts = <jiff::Timestamp>::extract(column, state, row)?;
        Ok(ts.to_zoned(jiff::tz::TimeZone::UTC))
    }
}

impl FromColumn for jiff::civil::Date {
    type State = ();

    fn bind(column: &Column) -> Result<()> {
        match column.annotation() {
            Annotation::Date => Ok(()),
            _ => Err(unsupported(column, "date")),
        }
    }

    fn extract(column: &Column, _state: &(), row: usize) -> Result<Self> {
        if column.is_null(row) {
            return Err(null_error(column, row, "date"));
        }
        decode_date(raw_temporal(column, row, "date")?)
    }
}

impl FromColumn for jiff::SignedDuration {
    type State = ();

    fn bind(column: &Column) -> Result<()> {
        match column.annotation() {
            Annotation::Time { .. } => Ok(()),
            _ => Err(unsupported(column, "time")),
        }
    }

    fn extract(column: &Column, _state: &(), row: usize) -> Result<Self> {
        if column.is_null(row) {
            return Err(null_error(column, row, "time"));
        }
        match column.annotation() {
            Annotation::Time { unit } => {
                Ok(decode_time(*unit, raw_temporal(column, row, "time")?))
            }
            _ => Err(unsupported(column, "time")),
        }
    }
}

/// `Option<T>` is the nullable request for any coercible `T`: a null row
/// becomes `None` instead of an error.
impl<T: FromColumn> FromColumn for Option<T> {
    type State = T::State;

    fn bind(column: &Column) -> Result<Self::State> {
        T::bind(column)
    }

    fn extract(column: &Column, state: &Self::State, row: usize) -> Result<Self> {
        if column.is_null(row) {
            return Ok(None);
        }
        T::extract(column, state, row).map(Some)
    }
}

/// An enumeration that can stand in for a category column, with a static
/// label/value table. Implemented via [`feather_enum!`](crate::feather_enum).
pub trait Categorical: Sized + Copy {
    /// `(label, underlying value)` per member, in declaration order
    fn members() -> &'static [(&'static str, i64)];

    /// Member at a declaration-order index
    fn from_member_index(index: usize) -> Self;

    /// Declaration-order index of this member
    fn member_index(&self) -> usize;

    fn label(&self) -> &'static str {
        Self::members()[self.member_index()].0
    }

    fn code_value(&self) -> i64 {
        Self::members()[self.member_index()].1
    }

    /// Boxed form for heterogeneous write-side sequences
    fn to_value(&self) -> FeatherValue {
        FeatherValue::Enum(Arc::from(self.label()))
    }
}

/// How a category column resolves onto a requested enum. Decided once per
/// (column, enum) bind and reused for every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryStrategy {
    /// Every level label names a member: resolve label -> member by name.
    ByName,
    /// Fall back to matching the raw code against member values.
    ByValue,
}

/// Resolve the strategy for reading `column` as `E`. The same category
/// column can project onto either a name-aligned or a value-aligned
/// enumeration with no per-column configuration.
pub fn bind_category<E: Categorical>(column: &Column) -> Result<CategoryStrategy> {
    let Some(levels) = column.levels() else {
        return Err(unsupported(column, "an enum"));
    };
    let by_name = levels
        .iter()
        .all(|level| E::members().iter().any(|(name, _)| *name == &**level));
    Ok(if by_name {
        CategoryStrategy::ByName
    } else {
        CategoryStrategy::ByValue
    })
}

pub fn extract_category<E: Categorical>(
    column: &Column,
    strategy: CategoryStrategy,
    row: usize,
) -> Result<E> {
    if column.is_null(row) {
        return Err(null_error(column, row, "an enum"));
    }
    let code = integer_at(column.data(), row).ok_or_else(|| unsupported(column, "an enum"))?;
    match strategy {
        CategoryStrategy::ByName => {
            let levels = column.levels().ok_or_else(|| unsupported(column, "an enum"))?;
            let label = usize::try_from(code)
                .ok()
                .and_then(|c| levels.get(c))
                .ok_or_else(|| {
                    FeatherError::unresolvable(format!(
                        "code {} in column '{}' has no level",
                        code,
                        column.name()
                    ))
                })?;
            E::members()
                .iter()
                .position(|(name, _)| *name == &**label)
                .map(E::from_member_index)
                .ok_or_else(|| {
                    FeatherError::unresolvable(format!(
                        "no enum member named '{}' for column '{}'",
                        label,
                        column.name()
                    ))
                })
        }
        CategoryStrategy::ByValue => i64::try_from(code)
            .ok()
            .and_then(|code| E::members().iter().position(|(_, value)| *value == code))
            .map(E::from_member_index)
            .ok_or_else(|| {
                FeatherError::unresolvable(format!(
                    "no enum member with value {} for column '{}'",
                    code,
                    column.name()
                ))
            }),
    }
}

/// Declare a C-like enum wired into the category machinery: reading via
/// [`FromColumn`] (name-aligned or value-aligned resolution) and writing
/// via `ColumnElement` (a CATEGORY column whose levels are the member
/// labels in declaration order).
///
/// Discriminant values are required; derives are left to the caller and
/// must include `Clone, Copy`.
#[macro_export]
macro_rules! feather_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl $crate::Categorical for $name {
            fn members() -> &'static [(&'static str, i64)] {
                &[$((stringify!($variant), $value as i64)),+]
            }

            fn from_member_index(index: usize) -> Self {
                const MEMBERS: &[$name] = &[$($name::$variant),+];
                MEMBERS[index]
            }

            #[allow(unused_assignments)]
            fn member_index(&self) -> usize {
                let mut index = 0;
                $(
                    if let $name::$variant = self {
                        return index;
                    }
                    index += 1;
                )+
                ::core::unreachable!()
            }
        }

        impl $crate::FromColumn for $name {
            type State = $crate::CategoryStrategy;

            fn bind(column: &$crate::Column) -> $crate::Result<Self::State> {
                $crate::coerce::bind_category::<Self>(column)
            }

            fn extract(
                column: &$crate::Column,
                state: &Self::State,
                row: usize,
            ) -> $crate::Result<Self> {
                $crate::coerce::extract_category::<Self>(column, *state, row)
            }
        }

        impl $crate::ColumnElement for $name {
            fn shape() -> ($crate::WireType, $crate::Annotation) {
                let labels: Vec<::std::sync::Arc<str>> =
                    <Self as $crate::Categorical>::members()
                        .iter()
                        .map(|(name, _)| ::std::sync::Arc::from(*name))
                        .collect();
                (
                    $crate::WireType::Int32,
                    $crate::Annotation::Category {
                        levels: ::std::sync::Arc::from(labels),
                        ordered: false,
                    },
                )
            }

            fn to_cell(self) -> $crate::Result<Option<$crate::FeatherValue>> {
                Ok(Some($crate::FeatherValue::Int32(
                    $crate::Categorical::member_index(&self) as i32,
                )))
            }
        }
    };
}
