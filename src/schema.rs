use crate::buffers::{Bitmap, ColumnData};
use crate::error::{FeatherError, Result};
use std::sync::Arc;

/// Physical storage kinds supported by the Feather V1 format.
///
/// Annotations (category, timestamp, date, time) are layered on top of one
/// of these through [`Annotation`]; they are never a wire type of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    Utf8,
    Binary,
}

impl WireType {
    /// Wire discriminant as stored in the file footer
    pub(crate) fn to_wire(self) -> i8 {
        match self {
            WireType::Bool => 0,
            WireType::Int8 => 1,
            WireType::Int16 => 2,
            WireType::Int32 => 3,
            WireType::Int64 => 4,
            WireType::UInt8 => 5,
            WireType::UInt16 => 6,
            WireType::UInt32 => 7,
            WireType::UInt64 => 8,
            WireType::Float => 9,
            WireType::Double => 10,
            WireType::Utf8 => 11,
            WireType::Binary => 12,
        }
    }

    /// Decode a wire discriminant. Values 13..=16 name annotation kinds in
    /// the public schema and are never valid as a physical type.
    pub(crate) fn from_wire(raw: i8) -> Result<Self> {
        Ok(match raw {
            0 => WireType::Bool,
            1 => WireType::Int8,
            2 => WireType::Int16,
            3 => WireType::Int32,
            4 => WireType::Int64,
            5 => WireType::UInt8,
            6 => WireType::UInt16,
            7 => WireType::UInt32,
            8 => WireType::UInt64,
            9 => WireType::Float,
            10 => WireType::Double,
            11 => WireType::Utf8,
            12 => WireType::Binary,
            other => {
                return Err(FeatherError::format(format!(
                    "invalid physical column type: {}",
                    other
                )))
            }
        })
    }

    /// Byte width of one element, `None` for bit-packed BOOL and the
    /// variable-length types.
    pub fn byte_width(self) -> Option<usize> {
        match self {
            WireType::Bool | WireType::Utf8 | WireType::Binary => None,
            WireType::Int8 | WireType::UInt8 => Some(1),
            WireType::Int16 | WireType::UInt16 => Some(2),
            WireType::Int32 | WireType::UInt32 | WireType::Float => Some(4),
            WireType::Int64 | WireType::UInt64 | WireType::Double => Some(8),
        }
    }

    /// True for UTF8/BINARY, which carry an int32 offsets table.
    pub fn is_variable_length(self) -> bool {
        matches!(self, WireType::Utf8 | WireType::Binary)
    }

    /// True for the integer wire types (signed or unsigned).
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            WireType::Int8
                | WireType::Int16
                | WireType::Int32
                | WireType::Int64
                | WireType::UInt8
                | WireType::UInt16
                | WireType::UInt32
                | WireType::UInt64
        )
    }

    pub fn type_name(self) -> &'static str {
        match self {
            WireType::Bool => "Bool",
            WireType::Int8 => "Int8",
            WireType::Int16 => "Int16",
            WireType::Int32 => "Int32",
            WireType::Int64 => "Int64",
            WireType::UInt8 => "UInt8",
            WireType::UInt16 => "UInt16",
            WireType::UInt32 => "UInt32",
            WireType::UInt64 => "UInt64",
            WireType::Float => "Float",
            WireType::Double => "Double",
            WireType::Utf8 => "Utf8",
            WireType::Binary => "Binary",
        }
    }
}

/// Epoch/duration resolution for TIMESTAMP and TIME columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Second,
    Millisecond,
    Microsecond,
    Nanosecond,
}

impl TimeUnit {
    pub(crate) fn to_wire(self) -> i8 {
        match self {
            TimeUnit::Second => 0,
            TimeUnit::Millisecond => 1,
            TimeUnit::Microsecond => 2,
            TimeUnit::Nanosecond => 3,
        }
    }

    pub(crate) fn from_wire(raw: i8) -> Result<Self> {
        Ok(match raw {
            0 => TimeUnit::Second,
            1 => TimeUnit::Millisecond,
            2 => TimeUnit::Microsecond,
            3 => TimeUnit::Nanosecond,
            other => {
                return Err(FeatherError::format(format!(
                    "invalid time unit: {}",
                    other
                )))
            }
        })
    }
}

/// Semantic tag layered on a column's wire type.
///
/// Represented as a tagged variant rather than a hierarchy; the buffer
/// codec and the coercion matrix both switch on it exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    None,
    /// Dictionary-encoded column: the physical values are integer codes
    /// addressing `levels`.
    Category {
        levels: Arc<[Arc<str>]>,
        ordered: bool,
    },
    /// Integer epoch count in `unit`, always interpreted as UTC
    Timestamp { unit: TimeUnit },
    /// Integer day count since the UNIX epoch
    Date,
    /// Integer duration since midnight in `unit`
    Time { unit: TimeUnit },
}

impl Annotation {
    pub fn is_category(&self) -> bool {
        matches!(self, Annotation::Category { .. })
    }
}

/// One fully decoded column: metadata plus physical storage.
///
/// Column data is shared behind `Arc` so views and projections can borrow
/// it without copying; decoded columns are immutable.
#[derive(Debug, Clone)]
pub struct Column {
    pub(crate) name: Arc<str>,
    pub(crate) wire_type: WireType,
    pub(crate) annotation: Annotation,
    pub(crate) data: Arc<ColumnData>,
    pub(crate) validity: Option<Arc<Bitmap>>,
}

impl Column {
    pub(crate) fn new(
        name: Arc<str>,
        wire_type: WireType,
        annotation: Annotation,
        data: ColumnData,
        validity: Option<Bitmap>,
    ) -> Self {
        Self {
            name,
            wire_type,
            annotation,
            data: Arc::new(data),
            validity: validity.map(Arc::new),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }

    pub fn annotation(&self) -> &Annotation {
        &self.annotation
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// Number of null rows in the column
    pub fn null_count(&self) -> usize {
        self.validity.as_ref().map_or(0, |v| v.count_unset())
    }

    /// An absent bitmap means every row is valid.
    pub fn is_null(&self, row: usize) -> bool {
        self.validity.as_ref().is_some_and(|v| !v.get(row))
    }

    pub(crate) fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Dictionary levels for a category column
    pub fn levels(&self) -> Option<&[Arc<str>]> {
        match &self.annotation {
            Annotation::Category { levels, .. } => Some(levels),
            _ => None,
        }
    }
}

/// A fully decoded Feather table: ordered columns plus the row count and
/// the format version read from (or written to) the footer.
#[derive(Debug, Clone)]
pub struct Table {
    pub(crate) row_count: u64,
    pub(crate) version: u32,
    pub(crate) columns: Vec<Column>,
}

impl Table {
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// First column with the given name. Duplicate names are legal in the
    /// format; lookup resolves to the first match.
    pub fn column_by_name(&self, name: &str) -> Option<(usize, &Column)> {
        self.columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_discriminants_roundtrip() {
        for wt in [
            WireType::Bool,
            WireType::Int8,
            WireType::Int16,
            WireType::Int32,
            WireType::Int64,
            WireType::UInt8,
            WireType::UInt16,
            WireType::UInt32,
            WireType::UInt64,
            WireType::Float,
            WireType::Double,
            WireType::Utf8,
            WireType::Binary,
        ] {
            assert_eq!(WireType::from_wire(wt.to_wire()).unwrap(), wt);
        }
    }

    #[test]
    fn test_annotation_discriminants_rejected_as_physical() {
        // 13..=16 are CATEGORY/TIMESTAMP/DATE/TIME in the footer schema
        for raw in 13..=16 {
            assert!(WireType::from_wire(raw).is_err());
        }
    }

    #[test]
    fn test_byte_widths() {
        assert_eq!(WireType::Bool.byte_width(), None);
        assert_eq!(WireType::Utf8.byte_width(), None);
        assert_eq!(WireType::Int16.byte_width(), Some(2));
        assert_eq!(WireType::Double.byte_width(), Some(8));
        assert!(WireType::Binary.is_variable_length());
        assert!(!WireType::Double.is_variable_length());
    }

    #[test]
    fn test_time_unit_roundtrip() {
        for unit in [
            TimeUnit::Second,
            TimeUnit::Millisecond,
            TimeUnit::Microsecond,
            TimeUnit::Nanosecond,
        ] {
            assert_eq!(TimeUnit::from_wire(unit.to_wire()).unwrap(), unit);
        }
        assert!(TimeUnit::from_wire(9).is_err());
    }
}
