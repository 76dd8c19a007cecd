//! File writing: typed column appends, dynamically typed appends with
//! type inference, and final assembly of the buffer region plus footer.
//!
//! A writer accumulates whole columns in memory and emits the file in one
//! shot when [`FeatherWriter::finish`] is called. `finish` consumes the
//! writer, so a finished writer cannot be appended to by construction.

use crate::buffers::{align8, encode_column, Bitmap, ColumnData};
use crate::coerce;
use crate::error::{FeatherError, Result};
use crate::footer::{
    write_metadata, AnnotationMeta, ArrayMeta, ColumnMeta, FooterMeta, FORMAT_VERSION, MAGIC,
};
use crate::infer;
use crate::schema::{Annotation, TimeUnit, WireType};
use crate::value::FeatherValue;
use bytes::Bytes;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// When column data is converted to its wire form. Only eager conversion
/// is supported: each append does its encoding work immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Eager,
}

/// An element type that can be written as a typed column.
///
/// `shape` fixes the wire type and annotation for the whole column;
/// `to_cell` produces the physical cell for one element, with `None`
/// marking a null row.
pub trait ColumnElement: Sized {
    fn shape() -> (WireType, Annotation);

    fn to_cell(self) -> Result<Option<FeatherValue>>;
}

macro_rules! impl_fixed_element {
    ($($ty:ty => $wire:ident),+ $(,)?) => {
        $(
            impl ColumnElement for $ty {
                fn shape() -> (WireType, Annotation) {
                    (WireType::$wire, Annotation::None)
                }

                fn to_cell(self) -> Result<Option<FeatherValue>> {
                    Ok(Some(self.into()))
                }
            }
        )+
    };
}

impl_fixed_element!(
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
);

macro_rules! impl_string_element {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl ColumnElement for $ty {
                fn shape() -> (WireType, Annotation) {
                    (WireType::Utf8, Annotation::None)
                }

                fn to_cell(self) -> Result<Option<FeatherValue>> {
                    Ok(Some(FeatherValue::String(Arc::from(&*self))))
                }
            }
        )+
    };
}

impl_string_element!(&str, String, Arc<str>);

impl ColumnElement for Bytes {
    fn shape() -> (WireType, Annotation) {
        (WireType::Binary, Annotation::None)
    }

    fn to_cell(self) -> Result<Option<FeatherValue>> {
        Ok(Some(FeatherValue::Bytes(self)))
    }
}

// Temporal columns are written with microsecond resolution.

impl ColumnElement for jiff::Timestamp {
    fn shape() -> (WireType, Annotation) {
        (
            WireType::Int64,
            Annotation::Timestamp {
                unit: TimeUnit::Microsecond,
            },
        )
    }

    fn to_cell(self) -> Result<Option<FeatherValue>> {
        Ok(Some(FeatherValue::Int64(self.as_microsecond())))
    }
}

impl ColumnElement for jiff::civil::Date {
    fn shape() -> (WireType, Annotation) {
        (WireType::Int32, Annotation::Date)
    }

    fn to_cell(self) -> Result<Option<FeatherValue>> {
        Ok(Some(FeatherValue::Int32(coerce::encode_date(self)?)))
    }
}

impl ColumnElement for jiff::SignedDuration {
    fn shape() -> (WireType, Annotation) {
        (
            WireType::Int64,
            Annotation::Time {
                unit: TimeUnit::Microsecond,
            },
        )
    }

    fn to_cell(self) -> Result<Option<FeatherValue>> {
        Ok(Some(FeatherValue::Int64(coerce::encode_time_micros(self)?)))
    }
}

impl<T: ColumnElement> ColumnElement for Option<T> {
    fn shape() -> (WireType, Annotation) {
        T::shape()
    }

    fn to_cell(self) -> Result<Option<FeatherValue>> {
        match self {
            Some(v) => v.to_cell(),
            None => Ok(None),
        }
    }
}

#[derive(Debug)]
pub(crate) struct PendingColumn {
    pub name: String,
    pub annotation: Annotation,
    pub data: ColumnData,
    pub validity: Option<Bitmap>,
}

/// Append the physical cell for one element. The cell variant is fixed by
/// the element type's shape, so storage and cell always agree.
pub(crate) fn push_cell(data: &mut ColumnData, cell: FeatherValue) {
    match (data, cell) {
        (ColumnData::Bool(v), FeatherValue::Bool(b)) => v.push(b),
        (ColumnData::Int8(v), FeatherValue::Int8(i)) => v.push(i),
        (ColumnData::Int16(v), FeatherValue::Int16(i)) => v.push(i),
        (ColumnData::Int32(v), FeatherValue::Int32(i)) => v.push(i),
        (ColumnData::Int64(v), FeatherValue::Int64(i)) => v.push(i),
        (ColumnData::UInt8(v), FeatherValue::UInt8(i)) => v.push(i),
        (ColumnData::UInt16(v), FeatherValue::UInt16(i)) => v.push(i),
        (ColumnData::UInt32(v), FeatherValue::UInt32(i)) => v.push(i),
        (ColumnData::UInt64(v), FeatherValue::UInt64(i)) => v.push(i),
        (ColumnData::Float(v), FeatherValue::Float(f)) => v.push(f.into_inner()),
        (ColumnData::Double(v), FeatherValue::Double(f)) => v.push(f.into_inner()),
        (ColumnData::Utf8(v), FeatherValue::String(s)) => v.push(s),
        (ColumnData::Binary(v), FeatherValue::Bytes(b)) => v.push(b),
        _ => unreachable!("cell variant does not match column storage"),
    }
}

/// Placeholder for a null row; the validity bitmap masks it on read.
pub(crate) fn push_placeholder(data: &mut ColumnData) {
    match data {
        ColumnData::Bool(v) => v.push(false),
        ColumnData::Int8(v) => v.push(0),
        ColumnData::Int16(v) => v.push(0),
        ColumnData::Int32(v) => v.push(0),
        ColumnData::Int64(v) => v.push(0),
        ColumnData::UInt8(v) => v.push(0),
        ColumnData::UInt16(v) => v.push(0),
        ColumnData::UInt32(v) => v.push(0),
        ColumnData::UInt64(v) => v.push(0),
        ColumnData::Float(v) => v.push(0.0),
        ColumnData::Double(v) => v.push(0.0),
        ColumnData::Utf8(v) => v.push(Arc::from("")),
        ColumnData::Binary(v) => v.push(Bytes::new()),
    }
}

pub(crate) fn build_validity(len: usize, nulls: &[usize]) -> Option<Bitmap> {
    if nulls.is_empty() {
        return None;
    }
    let mut bitmap = Bitmap::new_set(len);
    for &row in nulls {
        bitmap.clear(row);
    }
    Some(bitmap)
}

/// Writes one Feather file to an underlying sink.
pub struct FeatherWriter<W: Write> {
    sink: W,
    mode: WriteMode,
    row_count: Option<usize>,
    columns: Vec<PendingColumn>,
}

impl FeatherWriter<BufWriter<File>> {
    /// Create a writer targeting a new file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?), WriteMode::Eager))
    }
}

impl<W: Write> FeatherWriter<W> {
    pub fn new(sink: W, mode: WriteMode) -> Self {
        Self {
            sink,
            mode,
            row_count: None,
            columns: Vec::new(),
        }
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Number of rows fixed by the first appended column, if any
    pub fn row_count(&self) -> Option<usize> {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Append a typed column. The element type fixes the wire type and
    /// annotation; `Option` elements produce null rows.
    pub fn add_column<T, I>(&mut self, name: &str, values: I) -> Result<()>
    where
        T: ColumnElement,
        I: IntoIterator<Item = T>,
    {
        let (wire, annotation) = T::shape();
        let mut data = ColumnData::new_empty(wire);
        let mut nulls = Vec::new();
        let mut len = 0;
        for value in values {
            match value.to_cell()? {
                Some(cell) => push_cell(&mut data, cell),
                None => {
                    push_placeholder(&mut data);
                    nulls.push(len);
                }
            }
            len += 1;
        }
        let validity = build_validity(len, &nulls);
        self.push(PendingColumn {
            name: name.to_string(),
            annotation,
            data,
            validity,
        })
    }

    /// Append a dynamically typed column: the narrowest wire type that
    /// represents every element is inferred from the values themselves.
    pub fn add_values<I>(&mut self, name: &str, values: I) -> Result<()>
    where
        I: IntoIterator<Item = FeatherValue>,
    {
        let values: Vec<FeatherValue> = values.into_iter().collect();
        let column = infer::infer_column(name, values)?;
        self.push(column)
    }

    fn push(&mut self, column: PendingColumn) -> Result<()> {
        let len = column.data.len();
        match self.row_count {
            None => self.row_count = Some(len),
            Some(expected) if expected == len => {}
            Some(expected) => {
                return Err(FeatherError::invalid_argument(format!(
                    "column '{}' has {} rows, table has {}",
                    column.name, len, expected
                )))
            }
        }
        self.columns.push(column);
        Ok(())
    }

    /// Assemble and write the file, returning the sink. Consuming the
    /// writer makes appending after `finish` impossible.
    pub fn finish(mut self) -> Result<W> {
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        pad8(&mut buf);

        let mut metas = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let (values, annotation) = write_column(&mut buf, column);
            metas.push(ColumnMeta {
                name: column.name.clone(),
                values,
                annotation,
            });
        }

        let metadata = write_metadata(&FooterMeta {
            num_rows: self.row_count.unwrap_or(0) as i64,
            version: FORMAT_VERSION,
            columns: metas,
        });
        buf.extend_from_slice(&metadata);
        buf.extend_from_slice(&(metadata.len() as u32).to_le_bytes());
        buf.extend_from_slice(MAGIC);

        self.sink.write_all(&buf)?;
        self.sink.flush()?;
        Ok(self.sink)
    }
}

fn pad8(buf: &mut Vec<u8>) {
    buf.resize(align8(buf.len()), 0);
}

fn write_region(buf: &mut Vec<u8>, data: &ColumnData, validity: Option<&Bitmap>) -> ArrayMeta {
    pad8(buf);
    let offset = buf.len();
    let (region, null_count) = encode_column(data, validity);
    buf.extend_from_slice(&region);
    ArrayMeta {
        wire: data.wire_type().to_wire(),
        offset: offset as i64,
        length: data.len() as i64,
        null_count: null_count as i64,
        total_bytes: (buf.len() - offset) as i64,
    }
}

fn write_column(buf: &mut Vec<u8>, column: &PendingColumn) -> (ArrayMeta, AnnotationMeta) {
    let values = write_region(buf, &column.data, column.validity.as_ref());
    let annotation = match &column.annotation {
        Annotation::None => AnnotationMeta::None,
        Annotation::Category { levels, ordered } => {
            let levels_data = ColumnData::Utf8(levels.to_vec());
            AnnotationMeta::Category {
                levels: write_region(buf, &levels_data, None),
                ordered: *ordered,
            }
        }
        Annotation::Timestamp { unit } => AnnotationMeta::Timestamp {
            unit: unit.to_wire(),
        },
        Annotation::Date => AnnotationMeta::Date,
        Annotation::Time { unit } => AnnotationMeta::Time {
            unit: unit.to_wire(),
        },
    };
    (values, annotation)
}
