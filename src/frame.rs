//! Reader-side table and column views.
//!
//! [`DataFrame`] owns a decoded [`Table`] and layers indexing on top of it:
//! every row and column index taken from or returned to the caller is
//! interpreted under the frame's [`Basis`]. All decoded storage is shared,
//! so views and projections are cheap to create.

use crate::buffers::ColumnData;
use crate::coerce::{self, FromColumn};
use crate::error::{FeatherError, Result};
use crate::projection::{Mapped, Proxied, ProxyView, Record};
use crate::schema::{Annotation, Column, Table, WireType};
use crate::value::FeatherValue;
use bytes::Bytes;
use std::path::Path;

/// Index origin for all row and column positions exposed by a frame.
///
/// The file format itself is always zero-based; the basis only shifts the
/// caller-facing indexing. A value read through one basis is identical to
/// the value read through the other at the shifted index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Basis {
    #[default]
    Zero,
    One,
}

impl Basis {
    /// Index of the first element under this basis
    pub fn origin(self) -> usize {
        match self {
            Basis::Zero => 0,
            Basis::One => 1,
        }
    }

    /// Map a caller index to a zero-based one, bounds-checked.
    pub(crate) fn adjust(self, index: usize, count: usize, what: &str) -> Result<usize> {
        match index.checked_sub(self.origin()) {
            Some(zero) if zero < count => Ok(zero),
            _ => Err(FeatherError::invalid_argument(format!(
                "{} index {} out of range ({} {}s, first index {})",
                what,
                index,
                count,
                what,
                self.origin()
            ))),
        }
    }
}

/// A decoded Feather file with a chosen index basis.
#[derive(Debug, Clone)]
pub struct DataFrame {
    table: Table,
    basis: Basis,
}

impl DataFrame {
    /// Read and fully decode the file at `path`.
    pub fn open(path: impl AsRef<Path>, basis: Basis) -> Result<Self> {
        let table = crate::reader::read_path(path.as_ref())?;
        Ok(Self { table, basis })
    }

    /// Decode a file already held in memory.
    pub fn from_bytes(bytes: Bytes, basis: Basis) -> Result<Self> {
        let table = crate::reader::read_table(bytes)?;
        Ok(Self { table, basis })
    }

    pub(crate) fn new(table: Table, basis: Basis) -> Self {
        Self { table, basis }
    }

    pub fn basis(&self) -> Basis {
        self.basis
    }

    pub fn row_count(&self) -> u64 {
        self.table.row_count()
    }

    pub fn column_count(&self) -> usize {
        self.table.columns().len()
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Column at `position` (interpreted under the frame's basis)
    pub fn column(&self, position: usize) -> Result<ColumnView<'_>> {
        let zero = self
            .basis
            .adjust(position, self.column_count(), "column")?;
        Ok(self.view_at(zero))
    }

    /// First column with the given name
    pub fn column_by_name(&self, name: &str) -> Option<ColumnView<'_>> {
        self.table
            .column_by_name(name)
            .map(|(zero, _)| self.view_at(zero))
    }

    /// Iterate the columns in file order
    pub fn columns(&self) -> impl Iterator<Item = ColumnView<'_>> {
        (0..self.column_count()).map(|zero| self.view_at(zero))
    }

    /// Natural (dynamically typed) value at `row` in column `position`.
    /// Nulls come back as [`FeatherValue::Null`].
    pub fn value(&self, row: usize, position: usize) -> Result<FeatherValue> {
        self.column(position)?.value(row)
    }

    /// Natural value at `row` in the first column named `name`
    pub fn value_by_name(&self, row: usize, name: &str) -> Result<FeatherValue> {
        self.column_by_name(name)
            .ok_or_else(|| FeatherError::invalid_argument(format!("no column named '{}'", name)))?
            .value(row)
    }

    /// Typed value at `row` in column `position`, through the coercion
    /// matrix.
    pub fn get<T: FromColumn>(&self, row: usize, position: usize) -> Result<T> {
        self.column(position)?.get(row)
    }

    pub fn get_by_name<T: FromColumn>(&self, row: usize, name: &str) -> Result<T> {
        self.column_by_name(name)
            .ok_or_else(|| FeatherError::invalid_argument(format!("no column named '{}'", name)))?
            .get(row)
    }

    /// Project the whole frame onto a tuple of column types, eagerly.
    /// The tuple arity must equal the column count.
    pub fn map<R: Record>(&self) -> Result<Mapped<R>> {
        Mapped::new(self)
    }

    /// Project rows onto a named-field struct declared with
    /// [`feather_proxy!`](crate::feather_proxy), matching fields to columns
    /// by name.
    pub fn proxy<T: Proxied>(&self) -> Result<ProxyView<'_, T>> {
        ProxyView::new(self)
    }

    fn view_at(&self, zero: usize) -> ColumnView<'_> {
        ColumnView {
            column: &self.table.columns()[zero],
            position: zero,
            basis: self.basis,
        }
    }

    // Zero-based accessors for generated projection code. Not public API.

    #[doc(hidden)]
    pub fn __column_at(&self, zero: usize) -> &Column {
        &self.table.columns()[zero]
    }

    #[doc(hidden)]
    pub fn __column_by_name(&self, name: &str) -> Option<(usize, &Column)> {
        self.table.column_by_name(name)
    }
}

/// A borrowed view of one column, carrying the frame's basis.
#[derive(Debug, Clone, Copy)]
pub struct ColumnView<'a> {
    column: &'a Column,
    position: usize,
    basis: Basis,
}

impl<'a> ColumnView<'a> {
    pub fn name(&self) -> &'a str {
        self.column.name()
    }

    pub fn wire_type(&self) -> WireType {
        self.column.wire_type()
    }

    pub fn annotation(&self) -> &'a Annotation {
        self.column.annotation()
    }

    /// Position of this column under the frame's basis
    pub fn position(&self) -> usize {
        self.position + self.basis.origin()
    }

    pub fn len(&self) -> usize {
        self.column.len()
    }

    pub fn is_empty(&self) -> bool {
        self.column.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.column.null_count()
    }

    pub fn is_null(&self, row: usize) -> Result<bool> {
        let zero = self.basis.adjust(row, self.column.len(), "row")?;
        Ok(self.column.is_null(zero))
    }

    /// Natural value at `row`; nulls come back as [`FeatherValue::Null`].
    pub fn value(&self, row: usize) -> Result<FeatherValue> {
        let zero = self.basis.adjust(row, self.column.len(), "row")?;
        natural_value(self.column, zero)
    }

    /// Typed value at `row`, through the coercion matrix
    pub fn get<T: FromColumn>(&self, row: usize) -> Result<T> {
        let zero = self.basis.adjust(row, self.column.len(), "row")?;
        T::get(self.column, zero)
    }

    /// Lazy natural iteration in row order. Each call starts a fresh pass.
    pub fn iter(&self) -> NaturalIter<'a> {
        NaturalIter {
            column: self.column,
            row: 0,
        }
    }

    /// Lazy typed iteration: the coercion is bound once up front, then each
    /// row is converted on demand.
    pub fn cast<T: FromColumn>(&self) -> Result<CastIter<'a, T>> {
        let state = T::bind(self.column)?;
        Ok(CastIter {
            column: self.column,
            state,
            row: 0,
        })
    }
}

/// Natural decoded form of one cell. Category cells yield their code.
pub(crate) fn natural_value(column: &Column, row: usize) -> Result<FeatherValue> {
    if column.is_null(row) {
        return Ok(FeatherValue::Null);
    }
    match column.annotation() {
        Annotation::Timestamp { unit } => {
            let raw = coerce::raw_temporal(column, row, "timestamp")?;
            Ok(FeatherValue::Timestamp(coerce::decode_timestamp(*unit, raw)?))
        }
        Annotation::Date => {
            let raw = coerce::raw_temporal(column, row, "date")?;
            Ok(FeatherValue::Date(coerce::decode_date(raw)?))
        }
        Annotation::Time { unit } => {
            let raw = coerce::raw_temporal(column, row, "time")?;
            Ok(FeatherValue::Time(coerce::decode_time(*unit, raw)))
        }
        Annotation::Category { .. } | Annotation::None => Ok(physical_value(column.data(), row)),
    }
}

fn physical_value(data: &ColumnData, row: usize) -> FeatherValue {
    match data {
        ColumnData::Bool(v) => v[row].into(),
        ColumnData::Int8(v) => v[row].into(),
        ColumnData::Int16(v) => v[row].into(),
        ColumnData::Int32(v) => v[row].into(),
        ColumnData::Int64(v) => v[row].into(),
        ColumnData::UInt8(v) => v[row].into(),
        ColumnData::UInt16(v) => v[row].into(),
        ColumnData::UInt32(v) => v[row].into(),
        ColumnData::UInt64(v) => v[row].into(),
        ColumnData::Float(v) => v[row].into(),
        ColumnData::Double(v) => v[row].into(),
        ColumnData::Utf8(v) => FeatherValue::String(v[row].clone()),
        ColumnData::Binary(v) => FeatherValue::Bytes(v[row].clone()),
    }
}

pub struct NaturalIter<'a> {
    column: &'a Column,
    row: usize,
}

impl Iterator for NaturalIter<'_> {
    type Item = Result<FeatherValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.row >= self.column.len() {
            return None;
        }
        let row = self.row;
        self.row += 1;
        Some(natural_value(self.column, row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.column.len() - self.row;
        (remaining, Some(remaining))
    }
}

pub struct CastIter<'a, T: FromColumn> {
    column: &'a Column,
    state: T::State,
    row: usize,
}

impl<T: FromColumn> Iterator for CastIter<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.row >= self.column.len() {
            return None;
        }
        let row = self.row;
        self.row += 1;
        Some(T::extract(self.column, &self.state, row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.column.len() - self.row;
        (remaining, Some(remaining))
    }
}
