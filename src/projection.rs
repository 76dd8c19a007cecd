//! Typed whole-frame projections.
//!
//! Two flavors: [`Record`] tuples, which project a frame positionally onto
//! `(T1, .., Tn)` and materialize every column eagerly, and [`Proxied`]
//! structs (declared with [`feather_proxy!`](crate::feather_proxy)), which
//! match fields to columns by name and build rows lazily.

use crate::coerce::FromColumn;
use crate::error::{FeatherError, Result};
use crate::frame::{Basis, DataFrame};
use std::marker::PhantomData;

/// A tuple of column element types that a frame can be projected onto.
///
/// Implemented for tuples of arity 1 through 8; every element type must be
/// readable through the coercion matrix.
pub trait Record: Sized {
    /// One fully materialized vector per tuple position
    type Columns;

    const ARITY: usize;

    fn materialize(frame: &DataFrame) -> Result<Self::Columns>;

    /// Assemble the tuple for one zero-based row from the materialized
    /// columns.
    fn row(columns: &Self::Columns, row: usize) -> Self;
}

fn materialize_column<T: FromColumn>(frame: &DataFrame, position: usize) -> Result<Vec<T>> {
    let column = frame.__column_at(position);
    let state = T::bind(column).map_err(|e| {
        FeatherError::projection(format!(
            "column {} ('{}'): {}",
            position,
            column.name(),
            e
        ))
    })?;
    (0..column.len())
        .map(|row| T::extract(column, &state, row))
        .collect()
}

macro_rules! impl_record {
    ($arity:expr => $(($ty:ident, $idx:tt)),+) => {
        impl<$($ty: FromColumn + Clone),+> Record for ($($ty,)+) {
            type Columns = ($(Vec<$ty>,)+);

            const ARITY: usize = $arity;

            fn materialize(frame: &DataFrame) -> Result<Self::Columns> {
                Ok(($(materialize_column::<$ty>(frame, $idx)?,)+))
            }

            fn row(columns: &Self::Columns, row: usize) -> Self {
                ($(columns.$idx[row].clone(),)+)
            }
        }
    };
}

impl_record!(1 => (T0, 0));
impl_record!(2 => (T0, 0), (T1, 1));
impl_record!(3 => (T0, 0), (T1, 1), (T2, 2));
impl_record!(4 => (T0, 0), (T1, 1), (T2, 2), (T3, 3));
impl_record!(5 => (T0, 0), (T1, 1), (T2, 2), (T3, 3), (T4, 4));
impl_record!(6 => (T0, 0), (T1, 1), (T2, 2), (T3, 3), (T4, 4), (T5, 5));
impl_record!(7 => (T0, 0), (T1, 1), (T2, 2), (T3, 3), (T4, 4), (T5, 5), (T6, 6));
impl_record!(8 => (T0, 0), (T1, 1), (T2, 2), (T3, 3), (T4, 4), (T5, 5), (T6, 6), (T7, 7));

/// An eagerly materialized tuple projection of a whole frame.
///
/// Construction validates the arity against the column count and converts
/// every cell up front, so row access afterwards is infallible.
pub struct Mapped<R: Record> {
    columns: R::Columns,
    len: usize,
    basis: Basis,
}

impl<R: Record> Mapped<R> {
    pub(crate) fn new(frame: &DataFrame) -> Result<Self> {
        if R::ARITY != frame.column_count() {
            return Err(FeatherError::projection(format!(
                "tuple arity {} does not match column count {}",
                R::ARITY,
                frame.column_count()
            )));
        }
        Ok(Self {
            columns: R::materialize(frame)?,
            len: frame.row_count() as usize,
            basis: frame.basis(),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn basis(&self) -> Basis {
        self.basis
    }

    /// Row tuple at `index` (interpreted under the source frame's basis)
    pub fn row(&self, index: usize) -> Result<R> {
        let zero = self.basis.adjust(index, self.len, "row")?;
        Ok(R::row(&self.columns, zero))
    }

    /// Iterate row tuples in order
    pub fn rows(&self) -> MappedRows<'_, R> {
        MappedRows {
            mapped: self,
            row: 0,
        }
    }

    /// The materialized per-column vectors
    pub fn columns(&self) -> &R::Columns {
        &self.columns
    }
}

pub struct MappedRows<'a, R: Record> {
    mapped: &'a Mapped<R>,
    row: usize,
}

impl<R: Record> Iterator for MappedRows<'_, R> {
    type Item = R;

    fn next(&mut self) -> Option<Self::Item> {
        if self.row >= self.mapped.len {
            return None;
        }
        let row = self.row;
        self.row += 1;
        Some(R::row(&self.mapped.columns, row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.mapped.len - self.row;
        (remaining, Some(remaining))
    }
}

/// A struct type whose fields project onto frame columns by name.
///
/// Implemented by [`feather_proxy!`](crate::feather_proxy); the generated
/// plan resolves each field to a column position and bound coercion state
/// once, at view construction. Fields with no matching column fall back to
/// their `Default` value, and columns with no matching field are ignored.
pub trait Proxied: Sized {
    type Plan;

    fn bind(frame: &DataFrame) -> Result<Self::Plan>;

    fn materialize(frame: &DataFrame, plan: &Self::Plan, row: usize) -> Result<Self>;
}

/// A lazy by-name projection over a borrowed frame.
pub struct ProxyView<'a, T: Proxied> {
    frame: &'a DataFrame,
    plan: T::Plan,
    _marker: PhantomData<T>,
}

impl<'a, T: Proxied> ProxyView<'a, T> {
    pub(crate) fn new(frame: &'a DataFrame) -> Result<Self> {
        Ok(Self {
            frame,
            plan: T::bind(frame)?,
            _marker: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.frame.row_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build the struct for the row at `index` (interpreted under the
    /// frame's basis).
    pub fn row(&self, index: usize) -> Result<T> {
        let zero = self
            .frame
            .basis()
            .adjust(index, self.len(), "row")?;
        T::materialize(self.frame, &self.plan, zero)
    }

    /// Iterate rows in order
    pub fn rows(&self) -> ProxyRows<'_, 'a, T> {
        ProxyRows { view: self, row: 0 }
    }
}

pub struct ProxyRows<'v, 'a, T: Proxied> {
    view: &'v ProxyView<'a, T>,
    row: usize,
}

impl<T: Proxied> Iterator for ProxyRows<'_, '_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.row >= self.view.len() {
            return None;
        }
        let row = self.row;
        self.row += 1;
        Some(T::materialize(self.view.frame, &self.view.plan, row))
    }
}

/// Declare a struct that projects frame rows by column name.
///
/// Every field type must implement `FromColumn` and `Default`; a field
/// whose name matches no column is left at its default. The struct is
/// otherwise an ordinary struct and the attributes and visibility are
/// passed through.
#[macro_export]
macro_rules! feather_proxy {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($(#[$fmeta:meta])* $fvis:vis $fname:ident : $fty:ty),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($(#[$fmeta])* $fvis $fname: $fty,)+
        }

        impl $crate::Proxied for $name {
            type Plan = ($(Option<(usize, <$fty as $crate::FromColumn>::State)>,)+);

            fn bind(frame: &$crate::DataFrame) -> $crate::Result<Self::Plan> {
                Ok(($(
                    match frame.__column_by_name(stringify!($fname)) {
                        Some((position, column)) => {
                            Some((position, <$fty as $crate::FromColumn>::bind(column)?))
                        }
                        None => None,
                    },
                )+))
            }

            fn materialize(
                frame: &$crate::DataFrame,
                plan: &Self::Plan,
                row: usize,
            ) -> $crate::Result<Self> {
                let ($($fname,)+) = plan;
                Ok(Self {
                    $($fname: match $fname {
                        Some((position, state)) => <$fty as $crate::FromColumn>::extract(
                            frame.__column_at(*position),
                            state,
                            row,
                        )?,
                        None => ::core::default::Default::default(),
                    },)+
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::{Bitmap, ColumnData};
    use crate::schema::{Annotation, Column, Table, WireType};
    use std::sync::Arc;

    fn sample_frame(basis: Basis) -> DataFrame {
        let mut bitmap = Bitmap::new_set(3);
        bitmap.clear(2);
        let table = Table {
            row_count: 3,
            version: crate::footer::FORMAT_VERSION as u32,
            columns: vec![
                Column::new(
                    Arc::from("id"),
                    WireType::Int32,
                    Annotation::None,
                    ColumnData::Int32(vec![1, 2, 3]),
                    None,
                ),
                Column::new(
                    Arc::from("score"),
                    WireType::Double,
                    Annotation::None,
                    ColumnData::Double(vec![0.5, 1.5, 0.0]),
                    Some(bitmap),
                ),
            ],
        };
        DataFrame::new(table, basis)
    }

    #[test]
    fn test_map_materializes_rows() {
        let frame = sample_frame(Basis::Zero);
        let mapped = frame.map::<(i64, Option<f64>)>().unwrap();
        assert_eq!(mapped.len(), 3);
        assert_eq!(mapped.row(0).unwrap(), (1, Some(0.5)));
        assert_eq!(mapped.row(2).unwrap(), (3, None));
        let rows: Vec<(i64, Option<f64>)> = mapped.rows().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], (2, Some(1.5)));
    }

    #[test]
    fn test_map_respects_basis() {
        let frame = sample_frame(Basis::One);
        let mapped = frame.map::<(i32, Option<f64>)>().unwrap();
        assert!(mapped.row(0).is_err());
        assert_eq!(mapped.row(1).unwrap(), (1, Some(0.5)));
        assert_eq!(mapped.row(3).unwrap(), (3, None));
    }

    #[test]
    fn test_map_arity_mismatch() {
        let frame = sample_frame(Basis::Zero);
        assert!(matches!(
            frame.map::<(i32,)>(),
            Err(FeatherError::ProjectionShape(_))
        ));
        assert!(matches!(
            frame.map::<(i32, f64, i32)>(),
            Err(FeatherError::ProjectionShape(_))
        ));
    }

    #[test]
    fn test_map_bind_failure_is_a_shape_error() {
        let frame = sample_frame(Basis::Zero);
        // a string can never come out of the score column
        assert!(matches!(
            frame.map::<(i32, String)>(),
            Err(FeatherError::ProjectionShape(_))
        ));
    }

    #[test]
    fn test_map_fails_eagerly_on_bad_cells() {
        let frame = sample_frame(Basis::Zero);
        // row 2 of score is null; the non-nullable f64 fails at construction
        assert!(frame.map::<(i32, f64)>().is_err());
    }

    feather_proxy! {
        #[derive(Debug, PartialEq)]
        struct Reading {
            id: i64,
            score: Option<f64>,
            comment: String,
        }
    }

    #[test]
    fn test_proxy_by_name_with_defaults() {
        let frame = sample_frame(Basis::Zero);
        let view = frame.proxy::<Reading>().unwrap();
        assert_eq!(view.len(), 3);
        let first = view.row(0).unwrap();
        assert_eq!(
            first,
            Reading {
                id: 1,
                score: Some(0.5),
                // no matching column: default
                comment: String::new(),
            }
        );
        let last = view.row(2).unwrap();
        assert_eq!(last.score, None);
        let all: Vec<Reading> = view.rows().map(|r| r.unwrap()).collect();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_proxy_respects_basis() {
        let frame = sample_frame(Basis::One);
        let view = frame.proxy::<Reading>().unwrap();
        assert!(view.row(0).is_err());
        assert_eq!(view.row(1).unwrap().id, 1);
    }
}
