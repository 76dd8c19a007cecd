//! File-level decoding: footer metadata plus buffer regions into a
//! [`Table`].
//!
//! Decoding is strict. A corrupt footer, an out-of-bounds buffer, a
//! mismatched row count, or an annotation on an incompatible wire type all
//! abort the read; no partial table is ever produced.

use crate::buffers::{decode_column, ColumnData};
use crate::error::{ErrorContext, FeatherError, Result};
use crate::footer::{read_footer, AnnotationMeta, ColumnMeta};
use crate::schema::{Annotation, Column, Table, TimeUnit, WireType};
use bytes::Bytes;
use std::path::Path;

/// Decode a complete Feather file held in memory.
pub fn read_table(file: Bytes) -> Result<Table> {
    let footer = read_footer(&file)?;
    let mut columns = Vec::with_capacity(footer.columns.len());
    for meta in &footer.columns {
        let column = decode_one(&file, meta)
            .with_context(|| format!("decoding column '{}'", meta.name))?;
        if column.len() as u64 != footer.num_rows as u64 {
            return Err(FeatherError::format(format!(
                "column '{}' has {} rows, table declares {}",
                meta.name,
                column.len(),
                footer.num_rows
            )));
        }
        columns.push(column);
    }
    Ok(Table {
        row_count: footer.num_rows as u64,
        version: footer.version as u32,
        columns,
    })
}

/// Read and decode the file at `path`.
pub fn read_path(path: &Path) -> Result<Table> {
    let raw = std::fs::read(path)?;
    read_table(Bytes::from(raw))
}

fn decode_one(file: &Bytes, meta: &ColumnMeta) -> Result<Column> {
    let wire = WireType::from_wire(meta.values.wire)?;
    let (data, validity) = decode_column(file, wire, &meta.values)?;
    let annotation = decode_annotation(file, meta, wire)?;
    Ok(Column::new(
        meta.name.as_str().into(),
        wire,
        annotation,
        data,
        validity,
    ))
}

fn decode_annotation(file: &Bytes, meta: &ColumnMeta, wire: WireType) -> Result<Annotation> {
    Ok(match &meta.annotation {
        AnnotationMeta::None => Annotation::None,
        AnnotationMeta::Category { levels, ordered } => {
            if !wire.is_integer() {
                return Err(FeatherError::format(format!(
                    "category codes must be integers, found {}",
                    wire.type_name()
                )));
            }
            let levels_wire = WireType::from_wire(levels.wire)?;
            if levels_wire != WireType::Utf8 {
                return Err(FeatherError::format(format!(
                    "category levels must be Utf8, found {}",
                    levels_wire.type_name()
                )));
            }
            let (levels_data, levels_validity) = decode_column(file, WireType::Utf8, levels)?;
            if levels_validity.is_some() {
                return Err(FeatherError::format("category levels may not contain nulls"));
            }
            let ColumnData::Utf8(labels) = levels_data else {
                return Err(FeatherError::format("category levels must be Utf8"));
            };
            Annotation::Category {
                levels: labels.into(),
                ordered: *ordered,
            }
        }
        AnnotationMeta::Timestamp { unit } => {
            require_integer(wire, "timestamp")?;
            Annotation::Timestamp {
                unit: TimeUnit::from_wire(*unit)?,
            }
        }
        AnnotationMeta::Date => {
            require_integer(wire, "date")?;
            Annotation::Date
        }
        AnnotationMeta::Time { unit } => {
            require_integer(wire, "time")?;
            Annotation::Time {
                unit: TimeUnit::from_wire(*unit)?,
            }
        }
    })
}

fn require_integer(wire: WireType, what: &str) -> Result<()> {
    if wire.is_integer() {
        Ok(())
    } else {
        Err(FeatherError::format(format!(
            "{} annotation requires integer storage, found {}",
            what,
            wire.type_name()
        )))
    }
}
