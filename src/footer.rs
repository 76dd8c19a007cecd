//! Feather V1 footer codec: magic markers, the trailing footer-length
//! pointer, and the FlatBuffers-encoded table metadata.
//!
//! The metadata schema (field slots, enum discriminants, union tags) is
//! fixed by the public `feather.fbs` and must not change.

use crate::error::{FeatherError, Result};
use crate::flatbuf::{read_u32, FbBuilder, FbField, FbTable};
use bytes::Bytes;

pub(crate) const MAGIC: &[u8; 4] = b"FEA1";

/// Feather V1 format version written into the footer
pub(crate) const FORMAT_VERSION: i32 = 2;

// CTable field slots
const CTABLE_NUM_ROWS: u16 = 1;
const CTABLE_COLUMNS: u16 = 2;
const CTABLE_VERSION: u16 = 3;

// Column field slots
const COLUMN_NAME: u16 = 0;
const COLUMN_VALUES: u16 = 1;
const COLUMN_METADATA_TYPE: u16 = 2;
const COLUMN_METADATA: u16 = 3;

// PrimitiveArray field slots
const ARRAY_TYPE: u16 = 0;
const ARRAY_OFFSET: u16 = 2;
const ARRAY_LENGTH: u16 = 3;
const ARRAY_NULL_COUNT: u16 = 4;
const ARRAY_TOTAL_BYTES: u16 = 5;

// CategoryMetadata / TimestampMetadata / TimeMetadata field slots
const CATEGORY_LEVELS: u16 = 0;
const CATEGORY_ORDERED: u16 = 1;
const TIMESTAMP_UNIT: u16 = 0;
const TIME_UNIT: u16 = 0;

// TypeMetadata union tags
const META_NONE: i8 = 0;
const META_CATEGORY: i8 = 1;
const META_TIMESTAMP: i8 = 2;
const META_DATE: i8 = 3;
const META_TIME: i8 = 4;

/// Buffer descriptor for one physical array in the buffer region.
/// `offset` is an absolute file offset; `total_bytes` spans the whole
/// padded region (bitmap + offsets + data).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ArrayMeta {
    pub wire: i8,
    pub offset: i64,
    pub length: i64,
    pub null_count: i64,
    pub total_bytes: i64,
}

/// Wire-level annotation payload, before levels are decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AnnotationMeta {
    None,
    Category { levels: ArrayMeta, ordered: bool },
    Timestamp { unit: i8 },
    Date,
    Time { unit: i8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ColumnMeta {
    pub name: String,
    pub values: ArrayMeta,
    pub annotation: AnnotationMeta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FooterMeta {
    pub num_rows: i64,
    pub version: i32,
    pub columns: Vec<ColumnMeta>,
}

/// Validate both magic markers and the footer length, then decode the
/// metadata message. Any mismatch is fatal; no partial table comes back.
pub(crate) fn read_footer(file: &Bytes) -> Result<FooterMeta> {
    if file.len() < 12 {
        return Err(FeatherError::format(format!(
            "file too small to be a feather file: {} bytes",
            file.len()
        )));
    }
    if &file[..4] != MAGIC {
        return Err(FeatherError::format("bad leading magic"));
    }
    if &file[file.len() - 4..] != MAGIC {
        return Err(FeatherError::format("bad trailing magic"));
    }

    let meta_len = read_u32(&file[..], file.len() - 8)? as usize;
    let meta_end = file.len() - 8;
    let meta_start = meta_end
        .checked_sub(meta_len)
        .filter(|start| *start >= 4)
        .ok_or_else(|| FeatherError::format("footer length exceeds file size"))?;

    parse_metadata(&file[meta_start..meta_end])
}

fn parse_metadata(buf: &[u8]) -> Result<FooterMeta> {
    let ctable = FbTable::root(buf)?;
    let num_rows = ctable.i64_field(CTABLE_NUM_ROWS, 0)?;
    if num_rows < 0 {
        return Err(FeatherError::format("negative row count in footer"));
    }
    let version = ctable.i32_field(CTABLE_VERSION, 0)?;

    let mut columns = Vec::new();
    if let Some(vec) = ctable.vector_field(CTABLE_COLUMNS)? {
        for i in 0..vec.len() {
            let col = vec.table(i)?;
            let name = col
                .str_field(COLUMN_NAME)?
                .ok_or_else(|| FeatherError::format("column without a name"))?
                .to_string();
            let values = col
                .table_field(COLUMN_VALUES)?
                .ok_or_else(|| FeatherError::format("column without a values array"))?;
            let values = parse_array(&values)?;
            let annotation = parse_annotation(&col)?;
            columns.push(ColumnMeta {
                name,
                values,
                annotation,
            });
        }
    }

    Ok(FooterMeta {
        num_rows,
        version,
        columns,
    })
}

fn parse_array(table: &FbTable) -> Result<ArrayMeta> {
    Ok(ArrayMeta {
        wire: table.i8_field(ARRAY_TYPE, 0)?,
        offset: table.i64_field(ARRAY_OFFSET, 0)?,
        length: table.i64_field(ARRAY_LENGTH, 0)?,
        null_count: table.i64_field(ARRAY_NULL_COUNT, 0)?,
        total_bytes: table.i64_field(ARRAY_TOTAL_BYTES, 0)?,
    })
}

fn parse_annotation(col: &FbTable) -> Result<AnnotationMeta> {
    let tag = col.i8_field(COLUMN_METADATA_TYPE, META_NONE)?;
    if tag == META_NONE {
        return Ok(AnnotationMeta::None);
    }
    let payload = col
        .table_field(COLUMN_METADATA)?
        .ok_or_else(|| FeatherError::format("annotation tag without a payload"))?;
    Ok(match tag {
        META_CATEGORY => {
            let levels = payload
                .table_field(CATEGORY_LEVELS)?
                .ok_or_else(|| FeatherError::format("category column without levels"))?;
            AnnotationMeta::Category {
                levels: parse_array(&levels)?,
                ordered: payload.bool_field(CATEGORY_ORDERED, false)?,
            }
        }
        META_TIMESTAMP => AnnotationMeta::Timestamp {
            unit: payload.i8_field(TIMESTAMP_UNIT, 0)?,
        },
        META_DATE => AnnotationMeta::Date,
        META_TIME => AnnotationMeta::Time {
            unit: payload.i8_field(TIME_UNIT, 0)?,
        },
        other => {
            return Err(FeatherError::format(format!(
                "unknown annotation tag: {}",
                other
            )))
        }
    })
}

fn array_fields(meta: &ArrayMeta) -> Vec<(u16, FbField)> {
    vec![
        (ARRAY_TYPE, FbField::I8(meta.wire)),
        (ARRAY_OFFSET, FbField::I64(meta.offset)),
        (ARRAY_LENGTH, FbField::I64(meta.length)),
        (ARRAY_NULL_COUNT, FbField::I64(meta.null_count)),
        (ARRAY_TOTAL_BYTES, FbField::I64(meta.total_bytes)),
    ]
}

/// Encode the metadata message (the bytes between the buffer region and
/// the trailing footer length).
pub(crate) fn write_metadata(meta: &FooterMeta) -> Vec<u8> {
    let mut b = FbBuilder::new();
    let root = b.root_slot();

    let ctable = b.table(&[
        (CTABLE_NUM_ROWS, FbField::I64(meta.num_rows)),
        (CTABLE_COLUMNS, FbField::Ref),
        (CTABLE_VERSION, FbField::I32(meta.version)),
    ]);
    b.patch(root, ctable.pos);

    let (vec_pos, col_slots) = b.table_vector(meta.columns.len());
    b.patch(ctable.slot(CTABLE_COLUMNS), vec_pos);

    for (col, slot) in meta.columns.iter().zip(col_slots) {
        let tag = match &col.annotation {
            AnnotationMeta::None => META_NONE,
            AnnotationMeta::Category { .. } => META_CATEGORY,
            AnnotationMeta::Timestamp { .. } => META_TIMESTAMP,
            AnnotationMeta::Date => META_DATE,
            AnnotationMeta::Time { .. } => META_TIME,
        };
        let mut fields = vec![
            (COLUMN_NAME, FbField::Ref),
            (COLUMN_VALUES, FbField::Ref),
            (COLUMN_METADATA_TYPE, FbField::I8(tag)),
        ];
        if tag != META_NONE {
            fields.push((COLUMN_METADATA, FbField::Ref));
        }
        let col_table = b.table(&fields);
        b.patch(slot, col_table.pos);

        let name = b.string(&col.name);
        b.patch(col_table.slot(COLUMN_NAME), name);

        let values = b.table(&array_fields(&col.values));
        b.patch(col_table.slot(COLUMN_VALUES), values.pos);

        match &col.annotation {
            AnnotationMeta::None => {}
            AnnotationMeta::Category { levels, ordered } => {
                let cat = b.table(&[
                    (CATEGORY_LEVELS, FbField::Ref),
                    (CATEGORY_ORDERED, FbField::Bool(*ordered)),
                ]);
                b.patch(col_table.slot(COLUMN_METADATA), cat.pos);
                let levels_table = b.table(&array_fields(levels));
                b.patch(cat.slot(CATEGORY_LEVELS), levels_table.pos);
            }
            AnnotationMeta::Timestamp { unit } => {
                let ts = b.table(&[(TIMESTAMP_UNIT, FbField::I8(*unit))]);
                b.patch(col_table.slot(COLUMN_METADATA), ts.pos);
            }
            AnnotationMeta::Date => {
                let date = b.table(&[]);
                b.patch(col_table.slot(COLUMN_METADATA), date.pos);
            }
            AnnotationMeta::Time { unit } => {
                let time = b.table(&[(TIME_UNIT, FbField::I8(*unit))]);
                b.patch(col_table.slot(COLUMN_METADATA), time.pos);
            }
        }
    }

    b.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_footer() -> FooterMeta {
        FooterMeta {
            num_rows: 5,
            version: FORMAT_VERSION,
            columns: vec![
                ColumnMeta {
                    name: "prices".to_string(),
                    values: ArrayMeta {
                        wire: 10,
                        offset: 8,
                        length: 5,
                        null_count: 0,
                        total_bytes: 40,
                    },
                    annotation: AnnotationMeta::None,
                },
                ColumnMeta {
                    name: "kind".to_string(),
                    values: ArrayMeta {
                        wire: 3,
                        offset: 48,
                        length: 5,
                        null_count: 1,
                        total_bytes: 32,
                    },
                    annotation: AnnotationMeta::Category {
                        levels: ArrayMeta {
                            wire: 11,
                            offset: 80,
                            length: 3,
                            null_count: 0,
                            total_bytes: 40,
                        },
                        ordered: true,
                    },
                },
                ColumnMeta {
                    name: "when".to_string(),
                    values: ArrayMeta {
                        wire: 4,
                        offset: 120,
                        length: 5,
                        null_count: 0,
                        total_bytes: 40,
                    },
                    annotation: AnnotationMeta::Timestamp { unit: 2 },
                },
            ],
        }
    }

    fn frame(meta_bytes: Vec<u8>) -> Bytes {
        let mut file = Vec::new();
        file.extend_from_slice(MAGIC);
        file.extend_from_slice(&[0u8; 4]);
        let meta_len = meta_bytes.len() as u32;
        file.extend_from_slice(&meta_bytes);
        file.extend_from_slice(&meta_len.to_le_bytes());
        file.extend_from_slice(MAGIC);
        Bytes::from(file)
    }

    #[test]
    fn test_metadata_roundtrip() {
        let meta = sample_footer();
        let encoded = write_metadata(&meta);
        let file = frame(encoded);
        let decoded = read_footer(&file).unwrap();
        assert_eq!(decoded, meta);
    }

    #[test]
    fn test_empty_table_roundtrip() {
        let meta = FooterMeta {
            num_rows: 0,
            version: FORMAT_VERSION,
            columns: Vec::new(),
        };
        let file = frame(write_metadata(&meta));
        assert_eq!(read_footer(&file).unwrap(), meta);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut raw = frame(write_metadata(&sample_footer())).to_vec();
        raw[0] = b'X';
        assert!(read_footer(&Bytes::from(raw.clone())).is_err());

        let mut raw2 = frame(write_metadata(&sample_footer())).to_vec();
        let n = raw2.len();
        raw2[n - 1] = b'X';
        assert!(read_footer(&Bytes::from(raw2)).is_err());
    }

    #[test]
    fn test_corrupt_root_offset_rejected() {
        let file = frame(write_metadata(&sample_footer()));
        let mut raw = file.to_vec();
        // Metadata starts at 8 in this framing; point its root offset into
        // the void
        raw[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(read_footer(&Bytes::from(raw)).is_err());
    }

    #[test]
    fn test_oversized_footer_length_rejected() {
        let file = frame(write_metadata(&sample_footer()));
        let mut raw = file.to_vec();
        let n = raw.len();
        raw[n - 8..n - 4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(read_footer(&Bytes::from(raw)).is_err());
    }

    #[test]
    fn test_tiny_file_rejected() {
        assert!(read_footer(&Bytes::from_static(b"FEA1FEA1")).is_err());
    }
}
