//! Per-column physical byte codec: validity bitmaps, offset tables, and
//! flat data buffers, independent of any semantic annotation.

use crate::error::{FeatherError, Result};
use crate::footer::ArrayMeta;
use crate::schema::WireType;
use bytes::Bytes;
use std::sync::Arc;

/// Buffers are padded so every one starts on an 8-byte boundary.
pub(crate) const BUFFER_ALIGNMENT: usize = 8;

pub(crate) fn align8(n: usize) -> usize {
    (n + (BUFFER_ALIGNMENT - 1)) & !(BUFFER_ALIGNMENT - 1)
}

/// Validity bitmap, one bit per row, byte-packed LSB-first.
///
/// A set bit means the row is valid; a clear bit means null. A column with
/// no nulls omits the bitmap entirely, so "no bitmap" reads as "all valid".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    bits: Vec<u8>,
    len: usize,
}

impl Bitmap {
    /// All-valid bitmap for `len` rows
    pub fn new_set(len: usize) -> Self {
        let mut bits = vec![0xFF; len.div_ceil(8)];
        // Clear the trailing slack so count_unset stays honest
        if len % 8 != 0 {
            if let Some(last) = bits.last_mut() {
                *last = (1u8 << (len % 8)) - 1;
            }
        }
        Self { bits, len }
    }

    pub fn from_bytes(raw: &[u8], len: usize) -> Self {
        let mut bits = raw.to_vec();
        bits.truncate(len.div_ceil(8));
        bits.resize(len.div_ceil(8), 0);
        // Writers are free to leave the slack bits of the last byte set;
        // clear them so counting stays bounded by len
        if len % 8 != 0 {
            if let Some(last) = bits.last_mut() {
                *last &= (1u8 << (len % 8)) - 1;
            }
        }
        Self { bits, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, i: usize) -> bool {
        debug_assert!(i < self.len);
        self.bits[i / 8] & (1 << (i % 8)) != 0
    }

    pub fn clear(&mut self, i: usize) {
        debug_assert!(i < self.len);
        self.bits[i / 8] &= !(1 << (i % 8));
    }

    /// Number of null (clear) bits
    pub fn count_unset(&self) -> usize {
        self.len - self.bits.iter().map(|b| b.count_ones() as usize).sum::<usize>()
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bits
    }
}

/// Decoded physical storage for one column. Purely the wire representation;
/// semantic meaning (category codes, epochs) lives in the annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Bool(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Utf8(Vec<Arc<str>>),
    Binary(Vec<Bytes>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Bool(v) => v.len(),
            ColumnData::Int8(v) => v.len(),
            ColumnData::Int16(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::UInt8(v) => v.len(),
            ColumnData::UInt16(v) => v.len(),
            ColumnData::UInt32(v) => v.len(),
            ColumnData::UInt64(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Double(v) => v.len(),
            ColumnData::Utf8(v) => v.len(),
            ColumnData::Binary(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn wire_type(&self) -> WireType {
        match self {
            ColumnData::Bool(_) => WireType::Bool,
            ColumnData::Int8(_) => WireType::Int8,
            ColumnData::Int16(_) => WireType::Int16,
            ColumnData::Int32(_) => WireType::Int32,
            ColumnData::Int64(_) => WireType::Int64,
            ColumnData::UInt8(_) => WireType::UInt8,
            ColumnData::UInt16(_) => WireType::UInt16,
            ColumnData::UInt32(_) => WireType::UInt32,
            ColumnData::UInt64(_) => WireType::UInt64,
            ColumnData::Float(_) => WireType::Float,
            ColumnData::Double(_) => WireType::Double,
            ColumnData::Utf8(_) => WireType::Utf8,
            ColumnData::Binary(_) => WireType::Binary,
        }
    }

    pub(crate) fn new_empty(wire: WireType) -> Self {
        match wire {
            WireType::Bool => ColumnData::Bool(Vec::new()),
            WireType::Int8 => ColumnData::Int8(Vec::new()),
            WireType::Int16 => ColumnData::Int16(Vec::new()),
            WireType::Int32 => ColumnData::Int32(Vec::new()),
            WireType::Int64 => ColumnData::Int64(Vec::new()),
            WireType::UInt8 => ColumnData::UInt8(Vec::new()),
            WireType::UInt16 => ColumnData::UInt16(Vec::new()),
            WireType::UInt32 => ColumnData::UInt32(Vec::new()),
            WireType::UInt64 => ColumnData::UInt64(Vec::new()),
            WireType::Float => ColumnData::Float(Vec::new()),
            WireType::Double => ColumnData::Double(Vec::new()),
            WireType::Utf8 => ColumnData::Utf8(Vec::new()),
            WireType::Binary => ColumnData::Binary(Vec::new()),
        }
    }
}

macro_rules! decode_fixed {
    ($bytes:expr, $rows:expr, $ty:ty, $width:expr) => {{
        let mut out = Vec::with_capacity($rows);
        for i in 0..$rows {
            let start = i * $width;
            let mut raw = [0u8; $width];
            raw.copy_from_slice(&$bytes[start..start + $width]);
            out.push(<$ty>::from_le_bytes(raw));
        }
        out
    }};
}

/// Decode one column's buffer region into physical values plus an optional
/// validity bitmap.
pub(crate) fn decode_column(
    file: &Bytes,
    wire: WireType,
    meta: &ArrayMeta,
) -> Result<(ColumnData, Option<Bitmap>)> {
    let rows = usize::try_from(meta.length)
        .map_err(|_| FeatherError::format("negative array length in footer"))?;
    let offset = usize::try_from(meta.offset)
        .map_err(|_| FeatherError::format("negative buffer offset in footer"))?;
    let total = usize::try_from(meta.total_bytes)
        .map_err(|_| FeatherError::format("negative buffer size in footer"))?;
    let end = offset
        .checked_add(total)
        .filter(|end| *end <= file.len())
        .ok_or_else(|| {
            FeatherError::format(format!(
                "buffer region {}..{} exceeds file size {}",
                offset,
                offset + total,
                file.len()
            ))
        })?;
    let region = &file[offset..end];

    let mut cursor = 0usize;
    let validity = if meta.null_count > 0 {
        let bitmap_bytes = rows.div_ceil(8);
        if region.len() < bitmap_bytes {
            return Err(FeatherError::format("truncated validity bitmap"));
        }
        let bitmap = Bitmap::from_bytes(&region[..bitmap_bytes], rows);
        cursor = align8(bitmap_bytes);
        Some(bitmap)
    } else {
        None
    };

    let data = if wire.is_variable_length() {
        let offsets_bytes = (rows + 1) * 4;
        if region.len() < cursor + offsets_bytes {
            return Err(FeatherError::format("truncated offsets table"));
        }
        let offsets = decode_fixed!(&region[cursor..cursor + offsets_bytes], rows + 1, i32, 4);
        cursor = align8(cursor + offsets_bytes);
        let payload = &region[cursor..];

        let mut prev = 0i32;
        for (i, off) in offsets.iter().enumerate() {
            if *off < prev || (*off as usize) > payload.len() {
                return Err(FeatherError::format(format!(
                    "offsets table not monotonic at row {}",
                    i.saturating_sub(1)
                )));
            }
            prev = *off;
        }

        match wire {
            WireType::Utf8 => {
                let mut values = Vec::with_capacity(rows);
                for i in 0..rows {
                    let span = &payload[offsets[i] as usize..offsets[i + 1] as usize];
                    values.push(Arc::from(std::str::from_utf8(span)?));
                }
                ColumnData::Utf8(values)
            }
            _ => {
                let mut values = Vec::with_capacity(rows);
                for i in 0..rows {
                    let span = &payload[offsets[i] as usize..offsets[i + 1] as usize];
                    values.push(Bytes::copy_from_slice(span));
                }
                ColumnData::Binary(values)
            }
        }
    } else if wire == WireType::Bool {
        // BOOL data buffers are bit-packed exactly like validity bitmaps
        let data_bytes = rows.div_ceil(8);
        if region.len() < cursor + data_bytes {
            return Err(FeatherError::format("truncated bool data buffer"));
        }
        let packed = &region[cursor..cursor + data_bytes];
        let mut values = Vec::with_capacity(rows);
        for i in 0..rows {
            values.push(packed[i / 8] & (1 << (i % 8)) != 0);
        }
        ColumnData::Bool(values)
    } else {
        let width = wire.byte_width().expect("fixed-width wire type");
        let data_bytes = rows * width;
        if region.len() < cursor + data_bytes {
            return Err(FeatherError::format(format!(
                "data buffer for {} rows of {} needs {} bytes, region has {}",
                rows,
                wire.type_name(),
                data_bytes,
                region.len() - cursor
            )));
        }
        let payload = &region[cursor..cursor + data_bytes];
        match wire {
            WireType::Int8 => ColumnData::Int8(decode_fixed!(payload, rows, i8, 1)),
            WireType::Int16 => ColumnData::Int16(decode_fixed!(payload, rows, i16, 2)),
            WireType::Int32 => ColumnData::Int32(decode_fixed!(payload, rows, i32, 4)),
            WireType::Int64 => ColumnData::Int64(decode_fixed!(payload, rows, i64, 8)),
            WireType::UInt8 => ColumnData::UInt8(decode_fixed!(payload, rows, u8, 1)),
            WireType::UInt16 => ColumnData::UInt16(decode_fixed!(payload, rows, u16, 2)),
            WireType::UInt32 => ColumnData::UInt32(decode_fixed!(payload, rows, u32, 4)),
            WireType::UInt64 => ColumnData::UInt64(decode_fixed!(payload, rows, u64, 8)),
            WireType::Float => ColumnData::Float(decode_fixed!(payload, rows, f32, 4)),
            WireType::Double => ColumnData::Double(decode_fixed!(payload, rows, f64, 8)),
            _ => unreachable!("variable-length handled above"),
        }
    };

    Ok((data, validity))
}

/// Encode one column into its buffer region: `[bitmap][offsets][data]`,
/// each sub-buffer zero-padded to 8 bytes.
///
/// The validity bitmap and the offsets table are always rebuilt from the
/// logical input; the bitmap is emitted only when the column actually has
/// nulls. Returns the region bytes and the null count.
pub(crate) fn encode_column(data: &ColumnData, validity: Option<&Bitmap>) -> (Vec<u8>, u64) {
    let rows = data.len();
    let null_count = validity.map_or(0, |v| v.count_unset());

    let mut region = Vec::new();
    if null_count > 0 {
        let bitmap = validity.expect("null_count implies bitmap");
        region.extend_from_slice(bitmap.as_bytes());
        region.resize(align8(region.len()), 0);
    }

    match data {
        ColumnData::Utf8(values) => {
            encode_varlen(&mut region, rows, values.iter().map(|s| s.as_bytes()));
        }
        ColumnData::Binary(values) => {
            encode_varlen(&mut region, rows, values.iter().map(|b| b.as_ref()));
        }
        ColumnData::Bool(values) => {
            let mut packed = vec![0u8; rows.div_ceil(8)];
            for (i, v) in values.iter().enumerate() {
                if *v {
                    packed[i / 8] |= 1 << (i % 8);
                }
            }
            region.extend_from_slice(&packed);
        }
        ColumnData::Int8(v) => encode_fixed(&mut region, v, |x| x.to_le_bytes().to_vec()),
        ColumnData::Int16(v) => encode_fixed(&mut region, v, |x| x.to_le_bytes().to_vec()),
        ColumnData::Int32(v) => encode_fixed(&mut region, v, |x| x.to_le_bytes().to_vec()),
        ColumnData::Int64(v) => encode_fixed(&mut region, v, |x| x.to_le_bytes().to_vec()),
        ColumnData::UInt8(v) => encode_fixed(&mut region, v, |x| x.to_le_bytes().to_vec()),
        ColumnData::UInt16(v) => encode_fixed(&mut region, v, |x| x.to_le_bytes().to_vec()),
        ColumnData::UInt32(v) => encode_fixed(&mut region, v, |x| x.to_le_bytes().to_vec()),
        ColumnData::UInt64(v) => encode_fixed(&mut region, v, |x| x.to_le_bytes().to_vec()),
        ColumnData::Float(v) => encode_fixed(&mut region, v, |x| x.to_le_bytes().to_vec()),
        ColumnData::Double(v) => encode_fixed(&mut region, v, |x| x.to_le_bytes().to_vec()),
    }

    region.resize(align8(region.len()), 0);
    (region, null_count as u64)
}

fn encode_fixed<T: Copy>(region: &mut Vec<u8>, values: &[T], to_bytes: impl Fn(T) -> Vec<u8>) {
    for v in values {
        region.extend_from_slice(&to_bytes(*v));
    }
}

fn encode_varlen<'a>(
    region: &mut Vec<u8>,
    rows: usize,
    values: impl Iterator<Item = &'a [u8]> + Clone,
) {
    // Offsets are rebuilt from the values; a null row's placeholder is
    // zero-width so it contributes nothing to the data buffer.
    let mut offsets = Vec::with_capacity(rows + 1);
    let mut running = 0i32;
    offsets.push(running);
    for v in values.clone() {
        running += v.len() as i32;
        offsets.push(running);
    }
    for off in &offsets {
        region.extend_from_slice(&off.to_le_bytes());
    }
    region.resize(align8(region.len()), 0);
    for v in values {
        region.extend_from_slice(v);
    }
}
