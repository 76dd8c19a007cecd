//! Minimal FlatBuffers table mechanics for the footer metadata.
//!
//! Only the pieces the Feather V1 footer needs: little-endian scalars,
//! vtable field lookup, strings, and vectors of table offsets. Reading is
//! fully bounds-checked so corrupt footers surface as format errors rather
//! than panics. Writing emits parents before children so every unsigned
//! offset points forward, which is the only layout invariant the format
//! requires.

use crate::error::{FeatherError, Result};

fn get<const N: usize>(buf: &[u8], at: usize) -> Result<[u8; N]> {
    buf.get(at..at + N)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| FeatherError::format(format!("metadata truncated at offset {}", at)))
}

pub(crate) fn read_u16(buf: &[u8], at: usize) -> Result<u16> {
    Ok(u16::from_le_bytes(get(buf, at)?))
}

pub(crate) fn read_u32(buf: &[u8], at: usize) -> Result<u32> {
    Ok(u32::from_le_bytes(get(buf, at)?))
}

pub(crate) fn read_i32(buf: &[u8], at: usize) -> Result<i32> {
    Ok(i32::from_le_bytes(get(buf, at)?))
}

pub(crate) fn read_i64(buf: &[u8], at: usize) -> Result<i64> {
    Ok(i64::from_le_bytes(get(buf, at)?))
}

/// A decoded table position inside a metadata buffer.
#[derive(Clone, Copy)]
pub(crate) struct FbTable<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FbTable<'a> {
    /// Follow the root offset at the start of the buffer.
    pub fn root(buf: &'a [u8]) -> Result<Self> {
        let off = read_u32(buf, 0)? as usize;
        Self::at(buf, off)
    }

    fn at(buf: &'a [u8], pos: usize) -> Result<Self> {
        let table = Self { buf, pos };
        table.vtable()?;
        Ok(table)
    }

    fn vtable(&self) -> Result<usize> {
        let soffset = read_i32(self.buf, self.pos)? as i64;
        let vt = self.pos as i64 - soffset;
        if vt < 0 || (vt as usize) + 4 > self.buf.len() {
            return Err(FeatherError::format("metadata vtable out of bounds"));
        }
        Ok(vt as usize)
    }

    /// Absolute position of a field, or `None` when the writer omitted it.
    fn field(&self, slot: u16) -> Result<Option<usize>> {
        let vt = self.vtable()?;
        let vt_len = read_u16(self.buf, vt)? as usize;
        let entry = 4 + slot as usize * 2;
        if entry + 2 > vt_len {
            return Ok(None);
        }
        let off = read_u16(self.buf, vt + entry)? as usize;
        if off == 0 {
            Ok(None)
        } else {
            Ok(Some(self.pos + off))
        }
    }

    pub fn i8_field(&self, slot: u16, default: i8) -> Result<i8> {
        match self.field(slot)? {
            Some(at) => Ok(get::<1>(self.buf, at)?[0] as i8),
            None => Ok(default),
        }
    }

    pub fn bool_field(&self, slot: u16, default: bool) -> Result<bool> {
        match self.field(slot)? {
            Some(at) => Ok(get::<1>(self.buf, at)?[0] != 0),
            None => Ok(default),
        }
    }

    pub fn i32_field(&self, slot: u16, default: i32) -> Result<i32> {
        match self.field(slot)? {
            Some(at) => read_i32(self.buf, at),
            None => Ok(default),
        }
    }

    pub fn i64_field(&self, slot: u16, default: i64) -> Result<i64> {
        match self.field(slot)? {
            Some(at) => read_i64(self.buf, at),
            None => Ok(default),
        }
    }

    fn indirect(&self, at: usize) -> Result<usize> {
        let off = read_u32(self.buf, at)? as usize;
        let target = at
            .checked_add(off)
            .filter(|t| *t < self.buf.len())
            .ok_or_else(|| FeatherError::format("metadata offset out of bounds"))?;
        Ok(target)
    }

    pub fn table_field(&self, slot: u16) -> Result<Option<FbTable<'a>>> {
        match self.field(slot)? {
            Some(at) => Ok(Some(Self::at(self.buf, self.indirect(at)?)?)),
            None => Ok(None),
        }
    }

    pub fn str_field(&self, slot: u16) -> Result<Option<&'a str>> {
        let Some(at) = self.field(slot)? else {
            return Ok(None);
        };
        let pos = self.indirect(at)?;
        let len = read_u32(self.buf, pos)? as usize;
        let bytes = self
            .buf
            .get(pos + 4..pos + 4 + len)
            .ok_or_else(|| FeatherError::format("metadata string out of bounds"))?;
        Ok(Some(std::str::from_utf8(bytes)?))
    }

    /// Vector of table offsets
    pub fn vector_field(&self, slot: u16) -> Result<Option<FbVector<'a>>> {
        let Some(at) = self.field(slot)? else {
            return Ok(None);
        };
        let pos = self.indirect(at)?;
        let len = read_u32(self.buf, pos)? as usize;
        if pos + 4 + len * 4 > self.buf.len() {
            return Err(FeatherError::format("metadata vector out of bounds"));
        }
        Ok(Some(FbVector {
            buf: self.buf,
            pos: pos + 4,
            len,
        }))
    }
}

pub(crate) struct FbVector<'a> {
    buf: &'a [u8],
    pos: usize,
    len: usize,
}

impl<'a> FbVector<'a> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn table(&self, i: usize) -> Result<FbTable<'a>> {
        if i >= self.len {
            return Err(FeatherError::format("metadata vector index out of bounds"));
        }
        let at = self.pos + i * 4;
        let off = read_u32(self.buf, at)? as usize;
        FbTable::at(self.buf, at + off)
    }
}

/// Scalar field of a table under construction. `Ref` reserves a 4-byte
/// offset slot patched later via [`FbBuilder::patch`].
#[derive(Clone, Copy)]
pub(crate) enum FbField {
    I8(i8),
    Bool(bool),
    I32(i32),
    I64(i64),
    Ref,
}

impl FbField {
    fn size(self) -> usize {
        match self {
            FbField::I8(_) | FbField::Bool(_) => 1,
            FbField::I32(_) | FbField::Ref => 4,
            FbField::I64(_) => 8,
        }
    }
}

/// Offset slots produced while writing a table, keyed by field slot id.
pub(crate) struct FbTableRefs {
    pub pos: usize,
    slots: Vec<(u16, usize)>,
}

impl FbTableRefs {
    pub fn slot(&self, field: u16) -> usize {
        self.slots
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, s)| *s)
            .expect("ref slot written for field")
    }
}

/// Forward-offset FlatBuffers writer.
pub(crate) struct FbBuilder {
    buf: Vec<u8>,
}

impl FbBuilder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn pos(&self) -> usize {
        self.buf.len()
    }

    fn pad_to(&mut self, align: usize) {
        while self.buf.len() % align != 0 {
            self.buf.push(0);
        }
    }

    fn put(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Reserve a 4-byte unsigned offset, to be patched once the target is
    /// written (targets always land after their referers).
    pub fn ref_slot(&mut self) -> usize {
        let at = self.buf.len();
        self.put(&0u32.to_le_bytes());
        at
    }

    /// Point a previously reserved slot at `target`.
    pub fn patch(&mut self, slot: usize, target: usize) {
        let rel = (target - slot) as u32;
        self.buf[slot..slot + 4].copy_from_slice(&rel.to_le_bytes());
    }

    /// Write a vtable followed by its table. Fields are laid out largest
    /// first after the 4-byte vtable back-reference, each naturally
    /// aligned; `Ref` fields leave zeroed slots reported back for patching.
    pub fn table(&mut self, fields: &[(u16, FbField)]) -> FbTableRefs {
        let max_slot = fields.iter().map(|(s, _)| *s).max().map_or(0, |s| s + 1);
        let vt_len = 4 + max_slot as usize * 2;
        let table_align = fields
            .iter()
            .map(|(_, f)| f.size())
            .max()
            .unwrap_or(1)
            .max(4);

        // Assign relative offsets, widest fields first for packing
        let mut ordered: Vec<(u16, FbField)> = fields.to_vec();
        ordered.sort_by_key(|(_, f)| std::cmp::Reverse(f.size()));
        let mut rel = 4usize;
        let mut layout: Vec<(u16, FbField, usize)> = Vec::with_capacity(ordered.len());
        for (slot, field) in ordered {
            let size = field.size();
            rel = (rel + size - 1) / size * size;
            layout.push((slot, field, rel));
            rel += size;
        }
        let table_len = rel;

        // Pad so the table itself starts naturally aligned
        self.pad_to(2);
        while (self.pos() + vt_len) % table_align != 0 {
            self.buf.push(0);
        }

        let vt_pos = self.pos();
        self.put(&(vt_len as u16).to_le_bytes());
        self.put(&(table_len as u16).to_le_bytes());
        for slot in 0..max_slot {
            let off = layout
                .iter()
                .find(|(s, _, _)| *s == slot)
                .map_or(0, |(_, _, rel)| *rel);
            self.put(&(off as u16).to_le_bytes());
        }

        let table_pos = self.pos();
        self.put(&((table_pos - vt_pos) as i32).to_le_bytes());

        let mut ref_slots = Vec::new();
        let mut ascending = layout;
        ascending.sort_by_key(|(_, _, rel)| *rel);
        for (slot, field, rel) in ascending {
            while self.pos() - table_pos < rel {
                self.buf.push(0);
            }
            match field {
                FbField::I8(v) => self.put(&[v as u8]),
                FbField::Bool(v) => self.put(&[v as u8]),
                FbField::I32(v) => self.put(&v.to_le_bytes()),
                FbField::I64(v) => self.put(&v.to_le_bytes()),
                FbField::Ref => ref_slots.push((slot, self.ref_slot())),
            }
        }
        while self.pos() - table_pos < table_len {
            self.buf.push(0);
        }

        FbTableRefs {
            pos: table_pos,
            slots: ref_slots,
        }
    }

    /// Write a string body and return its position.
    pub fn string(&mut self, s: &str) -> usize {
        self.pad_to(4);
        let pos = self.pos();
        self.put(&(s.len() as u32).to_le_bytes());
        self.put(s.as_bytes());
        self.buf.push(0);
        pos
    }

    /// Write a vector of `n` table offsets; returns the vector position and
    /// the reserved element slots.
    pub fn table_vector(&mut self, n: usize) -> (usize, Vec<usize>) {
        self.pad_to(4);
        let pos = self.pos();
        self.put(&(n as u32).to_le_bytes());
        let slots = (0..n).map(|_| self.ref_slot()).collect();
        (pos, slots)
    }

    /// Reserve the root offset; must be the first write.
    pub fn root_slot(&mut self) -> usize {
        debug_assert!(self.buf.is_empty());
        self.ref_slot()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}
