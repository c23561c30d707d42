//! Variable-width tuple layouts.
//!
//! A tuple is an ordered list of byte-string elements. Two self-describing
//! layouts share an 8-byte header:
//!
//! # Layout
//! ```text
//! Small:  [tag u32 LE = 1][count u32 LE] (element 0x00)*
//! Large:  [tag u32 LE = 2][count u32 LE] [offset u32 LE]*count (element 0x00)*
//! ```
//!
//! Large offsets are relative to the start of the data area. Element `i`
//! spans `offset[i] .. offset[i + 1] - 1`; the last one runs up to the byte
//! before the final terminator.
//!
//! The small layout finds elements by scanning for terminators, so its
//! elements cannot contain `0x00`. The large layout has no such restriction.
//! Either way a decoded [`Tuple`] keeps an index of element spans, so
//! [`Tuple::value_at`] is O(1) after decoding.

use std::fmt;

use crate::common::{Error, Result};

/// Size of the shared tuple header.
pub const TUPLE_HEADER_SIZE: usize = 8;

/// Tuples with more elements than this use the large layout.
pub const SMALL_TUPLE_MAX_ELEMENTS: usize = 16;

const SMALL_TAG: u32 = 1;
const LARGE_TAG: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TupleLayout {
    Small,
    Large,
}

/// An encoded tuple plus the span of each element.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Tuple {
    data: Vec<u8>,
    spans: Vec<(usize, usize)>,
}

impl Tuple {
    /// Encode `values`, picking the small layout when it can represent them.
    ///
    /// Tuples are limited to 4 GiB; larger inputs are not supported.
    pub fn from_values<V: AsRef<[u8]>>(values: &[V]) -> Self {
        let small_ok = values.len() <= SMALL_TUPLE_MAX_ELEMENTS
            && values.iter().all(|v| !v.as_ref().contains(&0));
        if small_ok {
            if let Ok(tuple) = Self::encode_small(values) {
                return tuple;
            }
        }
        Self::encode_unchecked_large(values)
    }

    /// Encode `values` with an explicit layout.
    ///
    /// # Errors
    /// - `Error::InvalidValue` if a small-layout element contains `0x00`
    /// - `Error::OutOfSpace` if the encoding exceeds the u32 offset range
    pub fn encode<V: AsRef<[u8]>>(layout: TupleLayout, values: &[V]) -> Result<Self> {
        match layout {
            TupleLayout::Small => Self::encode_small(values),
            TupleLayout::Large => Self::encode_large(values),
        }
    }

    fn encode_small<V: AsRef<[u8]>>(values: &[V]) -> Result<Self> {
        let body: usize = values.iter().map(|v| v.as_ref().len() + 1).sum();
        let mut data = Vec::with_capacity(TUPLE_HEADER_SIZE + body);
        write_header(&mut data, SMALL_TAG, values.len())?;

        let mut spans = Vec::with_capacity(values.len());
        for value in values {
            let value = value.as_ref();
            if value.contains(&0) {
                return Err(Error::InvalidValue(
                    "small tuple elements cannot contain 0x00".into(),
                ));
            }
            spans.push((data.len(), value.len()));
            data.extend_from_slice(value);
            data.push(0);
        }
        Ok(Self { data, spans })
    }

    fn encode_large<V: AsRef<[u8]>>(values: &[V]) -> Result<Self> {
        let body: usize = values.iter().map(|v| v.as_ref().len() + 1).sum();
        let data_start = TUPLE_HEADER_SIZE + 4 * values.len();
        if data_start + body > u32::MAX as usize {
            return Err(Error::OutOfSpace {
                needed: data_start + body,
                available: u32::MAX as usize,
            });
        }
        Ok(Self::encode_unchecked_large(values))
    }

    fn encode_unchecked_large<V: AsRef<[u8]>>(values: &[V]) -> Self {
        let body: usize = values.iter().map(|v| v.as_ref().len() + 1).sum();
        let data_start = TUPLE_HEADER_SIZE + 4 * values.len();
        let mut data = Vec::with_capacity(data_start + body);
        data.extend_from_slice(&LARGE_TAG.to_le_bytes());
        data.extend_from_slice(&(values.len() as u32).to_le_bytes());

        let mut offset = 0u32;
        for value in values {
            data.extend_from_slice(&offset.to_le_bytes());
            offset += value.as_ref().len() as u32 + 1;
        }

        let mut spans = Vec::with_capacity(values.len());
        for value in values {
            let value = value.as_ref();
            spans.push((data.len(), value.len()));
            data.extend_from_slice(value);
            data.push(0);
        }
        Self { data, spans }
    }

    /// Decode an encoded tuple, indexing its elements.
    ///
    /// # Errors
    /// - `Error::Corrupted` if the header, offsets or terminators are
    ///   inconsistent with the byte length
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.len() < TUPLE_HEADER_SIZE {
            return Err(Error::Corrupted(format!(
                "tuple of {} bytes is shorter than its header",
                data.len()
            )));
        }
        let tag = read_u32(&data, 0);
        let count = read_u32(&data, 4) as usize;
        let spans = match tag {
            SMALL_TAG => index_small(&data, count)?,
            LARGE_TAG => index_large(&data, count)?,
            other => return Err(Error::Corrupted(format!("unknown tuple tag {}", other))),
        };
        Ok(Self { data, spans })
    }

    /// Single-element tuple `[1]` or `[0]`.
    pub fn from_bool(value: bool) -> Self {
        Self::from_values(&[[value as u8]])
    }

    /// Interpret a single one-byte element as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self.spans.as_slice() {
            [_] => match self.value_at(0)? {
                [0] => Some(false),
                [1] => Some(true),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn layout(&self) -> TupleLayout {
        if read_u32(&self.data, 0) == LARGE_TAG {
            TupleLayout::Large
        } else {
            TupleLayout::Small
        }
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Element `index`, borrowed from the tuple's bytes.
    #[inline]
    pub fn value_at(&self, index: usize) -> Option<&[u8]> {
        let &(start, len) = self.spans.get(index)?;
        Some(&self.data[start..start + len])
    }

    pub fn values(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.spans
            .iter()
            .map(move |&(start, len)| &self.data[start..start + len])
    }

    /// Owned copies of every element.
    pub fn to_values(&self) -> Vec<Vec<u8>> {
        self.values().map(<[u8]>::to_vec).collect()
    }

    /// Copy of this tuple with element `index` replaced.
    ///
    /// # Errors
    /// - `Error::InvalidValue` if `index` is out of range
    pub fn with_value(&self, index: usize, value: &[u8]) -> Result<Self> {
        if index >= self.len() {
            return Err(Error::InvalidValue(format!(
                "element {} out of range for tuple of {}",
                index,
                self.len()
            )));
        }
        let mut values: Vec<&[u8]> = self.values().collect();
        values[index] = value;
        Ok(Self::from_values(&values))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl Default for Tuple {
    fn default() -> Self {
        Self::from_values::<&[u8]>(&[])
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.values().map(String::from_utf8_lossy))
            .finish()
    }
}

fn write_header(data: &mut Vec<u8>, tag: u32, count: usize) -> Result<()> {
    let count = u32::try_from(count)
        .map_err(|_| Error::InvalidValue(format!("{} elements do not fit a tuple", count)))?;
    data.extend_from_slice(&tag.to_le_bytes());
    data.extend_from_slice(&count.to_le_bytes());
    Ok(())
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

fn index_small(data: &[u8], count: usize) -> Result<Vec<(usize, usize)>> {
    let mut spans = Vec::with_capacity(count.min(data.len()));
    let mut pos = TUPLE_HEADER_SIZE;
    for i in 0..count {
        let Some(len) = data[pos..].iter().position(|&b| b == 0) else {
            return Err(Error::Corrupted(format!(
                "small tuple element {} of {} is unterminated",
                i, count
            )));
        };
        spans.push((pos, len));
        pos += len + 1;
    }
    if pos != data.len() {
        return Err(Error::Corrupted(format!(
            "small tuple has {} trailing bytes",
            data.len() - pos
        )));
    }
    Ok(spans)
}

fn index_large(data: &[u8], count: usize) -> Result<Vec<(usize, usize)>> {
    let data_start = count
        .checked_mul(4)
        .and_then(|n| n.checked_add(TUPLE_HEADER_SIZE))
        .filter(|&start| start <= data.len())
        .ok_or_else(|| Error::Corrupted(format!("large tuple offsets for {} elements truncated", count)))?;
    let area = data.len() - data_start;

    let mut offsets = Vec::with_capacity(count + 1);
    for i in 0..count {
        offsets.push(read_u32(data, TUPLE_HEADER_SIZE + 4 * i) as usize);
    }
    offsets.push(area);

    let mut spans = Vec::with_capacity(count);
    for pair in offsets.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        if end <= start || end > area || data[data_start + end - 1] != 0 {
            return Err(Error::Corrupted(format!(
                "large tuple offset {} .. {} is invalid",
                start, end
            )));
        }
        spans.push((data_start + start, end - start - 1));
    }
    if count > 0 && offsets[0] != 0 {
        return Err(Error::Corrupted("large tuple data does not start at offset 0".into()));
    }
    if count == 0 && area != 0 {
        return Err(Error::Corrupted("empty large tuple carries data".into()));
    }
    Ok(spans)
}
