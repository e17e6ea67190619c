//! Small 32-bit packings shared by the router and the timetable.
//!
//! A 32-bit value is split into a 24-bit high part and an 8-bit low part. The
//! router uses it for criteria payloads (first connection, skipped stops) and
//! the timetable for ranges of transfers (start index, length).

use std::ops::Range;

use crate::error::{Error, Result};

const LOW_BITS: u32 = 8;
const LOW_MASK: u32 = (1 << LOW_BITS) - 1;
const HIGH_LIMIT: u32 = 1 << 24;

pub fn pack_24_8(bits24: u32, bits8: u32) -> Result<u32> {
    if bits24 >= HIGH_LIMIT || bits8 > LOW_MASK {
        return Err(Error::BitsOutOfRange(bits24, bits8));
    }
    Ok((bits24 << LOW_BITS) | bits8)
}

pub const fn unpack_24(bits32: u32) -> u32 {
    bits32 >> LOW_BITS
}

pub const fn unpack_8(bits32: u32) -> u32 {
    bits32 & LOW_MASK
}

/// A contiguous index range `[start, start + len)` with `len <= 255`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub struct PackedRange(u32);

impl PackedRange {
    pub const EMPTY: PackedRange = PackedRange(0);

    pub fn new(start: usize, end: usize) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidRange { start, end });
        }
        let start_bits = u32::try_from(start).map_err(|_| Error::InvalidRange { start, end })?;
        let len_bits = u32::try_from(end - start).map_err(|_| Error::InvalidRange { start, end })?;
        pack_24_8(start_bits, len_bits)
            .map(PackedRange)
            .map_err(|_| Error::InvalidRange { start, end })
    }

    pub const fn from_bits(bits: u32) -> Self {
        PackedRange(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn start(self) -> usize {
        unpack_24(self.0) as usize
    }

    pub const fn len(self) -> usize {
        unpack_8(self.0) as usize
    }

    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }

    pub const fn end(self) -> usize {
        self.start() + self.len()
    }

    pub fn range(self) -> Range<usize> {
        self.start()..self.end()
    }
}

impl IntoIterator for PackedRange {
    type Item = usize;
    type IntoIter = Range<usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.range()
    }
}
