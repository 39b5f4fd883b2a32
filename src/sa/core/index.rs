use std::io::{Read, Write};

use super::{INDEX_MAGIC, INDEX_VERSION};
use crate::error::FormatError;
use crate::varint::{VarintRead, VarintWrite};
use crate::Result;

/// A block range in a data file, stored in the [`SaIndex`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct BlockRange {
    /// Position of the first record in the block
    pub first_position: u32,

    /// Byte offset of the block header in the data file
    pub offset: u64,
}
impl BlockRange {
    #[must_use]
    pub fn new(first_position: u32, offset: u64) -> Self {
        Self {
            first_position,
            offset,
        }
    }
}

/// Maps positions to the block that may contain them.
///
/// Also carries the sorted set of reference-minor positions so that reference-minor
/// lookups never touch the data file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaIndex {
    ranges: Vec<BlockRange>,
    ref_minor_positions: Vec<u32>,
}
impl SaIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a block; blocks must be added in ascending position order
    pub fn add(&mut self, first_position: u32, offset: u64) {
        self.ranges.push(BlockRange::new(first_position, offset));
    }

    /// Registers a reference-minor position; positions must be ascending
    pub fn add_ref_minor(&mut self, position: u32) {
        self.ref_minor_positions.push(position);
    }

    /// Returns the offset of the last block whose first position is `<= position`
    #[must_use]
    pub fn get_offset(&self, position: u32) -> Option<u64> {
        let idx = self
            .ranges
            .partition_point(|range| range.first_position <= position);
        idx.checked_sub(1).map(|i| self.ranges[i].offset)
    }

    #[must_use]
    pub fn is_ref_minor(&self, position: u32) -> bool {
        self.ref_minor_positions.binary_search(&position).is_ok()
    }

    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.ranges.len()
    }

    #[must_use]
    pub fn num_ref_minors(&self) -> usize {
        self.ref_minor_positions.len()
    }

    pub fn iter_blocks(&self) -> impl Iterator<Item = BlockRange> + '_ {
        self.ranges.iter().copied()
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(INDEX_MAGIC)?;
        writer.write_varint_u32(INDEX_VERSION)?;

        writer.write_varint_u64(self.ranges.len() as u64)?;
        for range in &self.ranges {
            writer.write_varint_u32(range.first_position)?;
            writer.write_varint_u64(range.offset)?;
        }

        // ref-minor positions are delta encoded
        writer.write_varint_u64(self.ref_minor_positions.len() as u64)?;
        let mut last = 0;
        for position in &self.ref_minor_positions {
            writer.write_varint_u32(position - last)?;
            last = *position;
        }
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; INDEX_MAGIC.len()];
        reader.read_exact(&mut magic)?;
        if magic != *INDEX_MAGIC {
            return Err(FormatError::InvalidIndexMagic.into());
        }
        let version = reader.read_varint_u32()?;
        if version != INDEX_VERSION {
            return Err(FormatError::IndexVersionMismatch {
                expected: INDEX_VERSION,
                found: version,
            }
            .into());
        }

        let num_ranges = reader.read_varint_u64()?;
        let mut ranges = Vec::new();
        for _ in 0..num_ranges {
            let first_position = reader.read_varint_u32()?;
            let offset = reader.read_varint_u64()?;
            ranges.push(BlockRange::new(first_position, offset));
        }

        let num_ref_minors = reader.read_varint_u64()?;
        let mut ref_minor_positions = Vec::new();
        let mut last = 0u32;
        for _ in 0..num_ref_minors {
            last = last.wrapping_add(reader.read_varint_u32()?);
            ref_minor_positions.push(last);
        }

        Ok(Self {
            ranges,
            ref_minor_positions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn sample() -> SaIndex {
        let mut index = SaIndex::new();
        index.add(100, 50);
        index.add(5_000, 1_050);
        index.add(90_000, 9_999);
        index.add_ref_minor(120);
        index.add_ref_minor(121);
        index.add_ref_minor(95_000);
        index
    }

    #[test]
    fn test_get_offset() {
        let index = sample();
        assert_eq!(index.get_offset(99), None);
        assert_eq!(index.get_offset(100), Some(50));
        assert_eq!(index.get_offset(4_999), Some(50));
        assert_eq!(index.get_offset(5_000), Some(1_050));
        assert_eq!(index.get_offset(u32::MAX), Some(9_999));
        assert_eq!(SaIndex::new().get_offset(1), None);
    }

    #[test]
    fn test_index_round_trip() {
        let index = sample();
        let mut buf = Vec::new();
        index.write(&mut buf).unwrap();
        let decoded = SaIndex::read(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded, index);
        assert!(decoded.is_ref_minor(121));
        assert!(!decoded.is_ref_minor(122));
        assert_eq!(decoded.num_ref_minors(), 3);
        assert_eq!(decoded.iter_blocks().count(), 3);
    }

    #[test]
    fn test_index_bad_magic() {
        let result = SaIndex::read(&mut &b"NOPE!\x01\x00\x00"[..]);
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::InvalidIndexMagic))
        ));
    }

    #[test]
    fn test_index_version_mismatch() {
        let mut buf = INDEX_MAGIC.to_vec();
        buf.write_varint_u32(INDEX_VERSION + 1).unwrap();
        let result = SaIndex::read(&mut buf.as_slice());
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::IndexVersionMismatch { found, .. }))
                if found == INDEX_VERSION + 1
        ));
    }
}
