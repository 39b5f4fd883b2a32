use std::io::{self, Read, Write};

use bytemuck::{Pod, Zeroable};
use log::trace;

use super::{BlockCompressor, SaPosition, BLOCK_MAGIC, MAX_BLOCK_BYTES};
use crate::error::{FormatError, WriteError};
use crate::varint::{varint_len, VarintRead, VarintWrite};
use crate::Result;

/// The header preceding every compressed block.
///
/// This is stored identically in memory and on disk.
#[derive(Copy, Clone, Pod, Zeroable, Debug, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct BlockHeader {
    magic: [u8; 4],

    /// Number of position records in the block
    pub num_records: u32,

    /// Size of the block after decompression
    pub u_bytes: u32,

    /// Size of the compressed payload following this header
    pub z_bytes: u32,
}
impl BlockHeader {
    #[must_use]
    pub fn new(num_records: u32, u_bytes: u32, z_bytes: u32) -> Self {
        Self {
            magic: *BLOCK_MAGIC,
            num_records,
            u_bytes,
            z_bytes,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Decodes a header, `offset` is only used for error reporting
    pub fn from_bytes(bytes: &[u8], offset: u64) -> Result<Self> {
        let header: Self = bytemuck::pod_read_unaligned(bytes);
        if header.magic != *BLOCK_MAGIC {
            return Err(FormatError::InvalidBlockMagic(offset).into());
        }
        Ok(header)
    }
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| WriteError::RecordTooLarge(value).into())
}

fn block_len(value: usize) -> Result<u32> {
    match to_u32(value)? {
        len if len > MAX_BLOCK_BYTES => Err(WriteError::RecordTooLarge(value).into()),
        len => Ok(len),
    }
}

/// Accumulates encoded position records until the block is flushed
pub struct SaWriteBlock {
    /// `(position, offset into records)` for every record in the block
    directory: Vec<(u32, u32)>,

    /// Concatenated encoded records
    records: Vec<u8>,

    /// Assembled uncompressed block
    ubuf: Vec<u8>,

    /// Compressed block
    zbuf: Vec<u8>,

    /// Uncompressed size at which the block reports itself full
    block_size: usize,

    /// Running size of the encoded directory
    directory_bytes: usize,
}
impl SaWriteBlock {
    #[must_use]
    pub fn new(block_size: usize) -> Self {
        Self {
            directory: Vec::new(),
            records: Vec::new(),
            ubuf: Vec::new(),
            zbuf: Vec::new(),
            block_size,
            directory_bytes: 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.directory.is_empty()
    }

    #[must_use]
    pub fn num_records(&self) -> usize {
        self.directory.len()
    }

    #[must_use]
    pub fn first_position(&self) -> Option<u32> {
        self.directory.first().map(|(pos, _)| *pos)
    }

    /// Uncompressed size the block would have if flushed now
    #[must_use]
    pub fn uncompressed_len(&self) -> usize {
        varint_len(self.directory.len() as u64) + self.directory_bytes + self.records.len()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.uncompressed_len() >= self.block_size
    }

    /// Encodes a record into the block
    pub fn push(&mut self, position: &SaPosition) -> Result<()> {
        let offset = to_u32(self.records.len())?;
        let start = self.records.len();
        if let Err(e) = position.encode(&mut self.records) {
            self.records.truncate(start);
            return Err(e);
        }
        self.directory.push((position.position, offset));
        self.directory_bytes +=
            varint_len(u64::from(position.position)) + varint_len(u64::from(offset));
        Ok(())
    }

    /// Compresses and writes the block, returning the number of bytes written.
    ///
    /// The block is cleared afterwards. Nothing is written for an empty block.
    pub fn flush_to<W: Write, C: BlockCompressor + ?Sized>(
        &mut self,
        writer: &mut W,
        compressor: &mut C,
    ) -> Result<usize> {
        if self.is_empty() {
            return Ok(0);
        }

        self.ubuf.clear();
        self.ubuf.write_varint_u64(self.directory.len() as u64)?;
        for (position, offset) in &self.directory {
            self.ubuf.write_varint_u32(*position)?;
            self.ubuf.write_varint_u32(*offset)?;
        }
        self.ubuf.extend_from_slice(&self.records);

        compressor.compress(&self.ubuf, &mut self.zbuf)?;
        let header = BlockHeader::new(
            to_u32(self.directory.len())?,
            block_len(self.ubuf.len())?,
            block_len(self.zbuf.len())?,
        );
        writer.write_all(header.as_bytes())?;
        writer.write_all(&self.zbuf)?;
        trace!(
            "flushed block: {} records, {} -> {} bytes",
            header.num_records,
            header.u_bytes,
            header.z_bytes
        );

        self.clear();
        Ok(size_of::<BlockHeader>() + self.zbuf.len())
    }

    fn clear(&mut self) {
        self.directory.clear();
        self.records.clear();
        self.directory_bytes = 0;
    }
}

/// A decompressed block with its parsed directory.
///
/// The decompression arena grows to the largest block seen and is reused.
#[derive(Default)]
pub struct SaReadBlock {
    zbuf: Vec<u8>,
    arena: Vec<u8>,
    directory: Vec<(u32, u32)>,

    /// Start of the record section within the arena
    records_start: usize,

    /// File offset of the loaded block
    offset: Option<u64>,
}
impl SaReadBlock {
    #[must_use]
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    #[must_use]
    pub fn num_records(&self) -> usize {
        self.directory.len()
    }

    /// Reads the block located at `offset`; the reader must already be positioned there
    pub fn read_from<R: Read, C: BlockCompressor + ?Sized>(
        &mut self,
        reader: &mut R,
        offset: u64,
        compressor: &mut C,
    ) -> Result<()> {
        self.offset = None;
        self.directory.clear();

        let mut header_buf = [0u8; size_of::<BlockHeader>()];
        reader.read_exact(&mut header_buf)?;
        let header = BlockHeader::from_bytes(&header_buf, offset)?;

        let corrupt = |reason: String| FormatError::CorruptBlock { offset, reason };
        if header.u_bytes > MAX_BLOCK_BYTES || header.z_bytes > MAX_BLOCK_BYTES {
            return Err(corrupt(format!(
                "block sizes {}/{} exceed {MAX_BLOCK_BYTES} bytes",
                header.z_bytes, header.u_bytes
            ))
            .into());
        }

        // grows with the bytes actually present, not the declared length
        self.zbuf.clear();
        let n = Read::take(&mut *reader, u64::from(header.z_bytes)).read_to_end(&mut self.zbuf)?;
        if n != header.z_bytes as usize {
            return Err(corrupt(format!(
                "expected {} compressed bytes, found {n}",
                header.z_bytes
            ))
            .into());
        }

        self.arena.resize(header.u_bytes as usize, 0);
        let n = compressor
            .decompress(&self.zbuf, &mut self.arena)
            .map_err(|e| corrupt(e.to_string()))?;
        if n != header.u_bytes as usize {
            return Err(corrupt(format!(
                "expected {} decompressed bytes, found {n}",
                header.u_bytes
            ))
            .into());
        }

        self.parse_directory(header.num_records)
            .map_err(|e| corrupt(format!("invalid directory: {e}")))?;
        self.offset = Some(offset);
        Ok(())
    }

    fn parse_directory(&mut self, expected: u32) -> Result<()> {
        let mut cursor = io::Cursor::new(self.arena.as_slice());
        let count = cursor.read_varint_u32()?;
        if count != expected {
            return Err(io::Error::other(format!(
                "directory holds {count} records, header declares {expected}"
            ))
            .into());
        }
        for _ in 0..count {
            let position = cursor.read_varint_u32()?;
            let offset = cursor.read_varint_u32()?;
            self.directory.push((position, offset));
        }
        self.records_start = usize::try_from(cursor.position()).unwrap_or(usize::MAX);
        Ok(())
    }

    /// Binary searches the directory, returning the record's slot
    #[must_use]
    pub fn find(&self, position: u32) -> Option<usize> {
        self.directory
            .binary_search_by_key(&position, |(pos, _)| *pos)
            .ok()
    }

    /// Decodes the record in directory slot `slot`
    pub fn decode(&self, slot: usize) -> Result<SaPosition> {
        let offset = self.offset.unwrap_or_default();
        let corrupt = |reason: String| FormatError::CorruptBlock { offset, reason };

        let (_, record_offset) = self.directory[slot];
        let start = self.records_start + record_offset as usize;
        let mut bytes = self
            .arena
            .get(start..)
            .ok_or_else(|| corrupt(format!("record offset {record_offset} out of bounds")))?;
        SaPosition::decode(&mut bytes).map_err(|e| match e {
            crate::Error::Io(e) => corrupt(format!("truncated record: {e}")).into(),
            e => e,
        })
    }
}
