//! Writer for annotation stores
//!
//! The writer streams the header and interval lists to the data file as soon as it
//! is created, then accumulates position records into blocks. Each block is
//! compressed and written once its uncompressed size reaches the block size
//! threshold, and its first position and byte offset are registered in the index.
//! The index is only written when the writer is finished (explicitly or on drop).

use std::io::Write;

use log::{debug, warn};

use super::core::{BlockCompressor, SaHeader, SaIndex, SaIntervalLists, SaPosition, SaWriteBlock, Zstandard};
use super::{DEFAULT_BLOCK_SIZE, DEFAULT_COMPRESSION_LEVEL};
use crate::error::WriteError;
use crate::Result;

/// Builder for [`SaWriter`]
///
/// # Examples
///
/// ```rust,no_run
/// use std::fs::File;
/// use std::io::BufWriter;
///
/// use sastore::sa::{SaHeader, SaIntervalLists, SaPosition, SaWriterBuilder};
///
/// let data = BufWriter::new(File::create("chr1.nsa").unwrap());
/// let index = BufWriter::new(File::create("chr1.nsa.idx").unwrap());
/// let header = SaHeader::builder("chr1").build();
///
/// let mut writer = SaWriterBuilder::default()
///     .block_size(64 * 1024)
///     .build(data, index, &header, &SaIntervalLists::default())
///     .unwrap();
///
/// let mut position = SaPosition::new(10_001);
/// position.push_entry("dbsnp", r#"{"ids":["rs1"]}"#.to_string());
/// writer.write(position).unwrap();
/// writer.finish().unwrap();
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct SaWriterBuilder {
    block_size: Option<usize>,
    compression_level: Option<i32>,
}
impl SaWriterBuilder {
    /// Sets the uncompressed size at which blocks are flushed
    #[must_use]
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = Some(block_size);
        self
    }

    #[must_use]
    pub fn compression_level(mut self, level: i32) -> Self {
        self.compression_level = Some(level);
        self
    }

    /// Creates the writer and writes the header and interval lists to `inner`
    pub fn build<W: Write, I: Write>(
        self,
        inner: W,
        index_writer: I,
        header: &SaHeader,
        intervals: &SaIntervalLists,
    ) -> Result<SaWriter<W, I>> {
        let compressor = Zstandard::new(self.compression_level.unwrap_or(DEFAULT_COMPRESSION_LEVEL));
        SaWriter::with_compressor(
            inner,
            index_writer,
            header,
            intervals,
            self.block_size.unwrap_or(DEFAULT_BLOCK_SIZE),
            Box::new(compressor),
        )
    }
}

/// Streaming writer for one chromosome's annotation store
pub struct SaWriter<W: Write, I: Write> {
    /// Data file
    inner: W,

    /// Index file, only touched on finish
    index_writer: I,

    /// Records waiting to be flushed
    block: SaWriteBlock,

    index: SaIndex,
    compressor: Box<dyn BlockCompressor + Send>,

    /// Bytes written to the data file so far
    bytes_written: u64,

    last_position: Option<u32>,
    records_written: usize,
    finished: bool,
}
impl<W: Write, I: Write> SaWriter<W, I> {
    /// Creates a writer with the default block size and compression
    pub fn new(
        inner: W,
        index_writer: I,
        header: &SaHeader,
        intervals: &SaIntervalLists,
    ) -> Result<Self> {
        SaWriterBuilder::default().build(inner, index_writer, header, intervals)
    }

    /// Creates a writer around a custom block compressor
    pub fn with_compressor(
        mut inner: W,
        index_writer: I,
        header: &SaHeader,
        intervals: &SaIntervalLists,
        block_size: usize,
        compressor: Box<dyn BlockCompressor + Send>,
    ) -> Result<Self> {
        let mut preamble = Vec::new();
        header.write(&mut preamble)?;
        intervals.write(&mut preamble)?;
        inner.write_all(&preamble)?;
        debug!(
            "{}: wrote {} header bytes with {} intervals",
            header.chromosome,
            preamble.len(),
            intervals.len()
        );

        Ok(Self {
            inner,
            index_writer,
            block: SaWriteBlock::new(block_size),
            index: SaIndex::new(),
            compressor,
            bytes_written: preamble.len() as u64,
            last_position: None,
            records_written: 0,
            finished: false,
        })
    }

    /// Appends a position record.
    ///
    /// Positions must be strictly ascending.
    pub fn write(&mut self, position: SaPosition) -> Result<()> {
        if self.finished {
            return Err(WriteError::AlreadyFinished.into());
        }
        if let Some(previous) = self.last_position {
            if position.position <= previous {
                return Err(WriteError::PositionOutOfOrder {
                    previous,
                    current: position.position,
                }
                .into());
            }
        }

        self.block.push(&position)?;
        if position.is_ref_minor {
            self.index.add_ref_minor(position.position);
        }
        self.last_position = Some(position.position);
        self.records_written += 1;

        if self.block.is_full() {
            self.flush()?;
        }
        Ok(())
    }

    /// Compresses and writes the pending block, if any
    pub fn flush(&mut self) -> Result<()> {
        let Some(first_position) = self.block.first_position() else {
            return Ok(());
        };
        let offset = self.bytes_written;
        let n = self
            .block
            .flush_to(&mut self.inner, &mut *self.compressor)?;
        self.index.add(first_position, offset);
        self.bytes_written += n as u64;
        Ok(())
    }

    /// Flushes the final block and writes the index.
    ///
    /// Calling this more than once has no further effect.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.flush()?;
        self.inner.flush()?;
        self.index.write(&mut self.index_writer)?;
        self.index_writer.flush()?;
        self.finished = true;
        debug!(
            "finished store: {} records in {} blocks, {} ref-minor positions",
            self.records_written,
            self.index.num_blocks(),
            self.index.num_ref_minors()
        );
        Ok(())
    }

    #[must_use]
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    #[must_use]
    pub fn ref_minor_count(&self) -> usize {
        self.index.num_ref_minors()
    }

    /// Number of blocks written so far
    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.index.num_blocks()
    }

    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}
impl<W: Write, I: Write> Drop for SaWriter<W, I> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!("SaWriter: failed to finish writing: {e}");
        }
    }
}
