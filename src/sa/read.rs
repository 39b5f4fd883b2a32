use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;

use super::core::{
    BlockCompressor, SaHeader, SaIndex, SaInterval, SaIntervalLists, SaPosition, SaReadBlock,
    Zstandard,
};
use super::INDEX_FILE_SUFFIX;
use crate::interval::IntervalArray;
use crate::Result;

/// Random-access reader for one chromosome's annotation store.
///
/// Lookups decompress at most one block; the most recent block and the most recent
/// position record are kept so that repeated and nearby lookups are cheap.
pub struct SaReader<R: Read + Seek> {
    inner: R,
    header: SaHeader,
    index: SaIndex,

    small_variant_intervals: IntervalArray<SaInterval>,
    sv_intervals: IntervalArray<SaInterval>,
    all_variant_intervals: IntervalArray<SaInterval>,

    /// Most recently decompressed block
    block: SaReadBlock,
    compressor: Box<dyn BlockCompressor + Send>,

    /// Most recently decoded record
    cached: Option<SaPosition>,
}
impl SaReader<BufReader<File>> {
    /// Opens `path` and its `.idx` companion
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut index_path = path.as_os_str().to_owned();
        index_path.push(INDEX_FILE_SUFFIX);

        let data = BufReader::new(File::open(path)?);
        let index = BufReader::new(File::open(index_path)?);
        Self::new(data, index)
    }
}
impl<R: Read + Seek> SaReader<R> {
    /// Reads the header, interval lists, and index.
    ///
    /// `inner` must be positioned at the start of the data stream.
    pub fn new<I: Read>(inner: R, index_reader: I) -> Result<Self> {
        Self::with_compressor(inner, index_reader, Box::new(Zstandard::default()))
    }

    /// Opens a store whose blocks were written with a custom block compressor
    pub fn with_compressor<I: Read>(
        mut inner: R,
        mut index_reader: I,
        compressor: Box<dyn BlockCompressor + Send>,
    ) -> Result<Self> {
        let header = SaHeader::read(&mut inner)?;
        let [small_variant_intervals, sv_intervals, all_variant_intervals] =
            SaIntervalLists::read_arrays(&mut inner)?;
        let index = SaIndex::read(&mut index_reader)?;
        debug!(
            "opened store for {}: {} blocks, {} intervals",
            header.chromosome,
            index.num_blocks(),
            small_variant_intervals.len() + sv_intervals.len() + all_variant_intervals.len()
        );

        Ok(Self {
            inner,
            header,
            index,
            small_variant_intervals,
            sv_intervals,
            all_variant_intervals,
            block: SaReadBlock::default(),
            compressor,
            cached: None,
        })
    }

    #[must_use]
    pub fn header(&self) -> &SaHeader {
        &self.header
    }

    #[must_use]
    pub fn index(&self) -> &SaIndex {
        &self.index
    }

    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.index.num_blocks()
    }

    #[must_use]
    pub fn small_variant_intervals(&self) -> &IntervalArray<SaInterval> {
        &self.small_variant_intervals
    }

    #[must_use]
    pub fn sv_intervals(&self) -> &IntervalArray<SaInterval> {
        &self.sv_intervals
    }

    #[must_use]
    pub fn all_variant_intervals(&self) -> &IntervalArray<SaInterval> {
        &self.all_variant_intervals
    }

    /// Answered from the index alone
    #[must_use]
    pub fn is_ref_minor(&self, position: u32) -> bool {
        self.index.is_ref_minor(position)
    }

    fn load_block(&mut self, offset: u64) -> Result<()> {
        if self.block.offset() == Some(offset) {
            return Ok(());
        }
        self.inner.seek(SeekFrom::Start(offset))?;
        self.block
            .read_from(&mut self.inner, offset, &mut *self.compressor)
    }

    /// Returns the annotations at `position`, or `None` if nothing was written there
    pub fn get_annotation(&mut self, position: u32) -> Result<Option<&SaPosition>> {
        if self
            .cached
            .as_ref()
            .is_some_and(|cached| cached.position == position)
        {
            return Ok(self.cached.as_ref());
        }

        let Some(offset) = self.index.get_offset(position) else {
            return Ok(None);
        };
        self.load_block(offset)?;
        let Some(slot) = self.block.find(position) else {
            return Ok(None);
        };
        self.cached = Some(self.block.decode(slot)?);
        Ok(self.cached.as_ref())
    }

    /// Iterates every record of the store in position order
    pub fn positions(&mut self) -> SaPositionIter<'_, R> {
        SaPositionIter {
            reader: self,
            block_idx: 0,
            slot: 0,
        }
    }
}

/// Sequential iterator over all records of a store
pub struct SaPositionIter<'a, R: Read + Seek> {
    reader: &'a mut SaReader<R>,
    block_idx: usize,
    slot: usize,
}
impl<R: Read + Seek> Iterator for SaPositionIter<'_, R> {
    type Item = Result<SaPosition>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let range = self.reader.index.iter_blocks().nth(self.block_idx)?;
            if let Err(e) = self.reader.load_block(range.offset) {
                // a broken block ends the iteration
                self.block_idx = usize::MAX;
                return Some(Err(e));
            }
            if self.slot < self.reader.block.num_records() {
                let record = self.reader.block.decode(self.slot);
                self.slot += 1;
                return Some(record);
            }
            self.block_idx += 1;
            self.slot = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::error::FormatError;
    use crate::sa::{DataSourceVersion, GenomeAssembly, ReportFor, SaWriter, SaWriterBuilder};
    use crate::Error;

    fn header() -> SaHeader {
        SaHeader::builder("chr7")
            .assembly(GenomeAssembly::GRCh37)
            .creation_ticks(42)
            .data_source(DataSourceVersion::new("gnomAD", "2.1", "allele frequencies", 7))
            .build()
    }

    fn intervals() -> SaIntervalLists {
        let interval = |start, end, report_for| SaInterval {
            key_name: "clingen".to_string(),
            reference_name: "chr7".to_string(),
            start,
            end,
            report_for,
            json: "{}".to_string(),
        };
        SaIntervalLists::from_intervals(vec![
            interval(1_000, 2_000, ReportFor::SmallVariants),
            interval(3_000, 3_500, ReportFor::SmallVariants),
            interval(500, 90_000, ReportFor::StructuralVariants),
        ])
    }

    fn position(pos: u32) -> SaPosition {
        let mut position = SaPosition::new(pos);
        position.is_ref_minor = pos % 7 == 0;
        if pos % 3 == 0 {
            position.global_major_allele = Some("G".to_string());
        }
        position.push_entry("gnomad", format!("{{\"allAf\":0.{pos}}}"));
        if pos % 2 == 0 {
            position.push_entry("dbsnp", format!("{{\"ids\":[\"rs{pos}\"]}}"));
        }
        position
    }

    fn build_store(positions: &[u32], block_size: usize) -> (Vec<u8>, Vec<u8>) {
        let mut data = Vec::new();
        let mut index = Vec::new();
        let mut writer = SaWriterBuilder::default()
            .block_size(block_size)
            .build(&mut data, &mut index, &header(), &intervals())
            .unwrap();
        for pos in positions {
            writer.write(position(*pos)).unwrap();
        }
        writer.finish().unwrap();
        drop(writer);
        (data, index)
    }

    fn open(data: Vec<u8>, index: &[u8]) -> SaReader<Cursor<Vec<u8>>> {
        SaReader::new(Cursor::new(data), index).unwrap()
    }

    #[test]
    fn test_round_trip_across_blocks() {
        let positions: Vec<u32> = (1..=500).map(|i| i * 13).collect();
        let (data, index) = build_store(&positions, 256);
        let mut reader = open(data, &index);
        assert!(reader.num_blocks() > 2);
        assert_eq!(reader.header(), &header());

        for pos in &positions {
            let record = reader.get_annotation(*pos).unwrap().unwrap();
            assert_eq!(record, &position(*pos));
        }
        for pos in &positions {
            assert_eq!(reader.is_ref_minor(*pos), pos % 7 == 0);
        }
    }

    #[test]
    fn test_unwritten_positions_are_none() {
        let positions: Vec<u32> = (1..=100).map(|i| i * 10).collect();
        let (data, index) = build_store(&positions, 128);
        let mut reader = open(data, &index);

        assert!(reader.get_annotation(0).unwrap().is_none());
        assert!(reader.get_annotation(5).unwrap().is_none());
        assert!(reader.get_annotation(15).unwrap().is_none());
        assert!(reader.get_annotation(1_001).unwrap().is_none());
        assert!(reader.get_annotation(1_000).unwrap().is_some());
    }

    #[test]
    fn test_repeated_lookup_hits_cache() {
        let (data, index) = build_store(&[100, 200], 1 << 20);
        let mut reader = open(data, &index);
        let first = reader.get_annotation(100).unwrap().cloned();
        let second = reader.get_annotation(100).unwrap().cloned();
        assert_eq!(first, second);
        assert_eq!(first, Some(position(100)));
    }

    #[test]
    fn test_empty_store() {
        let (data, index) = build_store(&[], 1 << 20);
        let mut reader = open(data, &index);
        assert_eq!(reader.num_blocks(), 0);
        assert!(reader.get_annotation(1).unwrap().is_none());
        assert_eq!(reader.positions().count(), 0);
    }

    #[test]
    fn test_intervals_are_restored() {
        let (data, index) = build_store(&[1], 1 << 20);
        let reader = open(data, &index);
        assert_eq!(reader.small_variant_intervals().len(), 2);
        assert_eq!(reader.sv_intervals().len(), 1);
        assert!(reader.all_variant_intervals().is_empty());
        assert!(reader.sv_intervals().overlaps_any(60_000, 60_010));
        assert!(!reader.small_variant_intervals().overlaps_any(2_001, 2_999));
    }

    #[test]
    fn test_positions_iterates_in_order() {
        let positions: Vec<u32> = (1..=300).map(|i| i * 3).collect();
        let (data, index) = build_store(&positions, 200);
        let mut reader = open(data, &index);
        let observed: Vec<u32> = reader
            .positions()
            .map(|record| record.unwrap().position)
            .collect();
        assert_eq!(observed, positions);
    }

    #[test]
    fn test_header_mismatch_on_open() {
        let (mut data, index) = build_store(&[1], 1 << 20);
        data[1] = b'X';
        let result = SaReader::new(Cursor::new(data), index.as_slice());
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::HeaderMismatch { .. }))
        ));
    }

    #[test]
    fn test_corrupt_block_is_reported() {
        let (mut data, index) = build_store(&[10, 20, 30], 1 << 20);
        let block = SaIndex::read(&mut index.as_slice())
            .unwrap()
            .iter_blocks()
            .next()
            .unwrap();
        let payload_start = block.offset as usize + size_of::<crate::sa::BlockHeader>();
        data[payload_start..].iter_mut().for_each(|b| *b = 0xAB);
        let mut reader = open(data, &index);
        let result = reader.get_annotation(20);
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::CorruptBlock { .. }))
        ));
    }

    /// Stores blocks uncompressed
    struct Identity;
    impl BlockCompressor for Identity {
        fn compress(&mut self, src: &[u8], dst: &mut Vec<u8>) -> std::io::Result<()> {
            dst.clear();
            dst.extend_from_slice(src);
            Ok(())
        }

        fn decompress(&mut self, src: &[u8], dst: &mut [u8]) -> std::io::Result<usize> {
            let out = dst
                .get_mut(..src.len())
                .ok_or_else(|| std::io::Error::other("output buffer too small"))?;
            out.copy_from_slice(src);
            Ok(src.len())
        }
    }

    #[test]
    fn test_custom_compressor_round_trip() {
        let positions: Vec<u32> = (1..=120).map(|i| i * 5).collect();
        let mut data = Vec::new();
        let mut index = Vec::new();
        let mut writer = SaWriter::with_compressor(
            &mut data,
            &mut index,
            &header(),
            &intervals(),
            256,
            Box::new(Identity),
        )
        .unwrap();
        for pos in &positions {
            writer.write(position(*pos)).unwrap();
        }
        writer.finish().unwrap();
        drop(writer);

        let mut reader =
            SaReader::with_compressor(Cursor::new(data), index.as_slice(), Box::new(Identity))
                .unwrap();
        assert!(reader.num_blocks() > 1);
        for pos in &positions {
            assert_eq!(reader.get_annotation(*pos).unwrap(), Some(&position(*pos)));
        }
        assert!(reader.get_annotation(7).unwrap().is_none());
    }
}
