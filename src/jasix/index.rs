use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use indexmap::IndexMap;

use super::{is_large_variant, VERSION};
use crate::error::FormatError;
use crate::interval::leftmost_candidate;
use crate::varint::{VarintRead, VarintWrite};
use crate::Result;

/// Span and file offset of one JSON position line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub start: u32,
    pub end: u32,
    pub file_offset: u64,
}
impl IndexEntry {
    #[must_use]
    pub fn overlaps(&self, begin: u32, end: u32) -> bool {
        self.start <= end && self.end >= begin
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_varint_u32(self.start)?;
        writer.write_varint_u32(self.end)?;
        writer.write_varint_u64(self.file_offset)?;
        Ok(())
    }

    fn read<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            start: reader.read_varint_u32()?,
            end: reader.read_varint_u32()?,
            file_offset: reader.read_varint_u64()?,
        })
    }
}

fn write_entries<W: Write>(writer: &mut W, entries: &[IndexEntry]) -> Result<()> {
    writer.write_varint_u64(entries.len() as u64)?;
    for entry in entries {
        entry.write(writer)?;
    }
    Ok(())
}

fn read_entries<R: Read>(reader: &mut R) -> Result<Vec<IndexEntry>> {
    let count = reader.read_varint_u64()?;
    let mut entries = Vec::new();
    for _ in 0..count {
        entries.push(IndexEntry::read(reader)?);
    }
    Ok(entries)
}

/// Index of one chromosome's position lines
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChrIndex {
    name: String,

    /// Every line, in file order
    entries: Vec<IndexEntry>,

    /// Running maximum of `end` over `entries`, derived and never persisted
    max_ends: Vec<u32>,

    /// Lines spanning more than the large variant threshold
    large_variants: Vec<IndexEntry>,
}
impl ChrIndex {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn num_large_variants(&self) -> usize {
        self.large_variants.len()
    }

    fn push_entry(&mut self, entry: IndexEntry) {
        let max = self.max_ends.last().map_or(entry.end, |m| (*m).max(entry.end));
        self.max_ends.push(max);
        self.entries.push(entry);
    }

    pub fn add(&mut self, start: u32, end: u32, file_offset: u64) {
        let entry = IndexEntry {
            start,
            end,
            file_offset,
        };
        if is_large_variant(start, end) {
            self.large_variants.push(entry);
        }
        self.push_entry(entry);
    }

    /// Offset of the first line overlapping `[begin, end]`
    #[must_use]
    pub fn find_first_small_variant(&self, begin: u32, end: u32) -> Option<u64> {
        let first = leftmost_candidate(self.entries.len(), begin, |i| self.max_ends[i]);
        self.entries[first..]
            .iter()
            .take_while(|entry| entry.start <= end)
            .find(|entry| entry.overlaps(begin, end))
            .map(|entry| entry.file_offset)
    }

    /// Offsets of every large variant overlapping `[begin, end]`
    #[must_use]
    pub fn find_large_variants(&self, begin: u32, end: u32) -> Vec<u64> {
        self.large_variants
            .iter()
            .filter(|entry| entry.overlaps(begin, end))
            .map(|entry| entry.file_offset)
            .collect()
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_ascii_string(&self.name)?;
        write_entries(writer, &self.entries)?;
        write_entries(writer, &self.large_variants)
    }

    fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut index = Self::new(reader.read_ascii_string()?);
        for entry in read_entries(reader)? {
            index.push_entry(entry);
        }
        index.large_variants = read_entries(reader)?;
        Ok(index)
    }
}

/// Per-chromosome line index of a JSON annotation file
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JasixIndex {
    header_line: String,

    /// Chromosomes in the order they appear in the file
    chromosomes: IndexMap<String, ChrIndex>,
}
impl JasixIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn header_line(&self) -> &str {
        &self.header_line
    }

    pub fn set_header_line(&mut self, header_line: impl Into<String>) {
        self.header_line = header_line.into();
    }

    pub fn add(&mut self, chromosome: &str, start: u32, end: u32, file_offset: u64) {
        if let Some(index) = self.chromosomes.get_mut(chromosome) {
            index.add(start, end, file_offset);
        } else {
            let mut index = ChrIndex::new(chromosome);
            index.add(start, end, file_offset);
            self.chromosomes.insert(chromosome.to_string(), index);
        }
    }

    #[must_use]
    pub fn chromosome(&self, name: &str) -> Option<&ChrIndex> {
        self.chromosomes.get(name)
    }

    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.chromosomes.keys().map(String::as_str)
    }

    #[must_use]
    pub fn find_first_small_variant(&self, chromosome: &str, begin: u32, end: u32) -> Option<u64> {
        self.chromosomes
            .get(chromosome)?
            .find_first_small_variant(begin, end)
    }

    #[must_use]
    pub fn find_large_variants(&self, chromosome: &str, begin: u32, end: u32) -> Vec<u64> {
        self.chromosomes
            .get(chromosome)
            .map(|index| index.find_large_variants(begin, end))
            .unwrap_or_default()
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_varint_u32(VERSION)?;
        writer.write_ascii_string(&self.header_line)?;
        writer.write_varint_u64(self.chromosomes.len() as u64)?;
        for index in self.chromosomes.values() {
            index.write(writer)?;
        }
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let version = reader.read_varint_u32()?;
        if version != VERSION {
            return Err(FormatError::IndexVersionMismatch {
                expected: VERSION,
                found: version,
            }
            .into());
        }
        let header_line = reader.read_ascii_string()?;
        let count = reader.read_varint_u64()?;
        let mut chromosomes = IndexMap::new();
        for _ in 0..count {
            let index = ChrIndex::read(reader)?;
            chromosomes.insert(index.name.clone(), index);
        }
        Ok(Self {
            header_line,
            chromosomes,
        })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read(&mut reader)
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
