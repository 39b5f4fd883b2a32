use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::Path;
use std::str::FromStr;

use log::error;
use serde::Deserialize;

use super::{is_large_variant, JasixIndex, FILE_EXTENSION, SECTION_TO_INDEX};
use crate::error::QueryError;
use crate::Result;

/// A genomic range `chromosome:begin-end`, both ends inclusive
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    pub chromosome: String,
    pub begin: u32,
    pub end: u32,
}
impl Query {
    /// Parses `chr`, `chr:pos` or `chr:begin-end`.
    ///
    /// A bare chromosome covers the whole chromosome. A missing end, or an end before
    /// `begin`, selects the single position `begin`.
    pub fn parse(query: &str) -> Result<Self> {
        let invalid = || QueryError::InvalidQuery(query.to_string());
        let query = query.trim();
        let (chromosome, range) = match query.split_once(':') {
            Some((chromosome, range)) => (chromosome, Some(range)),
            None => (query, None),
        };
        if chromosome.is_empty() {
            return Err(invalid().into());
        }

        let parse_pos = |s: &str| s.trim().replace(',', "").parse::<u32>().map_err(|_| invalid());
        let (begin, end) = match range {
            None => (1, u32::MAX),
            Some(range) => match range.split_once('-') {
                None => {
                    let pos = parse_pos(range)?;
                    (pos, pos)
                }
                Some((begin, end)) => {
                    let begin = parse_pos(begin)?;
                    let end = if end.trim().is_empty() { begin } else { parse_pos(end)? };
                    (begin, end.max(begin))
                }
            },
        };

        Ok(Self {
            chromosome: chromosome.to_string(),
            begin,
            end,
        })
    }
}
impl FromStr for Query {
    type Err = crate::Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chromosome, self.begin, self.end)
    }
}

/// The fields of a position line needed to place it on the genome
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JsonPosition {
    pub chromosome: String,
    pub position: u32,
    #[serde(default)]
    pub ref_allele: Option<String>,
    #[serde(default)]
    pub alt_alleles: Vec<String>,
    #[serde(default)]
    pub sv_end: Option<u32>,
}
impl JsonPosition {
    /// Decodes one position line, the trailing separator already removed
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line).map_err(|source| {
            error!("Error in line:\n{line}");
            QueryError::MalformedLine {
                line: line.to_string(),
                source,
            }
            .into()
        })
    }

    #[must_use]
    pub fn start(&self) -> u32 {
        self.position
    }

    /// `svEnd` when present, otherwise the last base covered by the reference allele
    #[must_use]
    pub fn end(&self) -> u32 {
        match self.sv_end {
            Some(end) if end > 0 => end,
            _ => {
                let len = self.ref_allele.as_ref().map_or(1, |r| r.len().max(1));
                let len = u32::try_from(len).unwrap_or(u32::MAX);
                self.position.saturating_add(len - 1)
            }
        }
    }

    #[must_use]
    pub fn overlaps(&self, begin: u32, end: u32) -> bool {
        self.start() <= end && self.end() >= begin
    }
}

/// Reads one line, dropping the line terminator and any trailing `,`.
///
/// Returns false at the end of the stream.
fn read_entry_line<R: BufRead>(reader: &mut R, line: &mut String) -> Result<bool> {
    line.clear();
    if reader.read_line(line)? == 0 {
        return Ok(false);
    }
    let trimmed = line.trim_end_matches(['\n', '\r']).trim_end_matches(',').len();
    line.truncate(trimmed);
    Ok(true)
}

/// Lines of large variants that start before a query and extend into it
pub struct LargeVariantLines<'a, R: BufRead + Seek> {
    reader: &'a mut R,
    offsets: std::vec::IntoIter<u64>,
}
impl<R: BufRead + Seek> Iterator for LargeVariantLines<'_, R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        for offset in self.offsets.by_ref() {
            let mut line = String::new();
            let read = self
                .reader
                .seek(SeekFrom::Start(offset))
                .map_err(Into::into)
                .and_then(|_| read_entry_line(self.reader, &mut line));
            match read {
                Ok(true) => return Some(Ok(line)),
                Ok(false) => {}
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}

/// Lines overlapping a query, scanned forward from the first indexed overlap
pub struct OverlappingLines<'a, R: BufRead + Seek> {
    reader: &'a mut R,
    query: Query,
    done: bool,
}
impl<R: BufRead + Seek> OverlappingLines<'_, R> {
    fn next_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        loop {
            if !read_entry_line(self.reader, &mut line)? || line.starts_with(']') {
                return Ok(None);
            }
            let entry = JsonPosition::parse(&line)?;
            if entry.chromosome != self.query.chromosome || entry.start() > self.query.end {
                return Ok(None);
            }
            if !entry.overlaps(self.query.begin, self.query.end) {
                continue;
            }
            // already reported as extending into the query
            if is_large_variant(entry.start(), entry.end()) && entry.start() < self.query.begin {
                continue;
            }
            return Ok(Some(line));
        }
    }
}
impl<R: BufRead + Seek> Iterator for OverlappingLines<'_, R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let next = self.next_line();
        if !matches!(next, Ok(Some(_))) {
            self.done = true;
        }
        next.transpose()
    }
}

/// Answers range queries over an indexed JSON annotation file
pub struct QueryProcessor<R: BufRead + Seek> {
    reader: R,
    index: JasixIndex,
}
impl QueryProcessor<BufReader<File>> {
    /// Opens a JSON file and its index; the index path defaults to `<json>.jsi`
    pub fn from_paths<P: AsRef<Path>, Q: AsRef<Path>>(
        json_path: P,
        index_path: Option<Q>,
    ) -> Result<Self> {
        let index = match index_path {
            Some(path) => JasixIndex::from_path(path)?,
            None => {
                let mut path = json_path.as_ref().as_os_str().to_owned();
                path.push(FILE_EXTENSION);
                JasixIndex::from_path(path)?
            }
        };
        let reader = BufReader::new(File::open(json_path)?);
        Ok(Self::new(reader, index))
    }
}
impl<R: BufRead + Seek> QueryProcessor<R> {
    pub fn new(reader: R, index: JasixIndex) -> Self {
        Self { reader, index }
    }

    #[must_use]
    pub fn index(&self) -> &JasixIndex {
        &self.index
    }

    #[must_use]
    pub fn header_line(&self) -> &str {
        self.index.header_line()
    }

    pub fn print_chromosome_list<W: Write>(&self, out: &mut W) -> Result<()> {
        for chromosome in self.index.chromosomes() {
            writeln!(out, "{chromosome}")?;
        }
        Ok(())
    }

    pub fn print_header<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "{{{}}}", self.index.header_line())?;
        Ok(())
    }

    /// Large variants starting before `query.begin` that reach into the query
    pub fn large_variants_extending_into(&mut self, query: &Query) -> LargeVariantLines<'_, R> {
        let offsets = match query.begin.checked_sub(1) {
            Some(before) => self
                .index
                .find_large_variants(&query.chromosome, query.begin, before),
            None => Vec::new(),
        };
        LargeVariantLines {
            reader: &mut self.reader,
            offsets: offsets.into_iter(),
        }
    }

    /// Lines overlapping the query that were not reported by
    /// [`large_variants_extending_into`](Self::large_variants_extending_into)
    pub fn overlapping_lines(&mut self, query: &Query) -> Result<OverlappingLines<'_, R>> {
        let first = self
            .index
            .find_first_small_variant(&query.chromosome, query.begin, query.end);
        if let Some(offset) = first {
            self.reader.seek(SeekFrom::Start(offset))?;
        }
        Ok(OverlappingLines {
            reader: &mut self.reader,
            query: query.clone(),
            done: first.is_none(),
        })
    }

    /// Writes every line overlapping `query` as one JSON object
    pub fn process_query<W: Write>(
        &mut self,
        query: &str,
        print_header: bool,
        out: &mut W,
    ) -> Result<()> {
        let query = Query::parse(query)?;

        out.write_all(b"{")?;
        if print_header {
            write!(out, "{},", self.index.header_line())?;
        }
        writeln!(out, "\"{SECTION_TO_INDEX}\":[")?;

        let mut need_comma = false;
        let mut print_entry = |out: &mut W, line: &str| -> Result<()> {
            if need_comma {
                out.write_all(b",\n")?;
            }
            out.write_all(line.as_bytes())?;
            need_comma = true;
            Ok(())
        };
        for line in self.large_variants_extending_into(&query) {
            print_entry(&mut *out, &line?)?;
        }
        for line in self.overlapping_lines(&query)? {
            print_entry(&mut *out, &line?)?;
        }

        out.write_all(b"\n]}\n")?;
        Ok(())
    }
}
