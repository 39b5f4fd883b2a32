use std::io::BufRead;

use log::debug;

use super::{JasixIndex, JsonPosition, SECTION_TO_INDEX};
use crate::error::QueryError;
use crate::Result;

/// Builds a [`JasixIndex`] in one forward pass over a JSON annotation file.
///
/// The file must start with a header line that opens the positions array, followed by
/// one position object per line.
pub struct IndexCreator<R: BufRead> {
    reader: R,
}
impl<R: BufRead> IndexCreator<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Extracts the header object from the opening line
    fn header_line(line: &str) -> Option<String> {
        let opening = format!("\"{SECTION_TO_INDEX}\":[");
        let header = line
            .trim_end()
            .strip_prefix('{')?
            .strip_suffix(opening.as_str())?
            .trim_end_matches(',');
        Some(header.to_string())
    }

    pub fn create(mut self) -> Result<JasixIndex> {
        let mut index = JasixIndex::new();
        let mut line = String::new();

        let mut offset = self.reader.read_line(&mut line)? as u64;
        let header = Self::header_line(&line).ok_or(QueryError::MissingHeader)?;
        index.set_header_line(header);

        let mut num_lines = 0usize;
        loop {
            line.clear();
            let n = self.reader.read_line(&mut line)?;
            if n == 0 {
                break;
            }
            let entry_line = line.trim_end_matches(['\n', '\r']).trim_end_matches(',');
            if entry_line.starts_with(']') {
                break;
            }
            if !entry_line.is_empty() {
                let entry = JsonPosition::parse(entry_line)?;
                index.add(&entry.chromosome, entry.start(), entry.end(), offset);
                num_lines += 1;
            }
            offset += n as u64;
        }

        debug!(
            "indexed {num_lines} position lines over {} chromosomes",
            index.chromosomes().count()
        );
        Ok(index)
    }
}
