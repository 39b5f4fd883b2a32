//! # JSON position index
//!
//! Annotated output is a JSON document with one position object per line inside its
//! `"positions"` array:
//!
//! ```text
//! {"header":{...},"positions":[
//! {"chromosome":"chr1","position":100,"refAllele":"A","altAlleles":["G"]},
//! {"chromosome":"chr1","position":180,"refAllele":"C","altAlleles":["<DEL>"],"svEnd":5000}
//! ]}
//! ```
//!
//! The index records, per chromosome, the `[start, end]` span and byte offset of every
//! position line. Range queries seek straight to the first overlapping line instead of
//! scanning the whole file. Lines spanning more than [`LARGE_VARIANT_THRESHOLD`] bases
//! are additionally kept in a separate list, since a forward scan that starts at the
//! first overlap can never reach a large variant starting before that point.

mod creator;
mod index;
mod query;

pub use creator::IndexCreator;
pub use index::{ChrIndex, IndexEntry, JasixIndex};
pub use query::{JsonPosition, LargeVariantLines, OverlappingLines, Query, QueryProcessor};

/// Current version of the index file
pub const VERSION: u32 = 1;

/// The JSON array whose lines are indexed
pub const SECTION_TO_INDEX: &str = "positions";

/// Extension appended to the JSON path for its index
pub const FILE_EXTENSION: &str = ".jsi";

/// Spans longer than this many bases are large variants
pub const LARGE_VARIANT_THRESHOLD: u32 = 50;

#[must_use]
pub fn is_large_variant(start: u32, end: u32) -> bool {
    end.saturating_sub(start) > LARGE_VARIANT_THRESHOLD
}
