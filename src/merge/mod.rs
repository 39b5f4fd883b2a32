//! # Merging upstream sources into annotation stores
//!
//! Each upstream source produces position-sorted items per chromosome. For every
//! chromosome the sources are merged with a k-way merge, items sharing a position
//! are folded into one [`SaPosition`](crate::sa::SaPosition), and the result is
//! written to `{chromosome}.nsa` with its `.nsa.idx` companion.
//!
//! Chromosomes are independent, so they are merged concurrently on a bounded pool
//! of worker threads.
//!
//! ```rust,no_run
//! use sastore::merge::{ChromosomeRenamer, InterimHeader, InterimSaItem, MemorySource, MergeBuilder};
//! use sastore::sa::GenomeAssembly;
//!
//! let header = InterimHeader::new("dbSNP", "151", 0, GenomeAssembly::GRCh37);
//! let source = MemorySource::new(Some(header))
//!     .with_items("1", [InterimSaItem::annotation("dbsnp", "1", 10_177, "{\"id\":\"rs367896724\"}")]);
//!
//! let summaries = MergeBuilder::new()
//!     .annotation_source(source)
//!     .renamer(ChromosomeRenamer::human())
//!     .output_dir("annotations")
//!     .build()?
//!     .merge()?;
//! for summary in summaries {
//!     println!("{summary}");
//! }
//! # Ok::<(), sastore::Error>(())
//! ```

mod builder;
mod cursor;
mod item;
mod renamer;
mod source;

pub use builder::{ChromosomeSummary, FailurePolicy, MergeBuilder, SaMerger, DEFAULT_NUM_THREADS};
pub use cursor::{Cursor, KWayMerge, Keyed};
pub use item::{merge_group, InterimHeader, InterimSaItem, SaAnnotationItem, SaMiscellany};
pub use renamer::ChromosomeRenamer;
pub use source::{IntervalSource, ItemIter, MemorySource, SaItemSource};
