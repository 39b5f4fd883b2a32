//! # Supplementary annotation store
//!
//! One store holds the supplementary annotations of a single chromosome as a pair of
//! files: the data file (`<chromosome>.nsa`) and its position index (`<chromosome>.nsa.idx`).
//!
//! ## Data file
//!
//! ```text
//! ┌──────────────────────┐
//! │      SaHeader        │ tag, versions, assembly, creation time, chromosome,
//! │                      │ data source versions
//! ├──────────────────────┤
//! │ Small variant ivals  │ count + {begin, end, payload}
//! │ SV intervals         │ count + {begin, end, payload}
//! │ All variant ivals    │ count + {begin, end, payload}
//! ├──────────────────────┤
//! │    Block Header      │ 16 bytes
//! ├──────────────────────┤
//! │  Compressed Block    │ Variable size
//! ├──────────────────────┤
//! │        ...           │ More blocks
//! └──────────────────────┘
//! ```
//!
//! Once decompressed, a block is a local directory of `(position, offset)` pairs
//! followed by the concatenated position records the directory points into.
//! Readers locate a record with two binary searches (index, then directory) and a
//! single decompression.
//!
//! ## Index file
//!
//! ```text
//! [magic][version][count]{first_position, data_offset}*[ref_minor_count]{delta}*
//! ```
//!
//! There is one index entry per block, so the index stays small enough to load whole.

mod core;
mod read;
mod write;

pub use core::{
    is_known_key, validate_key, BlockCompressor, BlockHeader, BlockRange, DataSourceVersion,
    GenomeAssembly, ReportFor, SaDataRecord, SaHeader, SaHeaderBuilder, SaIndex, SaInterval,
    SaIntervalLists, SaPosition, Zstandard, KNOWN_DATA_SOURCE_KEYS,
};
pub use read::{SaPositionIter, SaReader};
pub use write::{SaWriter, SaWriterBuilder};

/// The tag written at the start of every data file
pub const DATA_HEADER: &str = "NirvanaData";

/// Version of the annotation content
pub const DATA_VERSION: u16 = 38;

/// Version of the binary layout; readers reject any other value
pub const SCHEMA_VERSION: u16 = 22;

/// The magic bytes for compressed blocks
pub const BLOCK_MAGIC: &[u8; 4] = b"SABK";

/// The magic bytes for index files
pub const INDEX_MAGIC: &[u8; 5] = b"SAIDX";

/// The current index version
pub const INDEX_VERSION: u32 = 1;

/// The default uncompressed block size threshold
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

/// Upper bound on a block's compressed or uncompressed size
pub const MAX_BLOCK_BYTES: u32 = 1 << 30;

/// The default zstd compression level (0 selects the zstd default)
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 0;

/// Extension of data files
pub const DATA_FILE_EXTENSION: &str = "nsa";

/// Suffix appended to the data file path for its index
pub const INDEX_FILE_SUFFIX: &str = ".idx";
