mod block;
mod compress;
mod header;
mod index;
mod interval;
mod keys;
mod position;

pub use block::{BlockHeader, SaReadBlock, SaWriteBlock};
pub use compress::{BlockCompressor, Zstandard};
pub use header::{DataSourceVersion, GenomeAssembly, SaHeader, SaHeaderBuilder};
pub use index::{BlockRange, SaIndex};
pub use interval::{ReportFor, SaInterval, SaIntervalLists};
pub use keys::{is_known_key, validate_key, KNOWN_DATA_SOURCE_KEYS};
pub use position::{SaDataRecord, SaPosition};

use super::{
    BLOCK_MAGIC, DATA_HEADER, DATA_VERSION, DEFAULT_COMPRESSION_LEVEL, INDEX_MAGIC,
    INDEX_VERSION, MAX_BLOCK_BYTES, SCHEMA_VERSION,
};
