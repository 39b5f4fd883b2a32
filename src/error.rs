use std::error::Error as StdError;

use crate::sa::GenomeAssembly;

/// Custom Result type for sastore operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the sastore library, encompassing all possible error cases
/// that can occur while building or querying annotation stores and JSON indexes.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Malformed or incompatible on-disk data
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Input sources that disagree with each other
    #[error("Consistency error: {0}")]
    Consistency(#[from] ConsistencyError),

    /// An unrecognized key appeared in a structured record
    #[error("Unknown field: {0}")]
    UnknownField(#[from] UnknownFieldError),

    /// Errors that occur during write operations
    #[error("Error writing annotations: {0}")]
    Write(#[from] WriteError),

    /// Errors raised while answering a range query
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Errors raised by the merge builder
    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    /// Standard I/O errors, propagated unchanged
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic errors for other unexpected situations
    #[error("Generic error: {0}")]
    Generic(#[from] Box<dyn StdError + Send + Sync>),
}
impl Error {
    /// Checks if the error is fatal to the file being read, as opposed to a problem
    /// with the caller's input (query strings, unsorted records).
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::Format(_) | Self::UnknownField(_))
    }
}

/// Errors raised while decoding binary data
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    /// A varint ran past the maximum number of 7-bit groups for its width
    #[error("Varint exceeds the maximum length for a {bits}-bit integer")]
    VarintOverflow { bits: u32 },

    /// A string declared as ASCII carried non-ASCII bytes
    #[error("Expected an ASCII string but found non-ASCII bytes")]
    InvalidAscii,

    /// A string declared as UTF-8 was not valid UTF-8
    #[error("Invalid UTF-8 string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The data file header does not identify a supported annotation store
    #[error(
        "The header check failed for the annotation file: tag: expected {expected_tag} found {found_tag}, schema version: expected {expected_schema} found {found_schema}"
    )]
    HeaderMismatch {
        expected_tag: &'static str,
        found_tag: String,
        expected_schema: u16,
        found_schema: u16,
    },

    /// The index stream did not begin with the expected magic bytes
    #[error("Invalid index magic found")]
    InvalidIndexMagic,

    /// The index was written by an incompatible version
    #[error("Invalid index version: found {found}, expected {expected}")]
    IndexVersionMismatch { expected: u32, found: u32 },

    /// A block header did not carry the expected magic bytes
    #[error("Invalid block magic found at byte offset {0}")]
    InvalidBlockMagic(u64),

    /// A block could not be decompressed or decoded
    #[error("Corrupt block at byte offset {offset}: {reason}")]
    CorruptBlock { offset: u64, reason: String },

    /// An enum discriminant outside of the known range
    #[error("Unknown {kind} value: {value}")]
    UnknownEnumValue { kind: &'static str, value: u8 },
}

/// Errors raised when independently produced inputs disagree
#[derive(thiserror::Error, Debug)]
pub enum ConsistencyError {
    /// Two sources were built against different genome assemblies
    #[error(
        "The genome assembly for all data sources should be the same. Found {found} in {source_name} but expected {expected}"
    )]
    AssemblyMismatch {
        expected: GenomeAssembly,
        found: GenomeAssembly,
        source_name: String,
    },

    /// A source did not provide its version header
    #[error("Data source #{0} lacks version information")]
    MissingVersion(usize),

    /// A cursor yielded keys in descending order
    #[error("Input for {chromosome} is not sorted: position {current} follows {previous}")]
    UnsortedInput {
        chromosome: String,
        previous: u32,
        current: u32,
    },
}

/// An unrecognized key or field in a structured record
#[derive(thiserror::Error, Debug)]
pub enum UnknownFieldError {
    /// A data source key that is not part of the known key set
    #[error("Unknown data source key: {0}")]
    DataSourceKey(String),

    /// A reporting classification that is not part of the known set
    #[error("Unknown reporting classification: {0}")]
    ReportFor(String),

    /// A genome assembly name that is not recognized
    #[error("Unknown genome assembly: {0}")]
    Assembly(String),
}

/// Errors that can occur while writing annotation stores
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// Positions must be strictly ascending within one store
    #[error("Position {current} was written after position {previous}")]
    PositionOutOfOrder { previous: u32, current: u32 },

    /// A single record exceeded the addressable size of a block
    #[error("Encountered a record of {0} bytes which does not fit in a block")]
    RecordTooLarge(usize),

    /// Attempted to write after the writer was finished
    #[error("Cannot write to a finished writer")]
    AlreadyFinished,
}

/// Errors raised while parsing or answering range queries
#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    /// The query string could not be parsed
    #[error("Invalid query: {0} - expected chromosome[:begin[-end]]")]
    InvalidQuery(String),

    /// A line of the indexed JSON file could not be decoded
    #[error("Error in line: {line}")]
    MalformedLine {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    /// The JSON file does not start with a recognizable header line
    #[error("Missing header line in JSON input")]
    MissingHeader,
}

/// Errors raised by the merge builder
#[derive(thiserror::Error, Debug)]
pub enum MergeError {
    /// One or more chromosome jobs failed
    #[error("{} chromosome job(s) failed: {}", failed.len(), failed.iter().map(|(chr, msg)| format!("{chr} ({msg})")).collect::<Vec<_>>().join(", "))]
    JobsFailed { failed: Vec<(String, String)> },

    /// A worker thread panicked
    #[error("A merge worker thread panicked")]
    WorkerPanicked,

    /// The builder was not given an output directory
    #[error("Missing output directory in merge builder")]
    MissingOutputDirectory,
}

/// Trait for converting arbitrary errors into `Error`
pub trait IntoSaError {
    fn into_sa_error(self) -> Error;
}

impl<E> IntoSaError for E
where
    E: StdError + Send + Sync + 'static,
{
    fn into_sa_error(self) -> Error {
        Error::Generic(Box::new(self))
    }
}
