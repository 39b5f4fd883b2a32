//! # sastore
//!
//! Random-access storage for per-chromosome genomic annotations.
//!
//! * [`sa`] reads and writes block-compressed annotation stores (`.nsa` with an
//!   `.nsa.idx` position index).
//! * [`merge`] builds those stores from many position-sorted upstream sources.
//! * [`jasix`] indexes line-oriented JSON annotation output for range queries.
//! * [`interval`] and [`varint`] are the search structure and wire codec they share.

pub mod error;
pub mod interval;
pub mod jasix;
pub mod merge;
pub mod sa;
pub mod varint;

pub use error::{Error, IntoSaError, Result};
