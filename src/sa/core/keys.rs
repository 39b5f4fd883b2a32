use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::Result;
use crate::error::UnknownFieldError;

/// Data source keys accepted inside position records.
///
/// Decoding fails closed on anything else so that format drift is caught early.
pub static KNOWN_DATA_SOURCE_KEYS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "dbsnp",
        "globalAllele",
        "oneKg",
        "exac",
        "gnomad",
        "gnomadExome",
        "evs",
        "topmed",
        "clinvar",
        "cosmic",
        "mitomap",
        "clingen",
        "dgv",
        "customAnnotation",
    ]
    .into_iter()
    .collect()
});

#[must_use]
pub fn is_known_key(key: &str) -> bool {
    KNOWN_DATA_SOURCE_KEYS.contains(key)
}

pub fn validate_key(key: &str) -> Result<()> {
    if is_known_key(key) {
        Ok(())
    } else {
        Err(UnknownFieldError::DataSourceKey(key.to_string()).into())
    }
}
