use std::fmt;

use super::cursor::Keyed;
use crate::sa::{DataSourceVersion, GenomeAssembly, SaPosition};

/// Version information announced by an upstream source
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterimHeader {
    pub name: String,
    pub version: String,
    pub description: String,

    /// Release date in 100 ns ticks since the Unix epoch
    pub release_date: i64,
    pub assembly: GenomeAssembly,
}
impl InterimHeader {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        release_date: i64,
        assembly: GenomeAssembly,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
            release_date,
            assembly,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn data_source_version(&self) -> DataSourceVersion {
        DataSourceVersion::new(
            self.name.clone(),
            self.version.clone(),
            self.description.clone(),
            self.release_date,
        )
    }
}
impl fmt::Display for InterimHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<24} {:<13} {:<21} {}",
            self.name, self.version, self.release_date, self.assembly
        )
    }
}

/// One data source's annotation of one allele at a position
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaAnnotationItem {
    /// Data source key the JSON is filed under
    pub key_name: String,
    pub chromosome: String,
    pub position: u32,
    pub json: String,
}

/// Population-level facts about a position
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaMiscellany {
    pub chromosome: String,
    pub position: u32,
    pub global_major_allele: Option<String>,
    pub is_ref_minor: bool,
}

/// Any item that can be merged into a position record
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InterimSaItem {
    Annotation(SaAnnotationItem),
    Miscellany(SaMiscellany),
}
impl InterimSaItem {
    pub fn annotation(
        key_name: impl Into<String>,
        chromosome: impl Into<String>,
        position: u32,
        json: impl Into<String>,
    ) -> Self {
        Self::Annotation(SaAnnotationItem {
            key_name: key_name.into(),
            chromosome: chromosome.into(),
            position,
            json: json.into(),
        })
    }

    pub fn miscellany(
        chromosome: impl Into<String>,
        position: u32,
        global_major_allele: Option<String>,
        is_ref_minor: bool,
    ) -> Self {
        Self::Miscellany(SaMiscellany {
            chromosome: chromosome.into(),
            position,
            global_major_allele,
            is_ref_minor,
        })
    }

    #[must_use]
    pub fn chromosome(&self) -> &str {
        match self {
            Self::Annotation(item) => &item.chromosome,
            Self::Miscellany(item) => &item.chromosome,
        }
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        match self {
            Self::Annotation(item) => item.position,
            Self::Miscellany(item) => item.position,
        }
    }

    /// Folds this item into the record for its position
    pub fn apply_to(self, record: &mut SaPosition) {
        match self {
            Self::Annotation(item) => record.push_entry(&item.key_name, item.json),
            Self::Miscellany(item) => {
                record.is_ref_minor |= item.is_ref_minor;
                if item.global_major_allele.is_some() {
                    record.global_major_allele = item.global_major_allele;
                }
            }
        }
    }
}
impl Keyed for InterimSaItem {
    fn key(&self) -> u32 {
        self.position()
    }
}

/// Builds the record for one merged group
pub fn merge_group(position: u32, items: Vec<InterimSaItem>) -> SaPosition {
    let mut record = SaPosition::new(position);
    for item in items {
        item.apply_to(&mut record);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_group() {
        let record = merge_group(
            100,
            vec![
                InterimSaItem::annotation("dbsnp", "1", 100, "{\"id\":\"rs1\"}"),
                InterimSaItem::annotation("clinvar", "1", 100, "{\"id\":\"RCV1\"}"),
                InterimSaItem::annotation("dbsnp", "1", 100, "{\"id\":\"rs2\"}"),
                InterimSaItem::miscellany("1", 100, Some("C".to_string()), true),
            ],
        );
        assert_eq!(record.position, 100);
        assert!(record.is_ref_minor);
        assert_eq!(record.global_major_allele.as_deref(), Some("C"));
        assert_eq!(record.records.len(), 2);
        assert_eq!(record.record("dbsnp").unwrap().entries.len(), 2);
    }

    #[test]
    fn test_miscellany_without_allele_keeps_existing() {
        let mut record = SaPosition::new(5);
        record.global_major_allele = Some("A".to_string());
        InterimSaItem::miscellany("1", 5, None, false).apply_to(&mut record);
        assert_eq!(record.global_major_allele.as_deref(), Some("A"));
        assert!(!record.is_ref_minor);
    }

    #[test]
    fn test_header_version() {
        let header = InterimHeader::new("ClinVar", "20180101", 99, GenomeAssembly::GRCh37)
            .description("clinical significance");
        let version = header.data_source_version();
        assert_eq!(version.name, "ClinVar");
        assert_eq!(version.description, "clinical significance");
        assert!(header.to_string().contains("GRCh37"));
    }
}
