use std::collections::BTreeSet;
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{DATA_HEADER, DATA_VERSION, SCHEMA_VERSION};
use crate::error::{FormatError, UnknownFieldError};
use crate::varint::{VarintRead, VarintWrite};
use crate::Result;

/// Reference genome assembly a store was built against
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum GenomeAssembly {
    #[default]
    Unknown = 0,
    GRCh37 = 1,
    GRCh38 = 2,
    Hg19 = 3,
    RCrs = 4,
}
impl GenomeAssembly {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::GRCh37 => "GRCh37",
            Self::GRCh38 => "GRCh38",
            Self::Hg19 => "hg19",
            Self::RCrs => "rCRS",
        }
    }
}
impl TryFrom<u8> for GenomeAssembly {
    type Error = FormatError;
    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::GRCh37),
            2 => Ok(Self::GRCh38),
            3 => Ok(Self::Hg19),
            4 => Ok(Self::RCrs),
            _ => Err(FormatError::UnknownEnumValue {
                kind: "genome assembly",
                value,
            }),
        }
    }
}
impl FromStr for GenomeAssembly {
    type Err = UnknownFieldError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grch37" => Ok(Self::GRCh37),
            "grch38" => Ok(Self::GRCh38),
            "hg19" => Ok(Self::Hg19),
            "rcrs" => Ok(Self::RCrs),
            "unknown" => Ok(Self::Unknown),
            _ => Err(UnknownFieldError::Assembly(s.to_string())),
        }
    }
}
impl fmt::Display for GenomeAssembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of one data source merged into a store
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataSourceVersion {
    pub name: String,
    pub version: String,
    pub description: String,

    /// Release date in 100 ns ticks since the Unix epoch
    pub release_date: i64,
}
impl DataSourceVersion {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
        release_date: i64,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
            release_date,
        }
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut n = writer.write_ascii_string(&self.name)?;
        n += writer.write_ascii_string(&self.version)?;
        n += writer.write_utf8_string(&self.description)?;
        n += writer.write_varint_i64(self.release_date)?;
        Ok(n)
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            name: reader.read_ascii_string()?,
            version: reader.read_ascii_string()?,
            description: reader.read_utf8_string()?,
            release_date: reader.read_varint_i64()?,
        })
    }
}
impl fmt::Display for DataSourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<20} {:<13} {}", self.name, self.version, self.release_date)
    }
}

/// Returns the current time in 100 ns ticks since the Unix epoch
#[must_use]
pub fn now_ticks() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_nanos() / 100).unwrap_or(i64::MAX))
}

/// Header of an annotation data file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaHeader {
    pub data_version: u16,
    pub schema_version: u16,
    pub assembly: GenomeAssembly,

    /// Creation time in 100 ns ticks since the Unix epoch
    pub creation_ticks: i64,

    /// UCSC-style chromosome name this store covers
    pub chromosome: String,
    pub data_source_versions: BTreeSet<DataSourceVersion>,
}
impl SaHeader {
    #[must_use]
    pub fn builder(chromosome: impl Into<String>) -> SaHeaderBuilder {
        SaHeaderBuilder::new(chromosome)
    }

    /// Writes the header and returns the number of bytes written
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut n = writer.write_ascii_string(DATA_HEADER)?;
        writer.write_u16::<LittleEndian>(self.data_version)?;
        writer.write_u16::<LittleEndian>(self.schema_version)?;
        writer.write_u8(self.assembly as u8)?;
        writer.write_i64::<LittleEndian>(self.creation_ticks)?;
        n += 2 + 2 + 1 + 8;
        n += writer.write_ascii_string(&self.chromosome)?;

        n += writer.write_varint_u64(self.data_source_versions.len() as u64)?;
        for version in &self.data_source_versions {
            n += version.write(writer)?;
        }
        Ok(n)
    }

    /// Reads and validates a header
    ///
    /// Fails with a header mismatch if either the tag or the schema version differ.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let tag = reader.read_ascii_string()?;
        let data_version = reader.read_u16::<LittleEndian>()?;
        let schema_version = reader.read_u16::<LittleEndian>()?;
        if tag != DATA_HEADER || schema_version != SCHEMA_VERSION {
            return Err(FormatError::HeaderMismatch {
                expected_tag: DATA_HEADER,
                found_tag: tag,
                expected_schema: SCHEMA_VERSION,
                found_schema: schema_version,
            }
            .into());
        }
        let assembly = GenomeAssembly::try_from(reader.read_u8()?)?;
        let creation_ticks = reader.read_i64::<LittleEndian>()?;
        let chromosome = reader.read_ascii_string()?;

        let num_versions = reader.read_varint_u64()?;
        let mut data_source_versions = BTreeSet::new();
        for _ in 0..num_versions {
            data_source_versions.insert(DataSourceVersion::read(reader)?);
        }

        Ok(Self {
            data_version,
            schema_version,
            assembly,
            creation_ticks,
            chromosome,
            data_source_versions,
        })
    }
}

/// Builder for [`SaHeader`]
#[derive(Debug, Clone)]
pub struct SaHeaderBuilder {
    chromosome: String,
    assembly: GenomeAssembly,
    data_version: Option<u16>,
    creation_ticks: Option<i64>,
    data_source_versions: BTreeSet<DataSourceVersion>,
}
impl SaHeaderBuilder {
    #[must_use]
    pub fn new(chromosome: impl Into<String>) -> Self {
        Self {
            chromosome: chromosome.into(),
            assembly: GenomeAssembly::default(),
            data_version: None,
            creation_ticks: None,
            data_source_versions: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn assembly(mut self, assembly: GenomeAssembly) -> Self {
        self.assembly = assembly;
        self
    }

    #[must_use]
    pub fn data_version(mut self, data_version: u16) -> Self {
        self.data_version = Some(data_version);
        self
    }

    #[must_use]
    pub fn creation_ticks(mut self, ticks: i64) -> Self {
        self.creation_ticks = Some(ticks);
        self
    }

    #[must_use]
    pub fn data_source(mut self, version: DataSourceVersion) -> Self {
        self.data_source_versions.insert(version);
        self
    }

    #[must_use]
    pub fn data_sources(mut self, versions: impl IntoIterator<Item = DataSourceVersion>) -> Self {
        self.data_source_versions.extend(versions);
        self
    }

    /// Builds the header, stamping the current time unless a creation time was set
    #[must_use]
    pub fn build(self) -> SaHeader {
        SaHeader {
            data_version: self.data_version.unwrap_or(DATA_VERSION),
            schema_version: SCHEMA_VERSION,
            assembly: self.assembly,
            creation_ticks: self.creation_ticks.unwrap_or_else(now_ticks),
            chromosome: self.chromosome,
            data_source_versions: self.data_source_versions,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::Error;

    fn clinvar() -> DataSourceVersion {
        DataSourceVersion::new("ClinVar", "20190101", "Clinically relevant variants", 15_463_872)
    }

    fn dbsnp() -> DataSourceVersion {
        DataSourceVersion::new("dbSNP", "151", "Identifiers for short variants", -42)
    }

    #[test]
    fn test_header_round_trip() {
        let header = SaHeader::builder("chr1")
            .assembly(GenomeAssembly::GRCh38)
            .creation_ticks(637_000_000_000)
            .data_source(clinvar())
            .data_source(dbsnp())
            .build();

        let mut buf = Vec::new();
        let written = header.write(&mut buf).unwrap();
        assert_eq!(written, buf.len());

        let decoded = SaHeader::read(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.data_source_versions.len(), 2);
    }

    #[test]
    fn test_header_duplicate_sources_collapse() {
        let header = SaHeader::builder("chrX")
            .data_sources([clinvar(), clinvar(), dbsnp()])
            .build();
        assert_eq!(header.data_source_versions.len(), 2);
    }

    #[test]
    fn test_header_rejects_schema_mismatch() {
        let mut header = SaHeader::builder("chr2").build();
        header.schema_version = SCHEMA_VERSION - 1;
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();

        let result = SaHeader::read(&mut Cursor::new(&buf));
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::HeaderMismatch { found_schema, .. }))
                if found_schema == SCHEMA_VERSION - 1
        ));
    }

    #[test]
    fn test_header_rejects_wrong_tag() {
        let mut buf = Vec::new();
        buf.write_ascii_string("SomethingElse").unwrap();
        buf.write_u16::<LittleEndian>(DATA_VERSION).unwrap();
        buf.write_u16::<LittleEndian>(SCHEMA_VERSION).unwrap();

        let result = SaHeader::read(&mut Cursor::new(&buf));
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::HeaderMismatch { ref found_tag, .. }))
                if found_tag == "SomethingElse"
        ));
    }

    #[test]
    fn test_unknown_assembly_byte() {
        let header = SaHeader::builder("chr3").build();
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();

        // tag prefix (1) + tag (11) + data version (2) + schema version (2)
        buf[1 + DATA_HEADER.len() + 4] = 99;
        let result = SaHeader::read(&mut Cursor::new(&buf));
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::UnknownEnumValue { value: 99, .. }))
        ));
    }

    #[test]
    fn test_assembly_parse_and_display() {
        assert_eq!("GRCh37".parse::<GenomeAssembly>().unwrap(), GenomeAssembly::GRCh37);
        assert_eq!("hg19".parse::<GenomeAssembly>().unwrap(), GenomeAssembly::Hg19);
        assert_eq!(GenomeAssembly::RCrs.to_string(), "rCRS");
        assert!("hg42".parse::<GenomeAssembly>().is_err());
    }

    #[test]
    fn test_now_ticks_is_positive() {
        assert!(now_ticks() > 0);
    }
}
