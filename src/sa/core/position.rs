use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};

use super::keys::validate_key;
use crate::varint::{VarintRead, VarintWrite};
use crate::Result;

/// The entries one data source contributes at a position
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaDataRecord {
    /// Data source key, one of the known keys
    pub key: String,

    /// JSON fragments, typically one per alternate allele
    pub entries: Vec<String>,
}
impl SaDataRecord {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entries: Vec::new(),
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        validate_key(&self.key)?;
        buf.write_ascii_string(&self.key)?;
        buf.write_varint_u64(self.entries.len() as u64)?;
        for entry in &self.entries {
            buf.write_utf8_string(entry)?;
        }
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = bytes;
        let key = reader.read_ascii_string()?;
        validate_key(&key)?;
        let count = reader.read_varint_u64()?;
        let mut entries = Vec::new();
        for _ in 0..count {
            entries.push(reader.read_utf8_string()?);
        }
        Ok(Self { key, entries })
    }
}

/// Everything known about one genomic position
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaPosition {
    pub position: u32,

    /// The reference base is the minor allele in the population
    pub is_ref_minor: bool,
    pub global_major_allele: Option<String>,
    pub records: Vec<SaDataRecord>,
}
impl SaPosition {
    #[must_use]
    pub fn new(position: u32) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn record(&self, key: &str) -> Option<&SaDataRecord> {
        self.records.iter().find(|r| r.key == key)
    }

    /// Appends an entry to the record of `key`, creating the record if needed
    pub fn push_entry(&mut self, key: &str, entry: String) {
        match self.records.iter_mut().find(|r| r.key == key) {
            Some(record) => record.entries.push(entry),
            None => self.records.push(SaDataRecord {
                key: key.to_string(),
                entries: vec![entry],
            }),
        }
    }

    /// Appends the encoded record to `buf`
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.write_varint_u32(self.position)?;
        buf.write_u8(u8::from(self.is_ref_minor))?;
        buf.write_ascii_string(self.global_major_allele.as_deref().unwrap_or_default())?;
        buf.write_varint_u64(self.records.len() as u64)?;

        let mut sub = Vec::new();
        for record in &self.records {
            sub.clear();
            record.encode(&mut sub)?;
            buf.write_prefixed_bytes(&sub)?;
        }
        Ok(())
    }

    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let position = reader.read_varint_u32()?;
        let is_ref_minor = reader.read_u8()? != 0;
        let allele = reader.read_ascii_string()?;
        let global_major_allele = (!allele.is_empty()).then_some(allele);

        let count = reader.read_varint_u64()?;
        let mut records = Vec::new();
        for _ in 0..count {
            let bytes = reader.read_prefixed_bytes()?;
            records.push(SaDataRecord::decode(&bytes)?);
        }
        Ok(Self {
            position,
            is_ref_minor,
            global_major_allele,
            records,
        })
    }

    /// Encodes the record in a self-contained stream
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        writer.write_all(&buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnknownFieldError;
    use crate::Error;

    fn sample() -> SaPosition {
        let mut position = SaPosition::new(12_345);
        position.is_ref_minor = true;
        position.global_major_allele = Some("T".to_string());
        position.push_entry("dbsnp", "{\"ids\":[\"rs123\"]}".to_string());
        position.push_entry("clinvar", "{\"id\":\"RCV000001\"}".to_string());
        position.push_entry("dbsnp", "{\"ids\":[\"rs456\"]}".to_string());
        position
    }

    #[test]
    fn test_push_entry_groups_by_key() {
        let position = sample();
        assert_eq!(position.records.len(), 2);
        assert_eq!(position.record("dbsnp").unwrap().entries.len(), 2);
        assert!(position.record("cosmic").is_none());
    }

    #[test]
    fn test_record_round_trip() {
        let position = sample();
        let mut buf = Vec::new();
        position.encode(&mut buf).unwrap();
        let decoded = SaPosition::decode(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded, position);
    }

    #[test]
    fn test_empty_allele_decodes_as_none() {
        let position = SaPosition::new(7);
        let mut buf = Vec::new();
        position.write(&mut buf).unwrap();
        let decoded = SaPosition::decode(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded.global_major_allele, None);
        assert!(!decoded.is_ref_minor);
    }

    #[test]
    fn test_encode_rejects_unknown_key() {
        let mut position = SaPosition::new(1);
        position.push_entry("madeUp", "{}".to_string());
        let result = position.encode(&mut Vec::new());
        assert!(matches!(
            result,
            Err(Error::UnknownField(UnknownFieldError::DataSourceKey(_)))
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_key() {
        let mut sub = Vec::new();
        sub.write_ascii_string("madeUp").unwrap();
        sub.write_varint_u64(0).unwrap();

        let mut buf = Vec::new();
        buf.write_varint_u32(5).unwrap();
        buf.write_u8(0).unwrap();
        buf.write_ascii_string("").unwrap();
        buf.write_varint_u64(1).unwrap();
        buf.write_prefixed_bytes(&sub).unwrap();

        let result = SaPosition::decode(&mut buf.as_slice());
        assert!(matches!(result, Err(Error::UnknownField(_))));
    }
}
