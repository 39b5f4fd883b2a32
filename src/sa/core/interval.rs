use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::error::{FormatError, UnknownFieldError};
use crate::interval::{Interval, IntervalArray};
use crate::varint::{VarintRead, VarintWrite};
use crate::Result;

/// Which variant classes an interval annotation applies to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReportFor {
    #[default]
    None = 0,
    SmallVariants = 1,
    StructuralVariants = 2,
    AllVariants = 3,
}
impl TryFrom<u8> for ReportFor {
    type Error = FormatError;
    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::SmallVariants),
            2 => Ok(Self::StructuralVariants),
            3 => Ok(Self::AllVariants),
            _ => Err(FormatError::UnknownEnumValue {
                kind: "report-for",
                value,
            }),
        }
    }
}
impl FromStr for ReportFor {
    type Err = UnknownFieldError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "None" => Ok(Self::None),
            "SmallVariants" => Ok(Self::SmallVariants),
            "StructuralVariants" => Ok(Self::StructuralVariants),
            "AllVariants" => Ok(Self::AllVariants),
            _ => Err(UnknownFieldError::ReportFor(s.to_string())),
        }
    }
}
impl fmt::Display for ReportFor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "None",
            Self::SmallVariants => "SmallVariants",
            Self::StructuralVariants => "StructuralVariants",
            Self::AllVariants => "AllVariants",
        };
        f.write_str(name)
    }
}

/// A region-level annotation (e.g. a copy number region) spanning `[start, end]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaInterval {
    pub key_name: String,
    pub reference_name: String,
    pub start: u32,
    pub end: u32,
    pub report_for: ReportFor,
    pub json: String,
}
impl SaInterval {
    fn write_payload<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_ascii_string(&self.key_name)?;
        writer.write_ascii_string(&self.reference_name)?;
        writer.write_u8(self.report_for as u8)?;
        writer.write_utf8_string(&self.json)?;
        Ok(())
    }

    fn read_payload<R: Read>(reader: &mut R, start: u32, end: u32) -> Result<Self> {
        let key_name = reader.read_ascii_string()?;
        let reference_name = reader.read_ascii_string()?;
        let report_for = ReportFor::try_from(reader.read_u8()?)?;
        let json = reader.read_utf8_string()?;
        Ok(Self {
            key_name,
            reference_name,
            start,
            end,
            report_for,
            json,
        })
    }
}

fn write_list<W: Write>(writer: &mut W, intervals: &[SaInterval]) -> Result<()> {
    writer.write_varint_u64(intervals.len() as u64)?;
    for interval in intervals {
        writer.write_varint_u32(interval.start)?;
        writer.write_varint_u32(interval.end)?;
        interval.write_payload(writer)?;
    }
    Ok(())
}

fn read_list<R: Read>(reader: &mut R) -> Result<IntervalArray<SaInterval>> {
    let count = reader.read_varint_u64()?;
    let mut intervals = Vec::new();
    for _ in 0..count {
        let begin = reader.read_varint_u32()?;
        let end = reader.read_varint_u32()?;
        let payload = SaInterval::read_payload(reader, begin, end)?;
        intervals.push(Interval::new(begin, end, payload));
    }
    Ok(IntervalArray::new(intervals))
}

/// The three interval lists embedded after the data file header
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaIntervalLists {
    pub small_variants: Vec<SaInterval>,
    pub structural_variants: Vec<SaInterval>,
    pub all_variants: Vec<SaInterval>,
}
impl SaIntervalLists {
    /// Orders the intervals by `(start, end)` and splits them by reporting class.
    ///
    /// Intervals reporting for nothing are dropped.
    #[must_use]
    pub fn from_intervals(mut intervals: Vec<SaInterval>) -> Self {
        intervals.sort_by_key(|iv| (iv.start, iv.end));
        let mut lists = Self::default();
        for interval in intervals {
            match interval.report_for {
                ReportFor::SmallVariants => lists.small_variants.push(interval),
                ReportFor::StructuralVariants => lists.structural_variants.push(interval),
                ReportFor::AllVariants => lists.all_variants.push(interval),
                ReportFor::None => {}
            }
        }
        lists
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.small_variants.len() + self.structural_variants.len() + self.all_variants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_list(writer, &self.small_variants)?;
        write_list(writer, &self.structural_variants)?;
        write_list(writer, &self.all_variants)
    }

    /// Reads the three lists as searchable interval arrays
    pub fn read_arrays<R: Read>(
        reader: &mut R,
    ) -> Result<[IntervalArray<SaInterval>; 3]> {
        Ok([read_list(reader)?, read_list(reader)?, read_list(reader)?])
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::Error;

    fn interval(start: u32, end: u32, report_for: ReportFor) -> SaInterval {
        SaInterval {
            key_name: "clingen".to_string(),
            reference_name: "chr1".to_string(),
            start,
            end,
            report_for,
            json: format!("{{\"start\":{start},\"end\":{end}}}"),
        }
    }

    #[test]
    fn test_partition_and_order() {
        let lists = SaIntervalLists::from_intervals(vec![
            interval(500, 900, ReportFor::StructuralVariants),
            interval(100, 200, ReportFor::SmallVariants),
            interval(100, 150, ReportFor::SmallVariants),
            interval(10, 20, ReportFor::AllVariants),
            interval(1, 2, ReportFor::None),
        ]);
        let small: Vec<(u32, u32)> = lists.small_variants.iter().map(|iv| (iv.start, iv.end)).collect();
        assert_eq!(small, [(100, 150), (100, 200)]);
        assert_eq!(lists.structural_variants.len(), 1);
        assert_eq!(lists.all_variants.len(), 1);
        assert_eq!(lists.len(), 4);
    }

    #[test]
    fn test_lists_round_trip_into_arrays() {
        let lists = SaIntervalLists::from_intervals(vec![
            interval(100, 200, ReportFor::SmallVariants),
            interval(300, 400, ReportFor::SmallVariants),
            interval(1_000, 50_000, ReportFor::StructuralVariants),
        ]);
        let mut buf = Vec::new();
        lists.write(&mut buf).unwrap();

        let [small, sv, all] = SaIntervalLists::read_arrays(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(small.len(), 2);
        assert_eq!(sv.len(), 1);
        assert!(all.is_empty());

        let hits = sv.all_overlaps(20_000, 20_000);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0], &lists.structural_variants[0]);
    }

    #[test]
    fn test_unknown_report_for_byte() {
        let mut buf = Vec::new();
        buf.write_varint_u64(1).unwrap();
        buf.write_varint_u32(1).unwrap();
        buf.write_varint_u32(2).unwrap();
        buf.write_ascii_string("clingen").unwrap();
        buf.write_ascii_string("chr1").unwrap();
        buf.write_u8(7).unwrap();
        buf.write_utf8_string("{}").unwrap();

        let result = read_list(&mut Cursor::new(&buf));
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::UnknownEnumValue { value: 7, .. }))
        ));
    }

    #[test]
    fn test_report_for_parse() {
        assert_eq!("AllVariants".parse::<ReportFor>().unwrap(), ReportFor::AllVariants);
        assert!("Everything".parse::<ReportFor>().is_err());
    }
}
