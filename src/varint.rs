//! # Varint codec
//!
//! Variable-length integers store 7 bits per byte, least significant group first.
//! The high bit of each byte is a continuation flag.
//!
//! ```text
//! 300 = 0b1_0010_1100  ->  [1010_1100] [0000_0010]
//! ```
//!
//! The plain scheme is only used for values that can never be negative (lengths,
//! counts, offsets, positions). Signed values are zigzag folded first so that small
//! negative numbers stay short.
//!
//! Strings are written as a varint byte count followed by the raw bytes.

use std::io;

use crate::Result;
use crate::error::FormatError;

/// Maximum number of 7-bit groups in a 32-bit varint
pub const MAX_GROUPS_U32: usize = 5;

/// Maximum number of 7-bit groups in a 64-bit varint
pub const MAX_GROUPS_U64: usize = 10;

const CONTINUATION: u8 = 0x80;
const GROUP_MASK: u8 = 0x7F;

#[inline]
fn zigzag_encode_i32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

#[inline]
fn zigzag_decode_i32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

#[inline]
fn zigzag_encode_i64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
fn zigzag_decode_i64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

fn read_byte<R: io::Read + ?Sized>(reader: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Reads up to `max_groups` 7-bit groups into a u64.
///
/// The final group may only carry `last_group_bits` significant bits.
fn read_groups<R: io::Read + ?Sized>(
    reader: &mut R,
    max_groups: usize,
    last_group_bits: u32,
    bits: u32,
) -> Result<u64> {
    let mut value = 0u64;
    for group in 0..max_groups {
        let byte = read_byte(reader)?;
        let payload = byte & GROUP_MASK;
        if group == max_groups - 1 && u32::from(payload) >> last_group_bits != 0 {
            return Err(FormatError::VarintOverflow { bits }.into());
        }
        value |= u64::from(payload) << (7 * group);
        if byte & CONTINUATION == 0 {
            return Ok(value);
        }
    }
    Err(FormatError::VarintOverflow { bits }.into())
}

/// Extends [`io::Read`] with varint and length-prefixed string decoding
pub trait VarintRead: io::Read {
    fn read_varint_u32(&mut self) -> Result<u32> {
        read_groups(self, MAX_GROUPS_U32, 32 - 7 * 4, 32).map(|v| v as u32)
    }

    fn read_varint_u64(&mut self) -> Result<u64> {
        read_groups(self, MAX_GROUPS_U64, 64 - 7 * 9, 64)
    }

    fn read_varint_i32(&mut self) -> Result<i32> {
        self.read_varint_u32().map(zigzag_decode_i32)
    }

    fn read_varint_i64(&mut self) -> Result<i64> {
        self.read_varint_u64().map(zigzag_decode_i64)
    }

    /// Reads a varint length followed by that many bytes
    fn read_prefixed_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_varint_u32()?;
        let mut buf = Vec::new();
        let mut limited = io::Read::take(&mut *self, u64::from(len));
        let n = io::Read::read_to_end(&mut limited, &mut buf)?;
        if n != len as usize {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {len} bytes, found {n}"),
            )
            .into());
        }
        Ok(buf)
    }

    fn read_ascii_string(&mut self) -> Result<String> {
        let bytes = self.read_prefixed_bytes()?;
        if !bytes.is_ascii() {
            return Err(FormatError::InvalidAscii.into());
        }
        String::from_utf8(bytes).map_err(|e| FormatError::InvalidUtf8(e).into())
    }

    fn read_utf8_string(&mut self) -> Result<String> {
        let bytes = self.read_prefixed_bytes()?;
        String::from_utf8(bytes).map_err(|e| FormatError::InvalidUtf8(e).into())
    }
}
impl<R: io::Read + ?Sized> VarintRead for R {}

/// Extends [`io::Write`] with varint and length-prefixed string encoding
///
/// All methods return the number of bytes written so callers can track stream offsets.
pub trait VarintWrite: io::Write {
    fn write_varint_u64(&mut self, mut value: u64) -> io::Result<usize> {
        let mut buf = [0u8; MAX_GROUPS_U64];
        let mut len = 0;
        while value >= u64::from(CONTINUATION) {
            buf[len] = (value as u8 & GROUP_MASK) | CONTINUATION;
            value >>= 7;
            len += 1;
        }
        buf[len] = value as u8;
        len += 1;
        self.write_all(&buf[..len])?;
        Ok(len)
    }

    fn write_varint_u32(&mut self, value: u32) -> io::Result<usize> {
        self.write_varint_u64(u64::from(value))
    }

    fn write_varint_i32(&mut self, value: i32) -> io::Result<usize> {
        self.write_varint_u32(zigzag_encode_i32(value))
    }

    fn write_varint_i64(&mut self, value: i64) -> io::Result<usize> {
        self.write_varint_u64(zigzag_encode_i64(value))
    }

    fn write_prefixed_bytes(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let len = u32::try_from(bytes.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "string too long"))?;
        let prefix = self.write_varint_u32(len)?;
        self.write_all(bytes)?;
        Ok(prefix + bytes.len())
    }

    /// Writes an ASCII string, rejecting non-ASCII content
    fn write_ascii_string(&mut self, value: &str) -> io::Result<usize> {
        if !value.is_ascii() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("non-ASCII string: {value}"),
            ));
        }
        self.write_prefixed_bytes(value.as_bytes())
    }

    fn write_utf8_string(&mut self, value: &str) -> io::Result<usize> {
        self.write_prefixed_bytes(value.as_bytes())
    }
}
impl<W: io::Write + ?Sized> VarintWrite for W {}

/// Returns the number of bytes needed to encode `value`
#[must_use]
pub fn varint_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= u64::from(CONTINUATION) {
        value >>= 7;
        len += 1;
    }
    len
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::Error;

    const BOUNDARIES: [u64; 6] = [0, 127, 128, (1 << 31) - 1, (1 << 32) - 1, (1 << 63) - 1];

    #[test]
    fn test_u64_round_trip_boundaries() {
        for value in BOUNDARIES {
            let mut buf = Vec::new();
            let written = buf.write_varint_u64(value).unwrap();
            assert_eq!(written, buf.len());
            assert_eq!(written, varint_len(value));
            let decoded = Cursor::new(&buf).read_varint_u64().unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn test_u32_round_trip_boundaries() {
        for value in BOUNDARIES.into_iter().filter(|v| *v <= u64::from(u32::MAX)) {
            let mut buf = Vec::new();
            buf.write_varint_u32(value as u32).unwrap();
            let decoded = Cursor::new(&buf).read_varint_u32().unwrap();
            assert_eq!(u64::from(decoded), value);
        }
    }

    #[test]
    fn test_encoded_lengths() {
        assert_eq!(varint_len(0), 1);
        assert_eq!(varint_len(127), 1);
        assert_eq!(varint_len(128), 2);
        assert_eq!(varint_len(u64::from(u32::MAX)), 5);
        assert_eq!(varint_len(u64::MAX), 10);
    }

    #[test]
    fn test_known_encoding() {
        let mut buf = Vec::new();
        buf.write_varint_u32(300).unwrap();
        assert_eq!(buf, [0xAC, 0x02]);
    }

    #[test]
    fn test_signed_round_trip() {
        for value in [0i64, -1, 1, -64, 64, i64::from(i32::MIN), i64::MIN, i64::MAX] {
            let mut buf = Vec::new();
            buf.write_varint_i64(value).unwrap();
            assert_eq!(Cursor::new(&buf).read_varint_i64().unwrap(), value);
        }
        for value in [0i32, -1, 1, i32::MIN, i32::MAX] {
            let mut buf = Vec::new();
            buf.write_varint_i32(value).unwrap();
            assert_eq!(Cursor::new(&buf).read_varint_i32().unwrap(), value);
        }
    }

    #[test]
    fn test_small_negative_values_stay_short() {
        let mut buf = Vec::new();
        buf.write_varint_i64(-1).unwrap();
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn test_u32_overflow_without_terminator() {
        let bytes = [0xFFu8; 6];
        let result = Cursor::new(&bytes[..]).read_varint_u32();
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::VarintOverflow { bits: 32 }))
        ));
    }

    #[test]
    fn test_u64_overflow_without_terminator() {
        let bytes = [0x80u8; 11];
        let result = Cursor::new(&bytes[..]).read_varint_u64();
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::VarintOverflow { bits: 64 }))
        ));
    }

    #[test]
    fn test_u32_overflow_in_last_group() {
        // five groups, but the last carries more than the remaining 4 bits
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0x1F];
        let result = Cursor::new(&bytes[..]).read_varint_u32();
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[test]
    fn test_truncated_input_is_io_error() {
        let bytes = [0x80u8, 0x80];
        let result = Cursor::new(&bytes[..]).read_varint_u32();
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_oversized_length_prefix() {
        let mut bytes = Vec::new();
        bytes.write_varint_u32(u32::MAX).unwrap();
        bytes.extend_from_slice(b"chr1");
        let result = Cursor::new(&bytes).read_prefixed_bytes();
        assert!(matches!(result, Err(Error::Io(ref e)) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn test_string_round_trip() {
        let mut buf = Vec::new();
        buf.write_ascii_string("").unwrap();
        buf.write_ascii_string("chr1").unwrap();
        buf.write_utf8_string("").unwrap();
        buf.write_utf8_string("Ångström β-globin").unwrap();

        let mut reader = Cursor::new(&buf);
        assert_eq!(reader.read_ascii_string().unwrap(), "");
        assert_eq!(reader.read_ascii_string().unwrap(), "chr1");
        assert_eq!(reader.read_utf8_string().unwrap(), "");
        assert_eq!(reader.read_utf8_string().unwrap(), "Ångström β-globin");
    }

    #[test]
    fn test_ascii_rejects_non_ascii() {
        let mut buf = Vec::new();
        assert!(buf.write_ascii_string("β").is_err());

        buf.write_utf8_string("β").unwrap();
        let result = Cursor::new(&buf).read_ascii_string();
        assert!(matches!(result, Err(Error::Format(FormatError::InvalidAscii))));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut buf = Vec::new();
        buf.write_prefixed_bytes(&[0xC3, 0x28]).unwrap();
        let result = Cursor::new(&buf).read_utf8_string();
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::InvalidUtf8(_)))
        ));
    }
}
