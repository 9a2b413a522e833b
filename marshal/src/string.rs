//! Text codec.
//!
//! Strings are stored either null-terminated or behind a sized length (see
//! [crate::length]), in one of three [Charset]s. A code unit is one byte for ASCII and UTF-8
//! and two bytes for UTF-16; all lengths in a [StringPolicy] are counted in code units.
//!
//! # Null-terminated layout
//!
//! On write the payload is first truncated to `max_length` units, never splitting a
//! character. The total number of units written is then:
//! - `min_length` if the payload is shorter than `min_length` (zero padded),
//! - `payload + 1` if the payload is shorter than `max_length` (one terminator),
//! - `payload` otherwise (the field is full and carries no terminator).
//!
//! On read, up to `max_length` units are scanned for a terminator. The cursor ends
//! `max(scanned + terminator, min_length)` units past the start of the field, so a field
//! written by this codec is always consumed exactly.
//!
//! # Length-prefixed layout
//!
//! The number of code units is written with the field's [LengthSize], followed by exactly
//! that many units. Minimum and maximum lengths do not apply.
//!
//! # Alignment
//!
//! After either layout, zero bytes are written (or skipped) until the distance from the
//! first character unit to the cursor is a multiple of `align`.

use crate::{
    length::{read_length, write_length, LengthSize},
    Config, Endian, Error, Reader, Writer,
};

/// Character encodings. UTF variants carry no byte order mark.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Charset {
    #[default]
    Ascii,
    Utf8,
    /// UTF-16 in the cursor's byte order.
    Utf16,
}

impl Charset {
    /// Size of one code unit in bytes.
    pub const fn unit_size(self) -> usize {
        match self {
            Self::Ascii | Self::Utf8 => 1,
            Self::Utf16 => 2,
        }
    }
}

/// Per-field string encoding policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StringPolicy {
    charset: Charset,
    null_terminated: bool,
    min_length: usize,
    max_length: Option<usize>,
    align: usize,
}

impl Default for StringPolicy {
    fn default() -> Self {
        Self {
            charset: Charset::Ascii,
            null_terminated: true,
            min_length: 0,
            max_length: None,
            align: 1,
        }
    }
}

impl StringPolicy {
    /// A null-terminated, unbounded, unaligned policy in `charset`.
    pub fn new(charset: Charset) -> Self {
        Self {
            charset,
            ..Self::default()
        }
    }

    /// Selects between null-terminated (`true`) and length-prefixed (`false`) layouts.
    pub fn with_null_terminated(mut self, null_terminated: bool) -> Self {
        self.null_terminated = null_terminated;
        self
    }

    /// Negative values are treated as zero.
    pub fn with_min_length(mut self, min_length: i32) -> Self {
        self.min_length = usize::try_from(min_length).unwrap_or(0);
        self
    }

    /// Zero and negative values mean unlimited.
    pub fn with_max_length(mut self, max_length: i32) -> Self {
        self.max_length = usize::try_from(max_length).ok().filter(|max| *max > 0);
        self
    }

    /// Values below one are treated as one.
    pub fn with_align(mut self, align: i32) -> Self {
        self.align = usize::try_from(align).unwrap_or(1).max(1);
        self
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn is_null_terminated(&self) -> bool {
        self.null_terminated
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Effective maximum length, never below [Self::min_length]. `None` is unlimited.
    pub fn max_length(&self) -> Option<usize> {
        self.max_length.map(|max| max.max(self.min_length))
    }

    pub fn align(&self) -> usize {
        self.align
    }

    fn limit(&self) -> usize {
        self.max_length().unwrap_or(usize::MAX)
    }
}

/// Reads a string field.
pub fn read(
    reader: &mut Reader<'_>,
    policy: &StringPolicy,
    size: LengthSize,
    cfg: &Config,
) -> Result<String, Error> {
    if policy.null_terminated {
        read_terminated(reader, policy)
    } else {
        read_prefixed(reader, policy, size, cfg)
    }
}

/// Writes a string field.
pub fn write(
    writer: &mut Writer<'_>,
    value: &str,
    policy: &StringPolicy,
    size: LengthSize,
) -> Result<(), Error> {
    if policy.null_terminated {
        write_terminated(writer, value, policy)
    } else {
        write_prefixed(writer, value, policy, size)
    }
}

/// Reads a four character code: exactly four ASCII bytes, null padded.
pub fn read_four_cc(reader: &mut Reader<'_>) -> Result<String, Error> {
    let policy = StringPolicy::new(Charset::Ascii)
        .with_min_length(4)
        .with_max_length(4);
    read_terminated(reader, &policy)
}

/// Reads an unbounded null-terminated string.
pub fn read_null_terminated(reader: &mut Reader<'_>, charset: Charset) -> Result<String, Error> {
    read_terminated(reader, &StringPolicy::new(charset))
}

fn read_terminated(reader: &mut Reader<'_>, policy: &StringPolicy) -> Result<String, Error> {
    let unit = policy.charset.unit_size();
    let limit = policy.limit();
    let start = reader.position();

    // Find the terminator without consuming anything
    let mut scanned = 0;
    let mut terminated = false;
    while scanned < limit {
        let offset = scanned * unit;
        let code = match policy.charset {
            Charset::Utf16 => reader.peek_u16(offset)?,
            Charset::Ascii | Charset::Utf8 => u16::from(reader.peek_u8(offset)?),
        };
        if code == 0 {
            terminated = true;
            break;
        }
        scanned += 1;
    }

    let payload = reader.take(scanned * unit)?;
    let value = decode_units(payload, policy.charset, reader.endian());

    let consumed = scanned + usize::from(terminated);
    let end = consumed.max(policy.min_length);
    reader.skip((end - scanned) * unit)?;
    skip_alignment(reader, start, policy.align)?;
    Ok(value)
}

fn read_prefixed(
    reader: &mut Reader<'_>,
    policy: &StringPolicy,
    size: LengthSize,
    cfg: &Config,
) -> Result<String, Error> {
    let len = read_length(reader, size)?;
    if !cfg.lengths.contains(&len) {
        return Err(Error::InvalidLength(len));
    }
    let start = reader.position();

    // The unit count is authoritative, regardless of how many characters it decodes to
    let bytes = len
        .checked_mul(policy.charset.unit_size())
        .ok_or(Error::InvalidLength(len))?;
    let payload = reader.take(bytes)?;
    let value = decode_units(payload, policy.charset, reader.endian());
    skip_alignment(reader, start, policy.align)?;
    Ok(value)
}

fn write_terminated(
    writer: &mut Writer<'_>,
    value: &str,
    policy: &StringPolicy,
) -> Result<(), Error> {
    let unit = policy.charset.unit_size();
    let limit = policy.limit();
    let start = writer.position();

    // A zero unit inside the payload would end the field early on read
    let written = match policy.charset {
        Charset::Ascii => {
            let bytes = ascii_bytes(value, limit);
            reject_terminator(bytes.contains(&0))?;
            writer.put_slice(&bytes)?;
            bytes.len()
        }
        Charset::Utf8 => {
            let payload = &value.as_bytes()[..utf8_boundary(value, limit)];
            reject_terminator(payload.contains(&0))?;
            writer.put_slice(payload)?;
            payload.len()
        }
        Charset::Utf16 => {
            let units = utf16_units(value, limit);
            reject_terminator(units.contains(&0))?;
            for unit in &units {
                writer.put_u16(*unit)?;
            }
            units.len()
        }
    };

    let total = if written < policy.min_length {
        policy.min_length
    } else if written < limit {
        written + 1
    } else {
        written
    };
    writer.put_zeros((total - written) * unit)?;
    pad_alignment(writer, start, policy.align)
}

fn write_prefixed(
    writer: &mut Writer<'_>,
    value: &str,
    policy: &StringPolicy,
    size: LengthSize,
) -> Result<(), Error> {
    match policy.charset {
        Charset::Ascii => {
            let bytes = ascii_bytes(value, usize::MAX);
            write_length(writer, bytes.len(), size)?;
            let start = writer.position();
            writer.put_slice(&bytes)?;
            pad_alignment(writer, start, policy.align)
        }
        Charset::Utf8 => {
            write_length(writer, value.len(), size)?;
            let start = writer.position();
            writer.put_slice(value.as_bytes())?;
            pad_alignment(writer, start, policy.align)
        }
        Charset::Utf16 => {
            let units = utf16_units(value, usize::MAX);
            write_length(writer, units.len(), size)?;
            let start = writer.position();
            for unit in &units {
                writer.put_u16(*unit)?;
            }
            pad_alignment(writer, start, policy.align)
        }
    }
}

fn reject_terminator(found: bool) -> Result<(), Error> {
    if found {
        return Err(Error::InvalidData(
            "null-terminated string".to_string(),
            "payload contains a null character".to_string(),
        ));
    }
    Ok(())
}

/// Encodes up to `limit` characters as ASCII, replacing anything else with `?`.
fn ascii_bytes(value: &str, limit: usize) -> Vec<u8> {
    value
        .chars()
        .take(limit)
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}

/// Byte length of the longest prefix of `value` that fits in `limit` UTF-8 bytes without
/// splitting a character.
fn utf8_boundary(value: &str, limit: usize) -> usize {
    let mut end = 0;
    for c in value.chars() {
        let next = end + c.len_utf8();
        if next > limit {
            break;
        }
        end = next;
    }
    end
}

/// UTF-16 units of the longest prefix of `value` that fits in `limit` units without
/// splitting a surrogate pair.
fn utf16_units(value: &str, limit: usize) -> Vec<u16> {
    let mut units = Vec::new();
    let mut buf = [0u16; 2];
    for c in value.chars() {
        let encoded = c.encode_utf16(&mut buf);
        if units.len() + encoded.len() > limit {
            break;
        }
        units.extend_from_slice(encoded);
    }
    units
}

/// Decodes raw code units. Malformed input is replaced with U+FFFD.
fn decode_units(payload: &[u8], charset: Charset, endian: Endian) -> String {
    match charset {
        Charset::Ascii => payload
            .iter()
            .map(|b| {
                if b.is_ascii() {
                    char::from(*b)
                } else {
                    char::REPLACEMENT_CHARACTER
                }
            })
            .collect(),
        Charset::Utf8 => String::from_utf8_lossy(payload).into_owned(),
        Charset::Utf16 => {
            let units: Vec<u16> = payload
                .chunks_exact(2)
                .map(|pair| match endian {
                    Endian::Big => u16::from_be_bytes([pair[0], pair[1]]),
                    Endian::Little => u16::from_le_bytes([pair[0], pair[1]]),
                })
                .collect();
            String::from_utf16_lossy(&units)
        }
    }
}

fn padding(used: usize, align: usize) -> usize {
    match used % align {
        0 => 0,
        rem => align - rem,
    }
}

fn pad_alignment(writer: &mut Writer<'_>, start: usize, align: usize) -> Result<(), Error> {
    writer.put_zeros(padding(writer.position() - start, align))
}

fn skip_alignment(reader: &mut Reader<'_>, start: usize, align: usize) -> Result<(), Error> {
    reader.skip(padding(reader.position() - start, align))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn encode(value: &str, policy: &StringPolicy, size: LengthSize) -> BytesMut {
        let mut buf = BytesMut::new();
        let mut writer = Writer::new(&mut buf);
        write(&mut writer, value, policy, size).unwrap();
        buf
    }

    fn decode(data: &[u8], policy: &StringPolicy, size: LengthSize) -> (String, usize) {
        let mut reader = Reader::new(data);
        let value = read(&mut reader, policy, size, &Config::default()).unwrap();
        (value, reader.position())
    }

    #[test]
    fn test_policy_clamps() {
        let policy = StringPolicy::default()
            .with_min_length(-5)
            .with_max_length(-1)
            .with_align(0);
        assert_eq!(policy.min_length(), 0);
        assert_eq!(policy.max_length(), None);
        assert_eq!(policy.align(), 1);
        assert!(policy.is_null_terminated());
        assert_eq!(policy.charset(), Charset::Ascii);

        // Max below min is raised to min
        let policy = StringPolicy::default().with_min_length(8).with_max_length(3);
        assert_eq!(policy.max_length(), Some(8));

        // Non-positive max stays unlimited even with a minimum
        let policy = StringPolicy::default().with_min_length(8).with_max_length(0);
        assert_eq!(policy.max_length(), None);
    }

    #[test]
    fn test_terminated_roundtrip() {
        for charset in [Charset::Ascii, Charset::Utf8, Charset::Utf16] {
            let policy = StringPolicy::new(charset);
            let buf = encode("hello", &policy, LengthSize::Four);
            assert_eq!(buf.len(), 6 * charset.unit_size());
            let (value, end) = decode(&buf, &policy, LengthSize::Four);
            assert_eq!(value, "hello");
            assert_eq!(end, buf.len());
        }
    }

    #[test]
    fn test_terminated_layout() {
        let policy = StringPolicy::new(Charset::Ascii);
        assert_eq!(&encode("ab", &policy, LengthSize::Four)[..], b"ab\0");

        let policy = StringPolicy::new(Charset::Utf16);
        assert_eq!(
            &encode("ab", &policy, LengthSize::Four)[..],
            &[0, b'a', 0, b'b', 0, 0]
        );
    }

    #[test]
    fn test_min_length_padding() {
        let policy = StringPolicy::new(Charset::Ascii).with_min_length(6);
        let buf = encode("abc", &policy, LengthSize::Four);
        assert_eq!(&buf[..], b"abc\0\0\0");
        let (value, end) = decode(&buf, &policy, LengthSize::Four);
        assert_eq!(value, "abc");
        assert_eq!(end, 6);

        // Payload equal to the minimum still gets a terminator
        let buf = encode("abcdef", &policy, LengthSize::Four);
        assert_eq!(&buf[..], b"abcdef\0");
        assert_eq!(decode(&buf, &policy, LengthSize::Four).1, 7);

        let policy = StringPolicy::new(Charset::Utf16).with_min_length(4);
        let buf = encode("ab", &policy, LengthSize::Four);
        assert_eq!(buf.len(), 8);
        let (value, end) = decode(&buf, &policy, LengthSize::Four);
        assert_eq!(value, "ab");
        assert_eq!(end, 8);
    }

    #[test]
    fn test_read_never_under_reads_minimum() {
        // Terminator found early: the cursor still moves past the whole minimum
        let policy = StringPolicy::new(Charset::Ascii).with_min_length(5);
        let data = b"a\0xyz!";
        let (value, end) = decode(data, &policy, LengthSize::Four);
        assert_eq!(value, "a");
        assert_eq!(end, 5);
    }

    #[test]
    fn test_max_length_fixed_field() {
        let policy = StringPolicy::new(Charset::Ascii)
            .with_min_length(4)
            .with_max_length(4);
        let buf = encode("abcdefg", &policy, LengthSize::Four);
        assert_eq!(&buf[..], b"abcd");
        let (value, end) = decode(&buf, &policy, LengthSize::Four);
        assert_eq!(value, "abcd");
        assert_eq!(end, 4);

        let buf = encode("ab", &policy, LengthSize::Four);
        assert_eq!(&buf[..], b"ab\0\0");
        assert_eq!(decode(&buf, &policy, LengthSize::Four), ("ab".to_string(), 4));
    }

    #[test]
    fn test_max_length_stops_scan() {
        // No terminator within the maximum: the scan stops without reading further
        let policy = StringPolicy::new(Charset::Ascii).with_max_length(3);
        let (value, end) = decode(b"abcdef", &policy, LengthSize::Four);
        assert_eq!(value, "abc");
        assert_eq!(end, 3);
    }

    #[test]
    fn test_utf8_truncation_boundary() {
        // "aé€😀" is 1 + 2 + 3 + 4 bytes
        let value = "aé€😀";
        for (max, expected) in [
            (1, "a"),
            (2, "a"),
            (3, "aé"),
            (5, "aé"),
            (6, "aé€"),
            (9, "aé€"),
            (10, "aé€😀"),
        ] {
            let policy = StringPolicy::new(Charset::Utf8).with_max_length(max);
            let buf = encode(value, &policy, LengthSize::Four);
            let payload = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
            assert!(payload <= max as usize);
            assert_eq!(std::str::from_utf8(&buf[..payload]).unwrap(), expected);

            let (decoded, end) = decode(&buf, &policy, LengthSize::Four);
            assert_eq!(decoded, expected);
            assert_eq!(end, buf.len());
        }
    }

    #[test]
    fn test_utf16_truncation_keeps_pairs() {
        let policy = StringPolicy::new(Charset::Utf16).with_max_length(2);
        let buf = encode("a😀", &policy, LengthSize::Four);
        // 'a' fits, the pair does not; a terminator fills the second unit
        assert_eq!(&buf[..], &[0, b'a', 0, 0]);
        assert_eq!(decode(&buf, &policy, LengthSize::Four), ("a".to_string(), 4));

        let policy = StringPolicy::new(Charset::Utf16).with_max_length(3);
        let buf = encode("a😀", &policy, LengthSize::Four);
        assert_eq!(buf.len(), 6);
        assert_eq!(decode(&buf, &policy, LengthSize::Four).0, "a😀");
    }

    #[test]
    fn test_ascii_replacement() {
        let policy = StringPolicy::new(Charset::Ascii);
        let buf = encode("né", &policy, LengthSize::Four);
        assert_eq!(&buf[..], b"n?\0");

        let (value, _) = decode(&[b'n', 0xE9, 0], &policy, LengthSize::Four);
        assert_eq!(value, "n\u{FFFD}");
    }

    #[test]
    fn test_alignment() {
        for align in 1..=8 {
            for value in ["", "a", "abc", "abcdefghi"] {
                for charset in [Charset::Ascii, Charset::Utf16] {
                    for null_terminated in [true, false] {
                        let policy = StringPolicy::new(charset)
                            .with_align(align)
                            .with_null_terminated(null_terminated);
                        let buf = encode(value, &policy, LengthSize::One);
                        let prefix = if null_terminated { 0 } else { 1 };
                        assert_eq!((buf.len() - prefix) % align as usize, 0);

                        let (decoded, end) = decode(&buf, &policy, LengthSize::One);
                        assert_eq!(decoded, value);
                        assert_eq!(end, buf.len());
                    }
                }
            }
        }
    }

    #[test]
    fn test_alignment_layout() {
        let policy = StringPolicy::new(Charset::Ascii).with_align(4);
        assert_eq!(&encode("abcd", &policy, LengthSize::Four)[..], b"abcd\0\0\0\0");

        let policy = policy.with_null_terminated(false);
        assert_eq!(
            &encode("abcde", &policy, LengthSize::Two)[..],
            &[0, 5, b'a', b'b', b'c', b'd', b'e', 0, 0, 0]
        );
    }

    #[test]
    fn test_prefixed_all_widths() {
        for size in [LengthSize::One, LengthSize::Two, LengthSize::Four] {
            for charset in [Charset::Ascii, Charset::Utf8, Charset::Utf16] {
                let policy = StringPolicy::new(charset).with_null_terminated(false);
                let value = if charset == Charset::Ascii { "plain" } else { "ünï😀" };
                let buf = encode(value, &policy, size);
                let units = match charset {
                    Charset::Ascii => 5,
                    Charset::Utf8 => value.len(),
                    Charset::Utf16 => value.encode_utf16().count(),
                };
                assert_eq!(buf.len(), size.bytes() + units * charset.unit_size());

                let (decoded, end) = decode(&buf, &policy, size);
                assert_eq!(decoded, value);
                assert_eq!(end, buf.len());
            }
        }
    }

    #[test]
    fn test_prefixed_ignores_length_bounds() {
        let policy = StringPolicy::new(Charset::Ascii)
            .with_null_terminated(false)
            .with_min_length(10)
            .with_max_length(2);
        let buf = encode("abcd", &policy, LengthSize::One);
        assert_eq!(&buf[..], &[4, b'a', b'b', b'c', b'd']);
        assert_eq!(decode(&buf, &policy, LengthSize::One), ("abcd".to_string(), 5));
    }

    #[test]
    fn test_prefixed_unit_count_is_authoritative() {
        // Three UTF-8 bytes that decode to fewer characters still advance three bytes
        let policy = StringPolicy::new(Charset::Utf8).with_null_terminated(false);
        let data = [3, 0xE2, 0x82, 0xAC, 0x7F];
        let (value, end) = decode(&data, &policy, LengthSize::One);
        assert_eq!(value, "€");
        assert_eq!(end, 4);
    }

    #[test]
    fn test_prefixed_length_limits() {
        let policy = StringPolicy::new(Charset::Ascii).with_null_terminated(false);
        let cfg = Config::default().with_lengths(..=3);
        let mut reader = Reader::new(&[4, b'a', b'b', b'c', b'd']);
        assert_eq!(
            read(&mut reader, &policy, LengthSize::One, &cfg),
            Err(Error::InvalidLength(4))
        );

        let mut reader = Reader::new(&[9, b'a']);
        assert_eq!(
            read(&mut reader, &policy, LengthSize::One, &Config::default()),
            Err(Error::EndOfBuffer)
        );
    }

    #[test]
    fn test_prefixed_length_overflow() {
        let policy = StringPolicy::new(Charset::Ascii).with_null_terminated(false);
        let mut buf = BytesMut::new();
        let mut writer = Writer::new(&mut buf);
        let value = "x".repeat(300);
        assert_eq!(
            write(&mut writer, &value, &policy, LengthSize::One),
            Err(Error::LengthExceeded(300, 255))
        );
    }

    #[test]
    fn test_unterminated_exhausts_buffer() {
        let policy = StringPolicy::new(Charset::Ascii);
        let mut reader = Reader::new(b"abc");
        assert_eq!(
            read(&mut reader, &policy, LengthSize::Four, &Config::default()),
            Err(Error::EndOfBuffer)
        );
    }

    #[test]
    fn test_terminated_rejects_embedded_null() {
        for charset in [Charset::Ascii, Charset::Utf8, Charset::Utf16] {
            let policy = StringPolicy::new(charset);
            let mut buf = BytesMut::new();
            let mut writer = Writer::new(&mut buf);
            assert!(matches!(
                write(&mut writer, "a\0b", &policy, LengthSize::Four),
                Err(Error::InvalidData(_, _))
            ));
            assert!(buf.is_empty());

            // Truncation drops the null, so the field is still readable
            let policy = policy.with_max_length(1);
            let buf = encode("a\0b", &policy, LengthSize::Four);
            assert_eq!(decode(&buf, &policy, LengthSize::Four), ("a".to_string(), buf.len()));

            // Length-prefixed strings carry nulls unchanged
            let policy = StringPolicy::new(charset).with_null_terminated(false);
            let buf = encode("a\0b", &policy, LengthSize::One);
            assert_eq!(decode(&buf, &policy, LengthSize::One), ("a\0b".to_string(), buf.len()));
        }
    }

    #[test]
    fn test_four_cc() {
        let mut reader = Reader::new(b"RIFFab\0\0");
        assert_eq!(read_four_cc(&mut reader).unwrap(), "RIFF");
        assert_eq!(read_four_cc(&mut reader).unwrap(), "ab");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_read_null_terminated() {
        let data = [0, b'h', 0, b'i', 0, 0, 0xFF];
        let mut reader = Reader::new(&data);
        assert_eq!(
            read_null_terminated(&mut reader, Charset::Utf16).unwrap(),
            "hi"
        );
        assert_eq!(reader.position(), 6);
    }

    #[test]
    fn test_little_endian_utf16() {
        let policy = StringPolicy::new(Charset::Utf16);
        let mut buf = BytesMut::new();
        let mut writer = Writer::with_endian(&mut buf, Endian::Little);
        write(&mut writer, "hi", &policy, LengthSize::Four).unwrap();
        assert_eq!(&buf[..], &[b'h', 0, b'i', 0, 0, 0]);

        let mut reader = Reader::with_endian(&buf, Endian::Little);
        assert_eq!(
            read(&mut reader, &policy, LengthSize::Four, &Config::default()).unwrap(),
            "hi"
        );
    }
}
