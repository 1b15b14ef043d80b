//! Raw CBOR items (RFC 8949).
//!
//! This layer knows nothing about SurrealDB types: tags are carried as plain
//! numbers and interpreted one level up by the formatter's tag registry.
//!
//! ```text
//! initial byte: | major type (3 bits) | additional info (5 bits) |
//!   info < 24   -> argument is the info itself
//!   info 24..27 -> argument follows in 1/2/4/8 big-endian bytes
//!   info 31     -> indefinite length (strings, arrays, maps) or break
//! ```

use crate::error::DecodeError;
use bytes::{Buf, BufMut, BytesMut};

/// Maximum nesting of arrays, maps and tags accepted by the decoder.
pub const MAX_DEPTH: usize = 128;

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_NEGATIVE: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;
const MAJOR_SIMPLE: u8 = 7;

const INFO_INDEFINITE: u8 = 31;
const BREAK: u8 = 0xff;

const SIMPLE_FALSE: u8 = 20;
const SIMPLE_TRUE: u8 = 21;
const SIMPLE_NULL: u8 = 22;
const SIMPLE_UNDEFINED: u8 = 23;

/// A single CBOR data item.
#[derive(Debug, Clone, PartialEq)]
pub enum Cbor {
    Unsigned(u64),
    /// Encodes the integer `-1 - n`.
    Negative(u64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<Cbor>),
    Map(Vec<(Cbor, Cbor)>),
    Tag(u64, Box<Cbor>),
    Bool(bool),
    Null,
    Undefined,
    Float(f64),
}

impl Cbor {
    /// Builds an integer item from a signed value.
    pub fn int(v: i64) -> Self {
        if v >= 0 {
            Cbor::Unsigned(v as u64)
        } else {
            Cbor::Negative(!(v as u64))
        }
    }

    /// Builds a tagged item.
    pub fn tag(number: u64, content: Cbor) -> Self {
        Cbor::Tag(number, Box::new(content))
    }

    /// Returns the integer value if it fits in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Cbor::Unsigned(n) => i64::try_from(n).ok(),
            Cbor::Negative(n) => i64::try_from(n).ok().map(|n| -1 - n),
            _ => None,
        }
    }

    /// Returns a short name of the item kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Cbor::Unsigned(_) | Cbor::Negative(_) => "integer",
            Cbor::Bytes(_) => "byte string",
            Cbor::Text(_) => "text string",
            Cbor::Array(_) => "array",
            Cbor::Map(_) => "map",
            Cbor::Tag(..) => "tag",
            Cbor::Bool(_) => "boolean",
            Cbor::Null => "null",
            Cbor::Undefined => "undefined",
            Cbor::Float(_) => "float",
        }
    }

    /// Encodes the item into a fresh buffer.
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(64);
        self.encode(&mut buf);
        buf
    }

    /// Appends the encoded item to `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            Cbor::Unsigned(n) => put_head(buf, MAJOR_UNSIGNED, *n),
            Cbor::Negative(n) => put_head(buf, MAJOR_NEGATIVE, *n),
            Cbor::Bytes(b) => {
                put_head(buf, MAJOR_BYTES, b.len() as u64);
                buf.put_slice(b);
            }
            Cbor::Text(s) => {
                put_head(buf, MAJOR_TEXT, s.len() as u64);
                buf.put_slice(s.as_bytes());
            }
            Cbor::Array(items) => {
                put_head(buf, MAJOR_ARRAY, items.len() as u64);
                for item in items {
                    item.encode(buf);
                }
            }
            Cbor::Map(entries) => {
                put_head(buf, MAJOR_MAP, entries.len() as u64);
                for (k, v) in entries {
                    k.encode(buf);
                    v.encode(buf);
                }
            }
            Cbor::Tag(number, content) => {
                put_head(buf, MAJOR_TAG, *number);
                content.encode(buf);
            }
            Cbor::Bool(false) => buf.put_u8(MAJOR_SIMPLE << 5 | SIMPLE_FALSE),
            Cbor::Bool(true) => buf.put_u8(MAJOR_SIMPLE << 5 | SIMPLE_TRUE),
            Cbor::Null => buf.put_u8(MAJOR_SIMPLE << 5 | SIMPLE_NULL),
            Cbor::Undefined => buf.put_u8(MAJOR_SIMPLE << 5 | SIMPLE_UNDEFINED),
            Cbor::Float(f) => {
                buf.put_u8(MAJOR_SIMPLE << 5 | 27);
                buf.put_f64(*f);
            }
        }
    }

    /// Decodes exactly one item; trailing bytes are an error.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader { buf: data };
        let item = reader.item(0)?;
        if reader.buf.has_remaining() {
            return Err(DecodeError::TrailingBytes(reader.buf.remaining()));
        }
        Ok(item)
    }
}

/// Writes a major type with its argument using the shortest encoding.
fn put_head(buf: &mut BytesMut, major: u8, arg: u64) {
    let major = major << 5;
    if arg < 24 {
        buf.put_u8(major | arg as u8);
    } else if arg <= u8::MAX as u64 {
        buf.put_u8(major | 24);
        buf.put_u8(arg as u8);
    } else if arg <= u16::MAX as u64 {
        buf.put_u8(major | 25);
        buf.put_u16(arg as u16);
    } else if arg <= u32::MAX as u64 {
        buf.put_u8(major | 26);
        buf.put_u32(arg as u32);
    } else {
        buf.put_u8(major | 27);
        buf.put_u64(arg);
    }
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn need(&self, n: usize) -> Result<(), DecodeError> {
        if self.buf.remaining() < n {
            return Err(DecodeError::Truncated {
                needed: n - self.buf.remaining(),
            });
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    fn peek(&self) -> Result<u8, DecodeError> {
        self.need(1)?;
        Ok(self.buf[0])
    }

    /// Reads the argument for `info`; `None` means indefinite length.
    fn argument(&mut self, major: u8, info: u8) -> Result<Option<u64>, DecodeError> {
        match info {
            0..=23 => Ok(Some(info as u64)),
            24 => Ok(Some(self.u8()? as u64)),
            25 => {
                self.need(2)?;
                Ok(Some(self.buf.get_u16() as u64))
            }
            26 => {
                self.need(4)?;
                Ok(Some(self.buf.get_u32() as u64))
            }
            27 => {
                self.need(8)?;
                Ok(Some(self.buf.get_u64()))
            }
            INFO_INDEFINITE => Ok(None),
            _ => Err(DecodeError::UnsupportedItem { major, info }),
        }
    }

    fn length(&mut self, major: u8, info: u8) -> Result<Option<usize>, DecodeError> {
        match self.argument(major, info)? {
            Some(n) => usize::try_from(n)
                .map(Some)
                .map_err(|_| DecodeError::IntegerOverflow(n.to_string())),
            None => Ok(None),
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        self.need(len)?;
        let buf: &'a [u8] = self.buf;
        let (head, rest) = buf.split_at(len);
        self.buf = rest;
        Ok(head)
    }

    fn item(&mut self, depth: usize) -> Result<Cbor, DecodeError> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::TooDeep(MAX_DEPTH));
        }

        let initial = self.u8()?;
        let major = initial >> 5;
        let info = initial & 0x1f;

        match major {
            MAJOR_UNSIGNED | MAJOR_NEGATIVE | MAJOR_TAG => {
                let arg = self
                    .argument(major, info)?
                    .ok_or(DecodeError::UnsupportedItem { major, info })?;
                Ok(match major {
                    MAJOR_UNSIGNED => Cbor::Unsigned(arg),
                    MAJOR_NEGATIVE => Cbor::Negative(arg),
                    _ => Cbor::Tag(arg, Box::new(self.item(depth + 1)?)),
                })
            }
            MAJOR_BYTES => Ok(Cbor::Bytes(self.chunks(major, info)?)),
            MAJOR_TEXT => {
                let raw = self.chunks(major, info)?;
                String::from_utf8(raw)
                    .map(Cbor::Text)
                    .map_err(|_| DecodeError::InvalidUtf8)
            }
            MAJOR_ARRAY => {
                let mut items = Vec::new();
                match self.length(major, info)? {
                    Some(len) => {
                        items.reserve(len.min(self.buf.remaining()));
                        for _ in 0..len {
                            items.push(self.item(depth + 1)?);
                        }
                    }
                    None => {
                        while self.peek()? != BREAK {
                            items.push(self.item(depth + 1)?);
                        }
                        self.buf.advance(1);
                    }
                }
                Ok(Cbor::Array(items))
            }
            MAJOR_MAP => {
                let mut entries = Vec::new();
                match self.length(major, info)? {
                    Some(len) => {
                        entries.reserve(len.min(self.buf.remaining()));
                        for _ in 0..len {
                            let k = self.item(depth + 1)?;
                            let v = self.item(depth + 1)?;
                            entries.push((k, v));
                        }
                    }
                    None => {
                        while self.peek()? != BREAK {
                            let k = self.item(depth + 1)?;
                            let v = self.item(depth + 1)?;
                            entries.push((k, v));
                        }
                        self.buf.advance(1);
                    }
                }
                Ok(Cbor::Map(entries))
            }
            _ => self.simple(info),
        }
    }

    /// Reads a definite or chunked indefinite byte/text string.
    fn chunks(&mut self, major: u8, info: u8) -> Result<Vec<u8>, DecodeError> {
        match self.length(major, info)? {
            Some(len) => Ok(self.take(len)?.to_vec()),
            None => {
                let mut out = Vec::new();
                loop {
                    let initial = self.u8()?;
                    if initial == BREAK {
                        return Ok(out);
                    }
                    let (chunk_major, chunk_info) = (initial >> 5, initial & 0x1f);
                    if chunk_major != major || chunk_info == INFO_INDEFINITE {
                        return Err(DecodeError::UnsupportedItem {
                            major: chunk_major,
                            info: chunk_info,
                        });
                    }
                    let len = self
                        .length(chunk_major, chunk_info)?
                        .ok_or(DecodeError::UnsupportedItem { major, info })?;
                    out.extend_from_slice(self.take(len)?);
                }
            }
        }
    }

    fn simple(&mut self, info: u8) -> Result<Cbor, DecodeError> {
        match info {
            SIMPLE_FALSE => Ok(Cbor::Bool(false)),
            SIMPLE_TRUE => Ok(Cbor::Bool(true)),
            SIMPLE_NULL => Ok(Cbor::Null),
            SIMPLE_UNDEFINED => Ok(Cbor::Undefined),
            25 => {
                self.need(2)?;
                Ok(Cbor::Float(f16_to_f64(self.buf.get_u16())))
            }
            26 => {
                self.need(4)?;
                Ok(Cbor::Float(self.buf.get_f32() as f64))
            }
            27 => {
                self.need(8)?;
                Ok(Cbor::Float(self.buf.get_f64()))
            }
            _ => Err(DecodeError::UnsupportedItem {
                major: MAJOR_SIMPLE,
                info,
            }),
        }
    }
}

/// Widens an IEEE 754 half-precision float.
fn f16_to_f64(bits: u16) -> f64 {
    let sign = if bits & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exp = ((bits >> 10) & 0x1f) as i32;
    let mant = (bits & 0x3ff) as f64;
    let magnitude = match exp {
        0 => mant * 2f64.powi(-24),
        31 if mant == 0.0 => f64::INFINITY,
        31 => f64::NAN,
        _ => (1.0 + mant / 1024.0) * 2f64.powi(exp - 15),
    };
    sign * magnitude
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(item: Cbor) {
        let encoded = item.to_bytes();
        assert_eq!(Cbor::decode(&encoded).unwrap(), item);
    }

    #[test]
    fn test_known_encodings() {
        // NONE as the server sends it: tag 6 wrapping null.
        assert_eq!(&Cbor::tag(6, Cbor::Null).to_bytes()[..], &[0xc6, 0xf6]);
        assert_eq!(&Cbor::Unsigned(23).to_bytes()[..], &[0x17]);
        assert_eq!(&Cbor::Unsigned(24).to_bytes()[..], &[0x18, 0x18]);
        assert_eq!(&Cbor::Unsigned(1000).to_bytes()[..], &[0x19, 0x03, 0xe8]);
        assert_eq!(&Cbor::int(-1).to_bytes()[..], &[0x20]);
        assert_eq!(&Cbor::int(-100).to_bytes()[..], &[0x38, 0x63]);
        assert_eq!(&Cbor::Text("a".into()).to_bytes()[..], &[0x61, 0x61]);
    }

    #[test]
    fn test_roundtrip_nested() {
        let id = Cbor::tag(
            8,
            Cbor::Array(vec![Cbor::Text("user".into()), Cbor::Unsigned(u64::MAX)]),
        );
        let flags = Cbor::Array(vec![Cbor::Bool(true), Cbor::Null, Cbor::Undefined]);
        roundtrip(Cbor::Map(vec![
            (Cbor::Text("id".into()), id),
            (Cbor::Text("score".into()), Cbor::Float(-2.5)),
            (Cbor::Text("raw".into()), Cbor::Bytes(vec![0, 1, 2])),
            (Cbor::Text("flags".into()), flags),
        ]));
    }

    #[test]
    fn test_int_helpers() {
        assert_eq!(Cbor::int(i64::MIN).as_i64(), Some(i64::MIN));
        assert_eq!(Cbor::int(42).as_i64(), Some(42));
        assert_eq!(Cbor::Unsigned(u64::MAX).as_i64(), None);
    }

    #[test]
    fn test_indefinite_lengths() {
        // [_ 1, [2, 3]]
        let data = [0x9f, 0x01, 0x82, 0x02, 0x03, 0xff];
        assert_eq!(
            Cbor::decode(&data).unwrap(),
            Cbor::Array(vec![
                Cbor::Unsigned(1),
                Cbor::Array(vec![Cbor::Unsigned(2), Cbor::Unsigned(3)])
            ])
        );

        // (_ "ab", "c")
        let data = [0x7f, 0x62, b'a', b'b', 0x61, b'c', 0xff];
        assert_eq!(Cbor::decode(&data).unwrap(), Cbor::Text("abc".into()));

        // {_ "a": 1}
        let data = [0xbf, 0x61, b'a', 0x01, 0xff];
        assert_eq!(
            Cbor::decode(&data).unwrap(),
            Cbor::Map(vec![(Cbor::Text("a".into()), Cbor::Unsigned(1))])
        );
    }

    #[test]
    fn test_half_and_single_floats() {
        assert_eq!(Cbor::decode(&[0xf9, 0x3c, 0x00]).unwrap(), Cbor::Float(1.0));
        assert_eq!(Cbor::decode(&[0xf9, 0xc0, 0x00]).unwrap(), Cbor::Float(-2.0));
        assert_eq!(
            Cbor::decode(&[0xfa, 0x3f, 0xc0, 0x00, 0x00]).unwrap(),
            Cbor::Float(1.5)
        );
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            Cbor::decode(&[0x19, 0x03]),
            Err(DecodeError::Truncated { needed: 1 })
        ));
        assert!(matches!(
            Cbor::decode(&[0x01, 0x02]),
            Err(DecodeError::TrailingBytes(1))
        ));
        assert!(matches!(
            Cbor::decode(&[0x62, 0xff, 0xfe]),
            Err(DecodeError::InvalidUtf8)
        ));
        assert!(matches!(
            Cbor::decode(&[0x1c]),
            Err(DecodeError::UnsupportedItem { major: 0, info: 28 })
        ));
        assert!(Cbor::decode(&[]).is_err());
    }

    #[test]
    fn test_depth_limit() {
        let mut data = vec![0x81; MAX_DEPTH + 2];
        data.push(0x00);
        assert!(matches!(Cbor::decode(&data), Err(DecodeError::TooDeep(_))));
    }
}
