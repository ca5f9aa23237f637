//! Minimal CBOR decoder for authenticator payloads.
//!
//! Unlike a general-purpose deserializer, [`decode`] reports exactly how many
//! bytes the first item occupied. Authenticator data places a COSE public key
//! directly in front of optional extension bytes with no outer length, so the
//! caller needs that count to know where the key ends.
//!
//! Supported: definite-length integers, byte/text strings, arrays, maps
//! (keys stringified), tags (unwrapped), booleans, null, undefined and
//! 32/64-bit floats. Indefinite-length items and 16-bit floats are rejected,
//! as are maps repeating a key.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::DecodeError;

/// Maximum container nesting accepted by the decoder.
pub const MAX_NESTING_DEPTH: usize = 64;

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_NEGATIVE: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;
const MAJOR_SIMPLE: u8 = 7;

/// A decoded CBOR item.
#[derive(Debug, Clone, PartialEq)]
pub enum CborValue {
    /// Major types 0 and 1. `i128` holds the full `-2^64..2^64` range.
    Integer(i128),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<CborValue>),
    /// Map with keys rendered as strings (`1`, `-2`, `"fmt"` -> `fmt`).
    Map(BTreeMap<String, CborValue>),
    Bool(bool),
    Null,
    Undefined,
    Float(f64),
}

impl CborValue {
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[CborValue]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, CborValue>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a map entry by its stringified key.
    pub fn get(&self, key: &str) -> Option<&CborValue> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Short name of the item kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Bytes(_) => "bytes",
            Self::Text(_) => "text",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Bool(_) => "bool",
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::Float(_) => "float",
        }
    }
}

impl fmt::Display for CborValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Bytes(b) => write!(f, "h'{}'", hex::encode(b)),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Self::Bool(b) => write!(f, "{b}"),
            Self::Null => write!(f, "null"),
            Self::Undefined => write!(f, "undefined"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

/// Decode the first CBOR item in `buffer`.
///
/// Returns the item and the number of bytes it occupied. Bytes after the
/// item are left untouched.
pub fn decode(buffer: &[u8]) -> Result<(CborValue, usize), DecodeError> {
    let mut decoder = Decoder { buf: buffer, pos: 0 };
    let value = decoder.item(0)?;
    Ok((value, decoder.pos))
}

/// Decode a buffer that must contain exactly one CBOR item.
pub fn decode_all(buffer: &[u8]) -> Result<CborValue, DecodeError> {
    let (value, read) = decode(buffer)?;
    if read != buffer.len() {
        return Err(DecodeError::TrailingBytes(buffer.len() - read));
    }
    Ok(value)
}

struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let available = self.buf.len() - self.pos;
        if n > available {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: n,
                available,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn argument(&mut self, major: u8, info: u8) -> Result<u64, DecodeError> {
        match info {
            0..=23 => Ok(u64::from(info)),
            24 => Ok(u64::from(self.byte()?)),
            25 => {
                let b = self.take(2)?;
                Ok(u64::from(u16::from_be_bytes([b[0], b[1]])))
            }
            26 => {
                let b = self.take(4)?;
                Ok(u64::from(u32::from_be_bytes([b[0], b[1], b[2], b[3]])))
            }
            27 => {
                let b = self.take(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(b);
                Ok(u64::from_be_bytes(raw))
            }
            31 => Err(DecodeError::IndefiniteLength(major)),
            _ => Err(DecodeError::UnsupportedAdditionalInfo { major, info }),
        }
    }

    fn length(&mut self, major: u8, info: u8) -> Result<usize, DecodeError> {
        let arg = self.argument(major, info)?;
        usize::try_from(arg).map_err(|_| DecodeError::LengthOverflow(arg))
    }

    fn item(&mut self, depth: usize) -> Result<CborValue, DecodeError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(DecodeError::NestingTooDeep(MAX_NESTING_DEPTH));
        }

        let initial = self.byte()?;
        let major = initial >> 5;
        let info = initial & 0x1f;

        match major {
            MAJOR_UNSIGNED => Ok(CborValue::Integer(i128::from(self.argument(major, info)?))),
            MAJOR_NEGATIVE => {
                let arg = self.argument(major, info)?;
                Ok(CborValue::Integer(-1 - i128::from(arg)))
            }
            MAJOR_BYTES => {
                let len = self.length(major, info)?;
                Ok(CborValue::Bytes(self.take(len)?.to_vec()))
            }
            MAJOR_TEXT => {
                let len = self.length(major, info)?;
                let raw = self.take(len)?;
                let text = std::str::from_utf8(raw).map_err(|_| DecodeError::InvalidUtf8)?;
                Ok(CborValue::Text(text.to_string()))
            }
            MAJOR_ARRAY => {
                let count = self.length(major, info)?;
                // Every item takes at least one byte.
                let mut items = Vec::with_capacity(count.min(self.buf.len() - self.pos));
                for _ in 0..count {
                    items.push(self.item(depth + 1)?);
                }
                Ok(CborValue::Array(items))
            }
            MAJOR_MAP => {
                let count = self.length(major, info)?;
                let mut map = BTreeMap::new();
                for _ in 0..count {
                    let key = map_key(self.item(depth + 1)?)?;
                    if map.contains_key(&key) {
                        return Err(DecodeError::DuplicateMapKey(key));
                    }
                    let value = self.item(depth + 1)?;
                    map.insert(key, value);
                }
                Ok(CborValue::Map(map))
            }
            MAJOR_TAG => {
                self.argument(major, info)?;
                self.item(depth + 1)
            }
            _ => self.simple(info),
        }
    }

    fn simple(&mut self, info: u8) -> Result<CborValue, DecodeError> {
        match info {
            20 => Ok(CborValue::Bool(false)),
            21 => Ok(CborValue::Bool(true)),
            22 => Ok(CborValue::Null),
            23 => Ok(CborValue::Undefined),
            24 => Err(DecodeError::UnsupportedSimpleValue(self.byte()?)),
            25 => Err(DecodeError::HalfFloat),
            26 => {
                let b = self.take(4)?;
                Ok(CborValue::Float(f64::from(f32::from_be_bytes([
                    b[0], b[1], b[2], b[3],
                ]))))
            }
            27 => {
                let b = self.take(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(b);
                Ok(CborValue::Float(f64::from_be_bytes(raw)))
            }
            31 => Err(DecodeError::IndefiniteLength(MAJOR_SIMPLE)),
            28..=30 => Err(DecodeError::UnsupportedAdditionalInfo {
                major: MAJOR_SIMPLE,
                info,
            }),
            _ => Err(DecodeError::UnsupportedSimpleValue(info)),
        }
    }
}

fn map_key(key: CborValue) -> Result<String, DecodeError> {
    match key {
        CborValue::Integer(i) => Ok(i.to_string()),
        CborValue::Text(s) => Ok(s),
        CborValue::Bytes(b) => Ok(hex::encode(b)),
        CborValue::Bool(b) => Ok(b.to_string()),
        CborValue::Null => Ok("null".to_string()),
        CborValue::Undefined => Ok("undefined".to_string()),
        CborValue::Float(f) => Ok(f.to_string()),
        CborValue::Array(_) => Err(DecodeError::UnsupportedMapKey("array")),
        CborValue::Map(_) => Err(DecodeError::UnsupportedMapKey("map")),
    }
}
