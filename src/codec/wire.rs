// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Typed payload encoding.
//!
//! [`Wire`] maps a Rust value to and from one frame payload. Integer
//! primitives are fixed-width little-endian; sequences are a u32 LE count
//! followed by length-prefixed elements; strings are raw UTF-8. Aggregates
//! go through [`Json`], which rides on serde.

use bytes::{BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors produced while decoding a frame payload.
#[derive(Error, Debug)]
pub enum WireError {
    /// Payload length does not match the expected fixed-width encoding.
    #[error("payload has wrong length: expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    /// A sequence or element header announced more bytes than are present.
    #[error("truncated payload: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    /// Bytes left over after the value was fully decoded.
    #[error("{0} trailing bytes after decoded value")]
    TrailingBytes(usize),

    /// Unrecognized frame kind byte.
    #[error("unknown frame kind byte {0:#04x}")]
    UnknownKind(u8),

    /// Frame header announced a payload larger than the frame limit.
    #[error("frame payload of {0} bytes exceeds the frame limit")]
    Oversize(usize),

    /// String payload was not valid UTF-8.
    #[error("invalid UTF-8 in string payload: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// JSON aggregate payload failed to (de)serialize.
    #[error("JSON payload error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A value that can cross a stream as one frame payload.
pub trait Wire: Sized {
    /// Append this value's encoding to `buf`.
    fn encode(&self, buf: &mut BytesMut);

    /// Decode a value from exactly one frame payload.
    fn decode(bytes: &[u8]) -> Result<Self, WireError>;
}

macro_rules! fixed_width_wire {
    ($ty:ty, $len:expr) => {
        impl Wire for $ty {
            fn encode(&self, buf: &mut BytesMut) {
                buf.put_slice(&self.to_le_bytes());
            }

            fn decode(bytes: &[u8]) -> Result<Self, WireError> {
                let raw: [u8; $len] = bytes.try_into().map_err(|_| WireError::WrongLength {
                    expected: $len,
                    actual: bytes.len(),
                })?;
                Ok(<$ty>::from_le_bytes(raw))
            }
        }
    };
}

fixed_width_wire!(i32, 4);
fixed_width_wire!(u32, 4);
fixed_width_wire!(i64, 8);
fixed_width_wire!(u64, 8);

impl Wire for String {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(self.as_bytes());
    }

    fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        Ok(std::str::from_utf8(bytes)?.to_owned())
    }
}

impl<T: Wire> Wire for Vec<T> {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.len() as u32);
        let mut scratch = BytesMut::new();
        for element in self {
            scratch.clear();
            element.encode(&mut scratch);
            buf.put_u32_le(scratch.len() as u32);
            buf.put_slice(&scratch);
        }
    }

    fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let mut cursor = bytes;
        let count = take_u32(&mut cursor)? as usize;
        let mut out = Vec::with_capacity(count.min(1 << 16));
        for _ in 0..count {
            let len = take_u32(&mut cursor)? as usize;
            if cursor.len() < len {
                return Err(WireError::Truncated {
                    needed: len,
                    available: cursor.len(),
                });
            }
            let (element, rest) = cursor.split_at(len);
            out.push(T::decode(element)?);
            cursor = rest;
        }
        if !cursor.is_empty() {
            return Err(WireError::TrailingBytes(cursor.len()));
        }
        Ok(out)
    }
}

fn take_u32(cursor: &mut &[u8]) -> Result<u32, WireError> {
    if cursor.len() < 4 {
        return Err(WireError::Truncated {
            needed: 4,
            available: cursor.len(),
        });
    }
    let (raw, rest) = cursor.split_at(4);
    *cursor = rest;
    Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// Wrapper carrying an arbitrary serde aggregate as a JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T: Serialize + DeserializeOwned> Wire for Json<T> {
    fn encode(&self, buf: &mut BytesMut) {
        // serialization of an in-memory value only fails for non-string
        // map keys or a panicking Serialize impl; both are caller bugs
        let raw = serde_json::to_vec(&self.0).expect("JSON payload failed to serialize");
        buf.put_slice(&raw);
    }

    fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        Ok(Json(serde_json::from_slice(bytes)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn roundtrip<T: Wire>(value: &T) -> T {
        let mut buf = BytesMut::new();
        value.encode(&mut buf);
        T::decode(&buf).unwrap()
    }

    #[test]
    fn integer_roundtrips() {
        assert_eq!(roundtrip(&-42i32), -42);
        assert_eq!(roundtrip(&7u32), 7);
        assert_eq!(roundtrip(&i64::MIN), i64::MIN);
        assert_eq!(roundtrip(&u64::MAX), u64::MAX);
    }

    #[test]
    fn integer_rejects_wrong_length() {
        assert!(matches!(
            i64::decode(&[0u8; 4]),
            Err(WireError::WrongLength {
                expected: 8,
                actual: 4
            })
        ));
    }

    #[test]
    fn string_roundtrips() {
        assert_eq!(roundtrip(&"millrace".to_string()), "millrace");
        assert_eq!(roundtrip(&String::new()), "");
    }

    #[test]
    fn vec_roundtrips() {
        assert_eq!(roundtrip(&vec![1i64, -2, 3]), vec![1, -2, 3]);
        assert_eq!(roundtrip(&Vec::<i64>::new()), Vec::<i64>::new());
        let nested = vec![vec![1i32], vec![], vec![2, 3]];
        assert_eq!(roundtrip(&nested), nested);
    }

    #[test]
    fn vec_rejects_truncated_element() {
        let mut buf = BytesMut::new();
        vec![1i64, 2].encode(&mut buf);
        assert!(matches!(
            Vec::<i64>::decode(&buf[..buf.len() - 2]),
            Err(WireError::Truncated { .. })
        ));
    }

    #[test]
    fn vec_rejects_trailing_bytes() {
        let mut buf = BytesMut::new();
        vec![1i64].encode(&mut buf);
        buf.put_u8(0xff);
        assert!(matches!(
            Vec::<i64>::decode(&buf),
            Err(WireError::TrailingBytes(1))
        ));
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        label: String,
        weights: Vec<u32>,
    }

    #[test]
    fn json_aggregate_roundtrips() {
        let sample = Json(Sample {
            label: "partial".into(),
            weights: vec![1, 2, 3],
        });
        let mut buf = BytesMut::new();
        sample.encode(&mut buf);
        let decoded: Json<Sample> = Json::decode(&buf).unwrap();
        assert_eq!(decoded, sample);
    }

    #[test]
    fn json_rejects_mismatched_shape() {
        let mut buf = BytesMut::new();
        Json(vec![1, 2, 3]).encode(&mut buf);
        assert!(matches!(
            Json::<Sample>::decode(&buf),
            Err(WireError::Json(_))
        ));
    }
}
