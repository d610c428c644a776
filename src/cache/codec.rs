//! Value Codec Module
//!
//! Converts cached values to and from the byte payloads stored in the remote tier.
//!
//! Every payload starts with a one-byte format tag. Values are written with bincode
//! when it can faithfully round-trip them, otherwise with JSON.

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

/// Tag byte for bincode payloads.
pub const FORMAT_BINARY: u8 = 0x01;
/// Tag byte for JSON payloads.
pub const FORMAT_TEXT: u8 = 0x02;

// == Codec ==
/// Layered serializer: bincode first, JSON second.
#[derive(Debug, Clone, Copy, Default)]
pub struct Codec;

impl Codec {
    pub fn new() -> Self {
        Self
    }

    // == Encode ==
    /// Serializes `value` into a tagged payload.
    ///
    /// Returns `None` when neither format can represent the value. Never panics.
    pub fn encode<T>(&self, value: &T) -> Option<Vec<u8>>
    where
        T: Serialize + DeserializeOwned,
    {
        match self.encode_binary(value) {
            Ok(bytes) => return Some(bytes),
            Err(reason) => debug!("Binary encoding unavailable, using JSON: {}", reason),
        }

        match serde_json::to_vec(value) {
            Ok(json) => {
                let mut bytes = Vec::with_capacity(json.len() + 1);
                bytes.push(FORMAT_TEXT);
                bytes.extend_from_slice(&json);
                Some(bytes)
            }
            Err(e) => {
                error!("Serialization error: {}", e);
                None
            }
        }
    }

    /// Bincode is only accepted when the bytes decode back into `T`; formats that
    /// depend on `deserialize_any` (e.g. `serde_json::Value`) are rejected here.
    fn encode_binary<T>(&self, value: &T) -> Result<Vec<u8>, String>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut bytes = vec![FORMAT_BINARY];
        let body = bincode::serde::encode_to_vec(value, bincode::config::standard())
            .map_err(|e| e.to_string())?;
        bincode::serde::decode_from_slice::<T, _>(&body, bincode::config::standard())
            .map_err(|e| e.to_string())?;
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    // == Decode ==
    /// Deserializes a payload produced by [`Codec::encode`].
    ///
    /// Untagged payloads are read as plain JSON. Returns `None` (and logs) when the
    /// bytes cannot be decoded as `T`.
    pub fn decode<T>(&self, bytes: &[u8]) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let result = match bytes.split_first() {
            Some((&FORMAT_BINARY, body)) => {
                bincode::serde::decode_from_slice::<T, _>(body, bincode::config::standard())
                    .map(|(value, _)| value)
                    .map_err(|e| e.to_string())
                    .or_else(|_| serde_json::from_slice(body).map_err(|e| e.to_string()))
            }
            Some((&FORMAT_TEXT, body)) => serde_json::from_slice(body).map_err(|e| e.to_string()),
            Some(_) => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
            None => Err("empty payload".to_string()),
        };

        match result {
            Ok(value) => Some(value),
            Err(e) => {
                error!("Deserialization error: {}", e);
                None
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Quote {
        symbol: String,
        price: f64,
        volume: u64,
        history: Vec<(String, f64)>,
    }

    fn sample_quote() -> Quote {
        Quote {
            symbol: "VCB".to_string(),
            price: 91.5,
            volume: 1_200_000,
            history: vec![("2024-01-02".to_string(), 88.0), ("2024-01-03".to_string(), 89.4)],
        }
    }

    #[test]
    fn test_struct_uses_binary_format() {
        let codec = Codec::new();
        let bytes = codec.encode(&sample_quote()).unwrap();
        assert_eq!(bytes[0], FORMAT_BINARY);
        assert_eq!(codec.decode::<Quote>(&bytes), Some(sample_quote()));
    }

    #[test]
    fn test_nested_collections_roundtrip() {
        let codec = Codec::new();
        let mut value: BTreeMap<String, Vec<HashMap<String, i64>>> = BTreeMap::new();
        value.insert(
            "q1".to_string(),
            vec![HashMap::from([("revenue".to_string(), 10), ("cost".to_string(), 4)])],
        );
        value.insert("q2".to_string(), vec![]);

        let bytes = codec.encode(&value).unwrap();
        assert_eq!(codec.decode::<BTreeMap<String, Vec<HashMap<String, i64>>>>(&bytes), Some(value));
    }

    #[test]
    fn test_json_value_falls_back_to_text() {
        let codec = Codec::new();
        let value = json!({"symbol": "FPT", "prices": [1.5, 2.5], "meta": null});

        let bytes = codec.encode(&value).unwrap();
        assert_eq!(bytes[0], FORMAT_TEXT);
        assert_eq!(codec.decode::<serde_json::Value>(&bytes), Some(value));
    }

    #[test]
    fn test_unrepresentable_value_returns_none() {
        // bincode cannot decode serde_json::Value and JSON needs string map keys.
        let codec = Codec::new();
        let value: HashMap<Vec<u8>, serde_json::Value> =
            HashMap::from([(vec![1u8, 2], json!({"a": 1}))]);
        assert!(codec.encode(&value).is_none());
    }

    #[test]
    fn test_type_mismatch_returns_none() {
        let codec = Codec::new();
        let bytes = codec.encode(&json!({"not": "a list"})).unwrap();
        assert!(codec.decode::<Vec<String>>(&bytes).is_none());
    }

    #[test]
    fn test_untagged_json_is_accepted() {
        let codec = Codec::new();
        let decoded: Option<Vec<i32>> = codec.decode(b"[1,2,3]");
        assert_eq!(decoded, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_corrupt_payload_returns_none() {
        let codec = Codec::new();
        assert!(codec.decode::<Quote>(&[FORMAT_BINARY, 0xff, 0xff]).is_none());
        assert!(codec.decode::<Quote>(&[FORMAT_TEXT, b'{']).is_none());
        assert!(codec.decode::<Quote>(&[]).is_none());
    }
}
