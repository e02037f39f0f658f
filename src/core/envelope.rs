//! WRP envelope model and MessagePack decoding.
//!
//! An envelope travels as a MessagePack map keyed by the WRP wire names
//! (`msg_type`, `source`, `dest`, `transaction_uuid`, ...). Absent keys take
//! their zero value and unknown keys are ignored, so decoding only rejects
//! input that is not structurally a map of the expected value types.
//! Field semantics are left to later stages.
use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured WRP message extracted from a request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Envelope {
    #[serde(rename = "msg_type")]
    pub message_type: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(rename = "dest", skip_serializing_if = "String::is_empty")]
    pub destination: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub transaction_uuid: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub accept: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    #[serde(rename = "rdr", skip_serializing_if = "Option::is_none")]
    pub request_delivery_response: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(with = "serde_bytes", skip_serializing_if = "Vec::is_empty")]
    pub payload: Vec<u8>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub partner_ids: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub session_id: String,
}

impl Envelope {
    /// Encode as a MessagePack map with WRP field names.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec_named(self)
    }
}

/// Priority attached to every envelope handed downstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DispatchPriority(pub i32);

impl DispatchPriority {
    /// Lowest priority; the only one the ingress edge ever uses.
    pub const DEFAULT: Self = Self(0);
}

impl fmt::Display for DispatchPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error when a request body is not a well-formed envelope
#[derive(Error, Debug)]
#[error("malformed WRP envelope: {0}")]
pub struct DecodeError(#[from] rmp_serde::decode::Error);

/// Decode a MessagePack-encoded WRP envelope.
pub fn decode(raw: &[u8]) -> Result<Envelope, DecodeError> {
    Ok(rmp_serde::from_slice(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Envelope {
        Envelope {
            message_type: 4,
            source: "mac:112233445566".to_string(),
            destination: "event:device-status".to_string(),
            transaction_uuid: "abc".to_string(),
            content_type: "text/plain".to_string(),
            metadata: HashMap::from([("/boot-time".to_string(), "1700000000".to_string())]),
            payload: b"hello".to_vec(),
            partner_ids: vec!["comcast".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_full_envelope() {
        let raw = sample().to_msgpack().unwrap();
        let decoded = decode(&raw).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_missing_fields_take_zero_values() {
        let raw = Envelope {
            message_type: 4,
            source: "dns:talaria".to_string(),
            ..Default::default()
        }
        .to_msgpack()
        .unwrap();

        let decoded = decode(&raw).unwrap();
        assert_eq!(decoded.source, "dns:talaria");
        assert!(decoded.content_type.is_empty());
        assert!(decoded.transaction_uuid.is_empty());
        assert!(decoded.payload.is_empty());
        assert_eq!(decoded.status, None);
    }

    #[test]
    fn test_payload_is_binary_on_the_wire() {
        let raw = sample().to_msgpack().unwrap();
        // bin8 marker followed by the 5 payload bytes
        let needle = [0xc4, 0x05, b'h', b'e', b'l', b'l', b'o'];
        assert!(raw.windows(needle.len()).any(|window| window == needle));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        #[derive(Serialize)]
        struct Extended<'a> {
            msg_type: i64,
            source: &'a str,
            future_field: &'a str,
        }
        let raw = rmp_serde::to_vec_named(&Extended {
            msg_type: 3,
            source: "mac:aabbccddeeff",
            future_field: "ignored",
        })
        .unwrap();

        let decoded = decode(&raw).unwrap();
        assert_eq!(decoded.message_type, 3);
        assert_eq!(decoded.source, "mac:aabbccddeeff");
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(decode(b"this is not msgpack").is_err());
        assert!(decode(&[0xc1]).is_err());
        assert!(decode(b"\"just a string\"").is_err());
    }

    #[test]
    fn test_truncated_envelope_is_rejected() {
        let raw = sample().to_msgpack().unwrap();
        assert!(decode(&raw[..raw.len() / 2]).is_err());
    }

    #[test]
    fn test_wrong_field_type_is_rejected() {
        #[derive(Serialize)]
        struct BadSource {
            source: i64,
        }
        let raw = rmp_serde::to_vec_named(&BadSource { source: 7 }).unwrap();
        assert!(decode(&raw).is_err());
    }
}
