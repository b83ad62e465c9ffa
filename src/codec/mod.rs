//! Codec module - body encoding for the HTTP transport.
//!
//! - [`JsonCodec`] - JSON using `serde_json` (default)
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` (`to_vec_named`)
//!
//! Codecs are marker structs with static methods. [`Format`] picks one from a
//! `Content-Type` header and dispatches to it.
//!
//! # Example
//!
//! ```
//! use procwire_router::codec::{Format, JsonCodec, MsgPackCodec};
//!
//! let encoded = MsgPackCodec::encode(&"hello").unwrap();
//! let decoded: String = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello");
//!
//! let json = JsonCodec::encode(&vec![1, 2]).unwrap();
//! assert_eq!(json, b"[1,2]");
//!
//! assert_eq!(Format::from_content_type(Some("application/msgpack")), Format::MsgPack);
//! ```

mod json;
mod msgpack;

pub use json::JsonCodec;
pub use msgpack::MsgPackCodec;

use crate::error::Result;

/// MIME type for JSON bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// MIME type for MessagePack bodies.
pub const MSGPACK_CONTENT_TYPE: &str = "application/msgpack";

/// Body format negotiated from a `Content-Type` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// JSON (also used when no header is present).
    #[default]
    Json,
    /// MessagePack.
    MsgPack,
}

impl Format {
    /// Pick a format from an optional `Content-Type` value.
    ///
    /// Anything that is not a MessagePack type falls back to JSON.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(value) = content_type else {
            return Format::Json;
        };

        let mime = value.split(';').next().unwrap_or("").trim();
        match mime.to_ascii_lowercase().as_str() {
            "application/msgpack" | "application/x-msgpack" | "application/vnd.msgpack" => {
                Format::MsgPack
            }
            _ => Format::Json,
        }
    }

    /// `Content-Type` value for responses in this format.
    pub fn content_type(self) -> &'static str {
        match self {
            Format::Json => JSON_CONTENT_TYPE,
            Format::MsgPack => MSGPACK_CONTENT_TYPE,
        }
    }

    /// Encode a value in this format.
    pub fn encode<T: serde::Serialize>(self, value: &T) -> Result<Vec<u8>> {
        match self {
            Format::Json => JsonCodec::encode(value),
            Format::MsgPack => MsgPackCodec::encode(value),
        }
    }

    /// Decode a value in this format.
    pub fn decode<T: serde::de::DeserializeOwned>(self, bytes: &[u8]) -> Result<T> {
        match self {
            Format::Json => JsonCodec::decode(bytes),
            Format::MsgPack => MsgPackCodec::decode(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_content_type() {
        assert_eq!(Format::from_content_type(None), Format::Json);
        assert_eq!(
            Format::from_content_type(Some("application/json")),
            Format::Json
        );
        assert_eq!(
            Format::from_content_type(Some("application/msgpack")),
            Format::MsgPack
        );
        assert_eq!(
            Format::from_content_type(Some("Application/X-MsgPack; charset=binary")),
            Format::MsgPack
        );
        assert_eq!(Format::from_content_type(Some("text/plain")), Format::Json);
    }

    #[test]
    fn test_format_content_type() {
        assert_eq!(Format::Json.content_type(), "application/json");
        assert_eq!(Format::MsgPack.content_type(), "application/msgpack");
    }

    #[test]
    fn test_format_dispatch() {
        let value = serde_json::json!({ "path": "general.health", "input": null });

        for format in [Format::Json, Format::MsgPack] {
            let encoded = format.encode(&value).unwrap();
            let decoded: serde_json::Value = format.decode(&encoded).unwrap();
            assert_eq!(decoded, value);
        }
    }
}
