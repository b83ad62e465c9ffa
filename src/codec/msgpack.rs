//! MsgPack codec using `rmp-serde`.
//!
//! Always uses `to_vec_named`: structs are written as maps with field names,
//! which is what JavaScript MessagePack clients decode into plain objects.
//! `to_vec` would write them as positional arrays.
//!
//! # Example
//!
//! ```
//! use procwire_router::codec::MsgPackCodec;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Invocation {
//!     path: String,
//!     input: Option<u32>,
//! }
//!
//! let call = Invocation { path: "general.health".to_string(), input: None };
//! let encoded = MsgPackCodec::encode(&call).unwrap();
//! let decoded: Invocation = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, call);
//! ```

use crate::error::Result;

/// MessagePack codec for request and response bodies.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes (struct-as-map format).
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
