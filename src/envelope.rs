//! Response envelopes.
//!
//! - [`RpcResponse`] - what the dispatcher returns for one invocation:
//!   `{"result":{"data":…}}` or `{"error":{"code":…,"message":…}}`.
//! - [`ResultEnvelope`] - what the caller utilities return:
//!   `{"success":true,"data":…,"error":null}` or
//!   `{"success":false,"data":null,"error":"…"}`.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorCode, InputIssues, RpcError};

/// Stable `{code, message}` pair for a failed invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorShape {
    /// Error code.
    pub code: ErrorCode,
    /// Message safe to show to the caller.
    pub message: String,
    /// Field-level details for `InvalidInput`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issues: Option<InputIssues>,
}

impl From<&RpcError> for ErrorShape {
    fn from(e: &RpcError) -> Self {
        let issues = match e {
            RpcError::InvalidInput(issues) => Some(issues.clone()),
            _ => None,
        };

        Self {
            code: e.code(),
            message: e.to_string(),
            issues,
        }
    }
}

/// Dispatcher output for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcResponse {
    /// Procedure returned a value.
    Result {
        /// Serialized handler output.
        data: Value,
    },
    /// Procedure failed.
    Error(ErrorShape),
}

impl RpcResponse {
    /// Success response.
    pub fn ok(data: Value) -> Self {
        RpcResponse::Result { data }
    }

    /// Error response.
    pub fn error(e: &RpcError) -> Self {
        RpcResponse::Error(ErrorShape::from(e))
    }

    /// Check if this is a success response.
    pub fn is_ok(&self) -> bool {
        matches!(self, RpcResponse::Result { .. })
    }

    /// The data of a success response.
    pub fn data(&self) -> Option<&Value> {
        match self {
            RpcResponse::Result { data } => Some(data),
            RpcResponse::Error(_) => None,
        }
    }

    /// The error of a failed response.
    pub fn error_shape(&self) -> Option<&ErrorShape> {
        match self {
            RpcResponse::Result { .. } => None,
            RpcResponse::Error(shape) => Some(shape),
        }
    }
}

impl From<crate::error::Result<Value>> for RpcResponse {
    fn from(result: crate::error::Result<Value>) -> Self {
        match result {
            Ok(data) => RpcResponse::ok(data),
            Err(e) => RpcResponse::error(&e),
        }
    }
}

/// Uniform success/failure wrapper produced by the caller utilities.
///
/// Exactly one arm is populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultEnvelope<T> {
    /// The call returned a value.
    Success(T),
    /// The call failed with this message.
    Failure(String),
}

impl<T> ResultEnvelope<T> {
    /// Check if the call succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, ResultEnvelope::Success(_))
    }

    /// The value of a successful call.
    pub fn data(&self) -> Option<&T> {
        match self {
            ResultEnvelope::Success(data) => Some(data),
            ResultEnvelope::Failure(_) => None,
        }
    }

    /// The message of a failed call.
    pub fn error(&self) -> Option<&str> {
        match self {
            ResultEnvelope::Success(_) => None,
            ResultEnvelope::Failure(message) => Some(message),
        }
    }

    /// Convert into a `Result`.
    pub fn into_result(self) -> Result<T, String> {
        match self {
            ResultEnvelope::Success(data) => Ok(data),
            ResultEnvelope::Failure(message) => Err(message),
        }
    }

    /// Map the success value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResultEnvelope<U> {
        match self {
            ResultEnvelope::Success(data) => ResultEnvelope::Success(f(data)),
            ResultEnvelope::Failure(message) => ResultEnvelope::Failure(message),
        }
    }
}

impl<T: Serialize> Serialize for ResultEnvelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ResultEnvelope", 3)?;
        match self {
            ResultEnvelope::Success(data) => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
                state.serialize_field("error", &None::<&str>)?;
            }
            ResultEnvelope::Failure(message) => {
                state.serialize_field("success", &false)?;
                state.serialize_field("data", &None::<()>)?;
                state.serialize_field("error", message)?;
            }
        }
        state.end()
    }
}

#[derive(Deserialize)]
struct EnvelopeWire {
    success: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Option<String>,
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for ResultEnvelope<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = EnvelopeWire::deserialize(deserializer)?;

        match (wire.success, wire.error) {
            (true, None) => T::deserialize(wire.data)
                .map(ResultEnvelope::Success)
                .map_err(de::Error::custom),
            (true, Some(_)) => Err(de::Error::custom(
                "successful envelope must not carry an error",
            )),
            (false, Some(message)) if wire.data.is_null() => Ok(ResultEnvelope::Failure(message)),
            (false, Some(_)) => Err(de::Error::custom(
                "failed envelope must not carry data",
            )),
            (false, None) => Err(de::Error::missing_field("error")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rpc_response_wire_shape() {
        let ok = RpcResponse::ok(json!({ "status": "ok" }));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({ "result": { "data": { "status": "ok" } } })
        );

        let err = RpcResponse::error(&RpcError::Unauthorized);
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({ "error": {
                "code": "UNAUTHORIZED",
                "message": "You must be logged in to access this resource."
            } })
        );
    }

    #[test]
    fn test_invalid_input_carries_issues() {
        let mut issues = InputIssues::new();
        issues.push("email", "invalid email");
        let response = RpcResponse::error(&RpcError::InvalidInput(issues));

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["error"]["code"], "BAD_REQUEST");
        assert_eq!(value["error"]["issues"][0]["path"], "email");
        assert_eq!(value["error"]["issues"][0]["message"], "invalid email");
    }

    #[test]
    fn test_rpc_response_from_result() {
        let ok: RpcResponse = Ok(json!(1)).into();
        assert!(ok.is_ok());
        assert_eq!(ok.data(), Some(&json!(1)));

        let err: RpcResponse = Err(RpcError::ProcedureNotFound("nope".into())).into();
        assert!(!err.is_ok());
        assert_eq!(err.error_shape().unwrap().code, ErrorCode::NotFound);
    }

    #[test]
    fn test_envelope_serialization() {
        let ok = ResultEnvelope::Success("hi".to_string());
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({ "success": true, "data": "hi", "error": null })
        );

        let failed: ResultEnvelope<String> = ResultEnvelope::Failure("boom".into());
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({ "success": false, "data": null, "error": "boom" })
        );
    }

    #[test]
    fn test_envelope_deserialization() {
        let ok: ResultEnvelope<u32> =
            serde_json::from_value(json!({ "success": true, "data": 7, "error": null })).unwrap();
        assert_eq!(ok, ResultEnvelope::Success(7));

        let unit: ResultEnvelope<Option<u32>> =
            serde_json::from_value(json!({ "success": true, "data": null, "error": null }))
                .unwrap();
        assert_eq!(unit, ResultEnvelope::Success(None));

        let failed: ResultEnvelope<u32> =
            serde_json::from_value(json!({ "success": false, "data": null, "error": "boom" }))
                .unwrap();
        assert_eq!(failed.error(), Some("boom"));
    }

    #[test]
    fn test_envelope_rejects_mixed_arms() {
        let both = serde_json::from_value::<ResultEnvelope<u32>>(
            json!({ "success": true, "data": 1, "error": "boom" }),
        );
        assert!(both.is_err());

        let data_on_failure = serde_json::from_value::<ResultEnvelope<u32>>(
            json!({ "success": false, "data": 1, "error": "boom" }),
        );
        assert!(data_on_failure.is_err());

        let no_message =
            serde_json::from_value::<ResultEnvelope<u32>>(json!({ "success": false }));
        assert!(no_message.is_err());
    }

    #[test]
    fn test_envelope_helpers() {
        let ok = ResultEnvelope::Success(2).map(|n| n * 2);
        assert!(ok.is_success());
        assert_eq!(ok.data(), Some(&4));
        assert_eq!(ok.into_result(), Ok(4));

        let failed: ResultEnvelope<i32> = ResultEnvelope::Failure("x".into());
        assert_eq!(failed.data(), None);
        assert_eq!(failed.into_result(), Err("x".to_string()));
    }
}
