//! Wire protocol types for host-plugin communication.
//!
//! The protocol is a minimal JSON-RPC 2.0 dialect: one newline-terminated
//! request frame and one newline-terminated response frame per connection.
//! There is no batching, streaming, or notification support. Request ids are
//! a process-wide strictly increasing counter assigned by the host; they are
//! unique per call and never persisted.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Protocol version stamped on every frame.
pub const JSONRPC_VERSION: &str = "2.0";

/// Reserved method asking a plugin to stop gracefully. The response, if
/// any, is ignored.
pub const METHOD_SHUTDOWN: &str = "shutdown";

/// Reserved method used as the liveness handshake.
pub const METHOD_PING: &str = "ping";

/// Request frame sent from the host to a plugin.
///
/// # Example
///
/// ```
/// use arbor_plugins::WireRequest;
///
/// let request = WireRequest::new(7, "on_load", Some(serde_json::json!({"project": "demo"})));
/// assert_eq!(request.method(), "on_load");
/// assert_eq!(request.id(), 7);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireRequest {
    jsonrpc: String,
    id: u64,
    method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    params: Option<serde_json::Value>,
}

impl WireRequest {
    /// Creates a request frame for the given id and method.
    #[must_use]
    pub fn new(id: u64, method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            method: method.into(),
            params,
        }
    }

    /// Returns the request id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns the method name.
    #[must_use]
    pub const fn method(&self) -> &str {
        self.method.as_str()
    }

    /// Returns the request parameters.
    #[must_use]
    pub const fn params(&self) -> Option<&serde_json::Value> {
        self.params.as_ref()
    }
}

/// Response frame sent from a plugin back to the host.
///
/// A response either carries a `result` value or a structured [`RpcError`];
/// the host surfaces the latter as an application-level failure distinct
/// from transport errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireResponse {
    jsonrpc: String,
    id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

impl WireResponse {
    /// Creates a successful response carrying the given result.
    #[must_use]
    pub fn success(id: u64, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Creates a failed response carrying a structured error.
    #[must_use]
    pub fn failure(id: u64, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Returns the id echoed by the plugin.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns the structured error, if the plugin reported one.
    #[must_use]
    pub const fn error(&self) -> Option<&RpcError> {
        self.error.as_ref()
    }

    /// Consumes the response, yielding the result value or the structured
    /// error. A success frame without an explicit result yields JSON null.
    ///
    /// # Errors
    ///
    /// Returns the [`RpcError`] the plugin reported, when present.
    pub fn into_result(self) -> Result<serde_json::Value, RpcError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(serde_json::Value::Null)),
        }
    }
}

/// Structured error reported by a plugin inside a response frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    /// Returns the plugin-reported error code.
    #[must_use]
    pub const fn code(&self) -> i64 {
        self.code
    }

    /// Returns the plugin-reported error message.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Serialises a message as a single newline-terminated frame.
///
/// # Errors
///
/// Returns the underlying `serde_json` error when the message cannot be
/// serialised.
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut body = serde_json::to_vec(message)?;
    body.push(b'\n');
    Ok(body)
}

/// Parses one frame line, tolerating surrounding whitespace.
///
/// # Errors
///
/// Returns the underlying `serde_json` error when the line is not a valid
/// frame of the expected shape.
pub fn decode_frame<T: DeserializeOwned>(line: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(line.trim())
}

#[cfg(test)]
mod tests;
