//! Unit tests for the wire protocol types.

use serde_json::json;

use super::*;

#[test]
fn request_serialises_to_jsonrpc_shape() {
    let request = WireRequest::new(3, "on_load", Some(json!({"project": "demo"})));
    let value = serde_json::to_value(&request).expect("serialise request");
    assert_eq!(
        value,
        json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "on_load",
            "params": {"project": "demo"},
        })
    );
}

#[test]
fn request_without_params_omits_the_field() {
    let request = WireRequest::new(1, METHOD_PING, None);
    let value = serde_json::to_value(&request).expect("serialise request");
    assert_eq!(
        value,
        json!({"jsonrpc": "2.0", "id": 1, "method": "ping"})
    );
}

#[test]
fn success_response_decodes_result() {
    let line = r#"{"jsonrpc": "2.0", "id": 7, "result": "done"}"#;
    let response: WireResponse = decode_frame(line).expect("decode response");
    assert_eq!(response.id(), 7);
    assert!(response.error().is_none());
    let result = response.into_result().expect("success result");
    assert_eq!(result, json!("done"));
}

#[test]
fn success_response_without_result_yields_null() {
    let line = r#"{"jsonrpc": "2.0", "id": 7}"#;
    let response: WireResponse = decode_frame(line).expect("decode response");
    let result = response.into_result().expect("success result");
    assert!(result.is_null());
}

#[test]
fn error_response_surfaces_structured_error() {
    let line = r#"{"jsonrpc": "2.0", "id": 9, "error": {"code": -32601, "message": "no such method"}}"#;
    let response: WireResponse = decode_frame(line).expect("decode response");
    let error = response.into_result().expect_err("error result");
    assert_eq!(error.code(), -32601);
    assert_eq!(error.message(), "no such method");
}

#[test]
fn encode_frame_terminates_with_newline() {
    let request = WireRequest::new(1, METHOD_SHUTDOWN, None);
    let frame = encode_frame(&request).expect("encode frame");
    assert_eq!(frame.last(), Some(&b'\n'));
    assert_eq!(
        frame.iter().filter(|byte| **byte == b'\n').count(),
        1,
        "exactly one newline per frame"
    );
}

#[test]
fn decode_frame_tolerates_surrounding_whitespace() {
    let response: WireResponse =
        decode_frame("  {\"jsonrpc\": \"2.0\", \"id\": 2, \"result\": 5}\n")
            .expect("decode padded frame");
    assert_eq!(response.id(), 2);
}

#[test]
fn failure_constructor_round_trips_through_wire_shape() {
    let response = WireResponse::failure(4, 13, "boom");
    let value = serde_json::to_value(&response).expect("serialise response");
    assert_eq!(
        value,
        json!({
            "jsonrpc": "2.0",
            "id": 4,
            "error": {"code": 13, "message": "boom"},
        })
    );
}
