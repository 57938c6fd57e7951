//! Integration tests for the transport layer
//!
//! These tests verify that a marshalled result survives the line framing and
//! that errors keep their kind through the HTTP envelope.

#[cfg(test)]
mod tests {
    use crate::marshal::JsonMarshaller;
    use crate::protocol::{ParamType, RemotingError, Value};
    use crate::transport::{ErrorBody, LineCodec, Reply};
    use serde_json::json;

    #[test]
    fn test_request_line_feeds_marshaller() {
        let line = LineCodec::encode_request("Calc", "add", "[10, 20]");
        let request = LineCodec::decode_request(&line).unwrap();

        let args = JsonMarshaller::new()
            .decode_parameters(&request.params, &[ParamType::Int, ParamType::Int])
            .unwrap();
        assert_eq!(args, vec![Value::Int(10), Value::Int(20)]);
    }

    #[test]
    fn test_record_result_reply() {
        let record = json!({"name": "Processed: x", "value": 100, "active": false});
        let value = Value::Record(record.as_object().unwrap().clone());

        let text = JsonMarshaller::new().encode(&value).unwrap();
        let line = LineCodec::encode_success(&text);

        match LineCodec::decode_reply(&line) {
            Reply::Success(json_text) => {
                let parsed: serde_json::Value = serde_json::from_str(&json_text).unwrap();
                assert_eq!(parsed, record);
            }
            Reply::Error(msg) => panic!("unexpected error reply: {}", msg),
        }
    }

    #[test]
    fn test_error_reply_names_missing_method() {
        let err = RemotingError::MethodNotFound("missing on service Calc".into());
        let line = LineCodec::encode_error(&err.to_string());
        assert_eq!(
            LineCodec::decode_reply(&line),
            Reply::Error("Method not found: missing on service Calc".into())
        );
    }

    #[test]
    fn test_error_body_round_trip() {
        let body = ErrorBody::from(&RemotingError::marshalling("bad"));
        let encoded = serde_json::to_string(&body).unwrap();
        let decoded: ErrorBody = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.error, "MarshallingError");
        assert_eq!(decoded, body);
    }
}
