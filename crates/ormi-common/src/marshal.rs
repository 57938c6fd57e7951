//! JSON Marshalling
//!
//! Converts between the JSON wire text used by every transport and typed
//! [`Value`]s. Parameters always travel as a JSON array; results as a single
//! JSON value.
//!
//! Conversion is strict: a JSON string is never coerced into a number, an
//! integer must fit the declared width, and a `char` is a one-character
//! string.

use serde_json::Value as JsonValue;

use crate::protocol::error::{RemotingError, Result};
use crate::protocol::value::{ParamType, Value};

/// JSON marshaller for parameters and results.
///
/// # Example
///
/// ```
/// use ormi_common::{JsonMarshaller, ParamType, Value};
///
/// let marshaller = JsonMarshaller::new();
/// let args = marshaller
///     .decode_parameters("[10, 20]", &[ParamType::Int, ParamType::Int])
///     .unwrap();
/// assert_eq!(args, vec![Value::Int(10), Value::Int(20)]);
/// assert_eq!(marshaller.encode(&Value::Int(30)).unwrap(), "30");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMarshaller;

impl JsonMarshaller {
    pub fn new() -> Self {
        JsonMarshaller
    }

    /// Encode a value as JSON text. `Null` encodes as `null`.
    pub fn encode(&self, value: &Value) -> Result<String> {
        if value.is_null() {
            return Ok("null".to_string());
        }
        Ok(serde_json::to_string(&value.to_json()?)?)
    }

    /// Decode a single value of the declared type.
    ///
    /// Empty text and `null` decode to [`Value::Null`] for reference types
    /// and fail for primitives.
    pub fn decode(&self, text: &str, ty: &ParamType) -> Result<Value> {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
            return self.convert(&JsonValue::Null, ty);
        }
        let raw: JsonValue = serde_json::from_str(trimmed).map_err(|e| RemotingError::Marshalling {
            message: format!("Error unmarshalling JSON to {}: {}", ty, e),
            source: Some(e),
        })?;
        self.convert(&raw, ty)
    }

    /// Parse a parameter array without converting its elements.
    ///
    /// Empty text is treated as `[]`.
    pub fn parse_parameters(&self, text: &str) -> Result<Vec<JsonValue>> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<JsonValue>(trimmed) {
            Ok(JsonValue::Array(items)) => Ok(items),
            Ok(other) => Err(RemotingError::marshalling(format!(
                "Parameters must be a JSON array, got: {}",
                other
            ))),
            Err(e) => Err(RemotingError::Marshalling {
                message: format!("Error unmarshalling parameters array from JSON: {}. {}", trimmed, e),
                source: Some(e),
            }),
        }
    }

    /// Decode a parameter array against the declared parameter types.
    pub fn decode_parameters(&self, text: &str, types: &[ParamType]) -> Result<Vec<Value>> {
        if text.trim().is_empty() && !types.is_empty() {
            return Err(RemotingError::marshalling(format!(
                "Received empty parameters JSON, but expected {} parameters",
                types.len()
            )));
        }
        let raw = self.parse_parameters(text)?;
        self.convert_parameters(&raw, types)
    }

    /// Convert already-parsed parameters against the declared types.
    pub fn convert_parameters(&self, raw: &[JsonValue], types: &[ParamType]) -> Result<Vec<Value>> {
        if raw.len() != types.len() {
            return Err(RemotingError::marshalling(format!(
                "Parameter count mismatch. Expected {} parameters, but received {}",
                types.len(),
                raw.len()
            )));
        }
        raw.iter()
            .zip(types)
            .enumerate()
            .map(|(index, (item, ty))| {
                self.convert(item, ty).map_err(|e| {
                    RemotingError::marshalling(format!(
                        "Error converting parameter at index {} to {}: {}",
                        index, ty, e
                    ))
                })
            })
            .collect()
    }

    /// Convert one JSON value into a [`Value`] of the declared type.
    pub fn convert(&self, raw: &JsonValue, ty: &ParamType) -> Result<Value> {
        if raw.is_null() {
            return if ty.is_nullable() {
                Ok(Value::Null)
            } else {
                Err(RemotingError::marshalling(format!("null is not a valid {}", ty)))
            };
        }

        match ty {
            ParamType::Bool => raw.as_bool().map(Value::Bool).ok_or_else(|| mismatch(raw, ty)),
            ParamType::Int => raw
                .as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .map(Value::Int)
                .ok_or_else(|| mismatch(raw, ty)),
            ParamType::Long => raw.as_i64().map(Value::Long).ok_or_else(|| mismatch(raw, ty)),
            ParamType::Double => raw.as_f64().map(Value::Double).ok_or_else(|| mismatch(raw, ty)),
            ParamType::Char => {
                let s = raw.as_str().ok_or_else(|| mismatch(raw, ty))?;
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Char(c)),
                    _ => Err(mismatch(raw, ty)),
                }
            }
            ParamType::Str => raw
                .as_str()
                .map(|s| Value::Str(s.to_string()))
                .ok_or_else(|| mismatch(raw, ty)),
            ParamType::List(elem) => {
                let items = raw.as_array().ok_or_else(|| mismatch(raw, ty))?;
                items
                    .iter()
                    .map(|item| self.convert(item, elem))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::List)
            }
            ParamType::Record => raw
                .as_object()
                .map(|map| Value::Record(map.clone()))
                .ok_or_else(|| mismatch(raw, ty)),
            ParamType::Any => Ok(infer(raw)),
            ParamType::Unit => Err(mismatch(raw, ty)),
        }
    }
}

/// Picks the narrowest value for an untyped JSON value.
fn infer(raw: &JsonValue) -> Value {
    match raw {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => i32::try_from(i).map(Value::Int).unwrap_or(Value::Long(i)),
            None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => Value::Str(s.clone()),
        JsonValue::Array(items) => Value::List(items.iter().map(infer).collect()),
        JsonValue::Object(map) => Value::Record(map.clone()),
    }
}

fn mismatch(raw: &JsonValue, ty: &ParamType) -> RemotingError {
    RemotingError::marshalling(format!("cannot convert {} to {}", raw, ty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ErrorKind;
    use serde_json::json;

    fn round_trip(value: Value) {
        let m = JsonMarshaller::new();
        let text = m.encode(&value).unwrap();
        let decoded = m.decode(&text, &value.param_type()).unwrap();
        assert_eq!(decoded, value, "round trip through {}", text);
    }

    #[test]
    fn test_round_trip_representative_values() {
        round_trip(Value::Int(-42));
        round_trip(Value::Long(i64::from(i32::MAX) + 1));
        round_trip(Value::Double(2.5));
        round_trip(Value::Bool(true));
        round_trip(Value::Char('x'));
        round_trip(Value::Str("hello | world".into()));
        round_trip(Value::from(vec!["a", "b"]));
        round_trip(Value::Null);
    }

    #[test]
    fn test_round_trip_nested_record() {
        let record = json!({
            "name": "data",
            "value": 10,
            "active": true,
            "inner": {"tags": ["x", "y"], "score": 1.5}
        });
        let map = record.as_object().unwrap().clone();
        round_trip(Value::Record(map.clone()));
        round_trip(Value::List(vec![Value::Record(map.clone()), Value::Record(map)]));
    }

    #[test]
    fn test_mixed_lists_come_back_widened() {
        let m = JsonMarshaller::new();
        let cases = [
            (
                Value::List(vec![Value::Long(1), Value::Int(2)]),
                Value::List(vec![Value::Long(1), Value::Long(2)]),
            ),
            (
                Value::List(vec![Value::Char('a'), Value::Str("b".into())]),
                Value::from(vec!["a", "b"]),
            ),
            (
                Value::List(vec![Value::Int(1), Value::Double(0.5)]),
                Value::List(vec![Value::Double(1.0), Value::Double(0.5)]),
            ),
        ];
        for (value, expected) in cases {
            let text = m.encode(&value).unwrap();
            assert_eq!(m.decode(&text, &value.param_type()).unwrap(), expected, "{}", text);
        }
    }

    #[test]
    fn test_encode_null() {
        assert_eq!(JsonMarshaller::new().encode(&Value::Null).unwrap(), "null");
    }

    #[test]
    fn test_decode_parameters() {
        let m = JsonMarshaller::new();
        let values = m
            .decode_parameters(r#"[1, "two", [3, 4]]"#, &[
                ParamType::Int,
                ParamType::Str,
                ParamType::list_of(ParamType::Int),
            ])
            .unwrap();
        assert_eq!(
            values,
            vec![Value::Int(1), Value::Str("two".into()), Value::from(vec![3, 4])]
        );
    }

    #[test]
    fn test_empty_parameters_for_zero_arity() {
        let m = JsonMarshaller::new();
        assert!(m.decode_parameters("", &[]).unwrap().is_empty());
        assert!(m.decode_parameters("  []  ", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_empty_body_with_declared_parameters_fails() {
        let err = JsonMarshaller::new().decode_parameters("", &[ParamType::Int]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MarshallingError);
    }

    #[test]
    fn test_count_mismatch() {
        let err = JsonMarshaller::new()
            .decode_parameters("[1]", &[ParamType::Int, ParamType::Int])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MarshallingError);
        assert!(err.to_string().contains("count mismatch"));
    }

    #[test]
    fn test_not_a_sequence() {
        let m = JsonMarshaller::new();
        assert!(m.decode_parameters("{\"a\": 1}", &[ParamType::Int]).is_err());
        assert!(m.decode_parameters("[1,", &[ParamType::Int]).is_err());
    }

    #[test]
    fn test_strings_are_not_coerced_to_numbers() {
        let err = JsonMarshaller::new()
            .decode_parameters(r#"["a", "b"]"#, &[ParamType::Int, ParamType::Int])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MarshallingError);
        assert!(err.to_string().contains("index 0"));
    }

    #[test]
    fn test_int_overflow_is_rejected() {
        let m = JsonMarshaller::new();
        assert!(m.decode("3000000000", &ParamType::Int).is_err());
        assert_eq!(m.decode("3000000000", &ParamType::Long).unwrap(), Value::Long(3_000_000_000));
    }

    #[test]
    fn test_double_accepts_integers() {
        assert_eq!(
            JsonMarshaller::new().decode("3", &ParamType::Double).unwrap(),
            Value::Double(3.0)
        );
    }

    #[test]
    fn test_null_handling() {
        let m = JsonMarshaller::new();
        assert_eq!(m.decode("null", &ParamType::Str).unwrap(), Value::Null);
        assert_eq!(m.decode("", &ParamType::Record).unwrap(), Value::Null);
        assert!(m.decode("null", &ParamType::Int).is_err());
        assert!(m.decode_parameters("[null]", &[ParamType::Bool]).is_err());
        assert_eq!(m.decode_parameters("[null]", &[ParamType::Str]).unwrap(), vec![Value::Null]);
    }

    #[test]
    fn test_char_requires_single_character() {
        let m = JsonMarshaller::new();
        assert_eq!(m.decode("\"q\"", &ParamType::Char).unwrap(), Value::Char('q'));
        assert!(m.decode("\"qq\"", &ParamType::Char).is_err());
    }

    #[test]
    fn test_any_infers_narrowest_kind() {
        let m = JsonMarshaller::new();
        let v = m.decode(r#"[1, 5000000000, 1.5, "s", {"k": null}]"#, &ParamType::Any).unwrap();
        match v {
            Value::List(items) => {
                assert_eq!(items[0], Value::Int(1));
                assert_eq!(items[1], Value::Long(5_000_000_000));
                assert_eq!(items[2], Value::Double(1.5));
                assert_eq!(items[3], Value::Str("s".into()));
                assert!(matches!(items[4], Value::Record(_)));
            }
            other => panic!("expected list, got {:?}", other),
        }
    }
}
