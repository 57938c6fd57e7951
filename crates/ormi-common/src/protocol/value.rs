//! Tagged Values and Declared Types
//!
//! Every argument and return value that crosses the wire is represented as a
//! [`Value`]: the payload plus an explicit kind tag. Methods declare what they
//! accept with [`ParamType`]. Keeping both sides explicit lets the resolver
//! check compatibility without any runtime type inspection.
//!
//! # Type Mapping
//!
//! | ParamType | Value | JSON |
//! |-----------|-------|------|
//! | `Bool` | `Bool` | boolean |
//! | `Char` | `Char` | one-character string |
//! | `Int` | `Int` (i32) | integer |
//! | `Long` | `Long` (i64) | integer |
//! | `Double` | `Double` (f64) | number |
//! | `Str` | `Str` | string |
//! | `List(T)` | `List` | array |
//! | `Record` | `Record` | object |
//! | `Any` | any of the above | any |
//!
//! `Bool`, `Char`, `Int`, `Long` and `Double` are primitives: they can never be
//! absent. Every other parameter type also accepts `Null`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value as JsonValue};
use std::fmt;

use super::error::{RemotingError, Result};

/// A runtime value carried by an invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Char(char),
    Int(i32),
    Long(i64),
    Double(f64),
    Str(String),
    List(Vec<Value>),
    Record(Map<String, JsonValue>),
}

/// The kind tag of a [`Value`].
///
/// These are the "boxed" runtime forms: a primitive parameter of the same
/// name accepts them directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Char,
    Int,
    Long,
    Double,
    Str,
    List,
    Record,
}

/// Declared type of a method parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    Bool,
    Char,
    Int,
    Long,
    Double,
    Str,
    List(Box<ParamType>),
    Record,
    Any,
    /// Only meaningful as a return type.
    Unit,
}

impl ParamType {
    pub fn list_of(elem: ParamType) -> Self {
        ParamType::List(Box::new(elem))
    }

    /// Primitives are value types that can never be absent.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            ParamType::Bool | ParamType::Char | ParamType::Int | ParamType::Long | ParamType::Double
        )
    }

    pub fn is_nullable(&self) -> bool {
        !self.is_primitive()
    }

    /// The runtime kind a primitive parameter unboxes from.
    pub fn boxed_kind(&self) -> Option<ValueKind> {
        match self {
            ParamType::Bool => Some(ValueKind::Bool),
            ParamType::Char => Some(ValueKind::Char),
            ParamType::Int => Some(ValueKind::Int),
            ParamType::Long => Some(ValueKind::Long),
            ParamType::Double => Some(ValueKind::Double),
            _ => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Bool => f.write_str("boolean"),
            ParamType::Char => f.write_str("char"),
            ParamType::Int => f.write_str("int"),
            ParamType::Long => f.write_str("long"),
            ParamType::Double => f.write_str("double"),
            ParamType::Str => f.write_str("String"),
            ParamType::List(elem) => write!(f, "List<{}>", elem),
            ParamType::Record => f.write_str("Record"),
            ParamType::Any => f.write_str("Object"),
            ParamType::Unit => f.write_str("void"),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "Boolean",
            ValueKind::Char => "Character",
            ValueKind::Int => "Integer",
            ValueKind::Long => "Long",
            ValueKind::Double => "Double",
            ValueKind::Str => "String",
            ValueKind::List => "List",
            ValueKind::Record => "Record",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Char(_) => ValueKind::Char,
            Value::Int(_) => ValueKind::Int,
            Value::Long(_) => ValueKind::Long,
            Value::Double(_) => ValueKind::Double,
            Value::Str(_) => ValueKind::Str,
            Value::List(_) => ValueKind::List,
            Value::Record(_) => ValueKind::Record,
        }
    }

    /// The narrowest declared type that decodes back into this value.
    ///
    /// Lists report the common type of their elements. Mixed numbers widen
    /// (`Int` to `Long` to `Double`), `Char` widens to `Str` and a null
    /// element takes the type of its non-primitive neighbours. Elements of a
    /// widened list decode back at the wider type, and lists with no common
    /// type report `Any`.
    pub fn param_type(&self) -> ParamType {
        match self {
            Value::Null => ParamType::Any,
            Value::Bool(_) => ParamType::Bool,
            Value::Char(_) => ParamType::Char,
            Value::Int(_) => ParamType::Int,
            Value::Long(_) => ParamType::Long,
            Value::Double(_) => ParamType::Double,
            Value::Str(_) => ParamType::Str,
            Value::Record(_) => ParamType::Record,
            Value::List(items) => {
                let elem = items
                    .iter()
                    .map(Value::param_type)
                    .try_fold(None, |acc: Option<ParamType>, t| match acc {
                        None => Some(Some(t)),
                        Some(acc) => widen(acc, t).map(Some),
                    });
                ParamType::list_of(elem.flatten().unwrap_or(ParamType::Any))
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match self {
            Value::Char(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers of either width.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(i64::from(*i)),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Any numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(f64::from(*i)),
            Value::Long(l) => Some(*l as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Map<String, JsonValue>> {
        match self {
            Value::Record(map) => Some(map),
            _ => None,
        }
    }

    /// Builds a `Record` from any serializable struct.
    pub fn record<T: Serialize>(value: &T) -> Result<Value> {
        match serde_json::to_value(value)? {
            JsonValue::Object(map) => Ok(Value::Record(map)),
            other => Err(RemotingError::marshalling(format!(
                "Expected a record, serialized to {}",
                other
            ))),
        }
    }

    /// Deserializes a `Record` into a typed struct.
    pub fn to_struct<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            Value::Record(map) => Ok(serde_json::from_value(JsonValue::Object(map.clone()))?),
            other => Err(RemotingError::marshalling(format!(
                "Expected a Record, found {}",
                other.kind()
            ))),
        }
    }

    /// Converts to the JSON representation used on the wire.
    ///
    /// Fails only for non-finite doubles, which JSON cannot carry.
    pub fn to_json(&self) -> Result<JsonValue> {
        Ok(match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Char(c) => JsonValue::String(c.to_string()),
            Value::Int(i) => JsonValue::from(*i),
            Value::Long(l) => JsonValue::from(*l),
            Value::Double(d) => Number::from_f64(*d)
                .map(JsonValue::Number)
                .ok_or_else(|| RemotingError::marshalling(format!("Cannot encode non-finite double {}", d)))?,
            Value::Str(s) => JsonValue::String(s.clone()),
            Value::List(items) => JsonValue::Array(
                items.iter().map(Value::to_json).collect::<Result<Vec<_>>>()?,
            ),
            Value::Record(map) => JsonValue::Object(map.clone()),
        })
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

/// The narrowest type both `a` and `b` decode under, if there is one.
fn widen(a: ParamType, b: ParamType) -> Option<ParamType> {
    use ParamType::*;

    match (a, b) {
        (a, b) if a == b => Some(a),
        (Int, Long) | (Long, Int) => Some(Long),
        (Int | Long, Double) | (Double, Int | Long) => Some(Double),
        (Char, Str) | (Str, Char) => Some(Str),
        (Any, t) | (t, Any) if t.is_nullable() => Some(t),
        (List(a), List(b)) => widen(*a, *b).map(ParamType::list_of),
        _ => None,
    }
}
