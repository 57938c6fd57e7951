//! Service Definitions
//!
//! A service is an application object plus the table of methods it exposes
//! remotely. The table is declared once with [`ServiceBuilder`]: each entry
//! carries the method name, its ordered parameter types, its return type and
//! a handler closure that unpacks [`Args`] and calls into the object.
//!
//! # Example
//!
//! ```
//! use hyper::Method;
//! use ormi_common::ParamType;
//! use ormi_server::service::ServiceBuilder;
//!
//! struct Calc;
//!
//! impl Calc {
//!     fn add(&self, a: i32, b: i32) -> i32 {
//!         a + b
//!     }
//! }
//!
//! let service = ServiceBuilder::new(Calc)
//!     .base_path("/calc")
//!     .method("add", &[ParamType::Int, ParamType::Int], ParamType::Int, |calc, args| {
//!         Ok(calc.add(args.i32(0)?, args.i32(1)?).into())
//!     })
//!     .route(Method::POST, "/add")
//!     .build();
//!
//! assert_eq!(service.methods().len(), 1);
//! ```

use hyper::Method;
use ormi_common::protocol::{BoxError, ParamType, ServiceId, Value, ValueKind};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Type-erased handler bound to its target object.
pub type BoundHandler = Arc<dyn Fn(&Args) -> Result<Value, BoxError> + Send + Sync>;

/// Failure to bind an argument to what the handler asked for.
///
/// Reported as an invocation error rather than a callee failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("Argument index {index} out of range ({len} arguments)")]
    Missing { index: usize, len: usize },

    #[error("Argument {index}: expected {expected}, found {actual}")]
    WrongType {
        index: usize,
        expected: &'static str,
        actual: ValueKind,
    },

    #[error("Argument {index}: {message}")]
    Decode { index: usize, message: String },
}

/// Positional arguments of a resolved call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<Value>,
}

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Result<&Value, ArgumentError> {
        self.values.get(index).ok_or(ArgumentError::Missing {
            index,
            len: self.values.len(),
        })
    }

    fn typed<'a, T>(
        &'a self,
        index: usize,
        expected: &'static str,
        extract: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T, ArgumentError> {
        let value = self.get(index)?;
        extract(value).ok_or(ArgumentError::WrongType {
            index,
            expected,
            actual: value.kind(),
        })
    }

    pub fn bool(&self, index: usize) -> Result<bool, ArgumentError> {
        self.typed(index, "boolean", Value::as_bool)
    }

    pub fn char(&self, index: usize) -> Result<char, ArgumentError> {
        self.typed(index, "char", Value::as_char)
    }

    pub fn i32(&self, index: usize) -> Result<i32, ArgumentError> {
        self.typed(index, "int", Value::as_i32)
    }

    /// Accepts `Int` as well as `Long`.
    pub fn i64(&self, index: usize) -> Result<i64, ArgumentError> {
        self.typed(index, "long", Value::as_i64)
    }

    /// Accepts any numeric argument.
    pub fn f64(&self, index: usize) -> Result<f64, ArgumentError> {
        self.typed(index, "double", Value::as_f64)
    }

    pub fn str(&self, index: usize) -> Result<&str, ArgumentError> {
        self.typed(index, "String", Value::as_str)
    }

    /// Like [`Args::str`], but `Null` yields `None`.
    pub fn opt_str(&self, index: usize) -> Result<Option<&str>, ArgumentError> {
        match self.get(index)? {
            Value::Null => Ok(None),
            _ => self.str(index).map(Some),
        }
    }

    pub fn list(&self, index: usize) -> Result<&[Value], ArgumentError> {
        self.typed(index, "List", Value::as_list)
    }

    /// A list of strings. `Null` elements are rejected.
    pub fn str_list(&self, index: usize) -> Result<Vec<String>, ArgumentError> {
        self.list(index)?
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or(ArgumentError::WrongType {
                    index,
                    expected: "List<String>",
                    actual: item.kind(),
                })
            })
            .collect()
    }

    pub fn record(&self, index: usize) -> Result<&Map<String, JsonValue>, ArgumentError> {
        self.typed(index, "Record", Value::as_record)
    }

    /// Deserializes a `Record` argument into a struct.
    pub fn to_struct<T: DeserializeOwned>(&self, index: usize) -> Result<T, ArgumentError> {
        let map = self.record(index)?;
        serde_json::from_value(JsonValue::Object(map.clone())).map_err(|e| ArgumentError::Decode {
            index,
            message: e.to_string(),
        })
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

/// Name, parameter types and return type of a remote method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: String,
    pub params: Vec<ParamType>,
    pub returns: ParamType,
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.returns, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", param)?;
        }
        f.write_str(")")
    }
}

/// HTTP route declared for a method, relative to the service base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRoute {
    pub verb: Method,
    pub path: String,
}

/// One entry of a service's method table.
pub struct RemoteMethod {
    signature: MethodSignature,
    handler: BoundHandler,
    route: Option<MethodRoute>,
}

impl RemoteMethod {
    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    pub fn name(&self) -> &str {
        &self.signature.name
    }

    pub fn params(&self) -> &[ParamType] {
        &self.signature.params
    }

    pub fn arity(&self) -> usize {
        self.signature.params.len()
    }

    pub fn returns(&self) -> &ParamType {
        &self.signature.returns
    }

    pub fn route(&self) -> Option<&MethodRoute> {
        self.route.as_ref()
    }

    /// Runs the handler against its bound object.
    pub fn call(&self, args: &Args) -> Result<Value, BoxError> {
        (self.handler)(args)
    }
}

impl fmt::Debug for RemoteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteMethod")
            .field("signature", &self.signature)
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}

/// A built, not yet registered service.
#[derive(Debug)]
pub struct Service {
    type_name: &'static str,
    base_path: Option<String>,
    methods: Vec<Arc<RemoteMethod>>,
}

impl Service {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn methods(&self) -> &[Arc<RemoteMethod>] {
        &self.methods
    }

    pub(crate) fn into_registered(self, id: ServiceId) -> RegisteredService {
        RegisteredService {
            id,
            type_name: self.type_name,
            base_path: self.base_path,
            methods: self.methods,
        }
    }
}

/// A service as held by the registry. Immutable once built.
#[derive(Debug)]
pub struct RegisteredService {
    id: ServiceId,
    type_name: &'static str,
    base_path: Option<String>,
    methods: Vec<Arc<RemoteMethod>>,
}

impl RegisteredService {
    pub fn id(&self) -> &ServiceId {
        &self.id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    /// Methods in declaration order.
    pub fn methods(&self) -> &[Arc<RemoteMethod>] {
        &self.methods
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m.name() == name)
    }

    /// Full HTTP paths of the routed methods, joined with the base path.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, String, &str)> + '_ {
        self.methods.iter().filter_map(move |m| {
            m.route()
                .map(|r| (&r.verb, join_path(self.base_path(), &r.path), m.name()))
        })
    }
}

fn join_path(base: Option<&str>, path: &str) -> String {
    let base = base.unwrap_or("").trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let joined = if path.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, path)
    };
    if joined.starts_with('/') {
        joined
    } else {
        format!("/{}", joined)
    }
}

/// Declares the remote method table of a service object.
pub struct ServiceBuilder<T> {
    target: Arc<T>,
    base_path: Option<String>,
    methods: Vec<RemoteMethod>,
}

impl<T: Send + Sync + 'static> ServiceBuilder<T> {
    pub fn new(target: T) -> Self {
        Self::from_arc(Arc::new(target))
    }

    /// Builds on a shared object, for callers that keep a handle to it.
    pub fn from_arc(target: Arc<T>) -> Self {
        Self {
            target,
            base_path: None,
            methods: Vec::new(),
        }
    }

    /// Prefix for every route declared with [`ServiceBuilder::route`].
    pub fn base_path(mut self, path: impl Into<String>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Declares a method. Overloads are declared by repeating the name.
    pub fn method<F>(mut self, name: &str, params: &[ParamType], returns: ParamType, handler: F) -> Self
    where
        F: Fn(&T, &Args) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        let target = Arc::clone(&self.target);
        self.methods.push(RemoteMethod {
            signature: MethodSignature {
                name: name.to_string(),
                params: params.to_vec(),
                returns,
            },
            handler: Arc::new(move |args: &Args| handler(&target, args)),
            route: None,
        });
        self
    }

    /// Attaches an HTTP route to the most recently declared method.
    ///
    /// Has no effect before the first [`ServiceBuilder::method`].
    pub fn route(mut self, verb: Method, path: impl Into<String>) -> Self {
        if let Some(last) = self.methods.last_mut() {
            last.route = Some(MethodRoute {
                verb,
                path: path.into(),
            });
        }
        self
    }

    pub fn build(self) -> Service {
        Service {
            type_name: std::any::type_name::<T>(),
            base_path: self.base_path,
            methods: self.methods.into_iter().map(Arc::new).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    struct Greeter {
        greeting: String,
    }

    fn greeter() -> Service {
        ServiceBuilder::new(Greeter {
            greeting: "Hello".into(),
        })
        .base_path("/greeter/")
        .method("greet", &[ParamType::Str], ParamType::Str, |g, args| {
            Ok(format!("{}, {}", g.greeting, args.str(0)?).into())
        })
        .route(Method::POST, "/greet")
        .method("status", &[], ParamType::Str, |_, _| Ok("ok".into()))
        .route(Method::GET, "status")
        .method("greet", &[ParamType::Str, ParamType::Int], ParamType::Str, |g, args| {
            Ok(format!("{} x{}, {}", g.greeting, args.i32(1)?, args.str(0)?).into())
        })
        .build()
    }

    #[test]
    fn test_builder_keeps_declaration_order() {
        let service = greeter();
        let names: Vec<_> = service.methods().iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["greet", "status", "greet"]);
        assert_eq!(service.methods()[2].arity(), 2);
        assert!(service.type_name().ends_with("Greeter"));
    }

    #[test]
    fn test_handler_sees_target() {
        let service = greeter();
        let result = service.methods()[0]
            .call(&Args::new(vec![Value::from("Bob")]))
            .unwrap();
        assert_eq!(result, Value::from("Hello, Bob"));
    }

    #[test]
    fn test_routes_join_base_path() {
        let registered = greeter().into_registered(ServiceId::new("Greeter").unwrap());
        let routes: Vec<_> = registered
            .routes()
            .map(|(verb, path, method)| (verb.clone(), path, method.to_string()))
            .collect();
        assert_eq!(
            routes,
            vec![
                (Method::POST, "/greeter/greet".to_string(), "greet".to_string()),
                (Method::GET, "/greeter/status".to_string(), "status".to_string()),
            ]
        );
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path(None, "add"), "/add");
        assert_eq!(join_path(Some("/calc"), ""), "/calc");
        assert_eq!(join_path(Some("calc/"), "/add"), "/calc/add");
    }

    #[test]
    fn test_args_accessors() {
        let args = Args::new(vec![
            Value::Int(7),
            Value::Long(1 << 40),
            Value::Null,
            Value::List(vec!["a".into(), "b".into()]),
        ]);
        assert_eq!(args.i32(0).unwrap(), 7);
        assert_eq!(args.i64(0).unwrap(), 7);
        assert_eq!(args.f64(1).unwrap(), (1u64 << 40) as f64);
        assert_eq!(args.opt_str(2).unwrap(), None);
        assert_eq!(args.str_list(3).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_args_errors() {
        let args = Args::new(vec![Value::from("x")]);
        assert_eq!(args.get(3).unwrap_err(), ArgumentError::Missing { index: 3, len: 1 });
        assert_eq!(
            args.i32(0).unwrap_err(),
            ArgumentError::WrongType {
                index: 0,
                expected: "int",
                actual: ValueKind::Str
            }
        );
    }

    #[test]
    fn test_args_to_struct() {
        #[derive(Deserialize)]
        struct Data {
            name: String,
            value: i32,
        }

        let map = json!({"name": "x", "value": 5}).as_object().unwrap().clone();
        let args = Args::new(vec![Value::Record(map)]);
        let data: Data = args.to_struct(0).unwrap();
        assert_eq!(data.name, "x");
        assert_eq!(data.value, 5);

        let bad = Args::new(vec![Value::Record(Map::new())]);
        assert!(matches!(bad.to_struct::<Data>(0), Err(ArgumentError::Decode { .. })));
    }

    #[test]
    fn test_signature_display() {
        let service = greeter();
        assert_eq!(service.methods()[2].signature().to_string(), "String greet(String, int)");
    }
}
