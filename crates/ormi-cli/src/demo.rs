//! Demo `Calculator` service.

use hyper::Method;
use ormi_common::protocol::{ParamType, Value};
use ormi_server::service::{Service, ServiceBuilder};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Name the demo service is registered under.
pub const SERVICE_NAME: &str = "Calculator";

/// Record argument of `processData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexData {
    pub name: String,
    pub value: i32,
    pub active: bool,
}

impl ComplexData {
    pub fn processed(self) -> Self {
        Self {
            name: format!("Processed: {}", self.name),
            value: self.value.saturating_mul(10),
            active: !self.active,
        }
    }
}

pub struct Calculator {
    started: Instant,
}

impl Calculator {
    pub fn new() -> Self {
        Self { started: Instant::now() }
    }

    pub fn add(&self, a: i32, b: i32) -> i32 {
        a.wrapping_add(b)
    }

    pub fn echo(&self, message: Option<&str>) -> String {
        match message {
            Some(message) => format!("Echo from server: {}", message),
            None => "Echo: You sent null!".to_string(),
        }
    }

    pub fn status(&self) -> String {
        format!(
            "CalculatorService is UP and running for {}s",
            self.started.elapsed().as_secs()
        )
    }

    pub fn greet_all(&self, names: &[String]) -> String {
        if names.is_empty() {
            return "Hello, an empty list of guests!".to_string();
        }
        format!("Hello, {}!", names.join(", "))
    }

    pub fn sum_array(&self, numbers: &[i32]) -> i32 {
        numbers.iter().fold(0i32, |acc, n| acc.wrapping_add(*n))
    }
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the `Calculator` service with its routes under `/calculator`.
pub fn calculator() -> Service {
    ServiceBuilder::new(Calculator::new())
        .base_path("/calculator")
        .method("add", &[ParamType::Int, ParamType::Int], ParamType::Int, |calc, args| {
            Ok(calc.add(args.i32(0)?, args.i32(1)?).into())
        })
        .route(Method::POST, "/add")
        .method("echo", &[ParamType::Str], ParamType::Str, |calc, args| {
            Ok(calc.echo(args.opt_str(0)?).into())
        })
        .route(Method::POST, "/echo")
        .method("processData", &[ParamType::Record], ParamType::Record, |_, args| {
            let data = match args.get(0)? {
                Value::Null => ComplexData {
                    name: "Error: Null input received".to_string(),
                    value: -1,
                    active: false,
                },
                _ => args.to_struct::<ComplexData>(0)?.processed(),
            };
            Ok(Value::record(&data)?)
        })
        .route(Method::POST, "/process")
        .method("getStatus", &[], ParamType::Str, |calc, _| Ok(calc.status().into()))
        .route(Method::GET, "/status")
        .method(
            "greetAll",
            &[ParamType::list_of(ParamType::Str)],
            ParamType::Str,
            |calc, args| {
                let names = match args.get(0)? {
                    Value::Null => Vec::new(),
                    _ => args.str_list(0)?,
                };
                Ok(calc.greet_all(&names).into())
            },
        )
        .route(Method::POST, "/greet")
        .method(
            "sumArray",
            &[ParamType::list_of(ParamType::Int)],
            ParamType::Int,
            |calc, args| {
                let numbers = match args.get(0)? {
                    Value::Null => Vec::new(),
                    _ => args
                        .list(0)?
                        .iter()
                        .map(|n| n.as_i32().ok_or("sumArray expects a list of int"))
                        .collect::<Result<Vec<_>, _>>()?,
                };
                Ok(calc.sum_array(&numbers).into())
            },
        )
        .route(Method::POST, "/sum")
        .method("causeError", &[], ParamType::Unit, |_, _| {
            Err("Intentional error from CalculatorService!".into())
        })
        .route(Method::POST, "/error")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormi_common::transport::Reply;
    use ormi_server::config::MiddlewareConfig;
    use ormi_server::Platform;

    fn platform() -> Platform {
        let platform = Platform::new(MiddlewareConfig::ephemeral());
        platform.register(SERVICE_NAME, calculator()).unwrap();
        platform
    }

    async fn call(platform: &Platform, method: &str, params: &str) -> Reply {
        let line = format!("{}|{}|{}", SERVICE_NAME, method, params);
        ormi_common::transport::LineCodec::decode_reply(&platform.dispatcher().dispatch_line(&line).await)
    }

    #[test]
    fn test_processed() {
        let data = ComplexData {
            name: "x".into(),
            value: 4,
            active: true,
        };
        assert_eq!(
            data.processed(),
            ComplexData {
                name: "Processed: x".into(),
                value: 40,
                active: false,
            }
        );
    }

    #[test]
    fn test_greet_all() {
        let calc = Calculator::new();
        assert_eq!(calc.greet_all(&[]), "Hello, an empty list of guests!");
        assert_eq!(calc.greet_all(&["Ana".into(), "Bo".into()]), "Hello, Ana, Bo!");
    }

    #[tokio::test]
    async fn test_demo_methods() {
        let platform = platform();
        assert_eq!(call(&platform, "add", "[10,20]").await, Reply::Success("30".into()));
        assert_eq!(
            call(&platform, "echo", "[null]").await,
            Reply::Success("\"Echo: You sent null!\"".into())
        );
        assert_eq!(call(&platform, "sumArray", "[[1,2,3]]").await, Reply::Success("6".into()));
        assert_eq!(
            call(&platform, "greetAll", r#"[["Ana"]]"#).await,
            Reply::Success("\"Hello, Ana!\"".into())
        );
    }

    #[tokio::test]
    async fn test_process_data_record() {
        let platform = platform();
        let reply = call(&platform, "processData", r#"[{"name":"x","value":2,"active":false}]"#).await;
        match reply {
            Reply::Success(json) => {
                let data: ComplexData = serde_json::from_str(&json).unwrap();
                assert_eq!(data.name, "Processed: x");
                assert_eq!(data.value, 20);
                assert!(data.active);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cause_error() {
        match call(&platform(), "causeError", "[]").await {
            Reply::Error(message) => assert!(message.contains("Intentional error")),
            other => panic!("expected error, got {:?}", other),
        }
    }
}
