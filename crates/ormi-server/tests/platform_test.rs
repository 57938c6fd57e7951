//! End-to-end tests: a platform on ephemeral ports, driven by the clients.

use hyper::Method;
use ormi_client::{DatagramClient, HttpClient, StreamClient};
use ormi_common::protocol::{ParamType, Value};
use ormi_common::transport::Reply;
use ormi_server::config::{InvocationMode, MiddlewareConfig};
use ormi_server::service::ServiceBuilder;
use ormi_server::{Platform, RunningPlatform, Service};
use std::time::Duration;

struct Calculator;

fn calculator() -> Service {
    ServiceBuilder::new(Calculator)
        .base_path("/calculator")
        .method("add", &[ParamType::Int, ParamType::Int], ParamType::Int, |_, a| {
            Ok(Value::Int(a.i32(0)? + a.i32(1)?))
        })
        .route(Method::POST, "/add")
        .method("status", &[], ParamType::Str, |_, _| Ok("Service is running".into()))
        .route(Method::GET, "/status")
        .method("slow", &[], ParamType::Unit, |_, _| {
            std::thread::sleep(Duration::from_millis(500));
            Ok(Value::Null)
        })
        .method("causeError", &[], ParamType::Unit, |_, _| Err("boom".into()))
        .build()
}

async fn start(config: MiddlewareConfig) -> (Platform, RunningPlatform) {
    let platform = Platform::new(config);
    platform.register("Calculator", calculator()).unwrap();
    let running = platform.start().await.unwrap();
    (platform, running)
}

#[tokio::test]
async fn test_stream_add() {
    let (_platform, running) = start(MiddlewareConfig::ephemeral()).await;
    let client = StreamClient::new(running.stream_addr().to_string());

    let reply = client.call("Calculator", "add", "[10,20]").await.unwrap();
    assert_eq!(reply, Reply::Success("30".into()));
    running.shutdown();
}

#[tokio::test]
async fn test_stream_missing_method() {
    let (_platform, running) = start(MiddlewareConfig::ephemeral()).await;
    let client = StreamClient::new(running.stream_addr().to_string());

    match client.call("Calculator", "missing", "[]").await.unwrap() {
        Reply::Error(message) => assert!(message.contains("missing"), "{}", message),
        other => panic!("expected error, got {:?}", other),
    }
    running.shutdown();
}

#[tokio::test]
async fn test_stream_malformed_line() {
    let (_platform, running) = start(MiddlewareConfig::ephemeral()).await;
    let client = StreamClient::new(running.stream_addr().to_string());

    let raw = client.send_line("no separators here").await.unwrap();
    assert!(raw.starts_with("ERROR: "), "{}", raw);
    running.shutdown();
}

#[tokio::test]
async fn test_stream_callee_failure() {
    let (_platform, running) = start(MiddlewareConfig::ephemeral()).await;
    let client = StreamClient::new(running.stream_addr().to_string());

    match client.call("Calculator", "causeError", "[]").await.unwrap() {
        Reply::Error(message) => assert!(message.contains("boom"), "{}", message),
        other => panic!("expected error, got {:?}", other),
    }
    running.shutdown();
}

#[tokio::test]
async fn test_datagram_add_and_heartbeat() {
    let (_platform, running) = start(MiddlewareConfig::ephemeral()).await;
    let addr = running.datagram_addr().to_string();
    let client = DatagramClient::new(addr).with_timeout(Duration::from_secs(5));

    assert!(client.heartbeat().await.unwrap());
    let reply = client.invoke("Calculator", "add", &[Value::Int(1), Value::Int(2)]).await.unwrap();
    assert_eq!(reply, Reply::Success("3".into()));
    running.shutdown();
}

#[tokio::test]
async fn test_http_invoke_path() {
    let (_platform, running) = start(MiddlewareConfig::ephemeral()).await;
    let client = HttpClient::new(running.http_addr().to_string());

    let reply = client.invoke("Calculator", "add", "[10,20]").await.unwrap();
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "30");
    running.shutdown();
}

#[tokio::test]
async fn test_http_route_table() {
    let (_platform, running) = start(MiddlewareConfig::ephemeral()).await;
    let client = HttpClient::new(running.http_addr().to_string());

    let status = client.get("/calculator/status").await.unwrap();
    assert_eq!(status.status, 200);
    assert_eq!(status.body, "\"Service is running\"");

    let add = client.post("/calculator/add", "[2,3]").await.unwrap();
    assert_eq!(add.body, "5");
    running.shutdown();
}

#[tokio::test]
async fn test_http_error_statuses() {
    let (_platform, running) = start(MiddlewareConfig::ephemeral()).await;
    let client = HttpClient::new(running.http_addr().to_string());

    assert_eq!(client.get("/nowhere").await.unwrap().status, 404);
    assert_eq!(client.get("/invoke/Calculator/add").await.unwrap().status, 405);
    assert_eq!(client.request(Method::DELETE, "/calculator/status", "").await.unwrap().status, 405);
    assert_eq!(client.invoke("Nope", "add", "[1,2]").await.unwrap().status, 404);
    assert_eq!(client.invoke("Calculator", "add", "not json").await.unwrap().status, 400);
    assert_eq!(client.invoke("Calculator", "causeError", "[]").await.unwrap().status, 500);

    let missing = client.invoke("Calculator", "missing", "[]").await.unwrap();
    assert_eq!(missing.status, 404);
    let body: serde_json::Value = serde_json::from_str(&missing.body).unwrap();
    assert_eq!(body["error"], "MethodNotFound");
    running.shutdown();
}

#[tokio::test]
async fn test_async_mode_timeout() {
    let config = MiddlewareConfig::ephemeral()
        .with_invocation_mode(InvocationMode::Async)
        .with_async_timeout(Duration::from_millis(100));
    let (platform, running) = start(config).await;
    let client = StreamClient::new(running.stream_addr().to_string());

    match client.call("Calculator", "slow", "[]").await.unwrap() {
        Reply::Error(message) => assert!(message.contains("timed out"), "{}", message),
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(
        client.call("Calculator", "add", "[1,1]").await.unwrap(),
        Reply::Success("2".into())
    );

    let snapshot = platform.metrics();
    assert_eq!(snapshot.total_requests, 2);
    assert_eq!(snapshot.failed_requests, 1);
    running.shutdown();
}

#[tokio::test]
async fn test_unregister_while_serving() {
    let (platform, running) = start(MiddlewareConfig::ephemeral()).await;
    let client = StreamClient::new(running.stream_addr().to_string());

    assert!(platform.unregister("Calculator"));
    match client.call("Calculator", "add", "[1,2]").await.unwrap() {
        Reply::Error(message) => assert!(message.contains("Calculator"), "{}", message),
        other => panic!("expected error, got {:?}", other),
    }
    running.shutdown();
}

#[tokio::test]
async fn test_http_pool_bounds_requests_not_connections() {
    let (_platform, running) = start(MiddlewareConfig::ephemeral().with_http_pool_size(1)).await;
    let addr = running.http_addr().to_string();
    let first = HttpClient::new(addr.clone()).with_timeout(Duration::from_secs(2));
    let second = HttpClient::new(addr).with_timeout(Duration::from_secs(2));

    // `first` keeps its pooled connection open between calls
    assert_eq!(first.invoke("Calculator", "add", "[10,20]").await.unwrap().body, "30");
    assert_eq!(second.invoke("Calculator", "add", "[1,2]").await.unwrap().body, "3");
    assert_eq!(first.invoke("Calculator", "add", "[2,2]").await.unwrap().body, "4");
    running.shutdown();
}

#[tokio::test]
async fn test_saturated_stream_pool_does_not_starve_other_transports() {
    use tokio::io::AsyncBufReadExt;

    let config = MiddlewareConfig::ephemeral()
        .with_stream_pool_size(1)
        .with_read_timeout(Duration::from_millis(300));
    let (_platform, running) = start(config).await;

    // Takes the only stream worker and never sends a line
    let idle = tokio::net::TcpStream::connect(running.stream_addr()).await.unwrap();

    let http = HttpClient::new(running.http_addr().to_string()).with_timeout(Duration::from_secs(2));
    assert_eq!(http.invoke("Calculator", "add", "[1,2]").await.unwrap().body, "3");

    let datagram = DatagramClient::new(running.datagram_addr().to_string()).with_timeout(Duration::from_secs(2));
    assert_eq!(
        datagram.call("Calculator", "add", "[3,4]").await.unwrap(),
        Reply::Success("7".into())
    );

    let mut line = String::new();
    tokio::time::timeout(
        Duration::from_secs(5),
        tokio::io::BufReader::new(idle).read_line(&mut line),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(line.starts_with("ERROR: "), "{}", line);

    // The worker is free again once the idle connection timed out
    let stream = StreamClient::new(running.stream_addr().to_string()).with_timeout(Duration::from_secs(5));
    assert_eq!(
        stream.call("Calculator", "add", "[5,6]").await.unwrap(),
        Reply::Success("11".into())
    );
    running.shutdown();
}
