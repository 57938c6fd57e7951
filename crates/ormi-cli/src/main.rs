//! # ORMI CLI Entry Point
//!
//! ## Usage
//!
//! ```bash
//! # Start the platform with the demo Calculator service
//! ormi serve --stream-port 8085 --datagram-port 8086 --http-port 8082
//!
//! # Start in async mode with a 2s call timeout
//! ormi serve --mode async --async-timeout-ms 2000
//!
//! # Make a call (outputs raw JSON)
//! ormi call stream 127.0.0.1:8085 Calculator add -p '[10,20]'
//! ormi call http 127.0.0.1:8082 Calculator greetAll -p '[["Ana","Bo"]]'
//!
//! # Datagram heartbeat
//! ormi ping 127.0.0.1:8086
//! ```

use anyhow::Result;
use argh::FromArgs;
use ormi_cli::call::{self, Transport};
use ormi_cli::demo;
use ormi_server::config::{InvocationMode, MiddlewareConfig};
use ormi_server::Platform;
use std::time::Duration;

#[derive(FromArgs)]
/// ORMI - object remote method invocation platform
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Serve(ServeArgs),
    Call(CallArgs),
    Ping(PingArgs),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
/// start the platform with the demo Calculator service
struct ServeArgs {
    /// host every transport binds to
    #[argh(option, default = "\"127.0.0.1\".into()")]
    host: String,

    /// stream transport port
    #[argh(option, default = "8085")]
    stream_port: u16,

    /// datagram transport port
    #[argh(option, default = "8086")]
    datagram_port: u16,

    /// HTTP transport port
    #[argh(option, default = "8082")]
    http_port: u16,

    /// invocation mode: sync or async
    #[argh(option, short = 'm', default = "InvocationMode::Sync")]
    mode: InvocationMode,

    /// how long an async call is waited for, in milliseconds
    #[argh(option, default = "5000")]
    async_timeout_ms: u64,

    /// async invoker workers
    #[argh(option, default = "8")]
    async_pool_size: usize,

    /// concurrent stream connections
    #[argh(option, default = "10")]
    stream_pool_size: usize,

    /// concurrent datagram requests
    #[argh(option, default = "20")]
    datagram_pool_size: usize,

    /// concurrent HTTP requests
    #[argh(option, default = "16")]
    http_pool_size: usize,

    /// how long a client may take to send its request, in milliseconds
    #[argh(option, default = "30000")]
    read_timeout_ms: u64,
}

impl ServeArgs {
    fn config(&self) -> MiddlewareConfig {
        MiddlewareConfig::new()
            .with_host(self.host.clone())
            .with_stream_port(self.stream_port)
            .with_datagram_port(self.datagram_port)
            .with_http_port(self.http_port)
            .with_invocation_mode(self.mode)
            .with_async_timeout(Duration::from_millis(self.async_timeout_ms))
            .with_async_pool_size(self.async_pool_size)
            .with_stream_pool_size(self.stream_pool_size)
            .with_datagram_pool_size(self.datagram_pool_size)
            .with_http_pool_size(self.http_pool_size)
            .with_read_timeout(Duration::from_millis(self.read_timeout_ms))
    }
}

#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
/// make one call (unix-friendly JSON output)
struct CallArgs {
    /// transport: stream, datagram or http
    #[argh(positional)]
    transport: Transport,

    /// server address (host:port)
    #[argh(positional)]
    addr: String,

    /// service name
    #[argh(positional)]
    service: String,

    /// method name
    #[argh(positional)]
    method: String,

    /// JSON parameter array
    #[argh(option, short = 'p', default = "\"[]\".into()")]
    params: String,

    /// reply timeout in milliseconds
    #[argh(option, short = 't', default = "30000")]
    timeout_ms: u64,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "ping")]
/// send a datagram heartbeat
struct PingArgs {
    /// datagram server address (host:port)
    #[argh(positional)]
    addr: String,

    /// reply timeout in milliseconds
    #[argh(option, short = 't', default = "2000")]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Keep `call` and `ping` output clean for piping
    if matches!(cli.command, Commands::Serve(_)) {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Call(args) => {
            let json = call::call(
                args.transport,
                &args.addr,
                &args.service,
                &args.method,
                &args.params,
                Duration::from_millis(args.timeout_ms),
            )
            .await?;
            println!("{}", json);
            Ok(())
        }
        Commands::Ping(args) => {
            call::ping(&args.addr, Duration::from_millis(args.timeout_ms)).await?;
            println!("HEARTBEAT_ACK");
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let platform = Platform::new(args.config());
    platform.register(demo::SERVICE_NAME, demo::calculator())?;
    tracing::info!("Registered service {}", demo::SERVICE_NAME);

    let running = platform.start().await?;
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down");
    running.shutdown();
    Ok(())
}
