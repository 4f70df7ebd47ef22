use anyhow::{Context, Result};
use clap::Parser;
use rupture::{constants, Mode, ParseOptions, ServerConfig};
use std::{net::SocketAddr, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Fault-injecting HTTP/1.x test server")]
struct CommandLineArguments {
    #[arg(long, env = "RUPTURE_HOST", default_value = constants::DEFAULT_HOST, help = "Host to listen on")]
    host: String,

    #[arg(long, env = "RUPTURE_BREAK_PORT", default_value_t = constants::DEFAULT_BREAK_PORT, help = "Port of the fault-injecting listener")]
    break_port: u16,

    #[arg(long, env = "RUPTURE_NORMAL_PORT", default_value_t = constants::DEFAULT_NORMAL_PORT, help = "Port of the always-200 listener")]
    normal_port: u16,

    #[arg(long, env = "RUPTURE_RECV_BUFFER_SIZE", default_value_t = constants::DEFAULT_RECV_BUFFER_SIZE, help = "SO_RCVBUF of the listening sockets in bytes")]
    recv_buffer_size: u32,

    #[arg(long, env = "RUPTURE_READ_CHUNK_SIZE", default_value_t = constants::DEFAULT_READ_CHUNK_SIZE, help = "Maximum bytes taken per read")]
    read_chunk_size: usize,

    #[arg(long, env = "RUPTURE_RESPONSE_DELAY_SECS", default_value_t = constants::DEFAULT_RESPONSE_DELAY.as_secs(), help = "Stall used by the timeout faults")]
    response_delay_secs: u64,

    #[arg(long, env = "RUPTURE_DRAIN_TIMEOUT_SECS", default_value_t = constants::DEFAULT_DRAIN_TIMEOUT.as_secs(), help = "Grace period for in-flight connections on shutdown")]
    drain_timeout_secs: u64,

    #[arg(long, env = "RUPTURE_COMPLETE_GET_ON_HEADERS", help = "Treat a GET as complete once its headers end")]
    complete_get_on_headers: bool,

    #[arg(long, help = "Enable debug logging")]
    verbose: bool,
}

impl CommandLineArguments {
    fn server_config(&self, port: u16, mode: Mode) -> Result<ServerConfig> {
        let addr: SocketAddr = format!("{}:{}", self.host, port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, port))?;

        let config = ServerConfig::new(addr, mode)
            .with_recv_buffer_size(self.recv_buffer_size)
            .with_read_chunk_size(self.read_chunk_size)
            .with_response_delay(Duration::from_secs(self.response_delay_secs))
            .with_drain_timeout(Duration::from_secs(self.drain_timeout_secs))
            .with_parse_options(ParseOptions {
                complete_get_on_headers: self.complete_get_on_headers,
            });
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let args = CommandLineArguments::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = run(args).await {
        error!("Server error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: CommandLineArguments) -> Result<()> {
    let shutdown = CancellationToken::new();

    let (break_addr, break_server) = rupture::start_server(
        args.server_config(args.break_port, Mode::Break)?,
        shutdown.clone(),
    )?;
    let (normal_addr, normal_server) = rupture::start_server(
        args.server_config(args.normal_port, Mode::Normal)?,
        shutdown.clone(),
    )?;
    info!("Faults on {}, plain responses on {}", break_addr, normal_addr);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received, stopping listeners");
    shutdown.cancel();

    let (break_result, normal_result) = tokio::join!(break_server, normal_server);
    break_result??;
    normal_result??;
    Ok(())
}
