use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::builder::FalseyValueParser;
use clap::Parser;
use httpconsole::config::{Config, RedisConfig, StoreBackend};
use httpconsole::{create_bucket_store, ConsoleServer, ConsoleState};
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// HTTP request inspector and mock-response bucket service
#[derive(Parser, Debug)]
#[command(name = "httpconsole", author, version)]
struct Args {
    /// YAML config file; flags and environment variables override it
    #[arg(short, long, env = "HTTPCONSOLE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Externally visible port used in generated URLs
    #[arg(long, env = "PORT_MASK")]
    port_mask: Option<u16>,

    /// Redis connection URL
    #[arg(long, env = "REDIS")]
    redis: Option<String>,

    /// Bucket store backend
    #[arg(long, value_enum)]
    store: Option<StoreBackend>,

    /// Disable access logging
    #[arg(short, long, env = "QUIET", value_parser = FalseyValueParser::new())]
    quiet: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(host) = self.host {
            config.listen.host = host;
        }
        if let Some(port) = self.port {
            config.listen.port = port;
        }
        if self.port_mask.is_some() {
            config.listen.port_mask = self.port_mask;
        }
        if let Some(url) = self.redis {
            match config.store.redis.as_mut() {
                Some(redis) => redis.url = url,
                None => config.store.redis = Some(RedisConfig::new(url)),
            }
        }
        if let Some(backend) = self.store {
            config.store.backend = backend;
        }
        config.quiet |= self.quiet;

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let config = Args::parse().into_config()?;

    let store = create_bucket_store(&config.store).await?;
    let state = Arc::new(ConsoleState::new(store, config.public_port(), config.quiet)?);

    let address = config.listen.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl-C"),
            Err(e) => {
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await
            }
        }
    };

    ConsoleServer::new(state).serve(listener, shutdown).await
}
