//! divid - Divi Gateway Daemon
//!
//! REST API in front of a Divi node's JSON-RPC interface.
//!
//! Usage:
//!   divid [OPTIONS] [config.toml]
//!
//! Options:
//!   -c, --conf <path>  Read node credentials from this divi.conf
//!
//! Without a config file the gateway listens on 127.0.0.1:8000 with default
//! node transport settings.

mod config;

use std::path::PathBuf;

use anyhow::Context;
use divi_api::{create_router, AppState};
use divi_rpc::{CredentialResolver, RpcClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::GatewayConfig;

/// Parsed command-line arguments
#[derive(Debug, Default, PartialEq)]
struct Args {
    /// Gateway config file (TOML)
    config_path: Option<PathBuf>,
    /// Node conf file, overriding the config file and `DIVI_CONF`
    conf_path: Option<PathBuf>,
    help: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Args> {
    let args: Vec<String> = args.into_iter().collect();
    let mut result = Args::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--conf" | "-c" => {
                let path = args
                    .get(i + 1)
                    .context("Missing argument for --conf")?;
                result.conf_path = Some(PathBuf::from(path));
                i += 2;
            }
            "--help" | "-h" => {
                result.help = true;
                i += 1;
            }
            arg if !arg.starts_with('-') => {
                // Positional argument = config file
                result.config_path = Some(PathBuf::from(arg));
                i += 1;
            }
            _ => {
                tracing::warn!("Unknown argument: {}", args[i]);
                i += 1;
            }
        }
    }

    Ok(result)
}

fn print_help() {
    eprintln!(
        r#"divid - Divi Gateway Daemon

Usage: divid [OPTIONS] [config.toml]

Options:
  -c, --conf <path>  Read node credentials from this divi.conf
  -h, --help         Print this help message

Environment:
  RPC_USER, RPC_PASS, RPC_HOST, RPC_PORT  Node credentials (override divi.conf)
  DIVI_CONF                               Location of divi.conf
  RUST_LOG                                Log filter

Examples:
  # Credentials from ~/.divi/divi.conf, listen on 127.0.0.1:8000
  divid

  # With a gateway config file
  divid gateway.toml

  # Explicit node conf file
  divid --conf /srv/divi/divi.conf gateway.toml
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "divid=info,divi_api=info,divi_rpc=info,divi_gateway=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        print_help();
        return Ok(());
    }

    tracing::info!("Starting divid (Divi Gateway Daemon)");

    let config = match args.config_path {
        Some(ref path) => {
            tracing::info!("Loading config from: {}", path.display());
            GatewayConfig::load(path)?
        }
        None => {
            tracing::info!("No config file provided, using defaults");
            GatewayConfig::default()
        }
    };

    // Credentials are resolved once; failure stops startup before binding
    let mut resolver = CredentialResolver::new();
    if let Some(path) = args.conf_path.or_else(|| config.node.conf_path.clone()) {
        resolver = resolver.with_conf_path(path);
    }
    let credentials = resolver
        .resolve()
        .context("Failed to resolve node RPC credentials")?;
    tracing::info!(
        host = credentials.host(),
        port = credentials.port(),
        "Resolved node RPC endpoint"
    );

    let rpc = RpcClient::with_config(credentials, config.node.rpc_config())?;
    let state = match config.node.vault_classifier()? {
        Some(classifier) => {
            tracing::info!("Classifying vault outputs by script prefix");
            AppState::with_classifier(rpc, classifier)
        }
        None => AppState::new(rpc),
    };
    let app = create_router(state);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("divid stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
