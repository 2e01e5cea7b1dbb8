//! TOML configuration for the gateway daemon
//!
//! Every field has a default, so an absent file and an empty file behave
//! the same. Unknown keys are rejected to catch typos early.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use divi_gateway::{ScriptTagClassifier, VaultClassifier};
use divi_rpc::RpcConfig;
use serde::Deserialize;

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::from([127, 0, 0, 1]),
            port: 8000,
        }
    }
}

/// Node transport settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Extra attempts for read-only calls
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub pool_size: usize,
    /// Location of `divi.conf`; the platform default when unset
    pub conf_path: Option<PathBuf>,
    /// Hex script prefix marking vault outputs. When unset the node's
    /// vault listing parameter is trusted as-is.
    pub vault_script_marker: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let rpc = RpcConfig::default();
        Self {
            timeout_secs: rpc.timeout.as_secs(),
            connect_timeout_secs: rpc.connect_timeout.as_secs(),
            max_retries: rpc.max_retries,
            retry_backoff_ms: rpc.retry_backoff.as_millis() as u64,
            pool_size: rpc.pool_size,
            conf_path: None,
            vault_script_marker: None,
        }
    }
}

impl NodeConfig {
    pub fn rpc_config(&self) -> RpcConfig {
        RpcConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            max_retries: self.max_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            pool_size: self.pool_size,
        }
    }

    /// Classifier selected by `vault_script_marker`, if any
    pub fn vault_classifier(&self) -> anyhow::Result<Option<Arc<dyn VaultClassifier>>> {
        match self.vault_script_marker.as_deref() {
            Some(marker) => {
                let classifier: Arc<dyn VaultClassifier> = Arc::new(ScriptTagClassifier::new(marker)?);
                Ok(Some(classifier))
            }
            None => Ok(None),
        }
    }
}

/// Top-level daemon configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub node: NodeConfig,
}

impl GatewayConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        if config.node.pool_size == 0 {
            anyhow::bail!("node.pool_size must be at least 1");
        }
        config.node.vault_classifier()?;
        Ok(config)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.bind, self.server.port)
    }
}
