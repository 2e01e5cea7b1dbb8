//! Node credential resolution
//!
//! Credentials come from three layers, highest precedence first:
//! environment variables, the node's `divi.conf`, built-in defaults.
//! Resolution happens once at startup; the result is immutable.

use std::fmt;
use std::path::{Path, PathBuf};

use divi_core::{GatewayError, GatewayResult};
use tracing::{debug, info};

/// Default node host
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default Divi mainnet RPC port
pub const DEFAULT_PORT: u16 = 51473;

pub const ENV_USER: &str = "RPC_USER";
pub const ENV_PASS: &str = "RPC_PASS";
pub const ENV_PORT: &str = "RPC_PORT";
pub const ENV_HOST: &str = "RPC_HOST";
/// Overrides the location of `divi.conf`
pub const ENV_CONF: &str = "DIVI_CONF";

/// Resolved node RPC credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    password: String,
    host: String,
    port: u16,
}

impl Credentials {
    /// Credentials for the default host and port
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

/// One layer of credential values, any of which may be missing
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CredentialLayer {
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl CredentialLayer {
    /// Fill fields missing from `self` with values from `lower`
    pub fn or(self, lower: CredentialLayer) -> CredentialLayer {
        CredentialLayer {
            user: self.user.or(lower.user),
            password: self.password.or(lower.password),
            host: self.host.or(lower.host),
            port: self.port.or(lower.port),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_port(value: &str, origin: &str) -> GatewayResult<u16> {
    value.trim().parse::<u16>().map_err(|_| {
        GatewayError::Configuration(format!("Invalid RPC port '{}' in {}", value.trim(), origin))
    })
}

/// Parse `divi.conf` content (`key=value` lines).
///
/// Keys are case-insensitive; blank lines and `#` comments are skipped.
/// Keys other than the RPC connection settings are accepted and ignored.
/// `origin` names the file in error messages.
pub fn parse_conf(content: &str, origin: &str) -> GatewayResult<CredentialLayer> {
    let mut layer = CredentialLayer::default();

    for (idx, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let malformed = || {
            GatewayError::Configuration(format!(
                "Malformed line {} in {}: '{}'",
                idx + 1,
                origin,
                line
            ))
        };

        let (key, value) = line.split_once('=').ok_or_else(malformed)?;
        let key = key.trim().to_ascii_lowercase();
        if key.is_empty() {
            return Err(malformed());
        }

        match key.as_str() {
            "rpcuser" => layer.user = non_empty(value),
            "rpcpassword" => layer.password = non_empty(value),
            "rpcconnect" => layer.host = non_empty(value),
            "rpcport" => {
                layer.port = match non_empty(value) {
                    Some(v) => Some(parse_port(&v, &format!("{} line {}", origin, idx + 1))?),
                    None => None,
                }
            }
            _ => {}
        }
    }

    Ok(layer)
}

/// Platform-specific default location of `divi.conf`
pub fn default_conf_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        dirs::data_dir().map(|d| d.join("DIVI").join("divi.conf"))
    }
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir().map(|h| {
            h.join("Library")
                .join("Application Support")
                .join("DIVI")
                .join("divi.conf")
        })
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        dirs::home_dir().map(|h| h.join(".divi").join("divi.conf"))
    }
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Resolves [`Credentials`] from environment, conf file and defaults
pub struct CredentialResolver {
    conf_path: Option<PathBuf>,
    env: EnvLookup,
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialResolver {
    /// Resolver reading the process environment and the default conf path
    pub fn new() -> Self {
        Self {
            conf_path: None,
            env: Box::new(|key| std::env::var(key).ok()),
        }
    }

    /// Read credentials from this file instead of the default location.
    /// A missing explicit file is a configuration error.
    pub fn with_conf_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.conf_path = Some(path.into());
        self
    }

    /// Replace the environment lookup
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(lookup);
        self
    }

    fn env_var(&self, key: &str) -> Option<String> {
        (self.env)(key).and_then(|v| non_empty(&v))
    }

    fn env_layer(&self) -> GatewayResult<CredentialLayer> {
        let port = match self.env_var(ENV_PORT) {
            Some(v) => Some(parse_port(&v, ENV_PORT)?),
            None => None,
        };
        Ok(CredentialLayer {
            user: self.env_var(ENV_USER),
            password: self.env_var(ENV_PASS),
            host: self.env_var(ENV_HOST),
            port,
        })
    }

    fn file_layer(&self) -> GatewayResult<CredentialLayer> {
        let explicit = self
            .conf_path
            .clone()
            .or_else(|| self.env_var(ENV_CONF).map(PathBuf::from));

        match explicit {
            Some(path) => read_conf_file(&path),
            None => match default_conf_path() {
                Some(path) if path.exists() => read_conf_file(&path),
                Some(path) => {
                    debug!(path = %path.display(), "No node conf file at default location");
                    Ok(CredentialLayer::default())
                }
                None => Ok(CredentialLayer::default()),
            },
        }
    }

    /// Resolve credentials. Fails if user or password is missing from every
    /// source.
    pub fn resolve(&self) -> GatewayResult<Credentials> {
        let merged = self.env_layer()?.or(self.file_layer()?);

        let user = merged.user.ok_or_else(|| {
            GatewayError::Configuration(format!(
                "Missing rpcuser: set {} or rpcuser in divi.conf",
                ENV_USER
            ))
        })?;
        let password = merged.password.ok_or_else(|| {
            GatewayError::Configuration(format!(
                "Missing rpcpassword: set {} or rpcpassword in divi.conf",
                ENV_PASS
            ))
        })?;

        let credentials = Credentials {
            user,
            password,
            host: merged.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: merged.port.unwrap_or(DEFAULT_PORT),
        };
        info!(host = %credentials.host, port = credentials.port, user = %credentials.user, "Resolved node credentials");
        Ok(credentials)
    }
}

fn read_conf_file(path: &Path) -> GatewayResult<CredentialLayer> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        GatewayError::Configuration(format!(
            "Failed to read node conf file '{}': {}",
            path.display(),
            e
        ))
    })?;
    debug!(path = %path.display(), "Loaded node conf file");
    parse_conf(&content, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + Send + Sync + 'static {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write_conf(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parse_conf_reads_rpc_keys() {
        let layer = parse_conf(
            "# node settings\n\nrpcuser=alice\nRPCPASSWORD = s3cret\nrpcport=51475\nrpcconnect=10.0.0.2\nstaking=1\n",
            "divi.conf",
        )
        .unwrap();
        assert_eq!(layer.user.as_deref(), Some("alice"));
        assert_eq!(layer.password.as_deref(), Some("s3cret"));
        assert_eq!(layer.port, Some(51475));
        assert_eq!(layer.host.as_deref(), Some("10.0.0.2"));
    }

    #[test]
    fn parse_conf_keeps_equals_in_value() {
        let layer = parse_conf("rpcpassword=a=b=c", "divi.conf").unwrap();
        assert_eq!(layer.password.as_deref(), Some("a=b=c"));
    }

    #[test]
    fn parse_conf_rejects_malformed_line() {
        let err = parse_conf("rpcuser=alice\nthis is not a setting\n", "divi.conf").unwrap_err();
        match err {
            GatewayError::Configuration(msg) => {
                assert!(msg.contains("line 2"), "{}", msg);
                assert!(msg.contains("this is not a setting"), "{}", msg);
            }
            other => panic!("Expected Configuration, got {:?}", other),
        }
    }

    #[test]
    fn parse_conf_rejects_empty_key() {
        assert!(parse_conf("=value", "divi.conf").is_err());
    }

    #[test]
    fn parse_conf_rejects_bad_port() {
        assert!(parse_conf("rpcport=notaport", "divi.conf").is_err());
    }

    #[test]
    fn env_takes_precedence_over_file() {
        let conf = write_conf("rpcuser=fileuser\nrpcpassword=filepass\nrpcport=1111\n");
        let creds = CredentialResolver::new()
            .with_conf_path(conf.path())
            .with_env(env_from(&[(ENV_USER, "envuser"), (ENV_PORT, "2222")]))
            .resolve()
            .unwrap();
        assert_eq!(creds.user(), "envuser");
        assert_eq!(creds.password(), "filepass");
        assert_eq!(creds.port(), 2222);
        assert_eq!(creds.host(), DEFAULT_HOST);
    }

    #[test]
    fn defaults_apply_when_no_source_sets_port() {
        let creds = CredentialResolver::new()
            .with_conf_path(write_conf("rpcuser=u\nrpcpassword=p\n").path())
            .with_env(env_from(&[]))
            .resolve()
            .unwrap();
        assert_eq!(creds.port(), DEFAULT_PORT);
        assert_eq!(creds.host(), DEFAULT_HOST);
    }

    #[test]
    fn missing_password_is_fatal() {
        let conf = write_conf("rpcuser=u\n");
        let err = CredentialResolver::new()
            .with_conf_path(conf.path())
            .with_env(env_from(&[]))
            .resolve()
            .unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(ref m) if m.contains("rpcpassword")));
    }

    #[test]
    fn empty_env_value_counts_as_unset() {
        let conf = write_conf("rpcuser=fileuser\nrpcpassword=filepass\n");
        let creds = CredentialResolver::new()
            .with_conf_path(conf.path())
            .with_env(env_from(&[(ENV_USER, "  ")]))
            .resolve()
            .unwrap();
        assert_eq!(creds.user(), "fileuser");
    }

    #[test]
    fn explicit_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = CredentialResolver::new()
            .with_conf_path(dir.path().join("absent.conf"))
            .with_env(env_from(&[(ENV_USER, "u"), (ENV_PASS, "p")]))
            .resolve()
            .unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));
    }

    #[test]
    fn conf_path_from_env() {
        let conf = write_conf("rpcuser=u\nrpcpassword=p\nrpcport=3333\n");
        let path = conf.path().display().to_string();
        let creds = CredentialResolver::new()
            .with_env(env_from(&[(ENV_CONF, path.as_str())]))
            .resolve()
            .unwrap();
        assert_eq!(creds.port(), 3333);
    }

    #[test]
    fn invalid_env_port_is_fatal() {
        let err = CredentialResolver::new()
            .with_conf_path(write_conf("").path())
            .with_env(env_from(&[(ENV_USER, "u"), (ENV_PASS, "p"), (ENV_PORT, "http")]))
            .resolve()
            .unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));
    }

    #[test]
    fn debug_redacts_password() {
        let creds = Credentials::new("foo", "hunter2");
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    #[serial_test::serial]
    fn process_environment_is_read() {
        let conf = write_conf("rpcuser=fileuser\nrpcpassword=filepass\n");
        std::env::set_var(ENV_USER, "foo");
        std::env::set_var(ENV_PASS, "bar");
        std::env::set_var(ENV_PORT, "51473");
        let result = CredentialResolver::new().with_conf_path(conf.path()).resolve();
        std::env::remove_var(ENV_USER);
        std::env::remove_var(ENV_PASS);
        std::env::remove_var(ENV_PORT);

        let creds = result.unwrap();
        assert_eq!(creds.user(), "foo");
        assert_eq!(creds.password(), "bar");
        assert_eq!(creds.port(), 51473);
    }
}
