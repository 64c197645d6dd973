use anyhow::Result;
use axum::http::HeaderName;
use serde::Deserialize;
use std::path::Path;
use crate::guard::normalize::{normalize_list, RawList};
use crate::guard::response::DenyResponse;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub guard: GuardConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub whitelist: Option<RawList>,
    #[serde(default)]
    pub blacklist: Option<RawList>,
    /// Header carrying the client address when behind a proxy, e.g. `X-Forwarded-For`.
    #[serde(default)]
    pub ip_header: Option<String>,
    /// Read rules from the database. The two lists above are then only a fallback.
    #[serde(default = "default_true")]
    pub use_database: bool,
    /// How long a rule snapshot is reused. 0 reads the store on every request.
    #[serde(default)]
    pub cache_ttl_secs: u64,
    #[serde(default)]
    pub error: DenyResponse,
}

impl GuardConfig {
    pub fn whitelist(&self) -> Vec<String> {
        normalize_list(self.whitelist.as_ref())
    }

    pub fn blacklist(&self) -> Vec<String> {
        normalize_list(self.blacklist.as_ref())
    }

    pub fn trusted_header(&self) -> Option<&str> {
        self.ip_header.as_deref().map(str::trim).filter(|h| !h.is_empty())
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            whitelist: None,
            blacklist: None,
            ip_header: None,
            use_database: true,
            cache_ttl_secs: 0,
            error: DenyResponse::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

fn default_true() -> bool { true }
fn default_bind() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_static_dir() -> String { "./public".to_string() }
fn default_db_path() -> String { "./ip-guard.db".to_string() }
fn default_max_connections() -> u32 { 5 }

pub fn validate(cfg: &Config) -> Result<()> {
    let status = cfg.guard.error.status;
    if !(400..=599).contains(&status) {
        anyhow::bail!(
            "CONFIG ERROR: guard.error.status must be a 4xx or 5xx code (current: {})",
            status
        );
    }

    if let Some(header) = &cfg.guard.ip_header {
        if HeaderName::from_bytes(header.trim().as_bytes()).is_err() {
            anyhow::bail!("CONFIG ERROR: guard.ip_header is not a valid header name: {:?}", header);
        }
    }

    if cfg.guard.use_database {
        if let Some(parent) = Path::new(&cfg.database.path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                anyhow::bail!(
                    "CONFIG ERROR: Database directory does not exist: {}",
                    parent.display()
                );
            }
        }
    }

    tracing::info!("Configuration validation passed");
    Ok(())
}

/// `IP_GUARD__*` variables. The two rule lists take comma-separated values.
fn environment() -> config::Environment {
    config::Environment::with_prefix("IP_GUARD")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("guard.whitelist")
        .with_list_parse_key("guard.blacklist")
}

/// Load `path` (or `ip-guard.toml` in the working directory, if present),
/// then `IP_GUARD__*` environment variables on top.
pub fn load(path: Option<&Path>) -> Result<Config> {
    load_with_env(path, environment())
}

fn load_with_env(path: Option<&Path>, env: config::Environment) -> Result<Config> {
    let file = match path {
        Some(p) => config::File::from(p).required(true),
        None => config::File::with_name("ip-guard").required(false),
    };

    let cfg: Config = config::Config::builder()
        .add_source(file)
        .add_source(env)
        .set_default("guard.enabled", true)?
        .set_default("guard.use_database", true)?
        .set_default("guard.cache_ttl_secs", 0)?
        .set_default("database.path", "./ip-guard.db")?
        .set_default("database.max_connections", 5)?
        .set_default("server.bind", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("server.static_dir", "./public")?
        .build()?
        .try_deserialize()?;

    validate(&cfg)?;

    Ok(cfg)
}
