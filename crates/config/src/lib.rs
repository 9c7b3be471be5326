use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "chainhook-relay";
const KEYCHAIN_SERVICE: &str = "chainhook-relay.credentials";
const WEBHOOK_SECRET_KEY: &str = "webhook_secret";
const WEBHOOK_SECRET_ENV: &str = "CHAINHOOK_RELAY_WEBHOOK_SECRET";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sled,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_audit_path")]
    pub path: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_audit_path(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Reject deliveries without a matching bearer token. A configured
    /// secret is enforced even when this is off.
    #[serde(default)]
    pub require_auth: bool,
}

fn default_bind_address() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    3000
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data").join("invoices")
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("data").join("audit.jsonl")
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.bind_address, self.server.port)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port.parse().with_context(|| format!("invalid PORT: {port}"))?;
        }
        if let Some(bind) = lookup("CHAINHOOK_RELAY_BIND") {
            self.server.bind_address = bind
                .parse()
                .with_context(|| format!("invalid CHAINHOOK_RELAY_BIND: {bind}"))?;
        }
        if let Some(path) = lookup("CHAINHOOK_RELAY_DB_PATH") {
            self.store.path = PathBuf::from(path);
        }
        if let Some(backend) = lookup("CHAINHOOK_RELAY_STORE") {
            self.store.backend = match backend.as_str() {
                "sled" => StoreBackend::Sled,
                "memory" => StoreBackend::Memory,
                other => anyhow::bail!("unknown store backend: {other}"),
            };
        }
        Ok(())
    }
}

pub fn load() -> Result<AppConfig> {
    let mut cfg: AppConfig = confy::load(APP_NAME, None).context("Failed to load app config")?;
    cfg.apply_overrides(|key| std::env::var(key).ok())?;
    Ok(cfg)
}

pub fn store(cfg: &AppConfig) -> Result<()> {
    confy::store(APP_NAME, None, cfg).context("Failed to store app config")?;
    Ok(())
}

/// Shared secret chainhook deliveries must present, from the environment or
/// the OS keychain.
pub fn webhook_secret() -> Option<String> {
    std::env::var(WEBHOOK_SECRET_ENV)
        .ok()
        .filter(|s| !s.is_empty())
        .or_else(|| get_secret(WEBHOOK_SECRET_KEY).ok())
}

/// Keep the webhook secret in the OS keychain for later runs.
pub fn set_webhook_secret(secret: &str) -> Result<()> {
    if secret.trim().is_empty() {
        anyhow::bail!("webhook secret must not be empty");
    }
    store_secret(WEBHOOK_SECRET_KEY, secret).context("Failed to store webhook secret")
}

pub fn clear_webhook_secret() -> Result<()> {
    delete_secret(WEBHOOK_SECRET_KEY).context("Failed to delete webhook secret")
}

/// Store a secret in the OS keychain
pub fn store_secret(key: &str, value: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, key)?;
    entry.set_password(value)?;
    Ok(())
}

/// Retrieve a secret from the OS keychain
pub fn get_secret(key: &str) -> Result<String> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, key)?;
    let password = entry.get_password()?;
    Ok(password)
}

/// Delete a secret from the OS keychain
pub fn delete_secret(key: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, key)?;
    entry.delete_password()?;
    Ok(())
}
