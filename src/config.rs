use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub typesense: TypesenseConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub captcha: CaptchaConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TypesenseConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,
    #[serde(default = "default_connect_retry_delay_secs")]
    pub connect_retry_delay_secs: u64,
    #[serde(default = "default_op_deadline_secs")]
    pub op_deadline_secs: u64,
    #[serde(default = "default_op_backoff_secs")]
    pub op_backoff_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_protocol() -> String {
    "http".to_string()
}
fn default_collection() -> String {
    "ossfinder".to_string()
}
fn default_connect_retries() -> u32 {
    10
}
fn default_connect_retry_delay_secs() -> u64 {
    5
}
fn default_op_deadline_secs() -> u64 {
    30
}
fn default_op_backoff_secs() -> u64 {
    2
}
fn default_request_timeout_secs() -> u64 {
    10
}

impl TypesenseConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_secs(self.connect_retry_delay_secs)
    }

    pub fn op_deadline(&self) -> Duration {
        Duration::from_secs(self.op_deadline_secs)
    }

    pub fn op_backoff(&self) -> Duration {
        Duration::from_secs(self.op_backoff_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmtpConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default = "default_smtp_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub recipient: String,
    /// `user:password` pair for SMTP login. Usually supplied through the
    /// `SMTP_CREDENTIALS` environment variable rather than the file.
    #[serde(default)]
    pub credentials: Option<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_smtp_port(),
            timeout_secs: default_smtp_timeout_secs(),
            from: String::new(),
            recipient: String::new(),
            credentials: None,
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}
fn default_smtp_timeout_secs() -> u64 {
    10
}

impl SmtpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CaptchaConfig {
    #[serde(default = "default_captcha_verify_url")]
    pub verify_url: String,
    #[serde(default)]
    pub site_key: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_captcha_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            verify_url: default_captcha_verify_url(),
            site_key: String::new(),
            secret: String::new(),
            timeout_secs: default_captcha_timeout_secs(),
        }
    }
}

fn default_captcha_verify_url() -> String {
    "https://api.friendlycaptcha.com/api/v1/siteverify".to_string()
}
fn default_captcha_timeout_secs() -> u64 {
    30
}

impl CaptchaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Secrets from the environment take precedence over the file.
    if let Ok(key) = std::env::var("TYPESENSE_API_KEY") {
        config.typesense.api_key = key;
    }
    if let Ok(creds) = std::env::var("SMTP_CREDENTIALS") {
        config.smtp.credentials = Some(creds);
    }
    if let Ok(secret) = std::env::var("CAPTCHA_SECRET") {
        config.captcha.secret = secret;
    }

    if config.typesense.host.is_empty() {
        anyhow::bail!("typesense.host must not be empty");
    }
    if config.typesense.port == 0 {
        anyhow::bail!("typesense.port must be > 0");
    }
    match config.typesense.protocol.as_str() {
        "http" | "https" => {}
        other => anyhow::bail!("Unknown typesense.protocol: '{}'. Must be http or https.", other),
    }
    if config.typesense.api_key.is_empty() {
        anyhow::bail!("typesense.api_key is missing. Set it in the config file or TYPESENSE_API_KEY.");
    }
    if config.typesense.collection.is_empty() {
        anyhow::bail!("typesense.collection must not be empty");
    }

    Ok(config)
}
