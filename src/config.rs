use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_path: PathBuf,

    // Web Server
    pub web_host: String,
    pub web_port: u16,
    /// Externally reachable base URL, used to build magic links.
    pub public_url: String,
    pub cookie_secure: bool,

    // Attachment Storage
    pub storage_backend: StorageBackend,
    pub upload_dir: PathBuf,
    pub s3_bucket: Option<String>,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    pub s3_prefix: String,
    pub max_upload_bytes: usize,

    // Auth
    pub magic_link_ttl: Duration,
    pub session_ttl: Duration,
    pub admin_emails: Vec<String>,
    pub mail_webhook_url: Option<String>,

    // Forum
    pub alert_poll_interval: Duration,
    pub stale_post_after: Duration,
    pub trending_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Files are written below `UPLOAD_DIR` and served under `/uploads`
    Local,
    /// Files are stored in an S3-compatible bucket
    S3,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables are present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let web_host = env_or_default("WEB_HOST", "0.0.0.0");
        let web_port = parse_env_u16("WEB_PORT", 8080)?;

        Ok(Self {
            // Database
            database_path: PathBuf::from(env_or_default("DATABASE_PATH", "./data/campus.sqlite")),

            // Web Server
            public_url: optional_env("PUBLIC_URL")
                .unwrap_or_else(|| format!("http://localhost:{web_port}")),
            web_host,
            web_port,
            cookie_secure: parse_env_bool("COOKIE_SECURE", false)?,

            // Attachment Storage
            storage_backend: parse_storage_backend(&env_or_default("STORAGE_BACKEND", "local"))?,
            upload_dir: PathBuf::from(env_or_default("UPLOAD_DIR", "./data/uploads")),
            s3_bucket: optional_env("S3_BUCKET"),
            s3_region: env_or_default("S3_REGION", "us-east-1"),
            s3_endpoint: optional_env("S3_ENDPOINT"),
            s3_prefix: env_or_default("S3_PREFIX", "post-attachments/"),
            max_upload_bytes: parse_env_usize("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,

            // Auth
            magic_link_ttl: Duration::from_secs(parse_env_u64("MAGIC_LINK_TTL_SECS", 900)?),
            session_ttl: Duration::from_secs(parse_env_u64("SESSION_TTL_SECS", 2_592_000)?),
            admin_emails: parse_list(&env_or_default("ADMIN_EMAILS", "")),
            mail_webhook_url: optional_env("MAIL_WEBHOOK_URL"),

            // Forum
            alert_poll_interval: Duration::from_secs(parse_env_u64("ALERT_POLL_INTERVAL_SECS", 300)?),
            stale_post_after: Duration::from_secs(parse_env_u64("STALE_POST_SECS", 7200)?),
            trending_count: parse_env_usize("TRENDING_COUNT", 2)?,
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_backend == StorageBackend::S3
            && self.s3_bucket.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::InvalidValue {
                name: "S3_BUCKET".to_string(),
                message: "required when STORAGE_BACKEND=s3".to_string(),
            });
        }
        if url::Url::parse(&self.public_url).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "PUBLIC_URL".to_string(),
                message: format!("not a valid URL: '{}'", self.public_url),
            });
        }
        if let Some(webhook) = &self.mail_webhook_url {
            if url::Url::parse(webhook).is_err() {
                return Err(ConfigError::InvalidValue {
                    name: "MAIL_WEBHOOK_URL".to_string(),
                    message: format!("not a valid URL: '{webhook}'"),
                });
            }
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_UPLOAD_BYTES".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.alert_poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "ALERT_POLL_INTERVAL_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Whether an email address is configured to receive the admin role.
    #[must_use]
    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|e| *e == email)
    }

    /// Configuration for tests, with every path below `data_dir`.
    #[must_use]
    pub fn for_testing(data_dir: &Path) -> Self {
        Self {
            database_path: data_dir.join("test.sqlite"),
            web_host: "127.0.0.1".to_string(),
            web_port: 0,
            public_url: "http://localhost:8080".to_string(),
            cookie_secure: false,
            storage_backend: StorageBackend::Local,
            upload_dir: data_dir.join("uploads"),
            s3_bucket: None,
            s3_region: "us-east-1".to_string(),
            s3_endpoint: None,
            s3_prefix: "post-attachments/".to_string(),
            max_upload_bytes: 1024 * 1024,
            magic_link_ttl: Duration::from_secs(900),
            session_ttl: Duration::from_secs(3600),
            admin_emails: vec!["dean@college.edu".to_string()],
            mail_webhook_url: None,
            alert_poll_interval: Duration::from_secs(300),
            stale_post_after: Duration::from_secs(7200),
            trending_count: 2,
        }
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}

fn parse_storage_backend(value: &str) -> Result<StorageBackend, ConfigError> {
    match value.to_lowercase().as_str() {
        "local" => Ok(StorageBackend::Local),
        "s3" => Ok(StorageBackend::S3),
        _ => Err(ConfigError::InvalidValue {
            name: "STORAGE_BACKEND".to_string(),
            message: format!("must be 'local' or 's3', got '{value}'"),
        }),
    }
}

/// Comma separated list, trimmed and lowercased, empties dropped.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
