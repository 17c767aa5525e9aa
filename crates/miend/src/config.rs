use mien_core::upload::MAX_IMAGE_BYTES;
use mien_core::{AnalysisMode, LabelOptions};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Daemon configuration.
///
/// Resolved in order: built-in defaults, then the TOML file named by
/// `MIEN_CONFIG` (if set), then `MIEN_*` environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Bind address (default: 0.0.0.0).
    pub host: String,
    /// Bind port (default: 8080).
    pub port: u16,
    /// AWS region override; unset uses the SDK's default chain.
    pub aws_region: Option<String>,
    /// Largest accepted upload in bytes (default: 5 MiB, Rekognition's inline limit).
    pub max_upload_bytes: usize,
    /// Maximum labels requested per image.
    pub max_labels: u32,
    /// Minimum label confidence [0, 100].
    pub min_label_confidence: f32,
    /// Analysis mode used when a request does not name one.
    pub default_mode: AnalysisMode,
    /// Whole-request timeout in seconds; a backstop behind `upstream_timeout_secs`.
    pub request_timeout_secs: u64,
    /// Budget in seconds for one analysis against the backend, retries included.
    pub upstream_timeout_secs: u64,
    /// Upper bound on analyses in flight against the backend.
    pub max_concurrent_analyses: usize,
}

impl Default for Config {
    fn default() -> Self {
        let labels = LabelOptions::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            aws_region: None,
            max_upload_bytes: MAX_IMAGE_BYTES,
            max_labels: labels.max_labels,
            min_label_confidence: labels.min_confidence,
            default_mode: AnalysisMode::Faces,
            request_timeout_secs: 30,
            upstream_timeout_secs: 25,
            max_concurrent_analyses: 4,
        }
    }
}

impl Config {
    /// Load configuration from `MIEN_CONFIG` and `MIEN_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("MIEN_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from `MIEN_*` variables supplied by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MIEN_HOST") {
            self.host = v;
        }
        if let Some(v) = lookup("MIEN_AWS_REGION") {
            self.aws_region = Some(v).filter(|r| !r.is_empty());
        }
        parse_into(&lookup, "MIEN_PORT", &mut self.port)?;
        parse_into(&lookup, "MIEN_MAX_UPLOAD_BYTES", &mut self.max_upload_bytes)?;
        parse_into(&lookup, "MIEN_MAX_LABELS", &mut self.max_labels)?;
        parse_into(
            &lookup,
            "MIEN_MIN_LABEL_CONFIDENCE",
            &mut self.min_label_confidence,
        )?;
        parse_into(&lookup, "MIEN_DEFAULT_MODE", &mut self.default_mode)?;
        parse_into(
            &lookup,
            "MIEN_REQUEST_TIMEOUT_SECS",
            &mut self.request_timeout_secs,
        )?;
        parse_into(
            &lookup,
            "MIEN_UPSTREAM_TIMEOUT_SECS",
            &mut self.upstream_timeout_secs,
        )?;
        parse_into(
            &lookup,
            "MIEN_MAX_CONCURRENT_ANALYSES",
            &mut self.max_concurrent_analyses,
        )?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_upload_bytes == 0 {
            return Err(invalid("max_upload_bytes", "0"));
        }
        if self.max_concurrent_analyses == 0 {
            return Err(invalid("max_concurrent_analyses", "0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "0"));
        }
        // Upstream budget expires before the whole-request backstop.
        if self.upstream_timeout_secs == 0
            || self.upstream_timeout_secs >= self.request_timeout_secs
        {
            return Err(invalid(
                "upstream_timeout_secs",
                self.upstream_timeout_secs.to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.min_label_confidence) {
            return Err(invalid(
                "min_label_confidence",
                self.min_label_confidence.to_string(),
            ));
        }
        self.socket_addr()?;
        if self.max_upload_bytes > MAX_IMAGE_BYTES {
            tracing::warn!(
                max_upload_bytes = self.max_upload_bytes,
                limit = MAX_IMAGE_BYTES,
                "upload limit exceeds what Rekognition accepts inline"
            );
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| invalid("host", self.host.as_str()))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn label_options(&self) -> LabelOptions {
        LabelOptions {
            max_labels: self.max_labels,
            min_confidence: self.min_label_confidence,
        }
    }
}

fn invalid(key: &'static str, value: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.into(),
    }
}

fn parse_into<F, T>(lookup: &F, key: &'static str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(value) = lookup(key) {
        *slot = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value })?;
    }
    Ok(())
}
