// sqs2s3-config - Unified configuration for the Lambda handler and local replay
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from SQS2S3_CONFIG env var
// 3. Config file contents from SQS2S3_CONFIG_CONTENT env var
// 4. Default config file locations (./config.toml, ./.sqs2s3.toml)
// 5. Platform-specific defaults (lowest priority)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod env_overrides;
mod platform;
mod sources;
mod telemetry;
mod validation;

pub use env_overrides::{EnvSource, ENV_PREFIX};
pub use platform::Platform;
pub use telemetry::init_tracing;

/// Main runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub processor: ProcessorConfig,

    #[serde(default)]
    pub logging: LogConfig,
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs: Option<FsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Config>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Fs,
            fs: Some(FsConfig::default()),
            s3: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Fs,
    S3,
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Fs => write!(f, "fs"),
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fs" | "filesystem" => Ok(StorageBackend::Fs),
            "s3" | "aws" => Ok(StorageBackend::S3),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            _ => anyhow::bail!(
                "Unsupported storage backend: {}. Supported: fs, s3, memory",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsConfig {
    pub path: String,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            path: "./data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Optional key prefix all objects (including `index.html`) are written under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

/// How a batch reacts to a record that could not be persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Process records in order and abort on the first failure.
    #[default]
    FailFast,
    /// Process every record concurrently and report failures afterwards.
    BestEffort,
}

impl std::fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchMode::FailFast => write!(f, "fail_fast"),
            DispatchMode::BestEffort => write!(f, "best_effort"),
        }
    }
}

impl std::str::FromStr for DispatchMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "fail_fast" | "sequential" => Ok(DispatchMode::FailFast),
            "best_effort" | "parallel" => Ok(DispatchMode::BestEffort),
            _ => anyhow::bail!(
                "Unsupported dispatch mode: {}. Supported: fail_fast, best_effort",
                s
            ),
        }
    }
}

/// Batch dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub mode: DispatchMode,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_max_concurrency() -> usize {
    64
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: DispatchMode::default(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// When the HTML index of stored messages is regenerated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexMode {
    /// Rebuild after every stored message.
    #[default]
    PerWrite,
    /// Rebuild once after a batch that stored at least one message.
    PerBatch,
    /// Never rebuild.
    Disabled,
}

impl std::fmt::Display for IndexMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexMode::PerWrite => write!(f, "per_write"),
            IndexMode::PerBatch => write!(f, "per_batch"),
            IndexMode::Disabled => write!(f, "disabled"),
        }
    }
}

impl std::str::FromStr for IndexMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "per_write" | "always" => Ok(IndexMode::PerWrite),
            "per_batch" | "batch" => Ok(IndexMode::PerBatch),
            "disabled" | "off" | "none" => Ok(IndexMode::Disabled),
            _ => anyhow::bail!(
                "Unsupported index mode: {}. Supported: per_write, per_batch, disabled",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub mode: IndexMode,
}

/// Settings stamped into every stored message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    pub tag: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            tag: "lambda-message-processor".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// One config file as written: absent sections and keys leave the layer
/// below untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigLayer {
    pub storage: Option<StorageLayer>,
    pub dispatch: Option<DispatchConfig>,
    pub index: Option<IndexConfig>,
    pub processor: Option<ProcessorConfig>,
    pub logging: Option<LogLayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageLayer {
    pub backend: Option<StorageBackend>,
    pub fs: Option<FsConfig>,
    pub s3: Option<S3Config>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogLayer {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
}

impl RuntimeConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        let platform = Platform::detect();
        sources::load_config(platform)
    }

    /// Load configuration for a specific platform (useful for testing)
    pub fn load_for_platform(platform: Platform) -> Result<Self> {
        sources::load_config(platform)
    }

    /// Load configuration starting from an explicit file (CLI `--config`)
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Platform defaults with no file or environment layered on top
    pub fn from_platform_defaults(platform: Platform) -> Self {
        platform::platform_defaults(platform)
    }

    /// Layer a config file over this one. Only what the file sets is replaced.
    pub fn merge(&mut self, layer: ConfigLayer) {
        if let Some(storage) = layer.storage {
            if let Some(backend) = storage.backend {
                self.storage.backend = backend;
            }
            if storage.fs.is_some() {
                self.storage.fs = storage.fs;
            }
            if storage.s3.is_some() {
                self.storage.s3 = storage.s3;
            }
        }
        if let Some(dispatch) = layer.dispatch {
            self.dispatch = dispatch;
        }
        if let Some(index) = layer.index {
            self.index = index;
        }
        if let Some(processor) = layer.processor {
            self.processor = processor;
        }
        if let Some(logging) = layer.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    /// Apply environment overrides from a custom source.
    pub fn apply_env_overrides_from<E: EnvSource>(&mut self, env: &E) -> Result<()> {
        env_overrides::apply_env_overrides(self, env)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_from_str() {
        assert_eq!("fs".parse::<StorageBackend>().unwrap(), StorageBackend::Fs);
        assert_eq!("s3".parse::<StorageBackend>().unwrap(), StorageBackend::S3);
        assert_eq!("AWS".parse::<StorageBackend>().unwrap(), StorageBackend::S3);
        assert_eq!(
            "memory".parse::<StorageBackend>().unwrap(),
            StorageBackend::Memory
        );
        assert!("gcs".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_modes_from_str() {
        assert_eq!(
            "fail-fast".parse::<DispatchMode>().unwrap(),
            DispatchMode::FailFast
        );
        assert_eq!(
            "best_effort".parse::<DispatchMode>().unwrap(),
            DispatchMode::BestEffort
        );
        assert_eq!(
            "per-batch".parse::<IndexMode>().unwrap(),
            IndexMode::PerBatch
        );
        assert_eq!("off".parse::<IndexMode>().unwrap(), IndexMode::Disabled);
        assert!("sometimes".parse::<IndexMode>().is_err());
    }

    #[test]
    fn test_default_configs() {
        let config = RuntimeConfig::default();
        assert_eq!(config.dispatch.mode, DispatchMode::FailFast);
        assert_eq!(config.dispatch.max_concurrency, 64);
        assert_eq!(config.index.mode, IndexMode::PerWrite);
        assert_eq!(config.processor.tag, "lambda-message-processor");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(config.storage.backend, StorageBackend::Fs);
    }

    #[test]
    fn test_merge_keeps_unset_sections() {
        let mut config = RuntimeConfig::from_platform_defaults(Platform::Lambda);
        let layer: ConfigLayer = toml::from_str(
            r#"
            [storage.s3]
            bucket = "inbox-archive"
            region = "eu-central-1"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        config.merge(layer);

        assert_eq!(config.storage.backend, StorageBackend::S3);
        assert_eq!(config.storage.s3.as_ref().unwrap().bucket, "inbox-archive");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.index.mode, IndexMode::PerWrite);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: RuntimeConfig = toml::from_str(
            r#"
            [storage]
            backend = "s3"

            [storage.s3]
            bucket = "messages-bucket"
            region = "eu-west-1"

            [dispatch]
            mode = "best_effort"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.backend, StorageBackend::S3);
        let s3 = config.storage.s3.as_ref().unwrap();
        assert_eq!(s3.bucket, "messages-bucket");
        assert!(s3.root.is_none());
        assert_eq!(config.dispatch.mode, DispatchMode::BestEffort);
        assert_eq!(config.dispatch.max_concurrency, 64);
        assert_eq!(config.index.mode, IndexMode::PerWrite);
    }
}
