// Platform detection based on environment variables
//
// Auto-detects runtime environment:
// - AWS Lambda: AWS_LAMBDA_FUNCTION_NAME env var present
// - Local: anything else (replay CLI, tests)

use crate::*;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Local,
    Lambda,
}

impl Platform {
    /// Auto-detect the current platform based on environment variables
    pub fn detect() -> Self {
        if env::var("AWS_LAMBDA_FUNCTION_NAME").is_ok() {
            Platform::Lambda
        } else {
            Platform::Local
        }
    }

    /// Get platform-specific defaults
    pub fn defaults(&self) -> PlatformDefaults {
        match self {
            Platform::Local => PlatformDefaults {
                storage_backend: "fs",
                log_format: LogFormat::Text,
            },
            // CloudWatch keeps one line per event, so emit JSON there
            Platform::Lambda => PlatformDefaults {
                storage_backend: "s3",
                log_format: LogFormat::Json,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlatformDefaults {
    pub storage_backend: &'static str,
    pub log_format: LogFormat,
}

pub(crate) fn platform_defaults(platform: Platform) -> RuntimeConfig {
    let defaults = platform.defaults();

    let storage_backend = defaults
        .storage_backend
        .parse::<StorageBackend>()
        .unwrap_or(StorageBackend::Fs);

    let storage = match storage_backend {
        StorageBackend::Fs => StorageConfig::default(),
        StorageBackend::S3 => StorageConfig {
            backend: StorageBackend::S3,
            fs: None,
            s3: Some(S3Config {
                bucket: String::new(),
                region: "us-east-1".to_string(),
                endpoint: None,
                root: None,
            }),
        },
        StorageBackend::Memory => StorageConfig {
            backend: StorageBackend::Memory,
            fs: None,
            s3: None,
        },
    };

    RuntimeConfig {
        storage,
        logging: LogConfig {
            format: defaults.log_format,
            ..LogConfig::default()
        },
        ..RuntimeConfig::default()
    }
}
