// Configuration validation
//
// Validates that required fields are present and values are sensible

use crate::*;
use anyhow::{bail, Result};
use tracing::warn;

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_storage_config(&config.storage)?;
    validate_dispatch_config(&config.dispatch)?;

    if config.processor.tag.trim().is_empty() {
        bail!("processor.tag must not be empty");
    }

    if config.storage.backend == StorageBackend::Memory {
        warn!("memory storage backend selected; stored messages will not outlive the process");
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<()> {
    match config.backend {
        StorageBackend::Fs => {
            let fs = config
                .fs
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("fs storage backend requires 'fs' configuration"))?;

            if fs.path.is_empty() {
                bail!("storage.fs.path must not be empty");
            }
        }
        StorageBackend::S3 => {
            let s3 = config
                .s3
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("s3 storage backend requires 's3' configuration"))?;

            if s3.bucket.is_empty() {
                bail!("storage.s3.bucket is required for S3 backend (set S3_BUCKET)");
            }

            if s3.region.is_empty() {
                bail!("storage.s3.region is required for S3 backend");
            }
        }
        StorageBackend::Memory => {}
    }

    Ok(())
}

fn validate_dispatch_config(config: &DispatchConfig) -> Result<()> {
    if config.max_concurrency == 0 {
        bail!("dispatch.max_concurrency must be greater than 0");
    }

    if config.mode == DispatchMode::FailFast && config.max_concurrency != default_max_concurrency()
    {
        warn!(
            max_concurrency = config.max_concurrency,
            "dispatch.max_concurrency has no effect in fail_fast mode"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s3_storage(bucket: &str, region: &str) -> StorageConfig {
        StorageConfig {
            backend: StorageBackend::S3,
            fs: None,
            s3: Some(S3Config {
                bucket: bucket.to_string(),
                region: region.to_string(),
                endpoint: None,
                root: None,
            }),
        }
    }

    #[test]
    fn test_validate_storage_config() {
        assert!(validate_storage_config(&s3_storage("test-bucket", "us-east-1")).is_ok());

        // Missing bucket
        let err = validate_storage_config(&s3_storage("", "us-east-1")).unwrap_err();
        assert!(err.to_string().contains("bucket"));

        // Missing region
        assert!(validate_storage_config(&s3_storage("test-bucket", "")).is_err());

        // S3 backend without an s3 section
        let missing = StorageConfig {
            backend: StorageBackend::S3,
            fs: None,
            s3: None,
        };
        assert!(validate_storage_config(&missing).is_err());

        let fs = StorageConfig {
            backend: StorageBackend::Fs,
            fs: Some(FsConfig {
                path: String::new(),
            }),
            s3: None,
        };
        assert!(validate_storage_config(&fs).is_err());
    }

    #[test]
    fn test_validate_dispatch_and_processor() {
        let mut config = RuntimeConfig::default();
        assert!(validate_config(&config).is_ok());

        config.dispatch.max_concurrency = 0;
        assert!(validate_config(&config).is_err());

        config.dispatch.max_concurrency = 4;
        config.processor.tag = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn lambda_defaults_require_a_bucket() {
        let config = RuntimeConfig::from_platform_defaults(Platform::Lambda);
        assert!(validate_config(&config).is_err());
    }
}
