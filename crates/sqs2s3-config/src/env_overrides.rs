use crate::{
    DispatchMode, FsConfig, IndexMode, LogFormat, RuntimeConfig, S3Config, StorageBackend,
};
use anyhow::{anyhow, Context, Result};

pub const ENV_PREFIX: &str = "SQS2S3_";

/// Abstraction over environment-variable lookups so tests (and runtimes
/// without `std::env`) can supply their own source of overrides.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Get an environment variable WITHOUT the SQS2S3_ prefix
    /// Used for the variables the Lambda deployment already sets (S3_BUCKET, AWS_REGION)
    fn get_raw(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    // Storage backend
    if let Some(backend) = env.get("STORAGE_BACKEND") {
        config.storage.backend = backend
            .parse::<StorageBackend>()
            .context("Invalid SQS2S3_STORAGE_BACKEND value")?;
    }

    // Filesystem storage
    if let Some(path) = env.get("STORAGE_PATH") {
        config.storage.fs.get_or_insert_with(FsConfig::default).path = path;
    }

    // S3 storage. Unprefixed names first so the prefixed ones win.
    if let Some(bucket) = env.get_raw("S3_BUCKET") {
        ensure_s3(config).bucket = bucket;
    }
    if let Some(region) = env.get_raw("AWS_REGION") {
        ensure_s3(config).region = region;
    }
    if let Some(bucket) = env.get("S3_BUCKET") {
        ensure_s3(config).bucket = bucket;
    }
    if let Some(region) = env.get("S3_REGION") {
        ensure_s3(config).region = region;
    }
    if let Some(endpoint) = env.get("S3_ENDPOINT") {
        ensure_s3(config).endpoint = Some(endpoint);
    }
    if let Some(root) = env.get("S3_ROOT") {
        ensure_s3(config).root = normalize_root(root);
    }

    // Dispatch
    if let Some(mode) = env.get("DISPATCH_MODE") {
        config.dispatch.mode = mode
            .parse::<DispatchMode>()
            .context("Invalid SQS2S3_DISPATCH_MODE value")?;
    }
    if let Some(val) = get_env_usize(env, "MAX_CONCURRENCY")? {
        config.dispatch.max_concurrency = val;
    }

    // Index
    if let Some(mode) = env.get("INDEX_MODE") {
        config.index.mode = mode
            .parse::<IndexMode>()
            .context("Invalid SQS2S3_INDEX_MODE value")?;
    }

    if let Some(tag) = env.get("PROCESSOR_TAG") {
        config.processor.tag = tag;
    }

    // Logging
    if let Some(level) = env.get("LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = env.get("LOG_FORMAT") {
        config.logging.format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
    }

    Ok(())
}

fn ensure_s3(config: &mut RuntimeConfig) -> &mut S3Config {
    config.storage.s3.get_or_insert_with(|| S3Config {
        bucket: String::new(),
        region: String::new(),
        endpoint: None,
        root: None,
    })
}

fn get_env_usize<E: EnvSource>(env: &E, key: &str) -> Result<Option<usize>> {
    match env.get(key) {
        Some(val) => {
            let parsed = val
                .parse::<usize>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn normalize_root(root: String) -> Option<String> {
    let trimmed = root.trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{}/", trimmed))
    }
}
