use async_trait::async_trait;
use aws_sdk_ssm::Client as SsmClient;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use crate::error::ConfigError;
use crate::image_processing::ResizeLimits;

/// Parameter holding the resize config document
pub const DEFAULT_PARAMETER_NAME: &str = "Sample-OriginResponseFunction-Params";
/// The parameter lives in us-east-1 regardless of the edge region we run in
pub const DEFAULT_PARAMETER_REGION: &str = "us-east-1";
const DEFAULT_TIMEOUT_SECS: u64 = 25;
/// Lambda@Edge limit for a generated response body
const DEFAULT_MAX_INLINE_BYTES: usize = 1_000_000;

/// What to do when the source image cannot be decoded or re-encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformFailurePolicy {
    /// Return the original 404 like every other failure
    PassThrough,
    /// Fail the invocation
    Fail,
}

impl TransformFailurePolicy {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "pass-through" | "passthrough" => Some(TransformFailurePolicy::PassThrough),
            "fail" => Some(TransformFailurePolicy::Fail),
            _ => None,
        }
    }
}

/// Process settings, read once at cold start
#[derive(Debug, Clone)]
pub struct Settings {
    pub parameter_name: String,
    pub parameter_region: String,
    /// Region of the backing bucket; the SDK default chain when unset
    pub bucket_region: Option<String>,
    pub timeout: Duration,
    pub max_inline_bytes: usize,
    /// Largest requested width and pixel count a derivation may decode or produce
    pub limits: ResizeLimits,
    pub on_transform_error: TransformFailurePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            parameter_name: DEFAULT_PARAMETER_NAME.to_string(),
            parameter_region: DEFAULT_PARAMETER_REGION.to_string(),
            bucket_region: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_inline_bytes: DEFAULT_MAX_INLINE_BYTES,
            limits: ResizeLimits::default(),
            on_transform_error: TransformFailurePolicy::PassThrough,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any variable lookup; bad values keep the default
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        if let Some(name) = lookup("RESIZE_PARAMETER_NAME").filter(|v| !v.is_empty()) {
            settings.parameter_name = name;
        }
        if let Some(region) = lookup("RESIZE_PARAMETER_REGION").filter(|v| !v.is_empty()) {
            settings.parameter_region = region;
        }
        settings.bucket_region = lookup("RESIZE_BUCKET_REGION").filter(|v| !v.is_empty());
        if let Some(raw) = lookup("RESIZE_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => settings.timeout = Duration::from_secs(secs),
                _ => tracing::warn!("Ignoring invalid RESIZE_TIMEOUT_SECS: {}", raw),
            }
        }
        if let Some(raw) = lookup("RESIZE_MAX_INLINE_BYTES") {
            match raw.parse::<usize>() {
                Ok(bytes) if bytes > 0 => settings.max_inline_bytes = bytes,
                _ => tracing::warn!("Ignoring invalid RESIZE_MAX_INLINE_BYTES: {}", raw),
            }
        }
        if let Some(raw) = lookup("RESIZE_MAX_WIDTH") {
            match raw.parse::<u32>() {
                Ok(width) if width > 0 => settings.limits.max_width = width,
                _ => tracing::warn!("Ignoring invalid RESIZE_MAX_WIDTH: {}", raw),
            }
        }
        if let Some(raw) = lookup("RESIZE_MAX_PIXELS") {
            match raw.parse::<u64>() {
                Ok(pixels) if pixels > 0 => settings.limits.max_pixels = pixels,
                _ => tracing::warn!("Ignoring invalid RESIZE_MAX_PIXELS: {}", raw),
            }
        }
        if let Some(raw) = lookup("RESIZE_ON_TRANSFORM_ERROR") {
            match TransformFailurePolicy::parse(&raw) {
                Some(policy) => settings.on_transform_error = policy,
                None => tracing::warn!("Ignoring invalid RESIZE_ON_TRANSFORM_ERROR: {}", raw),
            }
        }

        settings
    }
}

/// Config document stored in the parameter store
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeConfig {
    pub bucket_name: String,
    /// ex) max-age=31536000
    pub cache_control: String,
}

impl ResizeConfig {
    pub fn parse(document: &str) -> Result<Self, ConfigError> {
        let config: ResizeConfig = serde_json::from_str(document)?;
        if config.bucket_name.trim().is_empty() {
            return Err(ConfigError::Invalid("bucketName"));
        }
        if config.cache_control.trim().is_empty() {
            return Err(ConfigError::Invalid("cacheControl"));
        }
        Ok(config)
    }
}

/// Remote key-value store the config document is read from
#[async_trait]
pub trait ParameterStore: Send + Sync {
    async fn fetch_value(&self, name: &str) -> Result<String, ConfigError>;
}

#[async_trait]
impl<T: ParameterStore + ?Sized> ParameterStore for Arc<T> {
    async fn fetch_value(&self, name: &str) -> Result<String, ConfigError> {
        (**self).fetch_value(name).await
    }
}

#[async_trait]
impl ParameterStore for SsmClient {
    async fn fetch_value(&self, name: &str) -> Result<String, ConfigError> {
        let result = self
            .get_parameter()
            .name(name)
            .send()
            .await
            .map_err(|e| ConfigError::Fetch {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        result
            .parameter
            .and_then(|p| p.value)
            .ok_or_else(|| ConfigError::MissingValue(name.to_string()))
    }
}

/// Read and parse the config document. No retry.
pub async fn fetch_config(
    parameters: &dyn ParameterStore,
    name: &str,
) -> Result<ResizeConfig, ConfigError> {
    let value = parameters.fetch_value(name).await?;
    tracing::info!("Config parameter {} read ({} bytes)", name, value.len());
    ResizeConfig::parse(&value)
}
