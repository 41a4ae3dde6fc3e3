use thiserror::Error;

/// Why a requested key could not be turned into a resize job
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("key {0:?} has no transform segment before the filename")]
    MissingTransform(String),
    #[error("transform segment {0:?} is not w<positive integer>")]
    InvalidWidth(String),
    #[error("filename {0:?} has no extension")]
    MissingExtension(String),
    #[error("extension {0:?} is not a supported output format")]
    UnsupportedFormat(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read parameter {name}: {message}")]
    Fetch { name: String, message: String },
    #[error("parameter {0} has no value")]
    MissingValue(String),
    #[error("parameter value is not a valid config document: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("config field {0} is empty")]
    Invalid(&'static str),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object s3://{bucket}/{key} not found")]
    NotFound { bucket: String, key: String },
    #[error("object store request failed: {0}")]
    Transient(String),
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to decode source image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode resized image: {0}")]
    Encode(#[source] image::ImageError),
    #[error("resize task did not complete: {0}")]
    Aborted(String),
    #[error("{width}x{height} image exceeds resize limits ({limit} pixels)")]
    TooLarge { width: u32, height: u32, limit: u64 },
}

/// Any failure on the way from a cache miss to a derived response
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to fetch original: {0}")]
    FetchOriginal(#[source] StoreError),
    #[error("failed to store derived object: {0}")]
    PersistDerived(#[source] StoreError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("derivation did not finish within {0:?}")]
    Timeout(std::time::Duration),
    #[error("encoded body is {size} bytes, inline limit is {limit}")]
    BodyTooLarge { size: usize, limit: usize },
    #[error("event contains no records")]
    MissingRecord,
}

impl ResolveError {
    /// Pipeline stage the error came from, for log context
    pub fn stage(&self) -> &'static str {
        match self {
            ResolveError::Key(_) => "decode_key",
            ResolveError::Config(_) => "fetch_config",
            ResolveError::FetchOriginal(_) => "fetch_original",
            ResolveError::PersistDerived(_) => "persist_derived",
            ResolveError::Transform(_) => "transform",
            ResolveError::Timeout(_) => "timeout",
            ResolveError::BodyTooLarge { .. } => "synthesize",
            ResolveError::MissingRecord => "event",
        }
    }
}
