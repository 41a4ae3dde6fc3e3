//! Turns an origin 404 for a scaled variant into the scaled image.
//!
//! Every failure hands back the original response untouched, so a request
//! is never worse off than without the resizer. The one exception is a
//! transform failure under [`TransformFailurePolicy::Fail`]. A width past the
//! configured resize limits is a bad request, not a broken original, and
//! always passes through.

use base64::{engine::general_purpose, Engine as _};
use crate::cloudfront::{OriginRequest, OriginResponse};
use crate::config::{self, ResizeConfig, TransformFailurePolicy};
use crate::error::{ResolveError, TransformError};
use crate::image_processing::{self, ResizeLimits};
use crate::key_codec::{self, DerivedKey};
use crate::s3::{DerivedObject, StoredObject};
use crate::AppState;

/// Result of handling one origin response
#[derive(Debug)]
pub enum Outcome {
    /// The incoming response, unmodified
    PassThrough(OriginResponse),
    /// A synthesized 200 carrying the resized image
    Derived(OriginResponse),
    /// The invocation should fail
    Fatal(ResolveError),
}

impl Outcome {
    /// The response to hand back to CloudFront, or the fatal error
    pub fn into_response(self) -> Result<OriginResponse, ResolveError> {
        match self {
            Outcome::PassThrough(response) | Outcome::Derived(response) => Ok(response),
            Outcome::Fatal(e) => Err(e),
        }
    }
}

/// Map a derivation result to an outcome
pub fn decide(
    result: Result<OriginResponse, ResolveError>,
    original: OriginResponse,
    on_transform_error: TransformFailurePolicy,
) -> Outcome {
    match result {
        Ok(derived) => Outcome::Derived(derived),
        Err(ResolveError::Transform(e))
            if on_transform_error == TransformFailurePolicy::Fail
                && !matches!(e, TransformError::TooLarge { .. }) =>
        {
            Outcome::Fatal(ResolveError::Transform(e))
        }
        Err(ResolveError::MissingRecord) => Outcome::Fatal(ResolveError::MissingRecord),
        Err(_) => Outcome::PassThrough(original),
    }
}

/// Handle one origin response for `request`
pub async fn resolve(state: &AppState, request: &OriginRequest, response: OriginResponse) -> Outcome {
    tracing::info!("Response status code: {}", response.status);

    // Check if image is not present
    if !response.is_not_found() {
        return Outcome::PassThrough(response);
    }

    let requested_key = request.object_key();
    let timeout = state.settings.timeout;

    let result = match tokio::time::timeout(timeout, derive(state, requested_key, &response)).await {
        Ok(result) => result,
        Err(_) => Err(ResolveError::Timeout(timeout)),
    };

    match &result {
        Ok(_) => tracing::info!(requested_key, "Resized image served"),
        Err(e) => {
            let original_key = key_codec::decode(requested_key)
                .map(|k| k.original_key)
                .unwrap_or_default();
            tracing::warn!(
                stage = e.stage(),
                requested_key,
                original_key = original_key.as_str(),
                "Derivation failed: {}",
                e
            );
        }
    }

    let outcome = decide(result, response, state.settings.on_transform_error);
    if let Outcome::Fatal(e) = &outcome {
        tracing::error!(stage = e.stage(), requested_key, "Failing invocation: {}", e);
    }
    outcome
}

/// Steps from key decode through to the synthesized response
async fn derive(
    state: &AppState,
    requested_key: &str,
    response: &OriginResponse,
) -> Result<OriginResponse, ResolveError> {
    // Ex: images/w100/image.jpg → images/image.jpg at width 100
    let key = key_codec::decode(requested_key)?;

    // Config only after the key is known to be valid
    let config =
        config::fetch_config(state.parameters.as_ref(), &state.settings.parameter_name).await?;

    // Get the source image file
    tracing::info!("getObject originalKey: {}", key.original_key);
    let original = state
        .store
        .get(&config.bucket_name, &key.original_key)
        .await
        .map_err(ResolveError::FetchOriginal)?;

    let resized = resize_off_thread(&key, &original, state.settings.limits).await?;

    // Save the resized object under the requested key
    state
        .store
        .put(
            &config.bucket_name,
            &key.requested_key,
            DerivedObject {
                body: resized.clone(),
                content_type: key.format.content_type(),
                cache_control: config.cache_control.clone(),
            },
        )
        .await
        .map_err(ResolveError::PersistDerived)?;
    tracing::info!("resized: {} -> {}", key.original_key, key.requested_key);

    let encoded = general_purpose::STANDARD.encode(&resized);
    let limit = state.settings.max_inline_bytes;
    if encoded.len() > limit {
        // Stored anyway; the next request is served from the bucket
        return Err(ResolveError::BodyTooLarge {
            size: encoded.len(),
            limit,
        });
    }

    Ok(synthesize(response, &key, &config, &original, encoded))
}

async fn resize_off_thread(
    key: &DerivedKey,
    original: &StoredObject,
    limits: ResizeLimits,
) -> Result<Vec<u8>, ResolveError> {
    let body = original.body.clone();
    let (width, format) = (key.width, key.format);

    let resized = tokio::task::spawn_blocking(move || {
        image_processing::resize(&body, width, format, &limits)
    })
    .await
    .map_err(|e| TransformError::Aborted(e.to_string()))??;
    Ok(resized)
}

/// Build the 200 response with the resized image inline
fn synthesize(
    response: &OriginResponse,
    key: &DerivedKey,
    config: &ResizeConfig,
    original: &StoredObject,
    encoded_body: String,
) -> OriginResponse {
    let mut derived = response.clone();
    derived.status = "200".to_string();
    derived.status_description = Some("OK".to_string());
    derived.body = Some(encoded_body);
    derived.body_encoding = Some("base64".to_string());

    derived.set_header("Content-Type", key.format.content_type());
    derived.set_header("Cache-Control", config.cache_control.as_str());
    if let Some(etag) = &original.etag {
        derived.set_header("ETag", etag.as_str());
    }
    if let Some(last_modified) = &original.last_modified {
        derived.set_header("Last-Modified", last_modified.as_str());
    }

    derived
}
