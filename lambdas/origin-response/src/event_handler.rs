use edge_resize_shared::cloudfront::{OriginResponse, OriginResponseEvent};
use edge_resize_shared::error::ResolveError;
use edge_resize_shared::resolver::{self, Outcome};
use edge_resize_shared::AppState;
use lambda_runtime::{Error, LambdaEvent};
use std::sync::Arc;

/// Origin-response trigger: returns the response CloudFront should use
pub(crate) async fn function_handler(
    event: LambdaEvent<OriginResponseEvent>,
    state: Arc<AppState>,
) -> Result<OriginResponse, Error> {
    tracing::info!(
        request_id = event.context.request_id.as_str(),
        "Origin response event received with {} records",
        event.payload.records.len()
    );

    // CloudFront sends exactly one record per invocation
    let record = match event.payload.records.into_iter().next() {
        Some(record) => record,
        None => {
            tracing::error!("Origin response event has no records");
            return Err(ResolveError::MissingRecord.into());
        }
    };

    match resolver::resolve(&state, &record.cf.request, record.cf.response).await {
        Outcome::PassThrough(response) => Ok(response),
        Outcome::Derived(response) => {
            tracing::info!("Returning resized image for {}", record.cf.request.uri);
            Ok(response)
        }
        Outcome::Fatal(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose, Engine as _};
    use edge_resize_shared::config::{Settings, TransformFailurePolicy};
    use edge_resize_shared::memory::{MemoryObjectStore, StaticParameterStore};
    use image::{DynamicImage, ImageFormat, RgbImage};
    use lambda_runtime::Context;
    use std::io::Cursor;

    const BUCKET: &str = "resize-origin";
    const CONFIG_DOC: &str = r#"{"bucketName": "resize-origin", "cacheControl": "max-age=31536000"}"#;

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 3 % 256) as u8, (y * 5 % 256) as u8, 90])
        }));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
        buf.into_inner()
    }

    fn event(uri: &str, status: &str) -> LambdaEvent<OriginResponseEvent> {
        let payload = serde_json::json!({
            "Records": [{
                "cf": {
                    "config": {"distributionId": "EDFDVBD6EXAMPLE", "eventType": "origin-response"},
                    "request": {"method": "GET", "uri": uri, "querystring": "", "headers": {}},
                    "response": {
                        "status": status,
                        "statusDescription": "Not Found",
                        "headers": {
                            "server": [{"key": "Server", "value": "AmazonS3"}]
                        }
                    }
                }
            }]
        });
        LambdaEvent::new(serde_json::from_value(payload).unwrap(), Context::default())
    }

    fn state(
        store: &Arc<MemoryObjectStore>,
        parameters: StaticParameterStore,
        settings: Settings,
    ) -> Arc<AppState> {
        AppState::new(Arc::clone(store), parameters, settings)
    }

    #[tokio::test]
    async fn test_returns_resized_image_for_missing_variant() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert(BUCKET, "images/photo.jpg", jpeg(640, 480));
        let state = state(&store, StaticParameterStore::new(CONFIG_DOC), Settings::default());

        let response = function_handler(event("/images/w100/photo.jpg", "404"), state)
            .await
            .unwrap();

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "200");
        assert_eq!(json["bodyEncoding"], "base64");
        assert_eq!(
            json["headers"]["content-type"],
            serde_json::json!([{"key": "Content-Type", "value": "image/jpeg"}])
        );
        assert_eq!(json["headers"]["server"][0]["value"], "AmazonS3");

        let body = general_purpose::STANDARD
            .decode(json["body"].as_str().unwrap())
            .unwrap();
        let resized = image::load_from_memory(&body).unwrap();
        assert_eq!((resized.width(), resized.height()), (100, 75));

        let stored = store.object(BUCKET, "images/w100/photo.jpg").unwrap();
        assert_eq!(stored.body, body);
    }

    #[tokio::test]
    async fn test_missing_original_returns_original_response() {
        let store = Arc::new(MemoryObjectStore::new());
        let state = state(&store, StaticParameterStore::new(CONFIG_DOC), Settings::default());
        let incoming = event("/images/w50/icon.png", "404");
        let expected = serde_json::to_value(&incoming.payload.records[0].cf.response).unwrap();

        let response = function_handler(incoming, state).await.unwrap();

        assert_eq!(serde_json::to_value(&response).unwrap(), expected);
        assert!(store.puts().is_empty());
    }

    #[tokio::test]
    async fn test_hit_is_returned_untouched() {
        let store = Arc::new(MemoryObjectStore::new());
        let parameters = Arc::new(StaticParameterStore::new(CONFIG_DOC));
        let state = AppState::new(Arc::clone(&store), Arc::clone(&parameters), Settings::default());

        let response = function_handler(event("/images/w100/photo.jpg", "200"), state)
            .await
            .unwrap();

        assert_eq!(response.status, "200");
        assert!(response.body.is_none());
        assert_eq!(store.call_count(), 0);
        assert!(parameters.requested_names().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_original_fails_invocation_when_configured() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert(BUCKET, "images/photo.jpg", b"garbage".to_vec());
        let settings = Settings {
            on_transform_error: TransformFailurePolicy::Fail,
            ..Settings::default()
        };
        let state = state(&store, StaticParameterStore::new(CONFIG_DOC), settings);

        let result = function_handler(event("/images/w100/photo.jpg", "404"), state).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_event_without_records_is_an_error() {
        let store = Arc::new(MemoryObjectStore::new());
        let state = state(&store, StaticParameterStore::new(CONFIG_DOC), Settings::default());
        let event = LambdaEvent::new(OriginResponseEvent { records: Vec::new() }, Context::default());

        let err = function_handler(event, state).await.unwrap_err();
        assert_eq!(err.to_string(), "event contains no records");
    }
}
