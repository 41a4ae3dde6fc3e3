use aws_sdk_s3::Client as S3Client;
use aws_sdk_ssm::Client as SsmClient;
use edge_resize_shared::cloudfront::OriginResponseEvent;
use edge_resize_shared::config::Settings;
use edge_resize_shared::AppState;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod event_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .without_time()
        .init();

    let settings = Settings::from_env();
    tracing::info!(
        "Starting origin-response resizer (parameter {} in {})",
        settings.parameter_name,
        settings.parameter_region
    );

    // Initialize AWS clients once at startup
    let config = aws_config::load_from_env().await;

    let mut s3_config = aws_sdk_s3::config::Builder::from(&config);
    if let Some(region) = &settings.bucket_region {
        s3_config = s3_config.region(aws_sdk_s3::config::Region::new(region.clone()));
    }
    let s3_client = S3Client::from_conf(s3_config.build());

    // The config parameter is read from a fixed region, not the edge region
    let ssm_config = aws_sdk_ssm::config::Builder::from(&config)
        .region(aws_sdk_ssm::config::Region::new(settings.parameter_region.clone()))
        .build();
    let ssm_client = SsmClient::from_conf(ssm_config);

    let state = AppState::new(s3_client, ssm_client, settings);

    run(service_fn(move |event: LambdaEvent<OriginResponseEvent>| {
        let state = Arc::clone(&state);
        async move { event_handler::function_handler(event, state).await }
    }))
    .await
}
