pub mod cloudfront;
pub mod config;
pub mod error;
pub mod image_processing;
pub mod key_codec;
pub mod resolver;
pub mod s3;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

use config::{ParameterStore, Settings};
use s3::ObjectStore;
use std::sync::Arc;

/// Clients and settings shared by every invocation of a warm container
pub struct AppState {
    pub store: Box<dyn ObjectStore>,
    pub parameters: Box<dyn ParameterStore>,
    pub settings: Settings,
}

impl AppState {
    pub fn new(
        store: impl ObjectStore + 'static,
        parameters: impl ParameterStore + 'static,
        settings: Settings,
    ) -> Arc<Self> {
        Arc::new(Self {
            store: Box::new(store),
            parameters: Box::new(parameters),
            settings,
        })
    }
}
