use std::sync::Arc;

use record_lake_core::{ResourceSchema, ResourceService, StorageAdapter};

use crate::config::AppConfig;

/// Shared application state, passed to all handlers via Axum's `State` extractor.
/// Wrapped in `Arc` so cloning is cheap.
pub struct AppState<S> {
    inner: Arc<InnerState<S>>,
}

struct InnerState<S> {
    storage: S,
    config: AppConfig,
    resources: Vec<ResourceService<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: StorageAdapter> AppState<S> {
    /// One resource service per schema, all sharing `storage`.
    pub fn new(storage: S, config: AppConfig, schemas: Vec<ResourceSchema>) -> Self {
        let resources = schemas
            .into_iter()
            .map(|schema| ResourceService::new(schema, storage.clone()))
            .collect();
        Self {
            inner: Arc::new(InnerState {
                storage,
                config,
                resources,
            }),
        }
    }

    pub fn storage(&self) -> &S {
        &self.inner.storage
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn resources(&self) -> &[ResourceService<S>] {
        &self.inner.resources
    }
}
