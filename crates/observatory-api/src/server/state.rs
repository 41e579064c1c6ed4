use std::sync::Arc;

use tokio::sync::Mutex;

use super::error::HttpApiError;
use crate::{CatalogError, RunCatalog};

/// Shared handler state: the one run catalog for this server.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<ServerInner>>,
}

impl AppState {
    pub fn new(catalog: RunCatalog) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ServerInner {
                catalog: Some(catalog),
            })),
        }
    }

    pub(crate) async fn lock(&self) -> tokio::sync::MutexGuard<'_, ServerInner> {
        self.inner.lock().await
    }

    /// Takes the catalog out of the state and closes its store. Later requests get 503.
    pub async fn shutdown(&self) -> Result<(), CatalogError> {
        let catalog = self.inner.lock().await.catalog.take();
        match catalog {
            Some(catalog) => catalog.close(),
            None => Ok(()),
        }
    }
}

#[derive(Debug)]
pub(crate) struct ServerInner {
    catalog: Option<RunCatalog>,
}

impl ServerInner {
    pub(crate) fn catalog(&self) -> Result<&RunCatalog, HttpApiError> {
        self.catalog.as_ref().ok_or_else(HttpApiError::unavailable)
    }

    pub(crate) fn catalog_mut(&mut self) -> Result<&mut RunCatalog, HttpApiError> {
        self.catalog.as_mut().ok_or_else(HttpApiError::unavailable)
    }
}
