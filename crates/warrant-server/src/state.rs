//! Shared application state.

use std::sync::Arc;

use crate::service::TokenService;

/// State handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    service: Arc<TokenService>,
}

impl AppState {
    pub fn new(service: Arc<TokenService>) -> Self {
        Self { service }
    }

    /// The token service.
    pub fn service(&self) -> &TokenService {
        &self.service
    }
}
