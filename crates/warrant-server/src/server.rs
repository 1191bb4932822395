//! HTTP server implementation.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use warrant_core::WarrantConfig;

use crate::routes;
use crate::service::TokenService;
use crate::state::AppState;

/// The Warrant HTTP server.
pub struct WarrantServer {
    listen: String,
    request_timeout: Duration,
    service: Arc<TokenService>,
}

impl WarrantServer {
    /// Create a server for `service` using the listen address and timeout
    /// from `config`.
    pub fn new(config: &WarrantConfig, service: Arc<TokenService>) -> Self {
        Self {
            listen: config.listen.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            service,
        }
    }

    /// Serve until Ctrl-C, then drain in-flight requests.
    pub async fn run(self) -> anyhow::Result<()> {
        let app = routes::create_router(AppState::new(self.service), self.request_timeout);

        let listener = TcpListener::bind(&self.listen)
            .await
            .with_context(|| format!("failed to bind {}", self.listen))?;
        tracing::info!(address = %self.listen, "Starting warrant server");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")?;

        tracing::info!("Server stopped");
        Ok(())
    }

    /// The configured listen address.
    pub fn listen(&self) -> &str {
        &self.listen
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;
    use warrant_jwt::{SigningKey, TokenCodec};
    use warrant_store::{CredentialStore, MemoryKv};

    #[test]
    fn test_server_creation() {
        let store = CredentialStore::open(Arc::new(MemoryKv::new())).unwrap();
        let service = TokenService::new(TokenCodec::new(SigningKey::generate()), store);

        let server = WarrantServer::new(&WarrantConfig::default(), Arc::new(service));
        assert_eq!(server.listen(), "127.0.0.1:8989");
        assert_eq!(server.request_timeout, Duration::from_secs(60));
    }
}
