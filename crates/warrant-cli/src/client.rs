//! HTTP client for the Warrant server API.

use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use warrant_core::{Permission, Principal, TokenRecord};

/// Endpoint used when neither `--endpoint` nor `WARRANT_ENDPOINT` is set.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8989";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors returned by [`WarrantClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-success status.
    #[error("{message} ({status})")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("request to warrant server failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    name: &'a str,
    perm: Permission,
    extra: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    token: String,
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    token: &'a str,
    perm: Permission,
}

/// Thin JSON client over the server's routes.
#[derive(Debug, Clone)]
pub struct WarrantClient {
    base: String,
    http: reqwest::Client,
}

impl WarrantClient {
    pub fn new(endpoint: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base: endpoint.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub async fn generate_token(
        &self,
        name: &str,
        perm: Permission,
        extra: &str,
    ) -> Result<String, ClientError> {
        let resp = self
            .http
            .post(format!("{}/tokens", self.base))
            .json(&GenerateRequest { name, perm, extra })
            .send()
            .await?;
        let body: GenerateResponse = check(resp).await?.json().await?;
        Ok(body.token)
    }

    pub async fn tokens(&self, skip: u64, limit: u64) -> Result<Vec<TokenRecord>, ClientError> {
        let resp = self
            .http
            .get(format!("{}/tokens", self.base))
            .query(&[("skip", skip), ("limit", limit)])
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn remove_token(&self, token: &str) -> Result<(), ClientError> {
        let resp = self
            .http
            .delete(format!("{}/tokens/{}", self.base, token))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    pub async fn verify_token(&self, token: &str, perm: Permission) -> Result<Principal, ClientError> {
        let resp = self
            .http
            .post(format!("{}/verify", self.base))
            .json(&VerifyRequest { token, perm })
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }
}

/// Turn a non-2xx response into [`ClientError::Api`].
async fn check(resp: Response) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await?;
    let (code, message) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) if !body.message.is_empty() => (body.error, body.message),
        _ => (String::new(), text),
    };
    tracing::debug!(%status, %code, "Server returned an error");
    Err(ClientError::Api {
        status,
        code,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use warrant_jwt::{SigningKey, TokenCodec};
    use warrant_server::{AppState, TokenService, create_router};
    use warrant_store::{CredentialStore, MemoryKv};

    struct TestServer {
        base_url: String,
        handle: tokio::task::JoinHandle<()>,
    }

    impl TestServer {
        async fn spawn() -> Self {
            let store = CredentialStore::open(Arc::new(MemoryKv::new())).unwrap();
            let service = TokenService::new(TokenCodec::new(SigningKey::generate()), store);
            let app = create_router(AppState::new(Arc::new(service)), Duration::from_secs(5));

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base_url = format!("http://{}", listener.local_addr().unwrap());
            let handle = tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            Self { base_url, handle }
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            self.handle.abort();
        }
    }

    #[tokio::test]
    async fn test_client_round_trip() {
        let srv = TestServer::spawn().await;
        let client = WarrantClient::new(&format!("{}/", srv.base_url)).unwrap();

        let token = client
            .generate_token("alice", Permission::Write, "f01234")
            .await
            .unwrap();

        let records = client.tokens(0, 20).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].token, token);
        assert_eq!(records[0].extra, "f01234");

        let principal = client.verify_token(&token, Permission::Read).await.unwrap();
        assert_eq!(principal.name, "alice");

        client.remove_token(&token).await.unwrap();
        match client.remove_token(&token).await {
            Err(ClientError::Api { status, code, .. }) => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(code, "not_found");
            }
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_client_surfaces_server_message() {
        let srv = TestServer::spawn().await;
        let client = WarrantClient::new(&srv.base_url).unwrap();

        let token = client
            .generate_token("reader", Permission::Read, "")
            .await
            .unwrap();
        let err = client
            .verify_token(&token, Permission::Admin)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("does not cover"), "{err}");
        assert!(matches!(
            err,
            ClientError::Api { status, .. } if status == StatusCode::FORBIDDEN
        ));
    }
}
