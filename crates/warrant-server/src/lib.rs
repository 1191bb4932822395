//! # warrant-server
//!
//! Token service and HTTP transport for Warrant.
//!
//! This crate provides functionality for:
//! - [`TokenService`]: issuing, listing, revoking and verifying credentials
//! - Process bootstrap: repo and data directories, `config.toml`, secret generation
//! - An axum router exposing the service over JSON
//!
//! ## Routes
//!
//! | Method | Path | Success | Errors |
//! |--------|------|---------|--------|
//! | `GET` | `/healthz` | 200 | |
//! | `POST` | `/tokens` | 201 `{token}` | 400 |
//! | `GET` | `/tokens?skip=&limit=` | 200 `[TokenRecord]` | 400 |
//! | `DELETE` | `/tokens/{token}` | 204 | 404 |
//! | `POST` | `/verify` | 200 `Principal` | 401 unknown, 403 insufficient |
//!
//! Error bodies are `{"error": "<code>", "message": "<text>"}`.

pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod service;
pub mod state;

pub use error::{ApiError, ServiceError};
pub use routes::create_router;
pub use server::WarrantServer;
pub use service::TokenService;
pub use state::AppState;
