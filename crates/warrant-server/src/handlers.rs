//! Request handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use warrant_core::{Permission, Principal, TokenRecord};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub name: String,
    pub perm: String,
    #[serde(default)]
    pub extra: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub token: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: u64,
    #[serde(default)]
    pub limit: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
    /// Level the caller needs. Defaults to `read`.
    #[serde(default)]
    pub perm: Option<Permission>,
}

pub async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "service": "warrant-server" }))
}

/// `POST /tokens`
pub async fn generate_token(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GenerateResponse>), ApiError> {
    let Json(req) = payload?;
    let token = state
        .service()
        .generate_token(&req.name, &req.perm, &req.extra)?;
    Ok((StatusCode::CREATED, Json(GenerateResponse { token })))
}

/// `GET /tokens?skip=&limit=`
pub async fn list_tokens(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<TokenRecord>>, ApiError> {
    let Query(params) = params?;
    let records = state.service().tokens(params.skip, params.limit)?;
    Ok(Json(records))
}

/// `DELETE /tokens/{token}`
pub async fn remove_token(
    State(state): State<AppState>,
    token: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(token) = token?;
    state.service().remove_token(&token)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /verify`
pub async fn verify_token(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<Principal>, ApiError> {
    let Json(req) = payload?;
    let required = req.perm.unwrap_or(Permission::Read);
    let principal = state.service().verify_token(&req.token, required)?;
    Ok(Json(principal))
}
