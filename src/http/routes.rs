//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了HTTP处理函数和用户标识提取器。

use super::error::ApiError;
use super::AppState;
use crate::cart::CartUpdate;
use crate::guaranty::{Guaranty, GuarantyError};
use crate::metrics::get_metrics_string;
use axum::extract::{FromRequestParts, Multipart, Path, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 上游认证网关写入的用户标识请求头
pub const USER_ID_HEADER: &str = "x-user-id";

/// 已认证的用户ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub i32);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", USER_ID_HEADER)))?;
        raw.to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i32>().ok())
            .map(AuthUser)
            .ok_or_else(|| ApiError::Unauthorized(format!("invalid {} header", USER_ID_HEADER)))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
}

/// PUT /cart
pub async fn update_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(update): Json<CartUpdate>,
) -> Result<StatusCode, ApiError> {
    state.cart.update_cart(user_id, update).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/guaranties
///
/// 取第一个带文件名的字段，其余字段忽略
pub async fn upload_guaranties(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let Some(original) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let body = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        debug!("User {} uploaded {} ({} bytes)", user_id, original, body.len());

        let filename = state.guaranty.stage_import(&original, body).await?;
        return Ok((StatusCode::CREATED, Json(UploadResponse { filename })));
    }
    Err(GuarantyError::MissingFile.into())
}

/// GET /guaranties/{serial}
pub async fn get_guaranty(
    State(state): State<AppState>,
    Path(serial): Path<String>,
) -> Result<Json<Guaranty>, ApiError> {
    Ok(Json(state.guaranty.lookup(&serial).await?))
}

/// GET /metrics
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        get_metrics_string(),
    )
}
