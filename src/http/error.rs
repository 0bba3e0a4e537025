//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块负责把领域错误映射为HTTP状态码，只在HTTP边界使用。

use crate::cart::CartError;
use crate::guaranty::GuarantyError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Guaranty(#[from] GuarantyError),

    /// 缺少或无法解析用户标识
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Cart(e) => match e {
                CartError::CartNotFound(_) => StatusCode::NOT_FOUND,
                CartError::InvalidPayload(_) | CartError::KeyTooLong { .. } => {
                    StatusCode::BAD_REQUEST
                }
                CartError::CartAlreadyExists(_) => StatusCode::CONFLICT,
                CartError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Guaranty(e) => match e {
                GuarantyError::NotFound(_) => StatusCode::NOT_FOUND,
                GuarantyError::UnsupportedFile(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                GuarantyError::MissingFile => StatusCode::BAD_REQUEST,
                GuarantyError::Spreadsheet(_) => StatusCode::UNPROCESSABLE_ENTITY,
                GuarantyError::Storage(_) => StatusCode::BAD_GATEWAY,
                GuarantyError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "detail": message }))).into_response()
    }
}
