//! API 에러 응답.
//!
//! 모든 엔드포인트에서 일관된 에러 형식을 제공합니다.
//!
//! ```json
//! {
//!   "error": "쿨다운 중입니다. 5초 후 다시 시도하세요",
//!   "code": "COOLDOWN_ACTIVE",
//!   "retryAfter": 5
//! }
//! ```
//!
//! | 에러 | 상태 코드 |
//! |------|-----------|
//! | `InvalidInput`, `OutOfBounds` | 400 |
//! | `CooldownActive`, `NoTokens` | 429 + `Retry-After` |
//! | `Unexpected` | 500 (메시지는 숨김, 로그에 기록) |

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use place_core::PlaceError;
use serde::{Deserialize, Serialize};

/// 에러 응답 본문.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    /// 사람이 읽을 수 있는 에러 메시지
    pub error: String,
    /// 에러 코드 (예: "INVALID_INPUT", "NO_TOKENS")
    pub code: String,
    /// 재시도까지 대기 시간 (초, rate limit 에러만)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            retry_after: None,
        }
    }
}

/// 핸들러 에러.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Place(#[from] PlaceError),

    /// 본문 파싱 실패 (타입 불일치, 필드 누락, 잘못된 JSON)
    #[error("잘못된 요청 본문: {0}")]
    Body(#[from] JsonRejection),
}

impl ApiError {
    fn into_place_error(self) -> PlaceError {
        match self {
            ApiError::Place(e) => e,
            ApiError::Body(rejection) => PlaceError::InvalidInput(rejection.body_text()),
        }
    }
}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, ApiError>;

/// `PlaceError`에 대응하는 HTTP 상태 코드.
pub fn status_for(error: &PlaceError) -> StatusCode {
    match error {
        PlaceError::InvalidInput(_) | PlaceError::OutOfBounds { .. } => StatusCode::BAD_REQUEST,
        PlaceError::CooldownActive { .. } | PlaceError::NoTokens { .. } => {
            StatusCode::TOO_MANY_REQUESTS
        }
        PlaceError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = self.into_place_error();
        let status = status_for(&error);

        let message = match &error {
            PlaceError::Unexpected(detail) => {
                tracing::error!(error = %detail, "Unexpected failure while handling request");
                "예상치 못한 오류가 발생했습니다".to_string()
            }
            other => other.to_string(),
        };

        let body = ApiErrorResponse {
            error: message,
            code: error.code().to_string(),
            retry_after: error.retry_after_secs(),
        };

        let mut response = (status, Json(body)).into_response();

        // Retry-After 헤더 추가
        if let Some(secs) = error.retry_after_secs() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }

        response
    }
}
