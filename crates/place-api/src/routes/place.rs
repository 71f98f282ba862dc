//! 페인트 endpoint.
//!
//! `POST /place`
//!
//! ```json
//! { "x": 10, "y": 20, "color": "#ff0000", "identity": "u1" }
//! ```
//!
//! 성공 시 `{"ok": true, "tokensLeft": 9}`를 반환합니다.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use place_core::PaintRequest;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

/// 페인트 성공 응답.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceResponse {
    pub ok: bool,
    pub tokens_left: u32,
}

/// 셀 칠하기.
///
/// 본문 파싱 실패는 `InvalidInput`(400)으로 처리됩니다.
pub async fn place_pixel(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PaintRequest>, JsonRejection>,
) -> ApiResult<Json<PlaceResponse>> {
    let Json(request) = payload?;
    let receipt = state.paint.submit_paint(request).await?;

    Ok(Json(PlaceResponse {
        ok: true,
        tokens_left: receipt.tokens_left,
    }))
}

/// 페인트 라우터 생성.
pub fn place_router() -> Router<Arc<AppState>> {
    Router::new().route("/place", post(place_pixel))
}
