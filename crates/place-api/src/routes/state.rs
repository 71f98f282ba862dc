//! 그리드 스냅샷 endpoint.
//!
//! `GET /state`

use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::state::AppState;

/// 현재 그리드 상태 조회.
///
/// 칠해진 셀만 포함되며 순서는 보장하지 않습니다.
pub async fn get_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.get_state().await;
    ([(header::CACHE_CONTROL, "no-store")], Json(snapshot))
}

/// 스냅샷 라우터 생성.
pub fn state_router() -> Router<Arc<AppState>> {
    Router::new().route("/state", get(get_state))
}
