//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/state`, `/api/state` - 그리드 스냅샷
//! - `/place`, `/api/place` - 셀 칠하기
//! - `/events`, `/api/events` - 페인트 이벤트 스트림 (SSE)

pub mod health;
pub mod place;
pub mod state;

pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};
pub use place::{place_router, PlaceResponse};
pub use state::state_router;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::middleware::metrics_layer;
use crate::state::AppState;
use crate::stream::events_handler;

/// 캔버스 API 라우터 생성.
///
/// 타임아웃은 일반 요청에만 적용되고 이벤트 스트림에는 적용되지 않습니다.
pub fn create_api_router(request_timeout: Duration) -> Router<Arc<AppState>> {
    let timed = Router::new()
        .merge(state_router())
        .merge(place_router())
        // 타임아웃 - 408 상태 코드 반환
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ));

    Router::new()
        .merge(timed)
        .route("/events", get(events_handler))
}

/// 전체 라우터 생성.
///
/// 캔버스 API는 루트와 `/api` 아래에 모두 마운트됩니다.
pub fn create_router(state: Arc<AppState>) -> Router {
    let api_router = create_api_router(Duration::from_secs(
        state.config.server.request_timeout_secs,
    ));
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .nest("/health", health_router())
        .merge(api_router.clone())
        .nest("/api", api_router)
        .with_state(state)
        // 메트릭 미들웨어 (모든 요청에 적용)
        .layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// CORS 레이어 생성.
///
/// origin 목록이 비어 있으면 모든 origin을 허용합니다 (개발 모드).
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let allow_origin = if parsed.is_empty() {
        if !origins.is_empty() {
            warn!("CORS origins configured but none are valid, allowing any");
        }
        AllowOrigin::any()
    } else {
        info!("CORS configured with {} allowed origins", parsed.len());
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::CACHE_CONTROL])
        .max_age(Duration::from_secs(3600))
}
