//! 공유 픽셀 캔버스 HTTP 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Axum 기반 REST API (`/state`, `/place`)
//! - 페인트 이벤트 실시간 스트림 (Server-Sent Events, `/events`)
//! - 헬스 체크 엔드포인트
//! - Prometheus 메트릭
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트와 라우터 조합
//! - [`stream`]: SSE 구독 수명 주기
//! - [`error`]: 에러 응답 매핑
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`middleware`]: HTTP 미들웨어

pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod stream;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use metrics::setup_metrics_recorder;
pub use middleware::metrics_layer;
pub use routes::{create_api_router, create_router};
pub use state::AppState;
pub use stream::{events_handler, CloseReason, ConnectionState, Subscription};

#[cfg(any(test, feature = "test-utils"))]
pub use state::create_test_state;
