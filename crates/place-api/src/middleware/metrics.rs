//! HTTP 요청 metrics middleware.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{normalize_path, record_http_response};

/// HTTP 메트릭을 수집하는 미들웨어 레이어.
///
/// - `http_responses_total`: 총 응답 수 (method, path, status 라벨)
/// - `http_request_duration_seconds`: 응답 헤더까지의 처리 시간
///
/// 이벤트 스트림은 응답 헤더가 나간 시점까지만 측정됩니다.
pub async fn metrics_layer(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    record_http_response(
        &method,
        path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}
