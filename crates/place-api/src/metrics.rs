//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! HTTP 요청 메트릭과 스트림 연결 메트릭을 수집하고 `/metrics` 엔드포인트로 노출합니다.
//! 도메인 메트릭(`place_paints_total` 등)은 place-core에서 기록됩니다.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Prometheus 메트릭 레코더를 설정하고 핸들을 반환합니다.
///
/// 레코더가 이미 설치되어 있으면 에러를 반환합니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
        )?
        .install_recorder()
}

// ============================================================================
// HTTP 메트릭
// ============================================================================

/// HTTP 응답 카운터와 처리 시간 기록.
pub fn record_http_response(method: &str, path: &str, status: u16, duration_secs: f64) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

// ============================================================================
// 스트림 연결 메트릭
// ============================================================================

/// 열린 이벤트 스트림 수 증가.
pub fn increment_stream_connections() {
    gauge!("place_stream_connections_active").increment(1.0);
}

/// 열린 이벤트 스트림 수 감소.
pub fn decrement_stream_connections() {
    gauge!("place_stream_connections_active").decrement(1.0);
}

/// 스트림 종료 사유 카운터.
pub fn record_stream_closed(reason: &'static str) {
    counter!("place_stream_closed_total", "reason" => reason).increment(1);
}

/// 라벨 카디널리티를 제한하기 위해 알려진 경로만 그대로 사용합니다.
pub fn normalize_path(path: &str) -> &'static str {
    let path = path.strip_prefix("/api").unwrap_or(path);
    match path {
        "/state" => "/state",
        "/place" => "/place",
        "/events" => "/events",
        "/health" => "/health",
        "/metrics" => "/metrics",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/state"), "/state");
        assert_eq!(normalize_path("/api/place"), "/place");
        assert_eq!(normalize_path("/api/events"), "/events");
        assert_eq!(normalize_path("/favicon.ico"), "other");
    }
}
