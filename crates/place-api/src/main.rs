//! 픽셀 캔버스 API 서버.
//!
//! 설정 로드, 로깅과 메트릭 초기화, 버킷 정리 태스크 시작 후 HTTP 서버를 실행합니다.

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use place_api::metrics::setup_metrics_recorder;
use place_api::routes::create_router;
use place_api::state::AppState;
use place_core::{init_logging, AppConfig, LogConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (없어도 됨)
    dotenvy::dotenv().ok();

    let config = AppConfig::load_default()?;

    init_logging(LogConfig::from_config(&config.logging))
        .map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    info!("Starting place API server...");

    // Prometheus 메트릭 레코더 설정
    let metrics_handle = setup_metrics_recorder()?;
    info!("Prometheus metrics recorder initialized");

    let addr = config.server.bind_address();

    let state = Arc::new(AppState::new(config));
    info!(
        version = %state.version,
        grid_width = state.grid.width(),
        grid_height = state.grid.height(),
        capacity = state.limiter.capacity(),
        "Application state initialized"
    );

    // 가득 찬 버킷 주기적 정리
    let prune_task = state.start_bucket_pruner();

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle)
        .merge(create_router(state.clone()));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "API server listening");
    info!("Metrics available at http://{}/metrics", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.shutdown.clone()))
        .await?;

    info!("Server shutdown initiated, cleaning up...");

    // 남은 구독자 정리 (스트림은 종료 토큰으로 이미 닫히는 중)
    state.shutdown.cancel();
    let closed = state.broadcaster.close_all();
    if closed > 0 {
        info!(closed, "Remaining subscribers closed");
    }

    if let Some(prune_task) = prune_task {
        if tokio::time::timeout(Duration::from_secs(5), prune_task)
            .await
            .is_err()
        {
            warn!("Cleanup timeout, forcing shutdown");
        }
    }

    info!("Server stopped gracefully");

    Ok(())
}

/// /metrics 엔드포인트 핸들러.
async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> String {
    handle.render()
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 종료 토큰을 취소합니다.
/// 열린 이벤트 스트림은 이 토큰의 자식 토큰으로 닫힙니다.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    // 열린 스트림과 백그라운드 태스크에 종료 시그널 전파
    shutdown_token.cancel();
    info!("Shutdown signal propagated to open streams");
}
