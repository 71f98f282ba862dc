//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 프로세스 시작 시 한 번 생성되며 Arc로 래핑되어 요청 간에 공유됩니다.
//! 그리드, 버킷, 구독자 레지스트리는 각각 하나의 소유 컴포넌트를 통해서만 접근합니다.

use std::sync::Arc;
use std::time::Duration;

use place_core::{
    AppConfig, Broadcaster, GridStore, PaintService, RateLimiter, SharedClock, SnapshotService,
    SystemClock,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 로드된 설정
    pub config: AppConfig,

    /// 구독자 레지스트리 - 페인트 이벤트 브로드캐스트
    pub broadcaster: Broadcaster,

    /// 권한 있는 그리드 저장소
    pub grid: GridStore,

    /// identity별 페인트 rate limiter
    pub limiter: RateLimiter,

    /// 페인트 요청 처리
    pub paint: PaintService,

    /// 그리드 스냅샷 조회
    pub snapshot: SnapshotService,

    /// 서버 종료 토큰 (열린 이벤트 스트림과 백그라운드 태스크에 전파)
    pub shutdown: CancellationToken,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 시스템 시계로 AppState 생성.
    pub fn new(config: AppConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// 주어진 시계로 AppState 생성.
    pub fn with_clock(config: AppConfig, clock: SharedClock) -> Self {
        let broadcaster = Broadcaster::new(true);
        let grid = GridStore::new(
            config.grid.width,
            config.grid.height,
            broadcaster.clone(),
            clock.clone(),
        );
        let limiter = RateLimiter::new(&config.limiter, clock);
        let paint = PaintService::new(
            limiter.clone(),
            grid.clone(),
            config.limiter.anonymous_identity.clone(),
        );
        let snapshot = SnapshotService::new(grid.clone());

        Self {
            config,
            broadcaster,
            grid,
            limiter,
            paint,
            snapshot,
            shutdown: CancellationToken::new(),
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 서버 업타임 (초).
    pub fn uptime_secs(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }

    /// 가득 찬 버킷 정리 태스크 시작.
    ///
    /// `limiter.prune_interval_secs`가 0이면 시작하지 않고 `None`을 반환합니다.
    /// 태스크는 종료 토큰이 취소되면 끝납니다.
    pub fn start_bucket_pruner(&self) -> Option<JoinHandle<()>> {
        let secs = self.config.limiter.prune_interval_secs;
        if secs == 0 {
            info!("Bucket pruning disabled");
            return None;
        }

        Some(tokio::spawn(prune_buckets(
            self.limiter.clone(),
            Duration::from_secs(secs),
            self.shutdown.clone(),
        )))
    }
}

/// 종료 토큰이 취소될 때까지 주기적으로 가득 찬 버킷 제거.
async fn prune_buckets(limiter: RateLimiter, every: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let removed = limiter.prune_full_buckets().await;
                if removed > 0 {
                    let remaining = limiter.tracked_identities().await;
                    debug!(removed, remaining, "Pruned full buckets");
                }
            }
        }
    }
}

/// 테스트용 AppState 생성.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> AppState {
    AppState::new(AppConfig::default())
}
