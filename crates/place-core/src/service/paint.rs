//! 페인트 요청 처리.
//!
//! 검증 → identity 정규화 → 토큰 확인 → 토큰 소비 → 그리드 쓰기 순서로 진행하며
//! 각 단계의 실패는 서로 다른 에러로 반환됩니다.

use std::time::Duration;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{HexColor, Identity, PaintEvent};
use crate::error::{PlaceError, PlaceResult};
use crate::grid::GridStore;
use crate::limiter::RateLimiter;

/// 페인트 요청.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaintRequest {
    pub x: i64,
    pub y: i64,
    pub color: String,
    /// 자기 신고 identity (구버전 클라이언트는 `userId`)
    #[serde(default, alias = "userId")]
    pub identity: Option<String>,
}

/// 페인트 성공 결과.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaintReceipt {
    /// 소비 후 남은 토큰 수
    pub tokens_left: u32,
    /// 브로드캐스트된 이벤트
    #[serde(skip)]
    pub event: Option<PaintEvent>,
}

/// 페인트 서비스.
#[derive(Clone)]
pub struct PaintService {
    limiter: RateLimiter,
    grid: GridStore,
    anonymous_identity: String,
}

impl PaintService {
    pub fn new(limiter: RateLimiter, grid: GridStore, anonymous_identity: impl Into<String>) -> Self {
        Self {
            limiter,
            grid,
            anonymous_identity: anonymous_identity.into(),
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn grid(&self) -> &GridStore {
        &self.grid
    }

    /// 페인트 요청 처리.
    pub async fn submit_paint(&self, request: PaintRequest) -> PlaceResult<PaintReceipt> {
        let result = self.process(request).await;

        match &result {
            Ok(_) => counter!("place_paints_total").increment(1),
            Err(e) => {
                counter!("place_paint_rejections_total", "reason" => e.code()).increment(1)
            }
        }

        result
    }

    async fn process(&self, request: PaintRequest) -> PlaceResult<PaintReceipt> {
        // 1. 색상 문법
        let color: HexColor = request.color.parse()?;

        // 2. identity 정규화
        let identity = Identity::resolve(request.identity.as_deref(), &self.anonymous_identity);

        // 3. 토큰 확인
        if !self.limiter.check_allowed(identity.as_str()).await {
            let retry_after_secs = self.retry_after_secs(&identity).await;
            warn!(identity = %identity, retry_after_secs, "Paint rejected: cooldown active");
            return Err(PlaceError::CooldownActive { retry_after_secs });
        }

        // 4. 토큰 소비 (확인 이후 다른 요청이 소비했을 수 있음)
        if !self.limiter.consume(identity.as_str()).await {
            let retry_after_secs = self.retry_after_secs(&identity).await;
            warn!(identity = %identity, retry_after_secs, "Paint rejected: no tokens left");
            return Err(PlaceError::NoTokens { retry_after_secs });
        }

        // 5. 그리드 쓰기 + 브로드캐스트
        let (event, _) = self
            .grid
            .paint(request.x, request.y, color, Some(&identity))
            .await?;

        // 6. 남은 토큰
        let tokens_left = self.limiter.tokens_remaining(identity.as_str()).await;
        debug!(identity = %identity, x = event.x, y = event.y, tokens_left, "Paint accepted");

        Ok(PaintReceipt {
            tokens_left,
            event: Some(event),
        })
    }

    async fn retry_after_secs(&self, identity: &Identity) -> u64 {
        let wait = self.limiter.retry_after(identity.as_str()).await;
        ceil_secs(wait).max(1)
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let millis = duration.as_millis() as u64;
    millis.div_ceil(1_000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{Broadcaster, Frame, Subscriber};
    use crate::clock::ManualClock;
    use crate::config::LimiterConfig;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn service() -> (PaintService, Broadcaster, Arc<ManualClock>) {
        let clock = ManualClock::new(10_000);
        let broadcaster = Broadcaster::new(false);
        let limiter = RateLimiter::new(&LimiterConfig::default(), clock.clone());
        let grid = GridStore::new(512, 256, broadcaster.clone(), clock.clone());
        (PaintService::new(limiter, grid, "anon"), broadcaster, clock)
    }

    fn request(x: i64, y: i64, color: &str, identity: Option<&str>) -> PaintRequest {
        PaintRequest {
            x,
            y,
            color: color.to_string(),
            identity: identity.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_first_paint_returns_nine_tokens() {
        let (service, _, _) = service();

        let receipt = service
            .submit_paint(request(10, 20, "#ff0000", Some("u1")))
            .await
            .unwrap();
        assert_eq!(receipt.tokens_left, 9);

        let snapshot = service.grid().snapshot().await;
        assert_eq!(snapshot.color_at(10, 20).map(|c| c.as_str()), Some("#ff0000"));
    }

    #[tokio::test]
    async fn test_eleventh_paint_hits_cooldown() {
        let (service, _, _) = service();

        for i in 0..10 {
            let receipt = service
                .submit_paint(request(i, 0, "#ff0000", Some("u1")))
                .await
                .unwrap();
            assert_eq!(receipt.tokens_left, 9 - i as u32);
        }

        let err = service
            .submit_paint(request(10, 0, "#ff0000", Some("u1")))
            .await
            .unwrap_err();
        assert_eq!(err, PlaceError::CooldownActive { retry_after_secs: 6 });
        assert_eq!(service.grid().painted_count().await, 10);
    }

    #[tokio::test]
    async fn test_cooldown_clears_after_refill() {
        let (service, _, clock) = service();
        for i in 0..10 {
            service.submit_paint(request(i, 0, "#000", None)).await.unwrap();
        }
        assert!(service.submit_paint(request(0, 1, "#000", None)).await.is_err());

        clock.advance(6_000);
        let receipt = service.submit_paint(request(0, 1, "#000", None)).await.unwrap();
        assert_eq!(receipt.tokens_left, 0);
    }

    #[tokio::test]
    async fn test_invalid_color_consumes_nothing() {
        let (service, _, _) = service();

        let err = service
            .submit_paint(request(1, 1, "red", Some("u1")))
            .await
            .unwrap_err();
        assert!(matches!(err, PlaceError::InvalidInput(_)));
        assert_eq!(service.limiter().tokens_remaining("u1").await, 10);
    }

    #[tokio::test]
    async fn test_anonymous_callers_share_bucket() {
        let (service, _, _) = service();

        service.submit_paint(request(0, 0, "#000", None)).await.unwrap();
        let receipt = service
            .submit_paint(request(0, 0, "#000", Some("")))
            .await
            .unwrap();
        assert_eq!(receipt.tokens_left, 8);
        assert_eq!(service.limiter().tokens_remaining("anon").await, 8);
    }

    #[tokio::test]
    async fn test_out_of_bounds_after_consume() {
        let (service, _, _) = service();

        let err = service
            .submit_paint(request(-1, 0, "#000", Some("u1")))
            .await
            .unwrap_err();
        assert!(matches!(err, PlaceError::OutOfBounds { .. }));
        assert_eq!(service.grid().painted_count().await, 0);
    }

    #[tokio::test]
    async fn test_event_carries_resolved_identity() {
        let (service, broadcaster, _) = service();
        let (tx, mut rx) = mpsc::channel(4);
        broadcaster.register(Subscriber::new(tx));

        let receipt = service.submit_paint(request(4, 4, "#0f0", None)).await.unwrap();
        assert_eq!(receipt.event.unwrap().identity.as_deref(), Some("anon"));

        let Some(Frame::Message(json)) = rx.recv().await else {
            panic!("expected paint frame");
        };
        assert!(json.contains(r#""identity":"anon""#));
    }

    #[test]
    fn test_request_accepts_legacy_user_id() {
        let req: PaintRequest =
            serde_json::from_str(r##"{"x":1,"y":2,"color":"#fff","userId":"u9"}"##).unwrap();
        assert_eq!(req.identity.as_deref(), Some("u9"));

        let req: PaintRequest =
            serde_json::from_str(r##"{"x":1,"y":2,"color":"#fff"}"##).unwrap();
        assert!(req.identity.is_none());

        assert!(serde_json::from_str::<PaintRequest>(r##"{"x":1.5,"y":2,"color":"#fff"}"##).is_err());
    }

    #[test]
    fn test_ceil_secs() {
        assert_eq!(ceil_secs(Duration::from_millis(6_000)), 6);
        assert_eq!(ceil_secs(Duration::from_millis(4_001)), 5);
        assert_eq!(ceil_secs(Duration::ZERO), 0);
    }
}
