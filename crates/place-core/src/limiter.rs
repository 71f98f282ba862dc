//! 페인트 rate limiter.
//!
//! identity별 Token Bucket으로 페인트 처리량을 제한합니다.
//!
//! - 첫 요청 시 버킷은 가득 찬 상태로 생성됩니다.
//! - 리필은 lazy하게 계산됩니다: 경과 시간을 리필 간격으로 정수 나눗셈한 만큼
//!   토큰을 더하고(용량 상한), `last_refill`은 "현재 시각"이 아니라 정확히 그
//!   간격 수만큼만 전진합니다. 소수점 진행분이 유실되지 않습니다.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::clock::{SharedClock, SystemClock};
use crate::config::LimiterConfig;

/// Token Bucket 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TokenBucket {
    /// 현재 토큰 수 (0..=capacity)
    tokens: u32,
    /// 마지막 리필 기준 시각 (밀리초)
    last_refill: u64,
}

impl TokenBucket {
    fn full(capacity: u32, now: u64) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    /// 경과한 리필 간격만큼 토큰 추가.
    fn refill(&mut self, now: u64, capacity: u32, interval_ms: u64) {
        let elapsed = now.saturating_sub(self.last_refill);
        let intervals = elapsed / interval_ms;
        if intervals > 0 {
            let added = intervals.min(u64::from(capacity)) as u32;
            self.tokens = self.tokens.saturating_add(added).min(capacity);
            self.last_refill += intervals * interval_ms;
        }
    }

    /// 다음 토큰까지 남은 시간 (밀리초). 토큰이 있으면 0.
    fn millis_until_next_token(&self, now: u64, interval_ms: u64) -> u64 {
        if self.tokens > 0 {
            0
        } else {
            let elapsed = now.saturating_sub(self.last_refill);
            interval_ms.saturating_sub(elapsed).max(1)
        }
    }
}

/// identity별 페인트 Rate Limiter.
#[derive(Clone)]
pub struct RateLimiter {
    capacity: u32,
    refill_interval_ms: u64,
    clock: SharedClock,
    buckets: Arc<RwLock<HashMap<String, TokenBucket>>>,
}

impl RateLimiter {
    /// 새 Rate Limiter 생성.
    pub fn new(config: &LimiterConfig, clock: SharedClock) -> Self {
        Self {
            capacity: config.capacity.max(1),
            refill_interval_ms: config.refill_interval_ms.max(1),
            clock,
            buckets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 기본 설정과 시스템 시계로 생성.
    pub fn with_defaults() -> Self {
        Self::new(&LimiterConfig::default(), Arc::new(SystemClock))
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// 버킷 조회 또는 생성 후 리필까지 적용한 상태에서 `f`를 실행.
    ///
    /// 쓰기 락 안에서 수행되므로 같은 identity에 대한 동시 호출은 직렬화됩니다.
    async fn with_bucket<T>(&self, identity: &str, f: impl FnOnce(&mut TokenBucket) -> T) -> T {
        let now = self.clock.now_millis();
        let mut buckets = self.buckets.write().await;

        let bucket = buckets
            .entry(identity.to_string())
            .or_insert_with(|| TokenBucket::full(self.capacity, now));
        bucket.refill(now, self.capacity, self.refill_interval_ms);

        f(bucket)
    }

    /// 토큰이 남아 있는지 확인 (소비하지 않음).
    pub async fn check_allowed(&self, identity: &str) -> bool {
        self.with_bucket(identity, |bucket| bucket.tokens > 0).await
    }

    /// 토큰 하나 소비 시도.
    ///
    /// 성공하면 `true`, 토큰이 없으면 `false`.
    pub async fn consume(&self, identity: &str) -> bool {
        self.with_bucket(identity, |bucket| {
            if bucket.tokens > 0 {
                bucket.tokens -= 1;
                true
            } else {
                false
            }
        })
        .await
    }

    /// 남은 토큰 수.
    pub async fn tokens_remaining(&self, identity: &str) -> u32 {
        self.with_bucket(identity, |bucket| bucket.tokens).await
    }

    /// 다음 토큰까지 대기 시간. 토큰이 있으면 0.
    pub async fn retry_after(&self, identity: &str) -> Duration {
        let now = self.clock.now_millis();
        let interval = self.refill_interval_ms;
        let millis = self
            .with_bucket(identity, move |bucket| bucket.millis_until_next_token(now, interval))
            .await;
        Duration::from_millis(millis)
    }

    /// 가득 찬 버킷 정리.
    ///
    /// 가득 찬 버킷은 다시 생성해도 동일한 상태이므로 제거해도 동작이 달라지지 않습니다.
    pub async fn prune_full_buckets(&self) -> usize {
        let now = self.clock.now_millis();
        let mut buckets = self.buckets.write().await;
        let before = buckets.len();

        buckets.retain(|_, bucket| {
            bucket.refill(now, self.capacity, self.refill_interval_ms);
            bucket.tokens < self.capacity
        });

        before - buckets.len()
    }

    /// 현재 추적 중인 identity 수.
    pub async fn tracked_identities(&self) -> usize {
        self.buckets.read().await.len()
    }
}
