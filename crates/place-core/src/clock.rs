//! 시간 소스 추상화.
//!
//! Rate limiter 리필 계산과 이벤트 타임스탬프에 사용됩니다.
//! 테스트에서는 `ManualClock`으로 시간을 직접 진행시킵니다.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 밀리초 단위 Unix 시간을 제공하는 시계.
pub trait Clock: Send + Sync + 'static {
    /// 현재 시각 (Unix epoch 기준 밀리초).
    fn now_millis(&self) -> u64;
}

/// 시스템 시계.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

/// 수동으로 진행되는 시계 (테스트용).
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicU64::new(start_millis),
        })
    }

    /// 시각을 `millis`만큼 진행.
    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// 공유 가능한 시계 타입.
pub type SharedClock = Arc<dyn Clock>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_millis(), 1_000);

        clock.advance(6_000);
        assert_eq!(clock.now_millis(), 7_000);
    }
}
