//! 캔버스 시스템의 에러 타입.
//!
//! 페인트 요청 처리 중 발생하는 모든 실패를 하나의 enum으로 표현합니다.
//! HTTP 계층은 이 타입을 상태 코드로 변환하며, 브로드캐스트 실패는
//! 이 타입으로 표현되지 않습니다 (구독자 제거로만 처리됨).

use thiserror::Error;

/// 핵심 캔버스 에러.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaceError {
    /// 잘못된 좌표 또는 색상 형식
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 토큰이 없어 쿨다운 중
    #[error("쿨다운 중입니다. {retry_after_secs}초 후 다시 시도하세요")]
    CooldownActive {
        /// 다음 토큰까지 남은 시간 (초)
        retry_after_secs: u64,
    },

    /// 확인과 소비 사이에 다른 요청이 마지막 토큰을 사용함
    #[error("사용 가능한 토큰이 없습니다")]
    NoTokens {
        /// 다음 토큰까지 남은 시간 (초)
        retry_after_secs: u64,
    },

    /// 그리드 범위를 벗어난 좌표
    #[error("좌표 ({x}, {y})가 그리드 범위 {width}x{height}를 벗어났습니다")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },

    /// 예상치 못한 내부 에러
    #[error("내부 에러: {0}")]
    Unexpected(String),
}

/// 캔버스 작업을 위한 Result 타입.
pub type PlaceResult<T> = Result<T, PlaceError>;

impl PlaceError {
    /// 재시도 가능한 에러인지 확인합니다.
    ///
    /// Rate limit 계열은 대기 후 재시도, 내부 에러는 나중에 재시도할 수 있습니다.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlaceError::CooldownActive { .. } | PlaceError::NoTokens { .. } | PlaceError::Unexpected(_)
        )
    }

    /// Rate limit 에러인 경우 재시도 대기 시간(초)을 반환합니다.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            PlaceError::CooldownActive { retry_after_secs }
            | PlaceError::NoTokens { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// 외부에 노출되는 고정 에러 코드.
    pub fn code(&self) -> &'static str {
        match self {
            PlaceError::InvalidInput(_) => "INVALID_INPUT",
            PlaceError::CooldownActive { .. } => "COOLDOWN_ACTIVE",
            PlaceError::NoTokens { .. } => "NO_TOKENS",
            PlaceError::OutOfBounds { .. } => "OUT_OF_BOUNDS",
            PlaceError::Unexpected(_) => "UNEXPECTED",
        }
    }
}

impl From<serde_json::Error> for PlaceError {
    fn from(err: serde_json::Error) -> Self {
        PlaceError::Unexpected(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        assert!(PlaceError::CooldownActive { retry_after_secs: 5 }.is_retryable());
        assert!(PlaceError::NoTokens { retry_after_secs: 1 }.is_retryable());
        assert!(!PlaceError::InvalidInput("color".to_string()).is_retryable());

        let oob = PlaceError::OutOfBounds { x: -1, y: 0, width: 512, height: 256 };
        assert!(!oob.is_retryable());
    }

    #[test]
    fn test_retry_after() {
        assert_eq!(
            PlaceError::CooldownActive { retry_after_secs: 4 }.retry_after_secs(),
            Some(4)
        );
        assert_eq!(PlaceError::Unexpected("x".into()).retry_after_secs(), None);
    }

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = [
            PlaceError::InvalidInput(String::new()),
            PlaceError::CooldownActive { retry_after_secs: 1 },
            PlaceError::NoTokens { retry_after_secs: 1 },
            PlaceError::OutOfBounds { x: 0, y: 0, width: 1, height: 1 },
            PlaceError::Unexpected(String::new()),
        ];
        let codes: std::collections::HashSet<_> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), errors.len());
    }
}
