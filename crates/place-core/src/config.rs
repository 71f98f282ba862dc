//! 설정 관리.
//!
//! 기본값 → 설정 파일(선택) → `PLACE__` 접두사 환경 변수 순으로 덮어씁니다.
//!
//! ```text
//! PLACE__SERVER__PORT=8080
//! PLACE__LIMITER__CAPACITY=20
//! PLACE__STREAM__PING_INTERVAL_SECS=10
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 그리드 크기
    #[serde(default)]
    pub grid: GridConfig,
    /// 페인트 rate limit 설정
    #[serde(default)]
    pub limiter: LimiterConfig,
    /// 이벤트 스트림 설정
    #[serde(default)]
    pub stream: StreamConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 스트리밍이 아닌 요청의 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// 허용할 CORS origin 목록 (비어 있으면 모두 허용)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout_secs: 30,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// `host:port` 문자열.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 그리드 크기 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GridConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 256,
        }
    }
}

/// Token bucket 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimiterConfig {
    /// 버킷 용량 (최대 토큰 수)
    pub capacity: u32,
    /// 토큰 하나가 리필되는 간격 (밀리초)
    pub refill_interval_ms: u64,
    /// identity 없는 요청이 공유하는 식별자
    pub anonymous_identity: String,
    /// 가득 찬 버킷 정리 간격 (초, 0이면 비활성화)
    pub prune_interval_secs: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            refill_interval_ms: 6_000,
            anonymous_identity: "anon".to_string(),
            prune_interval_secs: 60,
        }
    }
}

/// SSE 스트림 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// liveness ping 간격 (초)
    pub ping_interval_secs: u64,
    /// 연결 최대 유지 시간 (초)
    pub max_lifetime_secs: u64,
    /// 구독자별 전송 버퍼 크기 (프레임 수)
    pub subscriber_buffer: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: 15,
            max_lifetime_secs: 60 * 60,
            subscriber_buffer: 64,
        }
    }
}

impl StreamConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨 필터
    pub level: String,
    /// 출력 형식 ("pretty" | "json" | "compact")
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "place_api=info,place_core=info,tower_http=info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없으면 기본값과 환경 변수만 사용합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // 파일에서 로드 (없어도 됨)
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("PLACE")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load("config/default.toml")
    }

    /// 0이 될 수 없는 값 검증.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let checks = [
            (self.grid.width == 0, "grid.width"),
            (self.grid.height == 0, "grid.height"),
            (self.limiter.capacity == 0, "limiter.capacity"),
            (self.limiter.refill_interval_ms == 0, "limiter.refill_interval_ms"),
            (self.stream.subscriber_buffer == 0, "stream.subscriber_buffer"),
            (self.stream.ping_interval_secs == 0, "stream.ping_interval_secs"),
            (self.stream.max_lifetime_secs == 0, "stream.max_lifetime_secs"),
        ];

        match checks.iter().find(|(invalid, _)| *invalid) {
            Some((_, key)) => Err(config::ConfigError::Message(format!(
                "{}는 0보다 커야 합니다",
                key
            ))),
            None => Ok(()),
        }
    }
}
