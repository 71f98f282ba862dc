//! # Place Core
//!
//! 공유 픽셀 캔버스의 핵심 상태와 실시간 배포 계층을 제공합니다.
//!
//! - [`limiter`]: identity별 Token Bucket rate limiter
//! - [`grid`]: 권한 있는 sparse 그리드 저장소
//! - [`broadcast`]: 구독자 레지스트리와 best-effort 이벤트 브로드캐스트
//! - [`service`]: 페인트 요청 처리와 스냅샷 조회
//! - [`config`], [`logging`], [`error`]: 설정, 로깅, 에러 타입
//!
//! 모든 상태는 프로세스 메모리에만 존재하며 재시작 시 사라집니다.

pub mod broadcast;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod grid;
pub mod limiter;
pub mod logging;
pub mod service;

pub use broadcast::{Broadcaster, EventSink, Frame, PublishReport, SinkError, Subscriber, Unsubscribe};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::AppConfig;
pub use domain::*;
pub use error::{PlaceError, PlaceResult};
pub use grid::GridStore;
pub use limiter::RateLimiter;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use service::{PaintReceipt, PaintRequest, PaintService, SnapshotService};
