//! 연결 단위 구독 수명 주기.
//!
//! `Connecting → Open → Closed` 상태 머신입니다. 종료 트리거(클라이언트 연결 끊김,
//! 전송 실패, 최대 수명, 서버 종료)가 동시에 여러 개 발생해도 정리 작업은 정확히 한 번만
//! 실행됩니다.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use place_core::{Broadcaster, Frame, Subscriber, Unsubscribe};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::metrics::{
    decrement_stream_connections, increment_stream_connections, record_stream_closed,
};

/// 연결 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Connecting = 0,
    Open = 1,
    Closed = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            _ => ConnectionState::Closed,
        }
    }
}

/// 연결 종료 사유.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// 클라이언트가 연결을 끊음
    ClientDisconnected,
    /// 브로드캐스터가 전송 실패로 구독자를 제거함
    SendFailed,
    /// 최대 연결 수명 도달
    MaxLifetime,
    /// 서버 종료
    ServerShutdown,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::ClientDisconnected => "client_disconnected",
            CloseReason::SendFailed => "send_failed",
            CloseReason::MaxLifetime => "max_lifetime",
            CloseReason::ServerShutdown => "server_shutdown",
        }
    }
}

/// 이벤트 스트림 하나의 구독.
///
/// drop되면 `ClientDisconnected`로 닫힙니다 (이미 닫혔다면 아무 일도 하지 않음).
pub struct Subscription {
    id: Uuid,
    state: AtomicU8,
    handle: Option<Unsubscribe>,
    /// 이 연결 전용 취소 토큰 (서버 종료 토큰의 자식)
    cancel: CancellationToken,
    opened_at: Instant,
}

impl Subscription {
    /// `Connecting` 상태의 구독 생성.
    pub fn new(shutdown: &CancellationToken) -> Self {
        Self {
            id: Uuid::nil(),
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            handle: None,
            cancel: shutdown.child_token(),
            opened_at: Instant::now(),
        }
    }

    /// 브로드캐스터에 등록하고 `Open`으로 전환.
    ///
    /// 브로드캐스터가 구독자를 제거하면 연결 토큰이 취소됩니다.
    pub fn open(mut self, broadcaster: &Broadcaster, sink: mpsc::Sender<Frame>) -> Self {
        let cancel = self.cancel.clone();
        let subscriber = Subscriber::new(sink).with_close(move || cancel.cancel());
        let handle = broadcaster.register(subscriber);

        self.id = handle.id();
        self.opened_at = Instant::now();

        if handle.is_registered() {
            self.state.store(ConnectionState::Open as u8, Ordering::SeqCst);
            increment_stream_connections();
            self.handle = Some(handle);
        } else {
            self.state.store(ConnectionState::Closed as u8, Ordering::SeqCst);
            record_stream_closed(CloseReason::SendFailed.as_str());
        }

        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// 연결 전용 취소 토큰.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// `Closed`로 전환하고 정리 작업 실행.
    ///
    /// 처음 호출한 쪽만 `true`를 받고 정리 작업을 수행합니다.
    pub fn close(&self, reason: CloseReason) -> bool {
        let transitioned = self
            .state
            .compare_exchange(
                ConnectionState::Open as u8,
                ConnectionState::Closed as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();

        if !transitioned {
            return false;
        }

        if let Some(handle) = &self.handle {
            handle.unsubscribe();
        }
        self.cancel.cancel();

        decrement_stream_connections();
        record_stream_closed(reason.as_str());
        info!(
            subscriber_id = %self.id,
            reason = reason.as_str(),
            duration_secs = self.opened_at.elapsed().as_secs(),
            "Event stream closed"
        );

        true
    }

    /// 취소 토큰이 발동된 원인 추정.
    pub fn cancel_reason(&self, shutdown: &CancellationToken) -> CloseReason {
        if shutdown.is_cancelled() {
            CloseReason::ServerShutdown
        } else {
            CloseReason::SendFailed
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close(CloseReason::ClientDisconnected);
    }
}
