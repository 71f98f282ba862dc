//! 구독자 레지스트리와 이벤트 브로드캐스트.
//!
//! 발행된 메시지는 한 번만 직렬화되어 등록된 모든 구독자에게 전달됩니다.
//! 전송은 best-effort입니다:
//!
//! - 전송은 non-blocking (`try_send`)이므로 느린 구독자가 다른 구독자를 막지 않습니다.
//! - 전송에 실패한 구독자는 즉시 레지스트리에서 제거되고 close 콜백이 호출됩니다.
//! - 실패는 발행자에게 전파되지 않습니다.

use std::sync::Arc;

use dashmap::DashMap;
use metrics::{counter, gauge};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::StreamMessage;

/// 구독자에게 전달되는 프레임.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// 연결 확인 (등록 직후 한 번)
    Hello,
    /// 직렬화된 이벤트 JSON
    Message(Arc<str>),
}

/// 구독자 전송 에러.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("구독자 버퍼가 가득 찼습니다")]
    Full,
    #[error("구독자 연결이 닫혔습니다")]
    Closed,
}

/// 프레임을 받는 전송 채널.
pub trait EventSink: Send + Sync + 'static {
    /// 블로킹 없이 프레임 전송.
    fn try_send(&self, frame: Frame) -> Result<(), SinkError>;
}

impl EventSink for mpsc::Sender<Frame> {
    fn try_send(&self, frame: Frame) -> Result<(), SinkError> {
        mpsc::Sender::try_send(self, frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}

type CloseFn = Box<dyn FnOnce() + Send + Sync>;

/// 등록된 구독자 하나.
pub struct Subscriber {
    id: Uuid,
    sink: Box<dyn EventSink>,
    on_close: Option<CloseFn>,
}

impl Subscriber {
    pub fn new(sink: impl EventSink) -> Self {
        Self {
            id: Uuid::new_v4(),
            sink: Box::new(sink),
            on_close: None,
        }
    }

    /// 레지스트리에서 제거될 때 한 번 호출되는 콜백 설정.
    pub fn with_close(mut self, on_close: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.on_close = Some(Box::new(on_close));
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn close(mut self) {
        if let Some(on_close) = self.on_close.take() {
            on_close();
        }
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("has_close", &self.on_close.is_some())
            .finish()
    }
}

/// 발행 결과.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// 전달 성공한 구독자 수
    pub delivered: usize,
    /// 전송 실패로 제거된 구독자 수
    pub dropped: usize,
}

/// 이벤트 브로드캐스터.
///
/// 복제하면 같은 레지스트리를 공유합니다.
#[derive(Clone, Default)]
pub struct Broadcaster {
    subscribers: Arc<DashMap<Uuid, Subscriber>>,
    send_hello: bool,
}

impl Broadcaster {
    /// 새 브로드캐스터 생성.
    ///
    /// `send_hello`가 `true`면 등록 시 `Frame::Hello`를 먼저 보냅니다.
    pub fn new(send_hello: bool) -> Self {
        Self {
            subscribers: Arc::new(DashMap::new()),
            send_hello,
        }
    }

    /// 구독자 등록.
    ///
    /// hello 전송이 실패하면 등록하지 않고 close 콜백을 호출합니다.
    /// 반환된 핸들로 등록을 해제할 수 있습니다.
    pub fn register(&self, subscriber: Subscriber) -> Unsubscribe {
        let id = subscriber.id;

        if self.send_hello {
            if let Err(e) = subscriber.sink.try_send(Frame::Hello) {
                warn!(subscriber_id = %id, error = %e, "Hello frame failed, subscriber not registered");
                subscriber.close();
                return Unsubscribe {
                    id,
                    subscribers: self.subscribers.clone(),
                };
            }
        }

        self.subscribers.insert(id, subscriber);
        gauge!("place_subscribers_active").set(self.subscribers.len() as f64);
        info!(subscriber_id = %id, total = self.subscribers.len(), "Subscriber registered");

        Unsubscribe {
            id,
            subscribers: self.subscribers.clone(),
        }
    }

    /// 메시지를 모든 구독자에게 발행.
    pub fn publish(&self, message: &StreamMessage) -> PublishReport {
        let payload: Arc<str> = match message.to_json() {
            Ok(json) => json.into(),
            Err(e) => {
                warn!(error = %e, "Failed to serialize stream message");
                return PublishReport::default();
            }
        };

        self.publish_frame(Frame::Message(payload))
    }

    fn publish_frame(&self, frame: Frame) -> PublishReport {
        let mut report = PublishReport::default();
        let mut failed = Vec::new();

        for entry in self.subscribers.iter() {
            match entry.value().sink.try_send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => failed.push((*entry.key(), e)),
            }
        }

        // 순회가 끝난 뒤 제거 (DashMap shard 락 재진입 방지)
        for (id, error) in failed {
            if let Some((_, subscriber)) = self.subscribers.remove(&id) {
                debug!(subscriber_id = %id, error = %error, "Dropping subscriber after send failure");
                counter!("place_subscribers_dropped_total", "reason" => reason_label(error))
                    .increment(1);
                subscriber.close();
                report.dropped += 1;
            }
        }

        if report.dropped > 0 {
            gauge!("place_subscribers_active").set(self.subscribers.len() as f64);
        }

        report
    }

    /// 구독자 등록 해제. 이미 제거된 경우 아무 일도 하지 않습니다.
    pub fn unregister(&self, id: Uuid) -> bool {
        remove_subscriber(&self.subscribers, id)
    }

    /// 연결된 구독자 수.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// 모든 구독자 제거 (서버 종료 시).
    pub fn close_all(&self) -> usize {
        let ids: Vec<Uuid> = self.subscribers.iter().map(|entry| *entry.key()).collect();
        ids.into_iter()
            .filter(|id| remove_subscriber(&self.subscribers, *id))
            .count()
    }
}

fn reason_label(error: SinkError) -> &'static str {
    match error {
        SinkError::Full => "full",
        SinkError::Closed => "closed",
    }
}

fn remove_subscriber(subscribers: &DashMap<Uuid, Subscriber>, id: Uuid) -> bool {
    match subscribers.remove(&id) {
        Some((_, subscriber)) => {
            subscriber.close();
            gauge!("place_subscribers_active").set(subscribers.len() as f64);
            info!(subscriber_id = %id, total = subscribers.len(), "Subscriber unregistered");
            true
        }
        None => false,
    }
}

/// 등록 해제 핸들.
///
/// `unsubscribe`는 여러 번 호출해도 안전합니다.
#[derive(Clone)]
pub struct Unsubscribe {
    id: Uuid,
    subscribers: Arc<DashMap<Uuid, Subscriber>>,
}

impl Unsubscribe {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 등록 해제. 이번 호출이 실제로 제거했으면 `true`.
    pub fn unsubscribe(&self) -> bool {
        remove_subscriber(&self.subscribers, self.id)
    }

    /// 아직 레지스트리에 있는지 확인.
    pub fn is_registered(&self) -> bool {
        self.subscribers.contains_key(&self.id)
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe").field("id", &self.id).finish()
    }
}
