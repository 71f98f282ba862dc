//! Server-Sent Events 엔드포인트.
//!
//! `GET /events`
//!
//! ```text
//! event: hello
//! data: "ok"
//!
//! data: {"type":"paint","x":10,"y":20,"color":"#ff0000","identity":"u1","timestamp":1700000000000}
//!
//! : ping
//! ```

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures::{stream, Stream};
use place_core::Frame;
use tokio::sync::mpsc;
use tokio::time::Sleep;
use tokio_util::sync::CancellationToken;

use super::subscription::{CloseReason, Subscription};
use crate::state::AppState;

/// 프록시 버퍼링 비활성화 헤더 (nginx).
const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// 스트림 루프 상태.
struct StreamState {
    rx: mpsc::Receiver<Frame>,
    subscription: Subscription,
    deadline: Pin<Box<Sleep>>,
    cancel: CancellationToken,
    shutdown: CancellationToken,
}

/// 프레임을 SSE 이벤트로 변환.
fn to_event(frame: Frame) -> Event {
    match frame {
        Frame::Hello => Event::default().event("hello").data("\"ok\""),
        Frame::Message(json) => Event::default().data(&*json),
    }
}

/// 구독을 열고 이벤트 스트림 생성.
///
/// 스트림은 클라이언트 연결 끊김(drop), 전송 실패, 최대 수명, 서버 종료 중 먼저 발생하는
/// 조건에서 끝나며 정리 작업은 `Subscription`이 한 번만 수행합니다.
pub fn open_event_stream(state: &AppState) -> impl Stream<Item = Result<Event, Infallible>> {
    let (tx, rx) = mpsc::channel(state.config.stream.subscriber_buffer);
    let subscription = Subscription::new(&state.shutdown).open(&state.broadcaster, tx);

    let initial = StreamState {
        rx,
        cancel: subscription.cancel_token().clone(),
        subscription,
        deadline: Box::pin(tokio::time::sleep(state.config.stream.max_lifetime())),
        shutdown: state.shutdown.clone(),
    };

    stream::unfold(initial, |mut st| async move {
        let next = tokio::select! {
            frame = st.rx.recv() => frame,
            _ = st.cancel.cancelled() => {
                let reason = st.subscription.cancel_reason(&st.shutdown);
                st.subscription.close(reason);
                None
            }
            _ = &mut st.deadline => {
                st.subscription.close(CloseReason::MaxLifetime);
                None
            }
        };

        // 수신 채널이 닫히면 브로드캐스터가 구독자를 제거한 것
        match next {
            Some(frame) => Some((Ok(to_event(frame)), st)),
            None => {
                st.subscription.close(CloseReason::SendFailed);
                None
            }
        }
    })
}

/// 이벤트 스트림 핸들러.
pub async fn events_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stream = open_event_stream(&state);

    let sse = Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(state.config.stream.ping_interval())
            .text("ping"),
    );

    (
        [
            (header::CACHE_CONTROL, "no-store, no-transform"),
            (header::CONNECTION, "keep-alive"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        sse,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_test_state;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn test_stream_starts_with_hello_then_paint() {
        let state = create_test_state();
        let mut events = Box::pin(open_event_stream(&state));

        assert!(events.next().await.is_some());
        assert_eq!(state.broadcaster.subscriber_count(), 1);

        state.grid.paint(1, 1, "#fff".parse().unwrap(), None).await.unwrap();
        assert!(events.next().await.is_some());
    }

    #[tokio::test]
    async fn test_dropping_stream_unregisters() {
        let state = create_test_state();
        let events = open_event_stream(&state);
        assert_eq!(state.broadcaster.subscriber_count(), 1);

        drop(events);
        assert_eq!(state.broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_ends_stream() {
        let state = create_test_state();
        let mut events = Box::pin(open_event_stream(&state));
        events.next().await; // hello

        state.shutdown.cancel();
        assert!(events.next().await.is_none());
        assert_eq!(state.broadcaster.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_lifetime_ends_stream() {
        let mut state = create_test_state();
        state.config.stream.max_lifetime_secs = 60;
        let mut events = Box::pin(open_event_stream(&state));
        events.next().await; // hello

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(events.next().await.is_none());
        assert_eq!(state.broadcaster.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_alive_ping_every_interval() {
        let state = Arc::new(create_test_state());
        let response = events_handler(State(state.clone())).await.into_response();
        let mut body = response.into_body().into_data_stream();

        let hello = body.next().await.unwrap().unwrap();
        assert_eq!(hello, "event: hello\ndata: \"ok\"\n\n");

        for _ in 0..2 {
            tokio::time::advance(state.config.stream.ping_interval()).await;
            let ping = body.next().await.unwrap().unwrap();
            assert_eq!(ping, ": ping\n\n");
        }

        assert_eq!(state.broadcaster.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_removed_subscriber_stream_ends() {
        let state = create_test_state();
        let mut events = Box::pin(open_event_stream(&state));
        events.next().await; // hello

        assert_eq!(state.broadcaster.close_all(), 1);
        assert!(events.next().await.is_none());
    }
}
