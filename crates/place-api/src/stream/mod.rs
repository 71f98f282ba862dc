//! 페인트 이벤트 실시간 스트림 (Server-Sent Events).

mod handler;
mod subscription;

pub use handler::{events_handler, open_event_stream};
pub use subscription::{CloseReason, ConnectionState, Subscription};
