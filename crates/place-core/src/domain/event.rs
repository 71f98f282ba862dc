//! 구독자에게 전달되는 이벤트 타입.

use serde::{Deserialize, Serialize};

use super::color::HexColor;

/// 성공한 페인트 하나의 wire 표현.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaintEvent {
    pub x: u32,
    pub y: u32,
    pub color: HexColor,
    /// 페인트한 사용자 (없으면 생략)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    /// 서버 타임스탬프 (Unix 밀리초)
    pub timestamp: u64,
}

/// 서버에서 구독자로 보내는 메시지.
///
/// ```json
/// {"type": "paint", "x": 10, "y": 20, "color": "#ff0000", "identity": "u1", "timestamp": 1700000000000}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// 픽셀 페인트
    Paint(PaintEvent),
}

impl StreamMessage {
    /// JSON 문자열로 직렬화.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<PaintEvent> for StreamMessage {
    fn from(event: PaintEvent) -> Self {
        StreamMessage::Paint(event)
    }
}
