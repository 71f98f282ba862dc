//! 캔버스 도메인 모델.

pub mod color;
pub mod event;
pub mod pixel;

pub use color::HexColor;
pub use event::{PaintEvent, StreamMessage};
pub use pixel::{CellCoord, GridSnapshot, Identity, Pixel};
