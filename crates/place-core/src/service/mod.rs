//! 요청 단위 서비스.

pub mod paint;
pub mod snapshot;

pub use paint::{PaintReceipt, PaintRequest, PaintService};
pub use snapshot::SnapshotService;
