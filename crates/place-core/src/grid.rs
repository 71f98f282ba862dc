//! 권한 있는 그리드 저장소.
//!
//! 칠해진 셀만 저장하는 sparse map입니다. 쓰기와 브로드캐스트는 같은 쓰기 락 안에서
//! 수행되므로 구독자는 커밋 순서대로 이벤트를 받습니다.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::broadcast::{Broadcaster, PublishReport};
use crate::clock::SharedClock;
use crate::domain::{CellCoord, GridSnapshot, HexColor, Identity, PaintEvent, Pixel, StreamMessage};
use crate::error::{PlaceError, PlaceResult};

/// 그리드 저장소.
#[derive(Clone)]
pub struct GridStore {
    width: u32,
    height: u32,
    cells: Arc<RwLock<HashMap<CellCoord, HexColor>>>,
    broadcaster: Broadcaster,
    clock: SharedClock,
}

impl GridStore {
    /// 빈 그리드 생성.
    pub fn new(width: u32, height: u32, broadcaster: Broadcaster, clock: SharedClock) -> Self {
        Self {
            width,
            height,
            cells: Arc::new(RwLock::new(HashMap::new())),
            broadcaster,
            clock,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// 좌표가 그리드 안에 있으면 `CellCoord`로 변환.
    pub fn coord(&self, x: i64, y: i64) -> PlaceResult<CellCoord> {
        let in_bounds =
            (0..i64::from(self.width)).contains(&x) && (0..i64::from(self.height)).contains(&y);
        if !in_bounds {
            return Err(PlaceError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(CellCoord::new(x as u32, y as u32))
    }

    /// 셀을 칠하고 이벤트를 한 번 브로드캐스트.
    ///
    /// 범위를 벗어나면 `OutOfBounds`를 반환하고 그리드는 변경되지 않습니다.
    pub async fn paint(
        &self,
        x: i64,
        y: i64,
        color: HexColor,
        identity: Option<&Identity>,
    ) -> PlaceResult<(PaintEvent, PublishReport)> {
        let coord = self.coord(x, y)?;

        let mut cells = self.cells.write().await;
        cells.insert(coord, color.clone());

        let event = PaintEvent {
            x: coord.x,
            y: coord.y,
            color,
            identity: identity.map(|id| id.as_str().to_string()),
            timestamp: self.clock.now_millis(),
        };
        let report = self.broadcaster.publish(&StreamMessage::Paint(event.clone()));
        drop(cells);

        debug!(
            x = event.x,
            y = event.y,
            color = %event.color,
            delivered = report.delivered,
            dropped = report.dropped,
            "Cell painted"
        );

        Ok((event, report))
    }

    /// 좌표의 현재 색상.
    pub async fn color_at(&self, x: u32, y: u32) -> Option<HexColor> {
        self.cells.read().await.get(&CellCoord::new(x, y)).cloned()
    }

    /// 전체 상태 스냅샷. 픽셀 순서는 정의되지 않습니다.
    pub async fn snapshot(&self) -> GridSnapshot {
        let cells = self.cells.read().await;
        let pixels = cells
            .iter()
            .map(|(coord, color)| Pixel {
                x: coord.x,
                y: coord.y,
                color: color.clone(),
            })
            .collect();

        GridSnapshot {
            grid_width: self.width,
            grid_height: self.height,
            pixels,
        }
    }

    /// 칠해진 셀 수.
    pub async fn painted_count(&self) -> usize {
        self.cells.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{Frame, Subscriber};
    use crate::clock::ManualClock;
    use proptest::prelude::*;
    use tokio::sync::mpsc;

    fn store() -> (GridStore, Broadcaster) {
        let broadcaster = Broadcaster::new(false);
        let store = GridStore::new(512, 256, broadcaster.clone(), ManualClock::new(5_000));
        (store, broadcaster)
    }

    fn color(s: &str) -> HexColor {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_paint_and_snapshot() {
        let (store, _) = store();

        let (event, _) = store.paint(10, 20, color("#ff0000"), None).await.unwrap();
        assert_eq!((event.x, event.y), (10, 20));
        assert_eq!(event.timestamp, 5_000);

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.grid_width, 512);
        assert_eq!(snapshot.grid_height, 256);
        assert_eq!(snapshot.pixels.len(), 1);
        assert_eq!(snapshot.color_at(10, 20), Some(&color("#ff0000")));
    }

    #[tokio::test]
    async fn test_overwrite_keeps_single_entry() {
        let (store, _) = store();

        store.paint(3, 3, color("#ff0000"), None).await.unwrap();
        store.paint(3, 3, color("#00ff00"), None).await.unwrap();
        store.paint(3, 3, color("#0000ff"), None).await.unwrap();

        assert_eq!(store.painted_count().await, 1);
        assert_eq!(store.color_at(3, 3).await, Some(color("#0000ff")));
    }

    #[tokio::test]
    async fn test_edges_in_bounds() {
        let (store, _) = store();

        assert!(store.paint(0, 0, color("#000"), None).await.is_ok());
        assert!(store.paint(511, 255, color("#000"), None).await.is_ok());
        assert_eq!(store.painted_count().await, 2);
    }

    #[tokio::test]
    async fn test_paint_publishes_one_event() {
        let (store, broadcaster) = store();
        let (tx, mut rx) = mpsc::channel(8);
        broadcaster.register(Subscriber::new(tx));

        let identity = Identity::resolve(Some("u1"), "anon");
        let (_, report) = store.paint(1, 2, color("#abc"), Some(&identity)).await.unwrap();
        assert_eq!(report.delivered, 1);

        let Some(Frame::Message(json)) = rx.recv().await else {
            panic!("expected paint frame");
        };
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "paint");
        assert_eq!(value["identity"], "u1");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_out_of_bounds_publishes_nothing() {
        let (store, broadcaster) = store();
        let (tx, mut rx) = mpsc::channel(8);
        broadcaster.register(Subscriber::new(tx));

        let err = store.paint(512, 0, color("#abc"), None).await.unwrap_err();
        assert!(matches!(err, PlaceError::OutOfBounds { x: 512, y: 0, .. }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_events_follow_commit_order() {
        let (store, broadcaster) = store();
        let (tx, mut rx) = mpsc::channel(64);
        broadcaster.register(Subscriber::new(tx));

        for x in 0..20 {
            store.paint(x, 0, color("#fff"), None).await.unwrap();
        }

        for expected in 0..20 {
            let Some(Frame::Message(json)) = rx.recv().await else {
                panic!("expected paint frame");
            };
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value["x"], expected);
        }
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }

    fn out_of_bounds() -> impl Strategy<Value = (i64, i64)> {
        prop_oneof![
            (i64::MIN..0, any::<i64>()),
            (512i64..=i64::MAX, any::<i64>()),
            (0i64..512, i64::MIN..0),
            (0i64..512, 256i64..=i64::MAX),
        ]
    }

    proptest! {
        #[test]
        fn prop_out_of_bounds_rejected((x, y) in out_of_bounds()) {
            block_on(async {
                let (store, _) = store();
                store.paint(5, 5, color("#123456"), None).await.unwrap();
                let before = store.snapshot().await.pixels;

                let result = store.paint(x, y, color("#ffffff"), None).await;
                let is_oob = matches!(result, Err(PlaceError::OutOfBounds { .. }));
                prop_assert!(is_oob);
                prop_assert_eq!(store.snapshot().await.pixels, before);
                Ok(())
            })?;
        }
    }
}
