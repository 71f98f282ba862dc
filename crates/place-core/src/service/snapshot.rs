//! 그리드 상태 조회.

use crate::domain::GridSnapshot;
use crate::grid::GridStore;

/// 새로 연결한 클라이언트에게 전체 그리드 상태를 제공합니다.
///
/// 부수 효과가 없는 순수 읽기이며 동시에 얼마든지 호출할 수 있습니다.
#[derive(Clone)]
pub struct SnapshotService {
    grid: GridStore,
}

impl SnapshotService {
    pub fn new(grid: GridStore) -> Self {
        Self { grid }
    }

    pub async fn get_state(&self) -> GridSnapshot {
        self.grid.snapshot().await
    }
}
