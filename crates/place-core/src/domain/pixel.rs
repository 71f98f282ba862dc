//! 그리드 셀과 스냅샷 타입.

use serde::{Deserialize, Serialize};

use super::color::HexColor;

/// 그리드 좌표.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub x: u32,
    pub y: u32,
}

impl CellCoord {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// 칠해진 픽셀 하나 (스냅샷 항목).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pixel {
    pub x: u32,
    pub y: u32,
    pub color: HexColor,
}

/// 그리드 전체 상태.
///
/// `pixels`의 순서는 정의되지 않으며 호출마다 달라질 수 있습니다.
/// 클라이언트는 순서에 의존하면 안 됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSnapshot {
    /// 그리드 너비
    pub grid_width: u32,
    /// 그리드 높이
    pub grid_height: u32,
    /// 칠해진 픽셀 목록 (순서 없음)
    pub pixels: Vec<Pixel>,
}

impl GridSnapshot {
    /// 좌표의 색상 조회 (선형 탐색).
    pub fn color_at(&self, x: u32, y: u32) -> Option<&HexColor> {
        self.pixels
            .iter()
            .find(|p| p.x == x && p.y == y)
            .map(|p| &p.color)
    }
}

/// 자기 신고된 사용자 식별자.
///
/// 인증은 하지 않습니다. 비어 있으면 익명 식별자로 대체됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// 요청의 identity를 정규화.
    ///
    /// 없거나 공백뿐이면 `anonymous`를 사용합니다. 모든 익명 요청은 하나의 버킷을 공유합니다.
    /// 그 외에는 제출된 문자열을 그대로 버킷 키로 씁니다.
    pub fn resolve(raw: Option<&str>, anonymous: &str) -> Self {
        match raw {
            Some(s) if !s.trim().is_empty() => Self(s.to_string()),
            _ => Self(anonymous.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_resolve() {
        assert_eq!(Identity::resolve(Some("u1"), "anon").as_str(), "u1");
        assert_eq!(Identity::resolve(Some(""), "anon").as_str(), "anon");
        assert_eq!(Identity::resolve(Some("   "), "anon").as_str(), "anon");
        assert_eq!(Identity::resolve(None, "anon").as_str(), "anon");
    }

    #[test]
    fn test_identity_kept_verbatim() {
        assert_eq!(Identity::resolve(Some(" u1"), "anon").as_str(), " u1");
        assert_ne!(
            Identity::resolve(Some(" u1"), "anon"),
            Identity::resolve(Some("u1"), "anon")
        );
    }

    #[test]
    fn test_snapshot_wire_format() {
        let snapshot = GridSnapshot {
            grid_width: 512,
            grid_height: 256,
            pixels: vec![Pixel {
                x: 10,
                y: 20,
                color: "#ff0000".parse().unwrap(),
            }],
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["gridWidth"], 512);
        assert_eq!(json["gridHeight"], 256);
        assert_eq!(json["pixels"][0]["color"], "#ff0000");
        assert_eq!(snapshot.color_at(10, 20).map(|c| c.as_str()), Some("#ff0000"));
        assert!(snapshot.color_at(0, 0).is_none());
    }
}
