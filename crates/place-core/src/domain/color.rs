//! 픽셀 색상 타입.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PlaceError;

/// 검증된 hex 색상 문자열.
///
/// `#rrggbb` 또는 `#rgb` 형식만 허용합니다. 제출된 문자열을 그대로 보관하며
/// 대소문자 정규화나 축약형 확장은 하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    /// 문자열이 hex 색상 문법을 따르는지 확인.
    pub fn is_valid(s: &str) -> bool {
        match s.strip_prefix('#') {
            Some(digits) => {
                matches!(digits.len(), 3 | 6) && digits.bytes().all(|b| b.is_ascii_hexdigit())
            }
            None => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for HexColor {
    type Err = PlaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Self::is_valid(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(PlaceError::InvalidInput(format!("잘못된 색상: {}", s)))
        }
    }
}

impl TryFrom<String> for HexColor {
    type Error = PlaceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if Self::is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(PlaceError::InvalidInput(format!("잘못된 색상: {}", value)))
        }
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
