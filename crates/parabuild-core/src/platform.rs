//! ビルド対象プラットフォーム（`os/arch` の組）

use crate::error::{PlanError, Result};
use std::fmt;
use std::str::FromStr;

/// ビルド対象1つ（例: `linux/arm64`）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// `linux/amd64,linux/arm64` のようなカンマ区切りリストをパース
    ///
    /// 順序は保持され、公開するマニフェストの並び順になる。
    pub fn parse_list(value: &str) -> Result<Vec<Platform>> {
        value.split(',').map(str::parse).collect()
    }
}

impl FromStr for Platform {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('/').collect();

        match parts.as_slice() {
            [os, arch] if !os.is_empty() && !arch.is_empty() => Ok(Platform::new(*os, *arch)),
            _ => Err(PlanError::InvalidPlatform(s.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
