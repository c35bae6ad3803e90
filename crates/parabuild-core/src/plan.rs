//! 1回の実行を表す検証済み・不変のビルド計画

use crate::error::{PlanError, Result};
use crate::metadata::ANNOTATION_REVISION;
use crate::platform::Platform;
use crate::provider::Provider;
use std::path::PathBuf;

/// 論理イメージ1つ分（全プラットフォームでビルドし、全レジストリへpush）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    /// レジストリに続くリポジトリパス（常に `/` 始まり）
    pub path: String,
    pub context: PathBuf,
    pub dockerfile: PathBuf,
    /// このイメージのビルドにだけ渡す追加引数
    pub build_args: Vec<String>,
    /// マニフェストの並び順はこの順序に従う
    pub platforms: Vec<Platform>,
    pub registries: Vec<String>,
    pub attestation: bool,
}

impl ImageSpec {
    /// `registry` にpushする単一アーキテクチャイメージのタグ
    pub fn arch_tag(&self, registry: &str, platform: &Platform) -> String {
        format!("{}{}-{}", registry, self.path, platform.arch)
    }

    /// `registry` のマルチアーキテクチャマニフェストのタグ
    pub fn manifest_tag(&self, registry: &str) -> String {
        format!("{}{}", registry, self.path)
    }
}

/// 公開済みイメージが同じメタデータ値を持つ場合にビルドを省略する設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipCheck {
    pub enabled: bool,
    /// ローカルとレジストリで比較するメタデータのキー
    pub key: String,
}

impl Default for SkipCheck {
    fn default() -> Self {
        Self {
            enabled: false,
            key: ANNOTATION_REVISION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    pub images: Vec<ImageSpec>,
    pub provider: Provider,
    /// プロバイダー自身のビルド引数の直後に追加する引数
    pub provider_args: Vec<String>,
    pub skip_check: SkipCheck,
}

impl BuildPlan {
    /// オーケストレーターが前提とする不変条件を検証
    pub fn validate(&self) -> Result<()> {
        if self.images.is_empty() {
            return Err(PlanError::EmptyImagePath);
        }

        for image in &self.images {
            if image.platforms.is_empty() {
                return Err(PlanError::ImageWithoutPlatforms(image.path.clone()));
            }
            if image.registries.is_empty() {
                return Err(PlanError::ImageWithoutRegistries(image.path.clone()));
            }
        }

        if self.skip_check.enabled && self.skip_check.key.is_empty() {
            return Err(PlanError::EmptySkipKey);
        }

        Ok(())
    }

    /// 全イメージを通じた重複なしのプラットフォーム数
    pub fn platform_count(&self) -> usize {
        let mut seen: Vec<&Platform> = Vec::new();
        for platform in self.images.iter().flat_map(|i| &i.platforms) {
            if !seen.contains(&platform) {
                seen.push(platform);
            }
        }
        seen.len()
    }
}
