//! 外部ビルドツールの抽象化
//!
//! プロバイダーは起動するプログラムと、ビルド・マニフェスト・inspect
//! 各コマンドの引数を知っている。呼び出し側はこれらのメソッドだけを使う。

use crate::error::{PlanError, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Provider {
    /// `docker buildx`
    #[default]
    Buildx,
}

impl Provider {
    pub const ALL: [Provider; 1] = [Provider::Buildx];

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Buildx => "buildx",
        }
    }

    /// このプロバイダーの全コマンドで起動するプログラム
    pub fn program(&self) -> &'static str {
        match self {
            Provider::Buildx => "docker",
        }
    }

    /// ベースイメージをpullし、結果をpushするビルドの先頭引数
    pub fn build_args(&self, attestation: bool) -> Vec<String> {
        match self {
            Provider::Buildx => vec![
                "buildx".to_string(),
                "build".to_string(),
                "--pull".to_string(),
                "--push".to_string(),
                format!("--sbom={}", attestation),
                format!("--provenance={}", attestation),
            ],
        }
    }

    /// アーキテクチャ別の `sources` からマルチアーキテクチャマニフェスト `target` を作成
    pub fn manifest_create_args(&self, target: &str, sources: &[String]) -> Vec<String> {
        match self {
            Provider::Buildx => {
                let mut args = vec![
                    "buildx".to_string(),
                    "imagetools".to_string(),
                    "create".to_string(),
                    "-t".to_string(),
                    target.to_string(),
                ];
                args.extend(sources.iter().cloned());
                args
            }
        }
    }

    /// 公開したマニフェストを表示（レジストリに反映されたかの確認用）
    pub fn manifest_inspect_args(&self, target: &str) -> Vec<String> {
        match self {
            Provider::Buildx => vec![
                "buildx".to_string(),
                "imagetools".to_string(),
                "inspect".to_string(),
                target.to_string(),
            ],
        }
    }

    /// `tag` の生マニフェストJSON（アノテーション込み）を取得
    pub fn inspect_raw_args(&self, tag: &str) -> Vec<String> {
        match self {
            Provider::Buildx => vec![
                "buildx".to_string(),
                "imagetools".to_string(),
                "inspect".to_string(),
                "--raw".to_string(),
                tag.to_string(),
            ],
        }
    }
}

impl FromStr for Provider {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        Provider::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| PlanError::InvalidProvider {
                value: s.to_string(),
                valid: Provider::ALL.iter().map(|p| p.name().to_string()).collect(),
            })
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
