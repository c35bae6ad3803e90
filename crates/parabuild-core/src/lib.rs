//! parabuild コアモデル
//!
//! 1回の実行で *何を* ビルドするかを表す。イメージ、その対象プラットフォームと
//! レジストリ、使う外部ツール、各イメージに付与する来歴メタデータ。
//! ここの値は一度だけ構築・検証され、オーケストレーターから読み取り専用で共有される。

pub mod error;
pub mod metadata;
pub mod plan;
pub mod platform;
pub mod provider;
pub mod settings;

pub use error::{PlanError, Result};
pub use metadata::BuildMetadata;
pub use plan::{BuildPlan, ImageSpec, SkipCheck};
pub use platform::Platform;
pub use provider::Provider;
pub use settings::{PlanSettings, is_branch_pipeline};
