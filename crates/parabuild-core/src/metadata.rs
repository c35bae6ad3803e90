//! ビルドの来歴メタデータ
//!
//! 起動時に一度だけ計算し、OCIのラベル・アノテーションとして全イメージに付与する。
//! 同じ値を公開済みイメージと比較し、ビルドを省略できるか判定する。

use chrono::{SecondsFormat, Utc};

/// <https://github.com/opencontainers/image-spec/blob/main/annotations.md#pre-defined-annotation-keys>
pub const ANNOTATION_CREATED: &str = "org.opencontainers.image.created";
pub const ANNOTATION_TITLE: &str = "org.opencontainers.image.title";
pub const ANNOTATION_REVISION: &str = "org.opencontainers.image.revision";
pub const ANNOTATION_VERSION: &str = "org.opencontainers.image.version";

/// [`BuildMetadata::from_env`] が読む環境変数
const ENV_SOURCES: [(&str, &str); 3] = [
    (ANNOTATION_TITLE, "CI_PROJECT_NAME"),
    (ANNOTATION_REVISION, "CI_COMMIT_SHA"),
    (ANNOTATION_VERSION, "CI_COMMIT_REF_SLUG"),
];

/// 現在のビルドの来歴（順序付きキー/値）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildMetadata {
    entries: Vec<(String, String)>,
}

impl BuildMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// このプロセスのメタデータ（作成時刻は時計から、残りはCI変数から）
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 変数の参照方法を指定できる [`BuildMetadata::from_env`]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let created = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut metadata = Self::new().with(ANNOTATION_CREATED, created);

        for (key, variable) in ENV_SOURCES {
            metadata = metadata.with(key, lookup(variable).unwrap_or_default());
        }

        metadata
    }

    /// `key` を設定（既存の値は位置を保ったまま置き換える）
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();

        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }

        self
    }

    /// `key` の値。未知なら空文字
    pub fn get(&self, key: &str) -> &str {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    /// 空でないエントリを挿入順で返す
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// ビルドツールに渡す `--label=<key>=<value>` 引数
    pub fn labels(&self) -> Vec<String> {
        self.entries()
            .map(|(k, v)| format!("--label={}={}", k, v))
            .collect()
    }

    /// ビルドツールに渡す `--annotation=<key>=<value>` 引数
    pub fn annotations(&self) -> Vec<String> {
        self.entries()
            .map(|(k, v)| format!("--annotation={}={}", k, v))
            .collect()
    }
}
