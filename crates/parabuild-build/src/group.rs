use std::fmt;

/// 作業単位の階層ラベル（例: `0/linux/amd64`）
///
/// ログ出力の帰属先を示すだけで、制御フローには影響しない。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Group(String);

impl Group {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// この作業単位の下にぶら下がる作業単位のラベル
    pub fn child(&self, segment: impl fmt::Display) -> Self {
        Self(format!("{}/{}", self.0, segment))
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
