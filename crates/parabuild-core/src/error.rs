use thiserror::Error;

/// 設定エラー（ビルド開始前に検出される）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("invalid platform: {0} (expected <os>/<arch>)")]
    InvalidPlatform(String),

    #[error("invalid provider: {value}, valid {valid:?}")]
    InvalidProvider { value: String, valid: Vec<String> },

    #[error("registry is empty")]
    EmptyRegistry,

    #[error("platform is empty")]
    EmptyPlatform,

    #[error("image-path is empty")]
    EmptyImagePath,

    #[error("image-context is invalid: {contexts} entries for {images} images")]
    ContextMismatch { contexts: usize, images: usize },

    #[error("image-dockerfile is invalid: {dockerfiles} entries for {images} images")]
    DockerfileMismatch { dockerfiles: usize, images: usize },

    #[error("image {0} has no platforms")]
    ImageWithoutPlatforms(String),

    #[error("image {0} has no registries")]
    ImageWithoutRegistries(String),

    #[error("skip check is enabled but the metadata key is empty")]
    EmptySkipKey,
}

pub type Result<T> = std::result::Result<T, PlanError>;
