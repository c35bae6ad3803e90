use clap::Parser;
use clap::builder::BoolishValueParser;
use parabuild_core::PlanSettings;

#[derive(Parser, Debug)]
#[command(name = "parabuild")]
#[command(version)]
#[command(about = "Build and publish multi-architecture container images in parallel", long_about = None)]
pub struct Cli {
    /// ビルドプロバイダー (buildx)
    #[arg(long, value_name = "NAME")]
    pub provider: Option<String>,

    /// 全ビルドでプロバイダーに渡す追加引数（空白区切り）
    #[arg(long = "provider-args", value_name = "ARGS", allow_hyphen_values = true)]
    pub provider_args: Vec<String>,

    /// 対象プラットフォーム os/arch（カンマ区切り）[default: linux/amd64,linux/arm64]
    ///
    /// 環境変数 PARALLEL_IMAGE_BUILD_PLATFORM は --platform 未指定時のみ使われ、
    /// --platform の値に追加はされない
    #[arg(long = "platform", value_name = "PLATFORMS", env = "PARALLEL_IMAGE_BUILD_PLATFORM")]
    pub platforms: Vec<String>,

    /// push先レジストリ（カンマ区切り）[default: docker.io]
    #[arg(long = "registry", value_name = "REGISTRIES")]
    pub registries: Vec<String>,

    /// レジストリ内のイメージパス（イメージごとに1回指定）
    #[arg(long = "image-path", value_name = "PATH")]
    pub image_paths: Vec<String>,

    /// 同じ位置のイメージのビルドコンテキスト [default: .]
    #[arg(long = "image-context", value_name = "DIR")]
    pub image_contexts: Vec<String>,

    /// 同じ位置のイメージのDockerfile [default: <context>/Dockerfile]
    #[arg(long = "image-dockerfile", value_name = "FILE")]
    pub image_dockerfiles: Vec<String>,

    /// 同じ位置のイメージに渡す追加ビルド引数
    #[arg(long = "image-args", value_name = "ARGS", allow_hyphen_values = true)]
    pub image_args: Vec<String>,

    /// イメージタグ（イメージごとに1回）。image-path未指定ならパスとして使う
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// ブランチパイプラインで --platform の代わりに使うプラットフォーム
    #[arg(long = "gitlab-branch-platform", value_name = "PLATFORMS")]
    pub branch_platforms: Option<String>,

    /// ブランチパイプラインで --registry の代わりに使うレジストリ
    #[arg(long = "gitlab-branch-registry", value_name = "REGISTRIES")]
    pub branch_registries: Option<String>,

    /// sbom と provenance のアテステーションを生成
    #[arg(long = "with-attestation")]
    pub with_attestation: bool,

    /// 公開済みイメージのアノテーションがローカルの値と一致すればビルドを省略
    #[arg(
        long = "check-image-annotation",
        env = "PARALLEL_IMAGE_BUILD_CHECK_IMAGE_ANNOTATION",
        value_parser = BoolishValueParser::new()
    )]
    pub check_image_annotation: bool,

    /// --check-image-annotation で比較するアノテーション
    #[arg(
        long = "check-image-annotation-key",
        value_name = "KEY",
        env = "PARALLEL_IMAGE_BUILD_CHECK_IMAGE_ANNOTATION_KEY"
    )]
    pub check_image_annotation_key: Option<String>,

    /// デバッグログを有効化
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    pub fn into_settings(self) -> PlanSettings {
        PlanSettings {
            provider: self.provider,
            provider_args: self.provider_args,
            platforms: self.platforms,
            registries: self.registries,
            image_paths: self.image_paths,
            image_contexts: self.image_contexts,
            image_dockerfiles: self.image_dockerfiles,
            image_args: self.image_args,
            tags: self.tags,
            branch_platforms: self.branch_platforms,
            branch_registries: self.branch_registries,
            with_attestation: self.with_attestation,
            check_image_annotation: self.check_image_annotation,
            check_image_annotation_key: self.check_image_annotation_key,
        }
    }
}
