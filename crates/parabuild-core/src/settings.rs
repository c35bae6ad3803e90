//! コマンドライン/環境変数の生の設定と、[`BuildPlan`] への正規化

use crate::error::{PlanError, Result};
use crate::plan::{BuildPlan, ImageSpec, SkipCheck};
use crate::platform::Platform;
use crate::provider::Provider;
use std::path::PathBuf;
use tracing::debug;

pub const DEFAULT_PLATFORMS: &str = "linux/amd64,linux/arm64";
pub const DEFAULT_REGISTRY: &str = "docker.io";
pub const DEFAULT_CONTEXT: &str = ".";

/// 未検証の入力（コマンドラインフラグ1つにつき1フィールド）
///
/// リスト系フィールドはフラグの指定をそのまま保持する。カンマ区切り
/// （platforms, registries）や空白区切り（provider args）は正規化時に分割する。
/// イメージ系リストは `image_paths` とインデックスで対応する。
#[derive(Debug, Clone, Default)]
pub struct PlanSettings {
    pub provider: Option<String>,
    pub provider_args: Vec<String>,
    pub platforms: Vec<String>,
    pub registries: Vec<String>,
    pub image_paths: Vec<String>,
    pub image_contexts: Vec<String>,
    pub image_dockerfiles: Vec<String>,
    pub image_args: Vec<String>,
    pub tags: Vec<String>,
    /// ブランチパイプラインでは `platforms` の代わりに使う
    pub branch_platforms: Option<String>,
    /// ブランチパイプラインでは `registries` の代わりに使う
    pub branch_registries: Option<String>,
    pub with_attestation: bool,
    pub check_image_annotation: bool,
    pub check_image_annotation_key: Option<String>,
}

/// `CI_COMMIT_TAG` が無ければGitLabパイプラインはブランチ上で動いている
pub fn is_branch_pipeline() -> bool {
    std::env::var("CI_COMMIT_TAG")
        .map(|tag| tag.is_empty())
        .unwrap_or(true)
}

fn split_list(values: &[String], separator: char) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.split(separator))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_platforms(values: &[String]) -> Result<Vec<Platform>> {
    let mut platforms = Vec::new();
    for value in values {
        platforms.extend(Platform::parse_list(value)?);
    }
    Ok(platforms)
}

impl PlanSettings {
    /// デフォルト値と上書きを適用してから検証する
    ///
    /// `branch_pipeline` が真なら `branch_*` の上書きを有効にする。
    pub fn into_plan(self, branch_pipeline: bool) -> Result<BuildPlan> {
        let provider = match &self.provider {
            Some(name) => name.parse::<Provider>()?,
            None => Provider::default(),
        };

        let mut platforms = parse_platforms(&self.platforms)?;
        if platforms.is_empty() {
            platforms = Platform::parse_list(DEFAULT_PLATFORMS)?;
        }

        // タグ1つ = イメージ1つ。明示的なimage-pathが優先
        let image_paths: Vec<String> = if self.tags.is_empty() {
            self.image_paths.clone()
        } else {
            self.tags
                .iter()
                .enumerate()
                .map(|(i, tag)| self.image_paths.get(i).unwrap_or(tag).clone())
                .collect()
        };

        let mut registries = split_list(&self.registries, ',');
        if registries.is_empty() {
            registries = vec![DEFAULT_REGISTRY.to_string()];
        }

        if branch_pipeline {
            if let Some(value) = self.branch_platforms.as_deref().filter(|v| !v.is_empty()) {
                debug!(platforms = %value, "Using branch pipeline platforms");
                platforms = Platform::parse_list(value)?;
            }
            if let Some(value) = self.branch_registries.as_deref().filter(|v| !v.is_empty()) {
                debug!(registries = %value, "Using branch pipeline registries");
                registries = split_list(&[value.to_string()], ',');
            }
        }

        if registries.is_empty() {
            return Err(PlanError::EmptyRegistry);
        }
        if image_paths.is_empty() {
            return Err(PlanError::EmptyImagePath);
        }
        if platforms.is_empty() {
            return Err(PlanError::EmptyPlatform);
        }
        if self.image_contexts.len() > image_paths.len() {
            return Err(PlanError::ContextMismatch {
                contexts: self.image_contexts.len(),
                images: image_paths.len(),
            });
        }
        if self.image_dockerfiles.len() > image_paths.len() {
            return Err(PlanError::DockerfileMismatch {
                dockerfiles: self.image_dockerfiles.len(),
                images: image_paths.len(),
            });
        }

        let images = image_paths
            .iter()
            .enumerate()
            .map(|(i, path)| {
                let context = self
                    .image_contexts
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_CONTEXT.to_string());
                let dockerfile = self
                    .image_dockerfiles
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("{}/Dockerfile", context));
                let build_args = self
                    .image_args
                    .get(i)
                    .map(|args| args.split_whitespace().map(str::to_string).collect())
                    .unwrap_or_default();

                ImageSpec {
                    path: if path.starts_with('/') {
                        path.clone()
                    } else {
                        format!("/{}", path)
                    },
                    context: PathBuf::from(context),
                    dockerfile: PathBuf::from(dockerfile),
                    build_args,
                    platforms: platforms.clone(),
                    registries: registries.clone(),
                    attestation: self.with_attestation,
                }
            })
            .collect();

        let mut skip_check = SkipCheck {
            enabled: self.check_image_annotation,
            ..SkipCheck::default()
        };
        if let Some(key) = self.check_image_annotation_key {
            skip_check.key = key;
        }

        let plan = BuildPlan {
            images,
            provider,
            provider_args: split_list(&self.provider_args, ' '),
            skip_check,
        };
        plan.validate()?;

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ANNOTATION_VERSION;

    fn settings(paths: &[&str]) -> PlanSettings {
        PlanSettings {
            image_paths: paths.iter().map(|p| p.to_string()).collect(),
            ..PlanSettings::default()
        }
    }

    #[test]
    fn test_defaults() {
        let plan = settings(&["team/app"]).into_plan(false).unwrap();

        assert_eq!(plan.provider, Provider::Buildx);
        assert!(plan.provider_args.is_empty());
        assert_eq!(plan.skip_check, SkipCheck::default());

        let image = &plan.images[0];
        assert_eq!(image.path, "/team/app");
        assert_eq!(image.context, PathBuf::from("."));
        assert_eq!(image.dockerfile, PathBuf::from("./Dockerfile"));
        assert!(image.build_args.is_empty());
        assert_eq!(image.registries, vec!["docker.io"]);
        assert_eq!(
            image.platforms,
            vec![Platform::new("linux", "amd64"), Platform::new("linux", "arm64")]
        );
    }

    #[test]
    fn test_per_image_lists_align_by_index() {
        let mut s = settings(&["/a", "/b"]);
        s.image_contexts = vec!["services/a".to_string()];
        s.image_dockerfiles = vec!["docker/a.Dockerfile".to_string()];
        s.image_args = vec!["--build-arg=A=1 --target=prod".to_string()];

        let plan = s.into_plan(false).unwrap();
        assert_eq!(plan.images[0].context, PathBuf::from("services/a"));
        assert_eq!(plan.images[0].dockerfile, PathBuf::from("docker/a.Dockerfile"));
        assert_eq!(
            plan.images[0].build_args,
            vec!["--build-arg=A=1", "--target=prod"]
        );
        assert_eq!(plan.images[1].context, PathBuf::from("."));
        assert_eq!(plan.images[1].dockerfile, PathBuf::from("./Dockerfile"));
    }

    #[test]
    fn test_dockerfile_defaults_relative_to_context() {
        let mut s = settings(&["/a"]);
        s.image_contexts = vec!["web".to_string()];
        let plan = s.into_plan(false).unwrap();
        assert_eq!(plan.images[0].dockerfile, PathBuf::from("web/Dockerfile"));
    }

    #[test]
    fn test_tags_define_images() {
        let mut s = settings(&["custom/path"]);
        s.tags = vec!["app:1.0".to_string(), "worker:1.0".to_string()];

        let plan = s.into_plan(false).unwrap();
        let paths: Vec<&str> = plan.images.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["/custom/path", "/worker:1.0"]);
    }

    #[test]
    fn test_lists_are_split() {
        let mut s = settings(&["/a"]);
        s.platforms = vec!["linux/arm64".to_string(), "linux/amd64,linux/s390x".to_string()];
        s.registries = vec!["r1.example.com,r2.example.com".to_string()];
        s.provider_args = vec!["--builder ci  --progress=plain".to_string()];

        let plan = s.into_plan(false).unwrap();
        let arches: Vec<&str> = plan.images[0]
            .platforms
            .iter()
            .map(|p| p.arch.as_str())
            .collect();
        assert_eq!(arches, vec!["arm64", "amd64", "s390x"]);
        assert_eq!(plan.images[0].registries, vec!["r1.example.com", "r2.example.com"]);
        assert_eq!(plan.provider_args, vec!["--builder", "ci", "--progress=plain"]);
    }

    #[test]
    fn test_branch_overrides() {
        let mut s = settings(&["/a"]);
        s.registries = vec!["prod.example.com".to_string()];
        s.branch_platforms = Some("linux/amd64".to_string());
        s.branch_registries = Some("dev.example.com".to_string());

        let on_tag = s.clone().into_plan(false).unwrap();
        assert_eq!(on_tag.images[0].registries, vec!["prod.example.com"]);
        assert_eq!(on_tag.images[0].platforms.len(), 2);

        let on_branch = s.into_plan(true).unwrap();
        assert_eq!(on_branch.images[0].registries, vec!["dev.example.com"]);
        assert_eq!(
            on_branch.images[0].platforms,
            vec![Platform::new("linux", "amd64")]
        );
    }

    #[test]
    fn test_is_branch_pipeline() {
        temp_env::with_var("CI_COMMIT_TAG", Some("v1.2.0"), || {
            assert!(!is_branch_pipeline());
        });
        temp_env::with_var("CI_COMMIT_TAG", None::<&str>, || {
            assert!(is_branch_pipeline());
        });
    }

    #[test]
    fn test_skip_check_settings() {
        let mut s = settings(&["/a"]);
        s.check_image_annotation = true;
        s.check_image_annotation_key = Some(ANNOTATION_VERSION.to_string());

        let plan = s.into_plan(false).unwrap();
        assert!(plan.skip_check.enabled);
        assert_eq!(plan.skip_check.key, ANNOTATION_VERSION);
    }

    #[test]
    fn test_configuration_errors() {
        assert_eq!(
            PlanSettings::default().into_plan(false),
            Err(PlanError::EmptyImagePath)
        );

        let mut bad_platform = settings(&["/a"]);
        bad_platform.platforms = vec!["linux-amd64".to_string()];
        assert_eq!(
            bad_platform.into_plan(false),
            Err(PlanError::InvalidPlatform("linux-amd64".to_string()))
        );

        let mut bad_provider = settings(&["/a"]);
        bad_provider.provider = Some("podman".to_string());
        assert!(matches!(
            bad_provider.into_plan(false),
            Err(PlanError::InvalidProvider { .. })
        ));

        let mut too_many_contexts = settings(&["/a"]);
        too_many_contexts.image_contexts = vec![".".to_string(), "b".to_string()];
        assert_eq!(
            too_many_contexts.into_plan(false),
            Err(PlanError::ContextMismatch {
                contexts: 2,
                images: 1
            })
        );

        let mut too_many_dockerfiles = settings(&["/a"]);
        too_many_dockerfiles.image_dockerfiles = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(
            too_many_dockerfiles.into_plan(false),
            Err(PlanError::DockerfileMismatch { .. })
        ));

        let mut empty_key = settings(&["/a"]);
        empty_key.check_image_annotation = true;
        empty_key.check_image_annotation_key = Some(String::new());
        assert_eq!(empty_key.into_plan(false), Err(PlanError::EmptySkipKey));
    }
}
