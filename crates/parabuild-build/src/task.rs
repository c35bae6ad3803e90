//! イメージ単位の処理: アーキテクチャ別ビルドを並行実行し、その後マニフェストを並行公開

use crate::context::RunContext;
use crate::error::{BuildError, Result};
use crate::group::Group;
use crate::scope::Scope;
use futures_util::future::join_all;
use parabuild_core::{ImageSpec, Platform};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// タスクの失敗を発生箇所でログに出す。キャンセルはdebugに留める
pub(crate) fn report(group: &Group, err: &BuildError, message: &str) {
    if err.is_cancelled() {
        debug!(group = %group, "{} (cancelled)", message);
    } else {
        error!(group = %group, error = %err, "{}", message);
    }
}

fn round_to_secs(elapsed: Duration) -> Duration {
    Duration::from_secs((elapsed.as_millis() as u64 + 500) / 1000)
}

/// イメージ `index` を全プラットフォームでビルドし、マニフェストを公開する
///
/// 結果にかかわらず経過時間を必ずログに出す。
pub async fn build_image(ctx: Arc<RunContext>, index: usize, token: CancellationToken) -> Result<()> {
    let started = Instant::now();
    let path = ctx.plan.images[index].path.clone();

    let result = build_and_publish(&ctx, index, &token).await;

    info!(
        image = %path,
        duration = ?round_to_secs(started.elapsed()),
        success = result.is_ok(),
        "Finished"
    );

    result.map_err(|source| BuildError::Image {
        image: path,
        source: Box::new(source),
    })
}

async fn build_and_publish(ctx: &Arc<RunContext>, index: usize, token: &CancellationToken) -> Result<()> {
    let image = &ctx.plan.images[index];
    let group = Group::new(index.to_string());

    let mut builds = Scope::new(token.child_token());
    for platform in &image.platforms {
        let ctx = Arc::clone(ctx);
        let platform = platform.clone();
        let group = group.child(&platform);
        let cancel = builds.token().clone();

        builds.spawn(async move {
            let result = build_arch(&ctx, index, &platform, &group, &cancel).await;
            if let Err(err) = &result {
                report(&group, err, "failed to build image");
            }
            result
        });
    }
    builds.join().await?;

    let mut manifests = Scope::new(token.child_token());
    for registry in &image.registries {
        let ctx = Arc::clone(ctx);
        let registry = registry.clone();
        let group = group.child("manifest");
        let cancel = manifests.token().clone();

        manifests.spawn(async move {
            let result = publish_manifest(&ctx, index, &registry, &group, &cancel).await;
            if let Err(err) = &result {
                report(&group, err, "failed to publish manifest");
            }
            result
        });
    }
    manifests.join().await
}

/// `platform` 向けにまだビルドが必要なタグ（レジストリごと）
async fn tags_to_build(
    ctx: &RunContext,
    image: &ImageSpec,
    platform: &Platform,
    cancel: &CancellationToken,
) -> Vec<String> {
    let checks = image.registries.iter().map(|registry| {
        let tag = image.arch_tag(registry, platform);
        async move {
            let skip = ctx.skip.should_skip(&tag, &ctx.metadata, cancel).await;
            (tag, skip)
        }
    });

    join_all(checks)
        .await
        .into_iter()
        .filter_map(|(tag, skip)| {
            if skip {
                info!(tag = %tag, "Skipping build");
                None
            } else {
                Some(tag)
            }
        })
        .collect()
}

/// イメージ `index` の1プラットフォームをビルドし、省略されなかった全レジストリへpush
async fn build_arch(
    ctx: &RunContext,
    index: usize,
    platform: &Platform,
    group: &Group,
    cancel: &CancellationToken,
) -> Result<()> {
    let image = &ctx.plan.images[index];
    let name = format!("{}-{}", image.path, platform.arch);

    info!(group = %group, image = %name, index, "Start building...");

    let tags = tags_to_build(ctx, image, platform, cancel).await;
    if tags.is_empty() {
        info!(group = %group, image = %name, "No tags left to build");
        return Ok(());
    }

    let args = ctx.build_args(image, platform, &tags);

    ctx.runner
        .run(ctx.program(), &args, group, cancel)
        .await
        .map_err(|source| BuildError::ArchBuild {
            image: name,
            source: Box::new(source),
        })
}

/// `registry` にイメージ `index` のマルチアーキテクチャマニフェストを作成し、確認する
async fn publish_manifest(
    ctx: &RunContext,
    index: usize,
    registry: &str,
    group: &Group,
    cancel: &CancellationToken,
) -> Result<()> {
    let image = &ctx.plan.images[index];
    let provider = ctx.plan.provider;
    let target = image.manifest_tag(registry);
    let sources: Vec<String> = image
        .platforms
        .iter()
        .map(|platform| image.arch_tag(registry, platform))
        .collect();

    info!(group = %group, image = %target, "Start publishing manifest...");

    let create = provider.manifest_create_args(&target, &sources);
    if let Err(source) = ctx
        .runner
        .run(ctx.program(), &create, &group.child("create"), cancel)
        .await
    {
        return Err(BuildError::Manifest {
            tag: target,
            source: Box::new(source),
        });
    }

    let inspect = provider.manifest_inspect_args(&target);
    if let Err(source) = ctx
        .runner
        .run(ctx.program(), &inspect, &group.child("inspect"), cancel)
        .await
    {
        return Err(BuildError::Manifest {
            tag: target,
            source: Box::new(source),
        });
    }

    Ok(())
}
