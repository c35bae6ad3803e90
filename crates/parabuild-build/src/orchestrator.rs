use crate::context::RunContext;
use crate::error::Result;
use crate::group::Group;
use crate::runner::CommandRunner;
use crate::scope::Scope;
use crate::task::{build_image, report};
use parabuild_core::{BuildMetadata, BuildPlan};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// ビルド計画の全イメージを並行にビルドする
///
/// ```ignore
/// let orchestrator = Orchestrator::new(plan, BuildMetadata::from_env(), Arc::new(ProcessRunner::default()));
/// orchestrator.run(CancellationToken::new()).await?;
/// ```
pub struct Orchestrator {
    ctx: Arc<RunContext>,
}

impl Orchestrator {
    pub fn new(plan: BuildPlan, metadata: BuildMetadata, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            ctx: Arc::new(RunContext::new(plan, metadata, runner)),
        }
    }

    /// 計画全体を実行
    ///
    /// 最初の失敗で残りの作業をすべてキャンセルし、起動済みのタスクが
    /// 終わるのを待ってからその失敗を返す。`cancel` をキャンセルした場合も
    /// 同様に停止し、キャンセルエラーを返す。
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        self.ctx.plan.validate()?;

        info!(
            images = self.ctx.plan.images.len(),
            provider = %self.ctx.plan.provider,
            skip_check = self.ctx.skip.enabled(),
            "Application is running"
        );
        debug!(plan = ?self.ctx.plan, "Build plan");

        let mut root = Scope::new(cancel.child_token());

        for index in 0..self.ctx.plan.images.len() {
            let ctx = Arc::clone(&self.ctx);
            let token = root.token().clone();

            root.spawn(async move {
                let result = build_image(ctx, index, token).await;
                if let Err(err) = &result {
                    report(&Group::new(index.to_string()), err, "image failed");
                }
                result
            });
        }

        root.join().await
    }
}
