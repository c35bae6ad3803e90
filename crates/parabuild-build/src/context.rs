use crate::runner::CommandRunner;
use crate::skip::SkipEvaluator;
use parabuild_core::{BuildMetadata, BuildPlan, ImageSpec, Platform};
use std::sync::Arc;

/// 1回の実行の全タスクで共有する読み取り専用の状態
pub struct RunContext {
    pub plan: BuildPlan,
    pub metadata: BuildMetadata,
    pub runner: Arc<dyn CommandRunner>,
    pub skip: SkipEvaluator,
}

impl RunContext {
    pub fn new(plan: BuildPlan, metadata: BuildMetadata, runner: Arc<dyn CommandRunner>) -> Self {
        let skip = SkipEvaluator::new(plan.skip_check.clone(), plan.provider, Arc::clone(&runner));

        Self {
            plan,
            metadata,
            runner,
            skip,
        }
    }

    pub fn program(&self) -> &'static str {
        self.plan.provider.program()
    }

    /// `image` を `platform` 向けにビルドし `tags` としてpushする引数一式
    pub fn build_args(&self, image: &ImageSpec, platform: &Platform, tags: &[String]) -> Vec<String> {
        let mut args = self.plan.provider.build_args(image.attestation);
        args.extend(self.plan.provider_args.iter().cloned());

        args.push(format!("--platform={}", platform));
        args.push(format!("--file={}", image.dockerfile.display()));
        args.push(image.context.display().to_string());
        args.extend(image.build_args.iter().cloned());

        args.extend(self.metadata.labels());
        args.extend(self.metadata.annotations());
        args.extend(tags.iter().map(|tag| format!("--tag={}", tag)));

        args
    }
}
