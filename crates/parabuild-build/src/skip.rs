//! Build skipping based on metadata already published in the registry

use crate::runner::CommandRunner;
use parabuild_core::{BuildMetadata, Provider, SkipCheck};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// The part of a raw image manifest we care about
#[derive(Debug, Default, Deserialize)]
pub struct RawManifest {
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

pub struct SkipEvaluator {
    check: SkipCheck,
    provider: Provider,
    runner: Arc<dyn CommandRunner>,
}

impl SkipEvaluator {
    pub fn new(check: SkipCheck, provider: Provider, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            check,
            provider,
            runner,
        }
    }

    pub fn enabled(&self) -> bool {
        self.check.enabled
    }

    /// True when `tag` is already published with the same value for the
    /// configured metadata key
    ///
    /// An empty local value, a missing image or a failed inspection all mean
    /// the image has to be built.
    pub async fn should_skip(
        &self,
        tag: &str,
        metadata: &BuildMetadata,
        cancel: &CancellationToken,
    ) -> bool {
        if !self.check.enabled {
            return false;
        }

        let key = self.check.key.as_str();
        let current = metadata.get(key);

        if current.is_empty() {
            debug!(tag, key, "No local value for annotation, building");
            return false;
        }

        let published = self.inspect(tag, cancel).await;
        let remote = published.annotations.get(key).map(String::as_str).unwrap_or("");

        info!(tag, key, current, remote, "Checking image annotation");

        !remote.is_empty() && current == remote
    }

    /// Fetch the published manifest of `tag`, empty when it cannot be read
    async fn inspect(&self, tag: &str, cancel: &CancellationToken) -> RawManifest {
        debug!(tag, "Inspecting docker tag");

        let args = self.provider.inspect_raw_args(tag);
        let raw = match self.runner.capture(self.provider.program(), &args, cancel).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(tag, error = %e, "Failed to inspect docker tag");
                return RawManifest::default();
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(manifest) => manifest,
            Err(e) => {
                error!(tag, error = %e, "Failed to decode docker tag");
                RawManifest::default()
            }
        }
    }
}
