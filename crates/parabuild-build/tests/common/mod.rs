//! オーケストレーションテスト用の記録するコマンドランナー

#![allow(dead_code)]

use async_trait::async_trait;
use parabuild_build::{BuildError, CancellationToken, CommandRunner, Group, Result};
use parabuild_core::{BuildPlan, ImageSpec, Platform, Provider, SkipCheck};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Build,
    ManifestCreate,
    ManifestInspect,
    Other,
}

impl Kind {
    fn of(args: &[String]) -> Self {
        match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["buildx", "build", ..] => Kind::Build,
            ["buildx", "imagetools", "create", ..] => Kind::ManifestCreate,
            ["buildx", "imagetools", "inspect", ..] => Kind::ManifestInspect,
            _ => Kind::Other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Command {
    pub program: String,
    pub args: Vec<String>,
    pub group: String,
    pub kind: Kind,
    pub start: usize,
    pub end: Option<usize>,
    pub cancelled: bool,
}

/// 全コマンドを開始・終了の通し番号付きで記録する
///
/// 引数に `failing` のパターンを含むコマンドは終了コード1で失敗し、
/// `hanging` のパターンを含むコマンドはキャンセルされるまでブロックする。
#[derive(Default)]
pub struct FakeRunner {
    seq: AtomicUsize,
    commands: Mutex<Vec<Command>>,
    inspections: Mutex<Vec<String>>,
    responses: HashMap<String, String>,
    failing: Vec<String>,
    hanging: Vec<String>,
    delay: Duration,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, pattern: &str) -> Self {
        self.failing.push(pattern.to_string());
        self
    }

    pub fn hanging(mut self, pattern: &str) -> Self {
        self.hanging.push(pattern.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// `tag` をinspectしたときに返す生マニフェスト。未登録のタグは失敗する
    pub fn inspect(mut self, tag: &str, body: &str) -> Self {
        self.responses.insert(tag.to_string(), body.to_string());
        self
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    pub fn commands_of(&self, kind: Kind) -> Vec<Command> {
        self.commands().into_iter().filter(|c| c.kind == kind).collect()
    }

    pub fn commands_for_image(&self, index: usize, kind: Kind) -> Vec<Command> {
        let prefix = format!("{}/", index);
        self.commands_of(kind)
            .into_iter()
            .filter(|c| c.group.starts_with(&prefix))
            .collect()
    }

    pub fn count(&self, kind: Kind) -> usize {
        self.commands_of(kind).len()
    }

    pub fn first_start(&self, index: usize, kind: Kind) -> Option<usize> {
        self.commands_for_image(index, kind).iter().map(|c| c.start).min()
    }

    pub fn last_end(&self, index: usize, kind: Kind) -> Option<usize> {
        self.commands_for_image(index, kind)
            .iter()
            .filter_map(|c| c.end)
            .max()
    }

    pub fn cancelled_groups(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| c.cancelled)
            .map(|c| c.group)
            .collect()
    }

    pub fn inspections(&self) -> Vec<String> {
        self.inspections.lock().unwrap().clone()
    }

    pub async fn wait_for_started(&self, kind: Kind, count: usize) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while self.count(kind) < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("commands did not start in time");
    }

    fn next(&self) -> usize {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    fn finish(&self, slot: usize, cancelled: bool) {
        let end = self.next();
        let mut commands = self.commands.lock().unwrap();
        commands[slot].end = Some(end);
        commands[slot].cancelled = cancelled;
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        group: &Group,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let line = args.join(" ");
        let slot = {
            let mut commands = self.commands.lock().unwrap();
            commands.push(Command {
                program: program.to_string(),
                args: args.to_vec(),
                group: group.to_string(),
                kind: Kind::of(args),
                start: self.next(),
                end: None,
                cancelled: false,
            });
            commands.len() - 1
        };

        if self.hanging.iter().any(|p| line.contains(p.as_str())) {
            cancel.cancelled().await;
            self.finish(slot, true);
            return Err(BuildError::Cancelled);
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.finish(slot, false);

        if self.failing.iter().any(|p| line.contains(p.as_str())) {
            return Err(BuildError::CommandFailed {
                program: program.to_string(),
                code: Some(1),
            });
        }
        Ok(())
    }

    async fn capture(&self, program: &str, args: &[String], _: &CancellationToken) -> Result<Vec<u8>> {
        let tag = args.last().cloned().unwrap_or_default();
        self.inspections.lock().unwrap().push(tag.clone());

        match self.responses.get(&tag) {
            Some(body) => Ok(body.clone().into_bytes()),
            None => Err(BuildError::CommandFailed {
                program: program.to_string(),
                code: Some(1),
            }),
        }
    }
}

pub fn image(path: &str, platforms: &[&str], registries: &[&str]) -> ImageSpec {
    ImageSpec {
        path: path.to_string(),
        context: PathBuf::from("."),
        dockerfile: PathBuf::from("Dockerfile"),
        build_args: Vec::new(),
        platforms: platforms
            .iter()
            .map(|p| p.parse::<Platform>().unwrap())
            .collect(),
        registries: registries.iter().map(|r| r.to_string()).collect(),
        attestation: false,
    }
}

pub fn plan(images: Vec<ImageSpec>) -> BuildPlan {
    BuildPlan {
        images,
        provider: Provider::Buildx,
        provider_args: Vec::new(),
        skip_check: SkipCheck::default(),
    }
}
