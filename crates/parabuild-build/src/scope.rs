//! 実行スコープ: ファンアウトの階層ごとに、キャンセルトークン1つと合流点1つ
//!
//! 最初に失敗したタスクがエラーを記録し、スコープのトークンをキャンセルする。
//! 実行中のタスクは渡されたトークンでキャンセルを検知し、以降は新しいタスクを起動しない。
//! 親トークンから作ったスコープは親と一緒にキャンセルされるが、逆は起きない。

use crate::error::{BuildError, Result};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct Scope {
    token: CancellationToken,
    tasks: JoinSet<()>,
    cause: Arc<Mutex<Option<BuildError>>>,
}

fn record(cause: &Mutex<Option<BuildError>>, err: BuildError) {
    let mut cause = cause.lock().unwrap_or_else(PoisonError::into_inner);
    if cause.is_none() {
        *cause = Some(err);
    }
}

impl Scope {
    /// `token` で管理されるスコープ。入れ子にするには `parent.child_token()` を渡す
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            tasks: JoinSet::new(),
            cause: Arc::new(Mutex::new(None)),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// スコープがキャンセル済みでなければ `task` を起動する
    ///
    /// 起動したかどうかを返す。
    pub fn spawn<F>(&mut self, task: F) -> bool
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        if self.token.is_cancelled() {
            debug!("Scope cancelled, not starting task");
            return false;
        }

        let token = self.token.clone();
        let cause = Arc::clone(&self.cause);

        self.tasks.spawn(async move {
            if let Err(err) = task.await {
                // キャンセルより先に記録する（兄弟のキャンセルエラーより原因を優先）
                record(&cause, err);
                token.cancel();
            }
        });

        true
    }

    /// 起動済みの全タスクを待つ
    ///
    /// 最初に記録された失敗、外部からキャンセルされた場合は
    /// [`BuildError::Cancelled`]、それ以外は `Ok(())` を返す。
    pub async fn join(mut self) -> Result<()> {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(err) = joined {
                record(&self.cause, BuildError::Panicked(err.to_string()));
                self.token.cancel();
            }
        }

        let cause = self
            .cause
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match cause {
            Some(err) => Err(err),
            None if self.token.is_cancelled() => Err(BuildError::Cancelled),
            None => Ok(()),
        }
    }
}
