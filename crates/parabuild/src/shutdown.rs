use parabuild_build::CancellationToken;
use std::time::Duration;
use tokio::signal;
use tracing::{error, warn};

/// 終了前に、停止したビルドが出力を吐き出すための猶予
pub const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// SIGINT または SIGTERM を待つ
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// 1回目のシグナルで `cancel` をキャンセルし、2回目で終了する
pub fn watch_signals(cancel: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received signal, cancelling builds");
        cancel.cancel();

        shutdown_signal().await;
        warn!("Received second signal, exiting");
        std::process::exit(1);
    });
}
