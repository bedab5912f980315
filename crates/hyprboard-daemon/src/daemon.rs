//! Task supervision
//!
//! The daemon runs up to three tasks: the switcher, the JSON flush loop
//! (only for the JSON store) and the watchdog. Each reports failure on its
//! own sender. The first failure or a shutdown signal cancels all of them,
//! and every task is awaited before returning so the JSON store gets its
//! final flush.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::hypr_ipc::{EventSource, KeyboardControl};
use crate::notify;
use crate::store::LayoutStore;
use crate::switcher::{LoopOutcome, Switcher};

/// Run every task until `shutdown` resolves or one fails, then wind them down
///
/// Returns the first task failure, or the error from `shutdown` itself.
pub async fn supervise<E, K, F>(
    mut switcher: Switcher<E, K, Arc<LayoutStore>>,
    store: Arc<LayoutStore>,
    flush_interval: Duration,
    shutdown: F,
) -> Result<()>
where
    E: EventSource + 'static,
    K: KeyboardControl + 'static,
    F: Future<Output = Result<()>>,
{
    let cancel = CancellationToken::new();
    let (err_tx, mut err_rx) = mpsc::channel::<anyhow::Error>(3);
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    tasks.push(tokio::spawn({
        let cancel = cancel.clone();
        let err_tx = err_tx.clone();
        async move {
            match switcher.run(&cancel).await {
                Ok(LoopOutcome::Cancelled) => {}
                Err(e) => {
                    let _ = err_tx.send(anyhow::Error::new(e).context("process lines")).await;
                }
            }
        }
    }));

    if store.buffered().is_some() {
        tasks.push(tokio::spawn({
            let cancel = cancel.clone();
            let err_tx = err_tx.clone();
            let store = Arc::clone(&store);
            async move {
                let Some(json) = store.buffered() else {
                    return;
                };
                if let Err(e) = json.run_flush_loop(flush_interval, cancel).await {
                    let _ = err_tx.send(anyhow::Error::new(e).context("flush state")).await;
                }
            }
        }));
    }

    tasks.push(tokio::spawn({
        let cancel = cancel.clone();
        let err_tx = err_tx.clone();
        async move {
            if let Err(e) = notify::run_watchdog(cancel).await {
                let _ = err_tx.send(anyhow::Error::new(e).context("watchdog")).await;
            }
        }
    }));

    // Only the tasks hold senders now, so the channel closes once they all finish
    drop(err_tx);

    let failure = tokio::select! {
        res = shutdown => match res {
            Ok(()) => {
                info!("Shutting down...");
                None
            }
            Err(e) => Some(e),
        },
        Some(err) = err_rx.recv() => Some(err),
    };

    cancel.cancel();

    let mut panicked = None;
    for task in tasks {
        if let Err(e) = task.await {
            error!("Task panicked: {}", e);
            panicked.get_or_insert(e);
        }
    }

    if let Some(err) = failure {
        return Err(err);
    }
    match panicked {
        Some(e) => Err(anyhow::Error::new(e).context("task panicked")),
        None => Ok(()),
    }
}

/// Resolves on SIGINT or SIGTERM
pub async fn shutdown_signal() -> Result<()> {
    let mut terminate = signal(SignalKind::terminate()).context("install SIGTERM handler")?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => res.context("wait for SIGINT")?,
        _ = terminate.recv() => {}
    }

    Ok(())
}
