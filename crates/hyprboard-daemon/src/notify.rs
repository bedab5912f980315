//! Service manager notifications
//!
//! Readiness, status text, watchdog keep-alives and the stopping notice,
//! sent through `sd-notify`. Everything is a no-op when the daemon isn't
//! started by systemd.

use std::time::Duration;

use sd_notify::NotifyState;
use thiserror::Error;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const STATUS: &str = "Switching keyboard layouts per window";

#[derive(Debug, Error)]
#[error("notify service manager: {0}")]
pub struct NotifyError(#[from] std::io::Error);

fn supervised() -> bool {
    std::env::var_os("NOTIFY_SOCKET").is_some_and(|socket| !socket.is_empty())
}

/// Keep-alive period for a watchdog timeout of `usec` microseconds
///
/// Half the timeout, `None` when the watchdog is disabled.
pub fn keepalive_period(usec: u64) -> Option<Duration> {
    (usec > 0).then(|| Duration::from_micros(usec) / 2)
}

/// Tell the service manager the daemon is up
pub fn notify_ready() -> Result<(), NotifyError> {
    sd_notify::notify(false, &[NotifyState::Ready, NotifyState::Status(STATUS)])?;
    Ok(())
}

/// Announce readiness and feed the watchdog until cancelled
///
/// Returns immediately when there is no service manager or no watchdog.
pub async fn run_watchdog(cancel: CancellationToken) -> Result<(), NotifyError> {
    if !supervised() {
        debug!("NOTIFY_SOCKET not set, skipping service notifications");
        return Ok(());
    }

    notify_ready()?;
    info!("Notified service manager of readiness");

    // Also checks WATCHDOG_PID against our own pid
    let mut usec = 0;
    if !sd_notify::watchdog_enabled(false, &mut usec) {
        return Ok(());
    }
    let Some(period) = keepalive_period(usec) else {
        return Ok(());
    };

    debug!(period_ms = period.as_millis() as u64, "Watchdog enabled");

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => return Ok(()),
            _ = ticker.tick() => sd_notify::notify(false, &[NotifyState::Watchdog])?,
        }
    }
}

/// Tell the service manager that shutdown has begun
pub fn notify_stopping() {
    if let Err(e) = sd_notify::notify(false, &[NotifyState::Stopping]) {
        warn!("{}", NotifyError(e));
    }
}
