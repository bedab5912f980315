//! JSON snapshot store
//!
//! Writes are kept in memory and marked dirty; [`JsonStore::flush`] writes
//! the whole snapshot out. The file is replaced atomically (temporary file
//! plus rename), so a crash mid-write leaves the previous snapshot intact.
//!
//! ```json
//! {"foot": {"at-translated-set-2-keyboard": {"code": "ru", "variant": ""}}}
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{ActiveLayoutStore, ActiveLayouts, StoreError};
use crate::layout::Layout;

type Snapshot = BTreeMap<String, ActiveLayouts>;

#[derive(Debug)]
struct State {
    layouts: Snapshot,
    dirty: bool,
}

/// File-snapshot store flushed on an interval and at shutdown
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    state: Mutex<State>,
}

impl JsonStore {
    /// Open `path`, loading the previous snapshot if there is one
    ///
    /// A missing or empty file starts an empty store that is written on the
    /// first flush.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let content = match tokio::fs::read(path).await {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let state = match content {
            Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => {
                let layouts: Snapshot =
                    serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
                        path: path.to_path_buf(),
                        source,
                    })?;
                debug!(windows = layouts.len(), "Loaded layout snapshot");
                State {
                    layouts,
                    dirty: false,
                }
            }
            _ => State {
                layouts: Snapshot::new(),
                dirty: true,
            },
        };

        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(state),
        })
    }

    /// Write the snapshot if anything changed since the last flush
    ///
    /// Returns whether the file was written.
    pub async fn flush(&self) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        if !state.dirty {
            return Ok(false);
        }

        let json = serde_json::to_vec(&state.layouts).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        tokio::fs::write(&tmp_path, &json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(io_err)?;

        state.dirty = false;
        debug!(path = %self.path.display(), "Flushed layout snapshot");

        Ok(true)
    }

    /// Flush every `period` until cancelled, then flush one last time
    pub async fn run_flush_loop(
        &self,
        period: Duration,
        cancel: CancellationToken,
    ) -> Result<(), StoreError> {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    if self.flush().await? {
                        info!(path = %self.path.display(), "Saved layout snapshot");
                    }
                    return Ok(());
                }
                _ = ticker.tick() => {
                    self.flush().await?;
                }
            }
        }
    }
}

#[async_trait]
impl ActiveLayoutStore for JsonStore {
    async fn get_active_layouts(&self, window: &str) -> Result<ActiveLayouts, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .layouts
            .get(window)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_active_layout(
        &self,
        window: &str,
        device: &str,
        layout: &Layout,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state
            .layouts
            .entry(window.to_string())
            .or_default()
            .insert(device.to_string(), layout.clone());
        state.dirty = true;
        Ok(())
    }
}
