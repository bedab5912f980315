//! Per-window keyboard layout switching
//!
//! The [`Switcher`] follows the compositor's event stream and reacts to two
//! kinds of events:
//!
//! - **layout changed**: remember the new layout for the focused window and
//!   the keyboard that changed.
//! - **window changed**: switch every keyboard back to the layout remembered
//!   for the newly focused window.
//!
//! Everything else on the stream is ignored.
//!
//! ## Error handling
//!
//! Malformed lines and store failures stop the loop. A layout name missing
//! from the catalog only drops the one event. Keyboards that are unplugged,
//! lack the remembered layout, or refuse the switch are skipped so the rest
//! still get switched.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::hypr_ipc::{EventKind, EventSource, HyprError, KeyboardControl, RawEvent};
use crate::resolver::{DeviceIndexCache, ResolveError};
use crate::store::{ActiveLayoutStore, StoreError};
use crate::xkb::LayoutRegistry;

/// Errors that stop (or, for [`SwitcherError::UnknownLayout`], skip) event processing
#[derive(Debug, Error)]
pub enum SwitcherError {
    #[error("invalid line: {0:?}")]
    MalformedLine(String),

    #[error("invalid layout change data: {0:?}")]
    MalformedLayoutChange(String),

    #[error("layout {0:?} not found")]
    UnknownLayout(String),

    #[error("get line: {0}")]
    EventStream(#[source] HyprError),

    #[error("save active layout: {0}")]
    SaveLayout(#[source] StoreError),

    #[error("get active layout: {0}")]
    LoadLayouts(#[source] StoreError),

    #[error("get layout index: {0}")]
    Resolve(#[source] ResolveError),
}

impl SwitcherError {
    /// Whether only the current event is lost and the loop may continue
    pub fn is_event_local(&self) -> bool {
        matches!(self, Self::UnknownLayout(_))
    }
}

/// How [`Switcher::run`] ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// Cancellation was requested
    Cancelled,
}

/// Event-driven layout switcher
pub struct Switcher<E, K, S> {
    events: E,
    control: K,
    registry: Arc<LayoutRegistry>,
    store: S,
    cache: DeviceIndexCache,
    /// Focused window class; empty until the first focus event
    active_window: String,
}

impl<E, K, S> Switcher<E, K, S>
where
    E: EventSource,
    K: KeyboardControl,
    S: ActiveLayoutStore,
{
    pub fn new(events: E, control: K, registry: Arc<LayoutRegistry>, store: S) -> Self {
        Self {
            events,
            control,
            registry,
            store,
            cache: DeviceIndexCache::new(),
            active_window: String::new(),
        }
    }

    pub fn active_window(&self) -> &str {
        &self.active_window
    }

    pub fn control(&self) -> &K {
        &self.control
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process events until cancelled or a fatal error occurs
    ///
    /// Cancellation is checked before every read and wins over a line that is
    /// already available. A read abandoned by cancellation leaves the event
    /// source unusable, so the switcher shouldn't be run again afterwards.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<LoopOutcome, SwitcherError> {
        info!("Switcher started");

        loop {
            let line = tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!("Switcher cancelled");
                    return Ok(LoopOutcome::Cancelled);
                }
                line = self.events.next_line() => line.map_err(SwitcherError::EventStream)?,
            };

            match self.handle_line(&line).await {
                Ok(()) => {}
                Err(e) if e.is_event_local() => {
                    warn!(error = %e, "Dropping event");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Apply a single event line
    pub async fn handle_line(&mut self, line: &str) -> Result<(), SwitcherError> {
        let event =
            RawEvent::parse(line).ok_or_else(|| SwitcherError::MalformedLine(line.to_string()))?;

        match event.kind {
            EventKind::LayoutChanged => self.on_layout_changed(event.payload).await,
            EventKind::WindowChanged => self.on_window_changed(event.payload).await,
            EventKind::Other => Ok(()),
        }
    }

    async fn on_layout_changed(&mut self, payload: &str) -> Result<(), SwitcherError> {
        // Only the first comma separates fields; pretty names may contain more
        let (device, pretty_name) = payload
            .split_once(',')
            .ok_or_else(|| SwitcherError::MalformedLayoutChange(payload.to_string()))?;

        let layout = self
            .registry
            .code_for(pretty_name)
            .cloned()
            .ok_or_else(|| SwitcherError::UnknownLayout(pretty_name.to_string()))?;

        debug!(
            window = %self.active_window,
            device,
            %layout,
            "Remembering layout"
        );

        self.store
            .set_active_layout(&self.active_window, device, &layout)
            .await
            .map_err(SwitcherError::SaveLayout)
    }

    async fn on_window_changed(&mut self, payload: &str) -> Result<(), SwitcherError> {
        let window = payload.split_once(',').map_or(payload, |(class, _)| class);
        self.active_window = window.to_string();

        let layouts = self
            .store
            .get_active_layouts(&self.active_window)
            .await
            .map_err(SwitcherError::LoadLayouts)?;

        for (device, layout) in &layouts {
            let idx = match self.cache.resolve(&mut self.control, device, layout).await {
                Ok(idx) => idx,
                Err(ResolveError::KeyboardNotFound { .. }) => {
                    debug!(device = %device, "Keyboard not attached, skipping");
                    continue;
                }
                Err(e @ ResolveError::LayoutNotFound { .. }) => {
                    warn!("get layout index: {}", e);
                    continue;
                }
                Err(e) => return Err(SwitcherError::Resolve(e)),
            };

            if let Err(e) = self.control.switch_layout(device, idx).await {
                warn!(device = %device, error = %e, "switch layout");
                continue;
            }

            debug!(
                window = %self.active_window,
                device = %device,
                layout = self
                    .registry
                    .pretty_name_for(&layout.code, &layout.variant)
                    .unwrap_or("?"),
                idx,
                "Switched layout"
            );
        }

        Ok(())
    }
}
