//! Device layout index resolution
//!
//! `switchxkblayout` addresses layouts by their position in a keyboard's
//! configured list. [`DeviceIndexCache`] finds that position for a
//! `(device, layout)` pair, asking the compositor only on a cache miss.
//!
//! Resolved indices are kept for the lifetime of the process: a keyboard's
//! configured list is assumed not to change while the daemon runs.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::hypr_ipc::{HyprError, KeyboardControl};
use crate::layout::Layout;

/// Errors resolving a layout index
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No keyboard with this name is currently attached
    #[error("keyboard not found ({device:?})")]
    KeyboardNotFound { device: String },

    /// The keyboard exists but doesn't have this layout configured
    #[error("layout not found ({layout}) for keyboard {device:?}")]
    LayoutNotFound { device: String, layout: Layout },

    /// Listing keyboards failed
    #[error("get keyboards: {0}")]
    Control(#[from] HyprError),
}

/// Memoized `device -> (layout -> index)` lookups
#[derive(Debug, Default)]
pub struct DeviceIndexCache {
    indices: HashMap<String, HashMap<Layout, usize>>,
}

impl DeviceIndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached index, if this pair was resolved before
    pub fn get(&self, device: &str, layout: &Layout) -> Option<usize> {
        self.indices.get(device)?.get(layout).copied()
    }

    /// Find the index of `layout` on `device`
    ///
    /// On a miss the keyboards are listed fresh through `control`. If several
    /// keyboards share the name, the last one listed is used.
    pub async fn resolve<K>(
        &mut self,
        control: &mut K,
        device: &str,
        layout: &Layout,
    ) -> Result<usize, ResolveError>
    where
        K: KeyboardControl + ?Sized,
    {
        if let Some(idx) = self.get(device, layout) {
            return Ok(idx);
        }

        let keyboards = control.list_keyboards().await?;

        let mut matches = keyboards.iter().filter(|kb| kb.name == device);
        let Some(mut keyboard) = matches.next() else {
            return Err(ResolveError::KeyboardNotFound {
                device: device.to_string(),
            });
        };
        if let Some(last) = matches.last() {
            warn!(device, "Several keyboards share this name, using the last one");
            keyboard = last;
        }

        let Some(idx) = keyboard.index_of(layout) else {
            return Err(ResolveError::LayoutNotFound {
                device: device.to_string(),
                layout: layout.clone(),
            });
        };

        debug!(device, %layout, idx, "Resolved layout index");

        self.indices
            .entry(device.to_string())
            .or_default()
            .insert(layout.clone(), idx);

        Ok(idx)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::layout::Keyboard;
    use async_trait::async_trait;

    /// In-memory compositor that counts calls and records switches
    #[derive(Debug, Default)]
    pub(crate) struct FakeControl {
        pub keyboards: Vec<Keyboard>,
        pub list_calls: usize,
        pub switches: Vec<(String, usize)>,
        pub reject_devices: Vec<String>,
        pub fail_listing: bool,
    }

    impl FakeControl {
        pub fn with_keyboards(keyboards: Vec<Keyboard>) -> Self {
            Self {
                keyboards,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl KeyboardControl for FakeControl {
        async fn list_keyboards(&mut self) -> Result<Vec<Keyboard>, HyprError> {
            self.list_calls += 1;
            if self.fail_listing {
                return Err(HyprError::ConnectionClosed);
            }
            Ok(self.keyboards.clone())
        }

        async fn switch_layout(&mut self, device: &str, index: usize) -> Result<(), HyprError> {
            if self.reject_devices.iter().any(|d| d == device) {
                return Err(HyprError::CommandRejected {
                    kind: crate::hypr_ipc::RejectionKind::DeviceNotFound,
                    message: "device not found".to_string(),
                });
            }
            self.switches.push((device.to_string(), index));
            Ok(())
        }
    }

    fn keyboards() -> Vec<Keyboard> {
        vec![
            Keyboard::from_joined("kbd0", "us,ru,de", ",,nodeadkeys"),
            Keyboard::from_joined("kbd1", "us", ""),
        ]
    }

    #[tokio::test]
    async fn test_resolves_index() {
        let mut control = FakeControl::with_keyboards(keyboards());
        let mut cache = DeviceIndexCache::new();

        let idx = cache
            .resolve(&mut control, "kbd0", &Layout::new("de", "nodeadkeys"))
            .await
            .unwrap();
        assert_eq!(idx, 2);
    }

    #[tokio::test]
    async fn test_second_resolve_hits_cache() {
        let mut control = FakeControl::with_keyboards(keyboards());
        let mut cache = DeviceIndexCache::new();
        let russian = Layout::new("ru", "");

        assert_eq!(cache.resolve(&mut control, "kbd0", &russian).await.unwrap(), 1);
        assert_eq!(cache.resolve(&mut control, "kbd0", &russian).await.unwrap(), 1);
        assert_eq!(control.list_calls, 1);
    }

    #[tokio::test]
    async fn test_unknown_keyboard() {
        let mut control = FakeControl::with_keyboards(keyboards());
        let mut cache = DeviceIndexCache::new();

        let result = cache
            .resolve(&mut control, "kbd9", &Layout::new("us", ""))
            .await;
        assert!(matches!(result, Err(ResolveError::KeyboardNotFound { device }) if device == "kbd9"));
    }

    #[tokio::test]
    async fn test_unconfigured_layout() {
        let mut control = FakeControl::with_keyboards(keyboards());
        let mut cache = DeviceIndexCache::new();

        let result = cache
            .resolve(&mut control, "kbd1", &Layout::new("ru", ""))
            .await;
        assert!(matches!(result, Err(ResolveError::LayoutNotFound { .. })));
        assert_eq!(cache.get("kbd1", &Layout::new("ru", "")), None);
    }

    #[tokio::test]
    async fn test_variant_must_match() {
        let mut control = FakeControl::with_keyboards(keyboards());
        let mut cache = DeviceIndexCache::new();

        let result = cache
            .resolve(&mut control, "kbd0", &Layout::new("de", ""))
            .await;
        assert!(matches!(result, Err(ResolveError::LayoutNotFound { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_names_use_last_match() {
        let mut control = FakeControl::with_keyboards(vec![
            Keyboard::from_joined("kbd0", "us,ru", ","),
            Keyboard::from_joined("kbd0", "ru,us", ","),
        ]);
        let mut cache = DeviceIndexCache::new();

        let idx = cache
            .resolve(&mut control, "kbd0", &Layout::new("ru", ""))
            .await
            .unwrap();
        assert_eq!(idx, 0);
    }

    #[tokio::test]
    async fn test_listing_failure_propagates() {
        let mut control = FakeControl {
            fail_listing: true,
            ..FakeControl::default()
        };
        let mut cache = DeviceIndexCache::new();

        let result = cache
            .resolve(&mut control, "kbd0", &Layout::new("us", ""))
            .await;
        assert!(matches!(result, Err(ResolveError::Control(_))));
    }
}
