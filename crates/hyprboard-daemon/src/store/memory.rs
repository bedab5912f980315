//! Volatile store, for running without persistence

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ActiveLayoutStore, ActiveLayouts, StoreError};
use crate::layout::Layout;

/// Keeps remembered layouts in memory only
#[derive(Debug, Default)]
pub struct MemoryStore {
    layouts: Mutex<HashMap<String, ActiveLayouts>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActiveLayoutStore for MemoryStore {
    async fn get_active_layouts(&self, window: &str) -> Result<ActiveLayouts, StoreError> {
        Ok(self
            .layouts
            .lock()
            .await
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
        self.layouts
            .lock()
            .await
            .entry(window.to_string())
            .or_default()
            .insert(device.to_string(), layout.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_windows_are_independent() {
        let store = MemoryStore::new();
        store
            .set_active_layout("foot", "kbd0", &Layout::new("ru", ""))
            .await
            .unwrap();
        store
            .set_active_layout("firefox", "kbd0", &Layout::new("us", ""))
            .await
            .unwrap();
        store
            .set_active_layout("foot", "kbd1", &Layout::new("de", ""))
            .await
            .unwrap();

        let foot = store.get_active_layouts("foot").await.unwrap();
        assert_eq!(foot.len(), 2);
        assert_eq!(foot["kbd0"], Layout::new("ru", ""));
        assert_eq!(
            store.get_active_layouts("firefox").await.unwrap()["kbd0"],
            Layout::new("us", "")
        );
    }

    #[tokio::test]
    async fn test_empty_window_is_a_valid_key() {
        let store = MemoryStore::new();
        store
            .set_active_layout("", "kbd0", &Layout::new("ru", ""))
            .await
            .unwrap();

        assert_eq!(store.get_active_layouts("").await.unwrap().len(), 1);
        assert!(store.get_active_layouts("foot").await.unwrap().is_empty());
    }
}
