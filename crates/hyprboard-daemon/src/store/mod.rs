//! Remembered layouts per window
//!
//! The switcher records which layout each keyboard was using while a window
//! had focus, and reads those records back when the window is focused again.
//! [`ActiveLayoutStore`] is that contract; [`LayoutStore`] selects one of
//! three backends from the configured state file:
//!
//! | State file | Backend | Durability |
//! |------------|---------|------------|
//! | `-` | [`MemoryStore`] | lost on exit |
//! | `*.json` | [`JsonStore`] | snapshot flushed periodically and on shutdown |
//! | `*.db` | [`SqliteStore`] | every write committed immediately |

mod json;
mod memory;
mod sqlite;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::layout::Layout;

pub use json::JsonStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Layout per device for one window
pub type ActiveLayouts = BTreeMap<String, Layout>;

/// Errors reading or writing remembered layouts
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("State file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("State file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("sqlite: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("Unknown state file type {path:?}, expected *.json, *.db or -")]
    UnknownBackend { path: PathBuf },
}

/// Per-window layout memory
///
/// `set_active_layout` is an upsert: it either applies fully or not at all.
#[async_trait]
pub trait ActiveLayoutStore: Send + Sync {
    /// Layouts recorded for `window`, empty if none
    async fn get_active_layouts(&self, window: &str) -> Result<ActiveLayouts, StoreError>;

    /// Record `layout` as the last one used on `device` in `window`
    async fn set_active_layout(
        &self,
        window: &str,
        device: &str,
        layout: &Layout,
    ) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: ActiveLayoutStore + ?Sized> ActiveLayoutStore for Arc<T> {
    async fn get_active_layouts(&self, window: &str) -> Result<ActiveLayouts, StoreError> {
        (**self).get_active_layouts(window).await
    }

    async fn set_active_layout(
        &self,
        window: &str,
        device: &str,
        layout: &Layout,
    ) -> Result<(), StoreError> {
        (**self).set_active_layout(window, device, layout).await
    }
}

/// Which backend a state file selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Json,
    Sqlite,
}

impl StoreBackend {
    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        if path.as_os_str() == "-" {
            return Ok(Self::Memory);
        }

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("db") => Ok(Self::Sqlite),
            _ => Err(StoreError::UnknownBackend {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// The configured store backend, chosen once at startup
#[derive(Debug)]
pub enum LayoutStore {
    Memory(MemoryStore),
    Json(JsonStore),
    Sqlite(SqliteStore),
}

impl LayoutStore {
    /// Open the backend selected by `state_file`
    ///
    /// Parent directories of file-backed stores are created as needed.
    pub async fn open(state_file: &Path) -> Result<Self, StoreError> {
        let backend = StoreBackend::from_path(state_file)?;

        if backend != StoreBackend::Memory {
            create_parent_dir(state_file).await?;
        }

        let store = match backend {
            StoreBackend::Memory => Self::Memory(MemoryStore::new()),
            StoreBackend::Json => Self::Json(JsonStore::open(state_file).await?),
            StoreBackend::Sqlite => Self::Sqlite(SqliteStore::open(state_file).await?),
        };

        tracing::info!(backend = ?backend, path = %state_file.display(), "Opened layout store");

        Ok(store)
    }

    pub fn backend(&self) -> StoreBackend {
        match self {
            Self::Memory(_) => StoreBackend::Memory,
            Self::Json(_) => StoreBackend::Json,
            Self::Sqlite(_) => StoreBackend::Sqlite,
        }
    }

    /// The store if it buffers writes and needs a flush task
    pub fn buffered(&self) -> Option<&JsonStore> {
        match self {
            Self::Json(store) => Some(store),
            _ => None,
        }
    }

    /// Release backend resources
    pub async fn close(&self) {
        if let Self::Sqlite(store) = self {
            store.close().await;
        }
    }
}

#[async_trait]
impl ActiveLayoutStore for LayoutStore {
    async fn get_active_layouts(&self, window: &str) -> Result<ActiveLayouts, StoreError> {
        match self {
            Self::Memory(store) => store.get_active_layouts(window).await,
            Self::Json(store) => store.get_active_layouts(window).await,
            Self::Sqlite(store) => store.get_active_layouts(window).await,
        }
    }

    async fn set_active_layout(
        &self,
        window: &str,
        device: &str,
        layout: &Layout,
    ) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.set_active_layout(window, device, layout).await,
            Self::Json(store) => store.set_active_layout(window, device, layout).await,
            Self::Sqlite(store) => store.set_active_layout(window, device, layout).await,
        }
    }
}

async fn create_parent_dir(path: &Path) -> Result<(), StoreError> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };

    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_backend_from_path() {
        assert_eq!(StoreBackend::from_path(Path::new("-")).unwrap(), StoreBackend::Memory);
        assert_eq!(
            StoreBackend::from_path(Path::new("/tmp/state.json")).unwrap(),
            StoreBackend::Json
        );
        assert_eq!(
            StoreBackend::from_path(Path::new("/tmp/data.db")).unwrap(),
            StoreBackend::Sqlite
        );
        assert!(matches!(
            StoreBackend::from_path(Path::new("/tmp/state.yaml")),
            Err(StoreError::UnknownBackend { .. })
        ));
        assert!(matches!(
            StoreBackend::from_path(Path::new("/tmp/state")),
            Err(StoreError::UnknownBackend { .. })
        ));
    }

    #[tokio::test]
    async fn test_open_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("hyprboard").join("state.json");

        let store = LayoutStore::open(&path).await.unwrap();
        assert_eq!(store.backend(), StoreBackend::Json);
        assert!(store.buffered().is_some());
        assert!(path.parent().unwrap().is_dir());
    }

    #[tokio::test]
    async fn test_selected_backends_share_the_contract() {
        let dir = tempdir().unwrap();

        for state_file in [
            PathBuf::from("-"),
            dir.path().join("state.json"),
            dir.path().join("data.db"),
        ] {
            let store = LayoutStore::open(&state_file).await.unwrap();

            store
                .set_active_layout("foot", "kbd0", &Layout::new("ru", ""))
                .await
                .unwrap();
            store
                .set_active_layout("foot", "kbd0", &Layout::new("us", "dvorak"))
                .await
                .unwrap();

            let layouts = store.get_active_layouts("foot").await.unwrap();
            assert_eq!(layouts.len(), 1, "backend {:?}", store.backend());
            assert_eq!(layouts["kbd0"], Layout::new("us", "dvorak"));
            assert!(store.get_active_layouts("firefox").await.unwrap().is_empty());

            store.close().await;
        }
    }

    #[tokio::test]
    async fn test_shared_store_through_arc() {
        let store = Arc::new(LayoutStore::Memory(MemoryStore::new()));
        let other = Arc::clone(&store);

        store
            .set_active_layout("", "kbd0", &Layout::new("de", ""))
            .await
            .unwrap();
        assert_eq!(
            other.get_active_layouts("").await.unwrap()["kbd0"],
            Layout::new("de", "")
        );
    }
}
