//! XKB layout catalog
//!
//! Hyprland reports layout changes by their human-readable description
//! ("English (US)", "Russian (phonetic)"), while keyboards are configured and
//! switched by XKB code and variant. The XKB rules catalog (`evdev.xml`) maps
//! between the two. It is read once at startup into an immutable
//! [`LayoutRegistry`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::layout::Layout;

/// Errors loading the layout catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read layout catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode layout catalog {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: quick_xml::DeError,
    },
}

// evdev.xml structure, only the parts we read

#[derive(Debug, Deserialize)]
struct XkbConfigRegistry {
    #[serde(rename = "layoutList", default)]
    layout_list: LayoutList,
}

#[derive(Debug, Default, Deserialize)]
struct LayoutList {
    #[serde(rename = "layout", default)]
    layouts: Vec<XkbLayout>,
}

#[derive(Debug, Deserialize)]
struct XkbLayout {
    #[serde(rename = "configItem")]
    config_item: ConfigItem,
    #[serde(rename = "variantList", default)]
    variant_list: VariantList,
}

#[derive(Debug, Default, Deserialize)]
struct VariantList {
    #[serde(rename = "variant", default)]
    variants: Vec<XkbVariant>,
}

#[derive(Debug, Deserialize)]
struct XkbVariant {
    #[serde(rename = "configItem")]
    config_item: ConfigItem,
}

#[derive(Debug, Deserialize)]
struct ConfigItem {
    name: String,
    #[serde(default)]
    description: String,
}

/// Bidirectional lookup between pretty layout names and `(code, variant)` pairs
///
/// When a description appears more than once, the first entry in catalog
/// order wins in both directions.
#[derive(Debug, Clone, Default)]
pub struct LayoutRegistry {
    entries: Vec<(String, Layout)>,
    by_pretty_name: HashMap<String, usize>,
    by_layout: HashMap<Layout, usize>,
}

impl LayoutRegistry {
    /// Load the catalog from an XKB rules XML file
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_xml_str(&content).map_err(|source| CatalogError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build the catalog from XKB rules XML
    pub fn from_xml_str(xml: &str) -> Result<Self, quick_xml::DeError> {
        let registry: XkbConfigRegistry = quick_xml::de::from_str(xml)?;

        let entries = registry
            .layout_list
            .layouts
            .into_iter()
            .flat_map(|layout| {
                let code = layout.config_item.name;
                let base = (
                    layout.config_item.description,
                    Layout::new(code.as_str(), ""),
                );
                let variants = layout.variant_list.variants.into_iter().map(move |variant| {
                    (
                        variant.config_item.description,
                        Layout::new(code.as_str(), variant.config_item.name),
                    )
                });
                std::iter::once(base).chain(variants)
            })
            .collect();

        Ok(Self::from_entries(entries))
    }

    /// Build the catalog from `(pretty name, layout)` pairs in priority order
    pub fn from_entries(entries: Vec<(String, Layout)>) -> Self {
        let mut by_pretty_name = HashMap::new();
        let mut by_layout = HashMap::new();

        for (idx, (pretty_name, layout)) in entries.iter().enumerate() {
            if !pretty_name.is_empty() {
                by_pretty_name.entry(pretty_name.clone()).or_insert(idx);
            }
            by_layout.entry(layout.clone()).or_insert(idx);
        }

        Self {
            entries,
            by_pretty_name,
            by_layout,
        }
    }

    /// Layout code and variant for a pretty name
    pub fn code_for(&self, pretty_name: &str) -> Option<&Layout> {
        self.by_pretty_name
            .get(pretty_name)
            .map(|&idx| &self.entries[idx].1)
    }

    /// Pretty name for a layout code and variant
    pub fn pretty_name_for(&self, code: &str, variant: &str) -> Option<&str> {
        self.by_layout
            .get(&Layout::new(code, variant))
            .map(|&idx| self.entries[idx].0.as_str())
    }

    /// All entries in catalog order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Layout)> {
        self.entries
            .iter()
            .map(|(pretty_name, layout)| (pretty_name.as_str(), layout))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
