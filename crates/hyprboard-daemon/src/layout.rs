//! Keyboard and layout value types shared by the switcher, resolver and stores

use serde::{Deserialize, Serialize};

/// One configured keyboard mapping: an XKB layout code and its variant
///
/// The variant is empty for the base layout (e.g. `us` with variant `""`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Layout {
    #[serde(alias = "Code")]
    pub code: String,
    #[serde(alias = "Variant", default)]
    pub variant: String,
}

impl Layout {
    pub fn new(code: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            variant: variant.into(),
        }
    }
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.variant.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}({})", self.code, self.variant)
        }
    }
}

/// A keyboard as reported by the compositor
///
/// `layouts` and `variants` are parallel: position `i` of each together is one
/// configured mapping, and `i` is what `switchxkblayout` addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyboard {
    pub name: String,
    pub layouts: Vec<String>,
    pub variants: Vec<String>,
}

impl Keyboard {
    /// Build a keyboard from the comma-joined strings the compositor reports
    ///
    /// A shorter variant list is padded with empty variants so both sequences
    /// always have the same length.
    pub fn from_joined(name: impl Into<String>, layouts: &str, variants: &str) -> Self {
        let layouts: Vec<String> = layouts.split(',').map(str::to_string).collect();
        let mut variants: Vec<String> = variants.split(',').map(str::to_string).collect();
        variants.resize(layouts.len(), String::new());

        Self {
            name: name.into(),
            layouts,
            variants,
        }
    }

    /// Position of `layout` in this keyboard's configured list
    pub fn index_of(&self, layout: &Layout) -> Option<usize> {
        self.layouts
            .iter()
            .zip(&self.variants)
            .position(|(code, variant)| *code == layout.code && *variant == layout.variant)
    }

    /// Configured mappings in index order
    pub fn configured(&self) -> impl Iterator<Item = Layout> + '_ {
        self.layouts
            .iter()
            .zip(&self.variants)
            .map(|(code, variant)| Layout::new(code.as_str(), variant.as_str()))
    }
}
