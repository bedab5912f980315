//! Configuration parsing for hyprboard
//!
//! This crate handles parsing the KDL configuration file that controls where
//! the daemon keeps its state, which XKB catalog it reads and how it talks
//! to the compositor.

mod error;
mod model;
mod parser;

pub use error::ConfigError;
pub use model::*;
pub use parser::{parse_config, parse_config_str, load_config};
