//! hyprboard
//!
//! Remembers the keyboard layout used in each Hyprland window and restores it
//! when the window regains focus.
//!
//! - [`hypr_ipc`]: event and control sockets of the running compositor
//! - [`xkb`]: translation between pretty layout names and XKB codes
//! - [`resolver`]: layout positions on each keyboard, cached
//! - [`store`]: remembered layouts per window
//! - [`switcher`]: the event loop tying them together
//! - [`notify`]: readiness and watchdog notifications for the service manager
//! - [`daemon`]: supervision of the daemon's tasks

pub mod daemon;
pub mod hypr_ipc;
pub mod layout;
pub mod notify;
pub mod resolver;
pub mod store;
pub mod switcher;
pub mod xkb;

pub use layout::{Keyboard, Layout};
pub use switcher::{LoopOutcome, Switcher, SwitcherError};
