//! Hyprland IPC for compositor integration
//!
//! This module provides communication with the Hyprland compositor via its
//! two per-session Unix sockets. It enables hyprboard to:
//! - Follow focus and keyboard layout changes as they happen
//! - List keyboards and their configured layouts
//! - Switch a keyboard to one of its configured layouts
//!
//! ## Architecture
//!
//! - `EventStream`: read-only connection to `.socket2.sock`, one line per event
//! - `ControlClient`: request/response connection to `.socket.sock`
//! - `HyprError`: error types for IPC operations
//!
//! `EventSource` and `KeyboardControl` are the seams the switcher is written
//! against, so it can be driven by scripted fakes in tests.

mod client;
mod error;
mod events;
mod types;

pub use client::{
    get_socket_path, resolve_socket_path, ControlClient, KeyboardControl, SocketKind,
    READ_BUFFER_SIZE,
};
pub use error::{HyprError, RejectionKind};
pub use events::{EventSource, EventStream};
pub use types::{DevicesResponse, EventKind, KeyboardInfo, RawEvent, EVENT_DELIMITER};
