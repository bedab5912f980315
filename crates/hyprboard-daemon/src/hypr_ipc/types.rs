//! Wire types for the Hyprland sockets
//!
//! The control socket answers `j/devices` with a JSON document; the event
//! socket emits one `<event>>><payload>` line per compositor event. This module
//! holds the serde types for the former and the line splitter for the latter,
//! converting both into the daemon's own types.

use serde::Deserialize;

use crate::layout::Keyboard;

/// Delimiter between event name and payload on the event socket
pub const EVENT_DELIMITER: &str = ">>";

/// Top-level `j/devices` document (only the part we consume)
#[derive(Debug, Clone, Deserialize)]
pub struct DevicesResponse {
    #[serde(default)]
    pub keyboards: Vec<KeyboardInfo>,
}

/// One entry of `keyboards` in `j/devices`
///
/// `layout` and `variant` are comma-joined lists in index order.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyboardInfo {
    pub name: String,
    #[serde(default)]
    pub layout: String,
    #[serde(default)]
    pub variant: String,
    #[serde(default)]
    pub options: String,
    #[serde(default)]
    pub active_keymap: String,
}

impl From<KeyboardInfo> for Keyboard {
    fn from(info: KeyboardInfo) -> Self {
        Keyboard::from_joined(info.name, &info.layout, &info.variant)
    }
}

/// Event types the switcher reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A keyboard switched layout: payload `<device>,<pretty layout name>`
    LayoutChanged,
    /// Focus moved: payload `<window class>,<title>`
    WindowChanged,
    /// Anything else Hyprland sends
    Other,
}

impl EventKind {
    // Hyprland spells these `activelayout` / `activewindow` on the wire.
    fn from_name(name: &str) -> Self {
        match name {
            "activelayout" | "layout-changed" => Self::LayoutChanged,
            "activewindow" | "window-changed" => Self::WindowChanged,
            _ => Self::Other,
        }
    }
}

/// One event line split into its kind and payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent<'a> {
    pub kind: EventKind,
    pub payload: &'a str,
}

impl<'a> RawEvent<'a> {
    /// Split a line on the first `>>`; `None` if the delimiter is missing
    pub fn parse(line: &'a str) -> Option<Self> {
        let (name, payload) = line.split_once(EVENT_DELIMITER)?;
        Some(Self {
            kind: EventKind::from_name(name),
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_devices_response_to_keyboards() {
        let json = r#"{
            "mice": [{"address": "0x1", "name": "mouse"}],
            "keyboards": [
                {
                    "address": "0x55d1",
                    "name": "at-translated-set-2-keyboard",
                    "rules": "", "model": "",
                    "layout": "us,ru",
                    "variant": ",phonetic",
                    "options": "grp:alt_shift_toggle",
                    "active_keymap": "English (US)",
                    "main": true
                }
            ]
        }"#;

        let devices: DevicesResponse = serde_json::from_str(json).unwrap();
        let keyboards: Vec<Keyboard> = devices.keyboards.into_iter().map(Keyboard::from).collect();

        assert_eq!(keyboards.len(), 1);
        assert_eq!(keyboards[0].name, "at-translated-set-2-keyboard");
        assert_eq!(keyboards[0].layouts, vec!["us", "ru"]);
        assert_eq!(keyboards[0].variants, vec!["", "phonetic"]);
    }

    #[test]
    fn test_devices_response_without_keyboards() {
        let devices: DevicesResponse = serde_json::from_str(r#"{"mice": []}"#).unwrap();
        assert!(devices.keyboards.is_empty());
    }

    #[test]
    fn test_raw_event_splits_on_first_delimiter() {
        let event = RawEvent::parse("activewindow>>foot,vim a>>b").unwrap();
        assert_eq!(event.kind, EventKind::WindowChanged);
        assert_eq!(event.payload, "foot,vim a>>b");
    }

    #[test]
    fn test_raw_event_kinds() {
        assert_eq!(
            RawEvent::parse("activelayout>>kbd,English (US)").unwrap().kind,
            EventKind::LayoutChanged
        );
        assert_eq!(
            RawEvent::parse("layout-changed>>kbd,Russian").unwrap().kind,
            EventKind::LayoutChanged
        );
        assert_eq!(
            RawEvent::parse("workspace>>2").unwrap().kind,
            EventKind::Other
        );
    }

    #[test]
    fn test_raw_event_requires_delimiter() {
        assert!(RawEvent::parse("activewindow").is_none());
        assert!(RawEvent::parse("activewindow>foot").is_none());
    }
}
