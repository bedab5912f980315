//! Error types for Hyprland IPC operations

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when communicating with the Hyprland compositor
#[derive(Debug, Error)]
pub enum HyprError {
    /// The Hyprland session could not be located
    #[error("HYPRLAND_INSTANCE_SIGNATURE environment variable not set - is Hyprland running?")]
    NotRunning,

    /// Failed to connect to a Hyprland socket
    #[error("Failed to connect to Hyprland socket at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to send a request to Hyprland
    #[error("Failed to send request to Hyprland: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Failed to receive a response or event from Hyprland
    #[error("Failed to receive from Hyprland: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Failed to deserialize a JSON response
    #[error("Failed to deserialize response: {source} (hyprctl: {body})")]
    DeserializeFailed {
        body: String,
        #[source]
        source: serde_json::Error,
    },

    /// Hyprland answered a command with something other than `ok`
    #[error("Hyprland rejected command ({kind}): {message}")]
    CommandRejected { kind: RejectionKind, message: String },

    /// Connection was closed by Hyprland
    #[error("Connection to Hyprland closed unexpectedly")]
    ConnectionClosed,

    /// The request did not complete within the configured deadline
    #[error("Hyprland did not answer within {0:?}")]
    Timeout(Duration),
}

/// Known reasons Hyprland gives for refusing a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    IndexOutOfRange,
    DeviceNotFound,
    Other,
}

impl std::fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::IndexOutOfRange => "index out of range",
            Self::DeviceNotFound => "device not found",
            Self::Other => "unknown reason",
        };
        f.write_str(text)
    }
}

/// Response prefixes Hyprland uses for command failures
const REJECTIONS: &[(&str, RejectionKind)] = &[
    ("layout idx out of range", RejectionKind::IndexOutOfRange),
    ("device not found", RejectionKind::DeviceNotFound),
];

impl RejectionKind {
    /// Classify a non-`ok` response body
    pub fn classify(body: &str) -> Self {
        REJECTIONS
            .iter()
            .find(|(prefix, _)| body.starts_with(prefix))
            .map(|(_, kind)| *kind)
            .unwrap_or(Self::Other)
    }
}

impl HyprError {
    /// Whether a write failure means the peer hung up and a fresh connection may work
    pub(crate) fn is_peer_gone(&self) -> bool {
        match self {
            Self::SendFailed(err) => matches!(
                err.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::NotConnected
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_rejections() {
        assert_eq!(
            RejectionKind::classify("layout idx out of range of 2"),
            RejectionKind::IndexOutOfRange
        );
        assert_eq!(
            RejectionKind::classify("device not found"),
            RejectionKind::DeviceNotFound
        );
        assert_eq!(RejectionKind::classify("unknown request"), RejectionKind::Other);
    }

    #[test]
    fn test_broken_pipe_is_peer_gone() {
        let err = HyprError::SendFailed(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(err.is_peer_gone());

        let err = HyprError::SendFailed(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(!err.is_peer_gone());

        assert!(!HyprError::ConnectionClosed.is_peer_gone());
    }
}
