//! Hyprland control socket client
//!
//! This module provides socket discovery for the Hyprland session and the
//! `ControlClient` used to query keyboards and switch their layouts.
//!
//! ## Protocol
//!
//! Requests are written as a single `"<flags>/<command> <args>"` message with
//! no terminator. Hyprland writes the response and usually closes the
//! connection afterwards, so the client keeps one connection open and
//! transparently replaces it when the peer has gone away.
//!
//! Responses carry no length or terminator. They are read in fixed-size
//! chunks: a chunk shorter than the buffer, or end-of-file, ends the message.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::{debug, warn};

use super::types::DevicesResponse;
use super::HyprError;
use crate::layout::Keyboard;

/// Environment variable identifying the running Hyprland instance
const SIGNATURE_ENV: &str = "HYPRLAND_INSTANCE_SIGNATURE";

/// Socket directory used by Hyprland releases before 0.40
const LEGACY_SOCKET_DIR: &str = "/tmp/hypr";

/// Size of each chunk read from the control socket
pub const READ_BUFFER_SIZE: usize = 8192;

/// The two sockets every Hyprland instance exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    /// Request/response socket used by `hyprctl`
    Control,
    /// Line-oriented event broadcast
    Events,
}

impl SocketKind {
    fn file_name(self) -> &'static str {
        match self {
            Self::Control => ".socket.sock",
            Self::Events => ".socket2.sock",
        }
    }
}

/// Discover the path of a Hyprland socket from the environment
///
/// Reads `$HYPRLAND_INSTANCE_SIGNATURE` and looks for the socket under
/// `$XDG_RUNTIME_DIR/hypr/<signature>/` (or `/run/user/<uid>` when the
/// variable is unset), then under the legacy `/tmp/hypr/<signature>/`.
///
/// # Errors
///
/// Returns `HyprError::NotRunning` if the signature is not set.
pub fn get_socket_path(kind: SocketKind) -> Result<PathBuf, HyprError> {
    let signature = std::env::var(SIGNATURE_ENV).ok();
    let runtime_dir = std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("/run/user/{}", nix::unistd::getuid())));

    resolve_socket_path(signature.as_deref(), &runtime_dir, kind)
}

/// Pure part of [`get_socket_path`]
///
/// When neither location exists the current-style path is returned, so the
/// connection error names the place a modern Hyprland would use.
pub fn resolve_socket_path(
    signature: Option<&str>,
    runtime_dir: &Path,
    kind: SocketKind,
) -> Result<PathBuf, HyprError> {
    let signature = signature
        .filter(|sig| !sig.is_empty())
        .ok_or(HyprError::NotRunning)?;

    let current = runtime_dir
        .join("hypr")
        .join(signature)
        .join(kind.file_name());
    if current.exists() {
        return Ok(current);
    }

    let legacy = Path::new(LEGACY_SOCKET_DIR)
        .join(signature)
        .join(kind.file_name());
    if legacy.exists() {
        return Ok(legacy);
    }

    Ok(current)
}

pub(crate) async fn connect_socket(path: &Path) -> Result<UnixStream, HyprError> {
    UnixStream::connect(path)
        .await
        .map_err(|e| HyprError::ConnectionFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Keyboard operations the switcher needs from the compositor
#[async_trait]
pub trait KeyboardControl: Send {
    /// List every keyboard with its configured layouts
    async fn list_keyboards(&mut self) -> Result<Vec<Keyboard>, HyprError>;

    /// Make the layout at `index` active on `device`
    async fn switch_layout(&mut self, device: &str, index: usize) -> Result<(), HyprError>;
}

/// Client for the Hyprland control socket
///
/// The client starts connected (see [`ControlClient::connect`]) or lazily
/// (see [`ControlClient::new`]); either way, a missing connection is
/// re-established on the next request.
///
/// # Example
///
/// ```ignore
/// let mut client = ControlClient::connect(Some(Duration::from_secs(5))).await?;
/// for keyboard in client.list_keyboards().await? {
///     println!("{}: {:?}", keyboard.name, keyboard.layouts);
/// }
/// client.switch_layout("at-translated-set-2-keyboard", 1).await?;
/// ```
#[derive(Debug)]
pub struct ControlClient {
    socket_path: PathBuf,
    conn: Option<UnixStream>,
    request_timeout: Option<Duration>,
}

impl ControlClient {
    /// Create a client for `socket_path` without connecting yet
    pub fn new(socket_path: impl Into<PathBuf>, request_timeout: Option<Duration>) -> Self {
        Self {
            socket_path: socket_path.into(),
            conn: None,
            request_timeout,
        }
    }

    /// Discover the control socket and connect to it
    ///
    /// # Errors
    ///
    /// Returns `HyprError::NotRunning` if the Hyprland session can't be located.
    /// Returns `HyprError::ConnectionFailed` if the socket refuses the connection.
    pub async fn connect(request_timeout: Option<Duration>) -> Result<Self, HyprError> {
        let socket_path = get_socket_path(SocketKind::Control)?;
        let conn = connect_socket(&socket_path).await?;

        debug!(path = %socket_path.display(), "Connected to Hyprland control socket");

        Ok(Self {
            socket_path,
            conn: Some(conn),
            request_timeout,
        })
    }

    /// Send one request and return the trimmed response body
    ///
    /// The whole exchange is bounded by the request timeout; a connection that
    /// timed out is discarded since a late answer would corrupt the next one.
    async fn request(&mut self, flags: &str, command: &str) -> Result<String, HyprError> {
        let request = format!("{}/{}", flags, command);

        let Some(limit) = self.request_timeout else {
            return self.exchange(&request).await;
        };

        let result = tokio::time::timeout(limit, self.exchange(&request)).await;
        match result {
            Ok(response) => response,
            Err(_) => {
                warn!(request = %request, ?limit, "Hyprland request timed out");
                self.conn = None;
                Err(HyprError::Timeout(limit))
            }
        }
    }

    async fn exchange(&mut self, request: &str) -> Result<String, HyprError> {
        self.write_request(request).await?;
        self.read_response().await
    }

    /// Write a request, reconnecting and retrying exactly once if the peer hung up
    async fn write_request(&mut self, request: &str) -> Result<(), HyprError> {
        match self.try_write(request).await {
            Err(e) if e.is_peer_gone() => {
                debug!(error = %e, "Hyprland closed the control connection, reconnecting");
                self.conn = None;
                self.try_write(request).await
            }
            other => other,
        }
    }

    async fn try_write(&mut self, request: &str) -> Result<(), HyprError> {
        if self.conn.is_none() {
            self.conn = Some(connect_socket(&self.socket_path).await?);
        }
        let Some(conn) = self.conn.as_mut() else {
            return Err(HyprError::ConnectionClosed);
        };

        conn.write_all(request.as_bytes())
            .await
            .map_err(HyprError::SendFailed)
    }

    /// Read one response using short-read framing
    async fn read_response(&mut self) -> Result<String, HyprError> {
        let Some(conn) = self.conn.as_mut() else {
            return Err(HyprError::ConnectionClosed);
        };

        let mut body = Vec::new();
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let mut peer_closed = false;

        loop {
            let n = match conn.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    self.conn = None;
                    return Err(HyprError::ReceiveFailed(e));
                }
            };

            body.extend_from_slice(&buf[..n]);

            if n == 0 {
                peer_closed = true;
                break;
            }
            if n < READ_BUFFER_SIZE {
                break;
            }
        }

        if peer_closed {
            self.conn = None;
            if body.is_empty() {
                return Err(HyprError::ConnectionClosed);
            }
        }

        Ok(String::from_utf8_lossy(&body).trim().to_string())
    }
}

#[async_trait]
impl KeyboardControl for ControlClient {
    async fn list_keyboards(&mut self) -> Result<Vec<Keyboard>, HyprError> {
        let body = self.request("j", "devices").await?;

        let devices: DevicesResponse = match serde_json::from_str(&body) {
            Ok(devices) => devices,
            Err(source) => return Err(HyprError::DeserializeFailed { body, source }),
        };

        Ok(devices.keyboards.into_iter().map(Keyboard::from).collect())
    }

    async fn switch_layout(&mut self, device: &str, index: usize) -> Result<(), HyprError> {
        let body = self
            .request("", &format!("switchxkblayout {} {}", device, index))
            .await?;

        if body == "ok" {
            return Ok(());
        }

        Err(HyprError::CommandRejected {
            kind: super::RejectionKind::classify(&body),
            message: body,
        })
    }
}
