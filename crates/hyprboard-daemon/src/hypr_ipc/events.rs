//! Hyprland event stream
//!
//! Hyprland broadcasts compositor events on a second socket
//! (`.socket2.sock`), one `<event>>><payload>` line per event. Unlike the
//! control socket there is no request: a client connects and reads.
//!
//! The stream does not reconnect. A read error or EOF (Hyprland exiting)
//! ends the stream and the caller's loop with it, because every later event
//! would belong to a different compositor instance anyway.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

use super::client::{connect_socket, get_socket_path, SocketKind};
use super::HyprError;

/// Source of raw event lines
///
/// Implemented by [`EventStream`] in production and by scripted sources in
/// tests.
#[async_trait]
pub trait EventSource: Send {
    /// Wait for the next complete line, without its trailing newline
    async fn next_line(&mut self) -> Result<String, HyprError>;
}

/// Connection to the Hyprland event socket
#[derive(Debug)]
pub struct EventStream {
    reader: BufReader<UnixStream>,
    socket_path: PathBuf,
}

impl EventStream {
    /// Discover the event socket and connect to it
    ///
    /// # Errors
    ///
    /// Returns `HyprError::NotRunning` if the Hyprland session can't be located.
    /// Returns `HyprError::ConnectionFailed` if the connection fails.
    pub async fn connect() -> Result<Self, HyprError> {
        let socket_path = get_socket_path(SocketKind::Events)?;
        Self::connect_to(&socket_path).await
    }

    /// Connect to an event socket at a known path
    pub async fn connect_to(path: &Path) -> Result<Self, HyprError> {
        let socket = connect_socket(path).await?;

        debug!(path = %path.display(), "Connected to Hyprland event socket");

        Ok(Self {
            reader: BufReader::new(socket),
            socket_path: path.to_path_buf(),
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

#[async_trait]
impl EventSource for EventStream {
    /// Read the next event line
    ///
    /// Not cancel safe: a partially read line is lost if the future is
    /// dropped, so a stream whose read was abandoned must not be read again.
    ///
    /// # Errors
    ///
    /// Returns `HyprError::ConnectionClosed` on EOF.
    /// Returns `HyprError::ReceiveFailed` if reading from the socket fails.
    async fn next_line(&mut self) -> Result<String, HyprError> {
        let mut buf = Vec::new();

        // Window titles are passed through as raw bytes and need not be UTF-8
        let bytes_read = self
            .reader
            .read_until(b'\n', &mut buf)
            .await
            .map_err(HyprError::ReceiveFailed)?;

        if bytes_read == 0 {
            return Err(HyprError::ConnectionClosed);
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
        }

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::AsyncWriteExt;
    use tokio::net::UnixListener;

    #[tokio::test]
    async fn test_reads_lines_until_eof() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".socket2.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream
                .write_all(b"activewindow>>foot,~\nactivelayout>>kbd0,Russian\n")
                .await
                .unwrap();
        });

        let mut events = EventStream::connect_to(&path).await.unwrap();
        assert_eq!(events.socket_path(), path.as_path());

        assert_eq!(events.next_line().await.unwrap(), "activewindow>>foot,~");
        assert_eq!(events.next_line().await.unwrap(), "activelayout>>kbd0,Russian");

        server.await.unwrap();
        assert!(matches!(
            events.next_line().await,
            Err(HyprError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_line_split_across_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".socket2.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(b"activelay").await.unwrap();
            stream.flush().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            stream.write_all(b"out>>kbd0,German\n").await.unwrap();
        });

        let mut events = EventStream::connect_to(&path).await.unwrap();
        assert_eq!(events.next_line().await.unwrap(), "activelayout>>kbd0,German");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_utf8_title_does_not_end_stream() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".socket2.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            // Latin-1 encoded title from an X11 client
            stream
                .write_all(b"activewindow>>xterm,caf\xe9\nactivelayout>>kbd0,Russian\n")
                .await
                .unwrap();
        });

        let mut events = EventStream::connect_to(&path).await.unwrap();

        let first = events.next_line().await.unwrap();
        assert_eq!(first, "activewindow>>xterm,caf\u{FFFD}");
        assert_eq!(events.next_line().await.unwrap(), "activelayout>>kbd0,Russian");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_to_missing_socket() {
        let dir = tempdir().unwrap();
        let result = EventStream::connect_to(&dir.path().join(".socket2.sock")).await;
        assert!(matches!(result, Err(HyprError::ConnectionFailed { .. })));
    }
}
