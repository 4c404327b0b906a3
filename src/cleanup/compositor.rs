//! Compositor display control over Wayfire IPC.
//!
//! Wire format: a 4-byte little-endian length followed by a JSON object
//! `{"method": "...", "data": {}}`. The reply uses the same framing; a reply
//! carrying an `"error"` field is a failure.

use crate::domain::{PowerManagerError, Result};
use futures_util::future::BoxFuture;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming the Wayfire IPC socket.
pub const WAYFIRE_SOCKET_ENV: &str = "WAYFIRE_SOCKET";

/// Thaws a screen frozen by an animation.
pub const UNFREEZE_METHOD: &str = "screen-freeze/unfreeze";

/// Shows a cursor hidden by an animation.
pub const SHOW_CURSOR_METHOD: &str = "cursor-control/show";

/// Replies larger than this are rejected.
const MAX_REPLY_BYTES: usize = 1024 * 1024;

/// Sends display-state commands to the compositor.
pub trait DisplayControl: Send + Sync {
    /// Calls one compositor method with empty data.
    ///
    /// # Errors
    ///
    /// Returns [`PowerManagerError::Cleanup`] or [`PowerManagerError::Io`] if
    /// the compositor is unreachable or rejects the call.
    fn call(&self, method: &'static str) -> BoxFuture<'_, Result<()>>;
}

/// Wayfire IPC client. Opens one connection per call.
#[derive(Debug, Clone)]
pub struct WayfireIpc {
    socket: Option<PathBuf>,
    io_timeout: Duration,
}

impl WayfireIpc {
    #[must_use]
    pub const fn new(socket: Option<PathBuf>, io_timeout: Duration) -> Self {
        Self { socket, io_timeout }
    }

    /// Uses the socket named by `WAYFIRE_SOCKET`, if any.
    #[must_use]
    pub fn from_env(io_timeout: Duration) -> Self {
        let socket = std::env::var_os(WAYFIRE_SOCKET_ENV)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        Self::new(socket, io_timeout)
    }

    #[cfg(unix)]
    async fn exchange(&self, socket: &std::path::Path, method: &str) -> Result<()> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::UnixStream;

        let request = encode_request(method)?;
        let mut stream = UnixStream::connect(socket).await?;
        stream.write_all(&request).await?;

        let mut header = [0_u8; 4];
        stream.read_exact(&mut header).await?;
        let len = u32::from_le_bytes(header) as usize;
        if len > MAX_REPLY_BYTES {
            return Err(PowerManagerError::Cleanup(format!(
                "{method}: reply of {len} bytes exceeds limit"
            )));
        }
        let mut body = vec![0_u8; len];
        stream.read_exact(&mut body).await?;
        check_reply(method, &body)
    }

    #[cfg(not(unix))]
    async fn exchange(&self, _socket: &std::path::Path, method: &str) -> Result<()> {
        Err(PowerManagerError::Cleanup(format!(
            "{method}: compositor IPC requires unix sockets"
        )))
    }
}

impl DisplayControl for WayfireIpc {
    fn call(&self, method: &'static str) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let Some(socket) = &self.socket else {
                tracing::debug!(method, "no compositor socket configured, skipping");
                return Ok(());
            };
            tokio::time::timeout(self.io_timeout, self.exchange(socket, method))
                .await
                .map_err(|_| {
                    PowerManagerError::Cleanup(format!(
                        "{method}: no reply within {:?}",
                        self.io_timeout
                    ))
                })?
        })
    }
}

/// Frames a method call.
///
/// # Errors
///
/// Returns an error only if the message cannot be serialized.
pub fn encode_request(method: &str) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(&serde_json::json!({ "method": method, "data": {} }))
        .map_err(|e| PowerManagerError::Cleanup(e.to_string()))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| PowerManagerError::Cleanup("request too large".to_string()))?;
    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

fn check_reply(method: &str, body: &[u8]) -> Result<()> {
    let reply: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| PowerManagerError::Cleanup(format!("{method}: invalid reply: {e}")))?;
    match reply.get("error") {
        Some(error) => Err(PowerManagerError::Cleanup(format!("{method}: {error}"))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_length_prefixed_json() {
        let frame = encode_request(UNFREEZE_METHOD).unwrap();
        let len = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        assert_eq!(len, frame.len() - 4);

        let body: serde_json::Value = serde_json::from_slice(&frame[4..]).unwrap();
        assert_eq!(body["method"], UNFREEZE_METHOD);
        assert!(body["data"].as_object().unwrap().is_empty());
    }

    #[test]
    fn error_reply_is_a_failure() {
        assert!(check_reply("m", br#"{"result": "ok"}"#).is_ok());
        assert!(check_reply("m", br#"{"error": "No such method"}"#).is_err());
        assert!(check_reply("m", b"not json").is_err());
    }

    #[tokio::test]
    async fn missing_socket_is_a_no_op() {
        let ipc = WayfireIpc::new(None, Duration::from_secs(1));
        assert!(ipc.call(SHOW_CURSOR_METHOD).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn round_trips_with_a_listening_compositor() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::UnixListener;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("wayfire.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut header = [0_u8; 4];
            stream.read_exact(&mut header).await.unwrap();
            let mut body = vec![0_u8; u32::from_le_bytes(header) as usize];
            stream.read_exact(&mut body).await.unwrap();
            let request: serde_json::Value = serde_json::from_slice(&body).unwrap();

            let reply = br#"{"result": "ok"}"#;
            stream.write_all(&(reply.len() as u32).to_le_bytes()).await.unwrap();
            stream.write_all(reply).await.unwrap();
            request["method"].as_str().unwrap().to_string()
        });

        let ipc = WayfireIpc::new(Some(path), Duration::from_secs(2));
        ipc.call(UNFREEZE_METHOD).await.unwrap();
        assert_eq!(server.await.unwrap(), UNFREEZE_METHOD);
    }
}
