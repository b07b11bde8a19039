use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::Notify;

use crate::error::{AsklineError, Result};
use crate::ipc::{AgentRequest, AgentResponse};

/// Boxed future returned by an agent request handler.
pub type AgentFuture = Pin<Box<dyn Future<Output = AgentResponse> + Send>>;

/// Unix socket endpoint the agent asks its questions on.
///
/// One connection carries one request line and gets one response line back.
pub struct AgentServer {
    socket_path: PathBuf,
    shutdown_signal: Arc<Notify>,
}

impl AgentServer {
    pub fn new(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            shutdown_signal: Arc::new(Notify::new()),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Start listening for connections. Each connection is handled in a spawned task.
    pub async fn serve<F>(&self, handler: F) -> Result<()>
    where
        F: Fn(AgentRequest) -> AgentFuture + Send + Sync + 'static,
    {
        let listener = bind_socket(&self.socket_path)?;
        tracing::info!("agent endpoint listening on {}", self.socket_path.display());

        let handler = Arc::new(handler);
        let shutdown = self.shutdown_signal.clone();

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, _addr)) => {
                            let handler = handler.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, handler).await {
                                    tracing::warn!("agent connection error: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::warn!("agent accept error: {}", e);
                        }
                    }
                }
                _ = shutdown.notified() => {
                    tracing::info!("agent endpoint shutting down");
                    break;
                }
            }
        }

        let _ = std::fs::remove_file(&self.socket_path);
        Ok(())
    }

    /// Graceful shutdown.
    pub fn shutdown(&self) {
        self.shutdown_signal.notify_one();
    }
}

/// Bind a listener at `path`, replacing a leftover socket file.
pub(crate) fn bind_socket(path: &Path) -> Result<UnixListener> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    UnixListener::bind(path).map_err(|e| AsklineError::Ipc {
        reason: format!("failed to bind socket at {}: {}", path.display(), e),
    })
}

async fn handle_connection<F>(stream: tokio::net::UnixStream, handler: Arc<F>) -> Result<()>
where
    F: Fn(AgentRequest) -> AgentFuture + Send + Sync + 'static,
{
    let (reader, mut writer) = stream.into_split();
    let mut buf_reader = BufReader::new(reader);
    let mut line = String::new();

    buf_reader
        .read_line(&mut line)
        .await
        .map_err(|e| AsklineError::Ipc {
            reason: format!("read failed: {}", e),
        })?;

    let request: AgentRequest =
        serde_json::from_str(line.trim()).map_err(|e| AsklineError::Ipc {
            reason: format!("invalid request JSON: {}", e),
        })?;

    let response = handler(request).await;

    let mut response_json = serde_json::to_string(&response)?;
    response_json.push('\n');
    writer
        .write_all(response_json.as_bytes())
        .await
        .map_err(|e| AsklineError::Ipc {
            reason: format!("write failed: {}", e),
        })?;
    writer.shutdown().await.map_err(|e| AsklineError::Ipc {
        reason: format!("shutdown failed: {}", e),
    })?;

    Ok(())
}
