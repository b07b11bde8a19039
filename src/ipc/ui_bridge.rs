use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, Notify};

use crate::broker::RequestBroker;
use crate::error::Result;
use crate::ipc::socket_server::bind_socket;
use crate::ipc::{UiCommand, UiEvent};

/// Unix socket endpoint for the UI surface.
///
/// A connection is a long-lived JSON-lines stream: `UiCommand`s in, `UiEvent`s
/// out. A new connection replaces the previous surface.
pub struct UiServer {
    socket_path: PathBuf,
    shutdown_signal: Arc<Notify>,
}

impl UiServer {
    pub fn new(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            shutdown_signal: Arc::new(Notify::new()),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub async fn serve(&self, broker: Arc<RequestBroker>) -> Result<()> {
        let listener = bind_socket(&self.socket_path)?;
        tracing::info!("ui endpoint listening on {}", self.socket_path.display());

        let shutdown = self.shutdown_signal.clone();
        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, _addr)) => {
                            let broker = broker.clone();
                            tokio::spawn(async move {
                                handle_surface(stream, broker).await;
                            });
                        }
                        Err(e) => {
                            tracing::warn!("ui accept error: {}", e);
                        }
                    }
                }
                _ = shutdown.notified() => {
                    tracing::info!("ui endpoint shutting down");
                    break;
                }
            }
        }

        let _ = std::fs::remove_file(&self.socket_path);
        Ok(())
    }

    pub fn shutdown(&self) {
        self.shutdown_signal.notify_one();
    }
}

async fn handle_surface(stream: UnixStream, broker: Arc<RequestBroker>) {
    let (reader, mut writer) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<UiEvent>();
    let surface = broker.attach_surface(tx);

    // Ends once the gate drops the sender, on detach or replacement.
    let writer_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let mut line = match serde_json::to_string(&event) {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!("failed to encode {}: {}", event.name(), e);
                    continue;
                }
            };
            line.push('\n');
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                tracing::debug!("ui write failed: {}", e);
                break;
            }
        }
    });

    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<UiCommand>(line) {
                    Ok(command) => broker.handle_ui_command(surface, command),
                    Err(e) => {
                        tracing::warn!("malformed ui command: {}", e);
                        broker.warn_ui(format!("malformed command: {}", e));
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("ui read failed: {}", e);
                break;
            }
        }
    }

    broker.detach_surface(surface);
    let _ = writer_task.await;
}
