use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use crate::error::{AsklineError, Result};
use crate::ipc::{AgentRequest, AgentResponse};

/// Agent-side client for the broker's agent endpoint.
pub struct AskClient {
    socket_path: PathBuf,
    /// `None` waits as long as the human takes.
    timeout_secs: Option<u64>,
}

impl AskClient {
    pub fn new(socket_path: PathBuf, timeout_secs: Option<u64>) -> Self {
        Self {
            socket_path,
            timeout_secs,
        }
    }

    /// Send one question and wait for the response.
    pub async fn ask(&self, question: &str) -> Result<AgentResponse> {
        if !self.socket_path.exists() {
            return Err(AsklineError::SocketNotFound {
                path: self.socket_path.clone(),
            });
        }

        let request = AgentRequest {
            question: question.to_string(),
        };
        let Some(timeout_secs) = self.timeout_secs else {
            return self.round_trip(&request).await;
        };

        match tokio::time::timeout(Duration::from_secs(timeout_secs), self.round_trip(&request))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(AsklineError::BrokerTimeout { timeout_secs }),
        }
    }

    async fn round_trip(&self, request: &AgentRequest) -> Result<AgentResponse> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| AsklineError::Ipc {
                reason: format!("connect failed: {}", e),
            })?;

        let mut request_json = serde_json::to_string(request)?;
        request_json.push('\n');
        stream
            .write_all(request_json.as_bytes())
            .await
            .map_err(|e| AsklineError::Ipc {
                reason: format!("write failed: {}", e),
            })?;
        stream.shutdown().await.map_err(|e| AsklineError::Ipc {
            reason: format!("shutdown write failed: {}", e),
        })?;

        // Bounded so a misbehaving peer cannot exhaust memory.
        let mut response_buf = Vec::new();
        stream
            .take(16 * 1_048_576)
            .read_to_end(&mut response_buf)
            .await
            .map_err(|e| AsklineError::Ipc {
                reason: format!("read failed: {}", e),
            })?;

        serde_json::from_slice(&response_buf).map_err(|e| AsklineError::Ipc {
            reason: format!("invalid response JSON: {}", e),
        })
    }
}
