//! Integration tests for the agent and UI socket endpoints.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use askline::broker::RequestBroker;
use askline::config::BrokerConfig;
use askline::error::AsklineError;
use askline::ipc::socket_client::AskClient;
use askline::ipc::socket_server::{AgentFuture, AgentServer};
use askline::ipc::ui_bridge::UiServer;
use askline::ipc::{AgentRequest, AgentResponse, UiCommand, UiEvent};
use askline::storage::MemoryStore;
use askline::tool::AskUserTool;

async fn wait_for_socket(path: &Path) {
    for _ in 0..100 {
        if path.exists() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("socket {} never appeared", path.display());
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[test]
fn ui_commands_use_camel_case_type_tags() {
    let cmd: UiCommand =
        serde_json::from_str(r#"{"type":"submit","id":"abc","value":"yes"}"#).unwrap();
    assert_eq!(
        cmd,
        UiCommand::Submit {
            id: Some("abc".into()),
            value: "yes".into(),
            attachments: Vec::new(),
        }
    );

    let cmd: UiCommand = serde_json::from_str(r#"{"type":"toggleQueue","enabled":false}"#).unwrap();
    assert_eq!(cmd, UiCommand::ToggleQueue { enabled: false });

    let cmd: UiCommand = serde_json::from_str(r#"{"type":"ready"}"#).unwrap();
    assert_eq!(cmd, UiCommand::Ready);

    assert!(serde_json::from_str::<UiCommand>(r#"{"type":"launchMissiles"}"#).is_err());
}

#[test]
fn ui_event_tags_match_names() {
    let event = UiEvent::QueueUpdated {
        items: Vec::new(),
        enabled: true,
    };
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], event.name());
    assert_eq!(value["enabled"], true);
}

// ---------------------------------------------------------------------------
// Agent endpoint
// ---------------------------------------------------------------------------

#[tokio::test]
async fn agent_server_client_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let socket_path = tmp.path().join("agent.sock");

    let handler = |req: AgentRequest| -> AgentFuture {
        Box::pin(async move {
            AgentResponse {
                response: format!("echo: {}", req.question),
                attachments: vec!["file:///a.png".into()],
            }
        })
    };

    let server = Arc::new(AgentServer::new(socket_path.clone()));
    let server_handle = {
        let server = server.clone();
        tokio::spawn(async move { server.serve(handler).await })
    };
    wait_for_socket(&socket_path).await;

    let client = AskClient::new(socket_path.clone(), Some(5));
    let response = client.ask("hello?").await.unwrap();
    assert_eq!(response.response, "echo: hello?");
    assert_eq!(response.attachments, vec!["file:///a.png"]);

    server.shutdown();
    server_handle.await.unwrap().unwrap();
    assert!(!socket_path.exists());
}

#[tokio::test]
async fn client_nonexistent_socket_errors() {
    let client = AskClient::new(PathBuf::from("/tmp/nonexistent-askline-test.sock"), Some(1));
    let err = client.ask("anyone?").await.unwrap_err();
    assert!(matches!(err, AsklineError::SocketNotFound { .. }));
}

#[tokio::test]
async fn client_times_out_on_silent_broker() {
    let tmp = TempDir::new().unwrap();
    let socket_path = tmp.path().join("slow.sock");

    let handler = |_req: AgentRequest| -> AgentFuture {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            AgentResponse::default()
        })
    };
    let server = Arc::new(AgentServer::new(socket_path.clone()));
    let server_handle = {
        let server = server.clone();
        tokio::spawn(async move { server.serve(handler).await })
    };
    wait_for_socket(&socket_path).await;

    let client = AskClient::new(socket_path.clone(), Some(1));
    let err = client.ask("hello?").await.unwrap_err();
    assert!(matches!(err, AsklineError::BrokerTimeout { timeout_secs: 1 }));

    server_handle.abort();
}

// ---------------------------------------------------------------------------
// Full flow: agent asks, human answers over the UI socket
// ---------------------------------------------------------------------------

struct UiConn {
    lines: tokio::io::Lines<BufReader<tokio::net::unix::OwnedReadHalf>>,
    writer: tokio::net::unix::OwnedWriteHalf,
}

impl UiConn {
    async fn connect(path: &Path) -> Self {
        let stream = UnixStream::connect(path).await.unwrap();
        let (reader, writer) = stream.into_split();
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    async fn send(&mut self, command: &UiCommand) {
        let mut line = serde_json::to_string(command).unwrap();
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await.unwrap();
    }

    async fn next_event(&mut self) -> UiEvent {
        let line = tokio::time::timeout(Duration::from_secs(5), self.lines.next_line())
            .await
            .expect("timed out waiting for ui event")
            .unwrap()
            .expect("ui stream closed");
        serde_json::from_str(&line).unwrap()
    }

    async fn next_pending_question(&mut self) -> (String, String) {
        loop {
            if let UiEvent::PendingQuestion { id, question, .. } = self.next_event().await {
                return (id, question);
            }
        }
    }
}

#[tokio::test]
async fn agent_question_answered_through_ui_socket() {
    let tmp = TempDir::new().unwrap();
    let agent_path = tmp.path().join("agent.sock");
    let ui_path = tmp.path().join("ui.sock");

    let broker = Arc::new(
        RequestBroker::open(Arc::new(MemoryStore::new()), &BrokerConfig::default()).await,
    );
    let tool = AskUserTool::new(broker.clone());

    let agent = Arc::new(AgentServer::new(agent_path.clone()));
    let ui = Arc::new(UiServer::new(ui_path.clone()));
    {
        let agent = agent.clone();
        tokio::spawn(async move {
            agent
                .serve(move |req: AgentRequest| -> AgentFuture {
                    let tool = tool.clone();
                    Box::pin(async move { tool.ask_user(&req.question).await })
                })
                .await
        });
    }
    {
        let ui = ui.clone();
        let broker = broker.clone();
        tokio::spawn(async move { ui.serve(broker).await });
    }
    wait_for_socket(&agent_path).await;
    wait_for_socket(&ui_path).await;

    let mut conn = UiConn::connect(&ui_path).await;
    conn.send(&UiCommand::Ready).await;
    assert_eq!(conn.next_event().await.name(), "queueUpdated");
    assert_eq!(conn.next_event().await.name(), "currentSessionUpdated");
    assert_eq!(conn.next_event().await.name(), "persistedHistoryUpdated");

    let client = AskClient::new(agent_path.clone(), Some(10));
    let asker = tokio::spawn(async move { client.ask("Should I run the migrations?").await });

    let (id, question) = conn.next_pending_question().await;
    assert_eq!(question, "Should I run the migrations?");
    conn.send(&UiCommand::Submit {
        id: Some(id),
        value: "yes".into(),
        attachments: Vec::new(),
    })
    .await;

    let response = asker.await.unwrap().unwrap();
    assert_eq!(response.response, "yes");

    agent.shutdown();
    ui.shutdown();
    broker.dispose().unwrap();
}

#[tokio::test]
async fn reconnecting_ui_gets_pending_question_again() {
    let tmp = TempDir::new().unwrap();
    let ui_path = tmp.path().join("ui.sock");

    let broker = Arc::new(
        RequestBroker::open(Arc::new(MemoryStore::new()), &BrokerConfig::default()).await,
    );
    let ui = Arc::new(UiServer::new(ui_path.clone()));
    {
        let ui = ui.clone();
        let broker = broker.clone();
        tokio::spawn(async move { ui.serve(broker).await });
    }
    wait_for_socket(&ui_path).await;

    let mut first = UiConn::connect(&ui_path).await;
    first.send(&UiCommand::Ready).await;
    first.next_event().await;

    let asker = {
        let broker = broker.clone();
        tokio::spawn(async move { broker.ask("Deploy now?").await })
    };
    let (id, _) = first.next_pending_question().await;
    drop(first);

    let mut second = UiConn::connect(&ui_path).await;
    second.send(&UiCommand::Ready).await;
    let (replayed, _) = second.next_pending_question().await;
    assert_eq!(replayed, id);

    second
        .send(&UiCommand::Submit {
            id: None,
            value: "not yet".into(),
            attachments: Vec::new(),
        })
        .await;
    assert_eq!(asker.await.unwrap().unwrap().value, "not yet");
    ui.shutdown();
}

#[tokio::test]
async fn malformed_ui_line_yields_warning() {
    let tmp = TempDir::new().unwrap();
    let ui_path = tmp.path().join("ui.sock");

    let broker = Arc::new(
        RequestBroker::open(Arc::new(MemoryStore::new()), &BrokerConfig::default()).await,
    );
    let ui = Arc::new(UiServer::new(ui_path.clone()));
    {
        let ui = ui.clone();
        let broker = broker.clone();
        tokio::spawn(async move { ui.serve(broker).await });
    }
    wait_for_socket(&ui_path).await;

    let mut conn = UiConn::connect(&ui_path).await;
    conn.send(&UiCommand::Ready).await;
    for _ in 0..3 {
        conn.next_event().await;
    }

    conn.writer.write_all(b"{not json}\n").await.unwrap();
    match conn.next_event().await {
        UiEvent::Warning { message } => assert!(message.contains("malformed")),
        other => panic!("expected warning, got {other:?}"),
    }
    ui.shutdown();
}
