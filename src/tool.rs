use std::sync::Arc;

use crate::broker::RequestBroker;
use crate::ipc::AgentResponse;

/// The agent's `askUser` operation.
///
/// Never fails: any broker error becomes an empty response so the agent can
/// carry on.
#[derive(Clone)]
pub struct AskUserTool {
    broker: Arc<RequestBroker>,
}

impl AskUserTool {
    pub fn new(broker: Arc<RequestBroker>) -> Self {
        Self { broker }
    }

    pub async fn ask_user(&self, question: &str) -> AgentResponse {
        match self.broker.ask(question).await {
            Ok(answer) => AgentResponse {
                response: answer.value,
                attachments: answer.attachments.into_iter().map(|a| a.uri).collect(),
            },
            Err(e) => {
                tracing::warn!("askUser produced no answer: {}", e);
                AgentResponse::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BrokerConfig;
    use crate::exchange::Attachment;
    use crate::storage::{HistoryDocument, MemoryStore, PersistenceStore, QueueState};
    use tokio::sync::mpsc;

    fn broker() -> Arc<RequestBroker> {
        let store = Arc::new(MemoryStore::new());
        let config = BrokerConfig::default();
        let persistence = Arc::new(PersistenceStore::new(store, config.debounce()));
        Arc::new(RequestBroker::with_documents(
            persistence,
            QueueState::default(),
            HistoryDocument::default(),
            &config,
        ))
    }

    #[tokio::test]
    async fn test_failure_is_empty_response() {
        let tool = AskUserTool::new(broker());
        let resp = tool.ask_user("Anyone there?").await;
        assert_eq!(resp, AgentResponse::default());
    }

    #[tokio::test]
    async fn test_attachments_map_to_uris() {
        let b = broker();
        let (tx, _rx) = mpsc::unbounded_channel();
        let sid = b.attach_surface(tx);
        b.ready(sid);

        let tool = AskUserTool::new(b.clone());
        let asker = tokio::spawn(async move { tool.ask_user("Screenshot?").await });
        let id = loop {
            if let Some(id) = b.pending_id() {
                break id;
            }
            tokio::task::yield_now().await;
        };

        let shot = Attachment {
            id: "a1".into(),
            uri: "file:///tmp/shot.png".into(),
            name: "shot.png".into(),
            flags: Default::default(),
        };
        b.submit(&id, "here", vec![shot]).unwrap();

        let resp = asker.await.unwrap();
        assert_eq!(resp.response, "here");
        assert_eq!(resp.attachments, vec!["file:///tmp/shot.png"]);
    }
}
