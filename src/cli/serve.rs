use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::broker::RequestBroker;
use crate::config::BrokerConfig;
use crate::error::{AsklineError, Result};
use crate::ipc::socket_server::{AgentFuture, AgentServer};
use crate::ipc::ui_bridge::UiServer;
use crate::ipc::AgentRequest;
use crate::storage::JsonFileStore;
use crate::tool::AskUserTool;

/// Run the broker until Ctrl-C, then flush and persist.
pub async fn run_serve(config: &BrokerConfig, project_dir: &Path) -> Result<()> {
    let store = Arc::new(JsonFileStore::new(config.storage_path(project_dir)));
    let broker = Arc::new(RequestBroker::open(store, config).await);
    let tool = AskUserTool::new(broker.clone());

    let agent = Arc::new(AgentServer::new(config.agent_socket_path()));
    let ui = Arc::new(UiServer::new(config.ui_socket_path()));

    eprintln!(
        "askline: serving agent on {} and ui on {}",
        agent.socket_path().display(),
        ui.socket_path().display()
    );

    let mut agent_task: JoinHandle<Result<()>> = {
        let agent = agent.clone();
        tokio::spawn(async move {
            agent
                .serve(move |req: AgentRequest| -> AgentFuture {
                    let tool = tool.clone();
                    Box::pin(async move { tool.ask_user(&req.question).await })
                })
                .await
        })
    };
    let mut ui_task: JoinHandle<Result<()>> = {
        let ui = ui.clone();
        let broker = broker.clone();
        tokio::spawn(async move { ui.serve(broker).await })
    };

    let early_exit = tokio::select! {
        _ = tokio::signal::ctrl_c() => None,
        r = &mut agent_task => Some(flatten(r)),
        r = &mut ui_task => Some(flatten(r)),
    };

    agent.shutdown();
    ui.shutdown();
    let served = match early_exit {
        None => {
            let (a, u) = tokio::join!(agent_task, ui_task);
            flatten(a).and(flatten(u))
        }
        Some(result) => {
            agent_task.abort();
            ui_task.abort();
            result
        }
    };

    let disposed = broker.dispose();
    eprintln!("askline: stopped");
    served.and(disposed)
}

fn flatten(joined: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    joined.map_err(|e| AsklineError::Ipc {
        reason: format!("server task failed: {}", e),
    })?
}
