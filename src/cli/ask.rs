use crate::config::BrokerConfig;
use crate::error::Result;
use crate::ipc::socket_client::AskClient;

/// Ask the running broker a question and print the response JSON on stdout.
pub async fn run_ask(config: &BrokerConfig, question: &str, timeout_secs: Option<u64>) -> Result<()> {
    let client = AskClient::new(config.agent_socket_path(), timeout_secs);
    let response = client.ask(question).await?;
    if response.response.is_empty() {
        eprintln!("askline: no answer was obtained");
    }
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}
