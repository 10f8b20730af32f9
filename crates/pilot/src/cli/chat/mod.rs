use anyhow::{Context, Result};
use pilot_core::config::{Config, load_config};
use pilot_core::mcp::McpClient;
use pilot_core::session::Session;
use std::path::PathBuf;

mod fs;
mod repl;
mod shell;

/// Mutable state shared by the REPL commands: the effective configuration,
/// where it persists, the in-memory session and the MCP client.
pub(crate) struct ChatState {
    pub config: Config,
    pub config_path: Option<PathBuf>,
    pub session: Session,
    pub mcp: McpClient,
}

impl ChatState {
    pub fn new(config: Config, config_path: Option<PathBuf>) -> Result<Self> {
        let session = Session::new(config.mode);
        let mcp = McpClient::new(None)?;
        Ok(Self {
            config,
            config_path,
            session,
            mcp,
        })
    }
}

/// Executes the chat command, starting an interactive REPL session.
pub async fn execute() -> Result<()> {
    let config = load_config(None).context("Failed to load configuration")?;
    let state = ChatState::new(config, None)?;

    if state.config.check_mcp_on_start {
        match state.mcp.list_tools().await {
            Ok(tools) => println!(
                "MCP server at {} is up ({} tools).",
                state.mcp.server_url(),
                tools.len()
            ),
            Err(e) => println!("MCP server not reachable: {e}"),
        }
    }

    repl::run(state).await
}
