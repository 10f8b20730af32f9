//! Minimal HTTP client for a Model Context Protocol (MCP) tool server.
//!
//! The server exposes `GET /tools` for discovery and `POST /tools/{name}`
//! for invocation. The server URL comes from `MCP_SERVER_URL`, defaulting
//! to a local instance.
use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::env;
use url::Url;

pub const MCP_SERVER_URL_VAR: &str = "MCP_SERVER_URL";
pub const DEFAULT_MCP_SERVER_URL: &str = "http://localhost:3000";

#[derive(Deserialize, Debug, Clone)]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize, Debug)]
struct ToolsResponse {
    tools: Vec<McpTool>,
}

/// Client for a single MCP tool server.
#[derive(Debug)]
pub struct McpClient {
    base_url: Url,
    client: Client,
}

impl McpClient {
    /// Creates a client for `base_url`, falling back to `MCP_SERVER_URL`
    /// and then the local default.
    pub fn new(base_url: Option<&str>) -> Result<Self> {
        let url = match base_url {
            Some(url) => url.to_string(),
            None => env::var(MCP_SERVER_URL_VAR)
                .unwrap_or_else(|_| DEFAULT_MCP_SERVER_URL.to_string()),
        };
        Ok(Self {
            base_url: Url::parse(&url)
                .with_context(|| format!("Invalid MCP server URL: {url}"))?,
            client: Client::new(),
        })
    }

    pub fn server_url(&self) -> &Url {
        &self.base_url
    }

    /// Lists the tools the server advertises.
    pub async fn list_tools(&self) -> Result<Vec<McpTool>> {
        let mut url = self.base_url.clone();
        url.set_path("tools");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to reach MCP server")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "MCP tool listing failed with status {}: {}",
                status,
                text
            ));
        }

        let tools_response: ToolsResponse = response
            .json()
            .await
            .context("Failed to parse MCP tool listing")?;
        Ok(tools_response.tools)
    }

    /// Invokes a tool by name with a JSON parameter object and returns the
    /// server's JSON reply verbatim.
    pub async fn call_tool(&self, name: &str, params: &Value) -> Result<Value> {
        let mut url = self.base_url.clone();
        url.set_path(&format!("tools/{name}"));

        let response = self
            .client
            .post(url)
            .json(params)
            .send()
            .await
            .context("Failed to reach MCP server")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "MCP tool '{}' failed with status {}: {}",
                name,
                status,
                text
            ));
        }

        response
            .json()
            .await
            .context("Failed to parse MCP tool response")
    }
}
