//! MCP service mounted behind the bearer token gate.

use rmcp::{
    ServerHandler,
    model::{Implementation, ServerCapabilities, ServerInfo},
};

const DEFAULT_INSTRUCTIONS: &str =
    "MCP server protected by OAuth 2.1. Requests must carry a bearer token for this resource.";

/// MCP server handler.
#[derive(Debug, Clone, Default)]
pub struct Server {
    instructions: Option<String>,
}

impl Server {
    pub fn new(instructions: Option<String>) -> Self {
        Self { instructions }
    }
}

impl ServerHandler for Server {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::default(),
            server_info: Implementation {
                name: "wmcp".into(),
                title: Some("Walrus MCP Server".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                self.instructions
                    .clone()
                    .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.into()),
            ),
        }
    }
}
