//! MCP client using the official rmcp SDK
//!
//! Reaches tool servers either by spawning them as child processes (stdio)
//! or over streamable HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParams, ClientCapabilities, ClientInfo, Implementation},
    service::RunningService,
    transport::{
        ConfigureCommandExt, StreamableHttpClientTransport, TokioChildProcess,
        streamable_http_client::StreamableHttpClientTransportConfig,
    },
    RoleClient, ServiceExt,
};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

use super::transport::{Connector, RawTool, ToolTransport};
use crate::logging::Logger;
use crate::types::{ServerConfig, TransportKind};

/// MCP client errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("initialization failed: {0}")]
    InitializationFailed(String),

    #[error("unsupported transport configuration: {0}")]
    UnsupportedTransport(String),

    #[error("tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type McpResult<T> = Result<T, McpError>;

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "agentry-core".to_string(),
            title: Some("Agentry Core".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website_url: None,
            icons: None,
        },
    }
}

/// MCP client wrapping one initialized rmcp session
pub struct McpClient {
    /// The underlying rmcp running service; taken on close
    service: Mutex<Option<RunningService<RoleClient, ClientInfo>>>,
    /// Logger
    logger: Arc<dyn Logger>,
}

impl McpClient {
    /// Spawn a stdio server as a child process and initialize a session
    pub async fn connect_stdio(
        command: &str,
        args: &[String],
        logger: Arc<dyn Logger>,
    ) -> McpResult<Self> {
        logger.info(&format!(
            "[McpClient] Spawning stdio server: {} {}",
            command,
            args.join(" ")
        ));

        let transport = TokioChildProcess::new(tokio::process::Command::new(command).configure(
            |cmd| {
                cmd.args(args).stderr(std::process::Stdio::inherit());
            },
        ))
        .map_err(|e| McpError::ConnectionFailed(e.to_string()))?;

        let service = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

        logger.info("[McpClient] Connected and initialized successfully");

        Ok(Self {
            service: Mutex::new(Some(service)),
            logger,
        })
    }

    /// Connect to a server over streamable HTTP and initialize a session
    pub async fn connect_http(
        url: &str,
        auth_header: Option<&str>,
        logger: Arc<dyn Logger>,
    ) -> McpResult<Self> {
        logger.info(&format!("[McpClient] Connecting to HTTP: {}", url));

        let transport = match auth_header {
            Some(auth) => {
                let mut config = StreamableHttpClientTransportConfig::with_uri(url.to_string());
                config.auth_header = Some(auth.to_string());
                StreamableHttpClientTransport::from_config(config)
            }
            None => StreamableHttpClientTransport::from_uri(url.to_string()),
        };

        let service = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

        logger.info("[McpClient] Connected and initialized successfully");

        Ok(Self {
            service: Mutex::new(Some(service)),
            logger,
        })
    }
}

#[async_trait]
impl ToolTransport for McpClient {
    async fn list_tools(&self) -> McpResult<Vec<RawTool>> {
        let guard = self.service.lock().await;
        let service = guard
            .as_ref()
            .ok_or_else(|| McpError::ConnectionFailed("session is closed".to_string()))?;

        let result = service
            .list_tools(Default::default())
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;

        self.logger
            .info(&format!("[McpClient] Listed {} tools", result.tools.len()));

        // Map SDK tool shapes into RawTool here, once
        let tools = result
            .tools
            .into_iter()
            .map(|tool| RawTool {
                name: tool.name.to_string(),
                description: tool
                    .description
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                input_schema: serde_json::to_value(tool.input_schema.as_ref())
                    .unwrap_or(Value::Object(Default::default())),
            })
            .collect();

        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<Value> {
        self.logger
            .info(&format!("[McpClient] Calling tool: {}", name));

        let guard = self.service.lock().await;
        let service = guard
            .as_ref()
            .ok_or_else(|| McpError::ConnectionFailed("session is closed".to_string()))?;

        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: arguments.as_object().cloned(),
            task: None,
        };

        let result = service
            .call_tool(params)
            .await
            .map_err(|e| McpError::ToolCallFailed(e.to_string()))?;

        serde_json::to_value(&result).map_err(|e| McpError::Protocol(e.to_string()))
    }

    async fn close(&self) -> McpResult<()> {
        self.logger.info("[McpClient] Closing connection");

        let service = self.service.lock().await.take();
        if let Some(service) = service {
            service
                .cancel()
                .await
                .map_err(|e| McpError::Protocol(e.to_string()))?;
        }
        Ok(())
    }
}

/// Production connector: builds rmcp-backed transports from server configs
pub struct McpConnector {
    logger: Arc<dyn Logger>,
}

impl McpConnector {
    /// Create a connector
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

#[async_trait]
impl Connector for McpConnector {
    async fn connect(&self, config: &ServerConfig) -> McpResult<Arc<dyn ToolTransport>> {
        match config.transport {
            TransportKind::Stdio => {
                let command = config.command.as_deref().ok_or_else(|| {
                    McpError::UnsupportedTransport(
                        "command is required for stdio servers".to_string(),
                    )
                })?;
                let client =
                    McpClient::connect_stdio(command, &config.args, self.logger.clone()).await?;
                Ok(Arc::new(client))
            }
            TransportKind::Http => {
                let url = config.url.as_deref().ok_or_else(|| {
                    McpError::UnsupportedTransport("url is required for http servers".to_string())
                })?;
                let auth = config.headers.get("Authorization").map(String::as_str);
                let client = McpClient::connect_http(url, auth, self.logger.clone()).await?;
                Ok(Arc::new(client))
            }
        }
    }
}
