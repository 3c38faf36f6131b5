//! The `graph_command` tool
//!
//! Defines the tool schema, parses call arguments, runs the command through
//! the executor, and renders the result as Markdown for the MCP client.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::graph::{CommandExecutor, CommandResult, HttpMethod};
use crate::mcp::types::{CallToolResponse, McpTool, ToolAnnotations, ToolResponseContent};

/// Name of the single tool this server exposes
pub const GRAPH_COMMAND_TOOL: &str = "graph_command";

/// Arguments accepted by `graph_command`
#[derive(Debug, Clone, Deserialize)]
pub struct GraphCommandArgs {
    /// Graph endpoint relative to the API base
    pub command: String,
    /// HTTP verb; `GET` when omitted
    #[serde(default = "default_method")]
    pub method: String,
    /// Request body for POST, PUT and PATCH
    #[serde(default)]
    pub data: Option<Value>,
    /// Client secret for the custom app registration
    #[serde(default)]
    pub client_secret: Option<String>,
}

fn default_method() -> String {
    HttpMethod::Get.to_string()
}

impl GraphCommandArgs {
    /// Parse tool arguments
    ///
    /// # Errors
    ///
    /// Returns a message when `command` is missing or blank, or when a field
    /// has the wrong type
    pub fn parse(arguments: Option<Value>) -> std::result::Result<Self, String> {
        let arguments = arguments.unwrap_or_else(|| json!({}));
        let args: GraphCommandArgs = serde_json::from_value(arguments)
            .map_err(|e| format!("Invalid arguments for {}: {}", GRAPH_COMMAND_TOOL, e))?;
        if args.command.trim().is_empty() {
            return Err("Missing required argument: command".to_string());
        }
        Ok(args)
    }
}

/// Tool definition advertised by `tools/list`
pub fn graph_command_tool() -> McpTool {
    let methods: Vec<&str> = HttpMethod::ALL.iter().map(|m| m.as_str()).collect();
    McpTool {
        name: GRAPH_COMMAND_TOOL.to_string(),
        title: Some("Microsoft Graph command".to_string()),
        description: Some(
            "Execute Microsoft Graph API commands. Supports GET, POST, PUT, PATCH, DELETE operations."
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Graph API endpoint (e.g., 'users', 'me', 'groups', 'devices')"
                },
                "method": {
                    "type": "string",
                    "enum": methods,
                    "default": "GET",
                    "description": "HTTP method to use"
                },
                "data": {
                    "type": "object",
                    "description": "Request body data (for POST, PUT, PATCH operations)"
                },
                "client_secret": {
                    "type": "string",
                    "description": "Azure AD client secret (optional, for authenticated operations)"
                }
            },
            "required": ["command"]
        }),
        annotations: Some(ToolAnnotations {
            open_world_hint: Some(true),
            ..Default::default()
        }),
    }
}

/// Run `graph_command` and build the tool response
pub async fn call_graph_command(
    executor: &CommandExecutor,
    arguments: Option<Value>,
) -> CallToolResponse {
    let args = match GraphCommandArgs::parse(arguments) {
        Ok(args) => args,
        Err(message) => {
            tracing::warn!("Rejected {} call: {}", GRAPH_COMMAND_TOOL, message);
            return CallToolResponse {
                content: vec![ToolResponseContent::Text {
                    text: format!("❌ **Tool Execution Failed**\n\n**Error:** {}", message),
                }],
                is_error: Some(true),
                structured_content: None,
            };
        }
    };

    let result = executor
        .execute(&args.command, &args.method, args.data, args.client_secret)
        .await;

    let structured = match serde_json::to_value(result.envelope()) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Failed to serialize command envelope: {}", e);
            None
        }
    };

    CallToolResponse {
        content: vec![ToolResponseContent::Text {
            text: render(&result, &args.method, &args.command),
        }],
        is_error: Some(!result.is_success()),
        structured_content: structured,
    }
}

/// Render a result as Markdown
///
/// # Examples
///
/// ```
/// use graph_mcp::graph::CommandResult;
/// use graph_mcp::mcp::tools::render;
/// use serde_json::json;
///
/// let text = render(&CommandResult::success(json!({}), 200), "GET", "me");
/// assert_eq!(text, "✅ **Success** (GET me)\n\nOperation completed successfully.");
/// ```
pub fn render(result: &CommandResult, method: &str, command: &str) -> String {
    let envelope = result.envelope();

    if envelope.success {
        let mut text = format!("✅ **Success** ({} {})\n\n", method, command);
        match envelope.data.as_ref().filter(|d| is_truthy(d)) {
            Some(data) => text.push_str(&format!("```json\n{}\n```", pretty(data))),
            None => text.push_str("Operation completed successfully."),
        }
        return text;
    }

    let mut text = format!("❌ **Error** ({} {})\n\n", method, command);
    text.push_str(&format!(
        "**Error:** {}\n\n",
        envelope.error.as_deref().unwrap_or("Unknown error")
    ));

    if envelope.auth_required {
        if let Some(instructions) = envelope.instructions.as_deref().filter(|i| !i.is_empty()) {
            text.push_str(&format!("**Instructions:**\n{}\n\n", instructions));
        }
    }

    if let Some(details) = envelope.error_details.as_ref().filter(|d| is_truthy(d)) {
        text.push_str(&format!("**Details:**\n```json\n{}\n```", pretty(details)));
    }

    text
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Empty containers, empty strings, zero, false and null render as absent
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
