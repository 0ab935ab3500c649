//! Line-oriented host protocol.
//!
//! One JSON object per line in each direction:
//!
//! ```text
//! -> {"document": "/proj/a.py", "saved": true}
//! <- {"document": "/proj/a.py", "diagnostics": [...]}
//! -> {"method": "settings"}
//! <- {"plugins": {"pyright_bridge": {...}}}
//! -> {"method": "shutdown"}
//! ```
//!
//! A malformed line gets `{"error": ...}` and the loop carries on. EOF or a
//! shutdown request stops the analyzer and returns.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use url::Url;

use pyright_bridge::{Diagnostic, LintHandle, LintRequest, PyrightSettings};
use pyright_bridge_types::settings_schema;

#[derive(Debug, Deserialize)]
struct LintMessage {
    document: String,
    saved: bool,
    #[serde(default)]
    settings: Option<PyrightSettings>,
}

#[derive(Debug, Serialize)]
struct LintResponse<'a> {
    document: &'a str,
    diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Serve requests from `input` until EOF or shutdown, then stop the service.
pub async fn serve<R, W>(input: R, mut output: W, handle: &LintHandle) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.context("reading host request")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (reply, flow) = respond(line, handle).await;
        if let Some(reply) = reply {
            write_line(&mut output, &reply).await?;
        }
        if flow == Flow::Stop {
            break;
        }
    }

    tracing::info!("Host closed; shutting down");
    handle.shutdown().await;
    Ok(())
}

async fn respond(line: &str, handle: &LintHandle) -> (Option<Value>, Flow) {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => return (Some(error_reply(format!("invalid JSON: {e}"))), Flow::Continue),
    };

    if let Some(method) = value.get("method") {
        return match method.as_str() {
            Some("settings") => (Some(settings_schema()), Flow::Continue),
            Some("shutdown") => (None, Flow::Stop),
            _ => (
                Some(error_reply(format!("unknown method: {method}"))),
                Flow::Continue,
            ),
        };
    }

    let message = match LintMessage::deserialize(&value) {
        Ok(message) => message,
        Err(e) => return (Some(error_reply(format!("invalid request: {e}"))), Flow::Continue),
    };
    let path = match document_path(&message.document) {
        Ok(path) => path,
        Err(e) => return (Some(error_reply(e)), Flow::Continue),
    };

    let request = LintRequest {
        document: path.clone(),
        saved: message.saved,
        settings: message.settings,
    };
    match handle.lint(request).await {
        Ok(diagnostics) => {
            for diagnostic in &diagnostics {
                tracing::debug!("{}", diagnostic.display_with_path(&path));
            }
            let response = LintResponse {
                document: &message.document,
                diagnostics,
            };
            match serde_json::to_value(&response) {
                Ok(value) => (Some(value), Flow::Continue),
                Err(e) => (
                    Some(error_reply(format!("encoding diagnostics: {e}"))),
                    Flow::Continue,
                ),
            }
        }
        Err(e) => (Some(error_reply(e.to_string())), Flow::Stop),
    }
}

/// Accept a plain path or a `file://` URI.
fn document_path(document: &str) -> Result<PathBuf, String> {
    if !document.starts_with("file:") {
        return Ok(PathBuf::from(document));
    }
    let url = Url::parse(document).map_err(|e| format!("invalid document URI {document}: {e}"))?;
    url.to_file_path()
        .map_err(|()| format!("not a local file URI: {document}"))
}

fn error_reply(message: impl Into<String>) -> Value {
    json!({ "error": message.into() })
}

async fn write_line<W>(output: &mut W, value: &Value) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut bytes = serde_json::to_vec(value).context("encoding host response")?;
    bytes.push(b'\n');
    output
        .write_all(&bytes)
        .await
        .context("writing host response")?;
    output.flush().await.context("flushing host response")
}
