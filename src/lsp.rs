pub mod error;
pub mod message_creator;
pub mod message_parser;
pub mod stdio_transport;
pub mod transport;
pub mod types;

use std::path::Path;

use anyhow::{bail, Context};
use lsp_types::{InitializeResult, SymbolInformation, SymbolKind};

use crate::lsp::message_creator::{initialize_params, MessageFactory};
use crate::lsp::message_parser::parse_message_from_str;
use crate::lsp::transport::LspTransport;
use crate::lsp::types::{Message, ResponseMessage};

/// Drives the smoke handshake over a boxed transport. Higher layers pick
/// the transport; the client only composes envelopes and reads replies.
pub struct LspClient {
    transport: Box<dyn LspTransport>,
    factory: MessageFactory,
}

impl LspClient {
    pub fn new(transport: Box<dyn LspTransport>) -> Self {
        LspClient {
            transport,
            factory: MessageFactory::new(),
        }
    }

    /// Send `initialize` (always id 1), echoing the exact framed text
    /// before it goes out, then perform exactly one framed read and echo
    /// the raw reply payload.
    pub async fn initialize(&mut self, process_id: u32, root_path: &str) -> anyhow::Result<()> {
        let request = self
            .factory
            .create_request("initialize", initialize_params(process_id, root_path))?;
        let body = serde_json::to_string(&request)?;

        println!("Sending initialize request...");
        println!("{}", stdio_transport::frame(&body));

        self.transport.send(&body).await?;

        let reply = self.transport.read().await?;
        println!("Response: {reply}");

        match parse_message_from_str(&reply)? {
            Message::Response(response) => {
                if let Some(result) = response.result {
                    // serverInfo is informational only; the reply is not
                    // validated beyond envelope classification
                    if let Ok(initialize) = serde_json::from_value::<InitializeResult>(result) {
                        if let Some(info) = initialize.server_info {
                            tracing::info!(
                                name = %info.name,
                                version = info.version.as_deref().unwrap_or(""),
                                "server ready"
                            );
                        }
                    }
                }
            }
            Message::Error(response) => {
                bail!("initialize was rejected: {:?}", response.error);
            }
            Message::Notification(notification) => {
                tracing::debug!(
                    method = %notification.method,
                    "notification arrived instead of the initialize response"
                );
            }
        }

        Ok(())
    }

    /// Tell the server the client is ready for requests. Only needed ahead
    /// of document operations; the plain handshake never sends it.
    pub async fn initialized(&mut self) -> anyhow::Result<()> {
        let notification = self
            .factory
            .create_notification("initialized", serde_json::json!({}))?;
        self.transport
            .send(&serde_json::to_string(&notification)?)
            .await?;
        Ok(())
    }

    /// Open a file on the server and print its functions and structs.
    pub async fn check_document(&mut self, path: &Path, language_id: &str) -> anyhow::Result<()> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read document {}", path.display()))?;
        let absolute = tokio::fs::canonicalize(path)
            .await
            .with_context(|| format!("failed to resolve document path {}", path.display()))?;
        let uri = format!("file://{}", absolute.display());

        let did_open = self.factory.create_notification(
            "textDocument/didOpen",
            serde_json::json!({
                "textDocument": {
                    "uri": uri,
                    "languageId": language_id,
                    "version": 1,
                    "text": text,
                }
            }),
        )?;
        self.transport
            .send(&serde_json::to_string(&did_open)?)
            .await?;

        let request = self.factory.create_request(
            "textDocument/documentSymbol",
            serde_json::json!({
                "textDocument": { "uri": uri }
            }),
        )?;
        let id = request.id;
        self.transport
            .send(&serde_json::to_string(&request)?)
            .await?;

        let response = self.receive_response(id).await?;
        let Some(result) = response.result else {
            println!("Symbols: none");
            return Ok(());
        };

        let symbols: Vec<SymbolInformation> = serde_json::from_value(result)?;
        for symbol in symbols {
            match symbol.kind {
                SymbolKind::FUNCTION => println!("Function: {}", symbol.name),
                SymbolKind::STRUCT => println!("Struct: {}", symbol.name),
                _ => {}
            }
        }

        Ok(())
    }

    /// Send `shutdown` (empty params, no response read) followed by the
    /// `exit` notification.
    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        let request = self
            .factory
            .create_request("shutdown", serde_json::json!({}))?;
        self.transport
            .send(&serde_json::to_string(&request)?)
            .await?;

        let notification = self
            .factory
            .create_notification("exit", serde_json::json!({}))?;
        self.transport
            .send(&serde_json::to_string(&notification)?)
            .await?;

        Ok(())
    }

    /// Wait for the response with the given id, consuming interleaved
    /// notifications along the way.
    async fn receive_response(&mut self, id: i32) -> anyhow::Result<ResponseMessage> {
        loop {
            let reply = self.transport.read().await?;
            match parse_message_from_str(&reply)? {
                Message::Response(response) if response.id == id => return Ok(response),
                Message::Response(response) => {
                    tracing::warn!(id = response.id, "response for another request: ignored");
                }
                Message::Error(response) if response.id == id => {
                    bail!("request {id} was rejected: {:?}", response.error);
                }
                Message::Error(response) => {
                    tracing::warn!(id = response.id, "error for another request: ignored");
                }
                Message::Notification(notification) => {
                    if notification.method == "textDocument/publishDiagnostics" {
                        let count = notification
                            .params
                            .get("diagnostics")
                            .and_then(|d| d.as_array())
                            .map_or(0, |d| d.len());
                        println!("Diagnostics: {count}");
                    } else {
                        tracing::debug!(
                            method = %notification.method,
                            "notification while waiting for id={id}: ignored"
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::atomic::Ordering;

    use super::LspClient;
    use crate::lsp::transport::ScriptedTransport;

    const INITIALIZE_REPLY: &str = r#"{"jsonrpc":"2.0","id":1,"result":{"capabilities":{}}}"#;

    #[tokio::test]
    async fn handshake_is_three_sends_with_one_read_after_the_first() {
        let (transport, sent, reads) = ScriptedTransport::new(&[INITIALIZE_REPLY]);
        let mut client = LspClient::new(Box::new(transport));

        client.initialize(12345, "/tmp").await.unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 1);

        client.shutdown().await.unwrap();

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert!(sent[0].contains(r#""method":"initialize""#));
        assert!(sent[0].contains(r#""id":1"#));
        assert!(sent[0].contains(r#""processId":12345"#));
        assert!(sent[0].contains(r#""rootPath":"/tmp""#));
        assert!(sent[0].contains(r#""capabilities":{}"#));
        assert!(sent[1].contains(r#""method":"shutdown""#));
        assert!(sent[1].contains(r#""params":{}"#));
        assert!(sent[2].contains(r#""method":"exit""#));
        assert!(!sent[2].contains(r#""id""#));

        // shutdown and exit trigger no further reads
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn initialize_rejection_is_an_error() {
        let (transport, _sent, _reads) = ScriptedTransport::new(&[
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32600,"message":"Invalid JSON-RPC version"}}"#,
        ]);
        let mut client = LspClient::new(Box::new(transport));

        let result = client.initialize(12345, "/tmp").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn document_check_prints_symbols_and_skips_notifications() {
        let mut document = tempfile::NamedTempFile::new().unwrap();
        writeln!(document, "func main() {{}}").unwrap();

        let (transport, sent, _reads) = ScriptedTransport::new(&[
            r#"{"jsonrpc":"2.0","method":"textDocument/publishDiagnostics","params":{"uri":"file:///x","diagnostics":[]}}"#,
            r#"{"jsonrpc":"2.0","id":1,"result":[{"name":"main","kind":12,"location":{"uri":"file:///x","range":{"start":{"line":0,"character":0},"end":{"line":0,"character":0}}}}]}"#,
        ]);
        let mut client = LspClient::new(Box::new(transport));

        client
            .check_document(document.path(), "glu")
            .await
            .unwrap();

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains(r#""method":"textDocument/didOpen""#));
        assert!(sent[0].contains(r#""languageId":"glu""#));
        assert!(!sent[0].contains(r#""id""#));
        assert!(sent[1].contains(r#""method":"textDocument/documentSymbol""#));
    }
}
