//! Stand-in language server used by the integration tests.
//!
//! Speaks Content-Length framed JSON-RPC over stdin/stdout with blocking
//! std I/O. Responds to initialize/shutdown, opens documents and answers
//! documentSymbol with a naive scan, and terminates on the exit
//! notification with status 0 only when shutdown was requested first.

use std::collections::HashMap;
use std::io::{Read, Write};

use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct Request {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<Value>,
    method: Option<String>,
    #[serde(default)]
    params: Value,
}

struct StubServer<W: Write> {
    documents: HashMap<String, String>,
    shutdown_requested: bool,
    writer: W,
}

impl<W: Write> StubServer<W> {
    fn new(writer: W) -> Self {
        StubServer {
            documents: HashMap::new(),
            shutdown_requested: false,
            writer,
        }
    }

    fn run(&mut self, reader: &mut dyn Read) {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            match reader.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => buffer.extend_from_slice(&chunk[..n]),
            }

            while let Some((message, consumed)) = try_parse_message(&buffer) {
                buffer.drain(..consumed);
                let Ok(request) = serde_json::from_str::<Request>(&message) else {
                    continue;
                };
                self.handle_message(request);
            }
        }
    }

    fn handle_message(&mut self, request: Request) {
        let Some(method) = request.method else {
            return;
        };
        match request.id {
            // an explicit null id still marks a notification
            Some(id) if !id.is_null() => self.handle_request(&method, id, &request.params),
            _ => self.handle_notification(&method, &request.params),
        }
    }

    fn handle_request(&mut self, method: &str, id: Value, params: &Value) {
        let result = match method {
            "initialize" => json!({
                "capabilities": {
                    "textDocumentSync": 1,
                    "documentSymbolProvider": true,
                    "hoverProvider": true,
                },
                "serverInfo": {
                    "name": "stubls",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
            "shutdown" => {
                self.shutdown_requested = true;
                Value::Null
            }
            "textDocument/documentSymbol" => self.document_symbols(params),
            _ => {
                self.send(&json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {
                        "code": -32601,
                        "message": format!("method not found: {method}"),
                    },
                }));
                return;
            }
        };

        self.send(&json!({ "jsonrpc": "2.0", "id": id, "result": result }));
    }

    fn handle_notification(&mut self, method: &str, params: &Value) {
        match method {
            "textDocument/didOpen" => {
                if let Some(td) = params.get("textDocument") {
                    let uri = td
                        .get("uri")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    let text = td
                        .get("text")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    self.documents.insert(uri.clone(), text);
                    self.send(&json!({
                        "jsonrpc": "2.0",
                        "method": "textDocument/publishDiagnostics",
                        "params": { "uri": uri, "diagnostics": [] },
                    }));
                }
            }
            "textDocument/didClose" => {
                if let Some(uri) = params
                    .get("textDocument")
                    .and_then(|td| td.get("uri"))
                    .and_then(Value::as_str)
                {
                    self.documents.remove(uri);
                }
            }
            "exit" => {
                std::process::exit(if self.shutdown_requested { 0 } else { 1 });
            }
            // initialized and everything else is accepted silently
            _ => {}
        }
    }

    /// Flat symbol list: every `func <name>(` line becomes a Function
    /// symbol with a zeroed range.
    fn document_symbols(&self, params: &Value) -> Value {
        let uri = params
            .get("textDocument")
            .and_then(|td| td.get("uri"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let Some(text) = self.documents.get(uri) else {
            return json!([]);
        };

        let mut symbols = Vec::new();
        for line in text.lines() {
            if let Some(rest) = line.trim_start().strip_prefix("func ") {
                let name = rest.split('(').next().unwrap_or("").trim();
                if name.is_empty() {
                    continue;
                }
                symbols.push(json!({
                    "name": name,
                    "kind": 12,
                    "location": {
                        "uri": uri,
                        "range": {
                            "start": { "line": 0, "character": 0 },
                            "end": { "line": 0, "character": 0 },
                        },
                    },
                }));
            }
        }
        Value::Array(symbols)
    }

    fn send(&mut self, message: &Value) {
        let content = message.to_string();
        let _ = write!(
            self.writer,
            "Content-Length: {}\r\n\r\n{}",
            content.len(),
            content
        );
        let _ = self.writer.flush();
    }
}

/// Split one framed message off the front of the buffer, returning the
/// payload and the number of bytes consumed. `None` until a full frame
/// has arrived.
fn try_parse_message(buffer: &[u8]) -> Option<(String, usize)> {
    let header_end = buffer.windows(4).position(|w| w == b"\r\n\r\n")? + 4;
    let header = std::str::from_utf8(&buffer[..header_end]).ok()?;

    let mut content_length = None;
    for line in header.lines() {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse::<usize>().ok();
            }
        }
    }

    let length = content_length?;
    if buffer.len() < header_end + length {
        return None;
    }
    let payload = String::from_utf8(buffer[header_end..header_end + length].to_vec()).ok()?;
    Some((payload, header_end + length))
}

fn main() {
    let stdin = std::io::stdin();
    let mut server = StubServer::new(std::io::stdout());
    server.run(&mut stdin.lock());
}
