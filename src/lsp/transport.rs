//! LSP transport abstraction (framed Content-Length messages).
use async_trait::async_trait;

use crate::lsp::error::LspError;

/// Minimal async trait for LSP transport.
/// - `send` takes a JSON body (not including LSP headers) and will frame it (Content-Length) and send.
/// - `read` returns the next JSON body string (header stripped).
#[async_trait]
pub trait LspTransport: Send + Sync {
    async fn send(&mut self, json_body: &str) -> Result<(), LspError>;
    async fn read(&mut self) -> Result<String, LspError>;
}

/// Scripted transport for exercising client logic without a process.
/// Records every body sent and hands out canned replies in order; the
/// shared handles stay usable after the transport is boxed away.
#[cfg(test)]
pub struct ScriptedTransport {
    sent: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
    reads: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    replies: std::collections::VecDeque<String>,
}

#[cfg(test)]
pub type SentLog = std::sync::Arc<std::sync::Mutex<Vec<String>>>;
#[cfg(test)]
pub type ReadCounter = std::sync::Arc<std::sync::atomic::AtomicUsize>;

#[cfg(test)]
impl ScriptedTransport {
    pub fn new(replies: &[&str]) -> (Self, SentLog, ReadCounter) {
        let sent = SentLog::default();
        let reads = ReadCounter::default();
        let transport = ScriptedTransport {
            sent: sent.clone(),
            reads: reads.clone(),
            replies: replies.iter().map(|s| s.to_string()).collect(),
        };
        (transport, sent, reads)
    }
}

#[cfg(test)]
#[async_trait]
impl LspTransport for ScriptedTransport {
    async fn send(&mut self, json_body: &str) -> Result<(), LspError> {
        self.sent.lock().unwrap().push(json_body.to_string());
        Ok(())
    }

    async fn read(&mut self) -> Result<String, LspError> {
        self.reads
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.replies.pop_front().ok_or_else(|| {
            LspError::Read(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "no more scripted replies",
            ))
        })
    }
}
