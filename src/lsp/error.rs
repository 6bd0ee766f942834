use std::path::PathBuf;

use thiserror::Error;

/// Faults raised while driving the language server. Launch, pipe and
/// payload problems stay distinguishable so callers can report them as
/// separate outcomes instead of one opaque abort.
#[derive(Debug, Error)]
pub enum LspError {
    #[error("failed to launch language server `{path}`: {source}")]
    Launch {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write to the server's stdin: {0}")]
    Write(std::io::Error),

    #[error("failed to read from the server's stdout: {0}")]
    Read(std::io::Error),

    #[error("malformed message framing: {0}")]
    Framing(String),

    #[error("message payload is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("message payload is not valid JSON-RPC: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("message is neither a response nor a notification")]
    UnknownMessage,
}
