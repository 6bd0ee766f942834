// low-level stdio transport: process spawn and Content-Length framing
use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::lsp::error::LspError;
use crate::lsp::transport::LspTransport;

pub struct StdioTransport {
    writer: ChildStdin,
    reader: BufReader<ChildStdout>,
}

impl StdioTransport {
    pub fn new(writer: ChildStdin, reader: BufReader<ChildStdout>) -> Self {
        StdioTransport { writer, reader }
    }
}

#[async_trait::async_trait]
impl LspTransport for StdioTransport {
    async fn send(&mut self, json_body: &str) -> Result<(), LspError> {
        write_message_to(&mut self.writer, json_body).await
    }

    async fn read(&mut self) -> Result<String, LspError> {
        read_message_from(&mut self.reader).await
    }
}

/// Wrap a JSON body in the wire framing: `Content-Length: N\r\n\r\n` where
/// N counts payload bytes, not characters.
pub fn frame(json_body: &str) -> String {
    format!("Content-Length: {}\r\n\r\n{}", json_body.len(), json_body)
}

/// Write a single framed message and flush, so the peer observes the bytes
/// immediately instead of sitting in a buffer.
pub async fn write_message_to<W>(writer: &mut W, json_body: &str) -> Result<(), LspError>
where
    W: AsyncWrite + Unpin + Send,
{
    writer
        .write_all(frame(json_body).as_bytes())
        .await
        .map_err(LspError::Write)?;
    writer.flush().await.map_err(LspError::Write)?;
    Ok(())
}

/// Read a single framed message: scan the header block for the declared
/// byte length, then read exactly that many payload bytes.
pub async fn read_message_from<R>(reader: &mut R) -> Result<String, LspError>
where
    R: AsyncRead + Unpin + Send,
{
    let mut header_buffer = Vec::new();

    loop {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte).await.map_err(LspError::Read)?;
        header_buffer.push(byte[0]);
        if header_buffer.ends_with(b"\r\n\r\n") {
            break;
        }
    }

    let header_str = String::from_utf8(header_buffer)?;
    let content_length = content_length_from(&header_str)?;
    let mut payload_buffer = vec![0u8; content_length];
    reader
        .read_exact(&mut payload_buffer)
        .await
        .map_err(LspError::Read)?;

    Ok(String::from_utf8(payload_buffer)?)
}

/// Extract `Content-Length` from a header block. Key match is
/// case-insensitive; other headers (e.g. Content-Type) are ignored.
pub(crate) fn content_length_from(header: &str) -> Result<usize, LspError> {
    for line in header.lines() {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case("content-length") {
                return value.trim().parse::<usize>().map_err(|e| {
                    LspError::Framing(format!("bad Content-Length `{}`: {}", value.trim(), e))
                });
            }
        }
    }
    Err(LspError::Framing("Content-Length header not found".into()))
}

/// Launch the language server with stdin, stdout and stderr piped. A
/// background task drains stderr into the log; an undrained stderr pipe
/// would eventually block the child.
pub fn spawn_server(path: &Path) -> Result<(Child, ChildStdin, BufReader<ChildStdout>), LspError> {
    let mut child = Command::new(path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| LspError::Launch {
            path: path.to_path_buf(),
            source: e,
        })?;

    let writer = child.stdin.take().ok_or_else(|| LspError::Launch {
        path: path.to_path_buf(),
        source: std::io::Error::other("child stdin was not captured"),
    })?;
    let stdout = child.stdout.take().ok_or_else(|| LspError::Launch {
        path: path.to_path_buf(),
        source: std::io::Error::other("child stdout was not captured"),
    })?;

    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!("server stderr: {line}");
            }
        });
    }

    Ok((child, writer, BufReader::new(stdout)))
}

#[cfg(test)]
mod tests {
    use super::{content_length_from, frame, read_message_from, write_message_to};
    use crate::lsp::error::LspError;
    use pretty_assertions::assert_eq;
    use tokio::io::{duplex, AsyncWriteExt};

    #[test]
    fn frame_counts_bytes_not_characters() {
        let body = r#"{"name":"héllo"}"#;
        assert_eq!(body.chars().count(), 16);
        assert_eq!(body.len(), 17);
        assert_eq!(frame(body), format!("Content-Length: 17\r\n\r\n{body}"));
    }

    #[test]
    fn frame_is_header_blank_line_payload() {
        assert_eq!(frame("{}"), "Content-Length: 2\r\n\r\n{}");
    }

    #[test]
    fn content_length_is_case_insensitive() {
        let header = "content-length: 42\r\n\r\n";
        assert_eq!(content_length_from(header).unwrap(), 42);
    }

    #[tokio::test]
    async fn read_message_from_duplex() {
        let (mut a, mut b) = duplex(1024);

        let writer = tokio::spawn(async move {
            let json = r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#;
            write_message_to(&mut a, json).await.expect("write failed");
        });

        let body = read_message_from(&mut b).await.expect("read failed");
        assert!(body.contains("\"result\""));

        writer.await.unwrap();
    }

    #[tokio::test]
    async fn read_message_ignores_extra_headers() {
        let (mut a, mut b) = duplex(1024);

        let writer = tokio::spawn(async move {
            a.write_all(b"Content-Type: application/vscode-jsonrpc\r\nContent-Length: 2\r\n\r\n{}")
                .await
                .unwrap();
            a.flush().await.unwrap();
        });

        let body = read_message_from(&mut b).await.expect("read failed");
        assert_eq!(body, "{}");

        writer.await.unwrap();
    }

    #[tokio::test]
    async fn read_message_with_malformed_content_length() {
        let (mut a, mut b) = duplex(64);

        let writer = tokio::spawn(async move {
            a.write_all(b"Content-Length: abc\r\n\r\n").await.unwrap();
            a.flush().await.unwrap();
        });

        let res = read_message_from(&mut b).await;
        assert!(matches!(res, Err(LspError::Framing(_))));

        writer.await.unwrap();
    }
}
