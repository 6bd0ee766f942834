use crate::cli::Config;
use crate::lsp;
use crate::lsp::stdio_transport::{spawn_server, StdioTransport};

/// Run the smoke sequence: launch, initialize (one read), optional
/// document check, shutdown, exit, wait for the server to terminate.
///
/// A launch failure aborts before any message is sent. Every later step
/// reports its own fault and the teardown still runs, so one rejected
/// request does not leave the server process behind.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let (mut child, writer, reader) = spawn_server(&config.server)?;
    tracing::debug!(server = %config.server.display(), "language server launched");

    let stdio = StdioTransport::new(writer, reader);
    let mut client = lsp::LspClient::new(Box::new(stdio));

    match client.initialize(config.process_id, &config.root_path).await {
        Ok(()) => {
            if let Some(document) = &config.document {
                if let Err(e) = client.initialized().await {
                    eprintln!("Initialized notification Error: {e:?}");
                } else {
                    match client.check_document(document, &config.language_id).await {
                        Ok(()) => println!("Document check Success"),
                        Err(e) => eprintln!("Document check Error: {e:?}"),
                    }
                }
            }
        }
        Err(e) => eprintln!("Initialization Error: {e:?}"),
    }

    if let Err(e) = client.shutdown().await {
        eprintln!("Shutdown Error: {e:?}");
    }

    // no timeout: a server that ignores exit keeps us waiting
    let status = child.wait().await?;
    tracing::debug!(?status, "language server exited");

    println!("LSP smoke test completed");
    Ok(())
}
