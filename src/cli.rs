use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: PathBuf,
    pub process_id: u32,
    pub root_path: String,
    pub document: Option<PathBuf>,
    pub language_id: String,
}

#[derive(Parser, Debug)]
#[command(name = "lsp-smoke")]
#[command(about = "Smoke-test a stdio language server over LSP framing", long_about = None)]
pub struct Cli {
    /// Path to the language server executable. Launched with no arguments.
    server: Option<PathBuf>,

    /// Process id reported in the initialize request.
    #[arg(long, default_value_t = 12345)]
    process_id: u32,

    /// Workspace root path reported in the initialize request.
    #[arg(long, default_value = "/tmp")]
    root_path: String,

    /// Open this file after the handshake and list its symbols.
    #[arg(long)]
    document: Option<PathBuf>,

    /// Language id used when opening the document.
    #[arg(long, default_value = "glu")]
    language_id: String,
}

impl Cli {
    pub fn from_args() -> Self {
        Self::parse()
    }

    pub fn into_config(self) -> Config {
        Config {
            server: self.server.unwrap_or_else(|| PathBuf::from("./glulsp")),
            process_id: self.process_id,
            root_path: self.root_path,
            document: self.document,
            language_id: self.language_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;
    use std::path::Path;

    #[test]
    fn defaults_match_the_plain_handshake() {
        let config = Cli::parse_from(["lsp-smoke"]).into_config();
        assert_eq!(config.server, Path::new("./glulsp"));
        assert_eq!(config.process_id, 12345);
        assert_eq!(config.root_path, "/tmp");
        assert!(config.document.is_none());
    }

    #[test]
    fn server_path_is_positional() {
        let config = Cli::parse_from(["lsp-smoke", "./stubls"]).into_config();
        assert_eq!(config.server, Path::new("./stubls"));
    }
}
