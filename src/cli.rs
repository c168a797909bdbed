use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::SentinelConfig;
use crate::error::Result;

/// A3S Sentinel - Real-time security event streaming
#[derive(Debug, Parser)]
#[command(name = "a3s-sentinel", version, about)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP/WebSocket server and the event pump
    Serve(ServeArgs),

    /// Print the effective configuration as TOML
    Config(ServeArgs),
}

/// Settings shared by `serve` and `config`; flags override the file.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ServeArgs {
    /// Path to a TOML config file
    #[arg(long, default_value = "sentinel.toml")]
    pub config: PathBuf,

    /// Host address to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Milliseconds between produced events
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Directory for the JSONL event store (in-memory if omitted)
    #[arg(long)]
    pub store_path: Option<PathBuf>,
}

impl ServeArgs {
    /// Load the config file and apply command-line overrides.
    pub fn resolve(&self) -> Result<SentinelConfig> {
        let mut config = SentinelConfig::load(&self.config)?;
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(interval_ms) = self.interval_ms {
            config.interval_ms = interval_ms;
        }
        if let Some(path) = &self.store_path {
            config.store_path = Some(path.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::parse_from([
            "a3s-sentinel",
            "serve",
            "--port",
            "9100",
            "--interval-ms",
            "250",
        ]);
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, Some(9100));
        assert_eq!(args.interval_ms, Some(250));
        assert!(!cli.log_json);
    }

    #[test]
    fn test_resolve_applies_overrides_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentinel.toml");
        std::fs::write(&path, "port = 9000\nhost = \"0.0.0.0\"\n").unwrap();

        let args = ServeArgs {
            config: path,
            port: Some(9200),
            ..Default::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.port, 9200);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_resolve_rejects_zero_interval() {
        let dir = tempfile::tempdir().unwrap();
        let args = ServeArgs {
            config: dir.path().join("missing.toml"),
            interval_ms: Some(0),
            ..Default::default()
        };
        assert!(args.resolve().is_err());
    }
}
