//! Sparse registry server binary

use anyhow::{Context, Result};
use clap::Parser;
use registry_server::{run_server, Config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sparse-registry")]
#[command(about = "Sparse-index Cargo registry backed by a directory of crate archives")]
#[command(version)]
struct Cli {
    /// JSON configuration file (optional)
    #[arg(long, default_value = "registry.json")]
    config: PathBuf,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to
    #[arg(long)]
    port: Option<u16>,

    /// Scheme used in URLs handed to Cargo ("http" or "https")
    #[arg(long)]
    protocol: Option<String>,

    /// Directory holding the .crate archives
    #[arg(long)]
    packages: Option<PathBuf>,

    /// Shared secret required on uploads
    #[arg(long)]
    token: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let mut config = Config::load_or_default(&self.config)
            .with_context(|| format!("Failed to load {}", self.config.display()))?;

        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(protocol) = self.protocol {
            config.server.protocol = protocol;
        }
        if let Some(packages) = self.packages {
            config.storage.package_path = packages;
        }
        if let Some(token) = self.token {
            config.security.token = Some(token);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = registry_logging::init_subscriber();

    let config = Cli::parse().into_config()?;
    run_server(config).await
}
