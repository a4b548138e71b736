use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use facewire_server::{FaceServer, ServerConfig, Settings, SniffingDetector};

const USAGE: &str = "Usage: facewire-server clientlimit maxsize [portnumber]";

const EXIT_USAGE: u8 = 12;
const EXIT_RESOURCE: u8 = 9;
const EXIT_LISTEN: u8 = 14;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match ServerConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{USAGE}");
            tracing::debug!("{e}");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let (config, legacy_response) = match load_settings(config) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("facewire-server: cannot load the legacy response resource");
            tracing::debug!("{e:#}");
            return ExitCode::from(EXIT_RESOURCE);
        }
    };

    let server = match FaceServer::bind(config, SniffingDetector::new(), legacy_response).await {
        Ok(server) => server,
        Err(e) => {
            eprintln!(
                "facewire-server: cannot listen on given port \"{}\"",
                e.port()
            );
            tracing::debug!("{e}");
            return ExitCode::from(EXIT_LISTEN);
        }
    };

    // The port is the first line on stderr; log events follow it.
    eprintln!("{}", server.port());

    // Only a cancelled token ends the loop, and nothing here cancels it.
    if let Err(e) = server.run().await {
        tracing::error!("server stopped: {e}");
    }
    ExitCode::SUCCESS
}

/// Applies the optional settings file and loads the legacy-fallback blob.
fn load_settings(config: ServerConfig) -> anyhow::Result<(ServerConfig, Arc<[u8]>)> {
    let settings = Settings::from_env().context("loading server settings")?;
    let legacy_response = settings
        .legacy_response()
        .context("loading legacy response")?;
    Ok((config.with_settings(&settings), legacy_response))
}
