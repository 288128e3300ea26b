//! Server command: runs the courier server in the foreground.

use std::path::Path;

use tracing::info;

use courier_server::{ServerConfig, SignalHandler, SocketServer};

use crate::cli::Cli;
use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Resolves the server configuration: a server config file if given,
/// otherwise the client config, with command-line flags on top.
pub fn resolve_config(
    cli: &Cli,
    config: &ClientConfig,
    server_config: Option<&Path>,
) -> ClientResult<ServerConfig> {
    let mut resolved = match server_config {
        Some(path) => ServerConfig::load_from(path)?,
        None => config.server_config(),
    };
    if let Some(host) = &cli.host {
        resolved.host = host.clone();
    }
    if let Some(port) = cli.port {
        resolved.port = port;
    }
    if cli.debug {
        resolved.debug = true;
    }
    Ok(resolved)
}

/// Starts the server and blocks until SIGINT/SIGTERM.
pub async fn run(server_config: ServerConfig) -> ClientResult<()> {
    let signal_handler = SignalHandler::new();
    signal_handler.spawn_listener();

    let server = SocketServer::bind(server_config).await?;
    info!(address = %server.local_addr()?, debug = server.config().debug, "Server started");

    server
        .run_until_shutdown(signal_handler.shutdown().wait())
        .await?;

    info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn flags_override_client_config() {
        let cli = Cli::try_parse_from(["courier", "--port", "0", "-v", "server"]).unwrap();
        let resolved = resolve_config(&cli, &ClientConfig::default(), None).unwrap();
        assert_eq!(resolved.bind_address(), "127.0.0.1:0");
        assert!(resolved.debug);
    }

    #[test]
    fn server_config_file_wins_over_client_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host = \"0.0.0.0\"\nport = 9100").unwrap();

        let cli = Cli::try_parse_from(["courier", "server"]).unwrap();
        let resolved = resolve_config(&cli, &ClientConfig::default(), Some(file.path())).unwrap();
        assert_eq!(resolved.bind_address(), "0.0.0.0:9100");
        assert!(!resolved.debug);
    }
}
