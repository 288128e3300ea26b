//! courier CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use courier_client::cli::{Cli, Command, ConfigAction};
use courier_client::commands::messaging::{self, Output};
use courier_client::config::ClientConfig;
use courier_client::error::{ClientError, ClientResult};
use courier_client::{SocketClient, commands};
use courier_core::{TracingConfig, init_tracing};

// One thread: the server's connections and handlers all run on it.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path).map_err(ClientError::Config)?,
        None => ClientConfig::load().unwrap_or_default(),
    };

    if let Command::Server { ref server_config } = cli.command {
        let server_config =
            commands::server::resolve_config(&cli, &config, server_config.as_deref())?;
        let tracing_config =
            TracingConfig::server(server_config.debug).with_format(cli.log_format);
        init_tracing(tracing_config).map_err(|e| ClientError::Config(e.to_string()))?;
        return commands::server::run(server_config).await;
    }

    let tracing_config =
        TracingConfig::client(cli.debug_enabled(&config)).with_format(cli.log_format);
    init_tracing(tracing_config).map_err(|e| ClientError::Config(e.to_string()))?;

    if let Command::Config { ref action } = cli.command {
        return match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Path => commands::config::path(),
        };
    }

    let settings = cli.server_settings(&config);
    let mut client =
        SocketClient::connect(&settings.host, settings.port, cli.timeout(&config)).await?;
    let output = Output::from_flag(cli.json);

    match cli.command {
        Command::Echo { ref text } => messaging::echo(&mut client, text, output).await,
        Command::Register { ref credentials } => {
            messaging::register(&mut client, credentials).await
        }
        Command::Messages {
            ref credentials,
            unread,
        } => messaging::messages(&mut client, credentials, unread, output).await,
        Command::Users {
            ref credentials,
            ref pattern,
        } => messaging::users(&mut client, credentials, pattern, output).await,
        Command::Send {
            ref credentials,
            ref to,
            ref body,
        } => messaging::send(&mut client, credentials, to, body).await,
        Command::Read {
            ref credentials,
            ref ids,
        } => messaging::read(&mut client, credentials, ids.clone()).await,
        Command::Delete {
            ref credentials,
            ref ids,
        } => messaging::delete(&mut client, credentials, ids.clone()).await,
        Command::DeleteAccount { ref credentials } => {
            messaging::delete_account(&mut client, credentials).await
        }
        Command::Server { .. } | Command::Config { .. } => Ok(()),
    }
}
