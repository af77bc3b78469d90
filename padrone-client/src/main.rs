//! Padrone - master server command line client.
//!
//! Runs one master server operation and prints the status and payload.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use hyper::StatusCode;
use padrone_client::{
    ApiResponse, HealthMonitorConfig, HealthStatus, MasterServerMonitor, PadroneClient,
};
use padrone_core::protocol::HostRegistrationRequest;
use padrone_core::{ClientSessionId, PeerInfo};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _ = FmtSubscriber::builder()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    info!("Starting padrone v{}", env!("CARGO_PKG_VERSION"));
    info!("Master server: {}", cli.url);

    let token = cli.auth_token()?;
    let client = PadroneClient::new(cli.client_config(), move || token.clone())?;

    match cli.command {
        Command::RegisterHost {
            name,
            external,
            internal,
            password,
            private,
            max_players,
        } => {
            let registration = HostRegistrationRequest {
                host_name: name,
                peer_info: PeerInfo { external, internal },
                password,
                is_private: private,
                version: cli.app_version.clone(),
                max_players,
            };
            print_status(client.register_host(&registration).await?);
        }
        Command::UnregisterHost { external } => {
            print_status(client.unregister_host(external).await?);
        }
        Command::ListHosts { hide_full, limit } => {
            print_response(client.list_hosts(hide_full, limit).await?)?;
        }
        Command::PlayerInfo { host, session_id } => {
            let session_id = ClientSessionId::new(session_id);
            print_response(client.player_info(host, &session_id).await?)?;
        }
        Command::Ping { host, sessions } => {
            let sessions: Vec<ClientSessionId> =
                sessions.into_iter().map(ClientSessionId::new).collect();
            print_status(client.ping(host, &sessions).await?);
        }
        Command::HealthCheck => print_status(client.health_check().await?),
        Command::Me => print_response(client.me().await?)?,
        Command::Join { host, password } => {
            print_response(client.join(host, password.as_deref()).await?)?;
        }
        Command::Leave => print_status(client.leave().await?),
        Command::ReportLeave { host, session_id } => {
            let session_id = ClientSessionId::new(session_id);
            print_status(client.report_leave(host, &session_id).await?);
        }
        Command::Monitor {
            interval,
            failure_threshold,
        } => {
            let monitor = MasterServerMonitor::new(
                HealthMonitorConfig::default()
                    .with_interval(Duration::from_secs(interval))
                    .with_failure_threshold(failure_threshold),
            );
            let (tx, mut rx) = watch::channel(HealthStatus::Unknown);
            let report = async move {
                while rx.changed().await.is_ok() {
                    let status = *rx.borrow_and_update();
                    info!("Master server {}", status);
                }
            };
            tokio::join!(monitor.watch(&client, tx), report);
        }
    }

    Ok(())
}

fn print_status(status: StatusCode) {
    println!("{}", status);
}

fn print_response<T: Serialize>(response: ApiResponse<T>) -> Result<()> {
    print_status(response.status);
    if let Some(body) = response.body {
        println!("{}", serde_json::to_string_pretty(&body)?);
    }
    Ok(())
}
