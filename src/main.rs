//! kaniko-deploy - build container images inside a Kubernetes cluster.
//!
//! This is the main entry point that:
//! - Parses the command line
//! - Initializes structured logging
//! - Creates the Kubernetes client
//! - Runs one build and its teardown

use std::process::ExitCode;

use clap::Parser;
use kube::Client;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use kaniko_deploy::cli::{Cli, Command, LogFormat};
use kaniko_deploy::run_deploy;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_format) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match cli.command {
        Command::Deploy(args) => {
            let request = args.to_request();
            let config = args.to_config();

            let client = match Client::try_default().await {
                Ok(client) => client,
                Err(e) => {
                    error!(error = %e, "Failed to create Kubernetes client");
                    return ExitCode::FAILURE;
                }
            };
            info!("Connected to Kubernetes cluster");

            match run_deploy(client, config, &request).await {
                Ok(report) => {
                    info!(
                        pod = %report.identities.pod,
                        final_status = %report.final_status,
                        "Done"
                    );
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!(error = %e, "Build run aborted");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn init_tracing(format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::from_default_env()
        .add_directive("kaniko_deploy=info".parse()?)
        .add_directive("kube=warn".parse()?);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
    Ok(())
}
