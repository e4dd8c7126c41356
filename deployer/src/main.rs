//! Deployer CLI - Entry Point
//!
//! Thin driver around the orchestrator: list deployable targets, show
//! resolved field mappings, and run a deployment to completion from the
//! command line.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use metadeploy::cache::status::StatusCache;
use metadeploy::config::Settings;
use metadeploy::deploy::job::JobPhase;
use metadeploy::deploy::orchestrator::{Orchestrator, OrchestratorOptions};
use metadeploy::deploy::poller::PollOptions;
use metadeploy::errors::DeployError;
use metadeploy::http::client::HttpClient;
use metadeploy::logs::{init_logging, LogOptions};
use metadeploy::notify::LogNotifier;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    if cli_args.contains_key("version") {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let settings = match cli_args.get("settings") {
        Some(path) => match Settings::load(path).await {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Unable to read settings file: {}", e);
                return;
            }
        },
        None => Settings::default(),
    };

    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        ..Default::default()
    };
    if let Err(e) = init_logging(log_options) {
        println!("Failed to initialize logging: {e}");
    }

    if let Err(e) = run(&cli_args, settings).await {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli_args: &HashMap<String, String>, settings: Settings) -> Result<(), DeployError> {
    let base_url = cli_args
        .get("base-url")
        .cloned()
        .unwrap_or_else(|| settings.backend.base_url.clone());

    let client = match &settings.backend.session_token {
        Some(token) => HttpClient::with_session_token(&base_url, token.clone())?,
        None => HttpClient::new(&base_url)?,
    };

    let options = OrchestratorOptions {
        submit_mode: settings.submit_mode()?,
        poll: PollOptions {
            max_attempts: settings.poll_max_attempts,
            ..PollOptions::default()
        },
        ..OrchestratorOptions::default()
    };

    let orchestrator = Orchestrator::new(
        Arc::new(client),
        Arc::new(LogNotifier),
        Arc::new(StatusCache::new()),
        options,
    );

    if cli_args.contains_key("list") {
        let cards = orchestrator.load_cards().await?;
        for card in cards {
            println!(
                "{}\t{}\t{} fields, {} mappings{}",
                card.target_key,
                card.label,
                card.field_count,
                card.total_mappings,
                if card.has_deployed_artifact {
                    " [deployed]"
                } else {
                    ""
                }
            );
        }
        return Ok(());
    }

    if cli_args.contains_key("targets") {
        let targets = orchestrator.load_targets().await?;
        for target in targets {
            println!("{}\t{}", target.key, target.label);
        }
        return Ok(());
    }

    if let Some(target_key) = cli_args.get("mappings") {
        let resolved = orchestrator.load_mappings(target_key).await?;
        for mapping in resolved.mappings {
            println!(
                "{} = {}\t{:?}\t{}",
                mapping.picklist_field, mapping.picklist_value, mapping.direction, mapping.date_field
            );
        }
        return Ok(());
    }

    if let Some(target_key) = cli_args.get("source") {
        orchestrator.select_target(target_key)?;
        orchestrator.view_source().await?;
        if let Some(source) = orchestrator.job().source {
            println!("{}", source);
        }
        return Ok(());
    }

    if let Some(target_key) = cli_args.get("deploy") {
        info!(target = %target_key, "Starting deployment");
        orchestrator.submit(target_key)?;
        let job = orchestrator.wait_terminal().await?;
        info!(phase = ?job.phase, attempts = job.attempts, "Deployment finished: {}", job.message);
        return match job.phase {
            JobPhase::Succeeded => Ok(()),
            JobPhase::TimedOut => Err(DeployError::TimedOut(job.message)),
            _ => Err(DeployError::DeploymentFailed(job.message)),
        };
    }

    eprintln!("Usage: metadeploy [--settings=FILE] [--base-url=URL] --list | --targets | --mappings=KEY | --source=KEY | --deploy=KEY | --version");
    Ok(())
}
