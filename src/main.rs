//! iotdash - cached dashboard summaries from an IoT console backend
//!
//! Reads profile, organization, template, device and MQTT summaries through a
//! TTL cache and prints them once or on an interval.

use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use iotdash::api::ApiClient;
use iotdash::cache::{Action, CacheKey, CacheService};
use iotdash::cli::{Cli, Command};
use iotdash::config::Config;
use iotdash::dashboard::{DashboardData, DashboardService};
use iotdash::refresh::{RefreshConfig, RefreshHandle, RefreshMessage};

/// Log filter used when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "iotdash=info";

/// Installs a stderr log subscriber so stdout stays clean for `--json`
fn setup_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the dashboard service described by `config`
fn build_service(config: &Config) -> Result<DashboardService, Box<dyn Error>> {
    let mut api = ApiClient::with_timeout(config.base_url.clone(), config.request_timeout())?;
    if let Some(token) = &config.token {
        api = api.with_token(token.clone());
    }
    let cache = CacheService::new(config.ttl_policy()?);
    Ok(DashboardService::new(api, cache))
}

/// Prints the tile counters as aligned text
fn render_summary(data: &DashboardData) {
    let summary = data.summary();
    if let Some(profile) = &data.profile {
        println!("User:          {}", profile.username);
    }
    println!("Subscription:  {}", summary.subscription_type);
    println!("Organizations: {}", summary.organizations);
    println!("Devices:       {}", summary.devices);
    println!("Templates:     {}", summary.templates);
    println!("MQTT clusters: {}", summary.clusters);
    println!("Messages:      {}", summary.messages);
    println!(
        "Broker:        {}:{} ({})",
        data.mqtt_info.broker.host,
        data.mqtt_info.broker.port,
        if data.mqtt_info.connected { "connected" } else { "disconnected" }
    );
}

fn render_policy(cache: &CacheService) {
    for (key, ttl) in cache.policy().entries() {
        println!("{:<20} {}s", key.as_str(), ttl.as_secs());
    }
    println!("{:<20} untracked", CacheKey::OverviewStats.as_str());
}

fn render_states(cache: &CacheService) {
    for key in CacheKey::TRACKED {
        println!("{:<20} {}", key.as_str(), cache.state(key).as_str());
    }
}

async fn run_summary(service: &DashboardService, json: bool) -> Result<(), Box<dyn Error>> {
    let data = service.dashboard_data().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&data.summary())?);
    } else {
        render_summary(&data);
    }
    Ok(())
}

async fn run_watch(service: DashboardService, config: &Config) -> Result<(), Box<dyn Error>> {
    let mut handle = RefreshHandle::spawn(
        service,
        RefreshConfig {
            interval: config.watch_interval(),
        },
    );

    loop {
        tokio::select! {
            message = handle.receiver.recv() => match message {
                Some(RefreshMessage::DashboardUpdated { data, read_at }) => {
                    println!("--- {} ---", read_at.format("%Y-%m-%d %H:%M:%S"));
                    render_summary(&data);
                }
                Some(RefreshMessage::RefreshStarted) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                handle.shutdown().await;
                break;
            }
        }
    }
    Ok(())
}

async fn run_actions(service: &DashboardService, names: &[String]) {
    service.dashboard_data().await;
    for name in names {
        match service.cache().refresh_after_action(name) {
            Some(action) => println!("applied {}", action),
            None => {
                let known: Vec<&str> = Action::ALL.iter().map(|a| a.as_str()).collect();
                eprintln!("warning: unknown action '{}' (known: {})", name, known.join(", "));
            }
        }
    }
    render_states(service.cache());
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = cli.apply_to(Config::load(cli.config.as_deref())?)?;
    let service = build_service(&config)?;

    match cli.resolved_command() {
        Command::Summary { json } => run_summary(&service, json).await?,
        Command::Watch { .. } => run_watch(service, &config).await?,
        Command::Policy => render_policy(service.cache()),
        Command::Action { names } => run_actions(&service, &names).await,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
