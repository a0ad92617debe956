use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    volley_campaign::Campaign,
    volley_config::{Severity, VolleyConfig, expand_tilde, validate},
    volley_dispatch::DispatchEngine,
    volley_ledger::{ErrorLog, SentLedger},
    volley_session::{BridgeClient, CredentialStore, ReconnectPolicy, SessionManager},
};

#[derive(Parser)]
#[command(name = "volley", about = "Volley, a paced bulk-message dispatcher")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file path (overrides discovery).
    #[arg(long, global = true, env = "VOLLEY_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the campaign (default when no subcommand is provided).
    Run,
    /// Open a fresh session to (re)link the account and print the
    /// pairing code, then exit.
    Pair,
    /// Validate config and campaign inputs without sending anything.
    Check,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<VolleyConfig> {
    match &cli.config {
        Some(path) => volley_config::load_config(path),
        None => Ok(volley_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "volley starting");

    let config = load_config(&cli)?;

    match cli.command {
        None | Some(Commands::Run) => run_campaign(&config).await,
        Some(Commands::Pair) => pair(&config).await,
        Some(Commands::Check) => check(&config),
    }
}

/// Validate inputs, open the session, and dispatch the whole campaign.
async fn run_campaign(config: &VolleyConfig) -> anyhow::Result<()> {
    ensure_valid(config)?;

    let campaign = Campaign::load(&config.campaign)?;
    let sent = SentLedger::load(&expand_tilde(&config.ledger.sent_file))?;
    let errors = ErrorLog::new(&expand_tilde(&config.ledger.errors_file));
    info!(
        recipients = campaign.recipients.len(),
        messages = campaign.messages.len(),
        media = campaign.media.len(),
        already_sent = sent.len(),
        "campaign loaded"
    );

    let session = start_session(config, false);
    info!("waiting for the session to open");
    session.await_open().await?;
    info!("session established, dispatching");

    let engine = DispatchEngine::new(config, campaign, sent, errors);
    let summary = engine.run(&session).await?;
    session.shutdown().await;

    println!(
        "done: {} delivered, {} already sent, {} without media, {} abandoned",
        summary.delivered, summary.skipped_sent, summary.skipped_media, summary.abandoned
    );
    Ok(())
}

/// Force a fresh open so a pairing code is issued even with stored
/// credentials, then wait for the link to complete.
async fn pair(config: &VolleyConfig) -> anyhow::Result<()> {
    let session = start_session(config, true);
    info!("waiting for pairing to complete");
    session.await_open().await?;
    session.shutdown().await;

    println!("account linked");
    Ok(())
}

/// Print validation diagnostics; non-zero exit when any is an error.
fn check(config: &VolleyConfig) -> anyhow::Result<()> {
    let result = validate(config);
    for d in &result.diagnostics {
        println!("{}: [{}] {}: {}", d.severity, d.category, d.path, d.message);
    }
    if result.has_errors() {
        anyhow::bail!(
            "configuration has {} error(s)",
            result.count(Severity::Error)
        );
    }
    println!("configuration OK");
    Ok(())
}

fn ensure_valid(config: &VolleyConfig) -> anyhow::Result<()> {
    let result = validate(config);
    for d in &result.diagnostics {
        eprintln!("{}: [{}] {}: {}", d.severity, d.category, d.path, d.message);
    }
    if result.has_errors() {
        anyhow::bail!("refusing to start with invalid configuration");
    }
    Ok(())
}

fn start_session(config: &VolleyConfig, force_fresh: bool) -> SessionManager {
    let client = Arc::new(BridgeClient::new(config.session.bridge_url.clone()));
    let creds = CredentialStore::new(&expand_tilde(&config.session.auth_dir));
    let policy = ReconnectPolicy {
        reconnect_backoff: Duration::from_secs(config.session.reconnect_backoff_secs),
        logout_reopen_delay: Duration::from_secs(config.session.logout_reopen_delay_secs),
    };
    SessionManager::start(client, creds, policy, force_fresh)
}
