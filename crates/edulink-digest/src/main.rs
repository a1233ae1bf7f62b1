//! edulink-digest - reports new EduLink behaviour and achievement records.
//!
//! Meant to be run on a schedule. Each run logs in, pulls every child's
//! records, keeps only the ones no earlier run has reported, and mails (or
//! writes) one HTML report per child.

use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use edulink_core::api::LookupsCall;
use edulink_core::auth::CredentialStore;
use edulink_core::config::{Config, Settings};
use edulink_core::notify::{Delivery, FileNotifier, MailgunNotifier, Notifier, NotifyPolicy};
use edulink_core::report::{
    Account, HtmlRenderer, PassOptions, PassOutcome, Renderer, ReportAggregator,
};
use edulink_core::web::{self, WebState};
use edulink_core::{Cache, EventKind, FileCache, RpcClient, SeenIds};

/// Log file name prefix inside the log directory
const LOG_FILE_PREFIX: &str = "edulink-digest";

#[derive(Parser)]
#[command(name = "edulink-digest", version)]
#[command(about = "Mail a digest of new EduLink behaviour and achievement records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one reporting pass (the default)
    Run,
    /// Serve the report preview and raw API views over HTTP
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: SocketAddr,
    },
    /// Print a raw API response as JSON, served from the cache when fresh
    Raw {
        #[command(subcommand)]
        call: RawCall,
    },
    /// Save the EduLink password for EDULINK_USERNAME in the OS keychain
    StorePassword,
    /// Remove the saved password from the OS keychain
    ForgetPassword,
    /// List the event IDs already reported
    ShowSeen,
}

#[derive(Subcommand)]
enum RawCall {
    /// EduLink.SchoolDetails
    SchoolDetails,
    /// EduLink.AchievementBehaviourLookups (logs in only on a cache miss)
    Lookups,
}

/// Initialize the tracing subscriber: stderr always, plus a daily log file
/// when a log directory is configured. Use RUST_LOG to change the level.
fn init_tracing(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = fmt::layer().with_writer(io::stderr);

    let Some(dir) = log_dir else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr)
            .init();
        return Ok(None);
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(dir)
        .context("Failed to open log file")?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load()?;
    let _log_guard = init_tracing(config.log_dir.as_deref())?;

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config).await,
        Commands::Serve { listen } => serve(config, listen).await.map(|_| ExitCode::SUCCESS),
        Commands::Raw { call } => raw(&config, call).await.map(|_| ExitCode::SUCCESS),
        Commands::StorePassword => store_password(&config).map(|_| ExitCode::SUCCESS),
        Commands::ForgetPassword => forget_password(&config).map(|_| ExitCode::SUCCESS),
        Commands::ShowSeen => show_seen(&config).map(|_| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => Ok(code),
        Err(e) => {
            error!("{:#}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn open_cache(dir: &Path) -> Result<Cache> {
    let cache = Cache::new(FileCache::new(dir.to_path_buf()));
    cache
        .initialise()
        .with_context(|| format!("Failed to open cache at {}", dir.display()))?;
    Ok(cache)
}

/// One pass, then delivery. Exits non-zero if any child failed.
async fn run(config: Config) -> Result<ExitCode> {
    let settings = config.validate()?;
    let cache = open_cache(&settings.cache_dir)?;
    let client = RpcClient::http(&settings.endpoint, cache)?;

    let options = PassOptions {
        failure_policy: settings.failure_policy,
        max_event_age: settings.max_event_age,
        ..Default::default()
    };
    info!(
        endpoint = %settings.endpoint,
        policy = %options.failure_policy,
        "Starting pass"
    );
    let aggregator = ReportAggregator::new(client, Account::from_settings(&settings), options);
    let outcome = aggregator.run_pass().await?;

    deliver(&settings, &outcome).await?;

    for failure in &outcome.failures {
        error!(
            child = %failure.child.id,
            method = failure.error.method(),
            "No report for {}: {}",
            failure.child.forename,
            failure.error
        );
    }
    if outcome.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Render and send each report the notify policy lets through.
///
/// Every report with something new is also written to disk, so a failed send
/// still leaves a copy behind. A failed write or send never stops the
/// remaining reports; failures are counted and returned at the end.
async fn deliver(settings: &Settings, outcome: &PassOutcome) -> Result<()> {
    let policy = NotifyPolicy::from_settings(&settings.email);
    let renderer = HtmlRenderer::new();
    let files = FileNotifier::new(settings.output_dir.clone());
    let mailer = MailgunNotifier::from_settings(&settings.email)?;
    let mut unwritten = 0;
    let mut unsent = 0;

    for report in &outcome.reports {
        let child = &report.child.forename;
        let delivery = policy.decide(report);

        if delivery == Delivery::SkipNothingNew {
            info!("There are no new achievements or behaviours for {} to report on", child);
            continue;
        }

        let document = renderer.render(report, &outcome.lookups);
        if let Err(e) = files.notify(&document, &[]).await {
            error!(error = %e, "Failed to write the report for {}", child);
            unwritten += 1;
        }

        match delivery {
            Delivery::SkipDisabled => {
                info!("SEND_EMAIL is not true, report for {} written to disk only", child);
                continue;
            }
            Delivery::SkipNoRecipients => {
                warn!("No recipients configured, report for {} written to disk only", child);
                continue;
            }
            Delivery::SkipNothingNew | Delivery::Deliver => {}
        }

        let mailer = mailer
            .as_ref()
            .ok_or_else(|| anyhow!("MAILGUN_API_KEY is not set"))?;
        if let Err(e) = mailer.notify(&document, &policy.recipients).await {
            error!(error = %e, "Failed to email the report for {}", child);
            unsent += 1;
        }
    }

    if unwritten > 0 || unsent > 0 {
        bail!(
            "{} report(s) could not be written to {} and {} could not be emailed",
            unwritten,
            settings.output_dir.display(),
            unsent
        );
    }
    Ok(())
}

/// Serve the preview until the process is stopped.
async fn serve(config: Config, listen: SocketAddr) -> Result<()> {
    let settings = config.validate()?;
    let cache = open_cache(&settings.cache_dir)?;
    let client = RpcClient::http(&settings.endpoint, cache)?;
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to listen on {}", listen))?;
    web::serve(listener, WebState::new(client, Account::from_settings(&settings))).await
}

/// Print a raw API response, sharing the client and cache with passes.
async fn raw(config: &Config, call: RawCall) -> Result<()> {
    let cache = open_cache(&config.cache_dir_or_default()?)?;
    let client = RpcClient::http(config.endpoint_or_default(), cache)?;

    let value = match call {
        RawCall::SchoolDetails => serde_json::to_value(
            client
                .school_details(config.establishment_id_or_default())
                .await?,
        )?,
        RawCall::Lookups => {
            let lookups = if client.is_cached::<LookupsCall>() {
                client.lookups(None).await?
            } else {
                let settings = config.clone().validate()?;
                web::fetch_lookups(&client, &Account::from_settings(&settings)).await?
            };
            serde_json::to_value(lookups)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn configured_username(config: &Config) -> Result<&str> {
    config
        .username
        .as_deref()
        .ok_or_else(|| anyhow!("Set EDULINK_USERNAME (or \"username\" in config.json) first"))
}

fn store_password(config: &Config) -> Result<()> {
    let username = configured_username(config)?;
    let password = rpassword::prompt_password(format!("EduLink password for {}: ", username))
        .context("Failed to read password")?;
    if password.is_empty() {
        bail!("Password is empty, nothing stored");
    }
    CredentialStore::store(username, &password)?;
    println!("Password for {} saved to the OS keychain.", username);
    Ok(())
}

fn forget_password(config: &Config) -> Result<()> {
    let username = configured_username(config)?;
    CredentialStore::delete(username)?;
    println!("Removed any saved password for {}.", username);
    Ok(())
}

/// Read-only view of the dedup state. Never takes ownership of it, so it is
/// safe to run alongside a pass.
fn show_seen(config: &Config) -> Result<()> {
    let cache = open_cache(&config.cache_dir_or_default()?)?;
    for kind in [EventKind::Behaviour, EventKind::Achievement] {
        let seen = SeenIds::load(&cache, kind);
        println!("{} ({}): {}", kind, seen.len(), seen.as_slice().join(", "));
    }
    Ok(())
}
