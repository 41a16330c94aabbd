use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use docket_client::{PracticeClient, StaticTokenProvider};
use docket_core::{
    DbConfig, EntityStore, FallbackTokenProvider, HttpConfig, MatterStats, SyncConfig,
    SyncOrchestrator, SyncProgressView, SyncRegistry, SyncReport, SyncStart, SyncState, SyncType,
    TracingSyncReporter, classify,
};
use docket_db::{CredentialRepository, EntityRepository, SyncProgressRepository};

mod config;

use config::{Command, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    let config = Config::parse();

    match config.command {
        Command::Classify { label } => {
            print_classification(&label);
        }
        Command::Sync {
            actor,
            sync_type,
            api_url,
            api_token,
            detail_limit,
        } => {
            let pool = connect(config.database_url.as_deref()).await?;

            let mut sync_config = SyncConfig::from_env()?;
            if let Some(limit) = detail_limit {
                sync_config = sync_config.with_detail_limit(limit);
            }

            let client = PracticeClient::new(&api_url, HttpConfig::from_env()?)
                .context("Failed to initialize case-management client")?;
            let tokens = FallbackTokenProvider::new(
                StaticTokenProvider::new(api_token),
                CredentialRepository::new(pool.clone()),
            );
            let orchestrator = SyncOrchestrator::new(
                EntityRepository::new(pool.clone()),
                SyncProgressRepository::new(pool),
                client,
                tokens,
                sync_config,
            );

            let report = match orchestrator
                .start_sync(actor, sync_type.into(), TracingSyncReporter)
                .await?
            {
                SyncStart::Started(ticket) => ticket.wait().await?,
                SyncStart::NotConnected => {
                    anyhow::bail!(docket_core::AppError::NotConnected.user_message())
                }
            };

            print_sync_summary(&report);
            if report.state != SyncState::Completed {
                std::process::exit(1);
            }
        }
        Command::Status { actor, sync_type } => {
            let pool = connect(config.database_url.as_deref()).await?;
            show_status(pool, actor, sync_type.into()).await?;
        }
        Command::Stats => {
            let pool = connect(config.database_url.as_deref()).await?;
            show_stats(pool).await?;
        }
    }

    Ok(())
}

async fn connect(database_url: Option<&str>) -> anyhow::Result<PgPool> {
    let database_url = database_url.context("DATABASE_URL is required for this command")?;
    let db_config = DbConfig::from_env()?;

    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(db_config.max_connections)
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    docket_db::schema::apply(&pool)
        .await
        .context("Failed to apply database schema")?;

    Ok(pool)
}

fn print_sync_summary(report: &SyncReport) {
    let totals = report.totals();

    info!("");
    info!("═══════════════════════════════════════════════════════");
    info!("Sync {} for actor {}: {}", report.sync_type, report.actor_id, report.state);
    info!("═══════════════════════════════════════════════════════");
    for phase in &report.phases {
        if phase.success {
            info!("  ✓ {:<10} {}", phase.phase.as_str(), phase.message);
        } else {
            warn!("  ✗ {:<10} {}", phase.phase.as_str(), phase.message);
        }
    }
    info!("───────────────────────────────────────────────────────");
    info!("  + Created:           {}", totals.created);
    info!("  ↑ Updated:           {}", totals.updated);
    info!("  = Skipped (edited):  {}", totals.skipped);
    info!("  ✗ Failed:            {}", totals.failed);
    if let Some(reason) = &report.failure_reason {
        error!("  Reason: {}", reason);
    }
    info!("═══════════════════════════════════════════════════════");
}

async fn show_status(pool: PgPool, actor_id: i64, sync_type: SyncType) -> anyhow::Result<()> {
    let registry = SyncProgressRepository::new(pool.clone());
    let store = EntityRepository::new(pool);

    let record = registry.get(actor_id, sync_type).await?;
    let counts = match &record {
        Some(r) if r.status == SyncState::Syncing => store.entity_counts().await?,
        _ => Default::default(),
    };
    let view = SyncProgressView::project(actor_id, sync_type, record, &counts);

    println!("\nSync status for actor {} ({})\n", view.actor_id, view.sync_type);
    println!("  Status:                {}", view.status);
    if let Some(phase) = view.phase {
        match view.progress {
            Some(p) => println!(
                "  Phase:                 {} ({}/{}, {}%)",
                phase, p.processed, p.total, p.percentage
            ),
            None => println!("  Phase:                 {}", phase),
        }
    }
    println!("  Processed:             {}", view.total_processed);
    println!("  Failed:                {}", view.total_failed);
    if let Some(reason) = &view.failure_reason {
        println!("  Failure reason:        {}", reason);
    }
    if let Some(updated_at) = view.updated_at {
        println!("  Last update:           {}", updated_at);
    }
    println!();
    Ok(())
}

async fn show_stats(pool: PgPool) -> anyhow::Result<()> {
    let store = EntityRepository::new(pool);
    let stale_days = SyncConfig::from_env()?.stale_days;
    let rows = store.matter_status_rows().await?;
    let stats = MatterStats::from_rows(&rows, stale_days);

    println!("\nMatter Statistics\n");
    println!("  Total matters:         {}", stats.total);
    println!("  Active:                {}", stats.active);
    println!("  Completed:             {}", stats.completed);
    println!("  Awaiting RFE:          {}", stats.rfe);
    println!("  Overdue:               {}", stats.overdue);
    println!("  Stale (>{} days):      {}", stale_days, stats.stale);
    println!("  Unclassified:          {}", stats.unknown);
    println!();
    Ok(())
}

fn print_classification(label: &str) {
    let c = classify(Some(label));

    println!("\n\"{}\" → {}\n", label, c.category.as_str());
    let flags = [
        ("filed", c.is_filed),
        ("approved", c.is_approved),
        ("denied", c.is_denied),
        ("rfe", c.is_rfe),
        ("rfe_filed", c.is_rfe_filed),
        ("pending", c.is_pending),
        ("drafting", c.is_drafting),
        ("closed", c.is_closed),
        ("active", c.is_active),
        ("completed", c.is_completed),
    ];
    for (name, set) in flags {
        if set {
            println!("  ✓ {}", name);
        }
    }
    println!();
}
