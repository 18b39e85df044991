use clap::Parser;

use roundwatch_common::config::AppConfig;

mod bootstrap;
mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "roundwatch_scanner=info,roundwatch_engine=info,roundwatch_notifier=info".into()
            }),
        )
        .json()
        .init();

    let cli = Cli::parse();

    tracing::info!("Roundwatch scanner starting...");

    let config = AppConfig::from_env()?;
    let now = cli.now.unwrap_or_else(|| config.scan_now());
    let mode = cli.mode.into();

    let scanner = bootstrap::build_scanner(&config).await?;

    match bootstrap::run(&config, &scanner, now, mode).await {
        Ok(Some(report)) => {
            tracing::info!(
                funds_scanned = report.funds_scanned,
                funds_skipped = report.funds_skipped,
                rounds_scanned = report.rounds_scanned,
                reminder_rounds_dispatched = report.reminder_rounds_dispatched,
                reminder_rounds_failed = report.reminder_rounds_failed,
                events_processed = report.events_processed,
                events_failed = report.events_failed,
                events_unrecognized = report.events_unrecognized,
                messages_sent = report.messages_sent,
                messages_failed = report.messages_failed,
                state_update_failures = report.state_update_failures,
                "Scan report"
            );
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(error = %e, "Scan aborted");
            return Err(e);
        }
    }

    tracing::info!("Roundwatch scanner stopped.");
    Ok(())
}
