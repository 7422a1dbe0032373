mod config;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use expensease_core::TemplateDocument;
use expensease_scheduler::Materializer;
use futures::FutureExt;
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    tracing::info!("expensease v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let store = cli.open_store()?;

    match cli.command {
        Command::RunOnce { now } => {
            let job = Materializer::new(store, cli.twilio.notifier());
            let report = job.run(now.unwrap_or_else(Utc::now)).await?;
            eprintln!(
                "  {} due, {} created, {} skipped, {} failed, {} reminders ({} failed)",
                report.due,
                report.expenses_created(),
                report.skipped(),
                report.failed(),
                report.reminders.len(),
                report.reminders_failed(),
            );
        }
        Command::Serve { at } => {
            let job = Materializer::new(store, cli.twilio.notifier());
            let shutdown = tokio::signal::ctrl_c().map(|_| ());
            job.serve(at, shutdown).await;
        }
        Command::Seed { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let templates: Vec<TemplateDocument> =
                serde_json::from_str(&raw).context("parsing template documents")?;
            let count = templates.len();
            for template in templates {
                store.put_template(template).await?;
            }
            eprintln!("  Seeded {count} templates");
        }
        Command::ListExpenses { group } => {
            let expenses = store.expenses(&group).await?;
            let out: serde_json::Map<String, serde_json::Value> = expenses
                .into_iter()
                .map(|(id, expense)| Ok((id, serde_json::to_value(expense)?)))
                .collect::<Result<_, serde_json::Error>>()?;
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}
