//! Command-line and environment configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use expensease_notify::{Notifier, TwilioClient, TwilioConfig, twilio::DEFAULT_BASE_URL};
use expensease_scheduler::DailySchedule;
use expensease_store::{DuckStore, LedgerStore, MemoryStore};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "expensease", version, about = "Materialize due recurring expenses")]
pub struct Cli {
    /// DuckDB ledger file. Without it an empty in-memory ledger is used.
    #[arg(long, env = "EXPENSEASE_DB", global = true)]
    pub db: Option<PathBuf>,

    #[command(flatten)]
    pub twilio: TwilioArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct TwilioArgs {
    #[arg(long = "twilio-sid", env = "TWILIO_SID", global = true)]
    pub sid: Option<String>,

    #[arg(long = "twilio-token", env = "TWILIO_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Sender address, e.g. `whatsapp:+14155238886`.
    #[arg(long = "twilio-whatsapp-from", env = "TWILIO_WHATSAPP_FROM", global = true)]
    pub whatsapp_from: Option<String>,

    #[arg(long = "twilio-base-url", env = "TWILIO_BASE_URL", global = true, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the job once and exit.
    RunOnce {
        /// Evaluate due dates as of this RFC 3339 instant instead of now.
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
    /// Run the job every day at a fixed UTC time until interrupted.
    Serve {
        #[arg(long, default_value = "01:00")]
        at: DailySchedule,
    },
    /// Load template documents from a JSON file into the ledger.
    Seed { file: PathBuf },
    /// Print a group's expenses as JSON.
    ListExpenses { group: String },
}

impl Cli {
    pub fn open_store(&self) -> anyhow::Result<Arc<dyn LedgerStore>> {
        match &self.db {
            Some(path) => {
                let store = DuckStore::open_persistent(path)
                    .with_context(|| format!("opening ledger at {}", path.display()))?;
                Ok(Arc::new(store))
            }
            None => {
                info!("no ledger database configured, using in-memory store");
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }
}

impl TwilioArgs {
    /// The configured messaging provider, if every Twilio setting is present.
    pub fn notifier(&self) -> Option<Arc<dyn Notifier>> {
        let config = TwilioConfig::from_parts(
            self.sid.clone(),
            self.token.clone(),
            self.whatsapp_from.clone(),
        );
        match config {
            Some(config) => {
                info!(account_sid = %config.account_sid, "Twilio client initialized");
                Some(Arc::new(TwilioClient::with_base_url(config, self.base_url.clone())))
            }
            None => {
                if self.sid.is_some() || self.token.is_some() || self.whatsapp_from.is_some() {
                    warn!("Twilio config (sid, token, whatsapp_from) not fully set");
                }
                None
            }
        }
    }
}
