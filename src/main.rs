use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use blinkup_bridge::channel::line::LineChannel;
use blinkup_bridge::config::BridgeConfig;
use blinkup_bridge::flow::run_provisioning;
use blinkup_bridge::sdk::scripted::ScriptedSdk;
use blinkup_bridge::store::{FilePlanIdStore, PlanIdStore};

#[derive(Parser)]
#[command(name = "blinkup-bridge", about = "Relay BlinkUp provisioning results as JSON envelopes")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one provisioning attempt, printing each envelope to stdout
    Provision {
        /// JSON script describing how the SDK answers
        #[arg(short, long)]
        script: PathBuf,
    },
    /// Print the cached plan id
    PlanId,
    /// Remove cached provisioning data
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries envelopes
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(cli.json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with(
            (!cli.json_logs)
                .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
        .init();

    let config = BridgeConfig::load(cli.config.as_deref())?;
    let store = FilePlanIdStore::from_config(&config.store);

    match cli.command {
        Command::Provision { script } => {
            let sdk = ScriptedSdk::from_file(&script).await?;
            let channel = LineChannel::stdout();

            tracing::info!(
                timeout_ms = config.provisioning.timeout_ms,
                script = %script.display(),
                "Starting provisioning attempt"
            );

            let terminal = run_provisioning(&sdk, &channel, &store, &config.provisioning).await?;
            tracing::info!(state = %terminal.state(), "Provisioning attempt done");
        }
        Command::PlanId => match store.load_plan_id().await? {
            Some(plan_id) => println!("{plan_id}"),
            None => tracing::info!(path = %store.path().display(), "No cached plan id"),
        },
        Command::Clear => {
            store.clear().await?;
        }
    }

    Ok(())
}
