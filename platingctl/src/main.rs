use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use platingctl::{DEFAULT_URL, PlatingClient};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "platingctl")]
#[command(about = "Score images against a running Plating server", version)]
struct Cli {
    /// Server base URL
    #[arg(long, env = "PLATING_URL", default_value = DEFAULT_URL)]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether the server has a model loaded
    Health,
    /// Show service name, version and endpoints
    Info,
    /// Score a single image file
    Score {
        path: PathBuf,
        /// Format hint sent with the image (defaults to the file extension)
        #[arg(long)]
        format: Option<String>,
    },
    /// Score several image files in one batch request
    Batch {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Format hint applied to every image (defaults to each file extension)
        #[arg(long)]
        format: Option<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let client = PlatingClient::new(&cli.url).context("failed to build HTTP client")?;

    match cli.command {
        Command::Health => print_json(
            &client
                .health()
                .await
                .with_context(|| format!("health check against {} failed", cli.url))?,
        ),
        Command::Info => print_json(&client.info().await?),
        Command::Score { path, format } => {
            let scored = client
                .score_path(&path, format.as_deref())
                .await
                .with_context(|| format!("failed to score {}", path.display()))?;
            print_json(&scored)
        }
        Command::Batch { paths, format } => {
            let batch = client
                .score_batch(&paths, format.as_deref())
                .await
                .context("batch scoring failed")?;
            print_json(&batch)
        }
    }
}
