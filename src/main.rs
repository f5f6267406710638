use anyhow::{anyhow, Context, Result};
use attribution_analysis::encoding::encode_parameters;
use attribution_analysis::logging;
use attribution_analysis::request::{AttributionRequest, AttributionRequestBody};
use attribution_analysis::simulate::{self, ClickstreamEvent};
use attribution_analysis::sql::{build_attribution_sql, render_attribution_sql};
use attribution_analysis::timezone::AppTimezone;
use attribution_analysis::validation;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "attribution")]
#[command(about = "Attribution analysis SQL generator and dry-run simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the attribution SQL for a request
    Sql {
        /// JSON file with the attribution request body
        #[arg(long)]
        request: PathBuf,

        /// App timezone, e.g. "+08:00" or "Asia/Shanghai"
        #[arg(long, default_value = "UTC")]
        timezone: String,

        /// Keep the dashboard parameter placeholders instead of the request's dates
        #[arg(long)]
        template: bool,
    },
    /// Attribute a JSON array of events in memory and print the summary
    Simulate {
        #[arg(long)]
        request: PathBuf,

        /// JSON file with an array of clickstream events
        #[arg(long)]
        events: PathBuf,

        #[arg(long, default_value = "UTC")]
        timezone: String,

        /// Reference time for relative scopes (RFC 3339); defaults to now
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
}

fn load_request(path: &Path) -> Result<AttributionRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading request file {}", path.display()))?;
    let body: AttributionRequestBody = serde_json::from_str(&content)
        .with_context(|| format!("parsing request file {}", path.display()))?;
    validation::parse(&body).map_err(|failure| anyhow!("Invalid request: {}", failure.message))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Sql { request, timezone, template } => {
            let request = load_request(&request)?;
            let timezone = AppTimezone::parse(&timezone)?;
            let params = encode_parameters(&request, timezone)?;
            let sql = if template {
                build_attribution_sql(&params)?
            } else {
                render_attribution_sql(&params)?
            };
            println!("{}", sql);
        }
        Command::Simulate { request, events, timezone, now } => {
            let request = load_request(&request)?;
            let timezone = AppTimezone::parse(&timezone)?;
            let content = std::fs::read_to_string(&events)
                .with_context(|| format!("reading events file {}", events.display()))?;
            let events: Vec<ClickstreamEvent> = serde_json::from_str(&content)?;
            info!("🧮 Simulating {} model over {} events", request.model_type, events.len());

            let summary = simulate::attribute(&events, &request, timezone, now.unwrap_or_else(Utc::now));
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
