use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use census_stats::census::{self, TabularSource};
use census_stats::config::ServerConfig;
use census_stats::engine::{ReportOptions, full_report, report::DEFAULT_COUNTRY_OF_INTEREST};
use census_stats::server;

#[derive(Parser)]
#[command(name = "census-stats", version, about = "Census dataset statistics")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the summary report for one dataset
    Report(ReportArgs),
    /// Run the dashboard HTTP server
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// CSV file to summarize
    #[arg(long, default_value = "data/adult.data.csv")]
    data: PathBuf,
    /// Country whose top high-income occupation is reported
    #[arg(long, default_value = DEFAULT_COUNTRY_OF_INTEREST)]
    country: String,
    /// Print pretty JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// TOML config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Default dataset
    #[arg(long)]
    data: Option<PathBuf>,
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

fn report(args: ReportArgs) -> anyhow::Result<()> {
    let dataset = census::load(TabularSource::Path(args.data.clone()))
        .with_context(|| format!("loading {}", args.data.display()))?;
    let options = ReportOptions {
        country_of_interest: args.country,
    };
    let report = full_report(&dataset, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(data) = args.data {
        config.dataset_path = data;
    }
    if let Some(dir) = args.static_dir {
        config.static_dir = dir;
    }

    server::serve(config).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Report(args) => report(args),
        Command::Serve(args) => serve(args).await,
    }
}
