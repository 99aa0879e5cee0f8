mod commands;
mod config;
mod store;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "calsync")]
#[command(about = "Sync your local events with Google Calendar and iCalendar feeds")]
struct Cli {
    /// More log output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the Google consent URL to open in a browser
    AuthUrl {
        /// Opaque value echoed back on the redirect
        #[arg(long)]
        state: Option<String>,
    },
    /// Finish connecting Google with the code from the redirect
    AuthComplete { code: String },
    /// Two-way sync with Google Calendar
    Sync,
    /// Write the current window of events as an iCalendar feed
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Upsert the events of an iCalendar file
    Import { file: PathBuf },
    /// Forget the stored connection for a provider ("google" or "ical")
    Disconnect { provider: String },
    /// Show connection state per provider
    Status,
    /// Create a new local event
    New {
        title: String,

        /// Start, e.g. "2025-03-20" (all-day) or "2025-03-20T15:00" (local time)
        #[arg(short, long)]
        start: String,

        #[arg(short, long, conflicts_with = "duration")]
        end: Option<String>,

        /// Duration (e.g. "30m", "1h", "2h 30m")
        #[arg(short, long, conflicts_with = "end")]
        duration: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Require whole days (implied when start is a plain date)
        #[arg(long)]
        all_day: bool,

        /// Hex color, #RRGGBB
        #[arg(long)]
        color: Option<String>,
    },
    /// List events in the sync window
    Events,
}

fn init_tracing(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let ctx = commands::Context::load()?;

    match cli.command {
        Commands::AuthUrl { state } => commands::auth::url(&ctx, state.as_deref()),
        Commands::AuthComplete { code } => commands::auth::complete(&ctx, &code).await,
        Commands::Sync => commands::sync::run(&ctx).await,
        Commands::Export { out } => commands::feed::export(&ctx, out.as_deref()),
        Commands::Import { file } => commands::feed::import(&ctx, &file),
        Commands::Disconnect { provider } => commands::auth::disconnect(&ctx, &provider),
        Commands::Status => commands::status::run(&ctx),
        Commands::New {
            title,
            start,
            end,
            duration,
            description,
            all_day,
            color,
        } => commands::new::run(
            &ctx,
            &title,
            &start,
            end,
            duration,
            description,
            all_day,
            color,
        ),
        Commands::Events => commands::events::run(&ctx),
    }
}
