mod commands;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "koltrack-cli")]
#[command(about = "KOL tracker operator CLI")]
struct Cli {
    /// Base URL of a running koltrack server, for commands that go
    /// through its API.
    #[arg(long, env = "KOLTRACK_SERVER_URL", default_value = "http://127.0.0.1:3000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run pending database migrations.
    Migrate,
    /// Scrape one platform immediately, bypassing the server queue.
    Scrape {
        /// Roster platform id.
        #[arg(long)]
        platform_id: i64,
    },
    /// Trigger a sweep on the running server.
    Sweep {
        #[command(subcommand)]
        which: commands::SweepKind,
    },
    /// Show queue, scheduler, and roster stats from the running server.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Migrate => commands::migrate().await,
        Commands::Scrape { platform_id } => commands::scrape(platform_id).await,
        Commands::Sweep { which } => commands::sweep(&cli.server, &which).await,
        Commands::Status => commands::status(&cli.server).await,
    }
}
