mod commands;

use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "linkpulse-cli")]
#[command(about = "LinkPulse link-health audit command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a full link-health audit for an owner.
    Audit {
        #[arg(long)]
        owner: Uuid,
        #[arg(long, default_value = "full")]
        run_type: String,
    },
    /// Audit a single URL without persisting anything.
    Check {
        url: String,
        #[arg(long)]
        expected_tag: Option<String>,
    },
    /// Re-fingerprint an owner's known links and report drift.
    Destinations {
        #[arg(long)]
        owner: Uuid,
    },
    /// Manage tracked pages.
    Pages {
        #[command(subcommand)]
        command: PagesCommands,
    },
}

#[derive(Debug, Subcommand)]
enum PagesCommands {
    /// Register a bio/landing page for auditing.
    Add {
        #[arg(long)]
        owner: Uuid,
        url: String,
    },
    /// List an owner's tracked pages.
    List {
        #[arg(long)]
        owner: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Audit { owner, run_type } => commands::run_audit(owner, &run_type).await,
        Commands::Check { url, expected_tag } => commands::check_url(&url, expected_tag).await,
        Commands::Destinations { owner } => commands::check_destinations(owner).await,
        Commands::Pages { command } => match command {
            PagesCommands::Add { owner, url } => commands::add_page(owner, &url).await,
            PagesCommands::List { owner } => commands::list_pages(owner).await,
        },
    }
}
