//! playtime: keeps a history of when games were played.
//!
//! ## Subcommands
//!
//! - `sync`: fetch every configured source and reconcile it into the history
//! - `import-gauge`: merge spent/rating/tags from a GaugePowered CSV export
//! - `list`: show stored games
//! - `history`: show one game's play history
//! - `set-spent`: edit what was spent on a game

mod logging;
mod manage;
mod sync;
mod terminal;

use clap::{Parser, Subcommand};
use playtime_core::{FixedPrompter, Prompter, StorageConfig};
use std::path::PathBuf;

use crate::terminal::TerminalPrompter;

#[derive(Parser)]
#[command(name = "playtime")]
#[command(about = "Playtime history tracker")]
#[command(version)]
struct Cli {
    /// Data directory (defaults to ~/.playtime)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Answer yes to every question
    #[arg(long, global = true, conflicts_with = "no")]
    yes: bool,

    /// Answer no to every question
    #[arg(long, global = true)]
    no: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all configured sources and update the history
    Sync,

    /// Import spent, rating and tags from a GaugePowered CSV export
    ImportGauge {
        /// Path to the exported CSV
        #[arg(value_name = "CSV")]
        csv: PathBuf,
    },

    /// List stored games
    List,

    /// Show the play history of one game
    History {
        #[arg(value_name = "APPID", allow_negative_numbers = true)]
        appid: i64,
    },

    /// Set what was spent on a game (omit the amount to clear it)
    SetSpent {
        #[arg(value_name = "APPID", allow_negative_numbers = true)]
        appid: i64,

        #[arg(value_name = "AMOUNT")]
        amount: Option<f64>,
    },
}

fn main() {
    let cli = Cli::parse();
    let storage = cli
        .root
        .clone()
        .map(StorageConfig::with_root)
        .unwrap_or_default();
    let _logging_guard = logging::init(&storage);

    let mut prompter: Box<dyn Prompter> = if cli.yes {
        Box::new(FixedPrompter::yes())
    } else if cli.no {
        Box::new(FixedPrompter::no())
    } else {
        Box::new(TerminalPrompter::stdio())
    };

    let (name, result) = match cli.command {
        Commands::Sync => ("sync", sync::run(&storage, prompter.as_mut())),
        Commands::ImportGauge { csv } => (
            "import-gauge",
            manage::import_gauge(&storage, &csv, prompter.as_mut()),
        ),
        Commands::List => ("list", manage::list(&storage)),
        Commands::History { appid } => ("history", manage::history(&storage, appid)),
        Commands::SetSpent { appid, amount } => {
            ("set-spent", manage::set_spent(&storage, appid, amount))
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, command = name, "playtime command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
