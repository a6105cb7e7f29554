//! Palace CLI
//!
//! Command-line interface for Mind Palace - shelves of coffee beans and albums.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use palace_core::{Config, Store};

mod commands;
mod cover;
mod output;
mod prompt;

use commands::album::AlbumFields;
use commands::bean::BeanFields;
use commands::shelf::Kind;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "palace")]
#[command(about = "Mind Palace - local-first shelves of coffee beans and albums")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the shelves of a collection (cafe or audio)
    #[command(alias = "ls")]
    Shelves { kind: Kind },
    /// Manage shelves
    Shelf {
        #[command(subcommand)]
        command: ShelfCommands,
    },
    /// Manage beans in the cafe collection
    Bean {
        #[command(subcommand)]
        command: BeanCommands,
    },
    /// Manage albums in the audio collection
    Album {
        #[command(subcommand)]
        command: AlbumCommands,
    },
    /// Export both collections to a backup file
    Export {
        /// Directory to write to (defaults to the configured backup_dir)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Import a backup file
    Import { file: PathBuf },
    /// Restore the built-in collections
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show storage status and counts
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ShelfCommands {
    /// Create a shelf
    #[command(alias = "create")]
    Add {
        kind: Kind,
        /// Shelf title ("New Shelf" / "New Genre" when omitted)
        title: Option<String>,
    },
    /// Rename a shelf
    Rename {
        kind: Kind,
        shelf: i64,
        title: String,
    },
    /// Delete a shelf and its items
    #[command(alias = "delete")]
    Rm {
        kind: Kind,
        shelf: i64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum BeanCommands {
    /// Add a bean to a shelf
    Add {
        shelf: i64,
        name: String,
        /// Insert at this position instead of appending
        #[arg(long)]
        at: Option<usize>,
        #[command(flatten)]
        fields: BeanFields,
    },
    /// Edit a bean
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: BeanFields,
    },
    /// Delete a bean
    #[command(alias = "delete")]
    Rm { id: i64 },
}

#[derive(Subcommand)]
enum AlbumCommands {
    /// Add an album to a shelf
    Add {
        shelf: i64,
        /// Insert at this position instead of appending
        #[arg(long)]
        at: Option<usize>,
        #[command(flatten)]
        fields: AlbumFields,
    },
    /// Edit an album
    Edit {
        id: i64,
        #[command(flatten)]
        fields: AlbumFields,
    },
    /// Delete an album
    #[command(alias = "delete")]
    Rm { id: i64 },
    /// Toggle an album's favorite flag
    #[command(alias = "fav")]
    Favorite { id: i64 },
    /// List favorite albums
    Favorites,
    /// Move an album to another shelf or position
    #[command(alias = "mv")]
    Move {
        id: i64,
        /// Target shelf
        #[arg(long)]
        to: i64,
        /// Target position (appends when omitted)
        #[arg(long)]
        index: Option<usize>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, backup_dir, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config doesn't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), &output);
    }

    let config = Config::load()?;
    init_logging(&config);

    let store = Store::open_with_config(&config);
    store.ready().await;

    let result = match cli.command {
        Commands::Shelves { kind } => commands::shelf::list(&store, kind, &output),
        Commands::Shelf { command } => handle_shelf_command(command, &store, &output),
        Commands::Bean { command } => handle_bean_command(command, &store, &output),
        Commands::Album { command } => handle_album_command(command, &store, &output),
        Commands::Export { dir } => commands::transfer::export(&store, &config, dir, &output),
        Commands::Import { file } => commands::transfer::import(&store, &file, &output).await,
        Commands::Reset { yes } => commands::transfer::reset(&store, yes, &output).await,
        Commands::Status => commands::status::show(&store, &config, &output),
        Commands::Config { .. } => Ok(()), // Handled above
    };

    // Background writes must land before the process exits
    store.flush().await;
    report_persist_failures(&store, &output);

    result
}

fn handle_shelf_command(command: ShelfCommands, store: &Store, output: &Output) -> Result<()> {
    match command {
        ShelfCommands::Add { kind, title } => commands::shelf::add(store, kind, title, output),
        ShelfCommands::Rename { kind, shelf, title } => {
            commands::shelf::rename(store, kind, shelf, title, output)
        }
        ShelfCommands::Rm { kind, shelf, yes } => {
            commands::shelf::delete(store, kind, shelf, yes, output)
        }
    }
}

fn handle_bean_command(command: BeanCommands, store: &Store, output: &Output) -> Result<()> {
    match command {
        BeanCommands::Add {
            shelf,
            name,
            at,
            fields,
        } => commands::bean::add(store, shelf, name, fields, at, output),
        BeanCommands::Edit { id, name, fields } => {
            commands::bean::edit(store, id, name, fields, output)
        }
        BeanCommands::Rm { id } => commands::bean::delete(store, id, output),
    }
}

fn handle_album_command(command: AlbumCommands, store: &Store, output: &Output) -> Result<()> {
    match command {
        AlbumCommands::Add { shelf, at, fields } => {
            commands::album::add(store, shelf, fields, at, output)
        }
        AlbumCommands::Edit { id, fields } => commands::album::edit(store, id, fields, output),
        AlbumCommands::Rm { id } => commands::album::delete(store, id, output),
        AlbumCommands::Favorite { id } => commands::album::favorite(store, id, output),
        AlbumCommands::Favorites => commands::album::favorites(store, output),
        AlbumCommands::Move { id, to, index } => {
            commands::album::move_to(store, id, to, index, output)
        }
    }
}

fn handle_config_command(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(output),
        Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, output),
    }
}

/// Warn when changes stayed in memory only
fn report_persist_failures(store: &Store, output: &Output) {
    if let Some(error) = store.durable_error() {
        output.warn(&format!("{}; changes were not saved.", error));
        if let Some(hint) = error.recovery_suggestion() {
            output.warn(hint);
        }
        return;
    }

    let failed = store.persist_stats().failed();
    if failed > 0 {
        output.warn(&format!(
            "{} write(s) failed; recent changes may not be saved. Set PALACE_LOG=debug for details.",
            failed
        ));
    }
}

/// Install a tracing subscriber when PALACE_LOG is set
///
/// Logs go to `log_file` when configured, stderr otherwise.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("PALACE_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "palace_core={},palace_cli={}",
        log_level, log_level
    ));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    // Ignore error if already initialized
    match &config.log_file {
        Some(log_path) => {
            let log_file = match File::create(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
                    return;
                }
            };
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(log_file))
                .try_init();
            info!("Logging to {:?}", log_path);
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}
