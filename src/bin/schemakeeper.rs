use clap::{Parser, Subcommand};
use schemakeeper::KeeperConfig;
use tracing::Level;

mod commands;

use commands::config::ConfigArgs;
use commands::open::OpenArgs;
use commands::path::PathArgs;
use commands::status::StatusArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.schemakeeper/schemakeeper.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Output as JSON objects
    #[clap(long, global = true)]
    json: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a database, creating and migrating it to the requested version.
    Open(OpenArgs),

    /// Show whether a database exists, passes the integrity check and its version.
    Status(StatusArgs),

    /// Print the on-disk paths a database name resolves to.
    Path(PathArgs),

    /// Show configuration and data directory summary.
    Config(ConfigArgs),
}

fn main() {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            // filter spans/events with level DEBUG or higher.
            .with_max_level(Level::DEBUG)
            .init();
    }

    let config = match KeeperConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let ok = match cli.command {
        Commands::Open(args) => commands::open::run(&config, args, cli.json),
        Commands::Status(args) => commands::status::run(&config, args, cli.json),
        Commands::Path(args) => commands::path::run(&config, args, cli.json),
        Commands::Config(args) => commands::config::run(&config, args, cli.json),
    };

    if !ok {
        std::process::exit(1);
    }
}
