mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use msync_db::PgMatchStore;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "msync")]
#[command(about = "Match sync operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands (DATABASE_URL)
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Inspect stored match records
    Matches {
        #[command(subcommand)]
        cmd: MatchesCmd,
    },

    /// Offline template tools
    Template {
        #[command(subcommand)]
        cmd: TemplateCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (later files win)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations
    Migrate,
}

#[derive(Subcommand)]
enum MatchesCmd {
    /// One line per record
    List {
        /// Only records in this state (NEW | IN_PROGRESS | FINISHED)
        #[arg(long)]
        state: Option<String>,
    },
}

#[derive(Subcommand)]
enum TemplateCmd {
    /// Render a template against the sample match (or --match)
    Render {
        /// Template file
        #[arg(long)]
        file: PathBuf,

        /// Match info JSON file; defaults to the built-in sample match
        #[arg(long = "match")]
        match_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = msync_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = msync_db::status(&pool).await?;
                    println!("db_ok={} has_matches_table={}", s.ok, s.has_matches_table);
                    for (state, n) in msync_db::count_by_state(&pool).await? {
                        println!("state={} count={}", state, n);
                    }
                }
                DbCmd::Migrate => {
                    msync_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::Matches { cmd } => match cmd {
            MatchesCmd::List { state } => {
                let state = state
                    .as_deref()
                    .map(commands::matches::parse_state)
                    .transpose()?;
                let pool = msync_db::connect_from_env().await?;
                let store = PgMatchStore::new(pool, msync_config::DEFAULT_STORE_TIMEOUT);
                for line in commands::matches::list(&store, state).await? {
                    println!("{}", line);
                }
            }
        },

        Commands::Template { cmd } => match cmd {
            TemplateCmd::Render { file, match_file } => {
                let out = commands::template::render_file(&file, match_file.as_deref())?;
                println!("{}", out);
            }
        },

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = msync_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}
