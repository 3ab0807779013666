//! CLI entry point for `mboxscope`.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mboxscope::config::{self, Config};
use mboxscope::ingest::ImportPipeline;
use mboxscope::parser::mbox::MboxArchive;
use mboxscope::report;
use mboxscope::store::{MessageStore, SqliteStore};

#[derive(Parser)]
#[command(
    name = "mboxscope",
    version,
    about = "Import MBOX export archives into SQLite and report on them"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Import an MBOX archive into a SQLite store
    Import {
        /// Path to the MBOX archive
        archive: PathBuf,
        /// Path where the SQLite store is written
        db: PathBuf,
        /// Replace real identities with surrogate identities
        #[arg(long)]
        pseudonymize: bool,
        /// Messages per storage transaction (overrides config)
        #[arg(long)]
        batch_size: Option<u64>,
    },
    /// Render the statistics report from an imported store
    Report {
        /// Path to the SQLite store
        db: PathBuf,
        /// Output HTML file
        #[arg(short, long, default_value = "report.html")]
        output: PathBuf,
        /// Owner address to exclude from top charts (overrides config)
        #[arg(long)]
        owner: Option<String>,
    },
    /// Show statistics about an imported store
    Stats {
        /// Path to the SQLite store
        db: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    setup_logging(&log_level, &config);

    match cli.command {
        Commands::Import {
            archive,
            db,
            pseudonymize,
            batch_size,
        } => {
            if pseudonymize {
                config.import.pseudonymize = true;
            }
            if let Some(size) = batch_size {
                config.import.batch_size = size;
            }
            cmd_import(&archive, &db, &config)
        }
        Commands::Report { db, output, owner } => {
            if let Some(owner) = owner {
                config.report.owner_address = owner;
            }
            cmd_report(&db, &output, &config)
        }
        Commands::Stats { db, json } => cmd_stats(&db, json),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mboxscope.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Import an archive into a fresh SQLite store.
fn cmd_import(archive_path: &Path, db_path: &Path, config: &Config) -> anyhow::Result<()> {
    let archive = MboxArchive::open(archive_path)?;

    let pb = ProgressBar::new(archive.file_size());
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} Importing [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let mut store = SqliteStore::open(db_path)?;
    let summary = ImportPipeline::new(&mut store, &config.import).run(
        &archive,
        Some(&|current, total| {
            pb.set_length(total);
            pb.set_position(current);
        }),
    )?;
    pb.finish_and_clear();

    use humansize::{format_size, BINARY};
    println!();
    println!(
        "  {:<20} {}",
        "Archive",
        archive_path.display()
    );
    println!(
        "  {:<20} {}",
        "Archive size",
        format_size(archive.file_size(), BINARY)
    );
    println!("  {:<20} {}", "Messages", summary.message_count);
    println!("  {:<20} {}", "Identities", summary.identity_count);
    if config.import.pseudonymize {
        println!("  {:<20} {}", "Pseudonymized", "yes");
    }
    println!("  {:<20} {}", "Batches committed", summary.commit_count);
    println!("  {:<20} {:.2?}", "Import time", summary.elapsed);
    println!("  {:<20} {}", "Store", db_path.display());
    println!();

    Ok(())
}

/// Render the HTML report.
fn cmd_report(db_path: &Path, output: &Path, config: &Config) -> anyhow::Result<()> {
    if !db_path.exists() {
        anyhow::bail!("Store not found: {}", db_path.display());
    }

    let chart_count = report::write_report(db_path, &config.report, output)?;

    println!();
    println!("  {:<20} {}", "Charts rendered", chart_count);
    println!("  {:<20} {}", "Report", output.display());
    println!();

    Ok(())
}

/// Print store statistics as a table or JSON.
fn cmd_stats(db_path: &Path, json: bool) -> anyhow::Result<()> {
    if !db_path.exists() {
        anyhow::bail!("Store not found: {}", db_path.display());
    }

    let mut store = SqliteStore::open(db_path)?;
    store.ensure_schema()?;
    let conn = store.into_connection();

    let messages: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))?;
    let chats: i64 = conn.query_row(
        "SELECT COUNT(*) FROM messages WHERE labels LIKE '%Chat%'",
        [],
        |r| r.get(0),
    )?;
    let identities: i64 = conn.query_row("SELECT COUNT(*) FROM identity_map", [], |r| r.get(0))?;
    let date_range: Option<(String, String)> = conn
        .query_row(
            "SELECT MIN(date), MAX(date) FROM messages WHERE date <> ''",
            [],
            |r| {
                Ok(match (r.get::<_, Option<String>>(0)?, r.get::<_, Option<String>>(1)?) {
                    (Some(min), Some(max)) => Some((min, max)),
                    _ => None,
                })
            },
        )?;

    if json {
        let stats = serde_json::json!({
            "store": db_path.to_string_lossy(),
            "message_count": messages,
            "chat_count": chats,
            "mail_count": messages - chats,
            "pseudonymized_identities": identities,
            "date_range": date_range.as_ref().map(|(min, max)| {
                serde_json::json!({"oldest": min, "newest": max})
            }),
        });
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!();
        println!("  {:<20} {}", "Store", db_path.display());
        println!("  {:<20} {}", "Messages", messages);
        println!("  {:<20} {}", "Chat messages", chats);
        println!("  {:<20} {}", "Mail messages", messages - chats);
        if identities > 0 {
            println!("  {:<20} {}", "Pseudonymized ids", identities);
        }
        if let Some((min, max)) = date_range {
            println!("  {:<20} {} — {}", "Date range", min, max);
        }
        println!();
    }

    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mboxscope", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
