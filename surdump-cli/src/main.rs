use std::panic;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::Parser;
use log::info;

use surdump::chain;
use surdump::config::DumpConfig;
use surdump::database::Database;
use surdump::engine::DumpEngine;

use surdumpcli::command::Command;
use surdumpcli::config::CliSettings;
use surdumpcli::{seed, trace};

#[derive(Debug, Parser)]
#[command(version, author, about = "Consistent backup engine for a change-feed-backed document database")]
pub struct Args {
    /// Configuration file path.
    #[clap(short = 'c', long = "config", default_value = "config/surdump.json")]
    config: PathBuf,

    #[clap(short = 'l', long)]
    log_level: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_panic_hook();

    let args = Args::parse();

    // Logging must come up before the config file is loaded, or a warning
    // about a malformed config file has nowhere to go.
    let log_level = args.log_level.clone().unwrap_or_else(|| "info".to_string());
    let log_dir = format!("{}/.surdumpcli", std::env::var("HOME").unwrap_or_else(|_| ".".to_string()));
    let _guards = trace::init_logging(&log_dir, &log_level).await?;
    info!("surdumpcli starting with {:?}", args.command);

    // Parsed for its fallback-to-default-with-a-warning behavior; CLI flags
    // take precedence over every setting it carries today.
    let _settings = CliSettings::load(&args.config);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        eprintln!("received Ctrl+C, finishing in-flight database calls and stopping");
        r.store(false, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    match args.command {
        Command::Full { namespace, database, output_dir, filename, tables, seed } => {
            run_full(namespace, database, output_dir, filename, tables, seed, running.as_ref()).await
        }
        Command::Incremental { namespace, database, output_dir, filename, tables, since, seed } => {
            run_incremental(namespace, database, output_dir, filename, tables, since, seed, running.as_ref()).await
        }
        Command::Chains { dir } => run_chains(&dir),
    }
}

async fn run_full(
    namespace: String,
    database: String,
    output_dir: PathBuf,
    filename: String,
    tables: Option<Vec<String>>,
    seed_path: Option<PathBuf>,
    running: &AtomicBool,
) -> Result<()> {
    std::fs::create_dir_all(&output_dir)?;
    let mut db = match seed_path {
        Some(path) => seed::load(&path)?,
        None => surdump::database::testing::FakeDatabase::new(),
    };
    db.use_namespace(&namespace, &database).await?;

    let config = DumpConfig { namespace, database, output_dir, tables, change_feed_retention_secs: 3600 };
    let mut engine = DumpEngine::new(&mut db, config, running)?;
    let outcome = engine.full(&filename).await?;

    println!(
        "wrote {} ({} bytes, versionstamps 0..{})",
        outcome.manifest.filename, outcome.manifest.size, outcome.manifest.end_versionstamp
    );
    Ok(())
}

async fn run_incremental(
    namespace: String,
    database: String,
    output_dir: PathBuf,
    filename: String,
    tables: Option<Vec<String>>,
    since: u64,
    seed_path: Option<PathBuf>,
    running: &AtomicBool,
) -> Result<()> {
    std::fs::create_dir_all(&output_dir)?;
    let mut db = match seed_path {
        Some(path) => seed::load(&path)?,
        None => surdump::database::testing::FakeDatabase::new(),
    };
    db.use_namespace(&namespace, &database).await?;

    let config = DumpConfig { namespace, database, output_dir, tables, change_feed_retention_secs: 3600 };
    let mut engine = DumpEngine::new(&mut db, config, running)?;
    let outcome = engine.incremental(&filename, since).await?;

    println!(
        "wrote {} ({} bytes, versionstamps {}..{})",
        outcome.manifest.filename, outcome.manifest.size, outcome.manifest.start_versionstamp, outcome.manifest.end_versionstamp
    );
    Ok(())
}

fn run_chains(dir: &std::path::Path) -> Result<()> {
    let chains = surdump::directory::scan_chains(dir)?;
    if chains.is_empty() {
        println!("no chains found under {}", dir.display());
        return Ok(());
    }
    for c in &chains {
        println!("{}.{}  head={}", c.full.namespace, c.full.database, c.full.filename);
        println!("  size: {} bytes", c.total_size());
        println!("  restore points: {:?}", chain::restore_points(c));
        for inc in &c.increments {
            println!("  + {} ({}..{})", inc.filename, inc.start_versionstamp, inc.end_versionstamp);
        }
    }
    Ok(())
}

fn setup_panic_hook() {
    let meta = human_panic::Metadata {
        version: env!("CARGO_PKG_VERSION").into(),
        name: env!("CARGO_PKG_NAME").into(),
        authors: env!("CARGO_PKG_AUTHORS").replace(':', ", ").into(),
        homepage: env!("CARGO_PKG_HOMEPAGE").into(),
    };

    let default_hook = panic::take_hook();
    if std::env::var("RUST_BACKTRACE").is_err() {
        panic::set_hook(Box::new(move |info: &panic::PanicInfo| {
            default_hook(info);
            let file_path = human_panic::handle_dump(&meta, info);
            human_panic::print_msg(file_path, &meta)
                .expect("human-panic: printing error message to console failed");
        }));
    }
}
