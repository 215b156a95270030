use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use projects_file::config::Config;
use projects_file::import::{self, ImportError};
use projects_file::storage::{BackendKind, Connector, SchemaMode, StoreConfig};

/// Import a projects CSV export into the configured store.
#[derive(Debug, Parser)]
#[command(name = "projects-import", version)]
struct Args {
    /// Backend to import into: sqlite3 or dynamodb
    #[arg(short = 't', long = "type", value_name = "KIND")]
    kind: Option<BackendKind>,

    /// Drop and recreate the projects table first. Destroys existing data.
    #[arg(long)]
    recreate: bool,

    /// SQLite database file
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// DynamoDB table name
    #[arg(long, value_name = "NAME")]
    table: Option<String>,

    /// AWS region for DynamoDB
    #[arg(long)]
    region: Option<String>,

    /// DynamoDB endpoint, e.g. a local emulator
    #[arg(long, value_name = "URL")]
    endpoint_url: Option<String>,

    /// CSV file with a header row
    file: PathBuf,
}

impl Args {
    fn apply(&self, mut store: StoreConfig) -> StoreConfig {
        if let Some(kind) = self.kind {
            store.kind = kind;
        }
        if let Some(db) = &self.db {
            store.sqlite_path = db.clone();
        }
        if let Some(table) = &self.table {
            store.table_name = table.clone();
        }
        if let Some(region) = &self.region {
            store.region = region.clone();
        }
        if let Some(url) = &self.endpoint_url {
            store.endpoint_url = Some(url.clone());
        }
        store
    }

    fn mode(&self) -> SchemaMode {
        if self.recreate {
            SchemaMode::Recreate
        } else {
            SchemaMode::Reuse
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // Progress goes to stdout, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let store = args.apply(config.store);
    match import_file(&args, &store).await {
        Ok(inserted) => {
            println!();
            println!("Inserted {inserted} rows into database.");
            println!("0 OK 0:1");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!();
            eprintln!("Import failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn import_file(args: &Args, store: &StoreConfig) -> Result<usize, Box<dyn std::error::Error>> {
    let source = File::open(&args.file)
        .map_err(|e| format!("cannot open {}: {e}", args.file.display()))?;
    let connector = Connector::new(store).await.map_err(ImportError::Connect)?;

    println!("Reticulating Splines");
    let report = import::run(&connector, source, args.mode(), |_| {
        print!(".");
        let _ = std::io::stdout().flush();
    })
    .await?;

    Ok(report.inserted)
}
