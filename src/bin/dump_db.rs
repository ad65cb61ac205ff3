use std::{error::Error, path::Path, process::exit};

use clap::Parser;

use chama_rs::{RecordStore, setup_logging};

/// Print every member of a chama_rs database with their contributions as JSON.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// Indent the JSON output.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    setup_logging();

    let args = Args::parse();
    let db_path = Path::new(&args.db_path);

    if !db_path.is_file() {
        eprintln!("No database found at {db_path:#?}");
        exit(1);
    }

    let store = RecordStore::open(db_path)?;
    let snapshot = store
        .observe_members_with_contributions()
        .next()
        .await?
        .unwrap_or_default();

    tracing::debug!("Loaded {} member(s)", snapshot.len());

    let json = if args.pretty {
        serde_json::to_string_pretty(&snapshot)?
    } else {
        serde_json::to_string(&snapshot)?
    };
    println!("{json}");

    Ok(())
}
