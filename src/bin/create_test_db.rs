use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;

use chama_rs::{
    ContributionManager, ManagerConfig, MemberManager, RecordStore, setup_logging, timestamp_now,
};

/// A utility for creating a test database for chama_rs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

const MILLISECONDS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

const TEST_MEMBERS: [(&str, &str); 3] = [
    ("Wanjiru Kamau", "+254 700 000 001"),
    ("Otieno Odhiambo", "+254 700 000 002"),
    ("Achieng Atieno", "+254 700 000 003"),
];

/// Create and populate a database for manual testing.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    setup_logging();

    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let store = RecordStore::open(output_path)?;
    let members = MemberManager::new(store.clone(), ManagerConfig::default());
    let contributions = ContributionManager::new(store, ManagerConfig::default());

    println!("Creating test members...");

    let now = timestamp_now();

    for (index, (name, phone)) in TEST_MEMBERS.into_iter().enumerate() {
        let Some(member) = members.add_member(name, phone).await?.applied() else {
            continue;
        };

        for week in 0..4 {
            let amount = 500.0 * (index + 1) as f64;
            let timestamp = now - week * 7 * MILLISECONDS_PER_DAY;

            let outcome = contributions
                .add_contribution(member.id, amount, timestamp)
                .await?;

            if outcome.is_skipped() {
                tracing::warn!("Skipped contribution of {amount} for {name}");
            }
        }
    }

    println!("Success!");

    Ok(())
}
