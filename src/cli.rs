use clap::{Parser, command};
use std::path::PathBuf;

/// Adds discharge and stream power attributes to a stream network table
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the segment network table (.csv, .sqlite, .gpkg or .db)
    network: PathBuf,

    /// Regional curve code (101, 102 or 24; any other value selects the default curves)
    region: Option<u16>,

    /// Table holding the segment attributes when the network is a database
    #[arg(short, long, default_value = "network")]
    table: String,
}

pub fn get_args() -> (PathBuf, u16, String) {
    let args = Args::parse();

    // network table, region code (absent means the sentinel 0), db table name
    (args.network, args.region.unwrap_or(0), args.table)
}
