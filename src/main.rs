use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use ihyd_rs::cli::get_args;
use ihyd_rs::config::ColumnConfig;
use ihyd_rs::hydrology::{self, Region};
use ihyd_rs::network::{self, NetworkStore};

fn main() -> Result<()> {
    // Configuration
    let (network_path, region_code, table) = get_args();
    let cols = ColumnConfig::new();
    let region = Region::from_code(region_code);

    let mut store = NetworkStore::open(&network_path, &table)?;

    // Load segment identifiers and drainage areas
    println!("Loading segment attributes...");
    let (segids, da_sqkm) = store.drainage(&cols)?;

    println!("\nRun configuration:");
    println!("  Network: {:?}", network_path);
    println!("  Region code: {} ({:?} curves)", region_code, region);
    println!("  Segments: {}", segids.len());

    // Discharge phase: regional curves keyed back onto the network
    println!("\nAdding Qlow and Q2 to network...");
    let discharges = hydrology::regional_discharge(region, &da_sqkm);
    let qmap = network::discharge_map(&segids, &discharges);

    let pb = progress_bar(segids.len())?;
    let stats = store.write_discharge(&cols, &qmap, &pb)?;
    pb.finish_and_clear();
    if stats.skipped > 0 {
        println!(
            "{} segments had no computed discharge and were left unchanged",
            stats.skipped
        );
    }

    // Check that Q2 is greater than Qlow; if not, lift Q2 to Qlow + 0.001
    let repaired = store.repair_peaks(&cols)?;
    if repaired > 0 {
        println!("Repaired {} segments where Q2 fell below Qlow", repaired);
    }

    // Stream power phase, from slope and the repaired discharge
    println!("Adding stream power to network...");
    let pb = progress_bar(segids.len())?;
    let updated = store.write_stream_power(&cols, &pb)?;
    pb.finish_and_clear();

    store.finish()?;

    println!(
        "\nHydrology attributes complete: {} discharge and {} stream power updates written to {:?}",
        stats.matched, updated, network_path
    );
    Ok(())
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments ({eta})",
            )?
            .progress_chars("#>-"),
    );
    Ok(pb)
}
