//! Print the raw feature vector of one or more spectrum CSVs
//!
//! Useful when a sample lands somewhere unexpected on the map.

use soundmap::pipeline::{features, loader};
use std::env;
use std::path::Path;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: feature_detail <file.csv> [file.csv ...]");
        std::process::exit(1);
    }

    let mut failed = false;
    for path in &args[1..] {
        println!("\n{}", "=".repeat(60));
        println!("FILE: {}", path);
        println!("{}", "=".repeat(60));
        if let Err(e) = show_file(Path::new(path)) {
            eprintln!("  {}", e);
            failed = true;
        }
    }

    if failed {
        std::process::exit(1);
    }
}

fn show_file(path: &Path) -> soundmap::Result<()> {
    let spectrum = loader::read_spectrum(path)?;
    let normalized = features::normalize_to_peaks(&spectrum.powers);
    let starts = features::band_starts(&spectrum.frequencies);
    let values = features::extract(&normalized, &starts);

    let first = spectrum.frequencies.first().copied().unwrap_or(0.0);
    let last = spectrum.frequencies.last().copied().unwrap_or(0.0);
    println!("Bins: {} ({:.1} Hz .. {:.1} Hz)", spectrum.len(), first, last);

    println!("\nPeaks (normalized dB):");
    for i in 0..features::PEAK_COUNT {
        let bin = features::STRIDE * (i + 1);
        let freq = spectrum.frequencies.get(bin).copied().unwrap_or(0.0);
        println!("  peak_{}  bin {:>4}  {:>9.1} Hz  {:>6.1}", i, bin, freq, values[i]);
    }

    println!("\nBand counts (bins above threshold):");
    print!("  {:>8} {:>6}", "EDGE", "START");
    for threshold in features::THRESHOLDS_DB {
        print!(" {:>4}", threshold as u32);
    }
    println!();
    for (band, edge) in features::BAND_EDGES_HZ.iter().enumerate() {
        print!("  {:>8} {:>6}", *edge as u32, starts[band]);
        let offset = features::PEAK_COUNT + band * features::THRESHOLDS_DB.len();
        for count in &values[offset..offset + features::THRESHOLDS_DB.len()] {
            print!(" {:>4}", *count as u32);
        }
        println!();
    }

    Ok(())
}
