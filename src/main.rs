use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use soundmap::pipeline::{self, spectral};
use soundmap::report;
use soundmap::serve::{self, App};
use soundmap::{AppConfig, AudioStore, Database, DataContext};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "soundmap")]
#[command(author, version, about = "Map a synthesizer sample library by its spectra")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (default: ./soundmap.toml, then the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the feature pipeline over a directory of spectrum CSVs
    Build {
        /// Root of the `<group>/<name>.csv` tree (folder picker when omitted)
        csv_dir: Option<PathBuf>,

        /// Table store to write
        #[arg(long)]
        db: Option<PathBuf>,

        /// Also write points.csv and spectra.csv into this directory
        #[arg(long)]
        csv_out: Option<PathBuf>,

        /// t-SNE perplexity
        #[arg(long)]
        perplexity: Option<f64>,

        /// Number of k-means clusters
        #[arg(long)]
        clusters: Option<usize>,

        /// Seed for t-SNE and k-means initialization
        #[arg(long)]
        seed: Option<u64>,

        /// Number of parallel workers (default: number of CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Hide progress bars
        #[arg(short, long)]
        quiet: bool,
    },

    /// Turn a tree of audio files into spectrum CSVs
    Extract {
        /// Root of the `<group>/<name>.<ext>` audio tree
        sound_dir: PathBuf,

        /// Where the `<group>/<name>.csv` files go
        csv_dir: PathBuf,

        /// Hide progress bars
        #[arg(short, long)]
        quiet: bool,
    },

    /// Start the interactive sound map
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Table store to read
        #[arg(long)]
        db: Option<PathBuf>,

        /// Root of the `<group>/<name>.wav` audio tree
        #[arg(long)]
        sound_dir: Option<PathBuf>,

        /// Offer every library category instead of the production subset
        #[arg(long)]
        all_sounds: bool,

        /// Don't open a browser
        #[arg(long)]
        no_open: bool,
    },

    /// Write a static report (.html, .json, anything else is CSV)
    Report {
        /// Output file
        out: PathBuf,

        /// Table store to read
        #[arg(long)]
        db: Option<PathBuf>,

        /// Offer every library category instead of the production subset
        #[arg(long)]
        all_sounds: bool,

        /// Don't open the report when done
        #[arg(long)]
        no_open: bool,
    },

    /// List recent pipeline runs
    Runs {
        /// Table store to read
        #[arg(long)]
        db: Option<PathBuf>,

        /// Number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: i64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let mut config = AppConfig::load(cli.config.as_deref());

    match cli.command {
        Command::Build {
            csv_dir,
            db,
            csv_out,
            perplexity,
            clusters,
            seed,
            jobs,
            quiet,
        } => {
            let csv_dir = resolve_csv_dir(csv_dir)?;
            if let Some(p) = perplexity {
                config.pipeline.perplexity = p;
            }
            if let Some(k) = clusters {
                config.pipeline.clusters = k;
            }
            if let Some(s) = seed {
                config.pipeline.seed = s;
            }
            if let Some(j) = jobs {
                config.pipeline.workers = j;
            }
            let db_path = db.unwrap_or_else(|| config.db_path());
            cmd_build(&csv_dir, &db_path, csv_out.as_deref(), &config, !quiet)
        }
        Command::Extract { sound_dir, csv_dir, quiet } => {
            let summary = spectral::extract_library(&sound_dir, &csv_dir, !quiet)
                .with_context(|| format!("Failed to extract spectra from {}", sound_dir.display()))?;
            eprintln!(
                "\x1b[1;32m{}\x1b[0m spectra written to {}, \x1b[1;31m{}\x1b[0m failed",
                summary.written,
                csv_dir.display(),
                summary.failed
            );
            Ok(())
        }
        Command::Serve {
            port,
            db,
            sound_dir,
            all_sounds,
            no_open,
        } => {
            if all_sounds {
                config.use_all_sounds = true;
            }
            let db_path = db.unwrap_or_else(|| config.db_path());
            let ctx = load_context(&db_path, &config)?;
            let store = AudioStore::new(sound_dir.unwrap_or_else(|| config.sound_dir()));
            let port = port.unwrap_or_else(|| config.port());
            serve::start(port, App::new(ctx, store), !no_open)
                .with_context(|| format!("Server error on port {}", port))
        }
        Command::Report {
            out,
            db,
            all_sounds,
            no_open,
        } => {
            if all_sounds {
                config.use_all_sounds = true;
            }
            let db_path = db.unwrap_or_else(|| config.db_path());
            let ctx = load_context(&db_path, &config)?;
            report::generate(&out, &ctx)
                .with_context(|| format!("Failed to write report {}", out.display()))?;
            eprintln!("Report: {}", out.display());
            if !no_open {
                if let Err(e) = open::that(&out) {
                    log::warn!("Could not open report: {}", e);
                }
            }
            Ok(())
        }
        Command::Runs { db, limit } => {
            let db_path = db.unwrap_or_else(|| config.db_path());
            cmd_runs(&db_path, limit)
        }
    }
}

fn cmd_build(
    csv_dir: &Path,
    db_path: &Path,
    csv_out: Option<&Path>,
    config: &AppConfig,
    progress: bool,
) -> Result<()> {
    let settings = &config.pipeline;
    log::info!(
        "Building map from {} (perplexity {}, {} clusters, seed {})",
        csv_dir.display(),
        settings.perplexity,
        settings.clusters,
        settings.seed
    );

    let output = pipeline::run(csv_dir, settings, progress)
        .with_context(|| format!("Pipeline failed for {}", csv_dir.display()))?;

    let db = Database::open_at(db_path)
        .with_context(|| format!("Failed to open {}", db_path.display()))?;
    db.replace_library(&output.points, &output.spectra)
        .context("Failed to store pipeline output")?;
    let run_id = db
        .record_run(csv_dir, &output, settings)
        .context("Failed to record pipeline run")?;

    if let Some(dir) = csv_out {
        write_tables(dir, &output).with_context(|| format!("Failed to write tables to {}", dir.display()))?;
    }

    eprintln!();
    eprintln!("\x1b[1m══════════════════════════════════════════════════════\x1b[0m");
    eprintln!("\x1b[1mRun #{}:\x1b[0m {} samples, {} features, {} clusters", run_id, output.sample_count, output.feature_names.len(), output.cluster_count);
    eprintln!("  Stored in {}", db_path.display());
    eprintln!("\x1b[1m══════════════════════════════════════════════════════\x1b[0m");
    Ok(())
}

fn write_tables(dir: &Path, output: &pipeline::PipelineOutput) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    let mut points = BufWriter::new(File::create(dir.join("points.csv"))?);
    report::csv::write_points(&mut points, &output.points)?;

    let mut spectra = BufWriter::new(File::create(dir.join("spectra.csv"))?);
    report::csv::write_spectra(&mut spectra, &output.points, &output.spectra)?;

    log::info!("Wrote points.csv and spectra.csv to {}", dir.display());
    Ok(())
}

fn cmd_runs(db_path: &Path, limit: i64) -> Result<()> {
    let db = Database::open_at(db_path).with_context(|| format!("Failed to open {}", db_path.display()))?;
    let runs = db.recent_runs(limit)?;
    if runs.is_empty() {
        println!("No runs found.");
        return Ok(());
    }

    println!(
        "{:<5} {:<26} {:>7} {:>8} {:>5} {:>6} {}",
        "ID", "GENERATED", "SAMPLES", "FEATURES", "K", "SEED", "SOURCE"
    );
    println!("{}", "-".repeat(80));
    for r in runs {
        println!(
            "{:<5} {:<26} {:>7} {:>8} {:>5} {:>6} {}",
            r.id,
            truncate(&r.generated_at, 26),
            r.sample_count,
            r.feature_count,
            r.cluster_count,
            r.seed,
            r.source_dir
        );
    }
    Ok(())
}

fn load_context(db_path: &Path, config: &AppConfig) -> Result<DataContext> {
    if !db_path.exists() {
        bail!("No table store at {}. Run `soundmap build` first.", db_path.display());
    }
    let db = Database::open_at(db_path).with_context(|| format!("Failed to open {}", db_path.display()))?;
    let ctx = DataContext::from_store(&db, config.catalog(), config.view.clone())
        .with_context(|| format!("Failed to load the map from {}", db_path.display()))?;
    if ctx.points().is_empty() {
        log::warn!("{} has no sample points", db_path.display());
    }
    Ok(ctx)
}

#[cfg(feature = "gui")]
fn resolve_csv_dir(arg: Option<PathBuf>) -> Result<PathBuf> {
    match arg {
        Some(p) => Ok(p),
        None => match pick_folder_gui() {
            Some(p) => Ok(p),
            None => bail!("No folder selected."),
        },
    }
}

#[cfg(not(feature = "gui"))]
fn resolve_csv_dir(arg: Option<PathBuf>) -> Result<PathBuf> {
    match arg {
        Some(p) => Ok(p),
        None => bail!("Usage: soundmap build <CSV_DIR> (folder picker not available in this build)"),
    }
}

#[cfg(feature = "gui")]
fn pick_folder_gui() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Select the spectrum CSV folder")
        .pick_folder()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
