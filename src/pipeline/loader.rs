//! Reading the per-sample spectrum tables
//!
//! Layout on disk is `<root>/<group>/<sample>.csv`, one file per sample with a
//! frequency column and a power column. Comma- and tab-separated exports are
//! both accepted (`Level (dB)` is what Audacity calls the power column).

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::features::MIN_BINS;
use crate::error::{Error, Result};
use crate::model::Spectrum;

const FREQUENCY_COLUMNS: &[&str] = &["Frequency (Hz)", "Frequency"];
const POWER_COLUMNS: &[&str] = &["Power (dB)", "Level (dB)", "Power"];

#[derive(Debug, Clone)]
pub struct RawSample {
    pub name: String,
    pub group: String,
    pub path: PathBuf,
    pub spectrum: Spectrum,
}

/// All `.csv` files below `root` with a parent directory, sorted.
pub fn discover(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

/// (group, name) for a spectrum file: parent directory name and file stem.
pub fn identify(path: &Path) -> Option<(String, String)> {
    let name = path.file_stem()?.to_str()?.to_string();
    let group = path.parent()?.file_name()?.to_str()?.to_string();
    Some((group, name))
}

pub fn read_spectrum(path: &Path) -> Result<Spectrum> {
    let text = std::fs::read_to_string(path)?;
    parse_spectrum(&text).map_err(|reason| match reason {
        ParseFailure::Csv(e) => Error::Csv(e),
        ParseFailure::Invalid(reason) => Error::InvalidSpectrum { path: path.to_path_buf(), reason },
    })
}

#[derive(Debug)]
enum ParseFailure {
    Csv(csv::Error),
    Invalid(String),
}

impl From<csv::Error> for ParseFailure {
    fn from(e: csv::Error) -> Self {
        ParseFailure::Csv(e)
    }
}

fn parse_spectrum(text: &str) -> std::result::Result<Spectrum, ParseFailure> {
    let first_line = text.lines().next().unwrap_or("");
    let delimiter = if first_line.contains('\t') && !first_line.contains(',') { b'\t' } else { b',' };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |names: &[&str]| headers.iter().position(|h| names.contains(&h));
    let freq_col = column(FREQUENCY_COLUMNS)
        .ok_or_else(|| ParseFailure::Invalid("no frequency column".into()))?;
    let power_col = column(POWER_COLUMNS)
        .ok_or_else(|| ParseFailure::Invalid("no power column".into()))?;

    let mut spectrum = Spectrum::default();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let value = |col: usize| -> std::result::Result<f64, ParseFailure> {
            let raw = record.get(col).unwrap_or("");
            raw.parse::<f64>()
                .map_err(|_| ParseFailure::Invalid(format!("row {}: '{}' is not a number", row + 1, raw)))
        };
        spectrum.frequencies.push(value(freq_col)?);
        spectrum.powers.push(value(power_col)?);
    }

    if spectrum.len() < MIN_BINS {
        return Err(ParseFailure::Invalid(format!(
            "{} frequency bins, need at least {}",
            spectrum.len(),
            MIN_BINS
        )));
    }

    Ok(spectrum)
}

/// Most frequent axis length; ties go to the shorter axis.
fn common_axis_len(samples: &[RawSample]) -> Option<usize> {
    let mut counts: std::collections::BTreeMap<usize, usize> = std::collections::BTreeMap::new();
    for s in samples {
        *counts.entry(s.spectrum.len()).or_default() += 1;
    }
    let best = counts.values().copied().max()?;
    counts.into_iter().find(|(_, n)| *n == best).map(|(len, _)| len)
}

/// Load every spectrum under `root`, ordered by (group, name).
///
/// Unreadable files, files whose frequency axis length differs from the
/// library's common length, and repeated sample names are skipped with a
/// warning.
pub fn load_library(root: &Path, progress: bool) -> Result<Vec<RawSample>> {
    let files = discover(root);
    log::info!("Found {} spectrum file(s) under {}", files.len(), root.display());

    let pb = if progress && files.len() > 1 {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let parsed: Vec<Option<RawSample>> = files
        .par_iter()
        .map(|path| {
            let loaded = match (identify(path), read_spectrum(path)) {
                (Some((group, name)), Ok(spectrum)) => Some(RawSample {
                    name,
                    group,
                    path: path.clone(),
                    spectrum,
                }),
                (None, _) => {
                    log::warn!("Skipping {}: cannot derive group/name", path.display());
                    None
                }
                (_, Err(e)) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    None
                }
            };
            if let Some(ref pb) = pb {
                pb.inc(1);
            }
            loaded
        })
        .collect();

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let mut samples: Vec<RawSample> = parsed.into_iter().flatten().collect();
    samples.sort_by(|a, b| (&a.group, &a.name).cmp(&(&b.group, &b.name)));

    let Some(axis_len) = common_axis_len(&samples) else {
        return Err(Error::EmptyLibrary(root.to_path_buf()));
    };

    let mut seen = HashSet::new();
    samples.retain(|s| {
        if s.spectrum.len() != axis_len {
            log::warn!(
                "Skipping {}: {} bins, expected {}",
                s.path.display(),
                s.spectrum.len(),
                axis_len
            );
            return false;
        }
        if !seen.insert(s.name.clone()) {
            log::warn!("Skipping {}: sample name '{}' already loaded", s.path.display(), s.name);
            return false;
        }
        true
    });

    Ok(samples)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fmt::Write as _;

    pub fn spectrum_csv(bins: usize, level: f64) -> String {
        let mut out = String::from("Frequency (Hz),Power (dB)\n");
        for i in 0..bins {
            writeln!(out, "{:.4},{:.3}", (i + 1) as f64 * 21.533, level - i as f64 * 0.1).unwrap();
        }
        out
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("soundmap_loader_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn put(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    // ==========================================================================
    // PARSING
    // ==========================================================================

    #[test]
    fn test_parse_comma_export() {
        let spectrum = parse_spectrum(&spectrum_csv(64, -20.0)).unwrap();
        assert_eq!(spectrum.len(), 64);
        assert!((spectrum.frequencies[0] - 21.533).abs() < 1e-9);
        assert!((spectrum.powers[1] - -20.1).abs() < 1e-9);
    }

    #[test]
    fn test_parse_tab_export_with_level_column() {
        let mut text = String::from("Frequency (Hz)\tLevel (dB)\n");
        for i in 0..MIN_BINS {
            writeln!(text, "{}\t{}", i * 20 + 20, -30).unwrap();
        }
        let spectrum = parse_spectrum(&text).unwrap();
        assert_eq!(spectrum.len(), MIN_BINS);
        assert_eq!(spectrum.powers[0], -30.0);
    }

    #[test]
    fn test_parse_rejects_short_spectrum() {
        let err = parse_spectrum(&spectrum_csv(MIN_BINS - 1, 0.0)).unwrap_err();
        assert!(matches!(err, ParseFailure::Invalid(_)));
    }

    #[test]
    fn test_parse_rejects_missing_column() {
        let err = parse_spectrum("Frequency (Hz),Phase\n1,2\n").unwrap_err();
        assert!(matches!(err, ParseFailure::Invalid(ref m) if m.contains("power")));
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        let mut text = spectrum_csv(MIN_BINS, 0.0);
        text.push_str("oops,1\n");
        assert!(parse_spectrum(&text).is_err());
    }

    #[test]
    fn test_identify() {
        let (group, name) = identify(Path::new("/csv/ONII-CHAN Lead/bright lead.csv")).unwrap();
        assert_eq!(group, "ONII-CHAN Lead");
        assert_eq!(name, "bright lead");
    }

    // ==========================================================================
    // LIBRARY LOADING
    // ==========================================================================

    #[test]
    fn test_load_library_orders_and_filters() {
        let root = scratch("library");
        put(&root, "OSC/b.csv", &spectrum_csv(64, 0.0));
        put(&root, "OSC/a.csv", &spectrum_csv(64, 0.0));
        put(&root, "Leads/z.csv", &spectrum_csv(64, 0.0));
        put(&root, "Leads/short.csv", &spectrum_csv(60, 0.0)); // wrong axis length
        put(&root, "Sample/a.csv", &spectrum_csv(64, 0.0)); // duplicate name
        put(&root, "Sample/broken.csv", "not,a,spectrum\n");
        put(&root, "Sample/readme.txt", "ignored");

        let samples = load_library(&root, false).unwrap();
        let ids: Vec<(String, String)> = samples.iter().map(|s| (s.group.clone(), s.name.clone())).collect();
        assert_eq!(
            ids,
            vec![
                ("Leads".to_string(), "z".to_string()),
                ("OSC".to_string(), "a".to_string()),
                ("OSC".to_string(), "b".to_string()),
            ]
        );
        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_empty_library_is_an_error() {
        let root = scratch("empty");
        let err = load_library(&root, false).unwrap_err();
        assert!(matches!(err, Error::EmptyLibrary(_)));
        std::fs::remove_dir_all(&root).ok();
    }
}
