//! Spectrum extraction from audio files
//!
//! Produces the same table an editor's "Plot Spectrum" export gives: the
//! average magnitude over Hann-windowed 2048-point frames with 50% overlap,
//! one row per FFT bin from bin 1 up to Nyquist, in dB relative to a
//! full-scale sine.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::audio::decode_mono;
use crate::error::{Error, Result};
use crate::model::Spectrum;

pub const FFT_SIZE: usize = 2048;
const HOP_SIZE: usize = FFT_SIZE / 2;
const FLOOR_DB: f64 = -96.0;
const AUDIO_EXTENSIONS: &[&str] = &["wav", "flac", "mp3", "ogg", "aif", "aiff"];

fn hann_window(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / (size - 1) as f64).cos()))
        .collect()
}

fn to_db(value: f64) -> f64 {
    if value <= 0.0 {
        FLOOR_DB
    } else {
        (20.0 * value.log10()).max(FLOOR_DB)
    }
}

/// Average spectrum of a mono signal. Signals shorter than one frame are
/// zero-padded.
pub fn average_spectrum(samples: &[f64], sample_rate: u32) -> Spectrum {
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(FFT_SIZE);
    let window = hann_window(FFT_SIZE);
    let bins = FFT_SIZE / 2;

    let frame_count = if samples.len() <= FFT_SIZE {
        1
    } else {
        (samples.len() - FFT_SIZE) / HOP_SIZE + 1
    };

    let mut magnitudes = vec![0.0f64; bins];
    for frame in 0..frame_count {
        let start = frame * HOP_SIZE;
        let mut buffer: Vec<Complex<f64>> = (0..FFT_SIZE)
            .map(|i| {
                let s = samples.get(start + i).copied().unwrap_or(0.0);
                Complex::new(s * window[i], 0.0)
            })
            .collect();
        fft.process(&mut buffer);
        for (k, m) in magnitudes.iter_mut().enumerate() {
            *m += buffer[k + 1].norm();
        }
    }

    // a full-scale sine peaks at sum(window) / 2
    let scale = 2.0 / window.iter().sum::<f64>() / frame_count as f64;
    let bin_hz = sample_rate as f64 / FFT_SIZE as f64;

    Spectrum {
        frequencies: (1..=bins).map(|k| k as f64 * bin_hz).collect(),
        powers: magnitudes.iter().map(|&m| to_db(m * scale)).collect(),
    }
}

pub fn extract_file(path: &Path) -> Result<Spectrum> {
    let data = std::fs::read(path)?;
    let (samples, sample_rate) = decode_mono(&data, None).ok_or_else(|| Error::InvalidSpectrum {
        path: path.to_path_buf(),
        reason: "could not decode audio".into(),
    })?;
    if samples.is_empty() {
        return Err(Error::InvalidSpectrum {
            path: path.to_path_buf(),
            reason: "no audio samples".into(),
        });
    }
    Ok(average_spectrum(&samples, sample_rate))
}

pub fn write_spectrum_csv(path: &Path, spectrum: &Spectrum) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Frequency (Hz)", "Power (dB)"])?;
    for (f, p) in spectrum.frequencies.iter().zip(&spectrum.powers) {
        writer.write_record([format!("{:.6}", f), format!("{:.6}", p)])?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    pub written: usize,
    pub failed: usize,
}

fn is_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.iter().any(|a| e.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

/// Extract `<sound_dir>/<group>/<name>.<ext>` into `<csv_dir>/<group>/<name>.csv`.
pub fn extract_library(sound_dir: &Path, csv_dir: &Path, progress: bool) -> Result<ExtractSummary> {
    let mut jobs: Vec<(PathBuf, PathBuf)> = WalkDir::new(sound_dir)
        .min_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_audio(e.path()))
        .filter_map(|e| {
            let rel = e.path().strip_prefix(sound_dir).ok()?.with_extension("csv");
            Some((e.path().to_path_buf(), csv_dir.join(rel)))
        })
        .collect();
    jobs.sort();

    if jobs.is_empty() {
        return Err(Error::EmptyLibrary(sound_dir.to_path_buf()));
    }
    log::info!("Extracting spectra for {} audio file(s)", jobs.len());

    let pb = if progress {
        let pb = ProgressBar::new(jobs.len() as u64);
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

    let results: Vec<bool> = jobs
        .par_iter()
        .map(|(audio, csv_path)| {
            let ok = match extract_file(audio).and_then(|s| write_spectrum_csv(csv_path, &s)) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("{}: {}", audio.display(), e);
                    false
                }
            };
            if let Some(ref pb) = pb {
                pb.inc(1);
            }
            ok
        })
        .collect();

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let written = results.iter().filter(|&&ok| ok).count();
    Ok(ExtractSummary { written, failed: results.len() - written })
}
