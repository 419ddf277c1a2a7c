//! Offline feature pipeline
//!
//! Spectrum tables in, map coordinates out:
//!
//! 1. [`loader`] reads `<csv_dir>/<group>/<sample>.csv`
//! 2. [`features`] normalizes each spectrum and builds peak and band-count features
//! 3. the feature matrix is z-scored per column
//! 4. [`tsne`] embeds it in 2-D, scaled into [-1, 1] per axis
//! 5. [`cluster`] runs k-means on the embedding and adds one `Center` row per cluster
//!
//! [`spectral`] is the step before all this: turning audio into the tables.

pub mod cluster;
pub mod features;
pub mod loader;
pub mod spectral;
pub mod tsne;

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::Path;

use crate::catalog::CENTER;
use crate::config::PipelineSettings;
use crate::error::{Error, Result};
use crate::model::{SamplePoint, SpectrumTable};

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Sample rows in (group, name) order, then one center row per cluster.
    pub points: Vec<SamplePoint>,
    pub spectra: SpectrumTable,
    pub feature_names: Vec<String>,
    /// Z-scored feature matrix, rows aligned with the sample rows of `points`.
    pub features: Vec<Vec<f64>>,
    pub sample_count: usize,
    pub cluster_count: usize,
}

pub fn center_name(id: usize) -> String {
    format!("cluster_{}", id)
}

/// Run the whole pipeline on a directory of spectrum tables.
pub fn run(csv_dir: &Path, settings: &PipelineSettings, progress: bool) -> Result<PipelineOutput> {
    if settings.workers > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.workers)
            .build()
            .map_err(|e| Error::Config(format!("worker pool: {}", e)))?;
        return pool.install(|| run_inner(csv_dir, settings, progress));
    }
    run_inner(csv_dir, settings, progress)
}

fn run_inner(csv_dir: &Path, settings: &PipelineSettings, progress: bool) -> Result<PipelineOutput> {
    let samples = loader::load_library(csv_dir, progress)?;
    let sample_count = samples.len();
    log::info!("Loaded {} spectra", sample_count);

    // every sample shares the axis length checked by the loader
    let starts = features::band_starts(&samples[0].spectrum.frequencies);
    log::debug!("Band start bins: {:?}", starts);

    let mut matrix: Vec<Vec<f64>> = samples
        .par_iter()
        .map(|s| features::extract(&features::normalize_to_peaks(&s.spectrum.powers), &starts))
        .collect();
    features::zscore_columns(&mut matrix);

    let params = tsne::TsneParams {
        perplexity: settings.perplexity,
        iterations: settings.iterations,
        seed: settings.seed,
        ..tsne::TsneParams::default()
    };
    log::info!(
        "Embedding {} x {} features (perplexity {}, {} iterations)",
        sample_count,
        features::FEATURE_COUNT,
        params.perplexity,
        params.iterations
    );

    let pb = if progress {
        let pb = ProgressBar::new(params.iterations as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} t-SNE [{bar:40.cyan/blue}] {pos}/{len}")
                .unwrap()
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };
    let mut embedding = tsne::embed(&matrix, &params, pb.as_ref());
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    tsne::scale_to_unit(&mut embedding);

    let clustering = cluster::kmeans(&embedding, settings.clusters, settings.seed, cluster::DEFAULT_MAX_ITER);
    log::info!("Grouped samples into {} clusters", clustering.centroids.len());

    let mut points: Vec<SamplePoint> = samples
        .iter()
        .zip(&embedding)
        .zip(&clustering.labels)
        .map(|((s, xy), &label)| {
            // no centroids (k = 0) means no cluster to point at
            let cluster_id = (label < clustering.centroids.len()).then_some(label as i64);
            SamplePoint::new(&s.name, &s.group, xy[0], xy[1], cluster_id)
        })
        .collect();

    let mut cluster_count = 0;
    for (id, c) in clustering.centroids.iter().enumerate() {
        if clustering.member_count(id) == 0 {
            log::debug!("Cluster {} ended up empty, no center row", id);
            continue;
        }
        points.push(SamplePoint::new(&center_name(id), CENTER, c[0], c[1], Some(id as i64)));
        cluster_count += 1;
    }

    let spectra: SpectrumTable = samples.into_iter().map(|s| (s.name, s.spectrum)).collect();

    Ok(PipelineOutput {
        points,
        spectra,
        feature_names: features::feature_names(),
        features: matrix,
        sample_count,
        cluster_count,
    })
}
