//! Exact t-SNE down to two dimensions
//!
//! O(n²) in time and memory, which is fine for sample libraries of a few
//! thousand entries. Pairwise work is spread over rayon.

use indicatif::ProgressBar;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct TsneParams {
    pub perplexity: f64,
    pub iterations: usize,
    pub early_exaggeration: f64,
    pub exaggeration_iters: usize,
    /// `None` picks `max(n / exaggeration / 4, 50)`.
    pub learning_rate: Option<f64>,
    pub seed: u64,
}

impl Default for TsneParams {
    fn default() -> Self {
        Self {
            perplexity: 30.0,
            iterations: 1000,
            early_exaggeration: 12.0,
            exaggeration_iters: 250,
            learning_rate: None,
            seed: 0,
        }
    }
}

const ENTROPY_TOLERANCE: f64 = 1e-5;
const MAX_BISECTION_STEPS: usize = 64;
const MIN_GAIN: f64 = 0.01;
const MIN_PROBABILITY: f64 = 1e-12;

/// Embed `data` (one row per sample) in two dimensions.
pub fn embed(data: &[Vec<f64>], params: &TsneParams, progress: Option<&ProgressBar>) -> Vec<[f64; 2]> {
    let n = data.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![[0.0, 0.0]];
    }

    let perplexity = effective_perplexity(params.perplexity, n);
    if perplexity != params.perplexity {
        log::debug!("Perplexity {} too large for {} samples, using {}", params.perplexity, n, perplexity);
    }

    let p = joint_probabilities(data, perplexity);
    let learning_rate = params
        .learning_rate
        .unwrap_or_else(|| (n as f64 / params.early_exaggeration / 4.0).max(50.0));

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut y: Vec<[f64; 2]> = (0..n)
        .map(|_| [gaussian(&mut rng) * 1e-4, gaussian(&mut rng) * 1e-4])
        .collect();
    let mut update = vec![[0.0f64; 2]; n];
    let mut gains = vec![[1.0f64; 2]; n];

    for iter in 0..params.iterations {
        let early = iter < params.exaggeration_iters;
        let exaggeration = if early { params.early_exaggeration } else { 1.0 };
        let momentum = if early { 0.5 } else { 0.8 };

        let grad = gradient(&p, &y, exaggeration);

        for i in 0..n {
            for d in 0..2 {
                let same_sign = (grad[i][d] > 0.0) == (update[i][d] > 0.0);
                gains[i][d] = if same_sign { gains[i][d] * 0.8 } else { gains[i][d] + 0.2 };
                gains[i][d] = gains[i][d].max(MIN_GAIN);
                update[i][d] = momentum * update[i][d] - learning_rate * gains[i][d] * grad[i][d];
                y[i][d] += update[i][d];
            }
        }
        recenter(&mut y);

        if let Some(pb) = progress {
            pb.set_position(iter as u64 + 1);
        }
    }

    y
}

/// Divide each axis by its largest absolute value, so points land in
/// [-1, 1] and at least one touches the edge on each axis.
pub fn scale_to_unit(points: &mut [[f64; 2]]) {
    for d in 0..2 {
        let max = points.iter().map(|p| p[d].abs()).fold(0.0, f64::max);
        if max > 0.0 {
            for p in points.iter_mut() {
                p[d] /= max;
            }
        }
    }
}

/// Perplexity must stay below (n - 1) / 3 for the bisection to make sense.
fn effective_perplexity(requested: f64, n: usize) -> f64 {
    let ceiling = ((n - 1) as f64 / 3.0).max(1.0);
    requested.clamp(1.0, ceiling)
}

fn squared_distances(data: &[Vec<f64>]) -> Vec<Vec<f64>> {
    (0..data.len())
        .into_par_iter()
        .map(|i| {
            data.iter()
                .map(|other| {
                    data[i]
                        .iter()
                        .zip(other)
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum()
                })
                .collect()
        })
        .collect()
}

/// Gaussian conditional probabilities p(j|i) with the bandwidth chosen by
/// bisection so the row entropy matches ln(perplexity).
fn conditional_row(dists: &[f64], i: usize, target_entropy: f64) -> Vec<f64> {
    let n = dists.len();
    let nearest = dists
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != i)
        .map(|(_, &d)| d)
        .fold(f64::INFINITY, f64::min);

    let mut beta = 1.0;
    let mut lo = 0.0;
    let mut hi = f64::INFINITY;
    let mut row = vec![0.0; n];

    for _ in 0..MAX_BISECTION_STEPS {
        let mut sum = 0.0;
        let mut weighted = 0.0;
        for j in 0..n {
            if j == i {
                row[j] = 0.0;
                continue;
            }
            // shifted by the nearest distance; entropy is unchanged
            let shifted = dists[j] - nearest;
            let p = (-shifted * beta).exp();
            row[j] = p;
            sum += p;
            weighted += shifted * p;
        }

        let entropy = sum.ln() + beta * weighted / sum;
        let diff = entropy - target_entropy;
        if diff.abs() < ENTROPY_TOLERANCE {
            break;
        }
        if diff > 0.0 {
            lo = beta;
            beta = if hi.is_infinite() { beta * 2.0 } else { (beta + hi) / 2.0 };
        } else {
            hi = beta;
            beta = (beta + lo) / 2.0;
        }
    }

    let sum: f64 = row.iter().sum();
    for p in row.iter_mut() {
        *p /= sum;
    }
    row
}

/// Symmetrized joint probabilities, flattened row-major.
fn joint_probabilities(data: &[Vec<f64>], perplexity: f64) -> Vec<f64> {
    let n = data.len();
    let dists = squared_distances(data);
    let target = perplexity.ln();

    let conditional: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| conditional_row(&dists[i], i, target))
        .collect();

    let mut p = vec![0.0; n * n];
    let norm = 2.0 * n as f64;
    for i in 0..n {
        for j in 0..n {
            if i != j {
                p[i * n + j] = ((conditional[i][j] + conditional[j][i]) / norm).max(MIN_PROBABILITY);
            }
        }
    }
    p
}

fn gradient(p: &[f64], y: &[[f64; 2]], exaggeration: f64) -> Vec<[f64; 2]> {
    let n = y.len();

    // Student-t kernel, row-major, zero diagonal
    let kernel: Vec<f64> = (0..n * n)
        .into_par_iter()
        .map(|idx| {
            let (i, j) = (idx / n, idx % n);
            if i == j {
                return 0.0;
            }
            let dx = y[i][0] - y[j][0];
            let dy = y[i][1] - y[j][1];
            1.0 / (1.0 + dx * dx + dy * dy)
        })
        .collect();
    // sequential sum keeps seeded runs bit-identical
    let z: f64 = kernel.iter().sum::<f64>().max(f64::MIN_POSITIVE);

    (0..n)
        .into_par_iter()
        .map(|i| {
            let mut g = [0.0; 2];
            for j in 0..n {
                if i == j {
                    continue;
                }
                let k = kernel[i * n + j];
                let force = (exaggeration * p[i * n + j] - k / z) * k;
                g[0] += force * (y[i][0] - y[j][0]);
                g[1] += force * (y[i][1] - y[j][1]);
            }
            [4.0 * g[0], 4.0 * g[1]]
        })
        .collect()
}

fn recenter(y: &mut [[f64; 2]]) {
    let n = y.len() as f64;
    let mean = y.iter().fold([0.0, 0.0], |acc, p| [acc[0] + p[0], acc[1] + p[1]]);
    let mean = [mean[0] / n, mean[1] / n];
    for p in y.iter_mut() {
        p[0] -= mean[0];
        p[1] -= mean[1];
    }
}

/// Standard normal via Box-Muller.
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
