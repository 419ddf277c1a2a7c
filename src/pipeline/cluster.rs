//! k-means over the 2-D embedding (k-means++ seeding, Lloyd iterations)

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Cluster id per input point.
    pub labels: Vec<usize>,
    /// One centroid per cluster id.
    pub centroids: Vec<[f64; 2]>,
}

impl Clustering {
    pub fn member_count(&self, id: usize) -> usize {
        self.labels.iter().filter(|&&l| l == id).count()
    }
}

pub const DEFAULT_MAX_ITER: usize = 300;

fn sq_dist(a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)
}

/// Nearest centroid; ties go to the lower id.
fn nearest(point: [f64; 2], centroids: &[[f64; 2]]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (id, &c) in centroids.iter().enumerate() {
        let d = sq_dist(point, c);
        if d < best_dist {
            best = id;
            best_dist = d;
        }
    }
    best
}

fn seed_centroids(points: &[[f64; 2]], k: usize, rng: &mut StdRng) -> Vec<[f64; 2]> {
    let n = points.len();
    let mut chosen = vec![rng.random_range(0..n)];
    let mut dist: Vec<f64> = points.iter().map(|&p| sq_dist(p, points[chosen[0]])).collect();

    while chosen.len() < k {
        let total: f64 = dist.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.random::<f64>() * total;
            let mut pick = n - 1;
            for (i, &d) in dist.iter().enumerate() {
                if target < d {
                    pick = i;
                    break;
                }
                target -= d;
            }
            pick
        } else {
            // every remaining point coincides with a centroid
            (0..n).find(|i| !chosen.contains(i)).unwrap_or(0)
        };
        chosen.push(next);
        for (d, &p) in dist.iter_mut().zip(points) {
            *d = d.min(sq_dist(p, points[next]));
        }
    }

    chosen.into_iter().map(|i| points[i]).collect()
}

/// Partition `points` into `k` clusters. `k` is clamped to the number of
/// points. An emptied cluster keeps its previous centroid.
pub fn kmeans(points: &[[f64; 2]], k: usize, seed: u64, max_iter: usize) -> Clustering {
    let k = k.min(points.len());
    if k == 0 {
        return Clustering { labels: vec![0; points.len()], centroids: Vec::new() };
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids = seed_centroids(points, k, &mut rng);
    let mut labels: Vec<usize> = points.iter().map(|&p| nearest(p, &centroids)).collect();

    for iter in 0..max_iter {
        let mut sums = vec![[0.0f64; 2]; k];
        let mut counts = vec![0usize; k];
        for (&p, &l) in points.iter().zip(&labels) {
            sums[l][0] += p[0];
            sums[l][1] += p[1];
            counts[l] += 1;
        }
        for id in 0..k {
            if counts[id] > 0 {
                centroids[id] = [sums[id][0] / counts[id] as f64, sums[id][1] / counts[id] as f64];
            }
        }

        let next: Vec<usize> = points.iter().map(|&p| nearest(p, &centroids)).collect();
        if next == labels {
            log::debug!("k-means converged after {} iteration(s)", iter + 1);
            break;
        }
        labels = next;
    }

    Clustering { labels, centroids }
}
