//! # Behavioral Clustering Engine
//!
//! Groups session feature vectors into behavioral clusters with automatic
//! model-order selection.
//!
//! The pipeline inside [`ClusterEngine::cluster`]:
//!
//! 1. Standardize every dimension to zero mean / unit variance so that
//!    count-scale and ratio-scale features contribute comparably.
//! 2. For each candidate cluster count `k`, fit seeded k-means and score the
//!    partition with the mean silhouette coefficient.
//! 3. Keep the partition with the best silhouette (ties prefer smaller `k`),
//!    then map its centroids back to original units through the inverse of
//!    the standardization.
//!
//! Everything is deterministic for a fixed seed: initialization draws from a
//! seeded [`StdRng`], candidate fits are seeded independently of scheduling,
//! and ties break by index. Calling the engine twice on the same input
//! yields identical labels, centroids, and quality score.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use thiserror::Error;

use crate::config::AnalysisConfig;
use crate::features::{SessionFeatures, FEATURE_DIM, FEATURE_NAMES};

/// Failure modes of the cluster engine.
///
/// `InsufficientData` is the only condition callers must distinguish: it is
/// an informational state ("not enough sessions yet"), never a fault.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClusterError {
    #[error("not enough sessions to cluster: found {found}, need at least {required}")]
    InsufficientData { found: usize, required: usize },
}

/// Result of a successful clustering run.
#[derive(Debug, Clone)]
pub struct Clustering {
    /// Selected cluster count.
    pub k: usize,
    /// One label in `[0, k)` per input feature vector, in input order.
    pub labels: Vec<usize>,
    /// Mean silhouette coefficient of the selected partition, in [-1, 1].
    pub silhouette: f64,
    /// Cluster centers mapped back to original feature units.
    pub centroids: Vec<SessionFeatures>,
}

/// Per-dimension standardization fitted on the full feature set.
///
/// Retained so centroids can be mapped back to original units. A dimension
/// with zero variance gets its scale clamped to 1.0 and contributes its raw
/// offset unchanged.
#[derive(Debug, Clone)]
pub struct Standardizer {
    means: [f64; FEATURE_DIM],
    scales: [f64; FEATURE_DIM],
}

impl Standardizer {
    /// Fit means and standard deviations over `vectors`.
    pub fn fit(vectors: &[[f64; FEATURE_DIM]]) -> Self {
        let n = vectors.len() as f64;
        let mut means = [0.0; FEATURE_DIM];
        let mut scales = [0.0; FEATURE_DIM];

        for v in vectors {
            for d in 0..FEATURE_DIM {
                means[d] += v[d];
            }
        }
        for mean in &mut means {
            *mean /= n;
        }

        for v in vectors {
            for d in 0..FEATURE_DIM {
                scales[d] += (v[d] - means[d]).powi(2);
            }
        }
        for (d, scale) in scales.iter_mut().enumerate() {
            *scale = (*scale / n).sqrt();
            if *scale == 0.0 {
                warn!(
                    "Feature '{}' has zero variance; clamping scale to 1.0",
                    FEATURE_NAMES[d]
                );
                *scale = 1.0;
            }
        }

        Self { means, scales }
    }

    pub fn transform(&self, v: &[f64; FEATURE_DIM]) -> [f64; FEATURE_DIM] {
        let mut out = [0.0; FEATURE_DIM];
        for d in 0..FEATURE_DIM {
            out[d] = (v[d] - self.means[d]) / self.scales[d];
        }
        out
    }

    /// Map a point in standardized space back to original units.
    pub fn inverse_transform(&self, v: &[f64; FEATURE_DIM]) -> [f64; FEATURE_DIM] {
        let mut out = [0.0; FEATURE_DIM];
        for d in 0..FEATURE_DIM {
            out[d] = v[d] * self.scales[d] + self.means[d];
        }
        out
    }
}

/// A fitted k-means partition in standardized space.
#[derive(Debug, Clone)]
struct KMeansFit {
    labels: Vec<usize>,
    centroids: Vec<[f64; FEATURE_DIM]>,
}

fn distance_squared(a: &[f64; FEATURE_DIM], b: &[f64; FEATURE_DIM]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

fn distance(a: &[f64; FEATURE_DIM], b: &[f64; FEATURE_DIM]) -> f64 {
    distance_squared(a, b).sqrt()
}

/// k-means++ initialization from a seeded RNG.
///
/// The first centroid is drawn uniformly; each subsequent centroid is drawn
/// with probability proportional to squared distance from the nearest chosen
/// centroid. Duplicate points collapse the weights to zero, in which case the
/// first not-yet-chosen point is taken.
fn init_centroids(
    points: &[[f64; FEATURE_DIM]],
    k: usize,
    rng: &mut StdRng,
) -> Vec<[f64; FEATURE_DIM]> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..n)]);

    let mut min_distances = vec![f64::MAX; n];

    while centroids.len() < k {
        let last = *centroids.last().unwrap();
        for (i, point) in points.iter().enumerate() {
            let dist = distance_squared(point, &last);
            if dist < min_distances[i] {
                min_distances[i] = dist;
            }
        }

        let total: f64 = min_distances.iter().sum();
        if total > 0.0 {
            let mut target = rng.gen_range(0.0..total);
            let mut chosen = n - 1;
            for (i, &dist) in min_distances.iter().enumerate() {
                if target < dist {
                    chosen = i;
                    break;
                }
                target -= dist;
            }
            centroids.push(points[chosen]);
        } else {
            // All remaining points coincide with a centroid.
            let fallback = points
                .iter()
                .position(|p| !centroids.iter().any(|c| distance_squared(c, p) < 1e-12))
                .unwrap_or(0);
            centroids.push(points[fallback]);
        }
    }

    centroids
}

/// Assign each point to its nearest centroid. Ties break on the lower index.
fn assign(points: &[[f64; FEATURE_DIM]], centroids: &[[f64; FEATURE_DIM]]) -> Vec<usize> {
    points
        .iter()
        .map(|point| {
            let mut best = 0;
            let mut best_dist = f64::MAX;
            for (c, centroid) in centroids.iter().enumerate() {
                let dist = distance_squared(point, centroid);
                if dist < best_dist {
                    best_dist = dist;
                    best = c;
                }
            }
            best
        })
        .collect()
}

/// Recompute centroids as member means. Empty clusters are re-seeded with the
/// point farthest from its current centroid (lowest index on ties).
fn update_centroids(
    points: &[[f64; FEATURE_DIM]],
    labels: &[usize],
    k: usize,
) -> Vec<[f64; FEATURE_DIM]> {
    let mut sums = vec![[0.0; FEATURE_DIM]; k];
    let mut counts = vec![0usize; k];

    for (point, &label) in points.iter().zip(labels.iter()) {
        counts[label] += 1;
        for d in 0..FEATURE_DIM {
            sums[label][d] += point[d];
        }
    }

    let mut centroids: Vec<[f64; FEATURE_DIM]> = sums
        .iter()
        .zip(counts.iter())
        .map(|(sum, &count)| {
            let mut centroid = *sum;
            if count > 0 {
                for value in centroid.iter_mut() {
                    *value /= count as f64;
                }
            }
            centroid
        })
        .collect();

    for (c, &count) in counts.iter().enumerate() {
        if count == 0 {
            let farthest = points
                .iter()
                .enumerate()
                .max_by(|(i, a), (j, b)| {
                    let da = distance_squared(a, &centroids[labels[*i]]);
                    let db = distance_squared(b, &centroids[labels[*j]]);
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(i, _)| i)
                .unwrap_or(0);
            centroids[c] = points[farthest];
        }
    }

    centroids
}

/// Lloyd iterations from a seeded initialization.
fn fit_kmeans(
    points: &[[f64; FEATURE_DIM]],
    k: usize,
    seed: u64,
    max_iterations: usize,
) -> KMeansFit {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids = init_centroids(points, k, &mut rng);
    let mut labels = assign(points, &centroids);

    for _ in 0..max_iterations {
        centroids = update_centroids(points, &labels, k);
        let next = assign(points, &centroids);
        if next == labels {
            break;
        }
        labels = next;
    }

    KMeansFit { labels, centroids }
}

/// Mean silhouette coefficient over all points.
///
/// For each point: `a` = mean distance to the rest of its own cluster, `b` =
/// lowest mean distance to any other cluster, `s = (b - a) / max(a, b)`.
/// Singleton-cluster points score 0 by convention.
fn mean_silhouette(points: &[[f64; FEATURE_DIM]], labels: &[usize], k: usize) -> f64 {
    let n = points.len();
    let mut cluster_sizes = vec![0usize; k];
    for &label in labels {
        cluster_sizes[label] += 1;
    }

    let mut total = 0.0;
    for (i, point) in points.iter().enumerate() {
        let own = labels[i];
        if cluster_sizes[own] <= 1 {
            continue; // contributes 0
        }

        let mut sums = vec![0.0; k];
        for (j, other) in points.iter().enumerate() {
            if i != j {
                sums[labels[j]] += distance(point, other);
            }
        }

        let a = sums[own] / (cluster_sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && cluster_sizes[c] > 0)
            .map(|c| sums[c] / cluster_sizes[c] as f64)
            .fold(f64::MAX, f64::min);

        if b < f64::MAX {
            let denom = a.max(b);
            if denom > 0.0 {
                total += (b - a) / denom;
            }
        }
    }

    total / n as f64
}

/// Stateless clustering engine; recomputes from the full feature set on every
/// invocation.
#[derive(Debug, Clone)]
pub struct ClusterEngine {
    config: AnalysisConfig,
}

impl ClusterEngine {
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Candidate cluster counts for `n` sessions: `2..=min(cap, n / 10)`,
    /// never dropping below a top candidate of 2 once the minimum session
    /// count is met.
    fn candidate_range(&self, n: usize) -> std::ops::RangeInclusive<usize> {
        let k_max = (n / 10).min(self.config.max_clusters).max(2);
        2..=k_max
    }

    /// Normalize, search candidate cluster counts, and return the best
    /// partition with denormalized centroids.
    ///
    /// # Errors
    ///
    /// [`ClusterError::InsufficientData`] when fewer than the configured
    /// minimum number of sessions is supplied. This is the only failure the
    /// engine reports; numerical degeneracies are recovered internally.
    pub fn cluster(&self, features: &[SessionFeatures]) -> Result<Clustering, ClusterError> {
        let n = features.len();
        let required = self.config.min_sessions_for_clustering;
        if n < required {
            debug!("Clustering skipped: {n} sessions, need {required}");
            return Err(ClusterError::InsufficientData { found: n, required });
        }

        let raw: Vec<[f64; FEATURE_DIM]> = features.iter().map(SessionFeatures::to_vector).collect();
        let standardizer = Standardizer::fit(&raw);
        let points: Vec<[f64; FEATURE_DIM]> =
            raw.iter().map(|v| standardizer.transform(v)).collect();

        // Each candidate seeds its own RNG, so parallel scheduling cannot
        // affect the outcome.
        let candidates: Vec<(usize, KMeansFit, f64)> = self
            .candidate_range(n)
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|k| {
                let seed = self.config.kmeans_seed.wrapping_add(k as u64);
                let fit = fit_kmeans(&points, k, seed, self.config.kmeans_max_iterations);
                let score = mean_silhouette(&points, &fit.labels, k);
                (k, fit, score)
            })
            .collect();

        // Best silhouette wins; strict comparison over ascending k prefers
        // the smaller count on ties.
        let (k, fit, silhouette) = candidates
            .into_iter()
            .reduce(|best, candidate| if candidate.2 > best.2 { candidate } else { best })
            .expect("candidate range is never empty");

        if silhouette <= 0.0 {
            warn!("Weak cluster structure: mean silhouette {silhouette:.3}");
        }
        info!("Selected k={k} with mean silhouette {silhouette:.3} over {n} sessions");

        let centroids = fit
            .centroids
            .iter()
            .map(|c| SessionFeatures::from_vector(&standardizer.inverse_transform(c)))
            .collect();

        Ok(Clustering {
            k,
            labels: fit.labels,
            silhouette,
            centroids,
        })
    }
}
