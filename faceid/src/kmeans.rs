use std::collections::BTreeMap;

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::similarity::euclidean_sq;
use crate::store::RetainedFace;

/// Raw output of [`kmeans`].
#[derive(Debug, Clone)]
pub(crate) struct KMeans {
    /// Centroid index for each input point.
    pub labels: Vec<usize>,
    /// Final centroids, in initialization order.
    pub centroids: Vec<Vec<f32>>,
    /// Number of assign/update rounds that ran.
    pub iterations: usize,
    /// True if a round left every centroid unchanged.
    pub converged: bool,
}

/// Runs Lloyd's k-means with Euclidean distance.
///
/// The effective `k` is `min(k, points.len())`. Initial centroids are `k`
/// distinct points drawn uniformly without replacement, so the result depends
/// on `rng`. Ties in assignment go to the lower centroid index. Empty
/// clusters keep their previous centroid. Iteration stops once a round
/// changes no centroid coordinate, or after `max_iterations` rounds.
///
/// All points must have the same dimension; [`ClusterEngine`] only feeds it
/// faces from one [`crate::EmbeddingStore`], which enforces that.
pub(crate) fn kmeans<P, R>(points: &[P], k: usize, max_iterations: usize, rng: &mut R) -> KMeans
where
    P: AsRef<[f32]>,
    R: Rng + ?Sized,
{
    let n = points.len();
    let k = k.min(n);
    if k == 0 {
        return KMeans {
            labels: Vec::new(),
            centroids: Vec::new(),
            iterations: 0,
            converged: true,
        };
    }

    let mut centroids: Vec<Vec<f32>> = rand::seq::index::sample(rng, n, k)
        .iter()
        .map(|i| points[i].as_ref().to_vec())
        .collect();
    let dim = centroids[0].len();
    debug_assert!(points.iter().all(|p| p.as_ref().len() == dim));

    let mut labels = vec![0usize; n];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iterations {
        iterations += 1;
        assign(points, &centroids, &mut labels);
        if !update(points, &labels, &mut centroids) {
            converged = true;
            break;
        }
    }

    if iterations == 0 {
        assign(points, &centroids, &mut labels);
    }

    KMeans {
        labels,
        centroids,
        iterations,
        converged,
    }
}

/// Moves every centroid to the mean of its members; a centroid without
/// members stays where it is. Returns true if any coordinate changed.
fn update<P: AsRef<[f32]>>(points: &[P], labels: &[usize], centroids: &mut [Vec<f32>]) -> bool {
    let k = centroids.len();
    let dim = centroids.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0f64; dim]; k];
    let mut counts = vec![0usize; k];
    for (p, &c) in points.iter().zip(labels) {
        counts[c] += 1;
        for (s, &x) in sums[c].iter_mut().zip(p.as_ref()) {
            *s += x as f64;
        }
    }

    let mut changed = false;
    for c in 0..k {
        if counts[c] == 0 {
            continue;
        }
        let count = counts[c] as f64;
        let next: Vec<f32> = sums[c].iter().map(|&s| (s / count) as f32).collect();
        if next != centroids[c] {
            centroids[c] = next;
            changed = true;
        }
    }
    changed
}

fn assign<P: AsRef<[f32]>>(points: &[P], centroids: &[Vec<f32>], labels: &mut [usize]) {
    for (label, p) in labels.iter_mut().zip(points) {
        *label = nearest(centroids, p.as_ref());
    }
}

/// Index of the closest centroid; the first one wins ties.
fn nearest(centroids: &[Vec<f32>], p: &[f32]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = euclidean_sq(p, c);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// One group of faces produced by a clustering run.
#[derive(Debug, Clone)]
pub struct Cluster {
    /// Run-scoped id in `0..k`. Not a stable person id across runs.
    pub id: u32,
    pub centroid: Vec<f32>,
    /// Sequence numbers of the member faces, in snapshot order.
    pub members: Vec<u64>,
    /// The member closest to the centroid.
    pub representative: RetainedFace,
}

impl Cluster {
    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// Result of [`ClusterEngine::cluster`]. Empty clusters are not included.
#[derive(Debug, Clone, Default)]
pub struct Clustering {
    pub clusters: Vec<Cluster>,
    /// Number of faces that were clustered.
    pub points: usize,
    pub iterations: usize,
    pub converged: bool,
}

impl Clustering {
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter()
    }

    pub fn get(&self, id: u32) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.id == id)
    }

    /// Cluster id to representative image, the input of the persistence gate.
    pub fn representatives(&self) -> BTreeMap<u32, Bytes> {
        self.clusters
            .iter()
            .map(|c| (c.id, c.representative.image.clone()))
            .collect()
    }
}

/// Groups retained faces with k-means and picks one representative each.
#[derive(Debug, Clone)]
pub struct ClusterEngine {
    k: usize,
    max_iterations: usize,
    seed: Option<u64>,
}

impl Default for ClusterEngine {
    fn default() -> Self {
        Self::new(5, 100)
    }
}

impl ClusterEngine {
    pub fn new(k: usize, max_iterations: usize) -> Self {
        Self {
            k,
            max_iterations,
            seed: None,
        }
    }

    /// Fixes the initialization seed; every run then yields the same result
    /// for the same input.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Clusters `faces` using the configured seed, or fresh entropy.
    pub fn cluster(&self, faces: &[RetainedFace]) -> Clustering {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.cluster_with_rng(faces, &mut rng)
    }

    /// Clusters `faces` drawing initial centroids from `rng`.
    pub fn cluster_with_rng<R: Rng + ?Sized>(&self, faces: &[RetainedFace], rng: &mut R) -> Clustering {
        if faces.is_empty() {
            return Clustering::default();
        }

        let km = kmeans(faces, self.k, self.max_iterations, rng);

        let mut clusters = Vec::with_capacity(km.centroids.len());
        for (c, centroid) in km.centroids.into_iter().enumerate() {
            let mut members = Vec::new();
            let mut best: Option<(usize, f64)> = None;
            for (i, face) in faces.iter().enumerate() {
                if km.labels[i] != c {
                    continue;
                }
                members.push(face.seq);
                let d = euclidean_sq(face.embedding.as_slice(), &centroid);
                if best.is_none_or(|(_, bd)| d < bd) {
                    best = Some((i, d));
                }
            }
            let Some((rep, _)) = best else {
                continue;
            };
            clusters.push(Cluster {
                id: c as u32,
                centroid,
                members,
                representative: faces[rep].clone(),
            });
        }

        debug!(
            points = faces.len(),
            clusters = clusters.len(),
            iterations = km.iterations,
            converged = km.converged,
            "faceid: k-means finished"
        );

        Clustering {
            clusters,
            points: faces.len(),
            iterations: km.iterations,
            converged: km.converged,
        }
    }
}
