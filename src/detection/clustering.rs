//! Two-cluster k-means on the month circle.
//!
//! Days of the month are placed on a unit circle (`day / 29 * 2π`) so that the
//! end of one month sits next to the start of the following one. Initialization
//! is k-means++, driven by a caller-supplied random source.

use std::f64::consts::TAU;

use rand::Rng;

use crate::schedule::params::MONTH_CIRCLE_DAYS;

const CLUSTERS: usize = 2;
const EPSILON: f64 = 1e-12;

/// One assignment of points to two clusters.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Cluster label (0 or 1) per input point; the first point is always in cluster 0.
    pub labels: Vec<usize>,
    /// Sum of squared chord distances from points to their centroid.
    pub inertia: f64,
}

impl Partition {
    /// Indices of the points in `cluster`.
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, label)| **label == cluster)
            .map(|(idx, _)| idx)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    x: f64,
    y: f64,
}

impl Point {
    fn from_day(day: u32) -> Self {
        let angle = day as f64 / MONTH_CIRCLE_DAYS as f64 * TAU;
        Point {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    fn distance_sq(self, other: Point) -> f64 {
        (self.x - other.x).powi(2) + (self.y - other.y).powi(2)
    }
}

/// Runs `restarts` independent clusterings and returns the distinct partitions,
/// best (lowest inertia) first. Empty when the days cannot be split in two.
pub fn ranked_partitions<R: Rng + ?Sized>(
    days: &[u32],
    restarts: usize,
    max_iterations: usize,
    rng: &mut R,
) -> Vec<Partition> {
    let mut partitions: Vec<Partition> = Vec::new();
    for _ in 0..restarts.max(1) {
        if let Some(partition) = two_means(days, max_iterations, rng) {
            if !partitions.iter().any(|p| p.labels == partition.labels) {
                partitions.push(partition);
            }
        }
    }
    partitions.sort_by(|a, b| a.inertia.total_cmp(&b.inertia));
    partitions
}

/// Single k-means run with k = 2 on circular coordinates.
pub fn two_means<R: Rng + ?Sized>(
    days: &[u32],
    max_iterations: usize,
    rng: &mut R,
) -> Option<Partition> {
    let points: Vec<Point> = days.iter().map(|day| Point::from_day(*day)).collect();
    let mut centroids = initial_centroids(&points, rng)?;
    let mut labels = vec![usize::MAX; points.len()];

    for _ in 0..max_iterations.max(1) {
        let mut changed = false;
        for (idx, point) in points.iter().enumerate() {
            let nearest = nearest_centroid(*point, &centroids);
            if labels[idx] != nearest {
                labels[idx] = nearest;
                changed = true;
            }
        }
        if !changed {
            break;
        }
        centroids = recompute_centroids(&points, &labels, &centroids);
    }

    if (0..CLUSTERS).any(|cluster| !labels.contains(&cluster)) {
        return None;
    }
    let inertia: f64 = points
        .iter()
        .zip(&labels)
        .map(|(point, label)| point.distance_sq(centroids[*label]))
        .sum();
    if labels[0] != 0 {
        for label in labels.iter_mut() {
            *label = 1 - *label;
        }
    }
    Some(Partition { labels, inertia })
}

/// k-means++ seeding: a uniformly random first centroid, then a second drawn with
/// probability proportional to squared distance from the first.
fn initial_centroids<R: Rng + ?Sized>(points: &[Point], rng: &mut R) -> Option<[Point; CLUSTERS]> {
    if points.len() < CLUSTERS {
        return None;
    }
    let first = points[rng.gen_range(0..points.len())];
    let weights: Vec<f64> = points.iter().map(|p| p.distance_sq(first)).collect();
    let total: f64 = weights.iter().sum();
    if total <= EPSILON {
        return None;
    }

    let target = rng.gen::<f64>() * total;
    let mut cumulative = 0.0;
    let mut second = None;
    for (point, weight) in points.iter().zip(&weights) {
        if *weight <= EPSILON {
            continue;
        }
        cumulative += weight;
        second = Some(*point);
        if cumulative > target {
            break;
        }
    }
    Some([first, second?])
}

fn nearest_centroid(point: Point, centroids: &[Point; CLUSTERS]) -> usize {
    if point.distance_sq(centroids[1]) < point.distance_sq(centroids[0]) {
        1
    } else {
        0
    }
}

/// Mean direction of each cluster, projected back onto the circle. A cluster whose
/// members cancel out (or that is empty) keeps its previous centroid.
fn recompute_centroids(
    points: &[Point],
    labels: &[usize],
    previous: &[Point; CLUSTERS],
) -> [Point; CLUSTERS] {
    let mut next = *previous;
    for (cluster, centroid) in next.iter_mut().enumerate() {
        let (sum_x, sum_y) = points
            .iter()
            .zip(labels)
            .filter(|(_, label)| **label == cluster)
            .fold((0.0, 0.0), |(x, y), (p, _)| (x + p.x, y + p.y));
        let norm = (sum_x * sum_x + sum_y * sum_y).sqrt();
        if norm > EPSILON {
            *centroid = Point {
                x: sum_x / norm,
                y: sum_y / norm,
            };
        }
    }
    next
}
