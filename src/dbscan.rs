use std::collections::VecDeque;

use itertools::Itertools;
use rstar::{primitives::GeomWithData, RTree};

/// Density based clustering of planar points.
///
/// A point is a core point when at least `min_samples` points (itself included) lie
/// within `eps`. Points are visited in input order and clusters are numbered from 0
/// in the order their first core point is met, so labelling is reproducible.
#[derive(Debug, Clone, Copy)]
pub struct Dbscan {
    pub eps: f64,
    pub min_samples: usize,
}

/// Cluster assignment per input point; `None` marks noise.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    labels: Vec<Option<usize>>,
    cluster_count: usize,
}

impl Dbscan {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }

    pub fn fit(&self, points: &[[f64; 2]]) -> Clustering {
        let n = points.len();
        let mut labels: Vec<Option<usize>> = vec![None; n];
        if n == 0 {
            return Clustering {
                labels,
                cluster_count: 0,
            };
        }

        let tree = RTree::bulk_load(
            points
                .iter()
                .enumerate()
                .map(|(i, p)| GeomWithData::new(*p, i))
                .collect(),
        );
        let eps2 = self.eps * self.eps;
        let neighbors = |i: usize| -> Vec<usize> {
            tree.locate_within_distance(points[i], eps2)
                .map(|e| e.data)
                .sorted_unstable()
                .collect()
        };

        let mut visited = vec![false; n];
        let mut cluster = 0;
        for i in 0..n {
            if visited[i] {
                continue;
            }
            visited[i] = true;
            let seeds = neighbors(i);
            if seeds.len() < self.min_samples {
                continue;
            }

            labels[i] = Some(cluster);
            let mut queue: VecDeque<usize> = seeds.into_iter().collect();
            while let Some(j) = queue.pop_front() {
                if labels[j].is_none() {
                    // border points reached from a core point join the cluster
                    labels[j] = Some(cluster);
                }
                if visited[j] {
                    continue;
                }
                visited[j] = true;
                let expansion = neighbors(j);
                if expansion.len() >= self.min_samples {
                    // noise seen earlier is still reachable as a border point
                    queue.extend(
                        expansion
                            .into_iter()
                            .filter(|&k| !visited[k] || labels[k].is_none()),
                    );
                }
            }
            cluster += 1;
        }

        Clustering {
            labels,
            cluster_count: cluster,
        }
    }
}

impl Clustering {
    pub fn labels(&self) -> &[Option<usize>] {
        &self.labels
    }

    pub fn cluster_count(&self) -> usize {
        self.cluster_count
    }

    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_none()).count()
    }

    /// The most populated cluster, lowest id on equal counts.
    pub fn largest_cluster(&self) -> Option<usize> {
        let mut counts = vec![0usize; self.cluster_count];
        for label in self.labels.iter().flatten() {
            counts[*label] += 1;
        }
        counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .fold(None, |best: Option<(usize, usize)>, (id, &c)| match best {
                Some((_, bc)) if bc >= c => best,
                _ => Some((id, c)),
            })
            .map(|(id, _)| id)
    }

    /// Input indices belonging to `cluster`, in input order.
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == Some(cluster))
            .map(|(i, _)| i)
            .collect()
    }
}
