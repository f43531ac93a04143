//! Isolation forest over a dense feature matrix.
//!
//! Trees are grown on subsamples drawn without replacement, splitting on a
//! random non-constant feature at a uniform random point between the
//! node's minimum and maximum. Raw scores follow the "lower = more
//! anomalous" convention; the label threshold is the contamination
//! percentile of the training scores.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ta_math::{average_path_length, height_limit, isolation_score, min_max, percentile};

use crate::detect::error::DetectError;

/// Forest hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_samples: usize,
    pub contamination: f64,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.01,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

/// One isolation tree stored as a flat node arena; node 0 is the root.
#[derive(Debug, Clone)]
pub struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn grow<R: Rng>(data: &[Vec<f64>], indices: Vec<usize>, limit: usize, rng: &mut R) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.build(data, indices, 0, limit, rng);
        tree
    }

    fn build<R: Rng>(
        &mut self,
        data: &[Vec<f64>],
        indices: Vec<usize>,
        depth: usize,
        limit: usize,
        rng: &mut R,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            size: indices.len(),
        });
        if depth >= limit || indices.len() <= 1 {
            return id;
        }

        let width = data[indices[0]].len();
        let splittable: Vec<(usize, f64, f64)> = (0..width)
            .filter_map(|feature| {
                let (lo, hi) = indices.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), &i| (lo.min(data[i][feature]), hi.max(data[i][feature])),
                );
                (hi > lo).then_some((feature, lo, hi))
            })
            .collect();
        // Every remaining point is identical: nothing left to isolate.
        if splittable.is_empty() {
            return id;
        }

        let (feature, lo, hi) = splittable[rng.random_range(0..splittable.len())];
        let threshold = rng.random_range(lo..hi);
        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| data[i][feature] <= threshold);

        let left = self.build(data, left, depth + 1, limit, rng);
        let right = self.build(data, right, depth + 1, limit, rng);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    /// Edges from the root to the leaf holding `row`, plus the expected
    /// depth of the unbuilt subtree below that leaf.
    pub fn path_length(&self, row: &[f64]) -> f64 {
        let mut node = 0;
        let mut depth = 0usize;
        loop {
            match self.nodes[node] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = row.get(feature).copied().unwrap_or(f64::NAN);
                    node = if value <= threshold { left } else { right };
                    depth += 1;
                }
                Node::Leaf { size } => return depth as f64 + average_path_length(size),
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// A fitted isolation forest.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    subsample_size: usize,
    offset: f64,
    reference_range: (f64, f64),
}

impl IsolationForest {
    /// Fit on `data`, one row per sample. Deterministic for a given seed
    /// and row order.
    pub fn fit(data: &[Vec<f64>], params: &ForestParams) -> Result<Self, DetectError> {
        if data.is_empty() || data[0].is_empty() {
            return Err(DetectError::EmptyFeatureSet);
        }

        let n = data.len();
        let subsample_size = params.max_samples.clamp(1, n);
        let limit = height_limit(subsample_size.max(2));
        let mut rng = StdRng::seed_from_u64(params.seed);

        let trees = (0..params.n_estimators.max(1))
            .map(|_| {
                let indices = rand::seq::index::sample(&mut rng, n, subsample_size).into_vec();
                IsolationTree::grow(data, indices, limit, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            subsample_size,
            offset: f64::NEG_INFINITY,
            reference_range: (0.0, 0.0),
        };
        let training = forest.score_samples(data);
        if let Some(offset) = percentile(&training, params.contamination) {
            forest.offset = offset;
        }
        if let Some(range) = min_max(&training) {
            forest.reference_range = range;
        }
        Ok(forest)
    }

    /// Raw score for one row; lower is more anomalous, always in `[-1, 0)`.
    pub fn score_row(&self, row: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.path_length(row)).sum();
        let mean = total / self.trees.len() as f64;
        isolation_score(mean, self.subsample_size)
    }

    pub fn score_samples(&self, data: &[Vec<f64>]) -> Vec<f64> {
        data.iter().map(|row| self.score_row(row)).collect()
    }

    /// The forest's own label: raw score strictly below the offset.
    pub fn is_outlier(&self, raw: f64) -> bool {
        raw < self.offset
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Lowest and highest raw score seen on the training set.
    pub fn reference_range(&self) -> (f64, f64) {
        self.reference_range
    }

    pub fn subsample_size(&self) -> usize {
        self.subsample_size
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }
}
