//! Bagged regression-tree ensemble.
//!
//! Model:
//! - Each tree is fit on a bootstrap sample (draw `n` rows with replacement).
//! - Splits maximize variance reduction over the distinct values of a feature.
//! - The point prediction is the mean across trees; the spread across trees is
//!   the uncertainty measure used for forecast confidence.
//!
//! Every encoded feature has a small discrete domain (codes, weekday, month,
//! multiplier, flag), so split search is a histogram scan per node and fitting
//! stays linear in the number of rows per tree level.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use bloodline_core::{DomainError, DomainResult};

use crate::features::{FEATURE_COUNT, FeatureVector};

/// Ensemble hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    /// Nodes with fewer rows become leaves.
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 50,
            max_depth: 10,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

impl ForestParams {
    pub fn with_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> DomainResult<()> {
        if self.n_trees == 0 {
            return Err(DomainError::validation("n_trees must be >= 1"));
        }
        if self.max_depth == 0 {
            return Err(DomainError::validation("max_depth must be >= 1"));
        }
        if self.min_samples_split < 2 {
            return Err(DomainError::validation("min_samples_split must be >= 2"));
        }
        Ok(())
    }
}

/// Mean and dispersion of the per-tree predictions for one input.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EnsemblePrediction {
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn predict(&self, x: &[f64; FEATURE_COUNT]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Trained ensemble. Immutable after `fit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn fit(xs: &[FeatureVector], ys: &[f64], params: &ForestParams) -> DomainResult<Self> {
        params.validate()?;
        if xs.len() != ys.len() {
            return Err(DomainError::validation("feature and target lengths differ"));
        }
        if xs.is_empty() {
            return Err(DomainError::InsufficientData {
                available: 0,
                required: 1,
            });
        }
        if ys.iter().any(|y| !y.is_finite()) {
            return Err(DomainError::validation("targets must be finite"));
        }

        let data = BinnedData::new(xs, ys);
        let mut rng = StdRng::seed_from_u64(params.seed);
        let n = xs.len();

        let mut trees = Vec::with_capacity(params.n_trees);
        for _ in 0..params.n_trees {
            let mut sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut builder = TreeBuilder {
                data: &data,
                params,
                nodes: Vec::new(),
            };
            builder.build(&mut sample, 0);
            trees.push(RegressionTree {
                nodes: builder.nodes,
            });
        }

        Ok(Self { trees })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn predict(&self, x: &FeatureVector) -> EnsemblePrediction {
        let per_tree: Vec<f64> = self.trees.iter().map(|t| t.predict(x.values())).collect();
        let mean = mean(&per_tree);
        EnsemblePrediction {
            mean,
            std_dev: stddev_population(&per_tree, mean),
        }
    }
}

/// Training rows with each feature value replaced by its rank among the
/// feature's distinct values.
struct BinnedData {
    ys: Vec<f64>,
    bins: Vec<[u32; FEATURE_COUNT]>,
    levels: [Vec<f64>; FEATURE_COUNT],
}

impl BinnedData {
    fn new(xs: &[FeatureVector], ys: &[f64]) -> Self {
        let levels: [Vec<f64>; FEATURE_COUNT] = core::array::from_fn(|f| {
            let mut vals: Vec<f64> = xs.iter().map(|x| x.values()[f]).collect();
            vals.sort_by(f64::total_cmp);
            vals.dedup();
            vals
        });

        let bins = xs
            .iter()
            .map(|x| {
                core::array::from_fn(|f| {
                    let v = x.values()[f];
                    levels[f].partition_point(|l| *l < v) as u32
                })
            })
            .collect();

        Self {
            ys: ys.to_vec(),
            bins,
            levels,
        }
    }
}

struct TreeBuilder<'a> {
    data: &'a BinnedData,
    params: &'a ForestParams,
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    /// Rows with bin <= `bin` go left.
    bin: u32,
    score: f64,
}

impl TreeBuilder<'_> {
    fn build(&mut self, rows: &mut [usize], depth: usize) -> usize {
        let n = rows.len() as f64;
        let sum: f64 = rows.iter().map(|&i| self.data.ys[i]).sum();
        let value = sum / n;

        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { value });

        if depth >= self.params.max_depth || rows.len() < self.params.min_samples_split {
            return idx;
        }

        let Some(split) = self.best_split(rows, sum) else {
            return idx;
        };

        let mid = partition_in_place(rows, |&i| self.data.bins[i][split.feature] <= split.bin);
        let (left_rows, right_rows) = rows.split_at_mut(mid);

        let levels = &self.data.levels[split.feature];
        let threshold = (levels[split.bin as usize] + levels[split.bin as usize + 1]) / 2.0;

        let left = self.build(left_rows, depth + 1);
        let right = self.build(right_rows, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold,
            left,
            right,
        };
        idx
    }

    fn best_split(&self, rows: &[usize], total_sum: f64) -> Option<SplitCandidate> {
        let n = rows.len() as f64;
        // Maximizing sum_l^2/n_l + sum_r^2/n_r is equivalent to minimizing SSE.
        let parent_score = total_sum * total_sum / n;
        let mut best: Option<SplitCandidate> = None;

        for feature in 0..FEATURE_COUNT {
            let n_levels = self.data.levels[feature].len();
            if n_levels < 2 {
                continue;
            }

            let mut hist_sum = vec![0.0f64; n_levels];
            let mut hist_cnt = vec![0usize; n_levels];
            for &i in rows {
                let b = self.data.bins[i][feature] as usize;
                hist_sum[b] += self.data.ys[i];
                hist_cnt[b] += 1;
            }

            let mut left_sum = 0.0;
            let mut left_cnt = 0usize;
            for b in 0..n_levels - 1 {
                left_sum += hist_sum[b];
                left_cnt += hist_cnt[b];
                let right_cnt = rows.len() - left_cnt;
                if left_cnt == 0 || right_cnt == 0 {
                    continue;
                }
                let right_sum = total_sum - left_sum;
                let score = left_sum * left_sum / left_cnt as f64
                    + right_sum * right_sum / right_cnt as f64;

                let improves = score > parent_score + 1e-9 * parent_score.abs().max(1.0);
                let better = best.as_ref().is_none_or(|b| score > b.score);
                if improves && better {
                    best = Some(SplitCandidate {
                        feature,
                        bin: b as u32,
                        score,
                    });
                }
            }
        }

        best
    }
}

/// Stable-enough in-place partition; returns the number of rows satisfying `pred`.
fn partition_in_place<F>(rows: &mut [usize], pred: F) -> usize
where
    F: Fn(&usize) -> bool,
{
    let mut next = 0;
    for i in 0..rows.len() {
        if pred(&rows[i]) {
            rows.swap(next, i);
            next += 1;
        }
    }
    next
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / (xs.len() as f64)
}

/// Population standard deviation across ensemble members.
fn stddev_population(xs: &[f64], mean: f64) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let var = xs
        .iter()
        .map(|x| {
            let d = x - mean;
            d * d
        })
        .sum::<f64>()
        / (xs.len() as f64);
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv(a: f64, b: f64) -> FeatureVector {
        FeatureVector([a, b, 0.0, 1.0, 1.0, 0.0])
    }

    #[test]
    fn learns_a_step_function() {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for i in 0..200 {
            let a = (i % 4) as f64;
            xs.push(fv(a, 0.0));
            ys.push(if a < 2.0 { 10.0 } else { 50.0 });
        }

        let forest = RandomForest::fit(&xs, &ys, &ForestParams::default().with_trees(10)).unwrap();

        let low = forest.predict(&fv(1.0, 0.0));
        let high = forest.predict(&fv(3.0, 0.0));
        assert!((low.mean - 10.0).abs() < 1e-6, "low={low:?}");
        assert!((high.mean - 50.0).abs() < 1e-6, "high={high:?}");
        assert!(low.std_dev < 1e-6);
    }

    #[test]
    fn fitting_is_deterministic_for_a_seed() {
        let xs: Vec<FeatureVector> = (0..100).map(|i| fv((i % 7) as f64, (i % 3) as f64)).collect();
        let ys: Vec<f64> = (0..100).map(|i| ((i * 37) % 11) as f64).collect();
        let params = ForestParams::default().with_trees(5).with_seed(9);

        let a = RandomForest::fit(&xs, &ys, &params).unwrap();
        let b = RandomForest::fit(&xs, &ys, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn noisy_targets_produce_dispersion() {
        let xs: Vec<FeatureVector> = (0..60).map(|i| fv((i % 2) as f64, 0.0)).collect();
        let ys: Vec<f64> = (0..60).map(|i| ((i * 7919) % 23) as f64).collect();
        let forest = RandomForest::fit(&xs, &ys, &ForestParams::default().with_trees(20)).unwrap();
        assert!(forest.predict(&fv(0.0, 0.0)).std_dev > 0.0);
    }

    #[test]
    fn rejects_bad_input() {
        let params = ForestParams::default();
        assert!(RandomForest::fit(&[], &[], &params).is_err());
        assert!(RandomForest::fit(&[fv(0.0, 0.0)], &[1.0, 2.0], &params).is_err());
        assert!(RandomForest::fit(&[fv(0.0, 0.0)], &[1.0], &params.clone().with_trees(0)).is_err());
        assert!(RandomForest::fit(&[fv(0.0, 0.0)], &[f64::NAN], &params).is_err());
    }

    #[test]
    fn max_depth_bounds_the_tree() {
        let xs: Vec<FeatureVector> = (0..64).map(|i| fv(i as f64, 0.0)).collect();
        let ys: Vec<f64> = (0..64).map(|i| i as f64).collect();
        let forest =
            RandomForest::fit(&xs, &ys, &ForestParams::default().with_trees(1).with_max_depth(2)).unwrap();
        // depth 2 => at most 1 + 2 + 4 nodes
        assert!(forest.trees[0].nodes.len() <= 7);
    }
}
