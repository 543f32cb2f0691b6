//! Gradient-boosted regression trees on a single feature.
//!
//! With one feature every leaf covers a contiguous run of the sorted
//! samples, so a tree is a step function described by its thresholds.
//! Trees grow leaf-wise: the leaf with the largest second-order gain is
//! split next until the leaf budget is spent or no split gains.

use super::{require_non_negative, Regressor};
use crate::error::Result;
use crate::utils::stats::mean;
use std::ops::Range;

/// Loss minimised by boosting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoostingLoss {
    Squared,
    /// Tweedie deviance with power `rho` in (1, 2) and a log link.
    Tweedie { rho: f64 },
}

impl BoostingLoss {
    fn initial_score(self, y: &[f64]) -> f64 {
        match self {
            BoostingLoss::Squared => mean(y),
            BoostingLoss::Tweedie { .. } => mean(y).max(1e-8).ln(),
        }
    }

    /// Gradient and hessian of the loss at raw score `f`.
    fn derivatives(self, f: f64, y: f64) -> (f64, f64) {
        match self {
            BoostingLoss::Squared => (f - y, 1.0),
            BoostingLoss::Tweedie { rho } => {
                let a = ((1.0 - rho) * f).exp();
                let b = ((2.0 - rho) * f).exp();
                (-y * a + b, -(1.0 - rho) * y * a + (2.0 - rho) * b)
            }
        }
    }

    fn output(self, f: f64) -> f64 {
        match self {
            BoostingLoss::Squared => f,
            BoostingLoss::Tweedie { .. } => f.clamp(-50.0, 50.0).exp(),
        }
    }
}

/// Boosting hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeParams {
    pub name: &'static str,
    pub loss: BoostingLoss,
    pub num_trees: usize,
    pub num_leaves: usize,
    pub min_samples_per_leaf: usize,
    pub learning_rate: f64,
}

impl TreeParams {
    pub fn fast_tree() -> Self {
        Self {
            name: "FastTree",
            loss: BoostingLoss::Squared,
            num_trees: 100,
            num_leaves: 20,
            min_samples_per_leaf: 10,
            learning_rate: 0.2,
        }
    }

    pub fn tweedie() -> Self {
        Self {
            name: "FastTreeTweedie",
            loss: BoostingLoss::Tweedie { rho: 1.5 },
            ..Self::fast_tree()
        }
    }

    pub fn gbm() -> Self {
        Self {
            name: "GBM",
            loss: BoostingLoss::Squared,
            num_trees: 100,
            num_leaves: 31,
            min_samples_per_leaf: 20,
            learning_rate: 0.1,
        }
    }
}

/// One step function: `values[k]` applies to `x <= thresholds[k]`, the last
/// value to everything above.
#[derive(Debug, Clone, PartialEq)]
struct StepTree {
    thresholds: Vec<f64>,
    values: Vec<f64>,
}

impl StepTree {
    fn predict(&self, x: f64) -> f64 {
        let k = self.thresholds.partition_point(|&t| t < x);
        self.values[k]
    }
}

#[derive(Debug, Clone)]
pub struct BoostedTrees {
    params: TreeParams,
    base_score: f64,
    trees: Vec<StepTree>,
}

impl BoostedTrees {
    pub fn new(params: TreeParams) -> Self {
        Self {
            params,
            base_score: 0.0,
            trees: Vec::new(),
        }
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    fn raw_score(&self, x: f64) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict(x)).sum::<f64>()
    }
}

struct Leaf {
    range: Range<usize>,
    split: Option<(usize, f64)>,
}

impl Regressor for BoostedTrees {
    fn fit(&mut self, x: &[f64], y: &[f64]) -> Result<()> {
        if let BoostingLoss::Tweedie { .. } = self.params.loss {
            require_non_negative(y, self.params.name)?;
        }
        self.trees.clear();
        self.base_score = self.params.loss.initial_score(y);
        let n = x.len();
        if n < 2 {
            return Ok(());
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| x[a].partial_cmp(&x[b]).unwrap_or(std::cmp::Ordering::Equal));
        let xs: Vec<f64> = order.iter().map(|&i| x[i]).collect();
        let ys: Vec<f64> = order.iter().map(|&i| y[i]).collect();
        let min_leaf = self.params.min_samples_per_leaf.min(n / 2).max(1);

        let mut scores = vec![self.base_score; n];
        for _ in 0..self.params.num_trees {
            let (grad, hess): (Vec<f64>, Vec<f64>) = scores
                .iter()
                .zip(&ys)
                .map(|(&f, &yi)| self.params.loss.derivatives(f, yi))
                .unzip();

            let tree = grow_tree(&xs, &grad, &hess, min_leaf, &self.params);
            for (score, &xi) in scores.iter_mut().zip(&xs) {
                *score += tree.predict(xi);
            }
            self.trees.push(tree);
        }
        Ok(())
    }

    fn predict(&self, x: f64) -> f64 {
        self.params.loss.output(self.raw_score(x))
    }

    fn name(&self) -> &'static str {
        self.params.name
    }
}

fn grow_tree(xs: &[f64], grad: &[f64], hess: &[f64], min_leaf: usize, params: &TreeParams) -> StepTree {
    // Prefix sums make every candidate split O(1).
    let mut g_prefix = vec![0.0; xs.len() + 1];
    let mut h_prefix = vec![0.0; xs.len() + 1];
    for i in 0..xs.len() {
        g_prefix[i + 1] = g_prefix[i] + grad[i];
        h_prefix[i + 1] = h_prefix[i] + hess[i];
    }
    let sums = |r: &Range<usize>| (g_prefix[r.end] - g_prefix[r.start], h_prefix[r.end] - h_prefix[r.start]);
    let score = |g: f64, h: f64| if h > 1e-12 { g * g / h } else { 0.0 };

    let best_split = |range: &Range<usize>| -> Option<(usize, f64)> {
        let (g, h) = sums(range);
        let parent = score(g, h);
        let mut best: Option<(usize, f64)> = None;
        for cut in (range.start + min_leaf)..=(range.end.saturating_sub(min_leaf)) {
            if cut <= range.start || cut >= range.end || xs[cut - 1] == xs[cut] {
                continue;
            }
            let (gl, hl) = sums(&(range.start..cut));
            let gain = score(gl, hl) + score(g - gl, h - hl) - parent;
            if gain > 1e-12 && best.map_or(true, |(_, b)| gain > b) {
                best = Some((cut, gain));
            }
        }
        best
    };

    let full = 0..xs.len();
    let mut leaves = vec![Leaf {
        split: best_split(&full),
        range: full,
    }];
    while leaves.len() < params.num_leaves {
        let candidate = leaves
            .iter()
            .enumerate()
            .filter_map(|(i, leaf)| leaf.split.map(|(_, gain)| (i, gain)))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        let Some((index, _)) = candidate else {
            break;
        };
        let leaf = leaves.remove(index);
        let Some((cut, _)) = leaf.split else {
            break;
        };
        let left = leaf.range.start..cut;
        let right = cut..leaf.range.end;
        leaves.insert(
            index,
            Leaf {
                split: best_split(&right),
                range: right,
            },
        );
        leaves.insert(
            index,
            Leaf {
                split: best_split(&left),
                range: left,
            },
        );
    }

    let mut thresholds = Vec::with_capacity(leaves.len().saturating_sub(1));
    let mut values = Vec::with_capacity(leaves.len());
    for (k, leaf) in leaves.iter().enumerate() {
        let (g, h) = sums(&leaf.range);
        let newton = if h > 1e-12 { -g / h } else { 0.0 };
        values.push(params.learning_rate * newton);
        if k + 1 < leaves.len() {
            thresholds.push(0.5 * (xs[leaf.range.end - 1] + xs[leaf.range.end]));
        }
    }
    StepTree { thresholds, values }
}
