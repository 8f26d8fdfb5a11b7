use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::model::{DecisionTree, MODEL_TYPE, MODEL_VERSION, Node, RandomForest, TrainingSummary};
use crate::dataset::Dataset;
use crate::features::{FEATURE_COUNT, FEATURE_NAMES};

/// Training hyperparameters for the forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    /// Number of trees in the ensemble.
    pub n_trees: usize,
    /// Master seed; per-tree seeds are drawn from it.
    pub seed: u64,
    /// Maximum tree depth, unlimited when `None`.
    pub max_depth: Option<usize>,
    /// Minimum rows a node needs before it may split.
    pub min_samples_split: usize,
    /// Minimum rows each child of a split must keep.
    pub min_samples_leaf: usize,
    /// Features examined per split; `None` means `sqrt(FEATURE_COUNT)`.
    pub max_features: Option<usize>,
    /// Grow each tree on a bootstrap resample of the training rows.
    pub bootstrap: bool,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 42,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
        }
    }
}

impl TrainOptions {
    fn features_per_split(&self) -> usize {
        self.max_features
            .unwrap_or_else(|| (FEATURE_COUNT as f64).sqrt().round() as usize)
            .clamp(1, FEATURE_COUNT)
    }
}

/// Train a random forest on `dataset`.
pub fn train_forest(dataset: &Dataset, options: &TrainOptions) -> Result<RandomForest, String> {
    if dataset.x.len() != dataset.y.len() {
        return Err("Mismatched X/Y lengths".to_string());
    }
    if dataset.is_empty() {
        return Err("Empty dataset".to_string());
    }
    if options.n_trees == 0 {
        return Err("Forest needs at least one tree".to_string());
    }
    if dataset.x.iter().flatten().any(|value| !value.is_finite()) {
        return Err("Dataset contains non-finite feature values".to_string());
    }

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut trees = Vec::with_capacity(options.n_trees);
    for _ in 0..options.n_trees {
        let tree_seed: u64 = rng.random();
        trees.push(grow_tree(dataset, options, tree_seed));
    }
    let max_depth = trees.iter().map(DecisionTree::depth).max().unwrap_or(0);
    tracing::info!(
        "Trained {} trees on {} rows (max depth {max_depth})",
        trees.len(),
        dataset.len()
    );

    Ok(RandomForest {
        model_version: MODEL_VERSION,
        model_type: MODEL_TYPE.to_string(),
        feature_names: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
        params: options.clone(),
        summary: TrainingSummary {
            n_train: dataset.len(),
            ..TrainingSummary::default()
        },
        trees,
    })
}

fn grow_tree(dataset: &Dataset, options: &TrainOptions, seed: u64) -> DecisionTree {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = dataset.len();
    let mut rows: Vec<usize> = if options.bootstrap {
        (0..n).map(|_| rng.random_range(0..n)).collect()
    } else {
        (0..n).collect()
    };
    let mut builder = TreeBuilder {
        x: &dataset.x,
        y: &dataset.y,
        options,
        features_per_split: options.features_per_split(),
        rng,
        nodes: Vec::new(),
    };
    builder.build(&mut rows);
    DecisionTree {
        nodes: builder.nodes,
    }
}

struct TreeBuilder<'a> {
    x: &'a [[f64; FEATURE_COUNT]],
    y: &'a [bool],
    options: &'a TrainOptions,
    features_per_split: usize,
    rng: StdRng,
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// A node still to be grown: its row range and where to link it.
#[derive(Debug, Clone, Copy)]
struct PendingNode {
    start: usize,
    end: usize,
    depth: usize,
    parent: Option<(u32, Side)>,
}

impl TreeBuilder<'_> {
    /// Grow the tree for `rows` in pre-order with an explicit stack.
    fn build(&mut self, rows: &mut [usize]) {
        let mut stack = vec![PendingNode {
            start: 0,
            end: rows.len(),
            depth: 0,
            parent: None,
        }];
        while let Some(pending) = stack.pop() {
            let node_rows = &mut rows[pending.start..pending.end];
            let n = node_rows.len();
            let positives = node_rows.iter().filter(|&&row| self.y[row]).count();
            let idx = self.nodes.len() as u32;
            self.nodes.push(Node::Leaf {
                probability: positives as f64 / n.max(1) as f64,
                samples: n as u32,
            });
            if let Some((parent, side)) = pending.parent {
                self.link(parent, side, idx);
            }

            let pure = positives == 0 || positives == n;
            let depth_reached = self
                .options
                .max_depth
                .is_some_and(|max| pending.depth >= max);
            if pure || depth_reached || n < self.options.min_samples_split.max(2) {
                continue;
            }
            let Some(split) = self.best_split(node_rows) else {
                continue;
            };

            let x = self.x;
            let mid =
                pending.start + partition(node_rows, |row| x[row][split.feature] <= split.threshold);
            // Both child indices are patched in by `link` once the children exist.
            self.nodes[idx as usize] = Node::Split {
                feature: split.feature as u16,
                threshold: split.threshold,
                left: idx,
                right: idx,
            };
            // Right goes first so the left subtree is finished before it.
            stack.push(PendingNode {
                start: mid,
                end: pending.end,
                depth: pending.depth + 1,
                parent: Some((idx, Side::Right)),
            });
            stack.push(PendingNode {
                start: pending.start,
                end: mid,
                depth: pending.depth + 1,
                parent: Some((idx, Side::Left)),
            });
        }
    }

    fn link(&mut self, parent: u32, side: Side, child: u32) {
        if let Some(Node::Split { left, right, .. }) = self.nodes.get_mut(parent as usize) {
            match side {
                Side::Left => *left = child,
                Side::Right => *right = child,
            }
        }
    }

    /// Search randomly ordered features until enough non-constant ones were examined.
    fn best_split(&mut self, rows: &[usize]) -> Option<Split> {
        let mut features: Vec<usize> = (0..FEATURE_COUNT).collect();
        features.shuffle(&mut self.rng);

        let mut best: Option<Split> = None;
        let mut examined = 0usize;
        let mut pairs: Vec<(f64, bool)> = Vec::with_capacity(rows.len());
        for feature in features {
            if examined >= self.features_per_split {
                break;
            }
            pairs.clear();
            pairs.extend(rows.iter().map(|&row| (self.x[row][feature], self.y[row])));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
            let (Some(first), Some(last)) = (pairs.first(), pairs.last()) else {
                continue;
            };
            if first.0 == last.0 {
                continue;
            }
            examined += 1;
            if let Some(candidate) =
                best_split_for_feature(&pairs, feature, self.options.min_samples_leaf.max(1))
            {
                if best.is_none_or(|current| candidate.impurity < current.impurity) {
                    best = Some(candidate);
                }
            }
        }
        best
    }
}

/// Sweep sorted `(value, label)` pairs for the threshold with the lowest weighted Gini.
fn best_split_for_feature(pairs: &[(f64, bool)], feature: usize, min_leaf: usize) -> Option<Split> {
    let n = pairs.len();
    let total_pos = pairs.iter().filter(|(_, label)| *label).count();
    let mut left_pos = 0usize;
    let mut best: Option<Split> = None;

    for i in 0..n.saturating_sub(1) {
        if pairs[i].1 {
            left_pos += 1;
        }
        let (value, next) = (pairs[i].0, pairs[i + 1].0);
        if value == next {
            continue;
        }
        let left_n = i + 1;
        let right_n = n - left_n;
        if left_n < min_leaf || right_n < min_leaf {
            continue;
        }
        let impurity = (left_n as f64 * gini(left_pos, left_n)
            + right_n as f64 * gini(total_pos - left_pos, right_n))
            / n as f64;
        if best.is_none_or(|current| impurity < current.impurity) {
            let mut threshold = value + (next - value) / 2.0;
            if threshold >= next {
                threshold = value;
            }
            best = Some(Split {
                feature,
                threshold,
                impurity,
            });
        }
    }
    best
}

fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

/// Reorder `rows` so matching rows come first; returns how many matched.
fn partition(rows: &mut [usize], mut goes_left: impl FnMut(usize) -> bool) -> usize {
    let mut mid = 0usize;
    for i in 0..rows.len() {
        if goes_left(rows[i]) {
            rows.swap(i, mid);
            mid += 1;
        }
    }
    mid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;

    /// Separable toy data: high entropy plus many renames means ransomware.
    fn toy_dataset(n: usize, seed: u64) -> Dataset {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut dataset = Dataset::default();
        for i in 0..n {
            let positive = i % 2 == 0;
            let row = if positive {
                [
                    rng.random_range(7.2..8.0),
                    rng.random_range(0.01..5.0),
                    rng.random_range(20.0..80.0),
                    rng.random_range(3.0..20.0f64).floor(),
                ]
            } else {
                [
                    rng.random_range(2.0..6.5),
                    rng.random_range(0.01..50.0),
                    rng.random_range(0.0..15.0),
                    rng.random_range(0.0..2.0f64).floor(),
                ]
            };
            dataset.x.push(row);
            dataset.y.push(positive);
        }
        dataset
    }

    #[test]
    fn gini_of_pure_and_balanced_nodes() {
        assert_eq!(gini(0, 10), 0.0);
        assert_eq!(gini(10, 10), 0.0);
        assert!((gini(5, 10) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn finds_midpoint_threshold() {
        let pairs = [(1.0, false), (2.0, false), (4.0, true), (5.0, true)];
        let split = best_split_for_feature(&pairs, 0, 1).unwrap();
        assert_eq!(split.threshold, 3.0);
        assert_eq!(split.impurity, 0.0);
        assert!(best_split_for_feature(&pairs, 0, 3).is_none());
    }

    #[test]
    fn partition_moves_matching_rows_first() {
        let mut rows = vec![5, 1, 4, 2, 3];
        let mid = partition(&mut rows, |row| row <= 2);
        assert_eq!(mid, 2);
        let mut left = rows[..mid].to_vec();
        left.sort_unstable();
        assert_eq!(left, vec![1, 2]);
    }

    #[test]
    fn learns_separable_data() {
        let train = toy_dataset(200, 1);
        let test = toy_dataset(100, 2);
        let options = TrainOptions {
            n_trees: 20,
            ..TrainOptions::default()
        };
        let model = train_forest(&train, &options).unwrap();
        model.validate().unwrap();
        assert_eq!(model.trees.len(), 20);
        assert!(model.evaluate(&test).accuracy() > 0.95);

        let suspicious = FeatureVector::from_array([7.8, 0.5, 50.0, 5.0]);
        assert!(model.predict(&suspicious));
        let benign = FeatureVector::from_array([4.0, 10.0, 1.0, 0.0]);
        assert!(!model.predict(&benign));
    }

    #[test]
    fn same_seed_reproduces_model() {
        let data = toy_dataset(120, 3);
        let options = TrainOptions {
            n_trees: 10,
            ..TrainOptions::default()
        };
        let a = train_forest(&data, &options).unwrap();
        let b = train_forest(&data, &options).unwrap();
        assert_eq!(a, b);

        let other = train_forest(
            &data,
            &TrainOptions {
                seed: 7,
                ..options.clone()
            },
        )
        .unwrap();
        assert_ne!(a.trees, other.trees);
    }

    #[test]
    fn max_depth_limits_trees() {
        let data = toy_dataset(120, 4);
        let options = TrainOptions {
            n_trees: 5,
            max_depth: Some(2),
            ..TrainOptions::default()
        };
        let model = train_forest(&data, &options).unwrap();
        assert!(model.trees.iter().all(|tree| tree.depth() <= 2));
    }

    #[test]
    fn alternating_labels_grow_deep_trees() {
        // Weighted Gini favors peeling one row per level on this layout.
        let rows = 1_500;
        let mut data = Dataset::default();
        for i in 0..rows {
            data.x.push([i as f64, 1.0, 1.0, 1.0]);
            data.y.push(i % 2 == 0);
        }
        let options = TrainOptions {
            n_trees: 1,
            bootstrap: false,
            max_features: Some(FEATURE_COUNT),
            ..TrainOptions::default()
        };
        let model = train_forest(&data, &options).unwrap();
        model.validate().unwrap();
        let tree = &model.trees[0];
        assert!(tree.depth() >= rows / 2, "depth {}", tree.depth());
        assert_eq!(model.evaluate(&data).accuracy(), 1.0);
    }

    #[test]
    fn nodes_are_stored_in_pre_order() {
        let data = toy_dataset(60, 8);
        let options = TrainOptions {
            n_trees: 3,
            ..TrainOptions::default()
        };
        let model = train_forest(&data, &options).unwrap();
        for tree in &model.trees {
            for (idx, node) in tree.nodes.iter().enumerate() {
                if let Node::Split { left, .. } = node {
                    assert_eq!(*left as usize, idx + 1);
                }
            }
        }
    }

    #[test]
    fn single_class_data_yields_constant_leaves() {
        let mut data = toy_dataset(20, 5);
        data.y.iter_mut().for_each(|label| *label = false);
        let model = train_forest(&data, &TrainOptions::default()).unwrap();
        assert!(model.trees.iter().all(|tree| tree.nodes.len() == 1));
        assert_eq!(model.predict_proba(&FeatureVector::from_array(data.x[0])), 0.0);
    }

    #[test]
    fn rejects_invalid_inputs() {
        assert!(train_forest(&Dataset::default(), &TrainOptions::default()).is_err());
        let data = toy_dataset(10, 6);
        let no_trees = TrainOptions {
            n_trees: 0,
            ..TrainOptions::default()
        };
        assert!(train_forest(&data, &no_trees).is_err());
        let mut bad = data.clone();
        bad.x[0][0] = f64::NAN;
        assert!(train_forest(&bad, &TrainOptions::default()).is_err());
    }
}
