/// Growth limits of a single regression tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 6,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Axis-aligned regression tree grown by greedy variance reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    root: Node,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    cost: f64,
}

impl RegressionTree {
    /// Grows a tree on the rows of `features` selected by `rows`.
    ///
    /// `rows` may repeat indices, which lets bootstrap ensembles reuse it.
    pub fn fit(
        features: &[Vec<f64>],
        targets: &[f64],
        rows: &[usize],
        params: TreeParams,
    ) -> Self {
        Self {
            root: grow(features, targets, rows.to_vec(), 0, params),
        }
    }

    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = x.get(*feature).copied().unwrap_or(0.0);
                    node = if v <= *threshold { left } else { right };
                }
            }
        }
    }
}

fn mean_of(targets: &[f64], rows: &[usize]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(|&r| targets[r]).sum::<f64>() / rows.len() as f64
}

fn grow(
    features: &[Vec<f64>],
    targets: &[f64],
    rows: Vec<usize>,
    depth: usize,
    params: TreeParams,
) -> Node {
    let leaf_value = mean_of(targets, &rows);
    if depth >= params.max_depth || rows.len() < 2 * params.min_samples_leaf.max(1) {
        return Node::Leaf(leaf_value);
    }

    let Some(split) = best_split(features, targets, &rows, params.min_samples_leaf.max(1)) else {
        return Node::Leaf(leaf_value);
    };

    let (left, right): (Vec<usize>, Vec<usize>) = rows
        .into_iter()
        .partition(|&r| features[r][split.feature] <= split.threshold);

    Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(grow(features, targets, left, depth + 1, params)),
        right: Box::new(grow(features, targets, right, depth + 1, params)),
    }
}

fn best_split(
    features: &[Vec<f64>],
    targets: &[f64],
    rows: &[usize],
    min_leaf: usize,
) -> Option<SplitCandidate> {
    let n = rows.len();
    let total_sum: f64 = rows.iter().map(|&r| targets[r]).sum();
    let total_sq: f64 = rows.iter().map(|&r| targets[r] * targets[r]).sum();
    let parent_cost = total_sq - total_sum * total_sum / n as f64;
    let dims = features[rows[0]].len();

    let mut best: Option<SplitCandidate> = None;
    for feature in 0..dims {
        let mut sorted = rows.to_vec();
        sorted.sort_by(|&a, &b| {
            features[a][feature]
                .total_cmp(&features[b][feature])
                .then(a.cmp(&b))
        });

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for i in 1..n {
            let y = targets[sorted[i - 1]];
            left_sum += y;
            left_sq += y * y;

            let lo = features[sorted[i - 1]][feature];
            let hi = features[sorted[i]][feature];
            if i < min_leaf || n - i < min_leaf || lo == hi {
                continue;
            }
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let cost = (left_sq - left_sum * left_sum / i as f64)
                + (right_sq - right_sum * right_sum / (n - i) as f64);

            let improves = best.as_ref().is_none_or(|b| cost < b.cost);
            if improves && cost < parent_cost - 1e-12 {
                best = Some(SplitCandidate {
                    feature,
                    threshold: (lo + hi) / 2.0,
                    cost,
                });
            }
        }
    }
    best
}
