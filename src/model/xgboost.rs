//! Native evaluation of XGBoost `gbtree` models saved in the JSON format
//! (`Booster.save_model("model.json")`).

use serde::Deserialize;
use serde_json::Value;

use super::{
    FeatureFrame, ModelError, ModelSummary, Regressor, TARGET_COLUMNS, check_features,
    default_feature_names, default_target_names,
};

#[derive(Deserialize)]
struct XgbDocument {
    learner: LearnerDoc,
}

#[derive(Deserialize)]
struct LearnerDoc {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: GradientBoosterDoc,
    learner_model_param: LearnerModelParamDoc,
    objective: ObjectiveDoc,
}

#[derive(Deserialize)]
struct GradientBoosterDoc {
    name: String,
    #[serde(default)]
    model: Option<GbTreeModelDoc>,
}

#[derive(Deserialize)]
struct GbTreeModelDoc {
    trees: Vec<TreeDoc>,
    #[serde(default)]
    tree_info: Vec<usize>,
}

#[derive(Deserialize)]
struct LearnerModelParamDoc {
    base_score: String,
    num_feature: String,
    #[serde(default)]
    num_class: Option<String>,
    #[serde(default)]
    num_target: Option<String>,
}

#[derive(Deserialize)]
struct ObjectiveDoc {
    name: String,
}

#[derive(Deserialize)]
struct TreeDoc {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f64>,
    default_left: Vec<Flag>,
    #[serde(default)]
    split_type: Vec<u8>,
    #[serde(default)]
    tree_param: TreeParamDoc,
}

#[derive(Deserialize, Default)]
struct TreeParamDoc {
    #[serde(default)]
    size_leaf_vector: Option<String>,
}

// Older releases wrote `default_left` as booleans, newer ones as 0/1.
#[derive(Deserialize, Clone, Copy)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(u8),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

/// How a raw margin maps to the model's output space.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Link {
    Identity,
    Logit,
    Log,
}

impl Link {
    fn for_objective(name: &str) -> Result<Self, ModelError> {
        match name {
            "reg:squarederror" | "reg:squaredlogerror" | "reg:pseudohubererror"
            | "reg:absoluteerror" | "reg:quantileerror" | "reg:linear" => Ok(Link::Identity),
            "reg:logistic" | "binary:logistic" => Ok(Link::Logit),
            "count:poisson" | "reg:gamma" | "reg:tweedie" => Ok(Link::Log),
            other => Err(ModelError::Unsupported(format!("objective '{other}'"))),
        }
    }

    /// `base_score` is stored in output space.
    fn margin_of(self, base_score: f32) -> f32 {
        match self {
            Link::Identity => base_score,
            Link::Logit => -(1.0 / base_score - 1.0).ln(),
            Link::Log => base_score.ln(),
        }
    }

    fn output_of(self, margin: f32) -> f32 {
        match self {
            Link::Identity => margin,
            Link::Logit => 1.0 / (1.0 + (-margin).exp()),
            Link::Log => margin.exp(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf(f32),
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        default_left: bool,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_doc(index: usize, doc: TreeDoc, num_feature: usize) -> Result<Self, ModelError> {
        let invalid = |reason: String| ModelError::InvalidTree { tree: index, reason };

        // `multi_output_tree` models store one vector per leaf in `base_weights`.
        if let Some(raw) = doc.tree_param.size_leaf_vector.as_deref() {
            if parse_count("size_leaf_vector", raw)? > 1 {
                return Err(ModelError::Unsupported(
                    "vector-leaf (multi_output_tree) model".to_string(),
                ));
            }
        }

        let n = doc.left_children.len();
        if n == 0 {
            return Err(invalid("tree has no nodes".to_string()));
        }
        let lengths = [
            doc.right_children.len(),
            doc.split_indices.len(),
            doc.split_conditions.len(),
            doc.default_left.len(),
        ];
        if lengths.iter().any(|&len| len != n) {
            return Err(invalid(format!(
                "node arrays disagree in length ({n} left children, others {lengths:?})"
            )));
        }
        if doc.split_type.iter().any(|&t| t != 0) {
            return Err(ModelError::Unsupported(format!(
                "categorical split in tree {index}"
            )));
        }

        let child = |raw: i64| -> Result<usize, ModelError> {
            usize::try_from(raw)
                .ok()
                .filter(|&c| c < n)
                .ok_or_else(|| invalid(format!("child index {raw} out of range")))
        };

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let left = doc.left_children[i];
            if left == -1 {
                nodes.push(Node::Leaf(doc.split_conditions[i] as f32));
                continue;
            }
            let feature = usize::try_from(doc.split_indices[i])
                .ok()
                .filter(|&f| f < num_feature)
                .ok_or_else(|| {
                    invalid(format!("split feature {} out of range", doc.split_indices[i]))
                })?;
            nodes.push(Node::Split {
                feature,
                threshold: doc.split_conditions[i] as f32,
                left: child(left)?,
                right: child(doc.right_children[i])?,
                default_left: doc.default_left[i].is_set(),
            });
        }

        let tree = Tree { nodes };
        tree.check_reachable_once().map_err(invalid)?;
        Ok(tree)
    }

    /// Every node reachable from the root must be reached by exactly one
    /// path, which rules out cycles and guarantees traversal terminates.
    fn check_reachable_once(&self) -> Result<(), String> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![0usize];
        while let Some(i) = stack.pop() {
            if seen[i] {
                return Err(format!("node {i} is reachable more than once"));
            }
            seen[i] = true;
            if let Node::Split { left, right, .. } = self.nodes[i] {
                stack.push(left);
                stack.push(right);
            }
        }
        Ok(())
    }

    fn leaf_value(&self, row: &[f64]) -> f32 {
        let mut i = 0;
        loop {
            match self.nodes[i] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let value = row[feature];
                    i = if value.is_nan() {
                        if default_left { left } else { right }
                    } else if (value as f32) < threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

fn parse_count(field: &str, raw: &str) -> Result<usize, ModelError> {
    raw.trim()
        .parse()
        .map_err(|e| ModelError::Parse(format!("{field} '{raw}': {e}")))
}

/// Accepts both `"5E-1"` and the bracketed vector form `"[5E-1,1E0]"`.
fn parse_base_score(raw: &str, num_target: usize) -> Result<Vec<f32>, ModelError> {
    let inner = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let values = inner
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<f32>()
                .map_err(|e| ModelError::Parse(format!("base_score '{raw}': {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    match values.len() {
        1 => Ok(vec![values[0]; num_target]),
        n if n == num_target => Ok(values),
        n => Err(ModelError::Parse(format!(
            "base_score has {n} values for {num_target} targets"
        ))),
    }
}

/// A gradient-boosted tree ensemble with one or more outputs.
#[derive(Debug, Clone)]
pub struct GradientBoostedTrees {
    feature_names: Vec<String>,
    target_names: Vec<String>,
    objective: String,
    link: Link,
    base_margin: Vec<f32>,
    trees: Vec<Tree>,
    tree_targets: Vec<usize>,
}

impl GradientBoostedTrees {
    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        Self::from_value(serde_json::from_str(text)?)
    }

    pub fn from_value(value: Value) -> Result<Self, ModelError> {
        let doc: XgbDocument = serde_json::from_value(value)?;
        let learner = doc.learner;
        let params = learner.learner_model_param;

        if learner.gradient_booster.name != "gbtree" {
            return Err(ModelError::Unsupported(format!(
                "booster '{}', only gbtree is supported",
                learner.gradient_booster.name
            )));
        }
        if let Some(num_class) = params.num_class.as_deref() {
            if parse_count("num_class", num_class)? > 0 {
                return Err(ModelError::Unsupported(
                    "multi-class classification model".to_string(),
                ));
            }
        }

        let num_feature = parse_count("num_feature", &params.num_feature)?;
        let num_target = match params.num_target.as_deref() {
            Some(raw) => parse_count("num_target", raw)?.max(1),
            None => 1,
        };

        let feature_names = if learner.feature_names.is_empty() {
            if num_feature == super::FEATURE_COLUMNS.len() {
                default_feature_names()
            } else {
                (0..num_feature).map(|i| format!("f{i}")).collect()
            }
        } else {
            learner.feature_names
        };
        if feature_names.len() != num_feature {
            return Err(ModelError::Parse(format!(
                "{} feature names for {num_feature} features",
                feature_names.len()
            )));
        }

        let link = Link::for_objective(&learner.objective.name)?;
        let base_margin = parse_base_score(&params.base_score, num_target)?
            .into_iter()
            .map(|score| link.margin_of(score))
            .collect();

        let model = learner.gradient_booster.model.ok_or_else(|| {
            ModelError::Parse("gradient_booster.model is missing".to_string())
        })?;

        let tree_targets = if model.tree_info.is_empty() && num_target == 1 {
            vec![0; model.trees.len()]
        } else {
            model.tree_info
        };
        if tree_targets.len() != model.trees.len() {
            return Err(ModelError::Parse(format!(
                "tree_info has {} entries for {} trees",
                tree_targets.len(),
                model.trees.len()
            )));
        }
        if let Some(&bad) = tree_targets.iter().find(|&&t| t >= num_target) {
            return Err(ModelError::Parse(format!(
                "tree assigned to output {bad}, model has {num_target}"
            )));
        }

        let trees = model
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, doc)| Tree::from_doc(i, doc, num_feature))
            .collect::<Result<Vec<_>, _>>()?;

        let target_names = if num_target == TARGET_COLUMNS.len() {
            default_target_names()
        } else {
            (0..num_target).map(|i| format!("target_{i}")).collect()
        };

        Ok(GradientBoostedTrees {
            feature_names,
            target_names,
            objective: learner.objective.name,
            link,
            base_margin,
            trees,
            tree_targets,
        })
    }

    pub fn num_outputs(&self) -> usize {
        self.base_margin.len()
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn objective(&self) -> &str {
        &self.objective
    }

    fn predict_row(&self, row: &[f64]) -> Vec<f64> {
        let mut margins = self.base_margin.clone();
        for (tree, &target) in self.trees.iter().zip(&self.tree_targets) {
            margins[target] += tree.leaf_value(row);
        }
        margins
            .into_iter()
            .map(|margin| f64::from(self.link.output_of(margin)))
            .collect()
    }
}

impl Regressor for GradientBoostedTrees {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn target_names(&self) -> &[String] {
        &self.target_names
    }

    fn predict(&self, frame: &FeatureFrame) -> Result<Vec<Vec<f64>>, ModelError> {
        check_features(&self.feature_names, frame)?;
        Ok(frame.rows().map(|row| self.predict_row(row)).collect())
    }

    fn summary(&self) -> ModelSummary {
        ModelSummary {
            booster: "gbtree".to_string(),
            objective: self.objective.clone(),
            features: self.feature_names.clone(),
            targets: self.target_names.clone(),
            num_trees: self.trees.len(),
        }
    }
}
