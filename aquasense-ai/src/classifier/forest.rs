//! Tree-ensemble water-quality classifier
//!
//! The artifact stores each tree as parallel node arrays (`children_left`,
//! `children_right`, `feature`, `threshold`, `value`), the layout produced by
//! exporting a trained random forest. A node with both children `-1` is a
//! leaf; its `value` row holds per-class sample counts or fractions.
//!
//! Prediction routes `x[feature] <= threshold` to the left child and
//! averages the normalized leaf distributions across trees.

use super::{InferenceError, ModelLoadError};
use crate::features::catalog::{model_columns, FEATURE_COUNT};
use crate::features::FeatureVector;
use crate::types::{ClassifierPrediction, QualityLabel};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Artifact format tag
pub const FOREST_FORMAT: &str = "aquasense-forest";

/// Highest artifact version this build understands
pub const FOREST_VERSION: u32 = 1;

const CLASS_COUNT: usize = 3;
const LEAF: i64 = -1;

/// On-disk forest artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestArtifact {
    pub format: String,
    pub version: u32,
    pub feature_names: Vec<String>,
    pub classes: Vec<String>,
    pub trees: Vec<TreeArrays>,
}

/// One tree as parallel node arrays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeArrays {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf([f64; CLASS_COUNT]),
}

#[derive(Debug, Clone)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Validate node arrays and convert them to an owned tree
    ///
    /// Children must point forward (`child > parent`), which rules out cycles.
    fn from_arrays(arrays: &TreeArrays, tree: usize) -> Result<Self, ModelLoadError> {
        let n = arrays.children_left.len();
        let invalid = |msg: String| ModelLoadError::Invalid(format!("tree {}: {}", tree, msg));

        if n == 0 {
            return Err(invalid("no nodes".to_string()));
        }
        if arrays.children_right.len() != n
            || arrays.feature.len() != n
            || arrays.threshold.len() != n
            || arrays.value.len() != n
        {
            return Err(invalid("node arrays have different lengths".to_string()));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (l, r) = (arrays.children_left[i], arrays.children_right[i]);

            if l == LEAF && r == LEAF {
                let row = &arrays.value[i];
                if row.len() != CLASS_COUNT {
                    return Err(invalid(format!("leaf {} has {} class values", i, row.len())));
                }
                if row.iter().any(|v| !v.is_finite() || *v < 0.0) {
                    return Err(invalid(format!("leaf {} has negative or non-finite values", i)));
                }
                let total: f64 = row.iter().sum();
                if total <= 0.0 {
                    return Err(invalid(format!("leaf {} is empty", i)));
                }
                nodes.push(Node::Leaf([row[0] / total, row[1] / total, row[2] / total]));
                continue;
            }

            let child = |c: i64| -> Result<usize, ModelLoadError> {
                match usize::try_from(c) {
                    Ok(c) if c > i && c < n => Ok(c),
                    _ => Err(invalid(format!("node {} has invalid child {}", i, c))),
                }
            };
            let feature = match usize::try_from(arrays.feature[i]) {
                Ok(f) if f < FEATURE_COUNT => f,
                _ => {
                    return Err(invalid(format!(
                        "node {} splits on unknown feature {}",
                        i, arrays.feature[i]
                    )))
                }
            };
            let threshold = arrays.threshold[i];
            if !threshold.is_finite() {
                return Err(invalid(format!("node {} has non-finite threshold", i)));
            }

            nodes.push(Node::Split {
                feature,
                threshold,
                left: child(l)?,
                right: child(r)?,
            });
        }

        Ok(Self { nodes })
    }

    fn predict(&self, x: &[f64; FEATURE_COUNT]) -> [f64; CLASS_COUNT] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(distribution) => return *distribution,
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

/// Loaded water-quality classifier
#[derive(Debug, Clone)]
pub struct RandomForest {
    version: u32,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Load and validate an artifact file
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let artifact: ForestArtifact = serde_json::from_str(&content)?;
        Self::from_artifact(artifact)
    }

    /// Validate an in-memory artifact
    pub fn from_artifact(artifact: ForestArtifact) -> Result<Self, ModelLoadError> {
        if artifact.format != FOREST_FORMAT {
            return Err(ModelLoadError::Unsupported(format!(
                "format '{}', expected '{}'",
                artifact.format, FOREST_FORMAT
            )));
        }
        if artifact.version == 0 || artifact.version > FOREST_VERSION {
            return Err(ModelLoadError::Unsupported(format!(
                "version {}, this build reads up to {}",
                artifact.version, FOREST_VERSION
            )));
        }
        if !artifact.feature_names.iter().map(String::as_str).eq(model_columns()) {
            return Err(ModelLoadError::Invalid(format!(
                "feature names {:?} do not match the feature catalog",
                artifact.feature_names
            )));
        }
        if !artifact
            .classes
            .iter()
            .map(String::as_str)
            .eq(QualityLabel::ALL.iter().map(|l| l.as_str()))
        {
            return Err(ModelLoadError::Invalid(format!(
                "classes {:?}, expected Excellent, Good, Poor",
                artifact.classes
            )));
        }
        if artifact.trees.is_empty() {
            return Err(ModelLoadError::Invalid("forest has no trees".to_string()));
        }

        let trees = artifact
            .trees
            .iter()
            .enumerate()
            .map(|(i, t)| DecisionTree::from_arrays(t, i))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            version: artifact.version,
            trees,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Class probabilities in label order; sums to 1
    pub fn predict_proba(&self, vector: &FeatureVector) -> Result<[f64; CLASS_COUNT], InferenceError> {
        let x = vector.values();
        if let Some(slot) = x.iter().position(|v| !v.is_finite()) {
            return Err(InferenceError::MalformedInput(format!(
                "feature slot {} is not finite",
                slot
            )));
        }

        let mut sum = [0.0; CLASS_COUNT];
        for tree in &self.trees {
            let p = tree.predict(x);
            for (acc, v) in sum.iter_mut().zip(p) {
                *acc += v;
            }
        }
        let n = self.trees.len() as f64;
        Ok(sum.map(|v| v / n))
    }

    /// Most likely label with its probability
    pub fn predict(&self, vector: &FeatureVector) -> Result<ClassifierPrediction, InferenceError> {
        Ok(ClassifierPrediction::from_probabilities(self.predict_proba(vector)?))
    }
}
