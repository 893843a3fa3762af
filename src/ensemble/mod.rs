//! Tree ensembles over literals
//!
//! An [`Ensemble`] is built once from trees in [external format](RawTree) and stays read-only
//! afterwards. Every distinct split condition of the ingested trees is registered in a
//! [`ConditionTable`], which defines the literals of the boolean encoding of observations.

mod condition;
mod raw;
mod tree;

pub use condition::*;
pub use raw::*;
pub use tree::*;

use std::collections::BTreeSet;

use ndarray::{ArrayBase, Data, Ix1};
use tracing::debug;

use crate::error::{Error, Result};
use crate::literal::{ActiveMask, Instance};
use crate::Float;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Family of a tree ensemble
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnsembleKind {
    /// Boosted trees, class 1 is predicted when the summed margin is non-negative
    BoostedBinary,
    /// Boosted trees, every tree adds to the score of a single class
    BoostedMulticlass,
    /// Boosted trees predicting a real value
    BoostedRegression,
    /// Random forest with two classes
    ForestBinary,
    /// Random forest, predicts the class with the most votes
    ForestMulticlass,
}

impl EnsembleKind {
    pub fn is_forest(&self) -> bool {
        matches!(self, EnsembleKind::ForestBinary | EnsembleKind::ForestMulticlass)
    }

    pub fn is_boosted(&self) -> bool {
        !self.is_forest()
    }

    /// Number of additive bias terms of the family
    fn n_biases(&self, n_classes: usize) -> usize {
        match self {
            EnsembleKind::BoostedBinary | EnsembleKind::BoostedRegression => 1,
            EnsembleKind::BoostedMulticlass => n_classes,
            EnsembleKind::ForestBinary | EnsembleKind::ForestMulticlass => 0,
        }
    }

    fn check_n_classes(&self, n_classes: usize) -> Result<()> {
        let valid = match self {
            EnsembleKind::BoostedBinary | EnsembleKind::ForestBinary => n_classes == 2,
            EnsembleKind::BoostedMulticlass | EnsembleKind::ForestMulticlass => n_classes >= 2,
            EnsembleKind::BoostedRegression => n_classes == 1,
        };
        if valid {
            Ok(())
        } else {
            Err(Error::InvalidConfiguration(format!(
                "{:?} ensembles cannot have {} classes",
                self, n_classes
            )))
        }
    }
}

/// An ordered collection of trees sharing one literal encoding
///
/// The order in which trees are added is the order in which their contributions are
/// accumulated, which keeps bound computations reproducible.
#[derive(Debug, Clone)]
pub struct Ensemble<F> {
    kind: EnsembleKind,
    n_classes: usize,
    trees: Vec<Tree<F>>,
    bias: Vec<F>,
    conditions: ConditionTable<F>,
}

impl<F: Float> Ensemble<F> {
    /// Creates an empty ensemble
    ///
    /// Binary families need exactly two classes, multiclass families at least two and
    /// regression ensembles exactly one.
    pub fn new(kind: EnsembleKind, n_classes: usize) -> Result<Self> {
        kind.check_n_classes(n_classes)?;
        Ok(Self::with_kind(kind, n_classes))
    }

    pub fn boosted_binary() -> Self {
        Self::with_kind(EnsembleKind::BoostedBinary, 2)
    }

    pub fn boosted_regression() -> Self {
        Self::with_kind(EnsembleKind::BoostedRegression, 1)
    }

    pub fn forest_binary() -> Self {
        Self::with_kind(EnsembleKind::ForestBinary, 2)
    }

    fn with_kind(kind: EnsembleKind, n_classes: usize) -> Self {
        Ensemble {
            kind,
            n_classes,
            trees: Vec::new(),
            bias: vec![F::zero(); kind.n_biases(n_classes)],
            conditions: ConditionTable::new(),
        }
    }

    /// Sets the value added to the margin of binary and regression boosted ensembles
    pub fn set_base_score(&mut self, base_score: F) -> Result<()> {
        if self.bias.len() != 1 {
            return Err(Error::UnsupportedKind(format!(
                "{:?} ensembles have no base score",
                self.kind
            )));
        }
        if !base_score.is_finite() {
            return Err(Error::InvalidConfiguration(format!(
                "base score {} is not finite",
                base_score
            )));
        }
        self.bias[0] = base_score;
        Ok(())
    }

    /// Sets the per-class bias of a multiclass boosted ensemble
    pub fn set_class_bias(&mut self, bias: Vec<F>) -> Result<()> {
        if self.kind != EnsembleKind::BoostedMulticlass {
            return Err(Error::UnsupportedKind(format!(
                "{:?} ensembles have no class bias",
                self.kind
            )));
        }
        if bias.len() != self.n_classes {
            return Err(Error::DimensionMismatch {
                expected: self.n_classes,
                found: bias.len(),
            });
        }
        if bias.iter().any(|b| !b.is_finite()) {
            return Err(Error::InvalidConfiguration(
                "class bias must be finite".into(),
            ));
        }
        self.bias = bias;
        Ok(())
    }

    /// Converts and appends a tree
    ///
    /// The ensemble is left untouched if the tree is malformed.
    pub fn add_tree(&mut self, raw: &RawTree<F>) -> Result<()> {
        let (tree, conditions) = convert_tree(raw, self.kind, self.n_classes, &self.conditions)?;
        self.trees.push(tree);
        self.conditions = conditions;

        debug!(
            kind = ?self.kind,
            n_trees = self.trees.len(),
            n_literals = self.conditions.len(),
            "tree added to ensemble"
        );
        Ok(())
    }

    /// Parses a tree from JSON and appends it
    #[cfg(feature = "serde")]
    pub fn add_tree_json(&mut self, json: &str) -> Result<()>
    where
        F: serde_crate::de::DeserializeOwned,
    {
        let raw: RawTree<F> = serde_json::from_str(json)?;
        self.add_tree(&raw)
    }

    pub fn kind(&self) -> EnsembleKind {
        self.kind
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[Tree<F>] {
        &self.trees
    }

    /// Bias terms, one per class for multiclass boosting, a single base score for binary and
    /// regression boosting and none for forests
    pub fn bias(&self) -> &[F] {
        &self.bias
    }

    /// Number of literals of the encoding
    pub fn n_literals(&self) -> usize {
        self.conditions.len()
    }

    pub fn conditions(&self) -> &ConditionTable<F> {
        &self.conditions
    }

    /// Returns an error if no tree has been added yet
    pub fn check_ready(&self) -> Result<()> {
        if self.trees.is_empty() {
            Err(Error::UninitializedEnsemble)
        } else {
            Ok(())
        }
    }

    /// Checks that the ensemble is ready and that the instance matches its encoding
    pub fn check_instance(&self, instance: &Instance) -> Result<()> {
        self.check_ready()?;
        instance.check_len(self.n_literals())
    }

    /// Encodes an observation as an instance
    pub fn binarize(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<Instance> {
        self.check_ready()?;
        self.conditions.binarize(x)
    }

    /// Raw outputs of the ensemble for a complete instance
    ///
    /// Margins for boosting (one per class in the multiclass case) and vote counts for forests.
    pub fn scores(&self, instance: &Instance) -> Result<Vec<F>> {
        self.check_instance(instance)?;

        let scores = if self.kind.is_forest() {
            let mut votes = vec![F::zero(); self.n_classes];
            for tree in &self.trees {
                let class = tree.predict(instance).to_usize().unwrap_or(0);
                votes[class] += F::one();
            }
            votes
        } else {
            let mut margins = self.bias.clone();
            for tree in &self.trees {
                let slot = match self.kind {
                    EnsembleKind::BoostedMulticlass => tree.target_class(),
                    _ => 0,
                };
                margins[slot] += tree.predict(instance);
            }
            margins
        };
        Ok(scores)
    }

    /// Predicted class of a complete instance
    ///
    /// Ties are broken in favour of the lowest class index.
    pub fn predict(&self, instance: &Instance) -> Result<usize> {
        let scores = self.scores(instance)?;
        match self.kind {
            EnsembleKind::BoostedRegression => Err(Error::UnsupportedKind(
                "regression ensembles do not predict classes".into(),
            )),
            EnsembleKind::BoostedBinary => Ok(if scores[0] >= F::zero() { 1 } else { 0 }),
            _ => Ok(argmax(&scores)),
        }
    }

    /// Predicted value of a regression ensemble, or margin of a binary boosted ensemble
    pub fn predict_value(&self, instance: &Instance) -> Result<F> {
        match self.kind {
            EnsembleKind::BoostedRegression | EnsembleKind::BoostedBinary => {
                Ok(self.scores(instance)?[0])
            }
            kind => Err(Error::UnsupportedKind(format!(
                "{:?} ensembles do not predict a single value",
                kind
            ))),
        }
    }

    /// Literals tested on the decision paths of `instance`, in increasing order
    ///
    /// Fixing them determines the leaf of every tree, so they always form a reason.
    pub fn path_literals(&self, instance: &Instance) -> Result<Vec<usize>> {
        self.check_instance(instance)?;

        let literals = self
            .trees
            .iter()
            .flat_map(|tree| tree.path_literals(instance))
            .collect::<BTreeSet<_>>();
        Ok(literals.into_iter().collect())
    }

    /// Smallest and largest output over every possible instance
    ///
    /// Only defined for ensembles with a single margin, that is binary and regression boosting.
    /// Every tree is bounded on its own, so the interval may be wider than the reachable outputs.
    pub fn extremum_range(&self) -> Result<(F, F)> {
        self.check_ready()?;
        match self.kind {
            EnsembleKind::BoostedBinary | EnsembleKind::BoostedRegression => {
                let base = self.bias[0];
                Ok(self
                    .trees
                    .iter()
                    .map(|tree| tree.leaf_bounds())
                    .fold((base, base), |(lo, hi), (min, max)| (lo + min, hi + max)))
            }
            kind => Err(Error::UnsupportedKind(format!(
                "{:?} ensembles have no single output range",
                kind
            ))),
        }
    }

    /// Fixes every literal of the instance
    pub fn full_mask(&self) -> ActiveMask {
        ActiveMask::all(self.n_literals())
    }
}

fn argmax<F: Float>(scores: &[F]) -> usize {
    let mut best = 0;
    for (class, score) in scores.iter().enumerate().skip(1) {
        if *score > scores[best] {
            best = class;
        }
    }
    best
}
