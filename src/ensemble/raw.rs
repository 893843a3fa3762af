//! External tree format
//!
//! A trained tree as exported by a learning library: splits test a feature against a threshold
//! and leaves store either a boosting weight or a class index. With the `serde` feature the
//! format can be read from JSON, for example
//!
//! ```json
//! {
//!     "target_class": 0,
//!     "root": {
//!         "feature": 0, "operator": "LessOrEqual", "threshold": 5.0,
//!         "if_true": { "value": 1.0 },
//!         "if_false": { "value": -1.0 }
//!     }
//! }
//! ```

use super::condition::{Condition, ConditionTable, Operator};
use super::tree::{Node, Tree};
use super::EnsembleKind;
use crate::error::{Error, Result};
use crate::Float;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// A node of a tree in external format
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", untagged)
)]
#[derive(Debug, Clone, PartialEq)]
pub enum RawNode<F> {
    Leaf {
        value: F,
    },
    Split {
        feature: usize,
        #[cfg_attr(feature = "serde", serde(default))]
        operator: Operator,
        threshold: F,
        if_true: Box<RawNode<F>>,
        if_false: Box<RawNode<F>>,
    },
}

impl<F> RawNode<F> {
    pub fn leaf(value: F) -> Self {
        RawNode::Leaf { value }
    }

    /// A split sending observations with `x[feature] <op> threshold` to `if_true`
    pub fn split(
        feature: usize,
        operator: Operator,
        threshold: F,
        if_true: RawNode<F>,
        if_false: RawNode<F>,
    ) -> Self {
        RawNode::Split {
            feature,
            operator,
            threshold,
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
        }
    }
}

/// A tree in external format
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct RawTree<F> {
    /// Class the tree votes for in a multiclass boosted ensemble
    #[cfg_attr(feature = "serde", serde(default))]
    pub target_class: Option<usize>,
    pub root: RawNode<F>,
}

impl<F> RawTree<F> {
    pub fn new(root: RawNode<F>) -> Self {
        RawTree {
            target_class: None,
            root,
        }
    }

    pub fn for_class(mut self, class: usize) -> Self {
        self.target_class = Some(class);
        self
    }
}

/// Converts a tree in external format into a tree over literals
///
/// The conditions met on the way are registered in a copy of `conditions`, which is returned
/// together with the tree. Nothing is modified when the tree is rejected.
pub fn convert_tree<F: Float>(
    raw: &RawTree<F>,
    kind: EnsembleKind,
    n_classes: usize,
    conditions: &ConditionTable<F>,
) -> Result<(Tree<F>, ConditionTable<F>)> {
    let target_class = match (kind, raw.target_class) {
        (_, Some(class)) if class >= n_classes => {
            return Err(Error::ModelIngest(format!(
                "target class {} out of range for {} classes",
                class, n_classes
            )))
        }
        (EnsembleKind::BoostedMulticlass, None) => {
            return Err(Error::ModelIngest(
                "trees of a multiclass boosted ensemble need a target class".into(),
            ))
        }
        (EnsembleKind::BoostedMulticlass, Some(class)) => class,
        _ => 0,
    };

    let mut converter = Converter {
        kind,
        n_classes,
        conditions: conditions.clone(),
        nodes: Vec::new(),
    };
    converter.visit(&raw.root)?;

    Ok((
        Tree::from_nodes(converter.nodes, target_class),
        converter.conditions,
    ))
}

struct Converter<F> {
    kind: EnsembleKind,
    n_classes: usize,
    conditions: ConditionTable<F>,
    nodes: Vec<Node<F>>,
}

impl<F: Float> Converter<F> {
    /// Appends the subtree in pre-order and returns the position of its root
    fn visit(&mut self, node: &RawNode<F>) -> Result<usize> {
        let idx = self.nodes.len();
        match node {
            RawNode::Leaf { value } => {
                self.check_leaf(*value)?;
                self.nodes.push(Node::Leaf(*value));
            }
            RawNode::Split {
                feature,
                operator,
                threshold,
                if_true,
                if_false,
            } => {
                if !threshold.is_finite() {
                    return Err(Error::ModelIngest(format!(
                        "threshold {} of feature {} is not finite",
                        threshold, feature
                    )));
                }
                let literal = self
                    .conditions
                    .insert(Condition::new(*feature, *operator, *threshold));

                // placeholder, children positions are known after visiting them
                self.nodes.push(Node::Leaf(F::zero()));
                let if_true = self.visit(if_true)?;
                let if_false = self.visit(if_false)?;
                self.nodes[idx] = Node::Split {
                    literal,
                    if_true,
                    if_false,
                };
            }
        }
        Ok(idx)
    }

    fn check_leaf(&self, value: F) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::ModelIngest(format!(
                "leaf value {} is not finite",
                value
            )));
        }
        if self.kind.is_forest() {
            let valid = value >= F::zero()
                && value.fract() == F::zero()
                && value < F::cast(self.n_classes);
            if !valid {
                return Err(Error::ModelIngest(format!(
                    "leaf value {} is not a class index below {}",
                    value, self.n_classes
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(threshold: f64, left: f64, right: f64) -> RawNode<f64> {
        RawNode::split(
            0,
            Operator::LessOrEqual,
            threshold,
            RawNode::leaf(left),
            RawNode::leaf(right),
        )
    }

    #[test]
    fn conversion_registers_conditions() {
        let raw = RawTree::new(RawNode::split(
            1,
            Operator::LessThan,
            0.5,
            stump(5.0, 1.0, -1.0),
            stump(5.0, 0.5, -0.5),
        ));
        let table = ConditionTable::new();
        let (tree, table) = convert_tree(&raw, EnsembleKind::BoostedBinary, 2, &table).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(tree.n_leaves(), 4);
        assert_eq!(tree.max_depth(), 2);
        assert_eq!(
            tree.nodes()[0],
            Node::Split {
                literal: 0,
                if_true: 1,
                if_false: 4
            }
        );
    }

    #[test]
    fn forest_leaves_must_be_classes() {
        let table = ConditionTable::new();
        let raw = RawTree::new(stump(1.0, 0.0, 2.0));
        assert!(matches!(
            convert_tree(&raw, EnsembleKind::ForestBinary, 2, &table),
            Err(Error::ModelIngest(_))
        ));

        let raw = RawTree::new(stump(1.0, 0.0, 0.5));
        assert!(convert_tree(&raw, EnsembleKind::ForestMulticlass, 3, &table).is_err());

        let raw = RawTree::new(stump(1.0, 0.0, 2.0));
        assert!(convert_tree(&raw, EnsembleKind::ForestMulticlass, 3, &table).is_ok());
    }

    #[test]
    fn multiclass_boosting_needs_target_class() {
        let table = ConditionTable::new();
        let raw = RawTree::new(stump(1.0, 0.1, 0.2));
        assert!(convert_tree(&raw, EnsembleKind::BoostedMulticlass, 3, &table).is_err());

        let (tree, _) = convert_tree(
            &raw.clone().for_class(2),
            EnsembleKind::BoostedMulticlass,
            3,
            &table,
        )
        .unwrap();
        assert_eq!(tree.target_class(), 2);

        assert!(convert_tree(&raw.for_class(3), EnsembleKind::BoostedMulticlass, 3, &table).is_err());
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let table = ConditionTable::new();
        let raw = RawTree::new(stump(f64::NAN, 0.1, 0.2));
        assert!(convert_tree(&raw, EnsembleKind::BoostedBinary, 2, &table).is_err());

        let raw = RawTree::new(stump(1.0, f64::INFINITY, 0.2));
        assert!(convert_tree(&raw, EnsembleKind::BoostedBinary, 2, &table).is_err());
    }
}
