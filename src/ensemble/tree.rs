use crate::literal::{ActiveMask, Instance};
use crate::Float;

/// A node of an ingested tree
///
/// Internal nodes test a literal and point to their children by position in the arena of the
/// owning [`Tree`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node<F> {
    Split {
        literal: usize,
        if_true: usize,
        if_false: usize,
    },
    Leaf(F),
}

/// A decision tree over literals
///
/// For boosted trees the leaves hold additive weights, for random forests they hold the index
/// of the predicted class. The root is the first node of the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree<F> {
    nodes: Vec<Node<F>>,
    target_class: usize,
}

/// Outcome of a forest tree under a partial assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    /// Every reachable leaf predicts this class
    Guaranteed(usize),
    /// Reachable leaves disagree
    Undetermined,
}

impl<F: Float> Tree<F> {
    pub(crate) fn from_nodes(nodes: Vec<Node<F>>, target_class: usize) -> Self {
        debug_assert!(!nodes.is_empty());
        Tree {
            nodes,
            target_class,
        }
    }

    /// Class whose score this tree contributes to (only meaningful for multiclass boosting)
    pub fn target_class(&self) -> usize {
        self.target_class
    }

    pub fn nodes(&self) -> &[Node<F>] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, Node::Leaf(_)))
            .count()
    }

    /// Length of the longest path from the root to a leaf
    pub fn max_depth(&self) -> usize {
        let mut stack = vec![(0, 0)];
        let mut depth = 0;
        while let Some((idx, d)) = stack.pop() {
            match self.nodes[idx] {
                Node::Leaf(_) => depth = depth.max(d),
                Node::Split {
                    if_true, if_false, ..
                } => {
                    stack.push((if_true, d + 1));
                    stack.push((if_false, d + 1));
                }
            }
        }
        depth
    }

    /// Leaf reached by a complete instance
    pub fn predict(&self, instance: &Instance) -> F {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf(value) => return value,
                Node::Split {
                    literal,
                    if_true,
                    if_false,
                } => {
                    idx = if instance.value(literal) {
                        if_true
                    } else {
                        if_false
                    };
                }
            }
        }
    }

    /// Literals tested on the way from the root to the leaf reached by `instance`
    pub fn path_literals(&self, instance: &Instance) -> Vec<usize> {
        let mut literals = Vec::new();
        let mut idx = 0;
        while let Node::Split {
            literal,
            if_true,
            if_false,
        } = self.nodes[idx]
        {
            literals.push(literal);
            idx = if instance.value(literal) {
                if_true
            } else {
                if_false
            };
        }
        literals
    }

    /// Smallest and largest leaf values of the whole tree
    pub fn leaf_bounds(&self) -> (F, F) {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                Node::Leaf(value) => Some(*value),
                Node::Split { .. } => None,
            })
            .fold((F::infinity(), F::neg_infinity()), |(lo, hi), value| {
                (lo.min(value), hi.max(value))
            })
    }

    /// Iterates over the leaves reachable when only the active literals are fixed
    pub fn reachable_leaves<'a>(
        &'a self,
        instance: &'a Instance,
        mask: &'a ActiveMask,
    ) -> ReachableLeaves<'a, F> {
        ReachableLeaves {
            tree: self,
            instance,
            mask,
            queue: vec![0],
        }
    }

    /// Smallest and largest reachable leaf values
    pub fn leaf_range(&self, instance: &Instance, mask: &ActiveMask) -> (F, F) {
        let mut leaves = self.reachable_leaves(instance, mask);
        // the root always reaches at least one leaf
        let first = leaves.next().unwrap_or_else(F::zero);
        leaves.fold((first, first), |(lo, hi), value| (lo.min(value), hi.max(value)))
    }

    /// Vote of the tree, stops as soon as two reachable leaves disagree
    pub fn vote(&self, instance: &Instance, mask: &ActiveMask) -> Vote {
        let mut leaves = self.reachable_leaves(instance, mask);
        let first = match leaves.next() {
            Some(value) => value,
            None => return Vote::Undetermined,
        };
        if leaves.any(|value| value != first) {
            Vote::Undetermined
        } else {
            Vote::Guaranteed(first.to_usize().unwrap_or(0))
        }
    }
}

/// Depth-first iterator over the leaf values reachable under an [`ActiveMask`]
///
/// Splits on active literals follow the branch selected by the instance, splits on free
/// literals continue in both branches.
pub struct ReachableLeaves<'a, F> {
    tree: &'a Tree<F>,
    instance: &'a Instance,
    mask: &'a ActiveMask,
    queue: Vec<usize>,
}

impl<'a, F: Float> Iterator for ReachableLeaves<'a, F> {
    type Item = F;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(idx) = self.queue.pop() {
            match self.tree.nodes[idx] {
                Node::Leaf(value) => return Some(value),
                Node::Split {
                    literal,
                    if_true,
                    if_false,
                } => {
                    if self.mask.is_active(literal) {
                        if self.instance.value(literal) {
                            self.queue.push(if_true);
                        } else {
                            self.queue.push(if_false);
                        }
                    } else {
                        self.queue.push(if_false);
                        self.queue.push(if_true);
                    }
                }
            }
        }
        None
    }
}
