//! Explanations returned by the [`Explainer`](crate::Explainer)

use std::fmt;

use crate::literal::{ActiveMask, Instance, Literal};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// A sufficient subset of the literals of an instance
///
/// Fixing these literals to their values in the instance forces the explained prediction. The
/// indices are kept in the order in which the search committed them.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Reason {
    indices: Vec<usize>,
}

impl Reason {
    pub fn new(indices: Vec<usize>) -> Self {
        Reason { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Literal indices in commit order
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    /// Literals of the reason, with the polarity they take in `instance`
    pub fn literals(&self, instance: &Instance) -> Vec<Literal> {
        self.iter().map(|idx| instance.literal(idx)).collect()
    }

    /// Mask fixing exactly the literals of the reason
    pub fn to_mask(&self, n_literals: usize) -> ActiveMask {
        ActiveMask::from_indices(n_literals, self.iter())
    }

    /// Indices in increasing order
    pub fn sorted(&self) -> Vec<usize> {
        let mut sorted = self.indices.clone();
        sorted.sort_unstable();
        sorted
    }
}

impl From<Vec<usize>> for Reason {
    fn from(indices: Vec<usize>) -> Self {
        Reason::new(indices)
    }
}

impl<'a> IntoIterator for &'a Reason {
    type Item = usize;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, usize>>;

    fn into_iter(self) -> Self::IntoIter {
        self.indices.iter().copied()
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, idx) in self.indices.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "l{}", idx)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_keeps_commit_order() {
        let reason = Reason::new(vec![3, 0, 2]);
        assert_eq!(reason.indices(), &[3, 0, 2]);
        assert_eq!(reason.sorted(), vec![0, 2, 3]);
        assert_eq!(format!("{}", reason), "{l3, l0, l2}");
        assert!(reason.contains(2) && !reason.contains(1));
    }

    #[test]
    fn reason_to_mask_and_literals() {
        let reason = Reason::new(vec![2, 0]);
        let mask = reason.to_mask(4);
        assert_eq!(mask.active_indices().collect::<Vec<_>>(), vec![0, 2]);

        let instance = Instance::new(vec![false, true, true, false]);
        assert_eq!(
            reason.literals(&instance),
            vec![Literal::positive(2), Literal::negative(0)]
        );
    }
}
