//! Boolean encoding of an observation
//!
//! Every distinct split condition of an ensemble becomes a literal. An [`Instance`] stores, for
//! each literal, whether its condition holds for the explained observation, and an
//! [`ActiveMask`] records which of these values are fixed while searching for a reason.

use std::fmt;

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// A condition together with the truth value it takes
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    index: usize,
    positive: bool,
}

impl Literal {
    pub fn new(index: usize, positive: bool) -> Self {
        Literal { index, positive }
    }

    pub fn positive(index: usize) -> Self {
        Literal::new(index, true)
    }

    pub fn negative(index: usize) -> Self {
        Literal::new(index, false)
    }

    /// Position of the underlying condition in the condition table
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns true if the condition holds
    pub fn is_positive(&self) -> bool {
        self.positive
    }

    /// The literal over the same condition with the opposite truth value
    pub fn negate(self) -> Self {
        Literal::new(self.index, !self.positive)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.positive {
            write!(f, "l{}", self.index)
        } else {
            write!(f, "¬l{}", self.index)
        }
    }
}

/// Truth values of all literals for a single observation
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instance {
    values: Vec<bool>,
}

impl Instance {
    pub fn new(values: Vec<bool>) -> Self {
        Instance { values }
    }

    /// Number of literals in the encoding
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Truth value of the literal at `index`
    ///
    /// ### Panics
    ///
    /// If `index` is out of bounds
    pub fn value(&self, index: usize) -> bool {
        self.values[index]
    }

    pub fn values(&self) -> &[bool] {
        &self.values
    }

    /// The literal at `index`, with the polarity taken by this instance
    pub fn literal(&self, index: usize) -> Literal {
        Literal::new(index, self.values[index])
    }

    pub fn literals(&self) -> impl Iterator<Item = Literal> + '_ {
        (0..self.len()).map(move |idx| self.literal(idx))
    }

    /// Returns an error if the instance does not have `expected` literals
    pub fn check_len(&self, expected: usize) -> Result<()> {
        if self.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                found: self.len(),
            });
        }
        Ok(())
    }
}

impl From<Vec<bool>> for Instance {
    fn from(values: Vec<bool>) -> Self {
        Instance::new(values)
    }
}

/// Tracks which literals of an instance are fixed
///
/// A `true` entry means that the literal keeps the value it has in the instance, a `false` entry
/// means that the literal may take both truth values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActiveMask {
    mask: Vec<bool>,
    n_active: usize,
}

impl ActiveMask {
    /// Generates a mask where every literal is fixed
    pub fn all(n_literals: usize) -> Self {
        ActiveMask {
            mask: vec![true; n_literals],
            n_active: n_literals,
        }
    }

    /// Generates a mask where every literal is free
    pub fn none(n_literals: usize) -> Self {
        ActiveMask {
            mask: vec![false; n_literals],
            n_active: 0,
        }
    }

    /// Generates a mask fixing only the given literals
    ///
    /// ### Panics
    ///
    /// If an index is out of bounds
    pub fn from_indices(n_literals: usize, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut mask = ActiveMask::none(n_literals);
        for idx in indices {
            mask.activate(idx);
        }
        mask
    }

    pub fn len(&self) -> usize {
        self.mask.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    /// Number of fixed literals
    pub fn n_active(&self) -> usize {
        self.n_active
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.mask[index]
    }

    pub fn activate(&mut self, index: usize) {
        if !self.mask[index] {
            self.mask[index] = true;
            self.n_active += 1;
        }
    }

    pub fn deactivate(&mut self, index: usize) {
        if self.mask[index] {
            self.mask[index] = false;
            self.n_active -= 1;
        }
    }

    /// Indices of the fixed literals, in increasing order
    pub fn active_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.mask
            .iter()
            .enumerate()
            .filter_map(|(idx, active)| if *active { Some(idx) } else { None })
    }
}
