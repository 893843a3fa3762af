use std::collections::{BTreeMap, HashMap};
use std::fmt;

use ndarray::{ArrayBase, Data, Ix1};

use crate::error::{Error, Result};
use crate::literal::Instance;
use crate::Float;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Comparison used by a split condition `x[feature] <op> threshold`
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `x < threshold`, the convention of gradient boosting libraries
    LessThan,
    /// `x <= threshold`, the convention of CART style trees
    LessOrEqual,
}

impl Default for Operator {
    fn default() -> Self {
        Operator::LessOrEqual
    }
}

/// A binary test on a single feature
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition<F> {
    feature: usize,
    operator: Operator,
    threshold: F,
}

impl<F: Float> Condition<F> {
    pub fn new(feature: usize, operator: Operator, threshold: F) -> Self {
        Condition {
            feature,
            operator,
            threshold,
        }
    }

    pub fn feature(&self) -> usize {
        self.feature
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn threshold(&self) -> F {
        self.threshold
    }

    /// Returns true if `value` satisfies the condition
    pub fn holds(&self, value: F) -> bool {
        match self.operator {
            Operator::LessThan => value < self.threshold,
            Operator::LessOrEqual => value <= self.threshold,
        }
    }

    /// The bound on the feature implied by the condition taking `value`
    fn bound(&self, value: bool) -> (Side, Bound<F>) {
        let inclusive = match self.operator {
            Operator::LessThan => !value,
            Operator::LessOrEqual => value,
        };
        let side = if value { Side::Upper } else { Side::Lower };
        (
            side,
            Bound {
                value: self.threshold,
                inclusive,
            },
        )
    }

    fn key(&self) -> ConditionKey {
        // adding zero folds -0.0 into 0.0
        let bits = (self.threshold + F::zero()).to_f64().unwrap_or(f64::NAN).to_bits();
        (self.feature, self.operator, bits)
    }
}

impl<F: Float> fmt::Display for Condition<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.operator {
            Operator::LessThan => "<",
            Operator::LessOrEqual => "<=",
        };
        write!(f, "x{} {} {}", self.feature, op, self.threshold)
    }
}

type ConditionKey = (usize, Operator, u64);

/// The distinct conditions tested by an ensemble
///
/// The position of a condition in the table is the index of the corresponding literal.
/// Conditions are numbered in the order in which they are first encountered during ingestion.
#[derive(Debug, Clone, Default)]
pub struct ConditionTable<F> {
    conditions: Vec<Condition<F>>,
    lookup: HashMap<ConditionKey, usize>,
}

impl<F: Float> ConditionTable<F> {
    pub fn new() -> Self {
        ConditionTable {
            conditions: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Number of literals
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Condition<F>> {
        self.conditions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition<F>> {
        self.conditions.iter()
    }

    /// Returns the literal index of `condition`, registering it if it is new
    pub fn insert(&mut self, condition: Condition<F>) -> usize {
        let next = self.conditions.len();
        let idx = *self.lookup.entry(condition.key()).or_insert(next);
        if idx == next {
            self.conditions.push(condition);
        }
        idx
    }

    pub fn index_of(&self, condition: &Condition<F>) -> Option<usize> {
        self.lookup.get(&condition.key()).copied()
    }

    /// Feature tested by the literal at `index`
    ///
    /// ### Panics
    ///
    /// If `index` is out of bounds
    pub fn feature_of(&self, index: usize) -> usize {
        self.conditions[index].feature
    }

    /// Literal indices testing `feature`, in increasing order
    pub fn literals_of(&self, feature: usize) -> Vec<usize> {
        self.conditions
            .iter()
            .enumerate()
            .filter(|(_, cond)| cond.feature == feature)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Number of features an observation needs, i.e. one more than the largest tested feature
    pub fn n_features(&self) -> usize {
        self.conditions
            .iter()
            .map(|cond| cond.feature + 1)
            .max()
            .unwrap_or(0)
    }

    /// Evaluates every condition on an observation
    pub fn binarize(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<Instance> {
        let n_features = self.n_features();
        if x.len() < n_features {
            return Err(Error::DimensionMismatch {
                expected: n_features,
                found: x.len(),
            });
        }

        Ok(Instance::new(
            self.conditions
                .iter()
                .map(|cond| cond.holds(x[cond.feature]))
                .collect(),
        ))
    }

    /// Converts a set of literals into per-feature ranges
    ///
    /// Literals on the same feature are merged and only the tightest lower and upper bounds are
    /// kept, so `x0 <= 3` makes `x0 <= 5` redundant. The result is ordered by feature.
    pub fn to_features(
        &self,
        instance: &Instance,
        literals: impl IntoIterator<Item = usize>,
    ) -> Result<Vec<FeatureRange<F>>> {
        instance.check_len(self.len())?;

        let mut ranges: BTreeMap<usize, FeatureRange<F>> = BTreeMap::new();
        for idx in literals {
            let cond = self.conditions.get(idx).ok_or(Error::DimensionMismatch {
                expected: self.len(),
                found: idx + 1,
            })?;
            let (side, bound) = cond.bound(instance.value(idx));
            let range = ranges
                .entry(cond.feature)
                .or_insert_with(|| FeatureRange::unbounded(cond.feature));
            match side {
                Side::Lower => range.tighten_lower(bound),
                Side::Upper => range.tighten_upper(bound),
            }
        }

        Ok(ranges.into_values().collect())
    }
}

enum Side {
    Lower,
    Upper,
}

/// One end of a feature range
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound<F> {
    pub value: F,
    pub inclusive: bool,
}

/// The values of a feature compatible with a set of literals
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRange<F> {
    pub feature: usize,
    pub lower: Option<Bound<F>>,
    pub upper: Option<Bound<F>>,
}

impl<F: Float> FeatureRange<F> {
    fn unbounded(feature: usize) -> Self {
        FeatureRange {
            feature,
            lower: None,
            upper: None,
        }
    }

    fn tighten_lower(&mut self, bound: Bound<F>) {
        let tighter = match self.lower {
            None => true,
            Some(cur) => {
                bound.value > cur.value || (bound.value == cur.value && !bound.inclusive)
            }
        };
        if tighter {
            self.lower = Some(bound);
        }
    }

    fn tighten_upper(&mut self, bound: Bound<F>) {
        let tighter = match self.upper {
            None => true,
            Some(cur) => {
                bound.value < cur.value || (bound.value == cur.value && !bound.inclusive)
            }
        };
        if tighter {
            self.upper = Some(bound);
        }
    }

    /// Returns true if `value` lies in the range
    pub fn contains(&self, value: F) -> bool {
        let above = match self.lower {
            None => true,
            Some(b) if b.inclusive => value >= b.value,
            Some(b) => value > b.value,
        };
        let below = match self.upper {
            None => true,
            Some(b) if b.inclusive => value <= b.value,
            Some(b) => value < b.value,
        };
        above && below
    }
}

impl<F: Float> fmt::Display for FeatureRange<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(lower) = self.lower {
            let op = if lower.inclusive { "<=" } else { "<" };
            write!(f, "{} {} ", lower.value, op)?;
        }
        write!(f, "x{}", self.feature)?;
        if let Some(upper) = self.upper {
            let op = if upper.inclusive { "<=" } else { "<" };
            write!(f, " {} {}", op, upper.value)?;
        }
        Ok(())
    }
}
