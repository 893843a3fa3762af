//! Background theories over literals
//!
//! The literals of an instance are usually not independent: `x0 <= 3` implies `x0 <= 5`, and
//! the indicator literals of a one-hot encoded feature are mutually exclusive. A [`Propagator`]
//! tells the [`Explainer`](crate::Explainer) which literals are implied by the ones that are
//! fixed, so that only assignments consistent with the theory have to be covered by a reason.

use std::collections::BTreeMap;

use tracing::trace;

use crate::ensemble::{Condition, ConditionTable, Operator};
use crate::error::{Error, Result};
use crate::literal::{ActiveMask, Instance, Literal};
use crate::Float;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Consistency checker consulted for every tentative removal of a literal
pub trait Propagator {
    /// Fixes every literal implied by the active ones
    ///
    /// Returns `false` if the active literals contradict the theory, in which case the content
    /// of `mask` is unspecified.
    fn propagate(&mut self, instance: &Instance, mask: &mut ActiveMask) -> bool;

    /// Checks that the theory only refers to literals of an encoding with `n_literals` literals
    fn check(&self, _n_literals: usize) -> Result<()> {
        Ok(())
    }
}

/// A theory in conjunctive normal form, propagated with unit propagation
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClauseTheory {
    clauses: Vec<Vec<Literal>>,
}

impl ClauseTheory {
    pub fn new() -> Self {
        ClauseTheory {
            clauses: Vec::new(),
        }
    }

    /// Adds the disjunction of `clause`
    pub fn add_clause(&mut self, clause: Vec<Literal>) -> Result<()> {
        if clause.is_empty() {
            return Err(Error::InvalidConfiguration(
                "a theory cannot contain the empty clause".into(),
            ));
        }
        self.clauses.push(clause);
        Ok(())
    }

    /// At most one of the literals at `indices` holds
    pub fn at_most_one(&mut self, indices: &[usize]) {
        for (i, a) in indices.iter().enumerate() {
            for b in &indices[i + 1..] {
                self.clauses
                    .push(vec![Literal::negative(*a), Literal::negative(*b)]);
            }
        }
    }

    /// Exactly one of the literals at `indices` holds, as in a one-hot encoded feature
    pub fn exactly_one(&mut self, indices: &[usize]) -> Result<()> {
        self.add_clause(indices.iter().map(|idx| Literal::positive(*idx)).collect())?;
        self.at_most_one(indices);
        Ok(())
    }

    /// Implications between the conditions testing the same feature
    ///
    /// For every pair of conditions where the first one entails the second one, like `x <= 3`
    /// and `x <= 5`, the clause `¬(x <= 3) ∨ (x <= 5)` is added.
    pub fn from_conditions<F: Float>(conditions: &ConditionTable<F>) -> Self {
        let mut by_feature: BTreeMap<usize, Vec<(usize, &Condition<F>)>> = BTreeMap::new();
        for (idx, cond) in conditions.iter().enumerate() {
            by_feature.entry(cond.feature()).or_default().push((idx, cond));
        }

        let mut theory = ClauseTheory::new();
        for group in by_feature.values() {
            for (a, cond_a) in group {
                for (b, cond_b) in group {
                    if a != b && entails(cond_a, cond_b) {
                        theory
                            .clauses
                            .push(vec![Literal::negative(*a), Literal::positive(*b)]);
                    }
                }
            }
        }
        theory
    }

    pub fn clauses(&self) -> &[Vec<Literal>] {
        &self.clauses
    }

    pub fn n_clauses(&self) -> usize {
        self.clauses.len()
    }
}

/// Returns true if `a` holding implies that `b` holds, both testing the same feature
fn entails<F: Float>(a: &Condition<F>, b: &Condition<F>) -> bool {
    let (ta, tb) = (a.threshold(), b.threshold());
    match (a.operator(), b.operator()) {
        (Operator::LessOrEqual, Operator::LessThan) => ta < tb,
        (Operator::LessThan, _) | (_, Operator::LessOrEqual) => ta <= tb,
    }
}

enum ClauseState {
    Satisfied,
    Conflict,
    Unit(Literal),
    Open,
}

impl ClauseTheory {
    fn clause_state(clause: &[Literal], instance: &Instance, mask: &ActiveMask) -> ClauseState {
        let mut unassigned = None;
        let mut n_unassigned = 0;
        for lit in clause {
            if mask.is_active(lit.index()) {
                if instance.value(lit.index()) == lit.is_positive() {
                    return ClauseState::Satisfied;
                }
            } else {
                n_unassigned += 1;
                unassigned = Some(*lit);
            }
        }
        match (n_unassigned, unassigned) {
            (0, _) => ClauseState::Conflict,
            (1, Some(lit)) => ClauseState::Unit(lit),
            _ => ClauseState::Open,
        }
    }
}

impl Propagator for ClauseTheory {
    fn propagate(&mut self, instance: &Instance, mask: &mut ActiveMask) -> bool {
        let mut changed = true;
        while changed {
            changed = false;
            for clause in &self.clauses {
                match Self::clause_state(clause, instance, mask) {
                    ClauseState::Satisfied | ClauseState::Open => {}
                    ClauseState::Conflict => return false,
                    ClauseState::Unit(lit) => {
                        // the instance itself violates the theory
                        if instance.value(lit.index()) != lit.is_positive() {
                            return false;
                        }
                        trace!(literal = %lit, "literal implied by theory");
                        mask.activate(lit.index());
                        changed = true;
                    }
                }
            }
        }
        true
    }

    fn check(&self, n_literals: usize) -> Result<()> {
        match self
            .clauses
            .iter()
            .flatten()
            .find(|lit| lit.index() >= n_literals)
        {
            Some(lit) => Err(Error::InvalidConfiguration(format!(
                "theory refers to literal {} but the encoding has {} literals",
                lit.index(),
                n_literals
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_hot_group_implies_the_other_indicators() {
        let mut theory = ClauseTheory::new();
        theory.exactly_one(&[0, 1, 2]).unwrap();
        assert_eq!(theory.n_clauses(), 4);

        // color = green
        let instance = Instance::new(vec![false, true, false]);
        let mut mask = ActiveMask::from_indices(3, vec![1]);
        assert!(theory.propagate(&instance, &mut mask));
        assert_eq!(mask.n_active(), 3);

        // knowing that it is neither red nor blue implies green
        let mut mask = ActiveMask::from_indices(3, vec![0, 2]);
        assert!(theory.propagate(&instance, &mut mask));
        assert!(mask.is_active(1));

        let mut mask = ActiveMask::from_indices(3, vec![0]);
        assert!(theory.propagate(&instance, &mut mask));
        assert_eq!(mask.n_active(), 1);
    }

    #[test]
    fn violated_theory_is_reported() {
        let mut theory = ClauseTheory::new();
        theory.at_most_one(&[0, 1]);

        let instance = Instance::new(vec![true, true]);
        let mut mask = ActiveMask::all(2);
        assert!(!theory.propagate(&instance, &mut mask));

        let mut mask = ActiveMask::from_indices(2, vec![0]);
        assert!(!theory.propagate(&instance, &mut mask));
    }

    #[test]
    fn thresholds_on_same_feature_are_ordered() {
        let mut table = ConditionTable::new();
        table.insert(Condition::new(0, Operator::LessOrEqual, 5.0));
        table.insert(Condition::new(0, Operator::LessOrEqual, 3.0));
        table.insert(Condition::new(1, Operator::LessOrEqual, 3.0));
        table.insert(Condition::new(0, Operator::LessThan, 3.0));

        let theory = ClauseTheory::from_conditions(&table);
        // x0 <= 3 => x0 <= 5, x0 < 3 => x0 <= 3, x0 < 3 => x0 <= 5
        assert_eq!(theory.n_clauses(), 3);
        assert!(theory
            .clauses()
            .contains(&vec![Literal::negative(1), Literal::positive(0)]));
        assert!(theory
            .clauses()
            .contains(&vec![Literal::negative(3), Literal::positive(1)]));

        // x0 = 2: fixing x0 < 3 fixes the weaker conditions
        let mut theory = theory;
        let instance = Instance::new(vec![true, true, true, true]);
        let mut mask = ActiveMask::from_indices(4, vec![3]);
        assert!(theory.propagate(&instance, &mut mask));
        assert_eq!(mask.active_indices().collect::<Vec<_>>(), vec![0, 1, 3]);

        // x0 = 4: not(x0 <= 3) implies not(x0 < 3)
        let instance = Instance::new(vec![true, false, true, false]);
        let mut mask = ActiveMask::from_indices(4, vec![1]);
        assert!(theory.propagate(&instance, &mut mask));
        assert_eq!(mask.active_indices().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn literals_must_exist() {
        let mut theory = ClauseTheory::new();
        theory.at_most_one(&[0, 4]);
        assert!(theory.check(5).is_ok());
        assert!(matches!(
            theory.check(4),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(theory.add_clause(vec![]).is_err());
    }
}
