use std::time::Instant;

use tracing::trace;

use crate::ensemble::Ensemble;
use crate::literal::{ActiveMask, Instance};
use crate::oracle::{is_implicant, Target};
use crate::theory::Propagator;
use crate::Float;

/// State shared by the shrinking passes of a single query
pub(crate) struct Search<'a, F, P> {
    ensemble: &'a Ensemble<F>,
    instance: &'a Instance,
    target: Target<F>,
    propagator: Option<&'a mut P>,
    max_attempts: Option<usize>,
}

impl<'a, F: Float, P: Propagator> Search<'a, F, P> {
    pub fn new(
        ensemble: &'a Ensemble<F>,
        instance: &'a Instance,
        target: Target<F>,
        propagator: Option<&'a mut P>,
        max_attempts: Option<usize>,
    ) -> Self {
        Search {
            ensemble,
            instance,
            target,
            propagator,
            max_attempts,
        }
    }

    /// Tests whether the literals fixed by `mask`, together with the literals implied by the
    /// theory, force the target
    pub fn is_sufficient(&mut self, mask: &ActiveMask) -> bool {
        match self.propagator.as_deref_mut() {
            None => is_implicant(self.ensemble, self.instance, mask, &self.target),
            Some(propagator) => {
                let mut implied = mask.clone();
                propagator.propagate(self.instance, &mut implied)
                    && is_implicant(self.ensemble, self.instance, &implied, &self.target)
            }
        }
    }

    /// Walks `order` starting from the full mask and removes every literal whose removal keeps
    /// the target forced
    ///
    /// Returns the kept literals of `order` in commit order, or `None` if `deadline` passed
    /// before the walk was complete.
    pub fn shrink(&mut self, order: &[usize], deadline: Option<Instant>) -> Option<Vec<usize>> {
        let mut mask = self.ensemble.full_mask();
        let mut kept = Vec::new();

        for (pos, &literal) in order.iter().enumerate() {
            if deadline.map_or(false, |deadline| Instant::now() >= deadline) {
                return None;
            }
            if self.max_attempts.map_or(false, |max| pos >= max) {
                // out of attempts, the rest stays fixed
                kept.extend_from_slice(&order[pos..]);
                break;
            }

            mask.deactivate(literal);
            if self.is_sufficient(&mask) {
                trace!(literal, "literal removed");
            } else {
                mask.activate(literal);
                kept.push(literal);
                trace!(literal, "literal kept");
            }
        }

        Some(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::{Operator, RawNode, RawTree};
    use crate::theory::ClauseTheory;
    use ndarray::array;
    use std::time::Duration;

    fn ensemble() -> Ensemble<f64> {
        let mut ensemble = Ensemble::boosted_binary();
        for (feature, weight) in [(0, 1.0), (1, 0.5), (2, 0.5)].iter() {
            ensemble
                .add_tree(&RawTree::new(RawNode::split(
                    *feature,
                    Operator::LessOrEqual,
                    0.0,
                    RawNode::leaf(*weight),
                    RawNode::leaf(-*weight),
                )))
                .unwrap();
        }
        ensemble
    }

    #[test]
    fn shrink_depends_on_order() {
        let ensemble = ensemble();
        let instance = ensemble.binarize(&array![-1.0, -1.0, -1.0]).unwrap();
        let mut search: Search<f64, ClauseTheory> =
            Search::new(&ensemble, &instance, Target::Class(1), None, None);

        // 1.0 alone balances 0.5 + 0.5
        assert_eq!(search.shrink(&[1, 2, 0], None), Some(vec![0]));
        // dropping l0 first forces to keep both others
        assert_eq!(search.shrink(&[0, 1, 2], None), Some(vec![1, 2]));
        assert_eq!(search.shrink(&[], None), Some(vec![]));
    }

    #[test]
    fn attempts_are_capped() {
        let ensemble = ensemble();
        let instance = ensemble.binarize(&array![-1.0, -1.0, -1.0]).unwrap();
        let mut search: Search<f64, ClauseTheory> =
            Search::new(&ensemble, &instance, Target::Class(1), None, Some(1));

        assert_eq!(search.shrink(&[1, 2, 0], None), Some(vec![2, 0]));
    }

    #[test]
    fn passed_deadline_interrupts() {
        let ensemble = ensemble();
        let instance = ensemble.binarize(&array![-1.0, -1.0, -1.0]).unwrap();
        let mut search: Search<f64, ClauseTheory> =
            Search::new(&ensemble, &instance, Target::Class(1), None, None);

        let deadline = Instant::now() - Duration::from_millis(1);
        assert_eq!(search.shrink(&[1, 2, 0], Some(deadline)), None);
    }

    #[test]
    fn theory_can_fix_removed_literals() {
        let ensemble = ensemble();
        let instance = ensemble.binarize(&array![-1.0, -1.0, -1.0]).unwrap();

        // l1 holds whenever l2 holds
        let mut theory = ClauseTheory::new();
        theory
            .add_clause(vec![
                crate::Literal::negative(2),
                crate::Literal::positive(1),
            ])
            .unwrap();

        let mask = ActiveMask::from_indices(3, vec![2]);
        let mut search: Search<f64, ClauseTheory> =
            Search::new(&ensemble, &instance, Target::Class(1), None, None);
        assert!(!search.is_sufficient(&mask));

        let mut search = Search::new(
            &ensemble,
            &instance,
            Target::Class(1),
            Some(&mut theory),
            None,
        );
        assert!(search.is_sufficient(&mask));
    }
}
