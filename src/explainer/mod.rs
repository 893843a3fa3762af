//! Search for sufficient reasons
//!
//! A search starts from the full set of literals of an instance, which trivially forces the
//! prediction, and walks the literals one after the other. A literal is removed whenever the
//! remaining ones still force the prediction. The result of such a pass is locally minimal with
//! respect to the order of the walk: no kept literal can be removed on its own.
//!
//! [`Explainer::compute_reason_conditions`] repeats this walk with random orders and keeps the
//! smallest reason, [`Explainer::compute_reason_features`] walks the literals of a set of
//! features once.
mod hyperparams;
mod search;

use std::collections::BTreeSet;
use std::convert::TryFrom;
use std::time::Instant;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use tracing::{debug, info, warn};

use crate::ensemble::{Ensemble, EnsembleKind};
use crate::error::{Error, Result};
use crate::literal::Instance;
use crate::oracle::Target;
use crate::reason::Reason;
use crate::theory::{ClauseTheory, Propagator};
use crate::{Float, ParamGuard};

pub use hyperparams::*;
use search::Search;

/// Computes sufficient reasons for the predictions of an ensemble
///
/// An explainer owns the ensemble, the search configuration and an optional background theory.
/// Queries take the instance and the prediction to explain, which is a class index for
/// classifiers. Regression ensembles are explained with prediction `0` and keep their output
/// inside the [target range](ExplainerParams::target_range), or equal to the predicted value if
/// no range is configured.
///
/// ### Example
///
/// ```rust
/// use linfa_explain::prelude::*;
/// use linfa_explain::ensemble::{Operator, RawNode, RawTree};
/// use ndarray::array;
///
/// let mut ensemble = Ensemble::forest_binary();
/// for feature in 0..3 {
///     ensemble.add_tree(&RawTree::new(RawNode::split(
///         feature,
///         Operator::LessOrEqual,
///         0.5,
///         RawNode::leaf(1.0),
///         RawNode::leaf(0.0),
///     )))?;
/// }
///
/// let params = ExplainerParams::new().retry_count(10).protect_features(vec![2]);
/// let mut explainer = Explainer::with_params(ensemble, params)?;
///
/// let instance = explainer.ensemble().binarize(&array![0.0, 0.0, 0.0])?;
/// let reason = explainer.compute_reason_conditions(&instance, 1, 7)?;
///
/// // two votes out of three decide the forest, one of them is protected
/// assert_eq!(reason.len(), 2);
/// assert!(reason.contains(2));
/// # Ok::<(), linfa_explain::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Explainer<F, P = ClauseTheory> {
    ensemble: Ensemble<F>,
    params: ExplainerValidParams<F>,
    propagator: Option<P>,
}

impl<F: Float> Explainer<F> {
    /// Creates an explainer with default parameters and no background theory
    pub fn new(ensemble: Ensemble<F>) -> Self {
        Explainer {
            ensemble,
            params: ExplainerParams::default().check_unwrap(),
            propagator: None,
        }
    }

    pub fn with_params(ensemble: Ensemble<F>, params: ExplainerParams<F>) -> Result<Self> {
        Ok(Explainer {
            ensemble,
            params: params.check()?,
            propagator: None,
        })
    }
}

impl<F: Float, P: Propagator> Explainer<F, P> {
    /// Attaches a background theory, consulted for every tentative removal
    pub fn with_propagator<Q: Propagator>(self, propagator: Q) -> Result<Explainer<F, Q>> {
        propagator.check(self.ensemble.n_literals())?;

        Ok(Explainer {
            ensemble: self.ensemble,
            params: self.params,
            propagator: Some(propagator),
        })
    }

    pub fn ensemble(&self) -> &Ensemble<F> {
        &self.ensemble
    }

    pub fn params(&self) -> &ExplainerValidParams<F> {
        &self.params
    }

    pub fn propagator(&self) -> Option<&P> {
        self.propagator.as_ref()
    }

    /// Applies `update` to a copy of the parameters and keeps it only if it passes the checks
    fn update_params(
        &mut self,
        update: impl FnOnce(ExplainerParams<F>) -> ExplainerParams<F>,
    ) -> Result<()> {
        let params = update(ExplainerParams::from(self.params.clone())).check()?;
        self.params = params;
        Ok(())
    }

    /// Sets the number of randomized passes of [`compute_reason_conditions`](Self::compute_reason_conditions)
    ///
    /// A negative count is rejected and the previous value is kept.
    pub fn set_retry_count(&mut self, retry_count: i64) -> Result<()> {
        let retry_count = usize::try_from(retry_count).map_err(|_| {
            Error::InvalidConfiguration(format!(
                "retry count should be non-negative, but was {}",
                retry_count
            ))
        })?;
        self.update_params(|params| params.retry_count(retry_count))
    }

    /// Sets the wall clock budget in seconds, `0` leaves only the retry count
    ///
    /// A negative or non-finite limit is rejected and the previous value is kept.
    pub fn set_time_limit(&mut self, seconds: f64) -> Result<()> {
        self.update_params(|params| params.time_limit(seconds))
    }

    pub fn set_max_removal_attempts(&mut self, max_removal_attempts: Option<usize>) -> Result<()> {
        self.update_params(|params| params.max_removal_attempts(max_removal_attempts))
    }

    /// Sets the interval a regression ensemble has to stay in
    pub fn set_target_range(&mut self, lower: F, upper: F) -> Result<()> {
        self.update_params(|params| params.target_range(lower, upper))
    }

    /// Protects literals for every following query
    pub fn protect_literals(&mut self, literals: impl IntoIterator<Item = usize>) -> Result<()> {
        self.update_params(|params| params.protect_literals(literals))
    }

    /// Protects every literal of the given features for every following query
    pub fn protect_features(&mut self, features: impl IntoIterator<Item = usize>) -> Result<()> {
        self.update_params(|params| params.protect_features(features))
    }

    pub fn clear_protected(&mut self) -> Result<()> {
        self.update_params(|params| params.clear_protected())
    }

    /// Returns true if the search may remove `literal`, that is neither the literal nor its
    /// feature is protected
    pub fn is_free_to_remove(&self, literal: usize) -> bool {
        if self.params.protected_literals().contains(&literal) {
            return false;
        }
        match self.ensemble.conditions().get(literal) {
            Some(condition) => !self
                .params
                .protected_features()
                .contains(&condition.feature()),
            None => true,
        }
    }

    /// Class predicted for a complete instance
    pub fn predict(&self, instance: &Instance) -> Result<usize> {
        self.ensemble.predict(instance)
    }

    /// Translates a prediction into the target the reason has to force
    fn target(&self, instance: &Instance, prediction: usize) -> Result<Target<F>> {
        let target = match self.ensemble.kind() {
            EnsembleKind::BoostedRegression => {
                if prediction != 0 {
                    return Err(Error::InvalidClass {
                        class: prediction,
                        n_classes: 1,
                    });
                }
                let (lower, upper) = match self.params.target_range() {
                    Some(range) => range,
                    None => {
                        let value = self.ensemble.predict_value(instance)?;
                        (value, value)
                    }
                };
                Target::Range { lower, upper }
            }
            _ => Target::Class(prediction),
        };
        target.check(&self.ensemble)?;

        Ok(target)
    }

    /// Computes a locally minimal reason with randomized passes
    ///
    /// The permutations of the passes are drawn from a [`Xoshiro256Plus`] generator seeded with
    /// `seed`, so the same seed reproduces the same reason.
    pub fn compute_reason_conditions(
        &mut self,
        instance: &Instance,
        prediction: usize,
        seed: u64,
    ) -> Result<Reason> {
        let mut rng = Xoshiro256Plus::seed_from_u64(seed);
        self.compute_reason_conditions_with_rng(instance, prediction, &mut rng)
    }

    /// Computes a locally minimal reason with permutations drawn from `rng`
    ///
    /// Protected literals come first in the reason, followed by the kept literals of the best
    /// pass in the order they were committed. The first pass always runs to completion. Later
    /// passes are only started before the time limit and discarded if they are cut by it.
    pub fn compute_reason_conditions_with_rng<R: Rng + ?Sized>(
        &mut self,
        instance: &Instance,
        prediction: usize,
        rng: &mut R,
    ) -> Result<Reason> {
        self.ensemble.check_instance(instance)?;
        let target = self.target(instance, prediction)?;

        let (protected, candidates): (Vec<usize>, Vec<usize>) =
            (0..self.ensemble.n_literals()).partition(|literal| !self.is_free_to_remove(*literal));

        let start = Instant::now();
        // a deadline beyond the range of `Instant` is unbounded
        let deadline = self
            .params
            .time_budget()
            .and_then(|budget| start.checked_add(budget));
        let retry_count = self.params.retry_count();

        let mut search = Search::new(
            &self.ensemble,
            instance,
            target,
            self.propagator.as_mut(),
            self.params.max_removal_attempts(),
        );
        if !search.is_sufficient(&self.ensemble.full_mask()) {
            return Err(Error::TargetNotForced(format!("{:?}", target)));
        }

        let mut best: Option<Vec<usize>> = None;
        let mut passes = 0;
        for pass in 0..retry_count {
            let pass_deadline = if pass == 0 { None } else { deadline };
            if pass_deadline.map_or(false, |deadline| Instant::now() >= deadline) {
                break;
            }

            let mut order = candidates.clone();
            order.shuffle(rng);

            let kept = match search.shrink(&order, pass_deadline) {
                Some(kept) => kept,
                None => {
                    warn!(pass, "time limit reached, interrupted pass is discarded");
                    break;
                }
            };
            passes += 1;
            debug!(pass, size = kept.len(), "shrinking pass completed");

            if best.as_ref().map_or(true, |best| kept.len() < best.len()) {
                best = Some(kept);
            }
            if best.as_ref().map_or(false, Vec::is_empty) {
                break;
            }
        }

        let kept = best.unwrap_or(candidates);
        let reason = Reason::new(protected.into_iter().chain(kept).collect());
        info!(
            passes,
            size = reason.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "reason computed"
        );

        Ok(reason)
    }

    /// Computes a reason which only removes literals of `features`
    ///
    /// A single deterministic pass visits the features in the given order and the literals of
    /// each feature in index order. Every literal of another feature is protected for this call.
    pub fn compute_reason_features(
        &mut self,
        instance: &Instance,
        features: &[usize],
        prediction: usize,
    ) -> Result<Reason> {
        self.ensemble.check_instance(instance)?;
        let target = self.target(instance, prediction)?;

        let mut seen = BTreeSet::new();
        let mut candidates = Vec::new();
        for feature in features {
            if seen.insert(*feature) {
                candidates.extend(
                    self.ensemble
                        .conditions()
                        .literals_of(*feature)
                        .into_iter()
                        .filter(|literal| self.is_free_to_remove(*literal)),
                );
            }
        }
        let free: BTreeSet<usize> = candidates.iter().copied().collect();
        let protected = (0..self.ensemble.n_literals()).filter(|literal| !free.contains(literal));

        let mut search = Search::new(
            &self.ensemble,
            instance,
            target,
            self.propagator.as_mut(),
            self.params.max_removal_attempts(),
        );
        if !search.is_sufficient(&self.ensemble.full_mask()) {
            return Err(Error::TargetNotForced(format!("{:?}", target)));
        }

        let kept = search
            .shrink(&candidates, None)
            .unwrap_or_else(|| candidates.clone());
        debug!(
            candidates = candidates.len(),
            size = kept.len(),
            "restricted pass completed"
        );

        Ok(Reason::new(protected.chain(kept).collect()))
    }

    /// Checks whether fixing the literals of `reason` forces `prediction`
    pub fn is_reason(
        &mut self,
        instance: &Instance,
        reason: &Reason,
        prediction: usize,
    ) -> Result<bool> {
        self.ensemble.check_instance(instance)?;
        let target = self.target(instance, prediction)?;

        let n_literals = self.ensemble.n_literals();
        if let Some(literal) = reason.iter().find(|literal| *literal >= n_literals) {
            return Err(Error::InvalidConfiguration(format!(
                "literal {} is not part of an encoding with {} literals",
                literal, n_literals
            )));
        }

        let mut search = Search::new(
            &self.ensemble,
            instance,
            target,
            self.propagator.as_mut(),
            None,
        );
        Ok(search.is_sufficient(&reason.to_mask(n_literals)))
    }

    /// The literals tested on the decision paths of `instance`, without any search
    ///
    /// Returns `None` if one of them is protected.
    pub fn direct_reason(&self, instance: &Instance) -> Result<Option<Reason>> {
        let literals = self.ensemble.path_literals(instance)?;
        if literals.iter().all(|literal| self.is_free_to_remove(*literal)) {
            Ok(Some(Reason::new(literals)))
        } else {
            Ok(None)
        }
    }

    /// Interval covering every output of a regression or binary boosted ensemble, see
    /// [`Ensemble::extremum_range`]
    pub fn extremum_range(&self) -> Result<(F, F)> {
        self.ensemble.extremum_range()
    }
}
