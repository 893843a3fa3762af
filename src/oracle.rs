//! Implicant oracle
//!
//! Decides whether the literals fixed by an [`ActiveMask`] force the prediction of an ensemble,
//! whatever values the free literals take. The check is conservative: every tree is evaluated on
//! its own, so a `true` answer is always sound while a `false` answer may be pessimistic when a
//! free literal is tested in several trees.
//!
//! Accumulators are local to every call, so an ensemble can be shared between threads.

use crate::ensemble::{Ensemble, EnsembleKind, Vote};
use crate::error::{Error, Result};
use crate::literal::{ActiveMask, Instance};
use crate::Float;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Prediction that an explanation has to preserve
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target<F> {
    /// Class predicted by a classifier
    Class(usize),
    /// Interval the output of a regression ensemble has to stay in
    Range { lower: F, upper: F },
}

impl<F: Float> Target<F> {
    /// Checks that the target is meaningful for `ensemble`
    pub fn check(&self, ensemble: &Ensemble<F>) -> Result<()> {
        match (ensemble.kind(), self) {
            (EnsembleKind::BoostedRegression, Target::Range { lower, upper }) => {
                if lower.is_nan() || upper.is_nan() || lower > upper {
                    Err(Error::InvalidConfiguration(format!(
                        "target range [{}, {}] is empty",
                        lower, upper
                    )))
                } else {
                    Ok(())
                }
            }
            (EnsembleKind::BoostedRegression, Target::Class(_)) => Err(Error::UnsupportedKind(
                "regression ensembles are explained with a target range".into(),
            )),
            (_, Target::Class(class)) if *class >= ensemble.n_classes() => {
                Err(Error::InvalidClass {
                    class: *class,
                    n_classes: ensemble.n_classes(),
                })
            }
            (_, Target::Class(_)) => Ok(()),
            (kind, Target::Range { .. }) => Err(Error::UnsupportedKind(format!(
                "{:?} ensembles are explained with a target class",
                kind
            ))),
        }
    }
}

/// Returns true if fixing the active literals of `instance` forces `target`
///
/// A target that does not fit the ensemble (see [`Target::check`]) is never forced.
pub fn is_implicant<F: Float>(
    ensemble: &Ensemble<F>,
    instance: &Instance,
    mask: &ActiveMask,
    target: &Target<F>,
) -> bool {
    match (ensemble.kind(), *target) {
        (EnsembleKind::BoostedBinary, Target::Class(class)) => {
            boosted_binary(ensemble, instance, mask, class)
        }
        (EnsembleKind::BoostedMulticlass, Target::Class(class)) => {
            boosted_multiclass(ensemble, instance, mask, class)
        }
        (EnsembleKind::BoostedRegression, Target::Range { lower, upper }) => {
            boosted_regression(ensemble, instance, mask, lower, upper)
        }
        (EnsembleKind::ForestBinary, Target::Class(class))
        | (EnsembleKind::ForestMulticlass, Target::Class(class)) => {
            forest(ensemble, instance, mask, class)
        }
        _ => false,
    }
}

/// Bounds of `base + Σ tree outputs` over every completion of the free literals
fn margin_bounds<F: Float>(ensemble: &Ensemble<F>, instance: &Instance, mask: &ActiveMask) -> (F, F) {
    let base = ensemble.bias()[0];
    ensemble
        .trees()
        .iter()
        .map(|tree| tree.leaf_range(instance, mask))
        .fold((base, base), |(lo, hi), (min, max)| (lo + min, hi + max))
}

fn boosted_binary<F: Float>(
    ensemble: &Ensemble<F>,
    instance: &Instance,
    mask: &ActiveMask,
    class: usize,
) -> bool {
    let (lo, hi) = margin_bounds(ensemble, instance, mask);
    match class {
        1 => lo >= F::zero(),
        0 => hi < F::zero(),
        _ => false,
    }
}

fn boosted_regression<F: Float>(
    ensemble: &Ensemble<F>,
    instance: &Instance,
    mask: &ActiveMask,
    lower: F,
    upper: F,
) -> bool {
    let (lo, hi) = margin_bounds(ensemble, instance, mask);
    lo >= lower && hi <= upper
}

/// The lower bound of the target score has to exceed the upper bound of every other score
fn boosted_multiclass<F: Float>(
    ensemble: &Ensemble<F>,
    instance: &Instance,
    mask: &ActiveMask,
    class: usize,
) -> bool {
    let mut lows = ensemble.bias().to_vec();
    let mut highs = lows.clone();
    for tree in ensemble.trees() {
        let (min, max) = tree.leaf_range(instance, mask);
        let slot = tree.target_class();
        lows[slot] += min;
        highs[slot] += max;
    }

    let target_low = lows[class];
    highs
        .iter()
        .enumerate()
        .all(|(other, high)| other == class || target_low > *high)
}

/// Every undetermined tree may vote for the strongest competitor
///
/// Ties are won by the lowest class index, like in [`Ensemble::predict`]. The target needs strictly
/// more votes than any lower class can reach, and at least as many as any higher class can reach.
/// In a binary forest class 0 is forced by a tie with class 1, while class 1 must win outright.
fn forest<F: Float>(
    ensemble: &Ensemble<F>,
    instance: &Instance,
    mask: &ActiveMask,
    class: usize,
) -> bool {
    let mut guaranteed = vec![0usize; ensemble.n_classes()];
    let mut undetermined = 0;
    for tree in ensemble.trees() {
        match tree.vote(instance, mask) {
            Vote::Guaranteed(vote) => guaranteed[vote] += 1,
            Vote::Undetermined => undetermined += 1,
        }
    }

    let votes = guaranteed[class];
    guaranteed.iter().enumerate().all(|(other, count)| {
        let worst = count + undetermined;
        match other.cmp(&class) {
            std::cmp::Ordering::Less => votes > worst,
            std::cmp::Ordering::Equal => true,
            std::cmp::Ordering::Greater => votes >= worst,
        }
    })
}
