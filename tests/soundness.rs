// linfa-explain/tests/soundness.rs
//
// Reasons are checked against every completion of the free literals, so the ensembles are kept
// small enough for exhaustive enumeration.

use linfa_explain::ensemble::{Operator, RawNode, RawTree};
use linfa_explain::prelude::*;
use ndarray::Array1;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const N_FEATURES: usize = 3;
const THRESHOLDS: [f64; 3] = [0.5, 1.5, 2.5];

fn random_node(
    rng: &mut SmallRng,
    depth: usize,
    leaf: &dyn Fn(&mut SmallRng) -> f64,
) -> RawNode<f64> {
    if depth == 0 {
        return RawNode::leaf(leaf(rng));
    }
    let feature = rng.gen_range(0..N_FEATURES);
    let threshold = THRESHOLDS[rng.gen_range(0..THRESHOLDS.len())];
    let operator = if rng.gen_bool(0.5) {
        Operator::LessOrEqual
    } else {
        Operator::LessThan
    };
    RawNode::split(
        feature,
        operator,
        threshold,
        random_node(rng, depth - 1, leaf),
        random_node(rng, depth - 1, leaf),
    )
}

fn random_ensemble(rng: &mut SmallRng, kind: EnsembleKind, n_classes: usize) -> Ensemble<f64> {
    let mut ensemble = Ensemble::new(kind, n_classes).unwrap();
    let n_trees = rng.gen_range(2..6);
    for idx in 0..n_trees {
        let depth = rng.gen_range(1..3);
        let raw = if kind.is_forest() {
            RawTree::new(random_node(rng, depth, &|rng: &mut SmallRng| -> f64 {
                rng.gen_range(0..n_classes) as f64
            }))
        } else {
            RawTree::new(random_node(rng, depth, &|rng: &mut SmallRng| -> f64 {
                rng.gen_range(-1.0..1.0)
            }))
        };
        let raw = if kind == EnsembleKind::BoostedMulticlass {
            raw.for_class(idx % n_classes)
        } else {
            raw
        };
        ensemble.add_tree(&raw).unwrap();
    }
    ensemble
}

fn random_observation(rng: &mut SmallRng) -> Array1<f64> {
    Array1::from_shape_fn(N_FEATURES, |_| rng.gen_range(0..4) as f64)
}

/// Every assignment of the literals outside `reason`, with the literals of `reason` taken from
/// `instance`
fn completions(instance: &Instance, reason: &Reason) -> Vec<Instance> {
    let free = (0..instance.len())
        .filter(|idx| !reason.contains(*idx))
        .collect::<Vec<_>>();

    (0..1usize << free.len())
        .map(|bits| {
            let mut values = instance.values().to_vec();
            for (pos, idx) in free.iter().enumerate() {
                values[*idx] = bits & (1 << pos) != 0;
            }
            Instance::new(values)
        })
        .collect()
}

fn is_locally_minimal(
    explainer: &Explainer<f64>,
    instance: &Instance,
    reason: &Reason,
    target: &Target<f64>,
) -> bool {
    reason
        .iter()
        .filter(|idx| explainer.is_free_to_remove(*idx))
        .all(|idx| {
            let mut mask = reason.to_mask(instance.len());
            mask.deactivate(idx);
            !is_implicant(explainer.ensemble(), instance, &mask, target)
        })
}

fn check_classifier(kind: EnsembleKind, n_classes: usize, seed: u64) {
    let mut rng = SmallRng::seed_from_u64(seed);

    for round in 0..40 {
        let ensemble = random_ensemble(&mut rng, kind, n_classes);
        let instance = ensemble.binarize(&random_observation(&mut rng)).unwrap();
        let mut explainer = Explainer::new(ensemble);
        explainer.set_retry_count(5).unwrap();
        let prediction = explainer.predict(&instance).unwrap();

        let reason = match explainer.compute_reason_conditions(&instance, prediction, round) {
            // equal scores of a boosted multiclass ensemble force no class
            Err(Error::TargetNotForced(_)) if kind == EnsembleKind::BoostedMulticlass => {
                continue
            }
            res => res.unwrap(),
        };

        for completion in completions(&instance, &reason) {
            assert_eq!(
                explainer.predict(&completion).unwrap(),
                prediction,
                "{:?} reason {} is not sufficient for {:?}",
                kind,
                reason,
                instance
            );
        }
        assert!(is_locally_minimal(
            &explainer,
            &instance,
            &reason,
            &Target::Class(prediction)
        ));
    }
}

#[test]
fn boosted_binary_reasons_are_sound() {
    check_classifier(EnsembleKind::BoostedBinary, 2, 1);
}

#[test]
fn boosted_multiclass_reasons_are_sound() {
    check_classifier(EnsembleKind::BoostedMulticlass, 3, 2);
}

#[test]
fn forest_binary_reasons_are_sound() {
    check_classifier(EnsembleKind::ForestBinary, 2, 3);
}

#[test]
fn forest_multiclass_reasons_are_sound() {
    check_classifier(EnsembleKind::ForestMulticlass, 3, 4);
}

#[test]
fn regression_reasons_keep_the_range() {
    let mut rng = SmallRng::seed_from_u64(5);

    for round in 0..40 {
        let ensemble = random_ensemble(&mut rng, EnsembleKind::BoostedRegression, 1);
        let instance = ensemble.binarize(&random_observation(&mut rng)).unwrap();
        let value = ensemble.predict_value(&instance).unwrap();

        let mut explainer = Explainer::new(ensemble);
        explainer.set_retry_count(5).unwrap();
        explainer.set_target_range(value - 0.5, value + 0.5).unwrap();
        let reason = explainer
            .compute_reason_conditions(&instance, 0, round)
            .unwrap();

        for completion in completions(&instance, &reason) {
            let completed = explainer.ensemble().predict_value(&completion).unwrap();
            assert!((value - 0.5..=value + 0.5).contains(&completed));
        }
    }
}

#[test]
fn protected_literals_and_features_are_kept() {
    let mut rng = SmallRng::seed_from_u64(6);

    for round in 0..20 {
        let ensemble = random_ensemble(&mut rng, EnsembleKind::ForestBinary, 2);
        let instance = ensemble.binarize(&random_observation(&mut rng)).unwrap();
        let n_literals = ensemble.n_literals();
        let feature = ensemble.conditions().feature_of(0);

        let mut explainer = Explainer::new(ensemble);
        explainer.protect_literals(vec![n_literals - 1]).unwrap();
        explainer.protect_features(vec![feature]).unwrap();
        let prediction = explainer.predict(&instance).unwrap();

        let reason = explainer
            .compute_reason_conditions(&instance, prediction, round)
            .unwrap();
        assert!(reason.contains(n_literals - 1));
        for literal in explainer.ensemble().conditions().literals_of(feature) {
            assert!(reason.contains(literal));
        }
        assert!(is_locally_minimal(
            &explainer,
            &instance,
            &reason,
            &Target::Class(prediction)
        ));
    }
}

#[test]
fn restricted_reasons_only_drop_candidate_features() {
    let mut rng = SmallRng::seed_from_u64(7);

    for _ in 0..20 {
        let ensemble = random_ensemble(&mut rng, EnsembleKind::BoostedBinary, 2);
        let instance = ensemble.binarize(&random_observation(&mut rng)).unwrap();
        let mut explainer = Explainer::new(ensemble);
        let prediction = explainer.predict(&instance).unwrap();

        let reason = explainer
            .compute_reason_features(&instance, &[1], prediction)
            .unwrap();
        let conditions = explainer.ensemble().conditions();
        for literal in 0..instance.len() {
            if conditions.feature_of(literal) != 1 {
                assert!(reason.contains(literal));
            }
        }
        for completion in completions(&instance, &reason) {
            assert_eq!(explainer.predict(&completion).unwrap(), prediction);
        }
    }
}

#[test]
fn same_seed_same_reason() {
    let mut rng = SmallRng::seed_from_u64(8);

    for round in 0..10 {
        let ensemble = random_ensemble(&mut rng, EnsembleKind::ForestMulticlass, 3);
        let instance = ensemble.binarize(&random_observation(&mut rng)).unwrap();
        let prediction = ensemble.predict(&instance).unwrap();

        let mut first = Explainer::new(ensemble.clone());
        let mut second = Explainer::new(ensemble);
        assert_eq!(
            first.compute_reason_conditions(&instance, prediction, round),
            second.compute_reason_conditions(&instance, prediction, round)
        );
    }
}

#[test]
fn theory_reasons_are_sound_for_consistent_completions() {
    let mut rng = SmallRng::seed_from_u64(9);

    for round in 0..20 {
        let ensemble = random_ensemble(&mut rng, EnsembleKind::BoostedBinary, 2);
        let instance = ensemble.binarize(&random_observation(&mut rng)).unwrap();
        let theory = ClauseTheory::from_conditions(ensemble.conditions());
        let clauses = theory.clauses().to_vec();

        let mut explainer = Explainer::new(ensemble).with_propagator(theory).unwrap();
        let prediction = explainer.predict(&instance).unwrap();
        let reason = explainer
            .compute_reason_conditions(&instance, prediction, round)
            .unwrap();
        assert!(explainer.is_reason(&instance, &reason, prediction).unwrap());

        let consistent = |completion: &Instance| {
            clauses.iter().all(|clause| {
                clause
                    .iter()
                    .any(|lit| completion.value(lit.index()) == lit.is_positive())
            })
        };
        for completion in completions(&instance, &reason)
            .iter()
            .filter(|completion| consistent(*completion))
        {
            assert_eq!(explainer.predict(completion).unwrap(), prediction);
        }
    }
}
