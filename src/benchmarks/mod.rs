#[cfg(feature = "benchmarks")]
pub mod config {
    use criterion::{measurement::WallTime, BenchmarkGroup, Criterion};
    #[cfg(not(target_os = "windows"))]
    use pprof::criterion::{Output, PProfProfiler};
    use std::time::Duration;

    #[cfg(not(target_os = "windows"))]
    pub fn get_default_profiling_configs() -> Criterion {
        Criterion::default().with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
    }

    pub fn set_default_benchmark_configs(benchmark: &mut BenchmarkGroup<WallTime>) {
        let sample_size: usize = 50;
        let measurement_time: Duration = Duration::new(5, 0);
        let confidence_level: f64 = 0.95;
        let warm_up_time: Duration = Duration::new(2, 0);
        let noise_threshold: f64 = 0.05;

        benchmark
            .sample_size(sample_size)
            .measurement_time(measurement_time)
            .confidence_level(confidence_level)
            .warm_up_time(warm_up_time)
            .noise_threshold(noise_threshold);
    }
}

#[cfg(feature = "benchmarks")]
pub mod synthetic {
    //! Random ensembles of fixed shape
    use ndarray::Array1;
    use rand::Rng;

    use crate::ensemble::{Ensemble, EnsembleKind, Operator, RawNode, RawTree};
    use crate::error::Result;

    fn random_node<R: Rng>(
        rng: &mut R,
        depth: usize,
        n_features: usize,
        leaf: &mut impl FnMut(&mut R) -> f64,
    ) -> RawNode<f64> {
        if depth == 0 {
            return RawNode::leaf(leaf(rng));
        }
        let feature = rng.gen_range(0..n_features);
        let threshold = rng.gen_range(0..8) as f64 + 0.5;
        RawNode::split(
            feature,
            Operator::LessOrEqual,
            threshold,
            random_node(rng, depth - 1, n_features, leaf),
            random_node(rng, depth - 1, n_features, leaf),
        )
    }

    /// Complete trees of depth `depth` over features taking values in `0..8`
    pub fn ensemble<R: Rng>(
        rng: &mut R,
        kind: EnsembleKind,
        n_classes: usize,
        n_trees: usize,
        depth: usize,
        n_features: usize,
    ) -> Result<Ensemble<f64>> {
        let mut ensemble = Ensemble::new(kind, n_classes)?;
        for idx in 0..n_trees {
            let raw = if kind.is_forest() {
                let mut leaf = |rng: &mut R| -> f64 { rng.gen_range(0..n_classes) as f64 };
                RawTree::new(random_node(rng, depth, n_features, &mut leaf))
            } else {
                let mut leaf = |rng: &mut R| -> f64 { rng.gen_range(-1.0..1.0) };
                let tree = RawTree::new(random_node(rng, depth, n_features, &mut leaf));
                if kind == EnsembleKind::BoostedMulticlass {
                    tree.for_class(idx % n_classes)
                } else {
                    tree
                }
            };
            ensemble.add_tree(&raw)?;
        }
        Ok(ensemble)
    }

    pub fn observation<R: Rng>(rng: &mut R, n_features: usize) -> Array1<f64> {
        Array1::from_shape_fn(n_features, |_| rng.gen_range(0..8) as f64)
    }
}
