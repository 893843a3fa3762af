use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::{Float, ParamGuard};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// The set of parameters that can be specified for the computation of reasons by an
/// [explainer](crate::Explainer).
///
/// ### Example
///
/// ```rust
/// use linfa_explain::{ExplainerParams, ParamGuard};
///
/// let params = ExplainerParams::<f64>::new()
///     .retry_count(10)
///     .time_limit(0.5)
///     .protect_features(vec![2]);
/// let params = params.check().unwrap();
/// assert_eq!(params.retry_count(), 10);
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct ExplainerValidParams<F> {
    retry_count: usize,
    time_limit: f64,
    max_removal_attempts: Option<usize>,
    protected_literals: BTreeSet<usize>,
    protected_features: BTreeSet<usize>,
    target_range: Option<(F, F)>,
}

impl<F: Float> ExplainerValidParams<F> {
    /// Number of randomized shrinking passes
    pub fn retry_count(&self) -> usize {
        self.retry_count
    }

    /// Wall clock budget in seconds, zero means that only the retry count bounds the search
    pub fn time_limit(&self) -> f64 {
        self.time_limit
    }

    /// The time limit, `None` when unbounded
    pub fn time_budget(&self) -> Option<Duration> {
        if self.time_limit > 0.0 {
            Some(Duration::from_secs_f64(self.time_limit))
        } else {
            None
        }
    }

    /// Ceiling on the number of removals tried during a single pass
    pub fn max_removal_attempts(&self) -> Option<usize> {
        self.max_removal_attempts
    }

    /// Literals which are never removed from a reason
    pub fn protected_literals(&self) -> &BTreeSet<usize> {
        &self.protected_literals
    }

    /// Features whose literals are never removed from a reason
    pub fn protected_features(&self) -> &BTreeSet<usize> {
        &self.protected_features
    }

    /// Interval the output of a regression ensemble has to stay in
    pub fn target_range(&self) -> Option<(F, F)> {
        self.target_range
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct ExplainerParams<F>(ExplainerValidParams<F>);

impl<F: Float> ExplainerParams<F> {
    /// Defaults are provided if the optional parameters are not specified:
    /// * `retry_count = 50`
    /// * `time_limit = 0` (unbounded)
    /// * `max_removal_attempts = None`
    /// * no protected literals or features
    /// * `target_range = None`, regression ensembles then keep their exact prediction
    pub fn new() -> Self {
        Self(ExplainerValidParams {
            retry_count: 50,
            time_limit: 0.0,
            max_removal_attempts: None,
            protected_literals: BTreeSet::new(),
            protected_features: BTreeSet::new(),
            target_range: None,
        })
    }

    /// Sets the number of randomized passes, the smallest reason of all passes is kept
    pub fn retry_count(mut self, retry_count: usize) -> Self {
        self.0.retry_count = retry_count;
        self
    }

    /// Sets the wall clock budget in seconds
    pub fn time_limit(mut self, seconds: f64) -> Self {
        self.0.time_limit = seconds;
        self
    }

    /// Sets the ceiling on removal attempts per pass
    pub fn max_removal_attempts(mut self, max_removal_attempts: Option<usize>) -> Self {
        self.0.max_removal_attempts = max_removal_attempts;
        self
    }

    /// Adds literals which have to stay in every reason
    pub fn protect_literals(mut self, literals: impl IntoIterator<Item = usize>) -> Self {
        self.0.protected_literals.extend(literals);
        self
    }

    /// Adds features whose literals have to stay in every reason
    pub fn protect_features(mut self, features: impl IntoIterator<Item = usize>) -> Self {
        self.0.protected_features.extend(features);
        self
    }

    /// Removes every protected literal and feature
    pub fn clear_protected(mut self) -> Self {
        self.0.protected_literals.clear();
        self.0.protected_features.clear();
        self
    }

    /// Sets the interval the output of a regression ensemble has to stay in
    pub fn target_range(mut self, lower: F, upper: F) -> Self {
        self.0.target_range = Some((lower, upper));
        self
    }
}

impl<F: Float> Default for ExplainerParams<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> From<ExplainerValidParams<F>> for ExplainerParams<F> {
    fn from(params: ExplainerValidParams<F>) -> Self {
        Self(params)
    }
}

impl<F: Float> ParamGuard for ExplainerParams<F> {
    type Checked = ExplainerValidParams<F>;
    type Error = Error;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let time_limit = self.0.time_limit;
        if !time_limit.is_finite() || time_limit < 0.0 {
            Err(Error::InvalidConfiguration(format!(
                "time limit should be a non-negative number of seconds, but was {}",
                time_limit
            )))
        } else if time_limit >= u64::MAX as f64 {
            Err(Error::InvalidConfiguration(format!(
                "time limit of {} seconds is too large",
                time_limit
            )))
        } else if let Some((lower, upper)) = self.0.target_range {
            if lower.is_nan() || upper.is_nan() || lower > upper {
                Err(Error::InvalidConfiguration(format!(
                    "target range [{}, {}] is empty",
                    lower, upper
                )))
            } else {
                Ok(&self.0)
            }
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
