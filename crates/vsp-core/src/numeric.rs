//! Float guards for solved and derived quantities.

use crate::{CoreError, CoreResult};

pub fn ensure_finite(v: f64, what: &'static str) -> CoreResult<f64> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// First non-finite entry of `values` as an error.
pub fn ensure_all_finite(values: &[f64], what: &'static str) -> CoreResult<()> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(&value) => Err(CoreError::NonFinite { what, value }),
        None => Ok(()),
    }
}

/// `num / den`, or `0.0` when the denominator vanishes or either side is
/// not finite. Used for efficiency and figure of merit.
pub fn guarded_ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 || !den.is_finite() || !num.is_finite() {
        0.0
    } else {
        num / den
    }
}

/// Fold `sample` into `mean` as sample number `n` (1-based), so `n == 1`
/// replaces the mean.
pub fn incremental_mean(mean: f64, sample: f64, n: usize) -> f64 {
    if n == 0 {
        return mean;
    }
    mean + (sample - mean) / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_values_are_errors() {
        let err = ensure_finite(f64::NAN, "test").unwrap_err();
        assert!(format!("{err}").contains("Non-finite"));
        assert_eq!(ensure_finite(2.5, "test"), Ok(2.5));

        assert!(ensure_all_finite(&[1.0, 2.0], "gamma").is_ok());
        assert_eq!(
            ensure_all_finite(&[1.0, f64::INFINITY, f64::NAN], "gamma"),
            Err(CoreError::NonFinite {
                what: "gamma",
                value: f64::INFINITY
            })
        );
    }

    #[test]
    fn guarded_ratio_zero_denominator() {
        assert_eq!(guarded_ratio(1.0, 0.0), 0.0);
        assert_eq!(guarded_ratio(0.0, 0.0), 0.0);
        assert_eq!(guarded_ratio(f64::NAN, 1.0), 0.0);
        assert_eq!(guarded_ratio(3.0, 2.0), 1.5);
    }

    #[test]
    fn incremental_mean_first_sample_replaces() {
        assert_eq!(incremental_mean(42.0, 3.0, 1), 3.0);
        assert_eq!(incremental_mean(3.0, 5.0, 2), 4.0);
        assert_eq!(incremental_mean(7.0, 1.0, 0), 7.0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn incremental_mean_matches_arithmetic_mean(
            samples in prop::collection::vec(-1.0e3_f64..1.0e3_f64, 1..64)
        ) {
            let mut mean = 0.0;
            for (k, s) in samples.iter().enumerate() {
                mean = incremental_mean(mean, *s, k + 1);
            }
            let expected: f64 = samples.iter().sum::<f64>() / samples.len() as f64;
            prop_assert!((mean - expected).abs() <= 1e-9 * expected.abs().max(1.0));
        }
    }
}
