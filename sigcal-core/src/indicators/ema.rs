//! Exponential Moving Average (EMA).
//!
//! Span-parameterized with alpha = 2 / (span + 1), seeded at the first finite
//! value. NaN inputs leave the running state untouched and emit NaN for that
//! position, so a leading NaN prefix simply delays the seed.

/// Compute EMA with the given span over a series.
/// Output is NaN until the first finite input value, which seeds the average.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];

    if n == 0 || span == 0 {
        return out;
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut state: Option<f64> = None;

    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        let next = match state {
            None => v,
            Some(prev) => alpha * v + (1.0 - alpha) * prev,
        };
        state = Some(next);
        out[i] = next;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn ema_seeds_at_first_value() {
        let values = vec![10.0, 12.0, 14.0];
        let e = ema(&values, 3); // alpha = 0.5
        assert_approx(e[0], 10.0, DEFAULT_EPSILON);
        assert_approx(e[1], 11.0, DEFAULT_EPSILON);
        assert_approx(e[2], 12.5, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_constant_series_is_constant() {
        let values = vec![50.0; 30];
        let e = ema(&values, 12);
        for &v in &e {
            assert_approx(v, 50.0, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn ema_skips_leading_nan() {
        let values = vec![f64::NAN, f64::NAN, 20.0, 22.0];
        let e = ema(&values, 3);
        assert!(e[0].is_nan());
        assert!(e[1].is_nan());
        assert_approx(e[2], 20.0, DEFAULT_EPSILON);
        assert_approx(e[3], 21.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_interior_nan_carries_state() {
        let values = vec![10.0, f64::NAN, 12.0];
        let e = ema(&values, 3); // alpha = 0.5
        assert_approx(e[0], 10.0, DEFAULT_EPSILON);
        assert!(e[1].is_nan());
        assert_approx(e[2], 11.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_empty_input() {
        let e = ema(&[], 10);
        assert!(e.is_empty());
    }
}
