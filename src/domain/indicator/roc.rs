//! ROC (Rate of Change).
//!
//! ROC(n)[i] = ((C[i] - C[i-n]) / C[i-n]) * 100
//! If C[i-n] == 0: ROC = 0
//! Warmup: first n bars are NaN.

use crate::domain::context::DataContext;
use crate::domain::error::EvalError;
use crate::domain::indicator::{closes, period_param, ResultSeries};

pub fn roc(values: &[f64], period: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if i < period {
                return f64::NAN;
            }
            let prev = values[i - period];
            if prev == 0.0 {
                0.0
            } else {
                (values[i] - prev) / prev * 100.0
            }
        })
        .collect()
}

pub fn compute(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let period = period_param("ROC", params, 0)?;
    Ok(ResultSeries::Flat(roc(&closes(ctx), period)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn roc_basic() {
        let out = roc(&[100.0, 110.0, 121.0], 1);
        assert!(out[0].is_nan());
        assert_relative_eq!(out[1], 10.0);
        assert_relative_eq!(out[2], 10.0, epsilon = 1e-9);
    }

    #[test]
    fn roc_zero_base_is_zero() {
        let out = roc(&[0.0, 5.0], 1);
        assert_eq!(out[1], 0.0);
    }
}
