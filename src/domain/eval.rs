//! Expression evaluation.
//!
//! Walks an [`AstNode`] against a [`DataContext`] and produces one value per
//! candle. Function calls go through the [`Registry`] and a [`SeriesCache`]
//! scoped to the evaluator, so a call repeated anywhere in the tree (or in
//! later expressions on the same evaluator) is computed once.
//!
//! # Semantics
//!
//! - Comparisons yield 0/1 and are false when either side is NaN
//! - `crosses_above`: `l[i] > r[i] && l[i-1] <= r[i-1]`, false at bar 0 and
//!   when any of the four values is NaN (`crosses_below` mirrors it)
//! - `AND`/`OR` treat NaN and 0 as false
//! - Division by zero yields NaN; NaN propagates through arithmetic
//! - `x[n]` reads `x` n bars back, NaN before the first bar

use crate::domain::ast::{
    AggregateFunction, ArithmeticOp, AstNode, CompareOp, CrossDirection, IndicatorCall,
    LogicalOp, MathFunction, PriceField,
};
use crate::domain::cache::{CacheStats, SeriesCache};
use crate::domain::context::DataContext;
use crate::domain::error::EvalError;
use crate::domain::indicator::{bool_value, rolling};
use crate::domain::registry::{Registry, ResultType};

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Numeric,
    Boolean,
}

/// Per-bar output of an evaluated expression.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedSeries {
    pub values: Vec<f64>,
    pub kind: SeriesKind,
}

impl EvaluatedSeries {
    pub fn numeric(values: Vec<f64>) -> Self {
        Self {
            values,
            kind: SeriesKind::Numeric,
        }
    }

    pub fn boolean(values: Vec<f64>) -> Self {
        Self {
            values,
            kind: SeriesKind::Boolean,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at bar `index`, NaN outside the series.
    pub fn value_at(&self, index: usize) -> f64 {
        self.values.get(index).copied().unwrap_or(f64::NAN)
    }

    /// True when the value at `index` is a non-zero number.
    pub fn signal_at(&self, index: usize) -> bool {
        truthy(self.value_at(index))
    }
}

fn truthy(value: f64) -> bool {
    !value.is_nan() && value != 0.0
}

/// Evaluates `node` with the standard registry and a fresh cache.
pub fn evaluate(node: &AstNode, ctx: &DataContext<'_>) -> Result<EvaluatedSeries, EvalError> {
    Evaluator::new(*ctx).evaluate(node)
}

pub struct Evaluator<'a> {
    ctx: DataContext<'a>,
    registry: &'a Registry,
    cache: SeriesCache,
}

impl<'a> Evaluator<'a> {
    pub fn new(ctx: DataContext<'a>) -> Self {
        Self::with_registry(ctx, Registry::standard())
    }

    pub fn with_registry(ctx: DataContext<'a>, registry: &'a Registry) -> Self {
        Self {
            ctx,
            registry,
            cache: SeriesCache::new(),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn evaluate(&mut self, node: &AstNode) -> Result<EvaluatedSeries, EvalError> {
        match node {
            AstNode::Comparison { left, op, right } => {
                let l = self.evaluate(left)?;
                let r = self.evaluate(right)?;
                Ok(EvaluatedSeries::boolean(zip_with(&l, &r, |a, b| {
                    bool_value(compare(*op, a, b))
                })))
            }
            AstNode::CrossComparison {
                left,
                direction,
                right,
            } => {
                let l = self.evaluate(left)?;
                let r = self.evaluate(right)?;
                Ok(EvaluatedSeries::boolean(cross(&l.values, &r.values, *direction)))
            }
            AstNode::Logical { op, left, right } => {
                let l = self.evaluate(left)?;
                let r = self.evaluate(right)?;
                Ok(EvaluatedSeries::boolean(zip_with(&l, &r, |a, b| {
                    bool_value(match op {
                        LogicalOp::And => truthy(a) && truthy(b),
                        LogicalOp::Or => truthy(a) || truthy(b),
                    })
                })))
            }
            AstNode::Arithmetic { op, left, right } => {
                let l = self.evaluate(left)?;
                let r = self.evaluate(right)?;
                Ok(EvaluatedSeries::numeric(zip_with(&l, &r, |a, b| {
                    arithmetic(*op, a, b)
                })))
            }
            AstNode::IndicatorCall(call) => self.call(&call.name, &call.params, None),
            AstNode::PropertyAccess { call, property } => self.property(call, property),
            AstNode::PriceReference(field) => Ok(EvaluatedSeries::numeric(
                self.ctx
                    .candles
                    .iter()
                    .map(|c| match field {
                        PriceField::Open => c.open,
                        PriceField::High => c.high,
                        PriceField::Low => c.low,
                        PriceField::Close => c.close,
                        PriceField::Volume => c.volume,
                    })
                    .collect(),
            )),
            AstNode::NumberLiteral(value) => {
                Ok(EvaluatedSeries::numeric(vec![*value; self.ctx.len()]))
            }
            AstNode::BooleanLiteral(flag) => Ok(EvaluatedSeries::boolean(vec![
                bool_value(*flag);
                self.ctx.len()
            ])),
            AstNode::LookbackAccess { inner, bars_ago } => {
                let inner = self.evaluate(inner)?;
                let n = *bars_ago;
                let values = (0..inner.len())
                    .map(|i| if i >= n { inner.values[i - n] } else { f64::NAN })
                    .collect();
                Ok(EvaluatedSeries {
                    values,
                    kind: inner.kind,
                })
            }
            AstNode::MathCall { function, args } => self.math(*function, args),
            AstNode::AggregateCall {
                function,
                inner,
                period,
            } => {
                let inner = self.evaluate(inner)?;
                Ok(EvaluatedSeries::numeric(aggregate(
                    *function,
                    &inner.values,
                    *period,
                )))
            }
            AstNode::RangeCall { name, period, skip } => {
                let mut params = vec![*period as f64];
                if name == "RANGE_POSITION" {
                    params.push(*skip as f64);
                }
                self.call(name, &params, None)
            }
            AstNode::VolumeCall { name, period } => self.call(name, &[*period as f64], None),
            AstNode::TimeCall(name)
            | AstNode::MoonCall(name)
            | AstNode::HolidayCall(name)
            | AstNode::FomcCall(name)
            | AstNode::SessionOrderFlowCall(name)
            | AstNode::OhlcvVolumeCall(name)
            | AstNode::CandlePropertyCall(name) => self.call(name, &[], None),
            AstNode::OrderFlowCall { name, param } => {
                let params: Vec<f64> = param.iter().copied().collect();
                self.call(name, &params, None)
            }
            AstNode::FundingCall { name, period }
            | AstNode::PremiumCall { name, period }
            | AstNode::OpenInterestCall { name, period }
            | AstNode::ExchangeCall { name, period } => {
                let params: Vec<f64> = period.iter().map(|p| *p as f64).collect();
                self.call(name, &params, None)
            }
            AstNode::RayCall {
                name,
                ray,
                lookback,
                skip,
            } => {
                let params: Vec<f64> = ray
                    .iter()
                    .chain([lookback, skip])
                    .map(|p| *p as f64)
                    .collect();
                self.call(name, &params, None)
            }
            AstNode::CandlePatternCall { name, ratio } => self.call(name, &[*ratio], None),
            AstNode::FootprintCall { name, params } => self.call(name, params, None),
        }
    }

    fn property(
        &mut self,
        call: &IndicatorCall,
        property: &str,
    ) -> Result<EvaluatedSeries, EvalError> {
        self.call(&call.name, &call.params, Some(property))
    }

    fn call(
        &mut self,
        id: &str,
        params: &[f64],
        component: Option<&str>,
    ) -> Result<EvaluatedSeries, EvalError> {
        let registry = self.registry;
        let spec = registry
            .get(id)
            .ok_or_else(|| EvalError::UnknownFunction {
                name: id.to_string(),
            })?;
        let series = self.cache.get_or_compute(spec, &self.ctx, params)?;
        let values = match component {
            Some(name) => series.component(name).ok_or_else(|| EvalError::InvalidParameters {
                function: id.to_string(),
                reason: format!("no component '{}'", name),
            })?,
            None => spec.values(&series).ok_or_else(|| EvalError::InvalidParameters {
                function: id.to_string(),
                reason: "composite result has no default component".to_string(),
            })?,
        };
        Ok(EvaluatedSeries {
            values: values.to_vec(),
            kind: match spec.result_type {
                ResultType::Numeric => SeriesKind::Numeric,
                ResultType::Boolean => SeriesKind::Boolean,
            },
        })
    }

    fn math(
        &mut self,
        function: MathFunction,
        args: &[AstNode],
    ) -> Result<EvaluatedSeries, EvalError> {
        let values = match (function, args) {
            (MathFunction::Abs, [arg]) => self.evaluate(arg)?.values.iter().map(|v| v.abs()).collect(),
            (MathFunction::Min, [a, b]) | (MathFunction::Max, [a, b]) => {
                let a = self.evaluate(a)?;
                let b = self.evaluate(b)?;
                zip_with(&a, &b, |x, y| {
                    if x.is_nan() || y.is_nan() {
                        f64::NAN
                    } else if function == MathFunction::Min {
                        x.min(y)
                    } else {
                        x.max(y)
                    }
                })
            }
            (function, args) => {
                return Err(EvalError::InvalidParameters {
                    function: format!("{:?}", function).to_lowercase(),
                    reason: format!("unexpected argument count {}", args.len()),
                });
            }
        };
        Ok(EvaluatedSeries::numeric(values))
    }
}

fn zip_with(
    l: &EvaluatedSeries,
    r: &EvaluatedSeries,
    f: impl Fn(f64, f64) -> f64,
) -> Vec<f64> {
    l.values
        .iter()
        .zip(&r.values)
        .map(|(&a, &b)| f(a, b))
        .collect()
}

fn compare(op: CompareOp, a: f64, b: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    match op {
        CompareOp::Greater => a > b,
        CompareOp::Less => a < b,
        CompareOp::GreaterEqual => a >= b,
        CompareOp::LessEqual => a <= b,
        CompareOp::Equal => (a - b).abs() < EPSILON,
    }
}

fn arithmetic(op: ArithmeticOp, a: f64, b: f64) -> f64 {
    match op {
        ArithmeticOp::Add => a + b,
        ArithmeticOp::Subtract => a - b,
        ArithmeticOp::Multiply => a * b,
        ArithmeticOp::Divide if b == 0.0 => f64::NAN,
        ArithmeticOp::Divide => a / b,
    }
}

fn cross(l: &[f64], r: &[f64], direction: CrossDirection) -> Vec<f64> {
    (0..l.len().min(r.len()))
        .map(|i| {
            if i == 0 {
                return 0.0;
            }
            let values = [l[i], r[i], l[i - 1], r[i - 1]];
            if values.iter().any(|v| v.is_nan()) {
                return 0.0;
            }
            let [curr_l, curr_r, prev_l, prev_r] = values;
            bool_value(match direction {
                CrossDirection::Above => curr_l > curr_r && prev_l <= prev_r,
                CrossDirection::Below => curr_l < curr_r && prev_l >= prev_r,
            })
        })
        .collect()
}

fn aggregate(function: AggregateFunction, values: &[f64], period: usize) -> Vec<f64> {
    match function {
        AggregateFunction::Lowest => {
            rolling(values, period, |w| w.iter().copied().fold(f64::INFINITY, f64::min))
        }
        AggregateFunction::Highest => rolling(values, period, |w| {
            w.iter().copied().fold(f64::NEG_INFINITY, f64::max)
        }),
        AggregateFunction::Percentile => rolling(values, period, |w| {
            let current = w[w.len() - 1];
            let at_or_below = w.iter().filter(|&&v| v <= current).count();
            at_or_below as f64 / w.len() as f64 * 100.0
        }),
    }
}
