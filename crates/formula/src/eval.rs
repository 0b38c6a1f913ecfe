//! Tree-walking interpreter for parsed formulas.
//!
//! Arithmetic is double-precision floating point. `round` is
//! half-away-from-zero (`f64::round` semantics): `round(2.5) = 3`,
//! `round(-2.5) = -3`. Division by zero and non-finite intermediate results
//! surface as errors instead of leaking `NaN`/`Infinity` into dashboards.

use std::collections::HashMap;

use adpulse_core::config::FormulaConfig;

use crate::error::FormulaError;
use crate::parser::{parse, BinOp, Expr, Func};

/// The fixed namespace a formula is evaluated against: aggregate totals
/// keyed by their camelCase names (`totalSpent`, `avgRoas`, ...).
pub type Environment = HashMap<String, f64>;

/// Budgets applied to a single parse + evaluation. Node and depth budgets
/// bound the parse tree; the step budget bounds the evaluation walk.
#[derive(Debug, Clone, Copy)]
pub struct EvalLimits {
    pub max_nodes: usize,
    pub max_depth: usize,
    pub max_steps: usize,
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self {
            max_nodes: 512,
            max_depth: 32,
            max_steps: 10_000,
        }
    }
}

impl From<&FormulaConfig> for EvalLimits {
    fn from(config: &FormulaConfig) -> Self {
        Self {
            max_nodes: config.max_nodes,
            max_depth: config.max_depth,
            max_steps: config.max_steps,
        }
    }
}

/// Evaluate a formula against an environment using the default budgets.
pub fn evaluate(formula: &str, env: &Environment) -> Result<f64, FormulaError> {
    evaluate_with_limits(formula, env, EvalLimits::default())
}

/// Evaluate a formula against an environment. The result is always finite
/// or an error — never `NaN` or `Infinity`.
pub fn evaluate_with_limits(
    formula: &str,
    env: &Environment,
    limits: EvalLimits,
) -> Result<f64, FormulaError> {
    let expr = parse(formula, &limits)?;
    let mut steps = 0usize;
    let value = eval_expr(&expr, env, &mut steps, limits.max_steps)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FormulaError::Overflow)
    }
}

/// Parse-only validation, for the storage layer at save time. Runs the same
/// parser under the same budgets as [`evaluate`], so a formula accepted here
/// can never fail with a syntax or disallowed-construct error at render time.
pub fn validate(formula: &str) -> Result<(), FormulaError> {
    validate_with_limits(formula, EvalLimits::default())
}

pub fn validate_with_limits(formula: &str, limits: EvalLimits) -> Result<(), FormulaError> {
    parse(formula, &limits).map(|_| ())
}

fn eval_expr(
    expr: &Expr,
    env: &Environment,
    steps: &mut usize,
    max_steps: usize,
) -> Result<f64, FormulaError> {
    *steps += 1;
    if *steps > max_steps {
        return Err(FormulaError::Timeout(max_steps));
    }

    match expr {
        Expr::Number(value) => Ok(*value),
        Expr::Ident(name) => env
            .get(name)
            .copied()
            .ok_or_else(|| FormulaError::UnknownIdentifier(name.clone())),
        Expr::Neg(inner) => Ok(-eval_expr(inner, env, steps, max_steps)?),
        Expr::Binary { op, lhs, rhs } => {
            let left = eval_expr(lhs, env, steps, max_steps)?;
            let right = eval_expr(rhs, env, steps, max_steps)?;
            let value = match op {
                BinOp::Add => left + right,
                BinOp::Sub => left - right,
                BinOp::Mul => left * right,
                BinOp::Div => {
                    if right == 0.0 {
                        return Err(FormulaError::DivisionByZero);
                    }
                    left / right
                }
            };
            if value.is_finite() {
                Ok(value)
            } else {
                Err(FormulaError::Overflow)
            }
        }
        Expr::Call { func, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_expr(arg, env, steps, max_steps)?);
            }
            apply(*func, &values)
        }
    }
}

fn apply(func: Func, args: &[f64]) -> Result<f64, FormulaError> {
    let value = match func {
        Func::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Func::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
        Func::Abs => args[0].abs(),
        Func::Round => {
            let places = args.get(1).copied().unwrap_or(0.0);
            round_to(args[0], places)?
        }
    };
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FormulaError::Overflow)
    }
}

fn round_to(value: f64, places: f64) -> Result<f64, FormulaError> {
    // Decimal places are clamped to a range where 10^n stays exact.
    let places = places.trunc().clamp(-15.0, 15.0) as i32;
    let factor = 10f64.powi(places);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return Err(FormulaError::Overflow);
    }
    Ok(scaled.round() / factor)
}
