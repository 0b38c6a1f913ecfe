//! Safe evaluator for user-authored custom-metric formulas.
//!
//! Formulas are untrusted strings stored per workspace and re-evaluated on
//! every dashboard render, so they are never handed to any general-purpose
//! code-execution facility. A hand-rolled recursive-descent parser builds an
//! explicit expression tree over a fixed grammar (numbers, environment
//! identifiers, `+ - * / ( )`, and the functions `max`/`min`/`abs`/`round`),
//! and a tree-walking interpreter evaluates it under node, depth, and step
//! budgets.

pub mod error;
pub mod eval;
pub mod parser;
pub mod token;

pub use error::FormulaError;
pub use eval::{evaluate, evaluate_with_limits, validate, validate_with_limits, Environment, EvalLimits};
pub use parser::{parse, BinOp, Expr, Func};
