//! Recursive-descent parser producing an explicit expression tree.
//!
//! Grammar, lowest to highest precedence:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := '-'? atom
//! atom   := number | identifier | call | '(' expr ')'
//! call   := func '(' expr (',' expr)* ')'      func ∈ {max, min, abs, round}
//! ```
//!
//! Node count and nesting depth are budgeted during parsing so pathological
//! input is rejected before evaluation ever starts.

use crate::error::FormulaError;
use crate::eval::EvalLimits;
use crate::token::{tokenize, Spanned, Token};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Ident(String),
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: Func,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// The closed set of callable functions. Any other name in call position
/// is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Max,
    Min,
    Abs,
    Round,
}

impl Func {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "max" => Some(Self::Max),
            "min" => Some(Self::Min),
            "abs" => Some(Self::Abs),
            "round" => Some(Self::Round),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Max => "max",
            Self::Min => "min",
            Self::Abs => "abs",
            Self::Round => "round",
        }
    }

    /// Inclusive argument-count bounds.
    fn arity(&self) -> (usize, usize) {
        match self {
            Self::Max | Self::Min => (2, usize::MAX),
            Self::Abs => (1, 1),
            Self::Round => (1, 2),
        }
    }
}

/// Parse a formula into an expression tree under the given budgets.
pub fn parse(formula: &str, limits: &EvalLimits) -> Result<Expr, FormulaError> {
    let tokens = tokenize(formula)?;
    if tokens.is_empty() {
        return Err(FormulaError::syntax(0, "empty formula"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        nodes: 0,
        max_nodes: limits.max_nodes,
        max_depth: limits.max_depth,
    };
    let expr = parser.expr(0)?;
    if let Some(spanned) = parser.peek() {
        return Err(FormulaError::syntax(
            spanned.position,
            format!("unexpected token after expression: {:?}", spanned.token),
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    nodes: usize,
    max_nodes: usize,
    max_depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.pos).cloned();
        if spanned.is_some() {
            self.pos += 1;
        }
        spanned
    }

    fn end_position(&self) -> usize {
        self.tokens.last().map(|s| s.position + 1).unwrap_or(0)
    }

    fn count_node(&mut self) -> Result<(), FormulaError> {
        self.nodes += 1;
        if self.nodes > self.max_nodes {
            return Err(FormulaError::DisallowedConstruct(format!(
                "formula exceeds the {} node budget",
                self.max_nodes
            )));
        }
        Ok(())
    }

    fn check_depth(&self, depth: usize) -> Result<(), FormulaError> {
        if depth > self.max_depth {
            return Err(FormulaError::DisallowedConstruct(format!(
                "formula exceeds the nesting depth budget of {}",
                self.max_depth
            )));
        }
        Ok(())
    }

    fn expr(&mut self, depth: usize) -> Result<Expr, FormulaError> {
        self.check_depth(depth)?;
        let mut lhs = self.term(depth + 1)?;
        while let Some(spanned) = self.peek() {
            let op = match spanned.token {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.term(depth + 1)?;
            self.count_node()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn term(&mut self, depth: usize) -> Result<Expr, FormulaError> {
        self.check_depth(depth)?;
        let mut lhs = self.factor(depth + 1)?;
        while let Some(spanned) = self.peek() {
            let op = match spanned.token {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.factor(depth + 1)?;
            self.count_node()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn factor(&mut self, depth: usize) -> Result<Expr, FormulaError> {
        self.check_depth(depth)?;
        if matches!(self.peek().map(|s| &s.token), Some(Token::Minus)) {
            self.advance();
            let inner = self.atom(depth + 1)?;
            self.count_node()?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.atom(depth + 1)
    }

    fn atom(&mut self, depth: usize) -> Result<Expr, FormulaError> {
        self.check_depth(depth)?;
        let spanned = self.advance().ok_or_else(|| {
            FormulaError::syntax(self.end_position(), "unexpected end of formula")
        })?;
        match spanned.token {
            Token::Number(value) => {
                self.count_node()?;
                Ok(Expr::Number(value))
            }
            Token::Ident(name) => {
                if matches!(self.peek().map(|s| &s.token), Some(Token::LParen)) {
                    let func = Func::from_name(&name)
                        .ok_or_else(|| FormulaError::UnknownIdentifier(name.clone()))?;
                    self.call(func, spanned.position, depth)
                } else {
                    self.count_node()?;
                    Ok(Expr::Ident(name))
                }
            }
            Token::LParen => {
                let inner = self.expr(depth + 1)?;
                self.expect_rparen()?;
                Ok(inner)
            }
            other => Err(FormulaError::syntax(
                spanned.position,
                format!("unexpected token: {other:?}"),
            )),
        }
    }

    fn call(&mut self, func: Func, position: usize, depth: usize) -> Result<Expr, FormulaError> {
        self.advance(); // consume '('
        let mut args = vec![self.expr(depth + 1)?];
        while matches!(self.peek().map(|s| &s.token), Some(Token::Comma)) {
            self.advance();
            args.push(self.expr(depth + 1)?);
        }
        self.expect_rparen()?;

        let (min, max) = func.arity();
        if args.len() < min || args.len() > max {
            let expected = match (min, max) {
                (n, usize::MAX) => format!("at least {n}"),
                (n, m) if n == m => format!("exactly {n}"),
                (n, m) => format!("between {n} and {m}"),
            };
            return Err(FormulaError::DisallowedConstruct(format!(
                "{}() expects {} argument(s), got {} (at position {})",
                func.name(),
                expected,
                args.len(),
                position
            )));
        }

        self.count_node()?;
        Ok(Expr::Call { func, args })
    }

    fn expect_rparen(&mut self) -> Result<(), FormulaError> {
        match self.advance() {
            Some(Spanned {
                token: Token::RParen,
                ..
            }) => Ok(()),
            Some(spanned) => Err(FormulaError::syntax(
                spanned.position,
                format!("expected ')', found {:?}", spanned.token),
            )),
            None => Err(FormulaError::syntax(
                self.end_position(),
                "expected ')', found end of formula",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_default(src: &str) -> Result<Expr, FormulaError> {
        parse(src, &EvalLimits::default())
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = parse_default("1 + 2 * 3").unwrap();
        match expr {
            Expr::Binary { op: BinOp::Add, rhs, .. } => {
                assert!(matches!(*rhs, Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("unexpected tree: {other:?}"),
        }
    }

    #[test]
    fn parens_override_precedence() {
        let expr = parse_default("(1 + 2) * 3").unwrap();
        match expr {
            Expr::Binary { op: BinOp::Mul, lhs, .. } => {
                assert!(matches!(*lhs, Expr::Binary { op: BinOp::Add, .. }));
            }
            other => panic!("unexpected tree: {other:?}"),
        }
    }

    #[test]
    fn unary_minus_wraps_the_atom() {
        let expr = parse_default("-totalSpent * 2").unwrap();
        match expr {
            Expr::Binary { op: BinOp::Mul, lhs, .. } => {
                assert!(matches!(*lhs, Expr::Neg(_)));
            }
            other => panic!("unexpected tree: {other:?}"),
        }
    }

    #[test]
    fn empty_formula_is_a_syntax_error() {
        assert!(matches!(parse_default(""), Err(FormulaError::Syntax { .. })));
        assert!(matches!(parse_default("   "), Err(FormulaError::Syntax { .. })));
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        assert!(matches!(
            parse_default("1 2"),
            Err(FormulaError::Syntax { .. })
        ));
        assert!(matches!(
            parse_default("totalSpent totalRevenue"),
            Err(FormulaError::Syntax { .. })
        ));
    }

    #[test]
    fn unknown_function_names_are_rejected() {
        assert_eq!(
            parse_default("eval(1)"),
            Err(FormulaError::UnknownIdentifier("eval".to_string()))
        );
        assert_eq!(
            parse_default("require(1)"),
            Err(FormulaError::UnknownIdentifier("require".to_string()))
        );
    }

    #[test]
    fn function_arity_is_enforced() {
        assert!(matches!(
            parse_default("max(1)"),
            Err(FormulaError::DisallowedConstruct(_))
        ));
        assert!(matches!(
            parse_default("abs(1, 2)"),
            Err(FormulaError::DisallowedConstruct(_))
        ));
        assert!(matches!(
            parse_default("round(1, 2, 3)"),
            Err(FormulaError::DisallowedConstruct(_))
        ));
        assert!(parse_default("max(1, 2, 3, 4)").is_ok());
        assert!(parse_default("round(1.5)").is_ok());
    }

    #[test]
    fn unbalanced_parens_are_rejected() {
        assert!(matches!(
            parse_default("(1 + 2"),
            Err(FormulaError::Syntax { .. })
        ));
        assert!(matches!(
            parse_default("1 + 2)"),
            Err(FormulaError::Syntax { .. })
        ));
    }

    #[test]
    fn deep_nesting_exceeds_the_depth_budget() {
        let src = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert!(matches!(
            parse_default(&src),
            Err(FormulaError::DisallowedConstruct(_))
        ));
    }

    #[test]
    fn wide_formulas_exceed_the_node_budget() {
        let src = vec!["1"; 600].join(" + ");
        assert!(matches!(
            parse_default(&src),
            Err(FormulaError::DisallowedConstruct(_))
        ));
    }
}
