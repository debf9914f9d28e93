use super::error::{EvalError, EvalResult};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// Applies the operator with pointer-width wrapping semantics.
    pub fn apply(self, lhs: usize, rhs: usize) -> EvalResult<usize> {
        Ok(match self {
            BinaryOp::Add => lhs.wrapping_add(rhs),
            BinaryOp::Sub => lhs.wrapping_sub(rhs),
            BinaryOp::Mul => lhs.wrapping_mul(rhs),
            BinaryOp::Div => {
                if rhs == 0 {
                    return Err(EvalError::DivisionByZero);
                }
                lhs / rhs
            }
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        };
        fmt.write_str(op)
    }
}

/// Parsed address expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Literal(usize),
    Identifier(String),
}

impl Expr {
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Evaluates the tree post-order. The first error encountered wins.
    pub fn eval(&self, identifiers: &HashMap<String, usize>) -> EvalResult<usize> {
        match self {
            Expr::Literal(value) => Ok(*value),
            Expr::Identifier(name) => resolve(identifiers, name),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = lhs.eval(identifiers)?;
                let rhs = rhs.eval(identifiers)?;
                op.apply(lhs, rhs)
            }
        }
    }
}

/// Case-insensitive identifier lookup.
///
/// Maps built with lower-cased keys hit on the first probe.
fn resolve(identifiers: &HashMap<String, usize>, name: &str) -> EvalResult<usize> {
    if let Some(value) = identifiers.get(&name.to_lowercase()) {
        return Ok(*value);
    }

    identifiers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| *value)
        .ok_or_else(|| EvalError::UnknownIdentifier(name.to_string()))
}

impl fmt::Display for Expr {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(fmt, "{:#x}", value),
            Expr::Identifier(name) => fmt.write_str(name),
            Expr::Binary { op, lhs, rhs } => write!(fmt, "({} {} {})", lhs, op, rhs),
        }
    }
}
