// real-valued parameter expressions. top-level expressions are folded to
// constants right away, gate-body expressions are kept and folded per use
// with the actual parameter values bound.

use crate::error::{Position, QError, QResult, SymbolKind};
use std::collections::HashMap;
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Sqrt,
}

impl Func {
    pub fn from_name(name: &str) -> Option<Func> {
        let f = match name {
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "exp" => Func::Exp,
            "ln" => Func::Ln,
            "sqrt" => Func::Sqrt,
            _ => return None,
        };
        Some(f)
    }

    fn eval(self, x: f64) -> f64 {
        match self {
            Func::Sin => x.sin(),
            Func::Cos => x.cos(),
            Func::Tan => x.tan(),
            Func::Exp => x.exp(),
            Func::Ln => x.ln(),
            Func::Sqrt => x.sqrt(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Pi,
    Param(String, Position),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(Func, Box<Expr>),
}

/// Parameter bindings of one gate invocation.
pub type Env = HashMap<String, f64>;

impl Expr {
    pub fn eval(&self, env: &Env) -> QResult<f64> {
        let v = match self {
            Expr::Num(v) => *v,
            Expr::Pi => PI,
            Expr::Param(name, pos) => *env
                .get(name)
                .ok_or_else(|| QError::undeclared(SymbolKind::Parameter, name.clone(), Some(*pos)))?,
            Expr::Neg(e) => -e.eval(env)?,
            Expr::Binary(op, l, r) => {
                let (a, b) = (l.eval(env)?, r.eval(env)?);
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    BinOp::Pow => a.powf(b),
                }
            }
            Expr::Call(f, e) => f.eval(e.eval(env)?),
        };
        Ok(v)
    }

    /// Constant value, failing on any parameter reference.
    pub fn fold(&self) -> QResult<f64> {
        self.eval(&Env::new())
    }

    /// First parameter reference not contained in `params`.
    pub fn unbound<'a>(&'a self, params: &[String]) -> Option<(&'a str, Position)> {
        match self {
            Expr::Num(_) | Expr::Pi => None,
            Expr::Param(name, pos) => (!params.contains(name)).then_some((name.as_str(), *pos)),
            Expr::Neg(e) | Expr::Call(_, e) => e.unbound(params),
            Expr::Binary(_, l, r) => l.unbound(params).or_else(|| r.unbound(params)),
        }
    }
}
