//! Evaluation of parsed expressions against named values

use std::collections::HashMap;

use thiserror::Error;

use crate::parser::ast::{BinaryOp, Expr, UnaryOp};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}' takes {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: &'static str,
        found: usize,
    },

    #[error("parameter [{0}] is not set")]
    MissingParameter(usize),
}

/// Source of named scalar values for evaluation
pub trait Variables {
    fn lookup(&self, name: &str) -> Option<f64>;
}

impl Variables for HashMap<String, f64> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl Variables for () {
    fn lookup(&self, _name: &str) -> Option<f64> {
        None
    }
}

/// A single `x` variable, as used by one-dimensional functions
pub struct X(pub f64);

impl Variables for X {
    fn lookup(&self, name: &str) -> Option<f64> {
        (name == "x").then_some(self.0)
    }
}

fn truth(v: f64) -> bool {
    v != 0.0
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Evaluate an expression. Comparisons and logic yield 1 or 0.
pub fn eval(expr: &Expr, vars: &dyn Variables, params: &[f64]) -> Result<f64, EvalError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Var(name) => vars
            .lookup(name)
            .ok_or_else(|| EvalError::UnknownVariable(name.clone())),
        Expr::Param(i) => params
            .get(*i)
            .copied()
            .ok_or(EvalError::MissingParameter(*i)),
        Expr::Unary(op, e) => {
            let v = eval(e, vars, params)?;
            Ok(match op {
                UnaryOp::Neg => -v,
                UnaryOp::Not => flag(!truth(v)),
            })
        }
        Expr::Binary(op, a, b) => {
            let lhs = eval(a, vars, params)?;
            // short-circuit logic so guarded expressions do not fail
            match op {
                BinaryOp::And if !truth(lhs) => return Ok(0.0),
                BinaryOp::Or if truth(lhs) => return Ok(1.0),
                _ => {}
            }
            let rhs = eval(b, vars, params)?;
            Ok(match op {
                BinaryOp::Add => lhs + rhs,
                BinaryOp::Sub => lhs - rhs,
                BinaryOp::Mul => lhs * rhs,
                BinaryOp::Div => lhs / rhs,
                BinaryOp::Pow => lhs.powf(rhs),
                BinaryOp::Lt => flag(lhs < rhs),
                BinaryOp::Le => flag(lhs <= rhs),
                BinaryOp::Gt => flag(lhs > rhs),
                BinaryOp::Ge => flag(lhs >= rhs),
                BinaryOp::Eq => flag(lhs == rhs),
                BinaryOp::Ne => flag(lhs != rhs),
                BinaryOp::And | BinaryOp::Or => flag(truth(rhs)),
            })
        }
        Expr::Call(name, args) => {
            let values = args
                .iter()
                .map(|a| eval(a, vars, params))
                .collect::<Result<Vec<_>, _>>()?;
            call(name, &values)
        }
    }
}

fn call(name: &str, args: &[f64]) -> Result<f64, EvalError> {
    let arity = |expected: &'static str| EvalError::Arity {
        name: name.to_string(),
        expected,
        found: args.len(),
    };
    let unary = |f: fn(f64) -> f64| match args {
        [x] => Ok(f(*x)),
        _ => Err(arity("1")),
    };
    let binary = |f: fn(f64, f64) -> f64| match args {
        [a, b] => Ok(f(*a, *b)),
        _ => Err(arity("2")),
    };

    match name.to_ascii_lowercase().as_str() {
        "sqrt" => unary(f64::sqrt),
        "abs" => unary(f64::abs),
        "exp" => unary(f64::exp),
        "log" => unary(f64::ln),
        "log10" => unary(f64::log10),
        "sin" => unary(f64::sin),
        "cos" => unary(f64::cos),
        "tan" => unary(f64::tan),
        "asin" => unary(f64::asin),
        "acos" => unary(f64::acos),
        "atan" => unary(f64::atan),
        "floor" => unary(f64::floor),
        "ceil" => unary(f64::ceil),
        "sq" => unary(|x| x * x),
        "atan2" => binary(f64::atan2),
        "pow" | "power" => binary(f64::powf),
        "min" => binary(f64::min),
        "max" => binary(f64::max),
        "pi" if args.is_empty() => Ok(std::f64::consts::PI),
        "e" if args.is_empty() => Ok(std::f64::consts::E),
        "gaus" => match args {
            [x] => Ok(gaus(*x, 0.0, 1.0)),
            [x, mean] => Ok(gaus(*x, *mean, 1.0)),
            [x, mean, sigma] => Ok(gaus(*x, *mean, *sigma)),
            _ => Err(arity("1 to 3")),
        },
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}

/// Unnormalized Gaussian
fn gaus(x: f64, mean: f64, sigma: f64) -> f64 {
    if sigma == 0.0 {
        return 1e30;
    }
    let arg = (x - mean) / sigma;
    (-0.5 * arg * arg).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expr;

    fn eval_str(src: &str, vars: &dyn Variables) -> Result<f64, EvalError> {
        eval(&parse_expr(src).unwrap(), vars, &[])
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_str("1 + 2 * 3", &()).unwrap(), 7.0);
        assert_eq!(eval_str("-2^2", &()).unwrap(), -4.0);
        assert_eq!(eval_str("(1 + 2) / 4", &()).unwrap(), 0.75);
    }

    #[test]
    fn test_variables() {
        let mut vars = HashMap::new();
        vars.insert("pt".to_string(), 3.0);
        vars.insert("jet.eta".to_string(), -0.5);
        assert_eq!(eval_str("pt * 2", &vars).unwrap(), 6.0);
        assert_eq!(eval_str("abs(jet.eta) < 1 && pt > 2", &vars).unwrap(), 1.0);
        assert_eq!(
            eval_str("missing + 1", &vars),
            Err(EvalError::UnknownVariable("missing".to_string()))
        );
    }

    #[test]
    fn test_short_circuit() {
        assert_eq!(eval_str("0 && missing", &()).unwrap(), 0.0);
        assert_eq!(eval_str("1 || missing", &()).unwrap(), 1.0);
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval_str("sqrt(16)", &()).unwrap(), 4.0);
        assert_eq!(eval_str("max(2, 5)", &()).unwrap(), 5.0);
        assert_eq!(eval_str("TMath::Abs(-3)", &()).unwrap(), 3.0);
        assert_eq!(eval_str("gaus(0)", &()).unwrap(), 1.0);
        assert!((eval_str("TMath::Pi()", &()).unwrap() - std::f64::consts::PI).abs() < 1e-12);
        assert!(matches!(eval_str("sqrt(1, 2)", &()), Err(EvalError::Arity { .. })));
        assert!(matches!(eval_str("nope(1)", &()), Err(EvalError::UnknownFunction(_))));
    }

    #[test]
    fn test_params_and_x() {
        let e = parse_expr("[0] + [1] * x").unwrap();
        assert_eq!(eval(&e, &X(2.0), &[1.0, 3.0]).unwrap(), 7.0);
        assert_eq!(eval(&e, &X(2.0), &[1.0]), Err(EvalError::MissingParameter(1)));
    }
}
