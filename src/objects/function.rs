//! One-dimensional parametric functions defined by a formula

use crate::error::ParseError;
use crate::parser::{eval, parse_expr, EvalError, Expr, X};

use super::style::Style;

/// Default number of sampling points when drawing
pub const DEFAULT_NPX: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub title: String,
    formula: String,
    expr: Expr,
    pub params: Vec<f64>,
    pub min: f64,
    pub max: f64,
    pub npx: usize,
    pub style: Style,
}

/// Expand the named shortcuts `gaus`, `expo` and `pol0`..`pol9`
fn expand_builtin(formula: &str) -> String {
    let trimmed = formula.trim();
    match trimmed {
        "gaus" => return "[0]*exp(-0.5*((x-[1])/[2])^2)".to_string(),
        "expo" => return "exp([0]+[1]*x)".to_string(),
        _ => {}
    }
    if let Some(order) = trimmed
        .strip_prefix("pol")
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|n| *n <= 9)
    {
        return (0..=order)
            .map(|i| match i {
                0 => "[0]".to_string(),
                1 => "[1]*x".to_string(),
                i => format!("[{}]*x^{}", i, i),
            })
            .collect::<Vec<_>>()
            .join("+");
    }
    trimmed.to_string()
}

impl Function {
    /// Parse `formula` over the range `[min, max]`. Parameters start at zero.
    pub fn new(
        name: impl Into<String>,
        formula: &str,
        min: f64,
        max: f64,
    ) -> Result<Self, Vec<ParseError>> {
        let formula = expand_builtin(formula);
        let expr = parse_expr(&formula)?;
        let n_params = expr.max_param().map_or(0, |p| p + 1);
        Ok(Self {
            name: name.into(),
            title: String::new(),
            formula,
            expr,
            params: vec![0.0; n_params],
            min,
            max,
            npx: DEFAULT_NPX,
            style: Style::default(),
        })
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn class_name(&self) -> &'static str {
        "TF1"
    }

    pub fn set_parameter(&mut self, i: usize, value: f64) {
        if i >= self.params.len() {
            self.params.resize(i + 1, 0.0);
        }
        self.params[i] = value;
    }

    pub fn eval(&self, x: f64) -> Result<f64, EvalError> {
        eval(&self.expr, &X(x), &self.params)
    }

    /// `npx` evenly spaced points over the range; points that fail to evaluate are skipped
    pub fn sample(&self) -> Vec<(f64, f64)> {
        let n = self.npx.max(2);
        let step = (self.max - self.min) / (n - 1) as f64;
        (0..n)
            .map(|i| self.min + step * i as f64)
            .filter_map(|x| self.eval(x).ok().filter(|y| y.is_finite()).map(|y| (x, y)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula_with_params() {
        let mut f = Function::new("f", "[0] + [1]*x", 0.0, 1.0).unwrap();
        assert_eq!(f.params.len(), 2);
        f.set_parameter(0, 1.0);
        f.set_parameter(1, 2.0);
        assert_eq!(f.eval(3.0).unwrap(), 7.0);
    }

    #[test]
    fn test_builtin_gaus() {
        let mut f = Function::new("g", "gaus", -5.0, 5.0).unwrap();
        f.params = vec![2.0, 0.0, 1.0];
        assert_eq!(f.eval(0.0).unwrap(), 2.0);
    }

    #[test]
    fn test_builtin_pol() {
        assert_eq!(expand_builtin("pol2"), "[0]+[1]*x+[2]*x^2");
        let mut f = Function::new("p", "pol2", 0.0, 1.0).unwrap();
        f.params = vec![1.0, 1.0, 1.0];
        assert_eq!(f.eval(2.0).unwrap(), 7.0);
    }

    #[test]
    fn test_sample_skips_invalid() {
        let mut f = Function::new("s", "sqrt(x)", -1.0, 1.0).unwrap();
        f.npx = 3;
        let points = f.sample();
        assert_eq!(points, vec![(0.0, 0.0), (1.0, 1.0)]);
    }

    #[test]
    fn test_bad_formula() {
        assert!(Function::new("b", "x +", 0.0, 1.0).is_err());
    }
}
