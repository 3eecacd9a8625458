//! Abstract Syntax Tree types for draw and selection expressions

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

/// A scalar expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// Column or variable reference, possibly dotted (`jet.pt`)
    Var(String),
    /// Function parameter reference `[n]`
    Param(usize),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

impl Expr {
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary(op, Box::new(operand))
    }

    /// Highest `[n]` parameter index referenced, if any
    pub fn max_param(&self) -> Option<usize> {
        match self {
            Expr::Param(i) => Some(*i),
            Expr::Number(_) | Expr::Var(_) => None,
            Expr::Unary(_, e) => e.max_param(),
            Expr::Binary(_, a, b) => a.max_param().max(b.max_param()),
            Expr::Call(_, args) => args.iter().filter_map(Expr::max_param).max(),
        }
    }
}

/// A draw expression: one scalar expression per histogram dimension
///
/// Dimensions are written outermost first, so `y:x` fills x on the first
/// axis and y on the second.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawExpr {
    pub dims: Vec<Spanned<Expr>>,
}

impl DrawExpr {
    pub fn dim(&self) -> usize {
        self.dims.len()
    }

    /// Expressions in axis order (x first)
    pub fn axis_order(&self) -> impl Iterator<Item = &Expr> {
        self.dims.iter().rev().map(|d| &d.node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_param() {
        let e = Expr::binary(
            BinaryOp::Mul,
            Expr::Param(0),
            Expr::Call(
                "exp".into(),
                vec![Expr::binary(BinaryOp::Mul, Expr::Param(2), Expr::Var("x".into()))],
            ),
        );
        assert_eq!(e.max_param(), Some(2));
        assert_eq!(Expr::Var("x".into()).max_param(), None);
    }

    #[test]
    fn test_axis_order() {
        let d = DrawExpr {
            dims: vec![
                Spanned::new(Expr::Var("y".into()), 0..1),
                Spanned::new(Expr::Var("x".into()), 2..3),
            ],
        };
        let order: Vec<_> = d.axis_order().cloned().collect();
        assert_eq!(order, vec![Expr::Var("x".into()), Expr::Var("y".into())]);
    }
}
