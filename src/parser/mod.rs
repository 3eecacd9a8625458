//! Parser and evaluator for draw, selection and formula expressions

pub mod ast;
pub mod eval;
mod grammar;
pub mod lexer;

pub use ast::*;
pub use eval::{eval, EvalError, Variables, X};
pub use grammar::{parse_draw, parse_expr};
