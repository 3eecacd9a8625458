//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::parser::ast::*;
use crate::parser::lexer::Token;

/// Parse a single scalar expression (a selection, a formula, an assignment)
pub fn parse_expr(input: &str) -> Result<Expr, Vec<crate::ParseError>> {
    let len = input.len();

    // Create a logos lexer and convert to token stream
    let token_iter = crate::parser::lexer::lex(input).map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    expr_parser()
        .then_ignore(end())
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Parse a draw expression: scalar expressions separated by `:`
pub fn parse_draw(input: &str) -> Result<DrawExpr, Vec<crate::ParseError>> {
    let len = input.len();
    let token_iter = crate::parser::lexer::lex(input).map(|(tok, span)| (tok, span.into()));
    let token_stream = Stream::from_iter(token_iter).map((len..len).into(), |(t, s): (_, _)| (t, s));

    draw_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

/// Left-fold `first (op operand)*` into nested binary nodes
fn fold_binary((first, rest): (Expr, Vec<(BinaryOp, Expr)>)) -> Expr {
    rest.into_iter()
        .fold(first, |lhs, (op, rhs)| Expr::binary(op, lhs, rhs))
}

fn draw_parser<'a, I>() -> impl Parser<'a, I, DrawExpr, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    expr_parser()
        .map_with(|expr, e| Spanned::new(expr, span_range(&e.span())))
        .separated_by(just(Token::Colon))
        .at_least(1)
        .collect::<Vec<_>>()
        .then_ignore(end())
        .map(|dims| DrawExpr { dims })
}

fn expr_parser<'a, I>() -> impl Parser<'a, I, Expr, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    recursive(|expr| {
        let number = select! {
            Token::Number(n) => Expr::Number(n),
        };

        let param = select! {
            Token::Number(n) => n,
        }
        .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
        .try_map(|n, span| {
            if n >= 0.0 && n.fract() == 0.0 {
                Ok(Expr::Param(n as usize))
            } else {
                Err(Rich::custom(
                    span,
                    "parameter index must be a non-negative integer",
                ))
            }
        });

        let args = expr
            .clone()
            .separated_by(just(Token::Comma))
            .collect::<Vec<_>>()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

        // `name(args)` is a call, a bare name is a column or variable
        let name = select! {
            Token::Ident(s) => s,
        }
        .then(args.or_not())
        .map(|(name, args)| match args {
            Some(args) => Expr::Call(name, args),
            None => Expr::Var(name),
        });

        let atom = choice((
            number,
            param,
            name,
            expr.clone()
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
        ))
        .boxed();

        let pow_op = choice((just(Token::Caret), just(Token::StarStar)));

        // Power binds tighter than unary minus and is right-associative:
        // -x^2 is -(x^2), 2^3^2 is 2^(3^2)
        let unary = recursive(|unary| {
            choice((
                just(Token::Minus)
                    .ignore_then(unary.clone())
                    .map(|e| Expr::unary(UnaryOp::Neg, e)),
                just(Token::Bang)
                    .ignore_then(unary.clone())
                    .map(|e| Expr::unary(UnaryOp::Not, e)),
                just(Token::Plus).ignore_then(unary.clone()),
                atom.clone()
                    .then(pow_op.clone().ignore_then(unary).or_not())
                    .map(|(base, exp)| match exp {
                        Some(exp) => Expr::binary(BinaryOp::Pow, base, exp),
                        None => base,
                    }),
            ))
        })
        .boxed();

        let product = unary
            .clone()
            .then(
                choice((
                    just(Token::Star).to(BinaryOp::Mul),
                    just(Token::Slash).to(BinaryOp::Div),
                ))
                .then(unary)
                .repeated()
                .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed();

        let sum = product
            .clone()
            .then(
                choice((
                    just(Token::Plus).to(BinaryOp::Add),
                    just(Token::Minus).to(BinaryOp::Sub),
                ))
                .then(product)
                .repeated()
                .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed();

        let comparison = sum
            .clone()
            .then(
                choice((
                    just(Token::EqualEqual).to(BinaryOp::Eq),
                    just(Token::NotEqual).to(BinaryOp::Ne),
                    just(Token::LessOrEqual).to(BinaryOp::Le),
                    just(Token::GreaterOrEqual).to(BinaryOp::Ge),
                    just(Token::Less).to(BinaryOp::Lt),
                    just(Token::Greater).to(BinaryOp::Gt),
                ))
                .then(sum)
                .repeated()
                .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed();

        let and = comparison
            .clone()
            .then(
                just(Token::AndAnd)
                    .to(BinaryOp::And)
                    .then(comparison)
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed();

        and.clone()
            .then(
                just(Token::OrOr)
                    .to(BinaryOp::Or)
                    .then(and)
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(fold_binary)
    })
}
