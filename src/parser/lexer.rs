//! Lexer for draw and selection expressions using logos

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Namespace prefix accepted (and dropped) in front of function names
const MATH_NAMESPACE: &str = "TMath::";

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Arithmetic (longer patterns first)
    #[token("**")]
    StarStar,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("^")]
    Caret,

    // Logic
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,

    // Comparison operators (longer first)
    #[token("==")]
    EqualEqual,
    #[token("!=")]
    NotEqual,
    #[token(">=")]
    GreaterOrEqual,
    #[token("<=")]
    LessOrEqual,
    #[token(">")]
    Greater,
    #[token("<")]
    Less,

    // Delimiters
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,

    // Column and function names; `TMath::Abs` lexes as `Abs`, `jet.pt` stays dotted
    #[regex(r"([a-zA-Z_][a-zA-Z0-9_]*::)?[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*", |lex| {
        let s = lex.slice();
        s.strip_prefix(MATH_NAMESPACE).unwrap_or(s).to_string()
    })]
    Ident(String),

    #[regex(r"([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),
}

/// Lex input string into tokens with spans
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operators() {
        let tokens: Vec<_> = lex("* ** ^ && || ! == != <= >=").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Star,
                Token::StarStar,
                Token::Caret,
                Token::AndAnd,
                Token::OrOr,
                Token::Bang,
                Token::EqualEqual,
                Token::NotEqual,
                Token::LessOrEqual,
                Token::GreaterOrEqual,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens: Vec<_> = lex("1 2.5 .5 1e3 2e-1").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Number(1.0),
                Token::Number(2.5),
                Token::Number(0.5),
                Token::Number(1000.0),
                Token::Number(0.2),
            ]
        );
    }

    #[test]
    fn test_dotted_identifier() {
        let tokens: Vec<_> = lex("jet.pt").map(|(t, _)| t).collect();
        assert_eq!(tokens, vec![Token::Ident("jet.pt".to_string())]);
    }

    #[test]
    fn test_math_namespace_stripped() {
        let tokens: Vec<_> = lex("TMath::Abs(x)").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("Abs".to_string()),
                Token::ParenOpen,
                Token::Ident("x".to_string()),
                Token::ParenClose,
            ]
        );
    }

    #[test]
    fn test_draw_dimensions() {
        let tokens: Vec<_> = lex("y:x").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("y".to_string()),
                Token::Colon,
                Token::Ident("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_spans() {
        let spans: Vec<_> = lex("a + bc").map(|(_, s)| s).collect();
        assert_eq!(spans, vec![0..1, 2..3, 4..6]);
    }
}
