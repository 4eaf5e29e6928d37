//! Lexer for the scene format using logos

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Statement keywords
    #[token("constrain")]
    Constrain,
    #[token("measure")]
    Measure,
    #[token("average")]
    Average,
    #[token("chain")]
    Chain,
    #[token("boundary")]
    Boundary,
    #[token("around")]
    Around,
    #[token("sum")]
    Sum,
    #[token("place")]
    Place,
    #[token("in")]
    In,
    #[token("table")]
    Table,
    #[token("by")]
    By,
    #[token("pass")]
    Pass,

    // Arithmetic
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,

    // Delimiters
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,

    // Comparison operators (longer first)
    #[token(">=")]
    GreaterOrEqual,
    #[token("<=")]
    LessOrEqual,
    #[token("=")]
    Equals,

    // Literals - identifiers must come after keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    // Comments (skip)
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,
}

/// Lex input string into tokens with spans
/// Tokenize `input`.
///
/// Fails with the spans of all unrecognized input, adjacent ones merged.
pub fn lex(input: &str) -> Result<Vec<(Token, Span)>, Vec<Span>> {
    let mut tokens = Vec::new();
    let mut errors: Vec<Span> = Vec::new();
    for (token, span) in Token::lexer(input).spanned() {
        match token {
            Ok(token) => tokens.push((token, span)),
            Err(()) => match errors.last_mut() {
                Some(last) if last.end == span.start => last.end = span.end,
                _ => errors.push(span),
            },
        }
    }
    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}
