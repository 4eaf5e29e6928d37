//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::layout::{ChainStyle, Direction, MeasureFrom};
use crate::parser::ast::*;
use crate::parser::lexer::{lex, Token};

/// Top-level item before passes are grouped
enum Item {
    Statement(Spanned<Statement>),
    Pass(Spanned<Vec<Spanned<Statement>>>),
}

/// Parse scene source into an AST
pub fn parse(input: &str) -> Result<Scene, Vec<crate::ParseError>> {
    let len = input.len();

    let tokens = lex(input).map_err(|spans| {
        spans
            .into_iter()
            .map(|span| crate::ParseError::unrecognized(&input[span.clone()], span))
            .collect::<Vec<_>>()
    })?;
    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    scene_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn binary(op: BinaryOp, lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    let span = lhs.span.start..rhs.span.end;
    Spanned::new(
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        span,
    )
}

fn identifier_parser<'a, I>(
) -> impl Parser<'a, I, Spanned<Identifier>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    select! {
        Token::Ident(s) => Identifier::new(s),
    }
    .map_with(|id, e| Spanned::new(id, span_range(&e.span())))
}

fn number_parser<'a, I>() -> impl Parser<'a, I, f64, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    select! {
        Token::Number(n) => n,
    }
}

/// Number with an optional leading minus
fn signed_number_parser<'a, I>(
) -> impl Parser<'a, I, Spanned<f64>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    just(Token::Minus)
        .or_not()
        .then(number_parser())
        .map_with(|(neg, n), e| {
            let value = if neg.is_some() { -n } else { n };
            Spanned::new(value, span_range(&e.span()))
        })
}

/// `+`/`-` over `*` over unary minus over atoms
fn expr_parser<'a, I>() -> impl Parser<'a, I, Spanned<Expr>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let identifier = identifier_parser();

    recursive(|expr| {
        let reference = identifier
            .clone()
            .then(just(Token::Dot).ignore_then(identifier.clone()).or_not())
            .map(|(name, member)| match member {
                Some(member) => Expr::Member {
                    dimension: name.node,
                    member,
                },
                None => Expr::Variable(name.node),
            });

        let atom = choice((
            number_parser().map(Expr::Number),
            reference,
            expr.delimited_by(just(Token::ParenOpen), just(Token::ParenClose))
                .map(|inner: Spanned<Expr>| inner.node),
        ))
        .map_with(|node, e| Spanned::new(node, span_range(&e.span())));

        let unary = just(Token::Minus)
            .or_not()
            .then(atom)
            .map_with(|(neg, operand), e| match neg {
                Some(_) => Spanned::new(Expr::Neg(Box::new(operand)), span_range(&e.span())),
                None => operand,
            });

        let product = unary
            .clone()
            .then(
                just(Token::Star)
                    .ignore_then(unary)
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(|(first, rest)| {
                rest.into_iter()
                    .fold(first, |lhs, rhs| binary(BinaryOp::Mul, lhs, rhs))
            });

        let additive = choice((
            just(Token::Plus).to(BinaryOp::Add),
            just(Token::Minus).to(BinaryOp::Sub),
        ));

        product
            .clone()
            .then(additive.then(product).repeated().collect::<Vec<_>>())
            .map(|(first, rest)| {
                rest.into_iter()
                    .fold(first, |lhs, (op, rhs)| binary(op, lhs, rhs))
            })
            .boxed()
    })
}

fn scene_parser<'a, I>() -> impl Parser<'a, I, Scene, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let identifier = identifier_parser();
    let expr = expr_parser();
    let signed_number = signed_number_parser();

    let comparison = choice((
        just(Token::Equals).to(Comparison::Equal),
        just(Token::LessOrEqual).to(Comparison::LessOrEqual),
        just(Token::GreaterOrEqual).to(Comparison::GreaterOrEqual),
    ));

    // `[key, key: value, ...]`
    let option_value = choice((
        signed_number.clone().map(|n| OptionValue::Number(n.node)),
        identifier.clone().map(|id| OptionValue::Word(id.node)),
    ))
    .map_with(|v, e| Spanned::new(v, span_range(&e.span())));

    let option = identifier
        .clone()
        .then(just(Token::Colon).ignore_then(option_value).or_not())
        .map_with(|(key, value), e| Spanned::new(SceneOption { key, value }, span_range(&e.span())));

    let options = option
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::BracketOpen), just(Token::BracketClose));

    let name_list = identifier
        .clone()
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::BracketOpen), just(Token::BracketClose));

    let expr_list = expr
        .clone()
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::BracketOpen), just(Token::BracketClose));

    let direction = identifier.clone().try_map(|id, span| {
        Direction::from_name(id.node.as_str()).ok_or_else(|| {
            Rich::custom(
                span,
                format!(
                    "unknown chain direction '{}' (expected row, row_reverse, column or column_reverse)",
                    id.node
                ),
            )
        })
    });

    let style = identifier.clone().try_map(|id, span| {
        ChainStyle::from_name(id.node.as_str()).ok_or_else(|| {
            Rich::custom(
                span,
                format!(
                    "unknown chain style '{}' (expected spread, spread_inside, packed or gapless)",
                    id.node
                ),
            )
        })
    });

    let measure_from = identifier.clone().try_map(|id, span| {
        MeasureFrom::from_name(id.node.as_str()).ok_or_else(|| {
            Rich::custom(
                span,
                format!("unknown placement '{}' (expected sides or center)", id.node),
            )
        })
    });

    let count = number_parser().try_map(|n, span| {
        if n.fract() == 0.0 && n >= 0.0 && n <= u32::MAX as f64 {
            Ok(n as usize)
        } else {
            Err(Rich::custom(span, format!("expected a whole number, got {}", n)))
        }
    });

    // constrain <expr> (=|<=|>=) <expr> [options]
    let constrain_decl = just(Token::Constrain)
        .ignore_then(expr.clone())
        .then(comparison.clone())
        .then(expr.clone())
        .then(options.clone().or_not())
        .map(|(((lhs, comparison), rhs), options)| Statement::Constrain {
            lhs,
            comparison,
            rhs,
            options: options.unwrap_or_default(),
        });

    // measure <dim> <w> <h>
    let measure_decl = just(Token::Measure)
        .ignore_then(identifier.clone())
        .then(signed_number.clone())
        .then(signed_number.clone())
        .map(|((dimension, width), height)| Statement::Measure {
            dimension,
            width,
            height,
        });

    // average [<expr>, ...] >= <expr>
    let average_decl = just(Token::Average)
        .ignore_then(expr_list.clone())
        .then_ignore(just(Token::GreaterOrEqual))
        .then(expr.clone())
        .map(|(inputs, target)| Statement::Average { inputs, target });

    // chain <name> <direction> <style> in <dim> [<dim>, ...]
    let chain_decl = just(Token::Chain)
        .ignore_then(identifier.clone())
        .then(direction)
        .then(style)
        .then_ignore(just(Token::In))
        .then(identifier.clone())
        .then(name_list.clone())
        .map(
            |((((name, direction), style), boundary), items)| Statement::Chain {
                name,
                direction,
                style,
                boundary,
                items,
            },
        );

    // boundary <dim> around [<dim>, ...] [options]
    let boundary_decl = just(Token::Boundary)
        .ignore_then(identifier.clone())
        .then_ignore(just(Token::Around))
        .then(name_list.clone())
        .then(options.clone().or_not())
        .map(|((boundary, members), options)| Statement::Boundary {
            boundary,
            members,
            options: options.unwrap_or_default(),
        });

    // sum <name> [<w> * <atom>, ...] (=|<=|>=) <expr>
    let weighted_term = signed_number
        .clone()
        .then_ignore(just(Token::Star))
        .then(expr.clone());
    let sum_decl = just(Token::Sum)
        .ignore_then(identifier.clone())
        .then(
            weighted_term
                .separated_by(just(Token::Comma))
                .allow_trailing()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::BracketOpen), just(Token::BracketClose)),
        )
        .then(comparison)
        .then(expr.clone())
        .map(|(((name, terms), comparison), target)| Statement::Sum {
            name,
            terms,
            comparison,
            target,
        });

    // place <dim> in <dim> (sides|center) [options]
    let place_decl = just(Token::Place)
        .ignore_then(identifier.clone())
        .then_ignore(just(Token::In))
        .then(identifier.clone())
        .then(measure_from)
        .then(options.or_not())
        .map(|(((inner, outer), measure_from), options)| Statement::Place {
            inner,
            outer,
            measure_from,
            options: options.unwrap_or_default(),
        });

    // table <name> in <dim> <rows> by <cols>
    let table_decl = just(Token::Table)
        .ignore_then(identifier.clone())
        .then_ignore(just(Token::In))
        .then(identifier)
        .then(count.clone())
        .then_ignore(just(Token::By))
        .then(count)
        .map(|(((name, boundary), rows), cols)| Statement::Table {
            name,
            boundary,
            rows,
            cols,
        });

    let statement = choice((
        constrain_decl,
        measure_decl,
        average_decl,
        chain_decl,
        boundary_decl,
        sum_decl,
        place_decl,
        table_decl,
    ))
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())))
    .boxed();

    // pass { ... }
    let pass_block = just(Token::Pass)
        .ignore_then(
            statement
                .clone()
                .repeated()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::BraceOpen), just(Token::BraceClose)),
        )
        .map_with(|statements, e| Spanned::new(statements, span_range(&e.span())));

    choice((pass_block.map(Item::Pass), statement.map(Item::Statement)))
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
        .map(|items| {
            let mut scene = Scene::default();
            for item in items {
                match item {
                    Item::Statement(s) => scene.statements.push(s),
                    Item::Pass(p) => scene.passes.push(p),
                }
            }
            scene
        })
}
