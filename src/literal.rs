use std::ops::Range;

use chumsky::{error::SimpleReason, prelude::*};

use crate::{
    defs::FsRef,
    error::ParseSyntaxError,
    store::Store,
    value::{Atom, Value},
};

pub mod build;

pub type Span = Range<usize>;

/// A reentrance identifier together with where it was written.
pub type Tag = (String, Span);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Atom(Atom),
    Var(String),
    Struct(StructLiteral),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLiteral {
    /// `(n)` in front of the opening bracket.
    pub tag: Option<Tag>,
    pub features: Vec<FeatureLiteral>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLiteral {
    pub name: String,
    pub body: FeatureBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureBody {
    /// `name = value` or `name(n) = value`.
    Assign { tag: Option<Tag>, value: Literal },
    /// `name -> (n)`.
    Reentrance(Tag),
}

impl Literal {
    pub fn parser() -> impl Parser<char, Literal, Error = Simple<char>> + Clone {
        Self::parser_non_end_terminated().then_ignore(end())
    }

    pub fn parser_non_end_terminated() -> impl Parser<char, Literal, Error = Simple<char>> + Clone {
        let tag = text::int::<char, Simple<char>>(10)
            .labelled("reentrance identifier")
            .delimited_by(just('(').padded(), just(')').padded())
            .map_with_span(|id: String, span: Span| (id, span));

        let name = filter(|c: &char| !c.is_whitespace() && !"()[]\"'=-,".contains(*c))
            .repeated()
            .at_least(1)
            .collect::<String>()
            .padded()
            .labelled("feature name");

        let escape = just('\\').ignore_then(choice((
            just('\\'),
            just('"'),
            just('\''),
            just('n').to('\n'),
            just('t').to('\t'),
        )));

        let quoted = |quote: char| {
            just(quote)
                .ignore_then(
                    filter(move |c: &char| *c != '\\' && *c != quote)
                        .or(escape.clone())
                        .repeated(),
                )
                .then_ignore(just(quote))
                .collect::<String>()
        };

        let string = quoted('"')
            .or(quoted('\''))
            .map(|s| Literal::Atom(Atom::Str(s)))
            .labelled("string");

        let var = just('?')
            .ignore_then(text::ident())
            .map(Literal::Var)
            .labelled("variable");

        // Integers, `None`, `True`, `False` and bare symbols share a token.
        let word = filter(|c: &char| c.is_alphanumeric() || *c == '_' || *c == '-')
            .repeated()
            .at_least(1)
            .collect::<String>()
            .try_map(classify_word)
            .labelled("value");

        recursive::<char, Literal, _, _, _>(move |value| {
            let feature = name
                .clone()
                .then(
                    just("->")
                        .padded()
                        .ignore_then(tag.clone())
                        .map(FeatureBody::Reentrance)
                        .or(tag
                            .clone()
                            .or_not()
                            .then_ignore(just('=').padded())
                            .then(value)
                            .map(|(tag, value)| FeatureBody::Assign { tag, value })),
                )
                .map(|(name, body)| FeatureLiteral { name, body });

            let structure = tag
                .clone()
                .or_not()
                .then(
                    feature
                        .separated_by(just(',').padded())
                        .delimited_by(just('[').padded(), just(']').padded()),
                )
                .map(|(tag, features)| Literal::Struct(StructLiteral { tag, features }));

            structure.or(string).or(var).or(word)
        })
        .padded()
    }
}

fn classify_word(word: String, span: Span) -> Result<Literal, Simple<char>> {
    let atom = match word.as_str() {
        "None" => Atom::None,
        "True" => Atom::Bool(true),
        "False" => Atom::Bool(false),
        _ => match word.parse::<i64>() {
            Ok(i) => Atom::Int(i),
            Err(_) if is_integer(&word) => {
                return Err(Simple::custom(span, "integer out of range"));
            }
            Err(_) if word.contains('-') => {
                return Err(Simple::custom(span, "an integer, symbol or structure"));
            }
            Err(_) => Atom::Str(word),
        },
    };
    Ok(Literal::Atom(atom))
}

fn is_integer(word: &str) -> bool {
    let digits = word.strip_prefix('-').unwrap_or(word);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn syntax_error(error: Simple<char>) -> ParseSyntaxError {
    let expected = match error.reason() {
        SimpleReason::Custom(msg) => msg.clone(),
        SimpleReason::Unclosed { delimiter, .. } => format!("a closing match for `{delimiter}`"),
        SimpleReason::Unexpected => match error.label() {
            Some(label) => label.to_owned(),
            None => {
                let mut items = error
                    .expected()
                    .map(|c| match c {
                        Some(c) => format!("`{c}`"),
                        None => "end of input".to_owned(),
                    })
                    .collect::<Vec<_>>();
                items.sort();
                items.dedup();
                if items.is_empty() {
                    "valid input".to_owned()
                } else {
                    items.join(" or ")
                }
            }
        },
    };
    ParseSyntaxError {
        expected,
        position: error.span().start,
    }
}

/// Parse a bracketed feature structure literal such as
/// `[agr=(1)[num=sg], subj=[agr->(1)]]` into `store`.
///
/// On error nothing is left behind in `store`.
pub fn parse(store: &mut Store, text: &str) -> Result<FsRef, ParseSyntaxError> {
    let _span = tracing::trace_span!("parsing", src = text).entered();
    match parse_literal(text)? {
        Literal::Struct(root) => build::Builder::new().build_struct_atomically(&root, store),
        _ => Err(ParseSyntaxError {
            expected: "open bracket or identifier".to_owned(),
            position: text.len() - text.trim_start().len(),
        }),
    }
}

/// Parse any literal value: a structure, atom or variable.
pub fn parse_value(store: &mut Store, text: &str) -> Result<Value, ParseSyntaxError> {
    let _span = tracing::trace_span!("parsing", src = text).entered();
    let literal = parse_literal(text)?;
    build::Builder::new().build_atomically(&literal, store)
}

/// Parse `text` into a syntax tree without touching any store.
pub fn parse_literal(text: &str) -> Result<Literal, ParseSyntaxError> {
    Literal::parser().parse(text).map_err(|errors| {
        let error = errors
            .into_iter()
            .min_by_key(|e| e.span().start)
            .map(syntax_error)
            .unwrap_or(ParseSyntaxError {
                expected: "valid input".to_owned(),
                position: 0,
            });
        tracing::debug!(%error, "rejected literal");
        error
    })
}
