//! OntoQL lexer.
//!
//! Tokenization is lazy, pure, and restartable: [`tokenize`] returns an
//! iterator over tokens and re-tokenizing the same text yields the same
//! sequence. Keywords are matched case-insensitively (JPA-QL convention);
//! identifiers keep their case.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while, take_while1},
    character::complete::{char as pchar, digit1},
    combinator::{map, opt, recognize},
    sequence::{delimited, preceded, tuple},
    IResult,
};

use crate::error::CompileError;

/// Reserved words of the query surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Select,
    Distinct,
    Count,
    From,
    Where,
    Not,
    And,
    Or,
    Like,
    In,
    Order,
    Group,
    By,
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(Keyword),
    Ident(String),
    /// Named parameter, `:name` (without the colon).
    Param(String),
    /// String literal (without quotes).
    Str(String),
    /// Integer or decimal literal, kept as written.
    Number(String),
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
    Dot,
    Comma,
    LParen,
    RParen,
}

/// One token: kind, raw text, and byte offset into the query string.
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: usize,
}

/// Lazily tokenize `input`. The returned iterator yields `Err` at most once
/// (fail-fast) and then terminates.
pub fn tokenize(input: &str) -> Lexer<'_> {
    Lexer {
        src: input,
        rest: input,
    }
}

/// Collect the full token sequence, stopping at the first malformed token.
pub(crate) fn tokens(input: &str) -> Result<Vec<Token>, CompileError> {
    tokenize(input).collect()
}

#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    src: &'a str,
    rest: &'a str,
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, CompileError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rest = self.rest.trim_start();
        if self.rest.is_empty() {
            return None;
        }
        let position = self.src.len() - self.rest.len();
        match lex_token(self.rest, position) {
            Ok((rest, kind)) => {
                let consumed = self.rest.len() - rest.len();
                let text = self.rest[..consumed].to_string();
                self.rest = rest;
                Some(Ok(Token {
                    kind,
                    text,
                    position,
                }))
            }
            Err(e) => {
                self.rest = "";
                Some(Err(e))
            }
        }
    }
}

fn lex_token(input: &str, position: usize) -> Result<(&str, TokenKind), CompileError> {
    if let Some(after) = input.strip_prefix(':') {
        let Ok((rest, name)) = identifier(after) else {
            return Err(CompileError::Lex {
                position,
                message: "unterminated parameter name after `:`".to_string(),
            });
        };
        return Ok((rest, TokenKind::Param(name)));
    }

    if input.starts_with('\'') || input.starts_with('"') {
        return match string_literal(input) {
            Ok((rest, s)) => Ok((rest, TokenKind::Str(s))),
            Err(_) => Err(CompileError::Lex {
                position,
                message: "unterminated string literal".to_string(),
            }),
        };
    }

    if let Ok((rest, digits)) = number(input) {
        return Ok((rest, TokenKind::Number(digits)));
    }

    if let Ok((rest, kind)) = punctuation(input) {
        return Ok((rest, kind));
    }

    if let Ok((rest, name)) = identifier(input) {
        let kind = match keyword_of(&name) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Ident(name),
        };
        return Ok((rest, kind));
    }

    let offending = input.chars().next().unwrap_or(' ');
    Err(CompileError::Lex {
        position,
        message: format!("unrecognized character `{offending}`"),
    })
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(tuple((
            take_while1(is_ident_start),
            take_while(is_ident_continue),
        ))),
        |s: &str| s.to_string(),
    )(input)
}

fn number(input: &str) -> IResult<&str, String> {
    map(
        recognize(tuple((digit1, opt(preceded(pchar('.'), digit1))))),
        |s: &str| s.to_string(),
    )(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    fn body(quote: char) -> impl Fn(&str) -> IResult<&str, String> {
        move |input| {
            let content = map(
                opt(is_not(if quote == '\'' { "'" } else { "\"" })),
                |s: Option<&str>| s.unwrap_or("").to_string(),
            );
            delimited(pchar(quote), content, pchar(quote))(input)
        }
    }
    alt((body('\''), body('"')))(input)
}

fn punctuation(input: &str) -> IResult<&str, TokenKind> {
    alt((
        map(tag(">="), |_| TokenKind::Ge),
        map(tag("<="), |_| TokenKind::Le),
        map(pchar('='), |_| TokenKind::Eq),
        map(pchar('>'), |_| TokenKind::Gt),
        map(pchar('<'), |_| TokenKind::Lt),
        map(pchar('.'), |_| TokenKind::Dot),
        map(pchar(','), |_| TokenKind::Comma),
        map(pchar('('), |_| TokenKind::LParen),
        map(pchar(')'), |_| TokenKind::RParen),
    ))(input)
}

fn keyword_of(ident: &str) -> Option<Keyword> {
    let kw = match ident.to_ascii_uppercase().as_str() {
        "SELECT" => Keyword::Select,
        "DISTINCT" => Keyword::Distinct,
        "COUNT" => Keyword::Count,
        "FROM" => Keyword::From,
        "WHERE" => Keyword::Where,
        "NOT" => Keyword::Not,
        "AND" => Keyword::And,
        "OR" => Keyword::Or,
        "LIKE" => Keyword::Like,
        "IN" => Keyword::In,
        "ORDER" => Keyword::Order,
        "GROUP" => Keyword::Group,
        "BY" => Keyword::By,
        "ASC" => Keyword::Asc,
        "DESC" => Keyword::Desc,
        _ => return None,
    };
    Some(kw)
}
