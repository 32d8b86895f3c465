//! Recursive-descent parser over the token stream.
//!
//! The grammar is small enough that hand-rolled descent stays readable:
//!
//! ```text
//! query      := SELECT [DISTINCT] projection FROM Entity alias
//!               [WHERE or_expr] [ORDER BY order_list] [GROUP BY group_list]
//! projection := alias | COUNT '(' alias ')'
//! or_expr    := and_group (OR and_group)*
//! and_group  := condition (AND condition)*
//! condition  := [NOT] path operator operand
//! path       := alias ('.' ident)+
//! operator   := '=' | '>' | '<' | '>=' | '<=' | LIKE | NOT LIKE | IN | NOT IN
//! operand    := ':'param | string | number
//! ```
//!
//! `AND` binds tighter than `OR`; `NOT` binds to a single comparison.
//! Parentheses in the WHERE clause are not part of the language.
//!
//! Attribute paths are resolved against the metamodel as they are parsed, so
//! every condition leaving this module carries its predicate IRI chain and
//! has passed the static type checks.

use ontoql_metamodel::{MetamodelProvider, ValueType};

use crate::error::CompileError;
use crate::lexer::{self, Keyword, Token, TokenKind};
use crate::model::{
    BooleanGroup, CmpOp, Condition, Direction, GroupItem, Operand, Operator, OrderItem, PathExpr,
    Projection, QueryModel,
};
use crate::paths::{resolve_path, ResolvedPath};

/// Parse and resolve `query` into a [`QueryModel`].
pub(crate) fn parse(
    query: &str,
    metamodel: &dyn MetamodelProvider,
) -> Result<QueryModel, CompileError> {
    let tokens = lexer::tokens(query)?;
    Parser {
        tokens,
        pos: 0,
        eof: query.len(),
        metamodel,
    }
    .query()
}

/// Projection functions the surface recognizes but does not compile.
const REJECTED_FUNCTIONS: &[&str] = &["LOWER", "UPPER", "LENGTH", "ABS", "CEIL", "FLOOR"];

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    eof: usize,
    metamodel: &'a dyn MetamodelProvider,
}

impl Parser<'_> {
    fn query(&mut self) -> Result<QueryModel, CompileError> {
        self.expect_keyword(Keyword::Select)?;
        let distinct = self.eat_keyword(Keyword::Distinct);
        let (projection, projection_alias, alias_position) = self.projection()?;

        self.expect_keyword(Keyword::From)?;
        let entity = self.expect_ident("entity type name")?;
        let alias = self.expect_ident("entity alias")?;

        let root_type_iri = self
            .metamodel
            .root_type_iri(&entity)
            .ok_or_else(|| CompileError::UnknownEntity(entity.clone()))?
            .to_string();

        if projection_alias != alias {
            return Err(CompileError::syntax(
                alias_position,
                format!(
                    "projection references `{projection_alias}` but the FROM clause binds `{alias}`"
                ),
            ));
        }

        let mut groups = Vec::new();
        if self.eat_keyword(Keyword::Where) {
            groups = self.or_expr(&entity, &alias)?;
        }

        let mut order_by = Vec::new();
        let mut group_by = Vec::new();
        loop {
            if self.peek_keyword(Keyword::Order) {
                if !order_by.is_empty() {
                    return Err(self.unexpected("duplicate ORDER BY clause"));
                }
                self.bump();
                self.expect_keyword(Keyword::By)?;
                order_by = self.order_list(&entity, &alias)?;
            } else if self.peek_keyword(Keyword::Group) {
                if !group_by.is_empty() {
                    return Err(self.unexpected("duplicate GROUP BY clause"));
                }
                self.bump();
                self.expect_keyword(Keyword::By)?;
                group_by = self.group_list(&entity, &alias)?;
            } else {
                break;
            }
        }

        if let Some(token) = self.peek() {
            return Err(CompileError::syntax(
                token.position,
                format!("unexpected `{}` after the end of the query", token.text),
            ));
        }

        Ok(QueryModel {
            projection,
            distinct,
            entity,
            alias,
            root_type_iri,
            groups,
            order_by,
            group_by,
        })
    }

    /// Returns the projection form plus the alias it references (with its
    /// position, for the alias-mismatch diagnostic).
    fn projection(&mut self) -> Result<(Projection, String, usize), CompileError> {
        if self.peek_keyword(Keyword::Count) {
            let count_pos = self.bump().position;
            self.expect_punct(TokenKind::LParen, "(")?;
            let alias_position = self.peek().map(|t| t.position).unwrap_or(self.eof);
            let alias = self.expect_ident("aggregated alias")?;
            if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Comma)) {
                return Err(CompileError::UnsupportedConstruct(format!(
                    "COUNT takes exactly one argument (at offset {count_pos})"
                )));
            }
            self.expect_punct(TokenKind::RParen, ")")?;
            return Ok((Projection::Count, alias, alias_position));
        }

        let alias_position = self.peek().map(|t| t.position).unwrap_or(self.eof);
        let alias = self.expect_ident("projection alias")?;
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::LParen)) {
            let upper = alias.to_ascii_uppercase();
            let detail = if REJECTED_FUNCTIONS.contains(&upper.as_str()) {
                format!("function `{upper}` is not supported in the projection")
            } else {
                format!("function call `{alias}(...)` in the projection")
            };
            return Err(CompileError::UnsupportedConstruct(detail));
        }
        Ok((Projection::Entity, alias, alias_position))
    }

    fn or_expr(&mut self, entity: &str, alias: &str) -> Result<Vec<BooleanGroup>, CompileError> {
        let mut groups = vec![self.and_group(entity, alias)?];
        while self.eat_keyword(Keyword::Or) {
            groups.push(self.and_group(entity, alias)?);
        }
        Ok(groups)
    }

    fn and_group(&mut self, entity: &str, alias: &str) -> Result<BooleanGroup, CompileError> {
        let mut conditions = vec![self.condition(entity, alias)?];
        while self.eat_keyword(Keyword::And) {
            conditions.push(self.condition(entity, alias)?);
        }
        Ok(BooleanGroup { conditions })
    }

    fn condition(&mut self, entity: &str, alias: &str) -> Result<Condition, CompileError> {
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::LParen)) {
            return Err(CompileError::UnsupportedConstruct(
                "parenthesized boolean grouping".to_string(),
            ));
        }
        let negated = self.eat_keyword(Keyword::Not);
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::LParen)) {
            return Err(CompileError::UnsupportedConstruct(
                "NOT applied to a parenthesized group".to_string(),
            ));
        }

        let (source, resolved) = self.path(entity, alias)?;
        let operator = self.operator()?;
        let operand = self.operand()?;

        check_types(&source, &resolved, operator, &operand)?;

        Ok(Condition {
            source,
            resolved,
            operator,
            operand,
            negated,
        })
    }

    /// `alias ('.' ident)+`, resolved against the metamodel as it is read.
    fn path(&mut self, entity: &str, alias: &str) -> Result<(PathExpr, ResolvedPath), CompileError> {
        let head_position = self.peek().map(|t| t.position).unwrap_or(self.eof);
        let head = self.expect_ident("attribute path")?;
        if head != alias {
            return Err(CompileError::syntax(
                head_position,
                format!("attribute path must start with the FROM alias `{alias}`, found `{head}`"),
            ));
        }
        self.expect_punct(TokenKind::Dot, ".")?;

        let position = self.peek().map(|t| t.position).unwrap_or(self.eof);
        let mut segments = vec![self.expect_ident("attribute name")?];
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Dot)) {
            self.bump();
            segments.push(self.expect_ident("attribute name")?);
        }

        let source = PathExpr {
            alias: alias.to_string(),
            segments,
            position,
        };
        let resolved = resolve_path(self.metamodel, entity, &source)?;
        Ok((source, resolved))
    }

    fn operator(&mut self) -> Result<Operator, CompileError> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| CompileError::syntax(self.eof, "expected a comparison operator"))?;
        let op = match &token.kind {
            TokenKind::Eq => Operator::Equality,
            TokenKind::Gt => Operator::Comparison(CmpOp::Gt),
            TokenKind::Lt => Operator::Comparison(CmpOp::Lt),
            TokenKind::Ge => Operator::Comparison(CmpOp::Ge),
            TokenKind::Le => Operator::Comparison(CmpOp::Le),
            TokenKind::Keyword(Keyword::Like) => Operator::Pattern { negated: false },
            TokenKind::Keyword(Keyword::In) => Operator::Membership { negated: false },
            TokenKind::Keyword(Keyword::Not) => {
                self.bump();
                return if self.eat_keyword(Keyword::Like) {
                    Ok(Operator::Pattern { negated: true })
                } else if self.eat_keyword(Keyword::In) {
                    Ok(Operator::Membership { negated: true })
                } else {
                    Err(CompileError::syntax(
                        token.position,
                        "expected LIKE or IN after NOT",
                    ))
                };
            }
            _ => {
                return Err(CompileError::syntax(
                    token.position,
                    format!("expected a comparison operator, found `{}`", token.text),
                ))
            }
        };
        self.bump();
        Ok(op)
    }

    fn operand(&mut self) -> Result<Operand, CompileError> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| CompileError::syntax(self.eof, "expected a comparison operand"))?;
        let operand = match token.kind {
            TokenKind::Param(name) => Operand::Param(name),
            TokenKind::Str(s) => Operand::Str(s),
            TokenKind::Number(n) => Operand::Number(n),
            _ => {
                return Err(CompileError::syntax(
                    token.position,
                    format!(
                        "expected a parameter or literal operand, found `{}`",
                        token.text
                    ),
                ))
            }
        };
        self.bump();
        Ok(operand)
    }

    fn order_list(&mut self, entity: &str, alias: &str) -> Result<Vec<OrderItem>, CompileError> {
        let mut items = Vec::new();
        loop {
            let (source, resolved) = self.path(entity, alias)?;
            let direction = self.direction();
            items.push(OrderItem {
                source,
                resolved,
                direction,
            });
            if !self.eat_punct(TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    /// Same surface grammar as the order list; a direction keyword is
    /// tolerated and dropped (grouping has no direction).
    fn group_list(&mut self, entity: &str, alias: &str) -> Result<Vec<GroupItem>, CompileError> {
        let mut items = Vec::new();
        loop {
            let (source, resolved) = self.path(entity, alias)?;
            self.direction();
            items.push(GroupItem { source, resolved });
            if !self.eat_punct(TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    fn direction(&mut self) -> Direction {
        if self.eat_keyword(Keyword::Desc) {
            Direction::Desc
        } else {
            self.eat_keyword(Keyword::Asc);
            Direction::Asc
        }
    }

    // ------------------------------------------------------------------
    // Token-stream plumbing
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_keyword(&self, kw: Keyword) -> bool {
        matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Keyword(k)) if *k == kw)
    }

    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        self.pos += 1;
        token
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.peek_keyword(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_punct(&mut self, kind: TokenKind) -> bool {
        if self.peek().map(|t| &t.kind) == Some(&kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> Result<(), CompileError> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(self.unexpected(format!("expected {}", format!("{kw:?}").to_uppercase())))
        }
    }

    fn expect_punct(&mut self, kind: TokenKind, display: &str) -> Result<(), CompileError> {
        if self.eat_punct(kind) {
            Ok(())
        } else {
            Err(self.unexpected(format!("expected `{display}`")))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, CompileError> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Ident(name),
                ..
            }) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected(format!("expected {what}"))),
        }
    }

    fn unexpected(&self, message: impl Into<String>) -> CompileError {
        let mut message = message.into();
        match self.peek() {
            Some(token) => {
                message.push_str(&format!(", found `{}`", token.text));
                CompileError::syntax(token.position, message)
            }
            None => {
                message.push_str(", found end of query");
                CompileError::syntax(self.eof, message)
            }
        }
    }
}

/// Static checks between an operator/operand and the leaf attribute's
/// declared value type. `Untyped` leaves pass everything.
fn check_types(
    source: &PathExpr,
    resolved: &ResolvedPath,
    operator: Operator,
    operand: &Operand,
) -> Result<(), CompileError> {
    let leaf_type = resolved.leaf_value_type();

    if matches!(operator, Operator::Pattern { .. }) && !leaf_type.is_textual() {
        return Err(CompileError::TypeMismatch(format!(
            "LIKE applied to `{}`, which is declared {:?}",
            source.key(),
            leaf_type
        )));
    }

    let literal_type = match operand {
        Operand::Param(_) => return Ok(()),
        Operand::Str(_) => match leaf_type {
            ValueType::String | ValueType::DateTime | ValueType::Untyped => return Ok(()),
            _ => ValueType::String,
        },
        Operand::Number(n) => {
            let kind = if n.contains('.') {
                ValueType::Decimal
            } else {
                ValueType::Integer
            };
            if leaf_type.accepts(kind) {
                return Ok(());
            }
            kind
        }
    };

    Err(CompileError::TypeMismatch(format!(
        "{literal_type:?} literal compared against `{}`, which is declared {:?}",
        source.key(),
        leaf_type
    )))
}
