//! Parsed query model.
//!
//! The WHERE clause is deliberately flat: an ordered list of boolean groups
//! joined by OR, each group an ordered AND-chain of conditions. AND never
//! nests within AND, and `NOT` binds to a single comparison, so no tree
//! shape survives parsing — the algebra builder works directly on this
//! two-level structure.

use serde::{Deserialize, Serialize};

use crate::paths::ResolvedPath;

/// A dotted attribute reference as written in the query, e.g. `p.phone.number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathExpr {
    pub alias: String,
    pub segments: Vec<String>,
    /// Byte offset of the first segment, for diagnostics.
    pub position: usize,
}

impl PathExpr {
    /// Canonical key identifying this path within one query (alias-less).
    pub fn key(&self) -> String {
        self.segments.join(".")
    }

    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Variable for leaves bound by filtering operators: the alias followed
    /// by every segment in capitalized form (`p` + `age` → `pAge`).
    /// Guaranteed distinct from the parameter variable, so a FILTER can
    /// relate the two.
    pub fn filter_variable(&self) -> String {
        let mut out = self.alias.clone();
        for segment in &self.segments {
            out.push_str(&capitalized(segment));
        }
        out
    }
}

pub(crate) fn capitalized(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Gt,
    Lt,
    Ge,
    Le,
}

impl CmpOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CmpOp::Gt => ">",
            CmpOp::Lt => "<",
            CmpOp::Ge => ">=",
            CmpOp::Le => "<=",
        }
    }
}

/// Closed operator vocabulary. Operator-level negation (`NOT LIKE`,
/// `NOT IN`) is part of the operator; it is orthogonal to the prefix `NOT`
/// that negates a whole condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equality,
    Comparison(CmpOp),
    Pattern { negated: bool },
    Membership { negated: bool },
}

impl Operator {
    /// Equality binds the object variable directly; everything else needs a
    /// synthesized variable plus a FILTER expression.
    pub fn is_filter(self) -> bool {
        !matches!(self, Operator::Equality)
    }
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Param(String),
    Str(String),
    Number(String),
}

impl Operand {
    /// SPARQL spelling of the operand.
    pub fn render(&self) -> String {
        match self {
            Operand::Param(name) => format!("?{name}"),
            Operand::Str(s) => format!("\"{}\"", s.replace('"', "\\\"")),
            Operand::Number(n) => n.clone(),
        }
    }
}

/// One comparison: a resolved attribute path, an operator, and an operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub source: PathExpr,
    pub resolved: ResolvedPath,
    pub operator: Operator,
    pub operand: Operand,
    /// Prefix `NOT`: the condition is rendered inside the group's negated
    /// block.
    pub negated: bool,
}

/// A maximal AND-chain of conditions within one OR-branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BooleanGroup {
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// Bare alias: select the root entity variable.
    Entity,
    /// `COUNT(alias)`: aggregate bound to the fixed `count` output variable.
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub source: PathExpr,
    pub resolved: ResolvedPath,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupItem {
    pub source: PathExpr,
    pub resolved: ResolvedPath,
}

/// The complete parsed query. Owns its groups and path chains exclusively;
/// nothing here outlives one compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryModel {
    pub projection: Projection,
    pub distinct: bool,
    pub entity: String,
    pub alias: String,
    pub root_type_iri: String,
    /// OR-joined boolean groups; empty when the query has no WHERE clause.
    pub groups: Vec<BooleanGroup>,
    pub order_by: Vec<OrderItem>,
    pub group_by: Vec<GroupItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(alias: &str, segments: &[&str]) -> PathExpr {
        PathExpr {
            alias: alias.to_string(),
            segments: segments.iter().map(|s| s.to_string()).collect(),
            position: 0,
        }
    }

    #[test]
    fn filter_variable_concatenates_capitalized_segments() {
        assert_eq!(path("p", &["age"]).filter_variable(), "pAge");
        assert_eq!(
            path("g", &["owlClassH", "owlClassA", "stringAttribute"]).filter_variable(),
            "gOwlClassHOwlClassAStringAttribute"
        );
    }

    #[test]
    fn operand_rendering() {
        assert_eq!(Operand::Param("age".to_string()).render(), "?age");
        assert_eq!(Operand::Str("a\"b".to_string()).render(), "\"a\\\"b\"");
        assert_eq!(Operand::Number("3.14".to_string()).render(), "3.14");
    }

    #[test]
    fn condition_roundtrips_through_json() {
        use crate::paths::{ResolvedHop, ResolvedPath};
        use ontoql_metamodel::ValueType;

        let condition = Condition {
            source: path("p", &["age"]),
            resolved: ResolvedPath {
                hops: vec![ResolvedHop {
                    segment: "age".to_string(),
                    predicate_iri: "http://example.org/voc#age".to_string(),
                    is_join: false,
                    value_type: ValueType::Integer,
                }],
            },
            operator: Operator::Comparison(CmpOp::Gt),
            operand: Operand::Param("age".to_string()),
            negated: true,
        };
        let json = serde_json::to_string(&condition).expect("serialize");
        let back: Condition = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, condition);

        // Every operator/operand shape must survive the trip.
        for operator in [
            Operator::Equality,
            Operator::Pattern { negated: true },
            Operator::Membership { negated: false },
        ] {
            let json = serde_json::to_string(&operator).expect("serialize");
            let back: Operator = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(back, operator);
        }
        for operand in [
            Operand::Param("p".to_string()),
            Operand::Str("s".to_string()),
            Operand::Number("1.5".to_string()),
        ] {
            let json = serde_json::to_string(&operand).expect("serialize");
            let back: Operand = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(back, operand);
        }
    }

    #[test]
    fn only_equality_skips_the_filter() {
        assert!(!Operator::Equality.is_filter());
        assert!(Operator::Comparison(CmpOp::Ge).is_filter());
        assert!(Operator::Pattern { negated: true }.is_filter());
        assert!(Operator::Membership { negated: false }.is_filter());
    }
}
