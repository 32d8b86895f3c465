//! Condition algebra builder.
//!
//! Lowers the flat query model into the graph-pattern structure the renderer
//! serializes:
//!
//! 1. within one boolean group, affirmative conditions keep source order and
//!    all negated conditions collapse into a single negated block appended
//!    after them;
//! 2. two or more OR-groups become braced blocks joined left-to-right by
//!    UNION (n-1 connectives, no tree balancing);
//! 3. paths referenced only by ORDER BY / GROUP BY are rendered exactly once
//!    as sequential patterns hoisted before all other WHERE content, so
//!    sorting sees them outside any UNION branch;
//! 4. equality against a named parameter binds the parameter's variable
//!    directly in object position and emits no filter; every other operator
//!    binds a synthesized variable and relates it to the operand in a FILTER
//!    expression.
//!
//! Variable registration happens here, in render order, so the parameter
//! registry reads like the compiled query.

use std::collections::HashMap;

use ontoql_metamodel::ValueType;

use crate::error::CompileError;
use crate::model::{Condition, Direction, Operand, Operator, Projection, QueryModel};
use crate::params::ParameterRegistry;
use crate::paths::ResolvedPath;

/// One rendered triple pattern; all three terms are already in their SPARQL
/// spelling (`?var`, `<iri>`, literal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

/// One condition lowered to its triples plus an optional filter expression
/// (without the `FILTER (...)` wrapper).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCondition {
    pub triples: Vec<TriplePattern>,
    pub filter: Option<String>,
}

/// One OR-branch after rule 1: affirmatives in source order, negated
/// conditions set aside for the shared negated block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupPattern {
    pub affirmative: Vec<RenderedCondition>,
    pub negated: Vec<RenderedCondition>,
}

/// The fully lowered query, ready for serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryAlgebra {
    pub projection: Projection,
    pub distinct: bool,
    pub root_type_iri: String,
    /// Patterns hoisted for ORDER BY / GROUP BY paths unbound by WHERE.
    pub hoisted: Vec<TriplePattern>,
    pub branches: Vec<GroupPattern>,
    /// Variable (with `?`) and direction per ORDER BY entry.
    pub order_by: Vec<(String, Direction)>,
    /// Variable (with `?`) per GROUP BY entry.
    pub group_by: Vec<String>,
}

/// Lower `model`, registering every query variable in `registry` in
/// first-appearance order.
pub fn build(
    model: &QueryModel,
    registry: &mut ParameterRegistry,
) -> Result<QueryAlgebra, CompileError> {
    registry.register("x", ValueType::Untyped)?;
    if model.projection == Projection::Count {
        registry.register("count", ValueType::Untyped)?;
    }

    // Path key -> object variable bound by a WHERE condition. Equality
    // against a literal binds no variable, so those paths are absent and
    // get hoisted like any WHERE-free clause path.
    let mut bound_vars: HashMap<String, String> = HashMap::new();
    for condition in model.groups.iter().flat_map(|g| &g.conditions) {
        if let Some(var) = object_variable(condition) {
            bound_vars.entry(condition.source.key()).or_insert(var);
        }
    }

    let mut hoisted = Vec::new();
    let clause_paths = model
        .order_by
        .iter()
        .map(|o| (&o.source, &o.resolved))
        .chain(model.group_by.iter().map(|g| (&g.source, &g.resolved)));
    for (source, resolved) in clause_paths {
        let key = source.key();
        if bound_vars.contains_key(&key) {
            continue;
        }
        let leaf_var = resolved.leaf().segment.clone();
        hoisted.extend(triple_chain(resolved, &leaf_var, registry)?);
        bound_vars.insert(key, leaf_var);
    }

    let mut branches = Vec::with_capacity(model.groups.len());
    for group in &model.groups {
        let mut pattern = GroupPattern::default();
        for condition in &group.conditions {
            let rendered = lower_condition(condition, registry)?;
            if condition.negated {
                pattern.negated.push(rendered);
            } else {
                pattern.affirmative.push(rendered);
            }
        }
        branches.push(pattern);
    }

    let order_by = model
        .order_by
        .iter()
        .map(|item| {
            // Hoisting guarantees a binding for every clause path.
            let var = &bound_vars[&item.source.key()];
            (format!("?{var}"), item.direction)
        })
        .collect();
    let group_by = model
        .group_by
        .iter()
        .map(|item| format!("?{}", bound_vars[&item.source.key()]))
        .collect();

    Ok(QueryAlgebra {
        projection: model.projection,
        distinct: model.distinct,
        root_type_iri: model.root_type_iri.clone(),
        hoisted,
        branches,
        order_by,
        group_by,
    })
}

/// The variable a condition binds in object position, if any.
fn object_variable(condition: &Condition) -> Option<String> {
    if condition.operator.is_filter() {
        Some(condition.source.filter_variable())
    } else {
        match &condition.operand {
            Operand::Param(name) => Some(name.clone()),
            _ => None,
        }
    }
}

/// Render the join chain of `resolved` ending in `leaf_var`, registering
/// every variable it introduces.
fn triple_chain(
    resolved: &ResolvedPath,
    leaf_var: &str,
    registry: &mut ParameterRegistry,
) -> Result<Vec<TriplePattern>, CompileError> {
    let mut triples = Vec::with_capacity(resolved.hops.len());
    let mut subject = "?x".to_string();
    for hop in &resolved.hops {
        let object_var = if hop.is_join {
            hop.segment.as_str()
        } else {
            leaf_var
        };
        registry.register(object_var, ValueType::Untyped)?;
        let object = format!("?{object_var}");
        triples.push(TriplePattern {
            subject,
            predicate: format!("<{}>", hop.predicate_iri),
            object: object.clone(),
        });
        subject = object;
    }
    Ok(triples)
}

fn lower_condition(
    condition: &Condition,
    registry: &mut ParameterRegistry,
) -> Result<RenderedCondition, CompileError> {
    let leaf_type = condition.resolved.leaf_value_type();

    if !condition.operator.is_filter() {
        // Equality: the operand sits directly in object position.
        let triples = match &condition.operand {
            Operand::Param(name) => {
                let triples = triple_chain(&condition.resolved, name, registry)?;
                registry.register(name, leaf_type)?;
                triples
            }
            literal => {
                let mut triples = join_triples(&condition.resolved, registry)?;
                let subject = triples
                    .last()
                    .map(|t| t.object.clone())
                    .unwrap_or_else(|| "?x".to_string());
                let leaf = condition.resolved.leaf();
                triples.push(TriplePattern {
                    subject,
                    predicate: format!("<{}>", leaf.predicate_iri),
                    object: literal.render(),
                });
                triples
            }
        };
        return Ok(RenderedCondition {
            triples,
            filter: None,
        });
    }

    let var = condition.source.filter_variable();
    let triples = triple_chain(&condition.resolved, &var, registry)?;
    if let Operand::Param(name) = &condition.operand {
        registry.register(name, leaf_type)?;
    }
    let operand = condition.operand.render();
    let filter = match condition.operator {
        Operator::Comparison(op) => format!("?{var} {} {operand}", op.as_str()),
        Operator::Pattern { negated: false } => format!("regex(?{var},{operand})"),
        Operator::Pattern { negated: true } => format!("!regex(?{var},{operand})"),
        Operator::Membership { negated: false } => format!("?{var} IN ({operand})"),
        Operator::Membership { negated: true } => format!("?{var} NOT IN ({operand})"),
        Operator::Equality => unreachable!("equality handled above"),
    };

    Ok(RenderedCondition {
        triples,
        filter: Some(filter),
    })
}

/// Only the join hops of `resolved`, for conditions that place a literal in
/// the leaf's object position.
fn join_triples(
    resolved: &ResolvedPath,
    registry: &mut ParameterRegistry,
) -> Result<Vec<TriplePattern>, CompileError> {
    let mut triples = Vec::new();
    let mut subject = "?x".to_string();
    for hop in resolved.hops.iter().filter(|h| h.is_join) {
        registry.register(&hop.segment, ValueType::Untyped)?;
        let object = format!("?{}", hop.segment);
        triples.push(TriplePattern {
            subject,
            predicate: format!("<{}>", hop.predicate_iri),
            object: object.clone(),
        });
        subject = object;
    }
    Ok(triples)
}
