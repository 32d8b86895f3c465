//! SPARQL serializer.
//!
//! Pure function of the lowered algebra: identical input yields
//! byte-identical output. Spacing is load-bearing for downstream consumers
//! that match on the query text, so every emitter here owns its trailing
//! space: triple patterns end `". "`, filters end `") "`, clause entries end
//! with one space.

use crate::algebra::{GroupPattern, QueryAlgebra, RenderedCondition, TriplePattern};
use crate::model::{Direction, Projection};

/// Serialize `algebra` to the final SPARQL string.
pub fn render(algebra: &QueryAlgebra) -> String {
    let mut out = String::new();

    out.push_str(match (algebra.projection, algebra.distinct) {
        (Projection::Entity, false) => "SELECT ?x",
        (Projection::Entity, true) => "SELECT DISTINCT ?x",
        (Projection::Count, false) => "SELECT (COUNT(?x) AS ?count)",
        (Projection::Count, true) => "SELECT (COUNT(DISTINCT ?x) AS ?count)",
    });

    out.push_str(" WHERE { ");
    out.push_str(&format!("?x a <{}> . ", algebra.root_type_iri));
    for triple in &algebra.hoisted {
        push_triple(&mut out, triple);
    }

    match algebra.branches.len() {
        0 => {}
        1 => push_group(&mut out, &algebra.branches[0]),
        _ => {
            // Rule 2: braced blocks joined left-to-right by UNION.
            for (i, branch) in algebra.branches.iter().enumerate() {
                if i > 0 {
                    out.push_str("UNION ");
                }
                out.push_str("{ ");
                push_group(&mut out, branch);
                out.push_str("} ");
            }
        }
    }

    out.push('}');

    // GROUP BY precedes ORDER BY regardless of source order.
    if !algebra.group_by.is_empty() {
        out.push_str(" GROUP BY ");
        for var in &algebra.group_by {
            out.push_str(var);
            out.push(' ');
        }
    }
    if !algebra.order_by.is_empty() {
        if !out.ends_with(' ') {
            out.push(' ');
        }
        out.push_str("ORDER BY ");
        for (var, direction) in &algebra.order_by {
            match direction {
                Direction::Desc => out.push_str(&format!("DESC({var}) ")),
                Direction::Asc => {
                    out.push_str(var);
                    out.push(' ');
                }
            }
        }
    }

    out
}

fn push_group(out: &mut String, group: &GroupPattern) {
    for condition in &group.affirmative {
        push_condition(out, condition);
    }
    if !group.negated.is_empty() {
        // Rule 1: one negated block per group, source order inside.
        out.push_str("FILTER NOT EXISTS { ");
        for condition in &group.negated {
            push_condition(out, condition);
        }
        out.push_str("} ");
    }
}

fn push_condition(out: &mut String, condition: &RenderedCondition) {
    for triple in &condition.triples {
        push_triple(out, triple);
    }
    if let Some(filter) = &condition.filter {
        out.push_str(&format!("FILTER ({filter}) "));
    }
}

fn push_triple(out: &mut String, triple: &TriplePattern) {
    out.push_str(&format!(
        "{} {} {} . ",
        triple.subject, triple.predicate, triple.object
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra;
    use crate::params::ParameterRegistry;
    use crate::parser;
    use ontoql_metamodel::{InMemoryMetamodel, ValueType};

    fn metamodel() -> InMemoryMetamodel {
        let mut m = InMemoryMetamodel::new();
        m.add_entity("Person", "http://example.org/voc#Person");
        m.add_data_attribute(
            "Person",
            "username",
            "http://example.org/voc#username",
            ValueType::String,
        );
        m.add_data_attribute(
            "Person",
            "age",
            "http://example.org/voc#age",
            ValueType::Integer,
        );
        m
    }

    fn sparql(query: &str) -> String {
        let model = parser::parse(query, &metamodel()).expect("parse");
        let mut registry = ParameterRegistry::new();
        let algebra = algebra::build(&model, &mut registry).expect("build");
        render(&algebra)
    }

    #[test]
    fn renders_the_bare_type_pattern() {
        assert_eq!(
            sparql("SELECT p FROM Person p"),
            "SELECT ?x WHERE { ?x a <http://example.org/voc#Person> . }"
        );
    }

    #[test]
    fn renders_union_blocks_between_groups() {
        assert_eq!(
            sparql("SELECT p FROM Person p WHERE p.username = :username OR p.age > :age"),
            "SELECT ?x WHERE { ?x a <http://example.org/voc#Person> . \
             { ?x <http://example.org/voc#username> ?username . } UNION \
             { ?x <http://example.org/voc#age> ?pAge . FILTER (?pAge > ?age) } }"
        );
    }

    #[test]
    fn group_by_is_emitted_before_order_by() {
        assert_eq!(
            sparql("SELECT p FROM Person p ORDER BY p.age DESC GROUP BY p.username"),
            "SELECT ?x WHERE { ?x a <http://example.org/voc#Person> . \
             ?x <http://example.org/voc#age> ?age . \
             ?x <http://example.org/voc#username> ?username . } \
             GROUP BY ?username ORDER BY DESC(?age) "
        );
    }
}
