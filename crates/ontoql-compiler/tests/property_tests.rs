use ontoql_compiler::compile;
use ontoql_metamodel::{InMemoryMetamodel, ValueType};
use proptest::prelude::*;

fn metamodel() -> InMemoryMetamodel {
    let mut m = InMemoryMetamodel::new();
    m.add_entity("Person", "http://example.org/voc#Person");
    m.add_entity("Phone", "http://example.org/voc#Phone");
    m.add_data_attribute(
        "Person",
        "username",
        "http://example.org/voc#username",
        ValueType::String,
    );
    m.add_data_attribute(
        "Person",
        "gender",
        "http://example.org/voc#gender",
        ValueType::String,
    );
    m.add_data_attribute(
        "Person",
        "age",
        "http://example.org/voc#age",
        ValueType::Integer,
    );
    m.add_object_attribute("Person", "phone", "http://example.org/voc#hasPhone", "Phone");
    m.add_data_attribute(
        "Phone",
        "number",
        "http://example.org/voc#phoneNumber",
        ValueType::String,
    );
    m
}

#[derive(Debug, Clone)]
struct GenCondition {
    path: &'static str,
    operator: &'static str,
    negated: bool,
}

/// One condition over the fixed metamodel, operator chosen to fit the leaf
/// type so generated queries always pass the static checks.
fn condition() -> impl Strategy<Value = GenCondition> {
    let string_paths = prop_oneof![
        Just("p.username"),
        Just("p.gender"),
        Just("p.phone.number"),
    ];
    let string_ops = prop_oneof![
        Just("="),
        Just("LIKE"),
        Just("NOT LIKE"),
        Just("IN"),
        Just("NOT IN"),
    ];
    let numeric_ops = prop_oneof![Just("="), Just(">"), Just("<"), Just(">="), Just("<=")];

    prop_oneof![
        (string_paths, string_ops, any::<bool>()).prop_map(|(path, operator, negated)| {
            GenCondition {
                path,
                operator,
                negated,
            }
        }),
        (numeric_ops, any::<bool>()).prop_map(|(operator, negated)| GenCondition {
            path: "p.age",
            operator,
            negated,
        }),
    ]
}

fn groups() -> impl Strategy<Value = Vec<Vec<GenCondition>>> {
    proptest::collection::vec(proptest::collection::vec(condition(), 1..4), 1..4)
}

/// Assemble query text, giving every condition its own indexed parameter so
/// no two uses of one name can disagree on type.
fn query_text(groups: &[Vec<GenCondition>]) -> String {
    let mut out = String::from("SELECT p FROM Person p WHERE ");
    let mut param = 0;
    for (gi, group) in groups.iter().enumerate() {
        if gi > 0 {
            out.push_str(" OR ");
        }
        for (ci, cond) in group.iter().enumerate() {
            if ci > 0 {
                out.push_str(" AND ");
            }
            if cond.negated {
                out.push_str("NOT ");
            }
            out.push_str(&format!("{} {} :p{param}", cond.path, cond.operator));
            param += 1;
        }
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn compilation_is_deterministic(gs in groups()) {
        let query = query_text(&gs);
        let m = metamodel();
        let first = compile(&query, &m).expect("compile");
        let second = compile(&query, &m).expect("compile again");
        prop_assert_eq!(first.query_text(), second.query_text());
        prop_assert_eq!(first.parameters(), second.parameters());
    }

    #[test]
    fn union_connectives_are_one_fewer_than_groups(gs in groups()) {
        let query = query_text(&gs);
        let compiled = compile(&query, &metamodel()).expect("compile");
        let unions = compiled.query_text().matches(" UNION ").count();
        let expected = if gs.len() > 1 { gs.len() - 1 } else { 0 };
        prop_assert_eq!(unions, expected);
    }

    #[test]
    fn one_negated_block_per_group_with_negations(gs in groups()) {
        let query = query_text(&gs);
        let compiled = compile(&query, &metamodel()).expect("compile");
        let blocks = compiled.query_text().matches("FILTER NOT EXISTS {").count();
        let groups_with_negation = gs
            .iter()
            .filter(|g| g.iter().any(|c| c.negated))
            .count();
        prop_assert_eq!(blocks, groups_with_negation);
    }

    #[test]
    fn every_registered_variable_appears_in_the_text(gs in groups()) {
        let query = query_text(&gs);
        let compiled = compile(&query, &metamodel()).expect("compile");
        for entry in compiled.parameters() {
            prop_assert!(
                compiled.query_text().contains(entry.variable.as_str()),
                "variable {} missing from {}",
                entry.variable,
                compiled.query_text()
            );
        }
    }

    #[test]
    fn equality_with_a_parameter_never_emits_a_filter(path in prop_oneof![
        Just("p.username"),
        Just("p.gender"),
        Just("p.age"),
        Just("p.phone.number"),
    ]) {
        let query = format!("SELECT p FROM Person p WHERE {path} = :v");
        let compiled = compile(&query, &metamodel()).expect("compile");
        prop_assert!(!compiled.query_text().contains("FILTER"));
        prop_assert!(compiled.query_text().contains("?v"));
    }
}
