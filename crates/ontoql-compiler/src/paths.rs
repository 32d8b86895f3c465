//! Dotted attribute-path resolution against the metamodel.
//!
//! Each hop of `alias.a.b.c` is classified by consulting the metamodel:
//! an object-valued attribute (its declared type is itself a managed type)
//! is a *join* and resolution continues against that type; a literal-valued
//! attribute is a *leaf* and terminates the path. Paths are stored as plain
//! ordered vectors — length is bounded by metamodel depth, and traversal is
//! strictly top-down, so no linked structure is needed.

use ontoql_metamodel::{AttributeTarget, MetamodelProvider, ValueType};
use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::model::PathExpr;

/// One resolved hop of an attribute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedHop {
    pub segment: String,
    pub predicate_iri: String,
    /// Object-valued hop continuing the chain. The final hop is never a join
    /// even when it is object-valued (it is then compared as an IRI value).
    pub is_join: bool,
    /// Declared value type of a leaf; `Untyped` for joins and object leaves.
    pub value_type: ValueType,
}

/// A fully resolved path: at least one hop, joins followed by one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPath {
    pub hops: Vec<ResolvedHop>,
}

impl ResolvedPath {
    pub fn leaf(&self) -> &ResolvedHop {
        // Construction guarantees at least one hop.
        &self.hops[self.hops.len() - 1]
    }

    pub fn leaf_value_type(&self) -> ValueType {
        self.leaf().value_type
    }
}

/// Resolve `path` hop by hop against `root_entity`.
///
/// Fails with [`CompileError::UnknownAttribute`] when a segment has no
/// declared attribute on the current type (including segments dangling past
/// a literal leaf) and with [`CompileError::UnsupportedConstruct`] for
/// map-typed attributes.
pub fn resolve_path(
    metamodel: &dyn MetamodelProvider,
    root_entity: &str,
    path: &PathExpr,
) -> Result<ResolvedPath, CompileError> {
    let mut current = root_entity.to_string();
    let mut hops: Vec<ResolvedHop> = Vec::with_capacity(path.segments.len());
    let mut terminated = false;

    for segment in &path.segments {
        if terminated {
            // A literal leaf cannot be dereferenced further.
            return Err(CompileError::UnknownAttribute {
                entity: current,
                attribute: segment.clone(),
            });
        }
        let attribute = metamodel.resolve_attribute(&current, segment).ok_or_else(|| {
            CompileError::UnknownAttribute {
                entity: current.clone(),
                attribute: segment.clone(),
            }
        })?;
        match &attribute.target {
            AttributeTarget::Map => {
                return Err(CompileError::UnsupportedConstruct(format!(
                    "map-typed attribute `{segment}` cannot be used in a query"
                )));
            }
            AttributeTarget::Entity { entity } => {
                hops.push(ResolvedHop {
                    segment: segment.clone(),
                    predicate_iri: attribute.predicate_iri.clone(),
                    is_join: true,
                    value_type: ValueType::Untyped,
                });
                current = entity.clone();
            }
            AttributeTarget::Literal { value_type } => {
                hops.push(ResolvedHop {
                    segment: segment.clone(),
                    predicate_iri: attribute.predicate_iri.clone(),
                    is_join: false,
                    value_type: *value_type,
                });
                terminated = true;
            }
        }
    }

    if hops.is_empty() {
        return Err(CompileError::syntax(
            path.position,
            "attribute path must have at least one segment",
        ));
    }

    // An object-valued final hop is a leaf, not a join: its value is an
    // entity identifier compared directly.
    if let Some(last) = hops.last_mut() {
        last.is_join = false;
    }

    Ok(ResolvedPath { hops })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontoql_metamodel::InMemoryMetamodel;

    fn metamodel() -> InMemoryMetamodel {
        let mut m = InMemoryMetamodel::new();
        m.add_entity("Person", "http://example.org/voc#Person");
        m.add_entity("Phone", "http://example.org/voc#Phone");
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
        m.add_map_attribute("Person", "properties", "http://example.org/voc#properties");
        m
    }

    fn path(segments: &[&str]) -> PathExpr {
        PathExpr {
            alias: "p".to_string(),
            segments: segments.iter().map(|s| s.to_string()).collect(),
            position: 0,
        }
    }

    #[test]
    fn classifies_joins_and_leaves() {
        let resolved = resolve_path(&metamodel(), "Person", &path(&["phone", "number"]))
            .expect("resolve");
        assert_eq!(resolved.hops.len(), 2);
        assert!(resolved.hops[0].is_join);
        assert_eq!(
            resolved.hops[0].predicate_iri,
            "http://example.org/voc#hasPhone"
        );
        assert!(!resolved.hops[1].is_join);
        assert_eq!(resolved.leaf_value_type(), ValueType::String);
    }

    #[test]
    fn object_valued_final_hop_is_a_leaf() {
        let resolved = resolve_path(&metamodel(), "Person", &path(&["phone"])).expect("resolve");
        assert_eq!(resolved.hops.len(), 1);
        assert!(!resolved.hops[0].is_join);
        assert_eq!(resolved.leaf_value_type(), ValueType::Untyped);
    }

    #[test]
    fn unknown_segment_names_the_declaring_type() {
        let err = resolve_path(&metamodel(), "Person", &path(&["phone", "color"]))
            .expect_err("must fail");
        assert_eq!(
            err,
            CompileError::UnknownAttribute {
                entity: "Phone".to_string(),
                attribute: "color".to_string(),
            }
        );
    }

    #[test]
    fn segment_past_a_literal_leaf_fails() {
        let err = resolve_path(&metamodel(), "Person", &path(&["age", "digits"]))
            .expect_err("must fail");
        assert!(matches!(err, CompileError::UnknownAttribute { .. }));
    }

    #[test]
    fn map_attribute_is_unsupported() {
        let err =
            resolve_path(&metamodel(), "Person", &path(&["properties"])).expect_err("must fail");
        assert!(matches!(err, CompileError::UnsupportedConstruct(_)));
    }
}
