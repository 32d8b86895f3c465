//! Entity metamodel lookup capability.
//!
//! The OntoQL compiler never inspects concrete entity implementations; it only
//! consults this read-only capability to turn dotted attribute paths into
//! predicate IRIs. Metamodel *construction* (deriving mappings from declarative
//! annotations, code generation from ontology schemas) lives outside this crate:
//! embedders either implement [`MetamodelProvider`] over their own metadata or
//! populate an [`InMemoryMetamodel`].
//!
//! Providers must be side-effect-free and safe for concurrent reads: multiple
//! queries may be compiled from independent threads against one provider.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type Iri = String;

/// Value space of a literal-valued attribute.
///
/// `Untyped` is the "don't know / don't care" element: it is compatible with
/// every other value type, so providers that carry no literal typing still
/// work (the compiler simply skips static type checks for them).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Integer,
    Decimal,
    Boolean,
    DateTime,
    Untyped,
}

impl ValueType {
    /// Whether a value of `other` may be bound where `self` is declared.
    pub fn accepts(self, other: ValueType) -> bool {
        use ValueType::*;
        match (self, other) {
            (Untyped, _) | (_, Untyped) => true,
            (Integer, Decimal) | (Decimal, Integer) => true,
            (a, b) => a == b,
        }
    }

    /// Whether pattern-matching operators (`LIKE`) apply to this type.
    pub fn is_textual(self) -> bool {
        matches!(self, ValueType::String | ValueType::Untyped)
    }
}

/// What one attribute hop points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeTarget {
    /// Object-valued: the attribute references another managed entity type.
    /// Resolution continues against that type; the hop is a join.
    Entity { entity: String },
    /// Literal-valued leaf.
    Literal { value_type: ValueType },
    /// Map-valued (unspecified key/value properties). Recognized by the
    /// metamodel but not compilable into a graph pattern.
    Map,
}

/// One declared attribute of a managed type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub predicate_iri: Iri,
    pub target: AttributeTarget,
}

/// Read-only metamodel lookup, the compiler's only external dependency.
///
/// Implementations backed by shared mutable state must guarantee read-only,
/// thread-safe access for the duration of a compilation.
pub trait MetamodelProvider {
    /// IRI of the ontology class a managed entity type maps to, or `None`
    /// when `entity` is not a managed type.
    fn root_type_iri(&self, entity: &str) -> Option<&str>;

    /// Declared attribute `attribute` on managed type `entity`.
    fn resolve_attribute(&self, entity: &str, attribute: &str) -> Option<&AttributeDef>;

    fn is_entity_type(&self, entity: &str) -> bool {
        self.root_type_iri(entity).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDef {
    pub type_iri: Iri,
    pub attributes: HashMap<String, AttributeDef>,
}

/// Map-backed [`MetamodelProvider`], suitable for embedders with static
/// mappings and for test fixtures (serde-loadable from JSON).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryMetamodel {
    entities: HashMap<String, EntityDef>,
}

impl InMemoryMetamodel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a managed entity type. Re-declaring a type replaces it.
    pub fn add_entity(&mut self, entity: impl Into<String>, type_iri: impl Into<Iri>) {
        self.entities.insert(
            entity.into(),
            EntityDef {
                type_iri: type_iri.into(),
                attributes: HashMap::new(),
            },
        );
    }

    /// Declare a literal-valued attribute on a previously added entity type.
    ///
    /// Attributes on undeclared types are dropped silently; declare the
    /// entity first.
    pub fn add_data_attribute(
        &mut self,
        entity: &str,
        attribute: impl Into<String>,
        predicate_iri: impl Into<Iri>,
        value_type: ValueType,
    ) {
        self.add_attribute(
            entity,
            attribute,
            AttributeDef {
                predicate_iri: predicate_iri.into(),
                target: AttributeTarget::Literal { value_type },
            },
        );
    }

    /// Declare an object-valued attribute referencing another managed type.
    pub fn add_object_attribute(
        &mut self,
        entity: &str,
        attribute: impl Into<String>,
        predicate_iri: impl Into<Iri>,
        target_entity: impl Into<String>,
    ) {
        self.add_attribute(
            entity,
            attribute,
            AttributeDef {
                predicate_iri: predicate_iri.into(),
                target: AttributeTarget::Entity {
                    entity: target_entity.into(),
                },
            },
        );
    }

    /// Declare a map-valued (unspecified-properties) attribute.
    pub fn add_map_attribute(
        &mut self,
        entity: &str,
        attribute: impl Into<String>,
        predicate_iri: impl Into<Iri>,
    ) {
        self.add_attribute(
            entity,
            attribute,
            AttributeDef {
                predicate_iri: predicate_iri.into(),
                target: AttributeTarget::Map,
            },
        );
    }

    fn add_attribute(&mut self, entity: &str, attribute: impl Into<String>, def: AttributeDef) {
        if let Some(e) = self.entities.get_mut(entity) {
            e.attributes.insert(attribute.into(), def);
        }
    }
}

impl MetamodelProvider for InMemoryMetamodel {
    fn root_type_iri(&self, entity: &str) -> Option<&str> {
        self.entities.get(entity).map(|e| e.type_iri.as_str())
    }

    fn resolve_attribute(&self, entity: &str, attribute: &str) -> Option<&AttributeDef> {
        self.entities.get(entity)?.attributes.get(attribute)
    }
}
