//! OntoQL: an object query language compiled to SPARQL.
//!
//! OntoQL is a JPA-QL-like dialect over an entity metamodel. [`compile`]
//! turns a query string into executable SPARQL plus an ordered parameter
//! registry, resolving dotted attribute paths to predicate IRIs via a
//! [`MetamodelProvider`] and lowering the flat boolean condition list into
//! graph patterns (joins, UNION branches, negated sub-patterns).
//!
//! ```
//! use ontoql_compiler::compile;
//! use ontoql_metamodel::{InMemoryMetamodel, ValueType};
//!
//! let mut m = InMemoryMetamodel::new();
//! m.add_entity("Person", "http://example.org/voc#Person");
//! m.add_data_attribute("Person", "username", "http://example.org/voc#username", ValueType::String);
//!
//! let compiled = compile("SELECT p FROM Person p WHERE p.username = :username", &m)?;
//! assert_eq!(
//!     compiled.query_text(),
//!     "SELECT ?x WHERE { ?x a <http://example.org/voc#Person> . \
//!      ?x <http://example.org/voc#username> ?username . }"
//! );
//! assert_eq!(compiled.parameters().len(), 2); // ?x and ?username
//! # Ok::<(), ontoql_compiler::CompileError>(())
//! ```
//!
//! Compilation is pure and deterministic: no I/O, no global state, and
//! byte-identical output for identical input. The compiler performs no
//! query execution; the produced string is handed to whatever SPARQL
//! endpoint the embedder uses.

pub mod algebra;
pub mod error;
pub mod lexer;
pub mod model;
pub mod params;
pub mod paths;
pub mod render;

mod parser;

use ontoql_metamodel::MetamodelProvider;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use error::CompileError;
pub use params::{ParameterEntry, ParameterRegistry};

/// The result of one compilation: the SPARQL text and the ordered registry
/// of every variable the query binds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledQuery {
    text: String,
    parameters: ParameterRegistry,
}

impl CompiledQuery {
    pub fn query_text(&self) -> &str {
        &self.text
    }

    /// All query variables, in first-appearance (render) order.
    pub fn parameters(&self) -> &[ParameterEntry] {
        self.parameters.parameters()
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterEntry> {
        self.parameters.parameter(name)
    }
}

/// Compile one OntoQL query against `metamodel`.
///
/// Fail-fast: the first error aborts compilation and nothing partial
/// escapes. Errors are deterministic for a given query and metamodel.
pub fn compile(
    query: &str,
    metamodel: &dyn MetamodelProvider,
) -> Result<CompiledQuery, CompileError> {
    let model = parser::parse(query, metamodel)?;
    debug!(
        entity = %model.entity,
        groups = model.groups.len(),
        "parsed query model"
    );

    let mut registry = ParameterRegistry::new();
    let algebra = algebra::build(&model, &mut registry)?;
    let text = render::render(&algebra);
    debug!(parameters = registry.len(), "compiled query");

    Ok(CompiledQuery {
        text,
        parameters: registry,
    })
}
