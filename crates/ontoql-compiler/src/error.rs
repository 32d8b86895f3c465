//! Compilation error taxonomy.
//!
//! Compilation is all-or-nothing: the first error aborts the pipeline and no
//! partially built query model escapes. Errors are deterministic for a given
//! input and carry the offending token/segment and byte position so callers
//! can report them directly.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Malformed token (unterminated parameter name or string literal,
    /// unrecognized character).
    #[error("lex error at offset {position}: {message}")]
    Lex { position: usize, message: String },

    /// Grammar violation (unexpected token, wrong arity, alias mismatch).
    #[error("syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },

    /// The FROM clause names a type the metamodel does not manage.
    #[error("unknown entity type `{0}`")]
    UnknownEntity(String),

    /// A path segment has no declared attribute on the type it is resolved
    /// against.
    #[error("no attribute `{attribute}` declared on entity type `{entity}`")]
    UnknownAttribute { entity: String, attribute: String },

    /// Recognized but unimplemented construct (map-typed attribute, function
    /// misuse, parenthesized grouping).
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),

    /// Statically detectable conflict between an operand and the attribute's
    /// declared value type.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
}

impl CompileError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        CompileError::Syntax {
            position,
            message: message.into(),
        }
    }
}
