//! # Value codec
//!
//! Recursive transcoding between [`serde_json::Value`] and the Thrift binary wire
//! format, driven entirely by the loaded schema's type references.
//!
//! This is the dynamic replacement for generated per-struct `read`/`write` methods:
//! instead of compiled knowledge of the shapes involved, [`ValueReader`] and
//! [`ValueWriter`] dispatch on the wire tag the type registry resolves for each type
//! reference and recurse through structs, maps, lists and sets.
//!
//! ## How it works
//!
//! 1. **Writer (value -> wire)**:
//!    - Resolves the schema type to a wire tag and demands a coercible value:
//!      primitives go through the [`coerce`] table, structs require a mapping with
//!      every non-optional declared field present, containers require the matching
//!      sequence/mapping shape.
//!    - Writes frames through any [`thrift::protocol::TOutputProtocol`].
//!
//! 2. **Reader (wire -> value)**:
//!    - Reads exactly the frames the schema dictates, skipping wire fields the schema
//!      does not declare (forward compatibility).
//!    - Produces plain `serde_json::Value` trees; struct fields are keyed by their
//!      declared names.
//!
//! Map keys are always written and read as strings regardless of the declared key
//! type, matching the wire convention of the peers this client talks to. Schemas with
//! non-string map keys therefore do not round-trip faithfully.
mod coerce;
mod read;
mod write;


pub use read::ValueReader;
pub use write::ValueWriter;

use crate::schema::Type;
use thrift::protocol::TType;

/// Errors raised while encoding or decoding a value against the schema.
///
/// All of these fail the current call only; they carry no session state.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Struct '{0}' not found in the loaded document")]
    UnknownStruct(String),
    #[error("Type '{name}' maps to unsupported wire type {tag}")]
    UnsupportedType { name: String, tag: TType },
    #[error("Cannot convert {value} to '{target}'")]
    TypeMismatch {
        value: serde_json::Value,
        target: String,
    },
    #[error("Field '{field}' of struct '{name}' is required")]
    RequiredFieldMissing { name: String, field: String },
    #[error("Container type '{0}' does not declare an element type")]
    MissingElementType(String),
    #[error("Double value {0} has no generic representation")]
    NonFiniteDouble(f64),
    #[error("Wire protocol failure: {0}")]
    Protocol(#[from] thrift::Error),
}

/// The declared element/value type of a container reference.
fn element_type(ty: &Type) -> Result<&Type, CodecError> {
    ty.value_type
        .as_deref()
        .ok_or_else(|| CodecError::MissingElementType(ty.name.clone()))
}
