//! # Type registry
//!
//! Resolution of textual type names from the IDL into concrete wire-type tags
//! ([`thrift::protocol::TType`]), and the [`ResolvedService`] bundle that the client and
//! codec work against.
//!
//! The registry is total: every name reachable from the document resolves to a tag, and
//! any *other* name resolves to the `Stop` sentinel — "not found" is a signal here, not
//! an error, because `Stop` also terminates field loops on the wire. Broken typedef
//! chains, in contrast, are caught eagerly at build time.
use crate::schema::{Document, Field, Method, Service, Struct, Type};
use std::collections::HashMap;
use thrift::protocol::TType;

/// Errors raised while resolving a document into a usable service schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Service '{0}' not found in the loaded document")]
    ServiceNotFound(String),
    #[error("Typedef '{name}' resolves to unknown type '{target}'")]
    UnresolvedTypedef { name: String, target: String },
}

/// The fixed primitive-name table every registry starts from.
const BUILTIN_TYPES: [(&str, TType); 15] = [
    ("stop", TType::Stop),
    ("void", TType::Void),
    ("bool", TType::Bool),
    ("byte", TType::I08),
    ("double", TType::Double),
    ("i16", TType::I16),
    ("i32", TType::I32),
    ("i64", TType::I64),
    ("string", TType::String),
    ("struct", TType::Struct),
    ("map", TType::Map),
    ("set", TType::Set),
    ("list", TType::List),
    ("utf8", TType::Utf8),
    ("utf16", TType::Utf16),
];

/// A total mapping from type name to wire-type tag.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, TType>,
}

impl TypeRegistry {
    /// Builds the registry for a document: built-in primitives, enums as `i32`, structs
    /// and exceptions as `struct`, and typedefs mapped transitively to their target tag.
    ///
    /// Typedefs may alias other typedefs in any declaration order, so they are resolved
    /// to a fixed point: each round resolves every typedef whose target is already in
    /// the table, and a round that makes no progress means a genuinely broken alias.
    pub fn build(document: &Document) -> Result<Self, SchemaError> {
        let mut types: HashMap<String, TType> = BUILTIN_TYPES
            .iter()
            .map(|&(name, tag)| (name.to_string(), tag))
            .collect();

        for name in &document.enums {
            types.insert(name.clone(), TType::I32);
        }
        for name in document.structs.keys() {
            types.insert(name.clone(), TType::Struct);
        }
        for name in document.exceptions.keys() {
            types.insert(name.clone(), TType::Struct);
        }

        let mut pending: Vec<(&String, &Type)> = document.typedefs.iter().collect();
        while !pending.is_empty() {
            let before = pending.len();
            pending.retain(|&(name, target)| match types.get(&target.name).copied() {
                Some(tag) => {
                    types.insert(name.clone(), tag);
                    false
                }
                None => true,
            });
            if pending.len() == before {
                let (name, target) = pending[0];
                return Err(SchemaError::UnresolvedTypedef {
                    name: name.clone(),
                    target: target.name.clone(),
                });
            }
        }

        Ok(TypeRegistry { types })
    }

    /// Resolves a type name to its wire tag. Never fails: unknown names yield
    /// [`TType::Stop`].
    pub fn resolve(&self, name: &str) -> TType {
        self.types.get(name).copied().unwrap_or(TType::Stop)
    }
}

/// A struct (or exception) definition indexed for decoding.
///
/// Field lookup during struct decode is keyed by the wire header's field ID, so the
/// declared fields are indexed by ID up front instead of scanned per field.
#[derive(Debug, Clone)]
pub struct StructSchema {
    def: Struct,
    by_id: HashMap<i16, usize>,
}

impl StructSchema {
    fn new(def: Struct) -> Self {
        let by_id = def
            .fields
            .iter()
            .enumerate()
            .map(|(position, field)| (field.id, position))
            .collect();
        StructSchema { def, by_id }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.def.fields
    }

    /// Looks up a declared field by its 1-based field ID.
    pub fn field_by_id(&self, id: i16) -> Option<&Field> {
        self.by_id.get(&id).map(|&position| &self.def.fields[position])
    }
}

/// One service of a document, resolved for dynamic calls.
///
/// Bundles the service descriptor, the type registry, and a merged struct/exception
/// table (structs overlay exceptions on a name collision). Built once per document and
/// shared read-only — typically behind an `Arc` — across every session that talks to
/// this service.
#[derive(Debug, Clone)]
pub struct ResolvedService {
    service: Service,
    structs: HashMap<String, StructSchema>,
    registry: TypeRegistry,
}

impl ResolvedService {
    /// Resolves `name` against the document and builds the registry.
    ///
    /// Fails with [`SchemaError::ServiceNotFound`] if the service is absent and with
    /// [`SchemaError::UnresolvedTypedef`] if the document carries a broken alias chain.
    pub fn resolve(document: &Document, name: &str) -> Result<Self, SchemaError> {
        let service = document
            .services
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::ServiceNotFound(name.to_string()))?;

        let registry = TypeRegistry::build(document)?;

        let mut structs = HashMap::new();
        for (name, def) in &document.exceptions {
            structs.insert(name.clone(), StructSchema::new(def.clone()));
        }
        for (name, def) in &document.structs {
            structs.insert(name.clone(), StructSchema::new(def.clone()));
        }

        Ok(ResolvedService {
            service,
            structs,
            registry,
        })
    }

    pub fn name(&self) -> &str {
        &self.service.name
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.service.methods.get(name)
    }

    /// Looks up a struct or exception definition by name.
    pub fn struct_schema(&self, name: &str) -> Option<&StructSchema> {
        self.structs.get(name)
    }

    /// Delegates to the registry's total type-name lookup.
    pub fn resolve_type(&self, name: &str) -> TType {
        self.registry.resolve(name)
    }
}
