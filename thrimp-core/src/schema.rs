//! # Schema document
//!
//! The parsed-IDL document model consumed by the rest of the crate.
//!
//! A [`Document`] is the output of an external Thrift IDL parser: services with their
//! methods, struct and exception definitions, enum names, and typedef aliases. It is
//! immutable once loaded and carries everything the dynamic codec needs to marshal a
//! call — field names, 1-based IDs, type references, and optional flags.
//!
//! All types derive `Serialize`/`Deserialize`, so a document dumped to JSON by a parser
//! running elsewhere can be loaded directly with `serde_json`.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A loaded Thrift IDL document.
///
/// Enums are carried by name only — the dynamic client encodes enum values as `i32`
/// and never needs the member list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub services: HashMap<String, Service>,
    #[serde(default)]
    pub structs: HashMap<String, Struct>,
    #[serde(default)]
    pub exceptions: HashMap<String, Struct>,
    #[serde(default)]
    pub enums: Vec<String>,
    #[serde(default)]
    pub typedefs: HashMap<String, Type>,
}

/// A service definition: a named collection of methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub methods: HashMap<String, Method>,
}

/// A method definition.
///
/// Arguments and declared exceptions keep their declared order; their [`Field::id`]s are
/// 1-based. Argument IDs double as positional indices into the caller-supplied argument
/// list, and exception IDs are the field indices of the response struct's error slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub return_type: Type,
    #[serde(default)]
    pub arguments: Vec<Field>,
    #[serde(default)]
    pub exceptions: Vec<Field>,
}

/// A struct or exception definition with its ordered field list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Struct {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// One field of a struct, or one method argument/declared exception.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: i16,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
    #[serde(default)]
    pub optional: bool,
}

/// A type reference: a name plus, for containers, the declared key/element types.
///
/// `list<T>` and `set<T>` carry `T` in `value_type`; `map<K, V>` carries both.
/// The key type is recorded for completeness but the binary codec always writes map
/// keys as strings (see the crate-level notes on key-type erasure).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Type {
    pub name: String,
    #[serde(default)]
    pub key_type: Option<Box<Type>>,
    #[serde(default)]
    pub value_type: Option<Box<Type>>,
}

impl Type {
    /// A plain named type reference (`i32`, `string`, a struct name, ...).
    pub fn named(name: impl Into<String>) -> Type {
        Type {
            name: name.into(),
            key_type: None,
            value_type: None,
        }
    }

    /// A `list<element>` reference.
    pub fn list_of(element: Type) -> Type {
        Type {
            name: "list".to_string(),
            key_type: None,
            value_type: Some(Box::new(element)),
        }
    }

    /// A `set<element>` reference.
    pub fn set_of(element: Type) -> Type {
        Type {
            name: "set".to_string(),
            key_type: None,
            value_type: Some(Box::new(element)),
        }
    }

    /// A `map<key, value>` reference.
    pub fn map_of(key: Type, value: Type) -> Type {
        Type {
            name: "map".to_string(),
            key_type: Some(Box::new(key)),
            value_type: Some(Box::new(value)),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.key_type, &self.value_type) {
            (Some(key), Some(value)) => write!(f, "{}<{}, {}>", self.name, key, value),
            (None, Some(value)) => write!(f, "{}<{}>", self.name, value),
            _ => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_loads_from_json() {
        let raw = r#"{
            "services": {
                "Calculator": {
                    "name": "Calculator",
                    "methods": {
                        "add": {
                            "name": "add",
                            "return_type": { "name": "i32" },
                            "arguments": [
                                { "id": 1, "name": "a", "type": { "name": "i32" } },
                                { "id": 2, "name": "b", "type": { "name": "i32" } }
                            ]
                        }
                    }
                }
            },
            "typedefs": { "Count": { "name": "i64" } },
            "enums": ["Color"]
        }"#;

        let document: Document = serde_json::from_str(raw).unwrap();

        let add = &document.services["Calculator"].methods["add"];
        assert_eq!(add.arguments.len(), 2);
        assert_eq!(add.arguments[0].id, 1);
        assert!(!add.arguments[0].optional);
        assert_eq!(document.typedefs["Count"].name, "i64");
        assert_eq!(document.enums, vec!["Color".to_string()]);
    }

    #[test]
    fn type_display_renders_containers() {
        let ty = Type::map_of(
            Type::named("string"),
            Type::list_of(Type::named("UserProfile")),
        );
        assert_eq!(ty.to_string(), "map<string, list<UserProfile>>");
    }
}
