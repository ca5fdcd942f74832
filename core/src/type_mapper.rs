//! Source type → interface type mapping
//!
//! `number` maps to `s64`, not a float. Fractional values crossing a generated
//! interface are truncated. This is a known limitation of the mapping and is
//! kept on purpose so existing components keep their signatures.

use std::fmt;

use crate::error::{Result, WasmifyError};
use crate::types::SourceType;

/// An interface (WIT) type token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceType {
    String,
    Bool,
    U8,
    S64,
    List(Box<InterfaceType>),
}

impl InterfaceType {
    pub fn list(element: InterfaceType) -> Self {
        InterfaceType::List(Box::new(element))
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceType::String => write!(f, "string"),
            InterfaceType::Bool => write!(f, "bool"),
            InterfaceType::U8 => write!(f, "u8"),
            InterfaceType::S64 => write!(f, "s64"),
            InterfaceType::List(element) => write!(f, "list<{}>", element),
        }
    }
}

/// Map a reflected source type to its interface type.
///
/// Named types are checked before array structure; the first rule that matches wins.
pub fn map_type(ty: &SourceType) -> Result<InterfaceType> {
    match ty {
        SourceType::Primitive(text) => match text.as_str() {
            "string" => Ok(InterfaceType::String),
            "boolean" => Ok(InterfaceType::Bool),
            "number" => Ok(InterfaceType::S64),
            "Uint8Array" => Ok(InterfaceType::list(InterfaceType::U8)),
            _ => Err(unsupported(ty)),
        },
        SourceType::Array(element) => Ok(InterfaceType::list(map_type(element)?)),
        SourceType::Unknown(_) => Err(unsupported(ty)),
    }
}

fn unsupported(ty: &SourceType) -> WasmifyError {
    let descriptor = serde_json::to_string(ty).unwrap_or_else(|_| ty.text());
    WasmifyError::UnsupportedType { descriptor }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapped(ty: SourceType) -> String {
        map_type(&ty).expect("type should map").to_string()
    }

    #[test]
    fn test_primitives() {
        assert_eq!(mapped(SourceType::primitive("string")), "string");
        assert_eq!(mapped(SourceType::primitive("boolean")), "bool");
        assert_eq!(mapped(SourceType::primitive("number")), "s64");
        assert_eq!(mapped(SourceType::primitive("Uint8Array")), "list<u8>");
    }

    #[test]
    fn test_nested_arrays() {
        let ty = SourceType::array_of(SourceType::array_of(SourceType::primitive("number")));
        assert_eq!(mapped(ty), "list<list<s64>>");

        let ty = SourceType::array_of(SourceType::primitive("Uint8Array"));
        assert_eq!(mapped(ty), "list<list<u8>>");

        let mut ty = SourceType::primitive("boolean");
        for _ in 0..5 {
            ty = SourceType::array_of(ty);
        }
        assert_eq!(mapped(ty), "list<list<list<list<list<bool>>>>>");
    }

    #[test]
    fn test_unsupported_primitive() {
        for text in ["any", "unknown", "void", "bigint", "Date", "Record"] {
            let err = map_type(&SourceType::primitive(text)).unwrap_err();
            match err {
                WasmifyError::UnsupportedType { descriptor } => {
                    assert!(descriptor.contains(text), "{} missing from {}", text, descriptor);
                }
                other => panic!("Expected UnsupportedType, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_unknown_inside_array_fails() {
        let ty = SourceType::array_of(SourceType::unknown("string | number"));
        let err = map_type(&ty).unwrap_err();
        match err {
            WasmifyError::UnsupportedType { descriptor } => {
                assert!(descriptor.contains("string | number"));
                assert!(descriptor.contains("Unknown"));
            }
            other => panic!("Expected UnsupportedType, got {:?}", other),
        }
    }

    #[test]
    fn test_descriptor_is_json() {
        let err = map_type(&SourceType::unknown("{ a: string }")).unwrap_err();
        let WasmifyError::UnsupportedType { descriptor } = err else {
            panic!("Expected UnsupportedType");
        };
        let value: serde_json::Value = serde_json::from_str(&descriptor).unwrap();
        assert_eq!(value["kind"], "Unknown");
        assert_eq!(value["type"], "{ a: string }");
    }
}
