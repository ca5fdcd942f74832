//! Interface synthesis
//!
//! Turns a reflected [`Module`] into a WIT world with one `export` line per
//! exported function:
//!
//! ```text
//! package local:math;
//!
//! world math {
//!   export add: func(a: s64, b: s64) -> s64;
//! }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::error::{Result, WasmifyError};
use crate::type_mapper::{map_type, InterfaceType};
use crate::types::{DeclarationKind, Module};

/// Package namespace for every generated world
pub const PACKAGE_NAMESPACE: &str = "local";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSignature {
    pub name: String,
    pub params: Vec<(String, InterfaceType)>,
    pub return_type: InterfaceType,
}

impl fmt::Display for ExportSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(name, ty)| format!("{}: {}", name, ty))
            .collect();
        write!(
            f,
            "export {}: func({}) -> {};",
            self.name,
            params.join(", "),
            self.return_type
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceWorld {
    pub name: String,
    pub exports: Vec<ExportSignature>,
}

impl fmt::Display for InterfaceWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "package {}:{};", PACKAGE_NAMESPACE, self.name)?;
        writeln!(f)?;
        writeln!(f, "world {} {{", self.name)?;
        for export in &self.exports {
            writeln!(f, "  {}", export)?;
        }
        writeln!(f, "}}")
    }
}

/// World name for a source file: its base name without the extension
pub fn world_name(source_path: &Path) -> Result<String> {
    source_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| {
            WasmifyError::io(
                source_path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "source path has no file name"),
            )
        })
}

/// Build the interface world for a module.
///
/// Non-function declarations are skipped. The first type that cannot be mapped
/// aborts synthesis; no partial world is returned.
pub fn synthesize(module: &Module) -> Result<InterfaceWorld> {
    let name = world_name(&module.source_path)?;
    let mut exports = Vec::new();
    let mut seen = HashSet::new();

    for declaration in &module.declarations {
        if declaration.kind != DeclarationKind::Function {
            continue;
        }

        let signature = declaration
            .primary_signature()
            .ok_or_else(|| WasmifyError::Parse {
                path: module.source_path.clone(),
                message: format!("Function '{}' has no signature", declaration.name),
            })?;

        if !seen.insert(declaration.name.as_str()) {
            return Err(WasmifyError::DuplicateExport {
                name: declaration.name.clone(),
            });
        }

        let params = signature
            .parameters
            .iter()
            .map(|param| map_type(&param.ty).map(|ty| (param.name.clone(), ty)))
            .collect::<Result<Vec<_>>>()?;
        let return_type = map_type(&signature.return_type)?;

        exports.push(ExportSignature {
            name: declaration.name.clone(),
            params,
            return_type,
        });
    }

    Ok(InterfaceWorld { name, exports })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Declaration, FunctionSignature, Parameter, SourceType};
    use std::path::PathBuf;

    fn number() -> SourceType {
        SourceType::primitive("number")
    }

    fn function(name: &str, params: &[(&str, SourceType)], ret: SourceType) -> Declaration {
        Declaration::function(
            name,
            FunctionSignature {
                parameters: params
                    .iter()
                    .map(|(n, ty)| Parameter::new(*n, ty.clone()))
                    .collect(),
                return_type: ret,
            },
        )
    }

    fn module(path: &str, declarations: Vec<Declaration>) -> Module {
        Module {
            source_path: PathBuf::from(path),
            declarations,
        }
    }

    #[test]
    fn test_add_example() {
        let module = module(
            "math.ts",
            vec![function("add", &[("a", number()), ("b", number())], number())],
        );

        let world = synthesize(&module).unwrap();

        assert_eq!(
            world.to_string(),
            "package local:math;\n\nworld math {\n  export add: func(a: s64, b: s64) -> s64;\n}\n"
        );
    }

    #[test]
    fn test_world_name_strips_directory_and_extension() {
        assert_eq!(world_name(Path::new("/a/b/foo.ts")).unwrap(), "foo");
        assert_eq!(world_name(Path::new("crop.ts")).unwrap(), "crop");
        assert_eq!(world_name(Path::new("relative/dir/hash.mts")).unwrap(), "hash");

        let world = synthesize(&module("/work/src/foo.ts", vec![])).unwrap();
        assert_eq!(world.name, "foo");
    }

    #[test]
    fn test_path_without_file_name_has_no_world() {
        for path in ["/", "", "src/.."] {
            match synthesize(&module(path, vec![function("add", &[], number())])) {
                Err(WasmifyError::Io { source, .. }) => {
                    assert_eq!(source.kind(), std::io::ErrorKind::InvalidInput)
                }
                other => panic!("Expected InvalidInput for {:?}, got {:?}", path, other),
            }
        }
    }

    #[test]
    fn test_empty_world_is_valid() {
        let world = synthesize(&module("empty.ts", vec![Declaration::other("CONSTANT")])).unwrap();

        assert!(world.exports.is_empty());
        assert_eq!(world.to_string(), "package local:empty;\n\nworld empty {\n}\n");
    }

    #[test]
    fn test_other_declarations_are_filtered_in_any_position() {
        let declarations = vec![
            Declaration::other("Before"),
            function("one", &[], number()),
            Declaration::other("Between"),
            Declaration::other("AlsoBetween"),
            function("two", &[("flag", SourceType::primitive("boolean"))], SourceType::primitive("string")),
            Declaration::other("After"),
        ];

        let world = synthesize(&module("mixed.ts", declarations)).unwrap();

        let names: Vec<&str> = world.exports.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["one", "two"]);
        assert_eq!(
            world.exports[1].to_string(),
            "export two: func(flag: bool) -> string;"
        );
    }

    #[test]
    fn test_first_signature_only() {
        let mut overloaded = function("pick", &[("a", SourceType::primitive("string"))], SourceType::primitive("string"));
        overloaded.signatures.push(FunctionSignature {
            parameters: vec![Parameter::new("a", SourceType::unknown("object"))],
            return_type: SourceType::unknown("object"),
        });

        let world = synthesize(&module("pick.ts", vec![overloaded])).unwrap();

        assert_eq!(world.exports[0].to_string(), "export pick: func(a: string) -> string;");
    }

    #[test]
    fn test_composite_types() {
        let declarations = vec![function(
            "crop",
            &[
                ("image", SourceType::primitive("Uint8Array")),
                ("rows", SourceType::array_of(SourceType::array_of(number()))),
            ],
            SourceType::array_of(SourceType::primitive("string")),
        )];

        let world = synthesize(&module("crop.ts", declarations)).unwrap();

        assert_eq!(
            world.exports[0].to_string(),
            "export crop: func(image: list<u8>, rows: list<list<s64>>) -> list<string>;"
        );
    }

    #[test]
    fn test_unsupported_type_aborts_synthesis() {
        let declarations = vec![
            function("fine", &[], number()),
            function("bad", &[("value", SourceType::unknown("string | number"))], number()),
            function("never", &[], number()),
        ];

        let err = synthesize(&module("bad.ts", declarations)).unwrap_err();

        match err {
            WasmifyError::UnsupportedType { descriptor } => assert!(descriptor.contains("string | number")),
            other => panic!("Expected UnsupportedType, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_return_type() {
        let declarations = vec![function("nothing", &[], SourceType::primitive("void"))];
        let err = synthesize(&module("void.ts", declarations)).unwrap_err();
        assert!(matches!(err, WasmifyError::UnsupportedType { .. }));
    }

    #[test]
    fn test_duplicate_function_names_are_rejected() {
        let declarations = vec![
            function("twice", &[], number()),
            Declaration::other("twice_marker"),
            function("twice", &[("a", number())], number()),
        ];

        let err = synthesize(&module("dup.ts", declarations)).unwrap_err();

        match err {
            WasmifyError::DuplicateExport { name } => assert_eq!(name, "twice"),
            other => panic!("Expected DuplicateExport, got {:?}", other),
        }
    }

    #[test]
    fn test_other_declaration_sharing_a_function_name_is_not_a_duplicate() {
        let declarations = vec![Declaration::other("area"), function("area", &[], number())];
        let world = synthesize(&module("shape.ts", declarations)).unwrap();
        assert_eq!(world.exports.len(), 1);
    }
}
