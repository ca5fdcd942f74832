use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/* ===================== Source Types ===================== */

/// A static type as reported by reflection over a source module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "type")]
pub enum SourceType {
    /// A named type reference such as `string`, `number` or `Uint8Array`
    Primitive(String),
    /// `T[]`, `Array<T>` or `ReadonlyArray<T>`
    Array(Box<SourceType>),
    /// Anything the reflector cannot describe structurally (unions, generics,
    /// object literals, function types...). Carries the raw source text.
    Unknown(String),
}

impl SourceType {
    pub fn primitive(text: impl Into<String>) -> Self {
        SourceType::Primitive(text.into())
    }

    pub fn array_of(element: SourceType) -> Self {
        SourceType::Array(Box::new(element))
    }

    pub fn unknown(text: impl Into<String>) -> Self {
        SourceType::Unknown(text.into())
    }

    /// Raw textual form, as it would be written in source
    pub fn text(&self) -> String {
        match self {
            SourceType::Primitive(text) | SourceType::Unknown(text) => text.clone(),
            SourceType::Array(element) => match element.as_ref() {
                SourceType::Unknown(text) => format!("({})[]", text),
                other => format!("{}[]", other.text()),
            },
        }
    }

    /// Element type, present only for arrays
    pub fn element_type(&self) -> Option<&SourceType> {
        match self {
            SourceType::Array(element) => Some(element),
            _ => None,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}

/* ===================== Declarations ===================== */

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SourceType,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: SourceType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSignature {
    pub parameters: Vec<Parameter>,
    pub return_type: SourceType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclarationKind {
    Function,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub name: String,
    pub signatures: Vec<FunctionSignature>,
}

impl Declaration {
    pub fn function(name: impl Into<String>, signature: FunctionSignature) -> Self {
        Self {
            kind: DeclarationKind::Function,
            name: name.into(),
            signatures: vec![signature],
        }
    }

    pub fn other(name: impl Into<String>) -> Self {
        Self {
            kind: DeclarationKind::Other,
            name: name.into(),
            signatures: Vec::new(),
        }
    }

    /// The signature used for the interface. Later overloads are ignored.
    pub fn primary_signature(&self) -> Option<&FunctionSignature> {
        self.signatures.first()
    }
}

/// All exported declarations of one source file, in source order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub source_path: PathBuf,
    pub declarations: Vec<Declaration>,
}

/* ===================== Diagnostics ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A non-fatal issue reported by static analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub path: PathBuf,
    /// 1-indexed, 0 when the issue is not tied to a location
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub severity: Severity,
    pub rule_id: &'static str,
}

impl Diagnostic {
    pub fn error(path: impl Into<PathBuf>, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self {
            path: path.into(),
            line: 0,
            column: 0,
            message: message.into(),
            severity: Severity::Error,
            rule_id,
        }
    }

    pub fn warning(path: impl Into<PathBuf>, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(path, message, rule_id)
        }
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        if self.line > 0 {
            write!(
                f,
                "{}:{}:{}: {}: {} [{}]",
                self.path.display(),
                self.line,
                self.column,
                severity,
                self.message,
                self.rule_id
            )
        } else {
            write!(
                f,
                "{}: {}: {} [{}]",
                self.path.display(),
                severity,
                self.message,
                self.rule_id
            )
        }
    }
}

/* ===================== Build Output ===================== */

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult {
    pub out_path: PathBuf,
    /// Name of the synthesized world
    pub world: String,
    pub diagnostics: Vec<Diagnostic>,
}
