//! PEST-based reflector for TypeScript source files
//!
//! Extracts exported declarations and their signatures without executing or
//! type-checking the file. Produces the [`Module`] consumed by interface synthesis.
//!
//! Types are read from annotations only. A missing return annotation is inferred
//! when an arrow function's body is a plain literal (`() => 42`); any other
//! unannotated return type is reported as `any`.
//!
//! An exported function whose signature the grammar cannot read as a whole is
//! still reported. Whatever could not be read keeps its source text as an
//! unknown type, so it fails mapping instead of disappearing.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use std::path::Path;

use crate::types::{Declaration, Diagnostic, FunctionSignature, Module, Parameter, SourceType};


/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "parser/typescript.pest"]
struct TypeScriptParser;

/* ===================== Error Types ===================== */

/// 1-indexed (line, column)
pub type Position = (usize, usize);

#[derive(Debug)]
pub enum ParseError {
    PestError(String, Option<Position>),
    BuildError(String, Option<Position>),
}

impl ParseError {
    pub fn position(&self) -> Option<Position> {
        match self {
            ParseError::PestError(_, position) => *position,
            ParseError::BuildError(_, position) => *position,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::PestError(msg, _) => msg,
            ParseError::BuildError(msg, _) => msg,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ParseError {}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let position = match err.line_col {
            pest::error::LineColLocation::Pos(pos) => Some(pos),
            pest::error::LineColLocation::Span(start, _) => Some(start),
        };
        ParseError::PestError(err.to_string(), position)
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/* ===================== Public API ===================== */

#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Report parameters without a type as errors instead of warnings
    pub no_implicit_any: bool,
}

/// A reflected module plus the issues found while reflecting it
#[derive(Debug, Clone)]
pub struct ParsedModule {
    pub module: Module,
    pub diagnostics: Vec<Diagnostic>,
}

/// Reflect the exported declarations of one TypeScript source file
pub fn parse_module(source: &str, path: &Path, options: ParseOptions) -> ParseResult<ParsedModule> {
    let mut pairs = TypeScriptParser::parse(Rule::program, source)?;
    let program = pairs
        .next()
        .ok_or_else(|| ParseError::BuildError("Empty parse tree".to_string(), None))?;

    let mut builder = ModuleBuilder {
        path,
        options,
        declarations: Vec::new(),
        diagnostics: Vec::new(),
        open_overload: None,
    };

    for pair in program.into_inner() {
        match pair.as_rule() {
            Rule::function_decl | Rule::function_fallback => builder.function(pair)?,
            Rule::arrow_decl | Rule::arrow_fallback => builder.arrow(pair)?,
            Rule::variable_decl
            | Rule::class_decl
            | Rule::interface_decl
            | Rule::type_alias_decl
            | Rule::enum_decl => builder.other(pair)?,
            // Token soup between exports
            _ => {}
        }
    }

    Ok(ParsedModule {
        module: Module {
            source_path: path.to_path_buf(),
            declarations: builder.declarations,
        },
        diagnostics: builder.diagnostics,
    })
}

/* ===================== Module Builder ===================== */

struct ModuleBuilder<'a> {
    path: &'a Path,
    options: ParseOptions,
    declarations: Vec<Declaration>,
    diagnostics: Vec<Diagnostic>,
    /// Index of a function whose overload list is still open
    open_overload: Option<usize>,
}

/// One `function` declaration as written, before overload merging
struct FunctionHeader {
    name: String,
    signature: FunctionSignature,
    has_body: bool,
    diagnostics: Vec<Diagnostic>,
}

impl ModuleBuilder<'_> {
    /// Bodiless declarations are overload signatures. They collect under the
    /// first one; the implementation that follows closes the set and is not
    /// itself listed.
    fn function(&mut self, pair: Pair<Rule>) -> ParseResult<()> {
        let header = self.function_header(pair)?;

        if let Some(index) = self.open_overload {
            if self.declarations[index].name == header.name {
                if header.has_body {
                    self.open_overload = None;
                } else {
                    self.declarations[index].signatures.push(header.signature);
                    self.diagnostics.extend(header.diagnostics);
                }
                return Ok(());
            }
        }

        self.open_overload = if header.has_body {
            None
        } else {
            Some(self.declarations.len())
        };
        self.declarations
            .push(Declaration::function(header.name, header.signature));
        self.diagnostics.extend(header.diagnostics);
        Ok(())
    }

    fn function_header(&self, pair: Pair<Rule>) -> ParseResult<FunctionHeader> {
        let position = pair.line_col();
        let is_fallback = pair.as_rule() == Rule::function_fallback;
        let mut name = None;
        let mut is_default = false;
        let mut parameters = Vec::new();
        let mut return_type = None;
        let mut has_body = false;
        let mut diagnostics = Vec::new();

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::kw_default => is_default = true,
                Rule::identifier => name = Some(inner.as_str().to_string()),
                Rule::param_list => parameters = self.params(inner, &mut diagnostics)?,
                Rule::raw_params => parameters = self.raw_params(inner, &mut diagnostics)?,
                Rule::return_annotation => return_type = Some(build_annotation(inner)?),
                Rule::raw_return => return_type = Some(build_raw_return(inner)?),
                Rule::function_body => has_body = true,
                _ => {}
            }
        }

        let name = match (name, is_default) {
            (Some(name), _) => name,
            (None, true) => "default".to_string(),
            (None, false) => {
                return Err(ParseError::BuildError(
                    "Exported function is missing a name".to_string(),
                    Some(position),
                ))
            }
        };

        if is_fallback {
            diagnostics.push(self.unparsed_signature(&name, position));
        }

        let return_type = match return_type {
            Some(ty) => ty,
            None => {
                diagnostics.push(self.missing_return_type(&name, position));
                SourceType::unknown("any")
            }
        };

        Ok(FunctionHeader {
            name,
            signature: FunctionSignature {
                parameters,
                return_type,
            },
            has_body,
            diagnostics,
        })
    }

    fn arrow(&mut self, pair: Pair<Rule>) -> ParseResult<()> {
        let position = pair.line_col();
        let is_fallback = pair.as_rule() == Rule::arrow_fallback;
        let mut name = None;
        let mut parameters = Vec::new();
        let mut return_type = None;
        let mut literal_body = None;
        let mut diagnostics = Vec::new();

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::identifier => name = Some(inner.as_str().to_string()),
                Rule::param_list => parameters = self.params(inner, &mut diagnostics)?,
                Rule::raw_params => parameters = self.raw_params(inner, &mut diagnostics)?,
                Rule::return_annotation => return_type = Some(build_annotation(inner)?),
                Rule::arrow_raw_return => return_type = Some(build_raw_return(inner)?),
                Rule::arrow_literal => {
                    literal_body = inner.into_inner().next().and_then(|lit| infer_literal(lit.as_str()))
                }
                _ => {}
            }
        }

        let name = name.ok_or_else(|| {
            ParseError::BuildError("Exported constant is missing a name".to_string(), Some(position))
        })?;
        if is_fallback {
            diagnostics.push(self.unparsed_signature(&name, position));
        }
        let return_type = match (return_type, literal_body) {
            (Some(ty), _) => ty,
            (None, Some(inferred)) => inferred,
            (None, None) => {
                diagnostics.push(self.missing_return_type(&name, position));
                SourceType::unknown("any")
            }
        };

        self.open_overload = None;
        self.declarations.push(Declaration::function(
            name,
            FunctionSignature {
                parameters,
                return_type,
            },
        ));
        self.diagnostics.extend(diagnostics);
        Ok(())
    }

    fn other(&mut self, pair: Pair<Rule>) -> ParseResult<()> {
        let position = pair.line_col();
        let name = pair
            .into_inner()
            .find(|inner| inner.as_rule() == Rule::identifier)
            .map(|inner| inner.as_str().to_string())
            .ok_or_else(|| {
                ParseError::BuildError("Exported declaration is missing a name".to_string(), Some(position))
            })?;

        self.open_overload = None;
        self.declarations.push(Declaration::other(name));
        Ok(())
    }

    fn params(&self, pair: Pair<Rule>, diagnostics: &mut Vec<Diagnostic>) -> ParseResult<Vec<Parameter>> {
        let mut parameters = Vec::new();

        for param in pair.into_inner().filter(|p| p.as_rule() == Rule::param) {
            let position = param.line_col();
            parameters.extend(self.param(param, position, diagnostics)?);
        }

        Ok(parameters)
    }

    /// Parameters of a signature that failed to parse as a whole. Each one is
    /// read again on its own; those that still fail keep their raw type text.
    fn raw_params(&self, pair: Pair<Rule>, diagnostics: &mut Vec<Diagnostic>) -> ParseResult<Vec<Parameter>> {
        let mut parameters = Vec::new();

        for raw in pair.into_inner().filter(|p| p.as_rule() == Rule::raw_param) {
            let position = raw.line_col();
            let parameter = match reparse(Rule::lone_param, raw.as_str()) {
                Some(param) => self.param(param, position, diagnostics)?,
                None => raw_parameter(raw.as_str()),
            };
            parameters.extend(parameter);
        }

        Ok(parameters)
    }

    /// `None` for a `this` parameter, which only types the receiver
    fn param(
        &self,
        pair: Pair<Rule>,
        position: Position,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> ParseResult<Option<Parameter>> {
        let mut name = None;
        let mut ty = None;
        let mut default_value = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::param_name => name = Some(normalize(inner.as_str())),
                Rule::type_expr => ty = Some(build_type(inner)?),
                Rule::default_value => default_value = Some(inner.as_str().trim().to_string()),
                _ => {}
            }
        }

        let name = name.ok_or_else(|| {
            ParseError::BuildError("Parameter is missing a name".to_string(), Some(position))
        })?;

        if name == "this" {
            return Ok(None);
        }

        let ty = match (ty, default_value.as_deref().and_then(infer_literal)) {
            (Some(ty), _) => ty,
            (None, Some(inferred)) => inferred,
            (None, None) => {
                diagnostics.push(self.implicit_any(&name, position));
                SourceType::unknown("any")
            }
        };

        Ok(Some(Parameter::new(name, ty)))
    }

    fn implicit_any(&self, name: &str, (line, column): Position) -> Diagnostic {
        let message = format!("Parameter '{}' implicitly has an 'any' type", name);
        let diagnostic = if self.options.no_implicit_any {
            Diagnostic::error(self.path, message, "implicit-any")
        } else {
            Diagnostic::warning(self.path, message, "implicit-any")
        };
        diagnostic.at(line, column)
    }

    fn unparsed_signature(&self, name: &str, (line, column): Position) -> Diagnostic {
        Diagnostic::warning(
            self.path,
            format!("Signature of '{}' could not be fully parsed", name),
            "unparsed-signature",
        )
        .at(line, column)
    }

    fn missing_return_type(&self, name: &str, (line, column): Position) -> Diagnostic {
        Diagnostic::warning(
            self.path,
            format!("Return type of '{}' is not annotated and cannot be inferred", name),
            "missing-return-type",
        )
        .at(line, column)
    }
}

/* ===================== Type Builder ===================== */

fn build_annotation(pair: Pair<Rule>) -> ParseResult<SourceType> {
    let position = pair.line_col();
    let inner = pair
        .into_inner()
        .find(|inner| matches!(inner.as_rule(), Rule::type_expr | Rule::type_predicate))
        .ok_or_else(|| ParseError::BuildError("Expected a type".to_string(), Some(position)))?;
    build_return_type(inner)
}

fn build_return_type(pair: Pair<Rule>) -> ParseResult<SourceType> {
    match pair.as_rule() {
        // Predicates only narrow at compile time; the runtime value is a boolean
        // or nothing at all, which the annotation does not say
        Rule::type_predicate => Ok(SourceType::unknown(normalize(pair.as_str()))),
        _ => build_type(pair),
    }
}

/// A `: type` kept as raw text by a fallback rule
fn build_raw_return(pair: Pair<Rule>) -> ParseResult<SourceType> {
    let text = pair.as_str().trim_start().trim_start_matches(':');
    match reparse(Rule::lone_return, text) {
        Some(inner) => build_return_type(inner),
        None => Ok(SourceType::unknown(normalize(text))),
    }
}

/// Unions and intersections have no structural form and stay `Unknown`
fn build_type(pair: Pair<Rule>) -> ParseResult<SourceType> {
    let position = pair.line_col();
    let text = normalize(pair.as_str());
    let mut operands: Vec<Pair<Rule>> = pair
        .into_inner()
        .filter(|inner| inner.as_rule() == Rule::type_operand)
        .collect();

    match operands.len() {
        1 => build_operand(operands.remove(0)),
        0 => Err(ParseError::BuildError(
            format!("Empty type expression: {}", text),
            Some(position),
        )),
        _ => Ok(SourceType::unknown(text)),
    }
}

fn build_operand(pair: Pair<Rule>) -> ParseResult<SourceType> {
    let text = normalize(pair.as_str());
    let mut base = None;
    let mut array_depth = 0;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::type_prefix => {
                if inner.as_str().trim() != "readonly" {
                    return Ok(SourceType::unknown(text));
                }
            }
            Rule::array_suffix => array_depth += 1,
            Rule::indexed_suffix => return Ok(SourceType::unknown(text)),
            _ => base = Some(build_primary(inner)?),
        }
    }

    let mut ty = base.unwrap_or_else(|| SourceType::unknown(text));
    for _ in 0..array_depth {
        ty = SourceType::array_of(ty);
    }
    Ok(ty)
}

fn build_primary(pair: Pair<Rule>) -> ParseResult<SourceType> {
    match pair.as_rule() {
        Rule::type_reference => Ok(SourceType::primitive(pair.as_str().trim())),
        rule @ (Rule::array_generic | Rule::paren_type) => {
            let position = pair.line_col();
            let inner = pair
                .into_inner()
                .find(|inner| inner.as_rule() == Rule::type_expr)
                .ok_or_else(|| ParseError::BuildError("Expected a type".to_string(), Some(position)))?;
            let ty = build_type(inner)?;
            if rule == Rule::array_generic {
                Ok(SourceType::array_of(ty))
            } else {
                Ok(ty)
            }
        }
        _ => Ok(SourceType::unknown(normalize(pair.as_str()))),
    }
}

/// Parse `text` on its own as one of the `lone_*` rules and unwrap the result
fn reparse(rule: Rule, text: &str) -> Option<Pair<'_, Rule>> {
    TypeScriptParser::parse(rule, text)
        .ok()?
        .next()?
        .into_inner()
        .find(|inner| inner.as_rule() != Rule::EOI)
}

/// A parameter the grammar cannot read: `name: <raw type>`
fn raw_parameter(text: &str) -> Option<Parameter> {
    let text = normalize(text);
    let (name, ty) = match text.split_once(':') {
        Some((name, ty)) => (
            name.trim().trim_start_matches("...").trim_end_matches('?').to_string(),
            ty.trim().to_string(),
        ),
        None => (text.clone(), text),
    };
    (name != "this").then(|| Parameter::new(name, SourceType::unknown(ty)))
}

/// Type of a parameter initialiser or arrow body when it is a plain literal
fn infer_literal(value: &str) -> Option<SourceType> {
    match value {
        "true" | "false" => Some(SourceType::primitive("boolean")),
        _ if value.starts_with('"') || value.starts_with('\'') || value.starts_with('`') => {
            Some(SourceType::primitive("string"))
        }
        _ if value.replace('_', "").parse::<f64>().is_ok() => Some(SourceType::primitive("number")),
        _ => None,
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
