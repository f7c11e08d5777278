// crates/appscout-core/src/registry.rs
// ============================================================================
// Module: Tool Registry
// Description: Immutable tool table mapping names to shapes and templates.
// Purpose: Validate invocation arguments and build upstream requests.
// Dependencies: serde_json, thiserror, url
// ============================================================================

//! ## Overview
//! The registry is the fixed table behind dispatch: each entry pairs an input
//! shape (ordered field specs with types, required flags, and defaults) with
//! a request template (method, path, and field targets). It is built once at
//! startup by [`ToolRegistry::builtin`] and passed into the gateway as an
//! explicit value; nothing registers tools as a side effect of module load.
//!
//! ## Invariants
//! - Tool names are unique within a registry.
//! - Validation rejects an invocation before any network request is built.
//! - Unknown argument fields are ignored, never rejected.
//! - Request construction is deterministic for identical validated arguments.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::catalog::ToolName;
use crate::upstream::UpstreamRequest;

// ============================================================================
// SECTION: Request Templates
// ============================================================================

/// HTTP methods used by upstream request templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
}

impl HttpMethod {
    /// Returns the method name as it appears on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Where a validated field lands in the upstream request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTarget {
    /// Field is appended to the query string.
    Query,
    /// Field value becomes the JSON request body verbatim.
    Body,
    /// Field fills a `{name}` placeholder in the path template.
    Path,
}

/// Per-field type and shape constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Syntactically valid absolute URL.
    AbsoluteUrl,
    /// Integer within an inclusive range.
    Integer {
        /// Minimum accepted value.
        min: i64,
        /// Maximum accepted value.
        max: i64,
    },
    /// Non-empty string.
    Text,
    /// Arbitrary JSON object, forwarded without reshaping.
    Object,
}

/// Declared input field for a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name as it appears in invocation arguments.
    pub name: &'static str,
    /// Type and shape constraint for the field.
    pub kind: FieldKind,
    /// Whether the field must be present.
    pub required: bool,
    /// Default applied when an optional field is absent.
    pub default: Option<Value>,
    /// Request position the field maps onto.
    pub target: FieldTarget,
}

/// Registry entry: input shape plus upstream request template.
///
/// # Invariants
/// - `path` placeholders (`{name}`) correspond to a [`FieldTarget::Path`]
///   field of the same name.
/// - At most one field targets the body; its value is sent verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    /// Canonical tool name.
    pub name: ToolName,
    /// Upstream HTTP method.
    pub method: HttpMethod,
    /// Upstream path template relative to the base URL.
    pub path: &'static str,
    /// Ordered input field declarations.
    pub fields: Vec<FieldSpec>,
}

/// Validated arguments keyed by declared field name, defaults applied.
pub type ValidatedArguments = BTreeMap<&'static str, Value>;

impl ToolSpec {
    /// Validates raw invocation arguments against the declared input shape.
    ///
    /// Unknown fields are ignored. Declared fields are checked in order, so
    /// the first failing field is reported. `null` arguments are treated as
    /// an empty object; a present-but-null declared field is a type failure.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] naming the first failing field.
    pub fn validate(&self, arguments: &Value) -> Result<ValidatedArguments, ValidationError> {
        let empty = serde_json::Map::new();
        let object = match arguments {
            Value::Null => &empty,
            Value::Object(map) => map,
            _ => return Err(ValidationError::NotAnObject),
        };
        let mut validated = ValidatedArguments::new();
        for field in &self.fields {
            match object.get(field.name) {
                None => {
                    if field.required {
                        return Err(ValidationError::MissingField(field.name));
                    }
                    if let Some(default) = &field.default {
                        validated.insert(field.name, default.clone());
                    }
                }
                Some(value) => {
                    check_field(field, value)?;
                    validated.insert(field.name, value.clone());
                }
            }
        }
        Ok(validated)
    }

    /// Builds the upstream request from the template and validated arguments.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] when the template and arguments disagree;
    /// this indicates a registry defect rather than a caller error.
    pub fn build_request(
        &self,
        base_url: &Url,
        arguments: &ValidatedArguments,
    ) -> Result<UpstreamRequest, TemplateError> {
        let mut url = base_url.clone();
        {
            let mut segments =
                url.path_segments_mut().map_err(|()| TemplateError::InvalidBaseUrl)?;
            segments.pop_if_empty();
            for segment in self.path.split('/').filter(|segment| !segment.is_empty()) {
                if let Some(name) = placeholder_name(segment) {
                    let field = self
                        .fields
                        .iter()
                        .find(|field| field.name == name && field.target == FieldTarget::Path)
                        .ok_or(TemplateError::UnboundPlaceholder)?;
                    let value = arguments
                        .get(field.name)
                        .ok_or(TemplateError::UnboundPlaceholder)?;
                    segments.push(&query_text(value)?);
                } else {
                    segments.push(segment);
                }
            }
        }
        for field in &self.fields {
            if field.target != FieldTarget::Query {
                continue;
            }
            if let Some(value) = arguments.get(field.name) {
                url.query_pairs_mut().append_pair(field.name, &query_text(value)?);
            }
        }
        let body = self
            .fields
            .iter()
            .filter(|field| field.target == FieldTarget::Body)
            .find_map(|field| arguments.get(field.name).cloned());
        Ok(UpstreamRequest {
            method: self.method,
            url,
            body,
        })
    }
}

/// Extracts the placeholder name from a `{name}` path segment.
fn placeholder_name(segment: &str) -> Option<&str> {
    segment.strip_prefix('{').and_then(|rest| rest.strip_suffix('}'))
}

/// Checks a present argument value against its declared field kind.
fn check_field(field: &FieldSpec, value: &Value) -> Result<(), ValidationError> {
    match &field.kind {
        FieldKind::AbsoluteUrl => {
            let Value::String(text) = value else {
                return Err(invalid(field.name, "must be a string"));
            };
            if Url::parse(text).is_err() {
                return Err(invalid(field.name, "must be an absolute URL"));
            }
            Ok(())
        }
        FieldKind::Integer {
            min,
            max,
        } => {
            let Some(number) = value.as_i64() else {
                return Err(invalid(field.name, "must be an integer"));
            };
            if number < *min || number > *max {
                return Err(invalid(
                    field.name,
                    &format!("must be between {min} and {max}"),
                ));
            }
            Ok(())
        }
        FieldKind::Text => {
            let Value::String(text) = value else {
                return Err(invalid(field.name, "must be a string"));
            };
            if text.is_empty() {
                return Err(invalid(field.name, "must be a non-empty string"));
            }
            Ok(())
        }
        FieldKind::Object => {
            if value.is_object() {
                Ok(())
            } else {
                Err(invalid(field.name, "must be a JSON object"))
            }
        }
    }
}

/// Builds an invalid-field error.
fn invalid(field: &'static str, reason: &str) -> ValidationError {
    ValidationError::InvalidField {
        field,
        reason: reason.to_string(),
    }
}

/// Renders a validated scalar value as query or path text.
fn query_text(value: &Value) -> Result<String, TemplateError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        _ => Err(TemplateError::NonScalarValue),
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Immutable table of registered tools.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    /// Registered tool specs keyed by canonical name.
    specs: BTreeMap<ToolName, ToolSpec>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the registry with the canonical bridge tools.
    #[must_use]
    pub fn builtin() -> Self {
        let mut specs = BTreeMap::new();
        for spec in builtin_specs() {
            specs.insert(spec.name, spec);
        }
        Self {
            specs,
        }
    }

    /// Registers a tool spec.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateTool`] when the name is taken.
    pub fn register(&mut self, spec: ToolSpec) -> Result<(), RegistryError> {
        if self.specs.contains_key(&spec.name) {
            return Err(RegistryError::DuplicateTool(spec.name));
        }
        self.specs.insert(spec.name, spec);
        Ok(())
    }

    /// Looks up a tool spec by its string name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownTool`] when the name is not registered.
    pub fn lookup(&self, name: &str) -> Result<&ToolSpec, RegistryError> {
        ToolName::parse(name)
            .and_then(|tool| self.specs.get(&tool))
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns true when no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Returns the canonical tool specs matching the upstream route table.
fn builtin_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: ToolName::Crawl,
            method: HttpMethod::Post,
            path: "/crawl",
            fields: vec![
                FieldSpec {
                    name: "url",
                    kind: FieldKind::AbsoluteUrl,
                    required: true,
                    default: None,
                    target: FieldTarget::Query,
                },
                FieldSpec {
                    name: "depth",
                    kind: FieldKind::Integer {
                        min: 0,
                        max: 3,
                    },
                    required: false,
                    default: Some(Value::from(1)),
                    target: FieldTarget::Query,
                },
            ],
        },
        ToolSpec {
            name: ToolName::DocSearch,
            method: HttpMethod::Get,
            path: "/doc_search",
            fields: vec![FieldSpec {
                name: "query",
                kind: FieldKind::Text,
                required: true,
                default: None,
                target: FieldTarget::Query,
            }],
        },
        ToolSpec {
            name: ToolName::Evaluate,
            method: HttpMethod::Get,
            path: "/evaluate",
            fields: vec![
                FieldSpec {
                    name: "selector",
                    kind: FieldKind::Text,
                    required: true,
                    default: None,
                    target: FieldTarget::Query,
                },
                FieldSpec {
                    name: "route",
                    kind: FieldKind::Text,
                    required: true,
                    default: None,
                    target: FieldTarget::Query,
                },
            ],
        },
        ToolSpec {
            name: ToolName::PersistFlow,
            method: HttpMethod::Post,
            path: "/persist_flow",
            fields: vec![FieldSpec {
                name: "flow",
                kind: FieldKind::Object,
                required: true,
                default: None,
                target: FieldTarget::Body,
            }],
        },
        ToolSpec {
            name: ToolName::ListFlows,
            method: HttpMethod::Get,
            path: "/flows",
            fields: Vec::new(),
        },
        ToolSpec {
            name: ToolName::GetFlow,
            method: HttpMethod::Get,
            path: "/flows/{id}",
            fields: vec![FieldSpec {
                name: "id",
                kind: FieldKind::Text,
                required: true,
                default: None,
                target: FieldTarget::Path,
            }],
        },
    ]
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry construction and lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A tool with the same name is already registered.
    #[error("duplicate tool `{0}`")]
    DuplicateTool(ToolName),
    /// The requested tool name is not registered.
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
}

/// Argument validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Arguments payload was not a JSON object.
    #[error("arguments must be a JSON object")]
    NotAnObject,
    /// A required field is absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    /// A present field failed its type or shape constraint.
    #[error("field `{field}` {reason}")]
    InvalidField {
        /// Name of the failing field.
        field: &'static str,
        /// Human-readable constraint description.
        reason: String,
    },
}

/// Request template errors; these indicate registry defects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Base URL cannot carry path segments.
    #[error("base url cannot carry path segments")]
    InvalidBaseUrl,
    /// A path placeholder has no matching validated argument.
    #[error("path placeholder has no matching argument")]
    UnboundPlaceholder,
    /// A query or path value was not a scalar.
    #[error("query or path value must be a scalar")]
    NonScalarValue,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
