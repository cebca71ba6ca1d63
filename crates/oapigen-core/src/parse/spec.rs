use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::components::Components;
use super::operation::PathItem;
use super::parameter::ParameterOrRef;
use super::response::ResponseOrRef;
use super::schema::SchemaOrRef;
use super::security::{SecurityRequirement, SecuritySchemeOrRef};

/// Info object describing the API.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub version: String,
}

/// Top-level OpenAPI document, covering Swagger 2.0 (`swagger`,
/// `definitions`, `securityDefinitions`, ...) and OpenAPI 3.x (`openapi`,
/// `components`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OpenApi {
    /// Kept verbatim: YAML reads an unquoted `2.0` as a number. See
    /// [`DocumentVersion::detect`](super::DocumentVersion::detect).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swagger: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub openapi: Option<Value>,

    #[serde(default)]
    pub info: Info,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub paths: IndexMap<String, PathItem>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,

    // OpenAPI 2.0
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub definitions: IndexMap<String, SchemaOrRef>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, ParameterOrRef>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub responses: IndexMap<String, ResponseOrRef>,

    #[serde(
        rename = "securityDefinitions",
        default,
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub security_definitions: IndexMap<String, SecuritySchemeOrRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consumes: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityRequirement>>,

    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl OpenApi {
    /// Security schemes from whichever dialect the document uses.
    pub fn security_schemes(&self) -> &IndexMap<String, SecuritySchemeOrRef> {
        match &self.components {
            Some(components) if self.security_definitions.is_empty() => {
                &components.security_schemes
            }
            _ => &self.security_definitions,
        }
    }
}
