pub mod components;
pub mod media_type;
pub mod operation;
pub mod parameter;
pub mod request_body;
pub mod response;
pub mod schema;
pub mod security;
pub mod spec;

use std::fmt;

use serde_json::Value;

use crate::error::{GenerateError, LoadError};
use spec::OpenApi;

/// Parse an OpenAPI document from YAML. The YAML tree is decoded straight
/// into a JSON value.
pub fn from_yaml(input: &str) -> Result<Value, LoadError> {
    Ok(serde_yaml_ng::from_str(input)?)
}

/// Parse an OpenAPI document from JSON.
pub fn from_json(input: &str) -> Result<Value, LoadError> {
    Ok(serde_json::from_str(input)?)
}

/// Parse a document body of unknown syntax. JSON bodies start with `{` or
/// `[`; everything else is read as YAML.
pub fn from_slice(bytes: &[u8]) -> Result<Value, LoadError> {
    let first = bytes.iter().find(|byte| !byte.is_ascii_whitespace());
    match first {
        Some(b'{') | Some(b'[') => Ok(serde_json::from_slice(bytes)?),
        _ => Ok(serde_yaml_ng::from_slice(bytes)?),
    }
}

/// Deserialize the typed metamodel from a parsed document.
pub fn to_openapi(document: &Value) -> Result<OpenApi, GenerateError> {
    DocumentVersion::detect(document)?;
    serde_json::from_value(document.clone()).map_err(|e| GenerateError::validation("#", e.to_string()))
}

/// The declared `swagger` / `openapi` version of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DocumentVersion {
    pub major: u32,
    pub minor: u32,
}

impl DocumentVersion {
    pub fn detect(document: &Value) -> Result<Self, GenerateError> {
        let declared = document
            .get("openapi")
            .or_else(|| document.get("swagger"))
            .map(|value| match value {
                Value::String(version) => version.clone(),
                other => other.to_string(),
            })
            .ok_or_else(|| GenerateError::UnsupportedVersion("<missing>".to_string()))?;
        let mut parts = declared.split('.');
        let major = parts.next().and_then(|part| part.trim().parse::<u32>().ok());
        let minor = parts
            .next()
            .and_then(|part| part.trim().parse::<u32>().ok())
            .unwrap_or(0);
        match major {
            Some(major @ (2 | 3)) => Ok(Self { major, minor }),
            _ => Err(GenerateError::UnsupportedVersion(declared)),
        }
    }

    pub fn is_swagger(&self) -> bool {
        self.major < 3
    }
}

impl fmt::Display for DocumentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
