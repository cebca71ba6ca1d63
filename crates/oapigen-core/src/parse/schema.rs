use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A JSON Schema type keyword value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
    /// OpenAPI 2.0 `type: file`.
    File,
}

impl SchemaType {
    /// Parse a `type` keyword value, returning `None` for anything outside
    /// the recognized set.
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "string" => Self::String,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            "object" => Self::Object,
            "null" => Self::Null,
            "file" => Self::File,
            _ => return None,
        })
    }
}

/// The `type` field can be a single type or an array of types. Values are
/// kept verbatim so unknown types surface as errors during classification
/// rather than as parse failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSet {
    Single(String),
    Multiple(Vec<String>),
}

impl TypeSet {
    pub fn names(&self) -> Vec<&str> {
        match self {
            TypeSet::Single(name) => vec![name.as_str()],
            TypeSet::Multiple(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// A reference or inline schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaOrRef {
    Ref {
        #[serde(rename = "$ref")]
        ref_path: String,
    },
    Schema(Box<Schema>),
}

/// Discriminator for polymorphic schemas. OpenAPI 2.0 uses a bare property
/// name, 3.x an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Discriminator {
    Object {
        #[serde(rename = "propertyName")]
        property_name: String,
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        mapping: IndexMap<String, String>,
    },
    Name(String),
}

impl Discriminator {
    pub fn property_name(&self) -> &str {
        match self {
            Discriminator::Object { property_name, .. } => property_name,
            Discriminator::Name(name) => name,
        }
    }
}

/// A JSON Schema object, covering the Swagger 2.0 and OpenAPI 3.x dialects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<TypeSet>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    // Object properties
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, SchemaOrRef>,

    #[serde(
        default,
        deserialize_with = "required_names",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub required: Vec<String>,

    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<AdditionalProperties>,

    // Array items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaOrRef>>,

    // Composition
    #[serde(rename = "allOf", default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<SchemaOrRef>,

    #[serde(rename = "oneOf", default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<SchemaOrRef>,

    #[serde(rename = "anyOf", default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<SchemaOrRef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<SchemaOrRef>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Discriminator>,

    // Enum values
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,

    // Encoded content
    #[serde(rename = "contentMediaType", skip_serializing_if = "Option::is_none")]
    pub content_media_type: Option<String>,
    #[serde(rename = "contentEncoding", skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,

    // Read/Write only
    #[serde(rename = "readOnly", skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(rename = "writeOnly", skip_serializing_if = "Option::is_none")]
    pub write_only: Option<bool>,

    /// Keys not modeled above, including `x-` extensions and validation
    /// keywords that do not affect type derivation.
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// `additionalProperties` can be a boolean or a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Bool(bool),
    Schema(Box<SchemaOrRef>),
}

impl Schema {
    /// The raw `type` keyword values, in declaration order.
    pub fn type_names(&self) -> Vec<&str> {
        self.schema_type
            .as_ref()
            .map(TypeSet::names)
            .unwrap_or_default()
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.type_names().contains(&name)
    }

    pub fn extension(&self, name: &str) -> Option<&Value> {
        self.extensions.get(name)
    }

    /// `nullable`, falling back to the Swagger `x-nullable` extension.
    pub fn nullable_flag(&self) -> Option<bool> {
        self.nullable.or_else(|| {
            self.extension("x-nullable")
                .and_then(Value::as_bool)
        })
    }

    /// Version gates declared through the `x-versions` extension.
    pub fn versions(&self) -> Vec<String> {
        match self.extension("x-versions") {
            Some(Value::String(gate)) => vec![gate.clone()],
            Some(Value::Array(gates)) => gates
                .iter()
                .filter_map(|gate| gate.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The additional-properties schema, if one is declared.
    pub fn additional_properties_schema(&self) -> Option<&SchemaOrRef> {
        match &self.additional_properties {
            Some(AdditionalProperties::Schema(schema)) => Some(schema),
            _ => None,
        }
    }

    /// True for `additionalProperties: true` or a schema.
    pub fn allows_additional_properties(&self) -> bool {
        matches!(
            self.additional_properties,
            Some(AdditionalProperties::Bool(true)) | Some(AdditionalProperties::Schema(_))
        )
    }
}

/// Some documents in the wild put `required: true` on a property schema.
/// Anything that is not a list of names is treated as no requirements.
fn required_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(names) => names
            .into_iter()
            .filter_map(|name| match name {
                Value::String(name) => Some(name),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_siblings_are_discarded() {
        let value = serde_json::json!({
            "$ref": "#/components/schemas/Point",
            "description": "ignored"
        });
        let schema: SchemaOrRef = serde_json::from_value(value).unwrap();
        assert_eq!(
            schema,
            SchemaOrRef::Ref {
                ref_path: "#/components/schemas/Point".to_string()
            }
        );
    }

    #[test]
    fn extensions_are_preserved() {
        let value = serde_json::json!({
            "type": "string",
            "x-nullable": true,
            "x-versions": ["openapi>=3.0"],
            "maxLength": 3
        });
        let schema: Schema = serde_json::from_value(value).unwrap();
        assert_eq!(schema.nullable_flag(), Some(true));
        assert_eq!(schema.versions(), vec!["openapi>=3.0".to_string()]);
        assert!(schema.extensions.contains_key("maxLength"));
    }

    #[test]
    fn boolean_required_is_tolerated() {
        let value = serde_json::json!({"type": "string", "required": true});
        let schema: Schema = serde_json::from_value(value).unwrap();
        assert!(schema.required.is_empty());
    }

    #[test]
    fn discriminator_dialects() {
        let v2: Discriminator = serde_json::from_value(serde_json::json!("kind")).unwrap();
        let v3: Discriminator =
            serde_json::from_value(serde_json::json!({"propertyName": "kind"})).unwrap();
        assert_eq!(v2.property_name(), "kind");
        assert_eq!(v3.property_name(), "kind");
    }
}
