use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported URL scheme for {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("reference target not found: {0}")]
    ReferencePointer(String),

    #[error("reference loop detected at {0}")]
    ReferenceLoop(String),

    #[error("invalid reference format: {0}")]
    InvalidReference(String),

    #[error("failed to load {url}: {source}")]
    Load {
        url: String,
        #[source]
        source: LoadError,
    },

    #[error("node at {pointer} does not match the expected shape: {source}")]
    Deserialize {
        pointer: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("load error: {0}")]
    Load(#[from] LoadError),

    #[error("class name `{name}` is assigned to both {existing} and {pointer}")]
    DuplicateClassName {
        name: String,
        existing: String,
        pointer: String,
    },

    #[error("invalid schema at {pointer}: {message}")]
    SchemaValidation { pointer: String, message: String },

    #[error("unknown schema type `{schema_type}` at {pointer}")]
    UnknownSchemaType {
        pointer: String,
        schema_type: String,
    },

    #[error("unsupported OpenAPI version: {0}")]
    UnsupportedVersion(String),
}

impl GenerateError {
    pub(crate) fn validation(pointer: impl ToString, message: impl Into<String>) -> Self {
        Self::SchemaValidation {
            pointer: pointer.to_string(),
            message: message.into(),
        }
    }
}
