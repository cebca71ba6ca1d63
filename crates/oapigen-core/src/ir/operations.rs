use super::schemas::IrType;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
        }
    }

    /// Parse a lowercase path-item key.
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "get" => HttpMethod::Get,
            "put" => HttpMethod::Put,
            "post" => HttpMethod::Post,
            "delete" => HttpMethod::Delete,
            "options" => HttpMethod::Options,
            "head" => HttpMethod::Head,
            "patch" => HttpMethod::Patch,
            "trace" => HttpMethod::Trace,
            _ => return None,
        })
    }
}

/// Where an argument travels in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IrParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
    Body,
    FormData,
}

impl IrParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            IrParameterLocation::Path => "path",
            IrParameterLocation::Query => "query",
            IrParameterLocation::Header => "header",
            IrParameterLocation::Cookie => "cookie",
            IrParameterLocation::Body => "body",
            IrParameterLocation::FormData => "formData",
        }
    }
}

/// OpenAPI serialization styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterStyle {
    Simple,
    Label,
    Matrix,
    Form,
    SpaceDelimited,
    PipeDelimited,
    DeepObject,
}

impl ParameterStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterStyle::Simple => "simple",
            ParameterStyle::Label => "label",
            ParameterStyle::Matrix => "matrix",
            ParameterStyle::Form => "form",
            ParameterStyle::SpaceDelimited => "spaceDelimited",
            ParameterStyle::PipeDelimited => "pipeDelimited",
            ParameterStyle::DeepObject => "deepObject",
        }
    }

    pub fn parse(style: &str) -> Option<Self> {
        Some(match style {
            "simple" => ParameterStyle::Simple,
            "label" => ParameterStyle::Label,
            "matrix" => ParameterStyle::Matrix,
            "form" => ParameterStyle::Form,
            "spaceDelimited" => ParameterStyle::SpaceDelimited,
            "pipeDelimited" => ParameterStyle::PipeDelimited,
            "deepObject" => ParameterStyle::DeepObject,
            _ => return None,
        })
    }

    /// `explode` when a style is declared without one.
    pub fn default_explode(&self) -> bool {
        matches!(self, ParameterStyle::Form | ParameterStyle::DeepObject)
    }
}

/// One argument of a generated client method.
#[derive(Debug, Clone, PartialEq)]
pub struct IrParameter {
    /// Normalized, unique identifier used in the method signature.
    pub argument_name: String,
    /// The name used on the wire.
    pub wire_name: String,
    pub location: IrParameterLocation,
    pub style: ParameterStyle,
    pub explode: bool,
    pub content_type: Option<String>,
    pub required: bool,
    pub param_type: IrType,
    pub description: Option<String>,
    /// Per-part headers declared by a form encoding.
    pub headers: Vec<String>,
}

/// A fully analyzed API operation.
#[derive(Debug, Clone, PartialEq)]
pub struct IrOperation {
    pub method_name: String,
    pub method: HttpMethod,
    pub path: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Arguments in signature order: required first, then optional.
    pub parameters: Vec<IrParameter>,
    /// Form data is sent as `multipart/form-data`.
    pub multipart: bool,
    /// Deduplicated types of the 2xx responses. Empty means no return value.
    pub response_types: Vec<IrType>,
    /// Index into `parameters` from which arguments are collapsed into a
    /// keyword bundle, when the signature would be too long.
    pub variadic_from: Option<usize>,
    pub deprecated: bool,
}

impl IrOperation {
    /// The JSON or raw request-body argument.
    pub fn body(&self) -> Option<&IrParameter> {
        self.parameters
            .iter()
            .find(|parameter| parameter.location == IrParameterLocation::Body)
    }

    pub fn parameters_in(&self, location: IrParameterLocation) -> impl Iterator<Item = (usize, &IrParameter)> {
        self.parameters
            .iter()
            .enumerate()
            .filter(move |(_, parameter)| parameter.location == location)
    }

    /// True when the argument at `index` is read from the keyword bundle.
    pub fn is_variadic(&self, index: usize) -> bool {
        self.variadic_from.is_some_and(|from| index >= from)
    }
}

/// Client initializer defaults inferred from the security schemes.
#[derive(Debug, Clone, PartialEq)]
pub struct IrInitDefaults {
    pub api_key_in: String,
    pub api_key_name: String,
    pub oauth2_authorization_url: Option<String>,
    pub oauth2_token_url: Option<String>,
    pub oauth2_refresh_url: Option<String>,
    pub oauth2_flows: Vec<String>,
    pub open_id_connect_url: Option<String>,
}

impl Default for IrInitDefaults {
    fn default() -> Self {
        Self {
            api_key_in: "header".to_string(),
            api_key_name: "X-API-KEY".to_string(),
            oauth2_authorization_url: None,
            oauth2_token_url: None,
            oauth2_refresh_url: None,
            oauth2_flows: Vec::new(),
            open_id_connect_url: None,
        }
    }
}
