use indexmap::IndexMap;
use minijinja::context;
use oapigen_core::ir::{
    IrInitDefaults, IrOperation, IrParameter, IrParameterLocation, IrSpec, IrType, ParameterStyle,
};

use super::{docstring, environment};
use crate::error::EmitError;
use crate::type_mapper::{PythonTypes, python_string, python_tuple, required_imports};

/// How the client class is declared and where its models come from.
#[derive(Debug, Clone)]
pub struct ClientLayout {
    pub class_name: String,
    /// Dotted path of the base class, e.g. `oapi.client.Client`.
    pub base_class: String,
    /// Statement importing the model module, e.g. `from . import model`.
    pub model_import: String,
    /// Name the model module is bound to, e.g. `model`.
    pub model_alias: String,
    /// Extra import statements, emitted verbatim.
    pub imports: Vec<String>,
    /// Init parameter name → Python expression replacing its default.
    pub init_parameter_defaults: IndexMap<String, String>,
    /// Extra init parameter declarations. They are not forwarded to the base class.
    pub add_init_parameters: Vec<String>,
    /// Init parameters to keep. Empty keeps all of them.
    pub include_init_parameters: Vec<String>,
}

impl Default for ClientLayout {
    fn default() -> Self {
        Self {
            class_name: "Client".to_string(),
            base_class: "oapi.client.Client".to_string(),
            model_import: "from . import model".to_string(),
            model_alias: "model".to_string(),
            imports: Vec::new(),
            init_parameter_defaults: IndexMap::new(),
            add_init_parameters: Vec::new(),
            include_init_parameters: Vec::new(),
        }
    }
}

/// Keyword parameters accepted by `oapi.client.Client.__init__`, with their
/// type hints and runtime defaults.
const INIT_PARAMETERS: &[(&str, &str, &str)] = &[
    ("user", "str | None", "None"),
    ("password", "str | None", "None"),
    ("bearer_token", "str | None", "None"),
    ("api_key", "str | None", "None"),
    (
        "api_key_in",
        "typing.Literal[\"header\", \"query\", \"cookie\"]",
        "\"header\"",
    ),
    ("api_key_name", "str", "\"X-API-KEY\""),
    ("oauth2_client_id", "str | None", "None"),
    ("oauth2_client_secret", "str | None", "None"),
    ("oauth2_username", "str | None", "None"),
    ("oauth2_password", "str | None", "None"),
    ("oauth2_authorization_url", "str | None", "None"),
    ("oauth2_token_url", "str | None", "None"),
    ("oauth2_scope", "str | tuple[str, ...] | None", "None"),
    ("oauth2_refresh_url", "str | None", "None"),
    ("oauth2_flows", "tuple[str, ...] | None", "None"),
    ("open_id_connect_url", "str | None", "None"),
    (
        "headers",
        "typing.Mapping[str, str] | typing.Sequence[tuple[str, str]]",
        "((\"Accept\", \"application/json\"), (\"Content-type\", \"application/json\"))",
    ),
    ("timeout", "int", "0"),
    ("retry_number_of_attempts", "int", "1"),
    (
        "retry_for_errors",
        "tuple[type[Exception], ...]",
        "oapi.client.DEFAULT_RETRY_FOR_ERRORS",
    ),
    (
        "retry_hook",
        "typing.Callable[[Exception], bool]",
        "oapi.client.default_retry_hook",
    ),
    ("verify_ssl_certificate", "bool", "True"),
    ("logger", "logging.Logger | None", "None"),
    ("echo", "bool", "False"),
];

/// Emit the client module: one class deriving from the runtime client, with
/// one method per operation.
pub fn emit_client_module(ir: &IrSpec, layout: &ClientLayout) -> Result<String, EmitError> {
    let env = environment("client.py.j2", include_str!("../../templates/client.py.j2"))?;
    let tmpl = env.get_template("client.py.j2")?;

    let types = PythonTypes::imported(&layout.model_alias);
    let operations: Vec<minijinja::Value> = ir
        .operations
        .iter()
        .map(|operation| operation_to_ctx(operation, &types))
        .collect();

    let mut class_doc = Vec::new();
    if !ir.info.title.trim().is_empty() {
        class_doc.push(ir.info.title.clone());
    }
    if let Some(description) = ir.info.description.as_deref().filter(|d| !d.trim().is_empty()) {
        class_doc.push(description.to_string());
    }

    let referenced = ir.operations.iter().flat_map(|operation| {
        operation
            .parameters
            .iter()
            .map(|parameter| &parameter.param_type)
            .chain(operation.response_types.iter())
    });

    Ok(tmpl.render(context! {
        header => docstring(&[format!("Client for {}.", ir.info.title)], 0),
        standard_imports => required_imports(referenced),
        runtime_imports => runtime_imports(&layout.base_class),
        imports => layout.imports.clone(),
        model_import => layout.model_import.clone(),
        class_name => layout.class_name.clone(),
        base_class => layout.base_class.clone(),
        class_docstring => if class_doc.is_empty() { String::new() } else { docstring(&class_doc, 4) },
        init_parameters => init_parameters(&ir.init_defaults, layout),
        added_parameters => layout.add_init_parameters.clone(),
        operations => operations,
    })?)
}

/// Modules imported by `import x.y` for the runtime and the base class.
fn runtime_imports(base_class: &str) -> Vec<String> {
    let mut modules = vec!["oapi.client".to_string()];
    if let Some((module, _)) = base_class.rsplit_once('.')
        && !modules.iter().any(|existing| existing == module)
    {
        modules.push(module.to_string());
    }
    modules.push("sob".to_string());
    modules.sort();
    modules
}

/// The keyword parameters of `__init__` with their final defaults.
fn init_parameters(defaults: &IrInitDefaults, layout: &ClientLayout) -> Vec<minijinja::Value> {
    let optional_string = |value: &Option<String>| {
        value
            .as_deref()
            .map(python_string)
            .unwrap_or_else(|| "None".to_string())
    };
    let mut inferred: IndexMap<&str, String> = IndexMap::new();
    inferred.insert("api_key_in", python_string(&defaults.api_key_in));
    inferred.insert("api_key_name", python_string(&defaults.api_key_name));
    inferred.insert(
        "oauth2_authorization_url",
        optional_string(&defaults.oauth2_authorization_url),
    );
    inferred.insert("oauth2_token_url", optional_string(&defaults.oauth2_token_url));
    inferred.insert("oauth2_refresh_url", optional_string(&defaults.oauth2_refresh_url));
    if !defaults.oauth2_flows.is_empty() {
        let flows: Vec<String> = defaults.oauth2_flows.iter().map(|flow| python_string(flow)).collect();
        inferred.insert("oauth2_flows", python_tuple(&flows));
    }
    inferred.insert("open_id_connect_url", optional_string(&defaults.open_id_connect_url));

    INIT_PARAMETERS
        .iter()
        .filter(|(name, _, _)| {
            layout.include_init_parameters.is_empty()
                || layout.include_init_parameters.iter().any(|kept| kept == name)
        })
        .map(|(name, hint, runtime_default)| {
            let default = layout
                .init_parameter_defaults
                .get(*name)
                .cloned()
                .or_else(|| inferred.get(name).cloned())
                .unwrap_or_else(|| runtime_default.to_string());
            context! {
                name => *name,
                hint => *hint,
                default => default,
            }
        })
        .collect()
}

fn operation_to_ctx(operation: &IrOperation, types: &PythonTypes<'_>) -> minijinja::Value {
    let returns = !operation.response_types.is_empty();
    let return_hint = if returns {
        types.hint(&IrType::union(operation.response_types.iter().cloned()))
    } else {
        "None".to_string()
    };

    context! {
        name => operation.method_name.clone(),
        arguments => signature(operation, types),
        return_hint => return_hint,
        docstring => method_docstring(operation),
        call => request_call(operation),
        returns => returns,
        return_types => types.type_entries(&operation.response_types),
    }
}

/// Signature lines after `self`.
fn signature(operation: &IrOperation, types: &PythonTypes<'_>) -> Vec<String> {
    let mut arguments: Vec<String> = operation
        .parameters
        .iter()
        .enumerate()
        .filter(|(index, _)| !operation.is_variadic(*index))
        .map(|(_, parameter)| {
            if parameter.required {
                format!("{}: {}", parameter.argument_name, types.hint(&parameter.param_type))
            } else {
                format!(
                    "{}: {} = None",
                    parameter.argument_name,
                    types.optional_hint(&parameter.param_type)
                )
            }
        })
        .collect();
    if operation.variadic_from.is_some() {
        arguments.push("**kwargs: typing.Any".to_string());
    }
    arguments
}

fn method_docstring(operation: &IrOperation) -> String {
    let mut paragraphs = Vec::new();
    if let Some(text) = operation
        .description
        .as_deref()
        .or(operation.summary.as_deref())
        .filter(|text| !text.trim().is_empty())
    {
        paragraphs.push(text.to_string());
    }
    if operation.deprecated {
        paragraphs.push("Deprecated.".to_string());
    }
    if !operation.parameters.is_empty() {
        let mut block = String::from("Parameters:");
        for parameter in &operation.parameters {
            block.push_str(&format!("\n    - {}:", parameter.argument_name));
            if let Some(description) = parameter.description.as_deref() {
                let mut lines = description.trim().lines();
                if let Some(first) = lines.next() {
                    block.push(' ');
                    block.push_str(first);
                }
                for line in lines {
                    block.push_str("\n      ");
                    block.push_str(line);
                }
            }
            if !parameter.headers.is_empty() {
                block.push_str(&format!("\n      Headers: {}", parameter.headers.join(", ")));
            }
        }
        paragraphs.push(block);
    }
    if paragraphs.is_empty() {
        String::new()
    } else {
        docstring(&paragraphs, 8)
    }
}

/// The expression an argument is read from inside the method body.
fn argument_value(operation: &IrOperation, index: usize, parameter: &IrParameter) -> String {
    if operation.is_variadic(index) {
        format!("kwargs.get({}, None)", python_string(&parameter.argument_name))
    } else {
        parameter.argument_name.clone()
    }
}

/// `oapi.client.format_argument_value(...)` for one argument.
fn formatted_argument(operation: &IrOperation, index: usize, parameter: &IrParameter) -> String {
    let name = if parameter.style == ParameterStyle::Matrix {
        format!(";{}", parameter.wire_name)
    } else {
        parameter.wire_name.clone()
    };
    let multipart = if parameter.location == IrParameterLocation::FormData && operation.multipart {
        ", multipart=True"
    } else {
        ""
    };
    format!(
        "oapi.client.format_argument_value({}, {}, style={}, explode={}{multipart})",
        python_string(&name),
        argument_value(operation, index, parameter),
        python_string(parameter.style.as_str()),
        if parameter.explode { "True" } else { "False" },
    )
}

/// Lines of the `self.request(...)` call, indented for a method body.
fn request_call(operation: &IrOperation) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(if operation.response_types.is_empty() {
        "self.request(".to_string()
    } else {
        "response: sob.abc.Readable = self.request(".to_string()
    });

    let path_parameters: Vec<(usize, &IrParameter)> =
        operation.parameters_in(IrParameterLocation::Path).collect();
    if path_parameters.is_empty() {
        lines.push(format!("    {},", python_string(&operation.path)));
    } else {
        lines.push(format!("    {}.format(**{{", python_string(&operation.path)));
        for (index, parameter) in path_parameters {
            lines.push(format!(
                "        {}: str({}),",
                python_string(&parameter.wire_name),
                formatted_argument(operation, index, parameter)
            ));
        }
        lines.push("    }),".to_string());
    }
    lines.push(format!("    method={},", python_string(operation.method.as_str())));

    let mut headers: Vec<String> = operation
        .parameters_in(IrParameterLocation::Header)
        .map(|(index, parameter)| {
            format!(
                "{}: {}",
                python_string(&parameter.wire_name),
                formatted_argument(operation, index, parameter)
            )
        })
        .collect();
    let cookies: Vec<String> = operation
        .parameters_in(IrParameterLocation::Cookie)
        .map(|(index, parameter)| {
            format!(
                "oapi.client.urlencode({{{}: {}}})",
                python_string(&parameter.wire_name),
                formatted_argument(operation, index, parameter)
            )
        })
        .collect();
    if !cookies.is_empty() {
        headers.push(format!(
            "\"Cookie\": \"; \".join(({},))",
            cookies.join(", ")
        ));
    }
    let raw_body = operation
        .body()
        .and_then(|body| body.content_type.as_deref());
    if let Some(content_type) = raw_body {
        headers.push(format!("\"Content-Type\": {}", python_string(content_type)));
    }
    push_mapping(&mut lines, "headers", &headers);

    let query: Vec<String> = operation
        .parameters_in(IrParameterLocation::Query)
        .map(|(index, parameter)| {
            format!(
                "{}: {}",
                python_string(&parameter.wire_name),
                formatted_argument(operation, index, parameter)
            )
        })
        .collect();
    push_mapping(&mut lines, "query", &query);

    let form: Vec<(usize, &IrParameter)> = operation
        .parameters_in(IrParameterLocation::FormData)
        .collect();
    let data: Vec<String> = form
        .iter()
        .map(|(index, parameter)| {
            format!(
                "{}: {}",
                python_string(&parameter.wire_name),
                formatted_argument(operation, *index, parameter)
            )
        })
        .collect();
    push_mapping(&mut lines, "data", &data);
    if operation.multipart {
        let part_headers: Vec<String> = form
            .iter()
            .filter_map(|(_, parameter)| {
                parameter.content_type.as_deref().map(|content_type| {
                    format!(
                        "{}: {{\"Content-Type\": {}}}",
                        python_string(&parameter.wire_name),
                        python_string(content_type)
                    )
                })
            })
            .collect();
        push_mapping(&mut lines, "multipart_data_headers", &part_headers);
    }

    if let Some(index) = operation
        .parameters
        .iter()
        .position(|parameter| parameter.location == IrParameterLocation::Body)
    {
        let body = &operation.parameters[index];
        lines.push(format!("    json={},", argument_value(operation, index, body)));
    }
    if operation.multipart {
        lines.push("    multipart=True,".to_string());
    }
    lines.push(")".to_string());
    lines
}

fn push_mapping(lines: &mut Vec<String>, keyword: &str, entries: &[String]) {
    if entries.is_empty() {
        return;
    }
    lines.push(format!("    {keyword}={{"));
    for entry in entries {
        lines.push(format!("        {entry},"));
    }
    lines.push("    },".to_string());
}

#[cfg(test)]
mod tests {
    use oapigen_core::ir::{HttpMethod, IrInfo, PrimitiveKind};
    use oapigen_core::parse::DocumentVersion;

    use super::*;

    fn parameter(name: &str, location: IrParameterLocation, required: bool) -> IrParameter {
        let (style, explode) = match location {
            IrParameterLocation::Path | IrParameterLocation::Header => (ParameterStyle::Simple, false),
            _ => (ParameterStyle::Form, true),
        };
        IrParameter {
            argument_name: heck::ToSnakeCase::to_snake_case(name),
            wire_name: name.to_string(),
            location,
            style,
            explode,
            content_type: None,
            required,
            param_type: IrType::primitive(PrimitiveKind::String, None),
            description: None,
            headers: Vec::new(),
        }
    }

    fn operation(method_name: &str, path: &str, parameters: Vec<IrParameter>) -> IrOperation {
        IrOperation {
            method_name: method_name.to_string(),
            method: HttpMethod::Get,
            path: path.to_string(),
            summary: None,
            description: None,
            parameters,
            multipart: false,
            response_types: Vec::new(),
            variadic_from: None,
            deprecated: false,
        }
    }

    fn spec(operations: Vec<IrOperation>, init_defaults: IrInitDefaults) -> IrSpec {
        IrSpec {
            info: IrInfo {
                title: "Pets".to_string(),
                description: None,
                version: "1".to_string(),
            },
            version: DocumentVersion { major: 3, minor: 0 },
            models: Vec::new(),
            pointers: Vec::new(),
            operations,
            init_defaults,
        }
    }

    #[test]
    fn test_init_defaults_and_overrides() {
        let defaults = IrInitDefaults {
            api_key_in: "query".to_string(),
            api_key_name: "key".to_string(),
            oauth2_token_url: Some("https://auth.example.com/token".to_string()),
            oauth2_flows: vec!["clientCredentials".to_string()],
            ..IrInitDefaults::default()
        };
        let mut layout = ClientLayout::default();
        layout
            .init_parameter_defaults
            .insert("timeout".to_string(), "30".to_string());
        layout
            .add_init_parameters
            .push("region: str = \"eu\"".to_string());
        let output = emit_client_module(&spec(Vec::new(), defaults), &layout).unwrap();

        assert!(output.contains("class Client(oapi.client.Client):\n"));
        assert!(output.contains("        api_key_in: typing.Literal[\"header\", \"query\", \"cookie\"] = \"query\",\n"));
        assert!(output.contains("        api_key_name: str = \"key\",\n"));
        assert!(output.contains("        oauth2_token_url: str | None = \"https://auth.example.com/token\",\n"));
        assert!(output.contains("        oauth2_flows: tuple[str, ...] | None = (\"clientCredentials\",),\n"));
        assert!(output.contains("        timeout: int = 30,\n"));
        assert!(output.contains("        region: str = \"eu\",\n"));
        assert!(output.contains("            timeout=timeout,\n"));
        assert!(!output.contains("region=region"));
        assert!(output.contains("from . import model\n"));
    }

    #[test]
    fn test_included_init_parameters() {
        let layout = ClientLayout {
            include_init_parameters: vec!["bearer_token".to_string()],
            ..ClientLayout::default()
        };
        let output = emit_client_module(&spec(Vec::new(), IrInitDefaults::default()), &layout).unwrap();
        assert!(output.contains("        bearer_token: str | None = None,\n"));
        assert!(!output.contains("api_key_name"));
        assert!(output.contains("            url=url,\n            bearer_token=bearer_token,\n        )"));
    }

    #[test]
    fn test_path_query_and_header_arguments() {
        let mut get_pet = operation(
            "get_pet",
            "/pets/{petId}",
            vec![
                parameter("petId", IrParameterLocation::Path, true),
                parameter("X-Request-Id", IrParameterLocation::Header, false),
                parameter("limit", IrParameterLocation::Query, false),
            ],
        );
        get_pet.summary = Some("Find a pet.".to_string());
        get_pet.response_types = vec![IrType::Model("Pet".to_string())];
        let output = emit_client_module(
            &spec(vec![get_pet], IrInitDefaults::default()),
            &ClientLayout::default(),
        )
        .unwrap();

        assert!(output.contains(
            "    def get_pet(\n        self,\n        pet_id: str,\n        x_request_id: str | None = None,\n        limit: str | None = None,\n    ) -> model.Pet:\n"
        ));
        assert!(output.contains("        Find a pet.\n\n        Parameters:\n            - pet_id:\n"));
        assert!(output.contains("        response: sob.abc.Readable = self.request(\n"));
        assert!(output.contains(
            "            \"/pets/{petId}\".format(**{\n                \"petId\": str(oapi.client.format_argument_value(\"petId\", pet_id, style=\"simple\", explode=False)),\n            }),\n"
        ));
        assert!(output.contains("            method=\"GET\",\n"));
        assert!(output.contains(
            "                \"X-Request-Id\": oapi.client.format_argument_value(\"X-Request-Id\", x_request_id, style=\"simple\", explode=False),\n"
        ));
        assert!(output.contains(
            "            query={\n                \"limit\": oapi.client.format_argument_value(\"limit\", limit, style=\"form\", explode=True),\n            },\n"
        ));
        assert!(output.contains(
            "        return sob.unmarshal(  # type: ignore\n            sob.deserialize(response),\n            types=(\n                model.Pet,\n            ),\n        )\n"
        ));
    }

    #[test]
    fn test_cookies_share_one_header() {
        let mut matrix = parameter("id", IrParameterLocation::Path, true);
        matrix.style = ParameterStyle::Matrix;
        let op = operation(
            "delete_item",
            "/items/{id}",
            vec![
                matrix,
                parameter("session", IrParameterLocation::Cookie, true),
                parameter("theme", IrParameterLocation::Cookie, false),
            ],
        );
        let output = emit_client_module(
            &spec(vec![op], IrInitDefaults::default()),
            &ClientLayout::default(),
        )
        .unwrap();
        assert!(output.contains("    ) -> None:\n"));
        assert!(output.contains("        self.request(\n"));
        assert!(output.contains("format_argument_value(\";id\", id, style=\"matrix\", explode=False)"));
        assert!(output.contains(
            "\"Cookie\": \"; \".join((oapi.client.urlencode({\"session\": oapi.client.format_argument_value(\"session\", session, style=\"form\", explode=True)}), oapi.client.urlencode({\"theme\": oapi.client.format_argument_value(\"theme\", theme, style=\"form\", explode=True)}),)),"
        ));
        assert!(!output.contains("return sob.unmarshal"));
    }

    #[test]
    fn test_multipart_form_and_raw_body() {
        let mut upload = operation(
            "post_upload",
            "/upload",
            vec![
                IrParameter {
                    content_type: Some("image/png".to_string()),
                    param_type: IrType::primitive(PrimitiveKind::Bytes, None),
                    ..parameter("file", IrParameterLocation::FormData, true)
                },
            ],
        );
        upload.method = HttpMethod::Post;
        upload.multipart = true;
        let mut raw = operation(
            "put_blob",
            "/blob",
            vec![IrParameter {
                argument_name: "data_".to_string(),
                content_type: Some("application/octet-stream".to_string()),
                param_type: IrType::primitive(PrimitiveKind::Bytes, None),
                ..parameter("data_", IrParameterLocation::Body, true)
            }],
        );
        raw.method = HttpMethod::Put;
        let output = emit_client_module(
            &spec(vec![upload, raw], IrInitDefaults::default()),
            &ClientLayout::default(),
        )
        .unwrap();

        assert!(output.contains("        file: typing.IO[bytes] | bytes,\n"));
        assert!(output.contains(
            "                \"file\": oapi.client.format_argument_value(\"file\", file, style=\"form\", explode=True, multipart=True),\n"
        ));
        assert!(output.contains(
            "            multipart_data_headers={\n                \"file\": {\"Content-Type\": \"image/png\"},\n            },\n"
        ));
        assert!(output.contains("            multipart=True,\n"));
        assert!(output.contains("                \"Content-Type\": \"application/octet-stream\",\n"));
        assert!(output.contains("            json=data_,\n"));
    }

    #[test]
    fn test_variadic_tail_reads_keywords() {
        let mut op = operation(
            "get_search",
            "/search",
            vec![
                parameter("q", IrParameterLocation::Query, true),
                parameter("page", IrParameterLocation::Query, false),
            ],
        );
        op.variadic_from = Some(1);
        let output = emit_client_module(
            &spec(vec![op], IrInitDefaults::default()),
            &ClientLayout::default(),
        )
        .unwrap();
        assert!(output.contains("        q: str,\n        **kwargs: typing.Any,\n"));
        assert!(output.contains("format_argument_value(\"page\", kwargs.get(\"page\", None), style=\"form\", explode=True)"));
        assert!(output.contains("            - page:\n"));
    }

    #[test]
    fn test_runtime_imports() {
        assert_eq!(runtime_imports("oapi.client.Client"), vec!["oapi.client", "sob"]);
        assert_eq!(
            runtime_imports("acme.clients.Base"),
            vec!["acme.clients", "oapi.client", "sob"]
        );
        assert_eq!(runtime_imports("Base"), vec!["oapi.client", "sob"]);
    }
}
