//! Turn each `(path, method)` pair into an [`IrOperation`]: merged and
//! classified parameters, the request body, and the response union.

use std::collections::HashSet;

use log::{debug, warn};

use crate::error::GenerateError;
use crate::ir::{
    HttpMethod, IrOperation, IrParameter, IrParameterLocation, IrType, ParameterStyle, PrimitiveKind,
};
use crate::parse::media_type::{self, MediaType};
use crate::parse::operation::{Operation, PathItem};
use crate::parse::parameter::{Parameter, ParameterLocation, ParameterOrRef};
use crate::parse::request_body::RequestBodyOrRef;
use crate::parse::spec::OpenApi;
use crate::resolve::{Located, Pointer, Resolver};

use super::classifier::{Shape, classify};
use super::name_normalizer::{property_name, unique_name};
use super::type_builder::TypeBuilder;

/// Maps `(path, method, operationId)` to a method name.
pub type MethodNameHook = Box<dyn Fn(&str, &str, Option<&str>) -> String>;

/// Python allows 255 arguments; `self` takes one.
pub const MAX_ARGUMENTS: usize = 254;

/// Headers the client runtime sets itself.
const EXCLUDED_HEADERS: &[&str] = &["accept", "content-type", "authorization"];

/// Arguments contributed by a request body.
#[derive(Default)]
struct BodyArguments {
    parameters: Vec<IrParameter>,
    required: bool,
    multipart: bool,
}

pub struct OperationAnalyzer<'a> {
    resolver: &'a mut Resolver,
    builder: &'a mut TypeBuilder,
    api_key: Option<(String, IrParameterLocation)>,
    use_operation_id: bool,
    method_name_hook: Option<&'a MethodNameHook>,
    method_names: HashSet<String>,
}

impl<'a> OperationAnalyzer<'a> {
    pub fn new(
        resolver: &'a mut Resolver,
        builder: &'a mut TypeBuilder,
        api_key: Option<(String, IrParameterLocation)>,
    ) -> Self {
        Self {
            resolver,
            builder,
            api_key,
            use_operation_id: false,
            method_name_hook: None,
            method_names: HashSet::new(),
        }
    }

    pub fn use_operation_id(mut self, use_operation_id: bool) -> Self {
        self.use_operation_id = use_operation_id;
        self
    }

    pub fn method_name_hook(mut self, hook: Option<&'a MethodNameHook>) -> Self {
        self.method_name_hook = hook;
        self
    }

    /// Analyze every operation, in path order then method order.
    pub fn run(&mut self, document: &OpenApi) -> Result<Vec<IrOperation>, GenerateError> {
        let mut operations = Vec::new();
        let paths = Pointer::root().child("paths");
        for (path, path_item) in &document.paths {
            let at = paths.child(path);
            let item = match &path_item.ref_path {
                Some(reference) => self.resolver.resolve::<PathItem>(reference, &at)?,
                None => Located::new(at, path_item.clone()),
            };
            for (method, operation) in item.node.operations() {
                let at = item.pointer.child(method);
                let context = OperationContext {
                    document,
                    path,
                    method,
                    path_parameters: &item.node.parameters,
                    path_at: &item.pointer,
                };
                operations.push(self.operation(&context, operation, &at)?);
            }
        }
        Ok(operations)
    }

    fn operation(
        &mut self,
        context: &OperationContext<'_>,
        operation: &Operation,
        at: &Pointer,
    ) -> Result<IrOperation, GenerateError> {
        let method = HttpMethod::from_key(context.method)
            .ok_or_else(|| GenerateError::validation(at, "unknown HTTP method"))?;
        let method_name = self.method_name(context.path, context.method, operation);
        debug!("{} {} -> {method_name}", method.as_str(), context.path);

        let declared = self.merged_parameters(context, operation, at)?;
        let mut taken: Vec<String> = Vec::new();
        let mut parameters = Vec::new();
        let mut body = BodyArguments::default();
        let mut has_file = false;
        for parameter in &declared {
            if self.is_excluded(&parameter.node) {
                debug!("{method_name}: `{}` is supplied by the runtime", parameter.node.name);
                continue;
            }
            has_file |= parameter.node.location == ParameterLocation::FormData
                && parameter
                    .node
                    .inline_schema()
                    .is_some_and(|schema| schema.has_type("file"));
            let mut binding = self.binding(parameter)?;
            binding.argument_name = unique_name(binding.argument_name, |name| {
                taken.iter().any(|other| other == name)
            });
            taken.push(binding.argument_name.clone());
            if binding.location == IrParameterLocation::Body {
                body.required = binding.required;
                body.parameters.push(binding);
            } else {
                parameters.push(binding);
            }
        }

        if self.builder.version().is_swagger() {
            let consumes = if operation.consumes.is_empty() {
                &context.document.consumes
            } else {
                &operation.consumes
            };
            body.multipart = has_file || consumes.iter().any(|name| media_type::is_multipart(name));
        } else if let Some(request_body) = &operation.request_body {
            body = self.request_body(request_body, &at.child("requestBody"), &mut taken)?;
        }

        let mut arguments = Vec::new();
        if body.required {
            arguments.append(&mut body.parameters);
        }
        arguments.extend(parameters);
        arguments.sort_by_key(|argument| !argument.required);
        arguments.append(&mut body.parameters);

        // Only optional arguments move into the keyword tail.
        let variadic_from = if arguments.len() > MAX_ARGUMENTS {
            arguments.iter().position(|argument| !argument.required)
        } else {
            None
        };

        Ok(IrOperation {
            method_name,
            method,
            path: context.path.to_string(),
            summary: operation.summary.clone(),
            description: operation.description.clone(),
            parameters: arguments,
            multipart: body.multipart,
            response_types: self.response_types(operation, at)?,
            variadic_from,
            deprecated: operation.deprecated.unwrap_or(false),
        })
    }

    /// Path-level parameters, overridden by operation parameters sharing
    /// their `(name, in)`.
    fn merged_parameters(
        &mut self,
        context: &OperationContext<'_>,
        operation: &Operation,
        at: &Pointer,
    ) -> Result<Vec<Located<Parameter>>, GenerateError> {
        let mut merged: Vec<Located<Parameter>> = Vec::new();
        for (index, parameter) in context.path_parameters.iter().enumerate() {
            let at = context.path_at.child("parameters").index(index);
            merged.push(self.resolver.deref(parameter, &at)?);
        }
        for (index, parameter) in operation.parameters.iter().enumerate() {
            let parameter = self
                .resolver
                .deref(parameter, &at.child("parameters").index(index))?;
            let existing = merged.iter().position(|other| {
                other.node.name == parameter.node.name && other.node.location == parameter.node.location
            });
            match existing {
                Some(index) => merged[index] = parameter,
                None => merged.push(parameter),
            }
        }
        Ok(merged)
    }

    fn is_excluded(&self, parameter: &Parameter) -> bool {
        let location = location_of(parameter.location);
        if location == IrParameterLocation::Header
            && EXCLUDED_HEADERS
                .iter()
                .any(|header| parameter.name.eq_ignore_ascii_case(header))
        {
            return true;
        }
        self.api_key.as_ref().is_some_and(|(name, api_key_location)| {
            *api_key_location == location && parameter.name.eq_ignore_ascii_case(name)
        })
    }

    fn binding(&mut self, parameter: &Located<Parameter>) -> Result<IrParameter, GenerateError> {
        let node = &parameter.node;
        let location = location_of(node.location);
        let (param_type, content_type) = self.parameter_type(parameter)?;
        let (style, explode) = self.serialization(node, location);
        Ok(IrParameter {
            argument_name: property_name(&node.name),
            wire_name: node.name.clone(),
            location,
            style,
            explode,
            content_type,
            required: node.required,
            param_type,
            description: node.description.clone(),
            headers: Vec::new(),
        })
    }

    fn parameter_type(
        &mut self,
        parameter: &Located<Parameter>,
    ) -> Result<(IrType, Option<String>), GenerateError> {
        let node = &parameter.node;
        let at = &parameter.pointer;
        if node.schema.is_some() && !node.content.is_empty() {
            return Err(GenerateError::validation(
                at,
                "a parameter cannot declare both `schema` and `content`",
            ));
        }
        if let Some(schema) = &node.schema {
            let param_type = self.builder.type_of_ref(self.resolver, schema, &at.child("schema"))?;
            return Ok((param_type, None));
        }
        if let Some((media_type_name, media_type)) = node.content.first() {
            if node.content.len() > 1 {
                return Err(GenerateError::validation(
                    at,
                    "a parameter `content` map must hold exactly one media type",
                ));
            }
            let param_type = match &media_type.schema {
                Some(schema) => self.builder.type_of_ref(
                    self.resolver,
                    schema,
                    &at.child("content").child(media_type_name).child("schema"),
                )?,
                None => IrType::Any,
            };
            return Ok((param_type, Some(media_type_name.clone())));
        }
        if let Some(schema) = node.inline_schema() {
            let param_type = self
                .builder
                .type_of(self.resolver, &Located::new(at.clone(), schema))?;
            return Ok((param_type, None));
        }
        Ok((IrType::Any, None))
    }

    fn serialization(&self, parameter: &Parameter, location: IrParameterLocation) -> (ParameterStyle, bool) {
        let (default_style, default_explode) = default_serialization(location);
        if self.builder.version().is_swagger() {
            let is_array = parameter
                .inline_schema()
                .is_some_and(|schema| schema.has_type("array"));
            let collection_format = parameter
                .collection_format
                .as_deref()
                .or(is_array.then_some("csv"));
            return match collection_format {
                Some("ssv") => (ParameterStyle::SpaceDelimited, false),
                Some("pipes") | Some("pipe") => (ParameterStyle::PipeDelimited, false),
                Some("multi") => (ParameterStyle::Form, true),
                Some("tsv") => {
                    warn!(
                        "collectionFormat `tsv` of parameter `{}` has no OpenAPI 3 style, sending it as `csv`",
                        parameter.name
                    );
                    (ParameterStyle::Form, false)
                }
                Some(_) => (ParameterStyle::Form, false),
                None => (default_style, default_explode),
            };
        }
        match parameter.style.as_deref().and_then(ParameterStyle::parse) {
            Some(style) => (style, parameter.explode.unwrap_or(style.default_explode())),
            None => (default_style, parameter.explode.unwrap_or(default_explode)),
        }
    }

    fn request_body(
        &mut self,
        request_body: &RequestBodyOrRef,
        at: &Pointer,
        taken: &mut Vec<String>,
    ) -> Result<BodyArguments, GenerateError> {
        let request_body = self.resolver.deref(request_body, at)?;
        let content = &request_body.node.content;
        let chosen = content
            .iter()
            .find(|(name, _)| media_type::is_json(name))
            .or_else(|| content.iter().find(|(name, _)| media_type::is_form(name)))
            .or_else(|| content.iter().next());
        let Some((media_type_name, media)) = chosen else {
            return Ok(BodyArguments::default());
        };
        let at = request_body.pointer.child("content").child(media_type_name);
        let required = request_body.node.required;
        let description = request_body.node.description.clone();

        if media_type::is_form(media_type_name) {
            let parameters = self.form_parameters(media, &at, required, taken)?;
            return Ok(BodyArguments {
                parameters,
                required,
                multipart: media_type::is_multipart(media_type_name),
            });
        }

        let json = media_type::is_json(media_type_name);
        let param_type = match &media.schema {
            Some(schema) => self.builder.type_of_ref(self.resolver, schema, &at.child("schema"))?,
            None if json => IrType::Any,
            None => IrType::primitive(PrimitiveKind::Bytes, None),
        };
        let argument_name = match (&param_type, json) {
            (IrType::Model(name), true) => property_name(name),
            _ => "data_".to_string(),
        };
        let argument_name = unique_name(argument_name, |name| taken.iter().any(|other| other == name));
        taken.push(argument_name.clone());
        Ok(BodyArguments {
            parameters: vec![IrParameter {
                wire_name: argument_name.clone(),
                argument_name,
                location: IrParameterLocation::Body,
                style: ParameterStyle::Simple,
                explode: false,
                content_type: (!json).then(|| media_type_name.clone()),
                required,
                param_type,
                description,
                headers: Vec::new(),
            }],
            required,
            multipart: false,
        })
    }

    /// One argument per property of a form-encoded body.
    fn form_parameters(
        &mut self,
        media: &MediaType,
        at: &Pointer,
        required: bool,
        taken: &mut Vec<String>,
    ) -> Result<Vec<IrParameter>, GenerateError> {
        let Some(schema) = &media.schema else {
            return Err(GenerateError::validation(at, "a form-encoded body requires a schema"));
        };
        let schema = self.resolver.deref(schema, &at.child("schema"))?;
        let Shape::Object(object) = classify(self.resolver, &schema)? else {
            return Err(GenerateError::validation(
                &schema.pointer,
                "a form-encoded body must be a closed object",
            ));
        };
        if let Some(unknown) = media
            .encoding
            .keys()
            .find(|name| !object.properties.contains_key(*name))
        {
            return Err(GenerateError::validation(
                at.child("encoding").child(unknown),
                format!("encoding names undeclared property `{unknown}`"),
            ));
        }

        let mut parameters = Vec::new();
        for (name, property) in &object.properties {
            let encoding = media.encoding.get(name);
            let mut style = ParameterStyle::Form;
            let mut explode = true;
            let mut headers = Vec::new();
            let mut content_type = property.node.content_media_type.clone();
            if let Some(encoding) = encoding {
                if let Some(declared) = encoding.style.as_deref().and_then(ParameterStyle::parse) {
                    style = declared;
                    explode = declared.default_explode();
                }
                explode = encoding.explode.unwrap_or(explode);
                headers = encoding.headers.keys().cloned().collect();
                content_type = encoding.content_type.clone().or(content_type);
            }
            let argument_name =
                unique_name(property_name(name), |candidate| taken.iter().any(|other| other == candidate));
            taken.push(argument_name.clone());
            parameters.push(IrParameter {
                argument_name,
                wire_name: name.clone(),
                location: IrParameterLocation::FormData,
                style,
                explode,
                content_type,
                required: required && object.required.contains(name),
                param_type: self.builder.type_of(self.resolver, property)?,
                description: property.node.description.clone(),
                headers,
            });
        }
        Ok(parameters)
    }

    /// The deduplicated union of every 2xx response type.
    fn response_types(&mut self, operation: &Operation, at: &Pointer) -> Result<Vec<IrType>, GenerateError> {
        let mut types = Vec::new();
        for (code, response) in &operation.responses {
            if !code.starts_with('2') {
                continue;
            }
            let response = self.resolver.deref(response, &at.child("responses").child(code))?;
            if let Some(schema) = &response.node.schema {
                types.push(self.builder.type_of_ref(
                    self.resolver,
                    schema,
                    &response.pointer.child("schema"),
                )?);
            }
            for (media_type_name, media) in &response.node.content {
                if let Some(schema) = &media.schema {
                    let at = response
                        .pointer
                        .child("content")
                        .child(media_type_name)
                        .child("schema");
                    types.push(self.builder.type_of_ref(self.resolver, schema, &at)?);
                }
            }
        }
        if types.is_empty() {
            return Ok(Vec::new());
        }
        Ok(IrType::union(types).members().to_vec())
    }

    fn method_name(&mut self, path: &str, method: &str, operation: &Operation) -> String {
        let operation_id = operation.operation_id.as_deref();
        let name = match self.method_name_hook {
            Some(hook) => hook(path, method, operation_id),
            None => default_method_name(
                path,
                method,
                operation_id.filter(|_| self.use_operation_id),
            ),
        };
        let unique = unique_name(name.clone(), |candidate| self.method_names.contains(candidate));
        if unique != name {
            warn!("method name `{name}` is already used, renaming {method} {path} to `{unique}`");
        }
        self.method_names.insert(unique.clone());
        unique
    }
}

struct OperationContext<'d> {
    document: &'d OpenApi,
    path: &'d str,
    method: &'static str,
    path_parameters: &'d [ParameterOrRef],
    path_at: &'d Pointer,
}

/// `operationId` in snake case when given, else the method followed by
/// the path segments.
///
/// Examples:
/// - `("/pets/{petId}", "get", None)` → `get_pets_pet_id`
/// - `("/", "get", None)` → `get`
/// - `(_, _, Some("listPets"))` → `list_pets`
pub fn default_method_name(path: &str, method: &str, operation_id: Option<&str>) -> String {
    if let Some(operation_id) = operation_id {
        return property_name(operation_id);
    }
    property_name(&format!("{method} {path}"))
        .trim_end_matches('_')
        .to_string()
}

fn location_of(location: ParameterLocation) -> IrParameterLocation {
    match location {
        ParameterLocation::Query => IrParameterLocation::Query,
        ParameterLocation::Header => IrParameterLocation::Header,
        ParameterLocation::Path => IrParameterLocation::Path,
        ParameterLocation::Cookie => IrParameterLocation::Cookie,
        ParameterLocation::Body => IrParameterLocation::Body,
        ParameterLocation::FormData => IrParameterLocation::FormData,
    }
}

fn default_serialization(location: IrParameterLocation) -> (ParameterStyle, bool) {
    match location {
        IrParameterLocation::Path | IrParameterLocation::Header | IrParameterLocation::Body => {
            (ParameterStyle::Simple, false)
        }
        IrParameterLocation::Query | IrParameterLocation::Cookie | IrParameterLocation::FormData => {
            (ParameterStyle::Form, true)
        }
    }
}
