//! Walk every schema reachable from the root document, in a fixed order, so
//! each model-defining schema gets its type description.

use std::collections::HashSet;

use crate::error::GenerateError;
use crate::parse::media_type::MediaType;
use crate::parse::operation::PathItem;
use crate::parse::parameter::ParameterOrRef;
use crate::parse::request_body::RequestBodyOrRef;
use crate::parse::response::ResponseOrRef;
use crate::parse::schema::{AdditionalProperties, Schema, SchemaOrRef};
use crate::parse::spec::OpenApi;
use crate::resolve::{Located, Pointer, Resolver};

use super::type_builder::TypeBuilder;

pub struct Traversal<'a> {
    resolver: &'a mut Resolver,
    builder: &'a mut TypeBuilder,
    visited: HashSet<Pointer>,
}

impl<'a> Traversal<'a> {
    pub fn new(resolver: &'a mut Resolver, builder: &'a mut TypeBuilder) -> Self {
        Self {
            resolver,
            builder,
            visited: HashSet::new(),
        }
    }

    /// Visit component schemas, then reusable parameters, request bodies and
    /// responses, then every path.
    pub fn run(&mut self, document: &OpenApi) -> Result<(), GenerateError> {
        let root = Pointer::root();

        if let Some(components) = &document.components {
            let at = root.child("components");
            for (name, schema) in &components.schemas {
                self.schema(schema, &at.child("schemas").child(name))?;
            }
            for (name, parameter) in &components.parameters {
                self.parameter(parameter, &at.child("parameters").child(name))?;
            }
            for (name, request_body) in &components.request_bodies {
                self.request_body(request_body, &at.child("requestBodies").child(name))?;
            }
            for (name, response) in &components.responses {
                self.response(response, &at.child("responses").child(name))?;
            }
        }
        for (name, schema) in &document.definitions {
            self.schema(schema, &root.child("definitions").child(name))?;
        }
        for (name, parameter) in &document.parameters {
            self.parameter(parameter, &root.child("parameters").child(name))?;
        }
        for (name, response) in &document.responses {
            self.response(response, &root.child("responses").child(name))?;
        }

        for (path, path_item) in &document.paths {
            self.path_item(path_item, &root.child("paths").child(path))?;
        }
        Ok(())
    }

    fn path_item(&mut self, path_item: &PathItem, at: &Pointer) -> Result<(), GenerateError> {
        let resolved = match &path_item.ref_path {
            Some(reference) => self.resolver.resolve::<PathItem>(reference, at)?,
            None => Located::new(at.clone(), path_item.clone()),
        };
        let item = &resolved.node;
        let at = &resolved.pointer;
        for (index, parameter) in item.parameters.iter().enumerate() {
            self.parameter(parameter, &at.child("parameters").index(index))?;
        }
        for (method, operation) in item.operations() {
            let at = at.child(method);
            for (index, parameter) in operation.parameters.iter().enumerate() {
                self.parameter(parameter, &at.child("parameters").index(index))?;
            }
            if let Some(request_body) = &operation.request_body {
                self.request_body(request_body, &at.child("requestBody"))?;
            }
            for (code, response) in &operation.responses {
                self.response(response, &at.child("responses").child(code))?;
            }
        }
        Ok(())
    }

    fn parameter(&mut self, parameter: &ParameterOrRef, at: &Pointer) -> Result<(), GenerateError> {
        let parameter = self.resolver.deref(parameter, at)?;
        if let Some(schema) = &parameter.node.schema {
            return self.schema(schema, &parameter.pointer.child("schema"));
        }
        if !parameter.node.content.is_empty() {
            return self.content(&parameter.node.content, &parameter.pointer.child("content"));
        }
        // A Swagger 2.0 non-body parameter is a schema in its own right.
        if let Some(schema) = parameter.node.inline_schema() {
            self.located(&Located::new(parameter.pointer.clone(), schema))?;
        }
        Ok(())
    }

    fn request_body(&mut self, request_body: &RequestBodyOrRef, at: &Pointer) -> Result<(), GenerateError> {
        let request_body = self.resolver.deref(request_body, at)?;
        self.content(&request_body.node.content, &request_body.pointer.child("content"))
    }

    fn response(&mut self, response: &ResponseOrRef, at: &Pointer) -> Result<(), GenerateError> {
        let response = self.resolver.deref(response, at)?;
        if let Some(schema) = &response.node.schema {
            self.schema(schema, &response.pointer.child("schema"))?;
        }
        self.content(&response.node.content, &response.pointer.child("content"))
    }

    fn content(
        &mut self,
        content: &indexmap::IndexMap<String, MediaType>,
        at: &Pointer,
    ) -> Result<(), GenerateError> {
        for (media_type_name, media_type) in content {
            if let Some(schema) = &media_type.schema {
                self.schema(schema, &at.child(media_type_name).child("schema"))?;
            }
        }
        Ok(())
    }

    fn schema(&mut self, schema: &SchemaOrRef, at: &Pointer) -> Result<(), GenerateError> {
        let schema = self.resolver.deref(schema, at)?;
        self.located(&schema)
    }

    fn located(&mut self, schema: &Located<Schema>) -> Result<(), GenerateError> {
        if !self.visited.insert(schema.pointer.clone()) {
            return Ok(());
        }
        self.builder.type_of(self.resolver, schema)?;

        let node = &schema.node;
        let at = &schema.pointer;
        for (name, property) in &node.properties {
            self.schema(property, &at.child("properties").child(name))?;
        }
        if let Some(items) = &node.items {
            self.schema(items, &at.child("items"))?;
        }
        if let Some(AdditionalProperties::Schema(additional)) = &node.additional_properties {
            self.schema(additional, &at.child("additionalProperties"))?;
        }
        for (keyword, members) in [
            ("anyOf", &node.any_of),
            ("allOf", &node.all_of),
            ("oneOf", &node.one_of),
        ] {
            for (index, member) in members.iter().enumerate() {
                self.schema(member, &at.child(keyword).index(index))?;
            }
        }
        if let Some(not) = &node.not {
            self.schema(not, &at.child("not"))?;
        }
        Ok(())
    }

    pub fn visited(&self) -> usize {
        self.visited.len()
    }
}
