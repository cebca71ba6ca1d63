//! Decide which semantic shape a resolved schema describes.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::GenerateError;
use crate::ir::{BaseKind, IrType, PrimitiveKind};
use crate::parse::schema::{AdditionalProperties, Schema, SchemaOrRef, SchemaType};
use crate::resolve::{Located, Pointer, Resolver};

/// Formats that only make sense on strings.
const STRING_FORMATS: &[&str] = &["date", "date-time", "byte", "binary"];
/// Formats that only make sense on numbers.
const NUMERIC_FORMATS: &[&str] = &["int32", "int64", "float", "double"];

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Object(ObjectShape),
    /// An open dictionary. No value schemas means unconstrained values.
    Map(MapShape),
    List(ListShape),
    Union(UnionShape),
    Primitive(PrimitiveShape),
    Unclassified,
}

impl Shape {
    /// Objects, and lists or maps with constrained members, produce a named
    /// type.
    pub fn is_model(&self) -> bool {
        match self {
            Shape::Object(_) => true,
            Shape::Map(map) => !map.value_schemas.is_empty(),
            Shape::List(list) => !list.item_schemas.is_empty(),
            Shape::Union(union) => union.base.as_deref().is_some_and(Shape::is_model),
            Shape::Primitive(_) | Shape::Unclassified => false,
        }
    }

    pub fn base_kind(&self) -> Option<BaseKind> {
        match self {
            Shape::Object(_) => Some(BaseKind::Object),
            Shape::Map(_) => Some(BaseKind::Map),
            Shape::List(_) => Some(BaseKind::List),
            Shape::Union(union) => union.base.as_deref().and_then(Shape::base_kind),
            Shape::Primitive(_) | Shape::Unclassified => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectShape {
    pub properties: IndexMap<String, Located<Schema>>,
    pub required: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapShape {
    pub value_schemas: Vec<Located<Schema>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListShape {
    pub item_schemas: Vec<Located<Schema>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionShape {
    /// The shape described by the schema's own `type` or properties, which
    /// the variants extend.
    pub base: Option<Box<Shape>>,
    pub variants: Vec<Located<Schema>>,
    pub discriminator: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveShape {
    /// One entry per declared type; several for `type: [string, null]`.
    pub kinds: Vec<IrType>,
    pub enum_values: Vec<Value>,
}

/// Classify a resolved schema.
pub fn classify(resolver: &mut Resolver, schema: &Located<Schema>) -> Result<Shape, GenerateError> {
    let mut seen = HashSet::new();
    classify_inner(resolver, schema, &mut seen)
}

fn classify_inner(
    resolver: &mut Resolver,
    schema: &Located<Schema>,
    seen: &mut HashSet<Pointer>,
) -> Result<Shape, GenerateError> {
    let types = schema_types(schema)?;
    check_format(schema, &types)?;
    let node = &schema.node;
    let structural: Vec<SchemaType> = types
        .iter()
        .copied()
        .filter(|t| *t != SchemaType::Null)
        .collect();

    seen.insert(schema.pointer.clone());
    let variants = if has_variants(node) {
        flatten_variants(resolver, schema, seen)?
    } else {
        Vec::new()
    };

    let is_list = structural.contains(&SchemaType::Array) || node.items.is_some();
    let is_object = structural.contains(&SchemaType::Object)
        || (structural.is_empty()
            && (!node.properties.is_empty()
                || node.allows_additional_properties()
                || node.all_of.len() > 1));

    let base = if is_list {
        let mut item_schemas = Vec::new();
        if let Some(items) = &node.items {
            item_schemas.push(deref_schema(resolver, items, &schema.pointer.child("items"))?);
        }
        for variant in &variants {
            if let Some(items) = &variant.node.items {
                item_schemas.push(deref_schema(resolver, items, &variant.pointer.child("items"))?);
            }
        }
        return Ok(Shape::List(ListShape { item_schemas }));
    } else if is_object {
        let merged = merge_object(resolver, schema)?;
        if merged.open || !merged.additional.is_empty() {
            let mut value_schemas: Vec<Located<Schema>> = merged.properties.into_values().collect();
            value_schemas.extend(merged.additional);
            Some(Shape::Map(MapShape { value_schemas }))
        } else if !merged.properties.is_empty() {
            Some(Shape::Object(ObjectShape {
                properties: merged.properties,
                required: merged.required,
            }))
        } else if !variants.is_empty() {
            None
        } else if node.all_of.len() > 1 {
            first_member_shape(resolver, schema, seen)?
        } else {
            Some(Shape::Map(MapShape {
                value_schemas: Vec::new(),
            }))
        }
    } else if !structural.is_empty() || !types.is_empty() {
        Some(Shape::Primitive(PrimitiveShape {
            kinds: types.iter().map(|t| primitive_type(*t, node)).collect(),
            enum_values: node.enum_values.clone(),
        }))
    } else if node.content_media_type.is_some() || node.content_encoding.is_some() {
        Some(Shape::Primitive(PrimitiveShape {
            kinds: vec![IrType::primitive(PrimitiveKind::Bytes, node.format.as_deref())],
            enum_values: node.enum_values.clone(),
        }))
    } else if !node.enum_values.is_empty() {
        Some(Shape::Primitive(PrimitiveShape {
            kinds: literal_kinds(&node.enum_values),
            enum_values: node.enum_values.clone(),
        }))
    } else {
        None
    };

    match (base, variants.len()) {
        (base, 0) => Ok(base.unwrap_or(Shape::Unclassified)),
        (None, 1) => classify_inner(resolver, &variants[0], seen),
        (base, _) => Ok(Shape::Union(UnionShape {
            base: base.map(Box::new),
            variants,
            discriminator: node
                .discriminator
                .as_ref()
                .map(|discriminator| discriminator.property_name().to_string()),
        })),
    }
}

/// Parse the `type` keyword, rejecting unknown values.
pub fn schema_types(schema: &Located<Schema>) -> Result<Vec<SchemaType>, GenerateError> {
    schema
        .node
        .type_names()
        .into_iter()
        .map(|name| {
            SchemaType::parse(name).ok_or_else(|| GenerateError::UnknownSchemaType {
                pointer: schema.pointer.to_string(),
                schema_type: name.to_string(),
            })
        })
        .collect()
}

fn check_format(schema: &Located<Schema>, types: &[SchemaType]) -> Result<(), GenerateError> {
    let Some(format) = schema.node.format.as_deref() else {
        return Ok(());
    };
    for schema_type in types {
        let incompatible = (STRING_FORMATS.contains(&format)
            && matches!(
                schema_type,
                SchemaType::Integer
                    | SchemaType::Number
                    | SchemaType::Boolean
                    | SchemaType::Array
                    | SchemaType::Object
            ))
            || (NUMERIC_FORMATS.contains(&format)
                && matches!(
                    schema_type,
                    SchemaType::Boolean | SchemaType::Array | SchemaType::Object
                ));
        if incompatible {
            return Err(GenerateError::validation(
                &schema.pointer,
                format!("format `{format}` cannot apply to type `{}`", type_label(*schema_type)),
            ));
        }
    }
    Ok(())
}

fn type_label(schema_type: SchemaType) -> &'static str {
    match schema_type {
        SchemaType::String => "string",
        SchemaType::Number => "number",
        SchemaType::Integer => "integer",
        SchemaType::Boolean => "boolean",
        SchemaType::Array => "array",
        SchemaType::Object => "object",
        SchemaType::Null => "null",
        SchemaType::File => "file",
    }
}

/// Map a declared type (with the schema's format and encoding) to a
/// primitive type expression.
pub fn primitive_type(schema_type: SchemaType, schema: &Schema) -> IrType {
    let format = schema.format.as_deref();
    let kind = match schema_type {
        SchemaType::Integer => PrimitiveKind::Integer,
        SchemaType::Number => PrimitiveKind::Number,
        SchemaType::Boolean => PrimitiveKind::Boolean,
        SchemaType::File => PrimitiveKind::Bytes,
        SchemaType::Null => return IrType::Null,
        SchemaType::Array => return IrType::Generic(BaseKind::List),
        SchemaType::Object => return IrType::Generic(BaseKind::Map),
        SchemaType::String => match format {
            Some("date") => PrimitiveKind::Date,
            Some("date-time") => PrimitiveKind::DateTime,
            Some("byte" | "binary" | "base64") => PrimitiveKind::Bytes,
            _ if schema.content_encoding.is_some() => PrimitiveKind::Bytes,
            _ => PrimitiveKind::String,
        },
    };
    IrType::primitive(kind, format)
}

/// Infer primitive kinds from enumerated literals when no type is declared.
fn literal_kinds(values: &[Value]) -> Vec<IrType> {
    let mut kinds = Vec::new();
    for value in values {
        let kind = match value {
            Value::String(_) => IrType::primitive(PrimitiveKind::String, None),
            Value::Bool(_) => IrType::primitive(PrimitiveKind::Boolean, None),
            Value::Number(number) if number.is_i64() || number.is_u64() => {
                IrType::primitive(PrimitiveKind::Integer, None)
            }
            Value::Number(_) => IrType::primitive(PrimitiveKind::Number, None),
            Value::Null => IrType::Null,
            Value::Array(_) | Value::Object(_) => IrType::Any,
        };
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    kinds
}

/// A single-member `allOf` is a variant only on a schema without its own
/// properties; otherwise it is merged like any other `allOf`.
fn has_variants(schema: &Schema) -> bool {
    !schema.any_of.is_empty()
        || !schema.one_of.is_empty()
        || (schema.all_of.len() == 1 && schema.properties.is_empty())
}

/// A schema with no shape of its own beyond its `anyOf` / `oneOf` /
/// single-member `allOf`.
pub fn is_pure_union(schema: &Schema) -> bool {
    has_variants(schema)
        && schema.schema_type.is_none()
        && schema.properties.is_empty()
        && schema.items.is_none()
        && schema.additional_properties.is_none()
}

/// The one schema a pure wrapper such as `allOf: [$ref]` or `anyOf: [X]`
/// stands for. Wrappers carrying their own `enum` are not pure.
pub fn sole_variant(resolver: &mut Resolver, schema: &Located<Schema>) -> Result<Option<Located<Schema>>, GenerateError> {
    if !is_pure_union(&schema.node) || !schema.node.enum_values.is_empty() {
        return Ok(None);
    }
    let mut seen = HashSet::from([schema.pointer.clone()]);
    let mut variants = flatten_variants(resolver, schema, &mut seen)?;
    Ok(if variants.len() == 1 { variants.pop() } else { None })
}

/// The variant schemas of a union, with nested pure unions expanded.
fn flatten_variants(
    resolver: &mut Resolver,
    schema: &Located<Schema>,
    seen: &mut HashSet<Pointer>,
) -> Result<Vec<Located<Schema>>, GenerateError> {
    let node = &schema.node;
    let mut members: Vec<(&SchemaOrRef, Pointer)> = Vec::new();
    for (keyword, list) in [("anyOf", &node.any_of), ("oneOf", &node.one_of)] {
        for (index, member) in list.iter().enumerate() {
            members.push((member, schema.pointer.child(keyword).index(index)));
        }
    }
    if node.all_of.len() == 1 && node.properties.is_empty() {
        members.push((&node.all_of[0], schema.pointer.child("allOf").index(0)));
    }

    let mut variants: Vec<Located<Schema>> = Vec::new();
    for (member, at) in members {
        let member = deref_schema(resolver, member, &at)?;
        if is_pure_union(&member.node) {
            if seen.insert(member.pointer.clone()) {
                variants.extend(flatten_variants(resolver, &member, seen)?);
            }
        } else if !variants.iter().any(|variant| variant.pointer == member.pointer) {
            variants.push(member);
        }
    }
    Ok(variants)
}

struct MergedObject {
    properties: IndexMap<String, Located<Schema>>,
    required: Vec<String>,
    additional: Vec<Located<Schema>>,
    open: bool,
}

/// Merge the schema's own properties with those of every `allOf` member.
/// Later members shadow earlier ones; `required` is the union.
fn merge_object(resolver: &mut Resolver, schema: &Located<Schema>) -> Result<MergedObject, GenerateError> {
    let mut merged = MergedObject {
        properties: IndexMap::new(),
        required: Vec::new(),
        additional: Vec::new(),
        open: false,
    };
    let mut visited = HashSet::new();
    merge_into(resolver, schema, &mut merged, &mut visited)?;
    Ok(merged)
}

fn merge_into(
    resolver: &mut Resolver,
    schema: &Located<Schema>,
    merged: &mut MergedObject,
    visited: &mut HashSet<Pointer>,
) -> Result<(), GenerateError> {
    if !visited.insert(schema.pointer.clone()) {
        return Ok(());
    }
    let node = &schema.node;
    let properties_pointer = schema.pointer.child("properties");
    for (name, property) in &node.properties {
        let property = deref_schema(resolver, property, &properties_pointer.child(name))?;
        merged.properties.insert(name.clone(), property);
    }
    for name in &node.required {
        if !merged.required.contains(name) {
            merged.required.push(name.clone());
        }
    }
    match &node.additional_properties {
        Some(AdditionalProperties::Schema(additional)) => {
            let additional = deref_schema(
                resolver,
                additional,
                &schema.pointer.child("additionalProperties"),
            )?;
            merged.additional.push(additional);
        }
        Some(AdditionalProperties::Bool(true)) => merged.open = true,
        _ => {}
    }
    if node.all_of.len() > 1 || !node.properties.is_empty() {
        for (index, member) in node.all_of.iter().enumerate() {
            let member = deref_schema(resolver, member, &schema.pointer.child("allOf").index(index))?;
            merge_into(resolver, &member, merged, visited)?;
        }
    }
    Ok(())
}

/// For an `allOf` of property-less members, the first member that has a
/// shape of its own.
fn first_member_shape(
    resolver: &mut Resolver,
    schema: &Located<Schema>,
    seen: &mut HashSet<Pointer>,
) -> Result<Option<Shape>, GenerateError> {
    for (index, member) in schema.node.all_of.iter().enumerate() {
        let member = deref_schema(resolver, member, &schema.pointer.child("allOf").index(index))?;
        if !seen.insert(member.pointer.clone()) {
            continue;
        }
        let shape = classify_inner(resolver, &member, seen)?;
        if shape != Shape::Unclassified {
            return Ok(Some(shape));
        }
    }
    Ok(None)
}

pub(crate) fn deref_schema(
    resolver: &mut Resolver,
    schema: &SchemaOrRef,
    at: &Pointer,
) -> Result<Located<Schema>, GenerateError> {
    Ok(resolver.deref(schema, at)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn classify_at(document: Value, pointer: &str) -> Shape {
        let mut resolver = Resolver::new(document, None);
        let schema = resolver
            .fetch_as::<Schema>(&Pointer::parse(pointer))
            .unwrap();
        classify(&mut resolver, &schema).unwrap()
    }

    fn schemas(schemas: Value) -> Value {
        json!({"openapi": "3.0.3", "components": {"schemas": schemas}})
    }

    #[test]
    fn object_with_properties() {
        let shape = classify_at(
            schemas(json!({"Point": {
                "type": "object",
                "properties": {"x": {"type": "integer"}},
                "required": ["x"]
            }})),
            "#/components/schemas/Point",
        );
        match shape {
            Shape::Object(object) => {
                assert_eq!(object.properties.len(), 1);
                assert_eq!(object.required, vec!["x".to_string()]);
            }
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn properties_with_additional_properties_is_a_map() {
        let shape = classify_at(
            schemas(json!({"Labels": {
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "additionalProperties": {"type": "integer"}
            }})),
            "#/components/schemas/Labels",
        );
        match shape {
            Shape::Map(map) => assert_eq!(map.value_schemas.len(), 2),
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn bare_object_is_an_open_map() {
        let shape = classify_at(
            schemas(json!({"Anything": {"type": "object"}})),
            "#/components/schemas/Anything",
        );
        assert_eq!(
            shape,
            Shape::Map(MapShape {
                value_schemas: Vec::new()
            })
        );
    }

    #[test]
    fn items_without_type_is_a_list() {
        let shape = classify_at(
            schemas(json!({"Points": {"items": {"$ref": "#/components/schemas/Point"}},
                           "Point": {"type": "object", "properties": {"x": {"type": "integer"}}}})),
            "#/components/schemas/Points",
        );
        match shape {
            Shape::List(list) => {
                assert_eq!(list.item_schemas.len(), 1);
                assert_eq!(
                    list.item_schemas[0].pointer,
                    Pointer::parse("#/components/schemas/Point")
                );
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn single_member_all_of_collapses() {
        let document = schemas(json!({
            "Point": {"type": "object", "properties": {"x": {"type": "integer"}}},
            "Alias": {"allOf": [{"$ref": "#/components/schemas/Point"}]}
        }));
        let alias = classify_at(document.clone(), "#/components/schemas/Alias");
        let point = classify_at(document, "#/components/schemas/Point");
        assert_eq!(alias, point);
    }

    #[test]
    fn multi_member_all_of_merges_properties() {
        let shape = classify_at(
            schemas(json!({
                "Base": {"type": "object", "properties": {"id": {"type": "integer"}, "name": {"type": "string"}}, "required": ["id"]},
                "Named": {"allOf": [
                    {"$ref": "#/components/schemas/Base"},
                    {"properties": {"name": {"type": "integer"}}, "required": ["name"]}
                ]}
            })),
            "#/components/schemas/Named",
        );
        match shape {
            Shape::Object(object) => {
                let names: Vec<&String> = object.properties.keys().collect();
                assert_eq!(names, vec!["id", "name"]);
                assert!(object.properties["name"].node.has_type("integer"));
                assert_eq!(object.required, vec!["id".to_string(), "name".to_string()]);
            }
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn one_of_without_base_is_a_union() {
        let shape = classify_at(
            schemas(json!({"Id": {"oneOf": [{"type": "string"}, {"type": "integer"}], "nullable": true}})),
            "#/components/schemas/Id",
        );
        match shape {
            Shape::Union(union) => {
                assert!(union.base.is_none());
                assert_eq!(union.variants.len(), 2);
            }
            other => panic!("expected union, got {other:?}"),
        }
    }

    #[test]
    fn nested_pure_unions_are_flattened() {
        let shape = classify_at(
            schemas(json!({
                "Cat": {"type": "object", "properties": {"meow": {"type": "boolean"}}},
                "Dog": {"type": "object", "properties": {"bark": {"type": "boolean"}}},
                "Fish": {"type": "object", "properties": {"fins": {"type": "integer"}}},
                "Mammal": {"oneOf": [{"$ref": "#/components/schemas/Cat"}, {"$ref": "#/components/schemas/Dog"}]},
                "Pet": {
                    "anyOf": [{"$ref": "#/components/schemas/Mammal"}, {"$ref": "#/components/schemas/Fish"}],
                    "discriminator": {"propertyName": "kind"}
                }
            })),
            "#/components/schemas/Pet",
        );
        match shape {
            Shape::Union(union) => {
                let pointers: Vec<String> =
                    union.variants.iter().map(|v| v.pointer.to_string()).collect();
                assert_eq!(
                    pointers,
                    vec![
                        "#/components/schemas/Cat",
                        "#/components/schemas/Dog",
                        "#/components/schemas/Fish"
                    ]
                );
                assert_eq!(union.discriminator.as_deref(), Some("kind"));
            }
            other => panic!("expected union, got {other:?}"),
        }
    }

    #[test]
    fn typed_union_keeps_its_base() {
        let shape = classify_at(
            schemas(json!({"Value": {"type": "string", "anyOf": [{"type": "integer"}, {"type": "boolean"}]}})),
            "#/components/schemas/Value",
        );
        match shape {
            Shape::Union(union) => {
                assert!(matches!(union.base.as_deref(), Some(Shape::Primitive(_))));
                assert_eq!(union.variants.len(), 2);
            }
            other => panic!("expected union, got {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_an_error() {
        let mut resolver = Resolver::new(schemas(json!({"Bad": {"type": "text"}})), None);
        let schema = resolver
            .fetch_as::<Schema>(&Pointer::parse("#/components/schemas/Bad"))
            .unwrap();
        let error = classify(&mut resolver, &schema).unwrap_err();
        assert!(matches!(error, GenerateError::UnknownSchemaType { .. }));
    }

    #[test]
    fn incompatible_format_is_an_error() {
        let mut resolver = Resolver::new(
            schemas(json!({"Bad": {"type": "integer", "format": "date-time"}})),
            None,
        );
        let schema = resolver
            .fetch_as::<Schema>(&Pointer::parse("#/components/schemas/Bad"))
            .unwrap();
        let error = classify(&mut resolver, &schema).unwrap_err();
        assert!(matches!(error, GenerateError::SchemaValidation { .. }));
    }

    #[test]
    fn primitive_mapping() {
        let string = |format: &str| Schema {
            format: Some(format.to_string()),
            ..Schema::default()
        };
        assert_eq!(
            primitive_type(SchemaType::String, &string("date-time")),
            IrType::primitive(PrimitiveKind::DateTime, Some("date-time"))
        );
        assert_eq!(
            primitive_type(SchemaType::String, &string("binary")),
            IrType::primitive(PrimitiveKind::Bytes, Some("binary"))
        );
        assert_eq!(
            primitive_type(SchemaType::File, &Schema::default()),
            IrType::primitive(PrimitiveKind::Bytes, None)
        );
    }

    #[test]
    fn untyped_enum_infers_kinds() {
        let shape = classify_at(
            schemas(json!({"Level": {"enum": ["low", "high", 3]}})),
            "#/components/schemas/Level",
        );
        match shape {
            Shape::Primitive(primitive) => {
                assert_eq!(primitive.kinds.len(), 2);
                assert_eq!(primitive.enum_values.len(), 3);
            }
            other => panic!("expected primitive, got {other:?}"),
        }
    }

    #[test]
    fn empty_schema_is_unclassified() {
        let shape = classify_at(schemas(json!({"Any": {}})), "#/components/schemas/Any");
        assert_eq!(shape, Shape::Unclassified);
    }
}
