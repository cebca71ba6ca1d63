//! Build type expressions and type descriptions from resolved schemas.
//!
//! A model's name is reserved (with an empty slot in `models`) before its
//! members are built, so a schema that reaches itself through its fields
//! sees a reference by name instead of recursing.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::error::GenerateError;
use crate::ir::{BaseKind, IrField, IrModel, IrType};
use crate::parse::DocumentVersion;
use crate::parse::schema::{Schema, SchemaOrRef};
use crate::resolve::{Located, Pointer, Resolver};

use super::classifier::{PrimitiveShape, Shape, classify, sole_variant};
use super::name_normalizer::{property_name, unique_name};
use super::names::{NameAllocator, is_named_definition};

pub struct TypeBuilder {
    version: DocumentVersion,
    names: NameAllocator,
    /// Model-defining pointers. `None` while the model is being built.
    models: IndexMap<Pointer, Option<IrModel>>,
    /// Pointers that share an existing model's class.
    aliases: IndexMap<Pointer, String>,
    /// Class name → pointer of the model declaring it.
    declared: HashMap<String, Pointer>,
    types: HashMap<Pointer, IrType>,
    in_progress: HashSet<Pointer>,
}

impl TypeBuilder {
    pub fn new(version: DocumentVersion, names: NameAllocator) -> Self {
        Self {
            version,
            names,
            models: IndexMap::new(),
            aliases: IndexMap::new(),
            declared: HashMap::new(),
            types: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    pub fn version(&self) -> DocumentVersion {
        self.version
    }

    /// The type expression for a `$ref`-or-inline schema found at `at`.
    pub fn type_of_ref(
        &mut self,
        resolver: &mut Resolver,
        schema: &SchemaOrRef,
        at: &Pointer,
    ) -> Result<IrType, GenerateError> {
        let schema = resolver.deref(schema, at)?;
        self.type_of(resolver, &schema)
    }

    /// The type expression for a resolved schema, building a type
    /// description first when the schema is model-defining.
    pub fn type_of(&mut self, resolver: &mut Resolver, schema: &Located<Schema>) -> Result<IrType, GenerateError> {
        if let Some(cached) = self.types.get(&schema.pointer) {
            return Ok(cached.clone());
        }
        if self.in_progress.contains(&schema.pointer) {
            // Re-entered while building: a reserved model is referenced by
            // name; a union reaching itself through no model admits anything.
            if self.models.contains_key(&schema.pointer) {
                if let Some(name) = self.names.assigned(&schema.pointer) {
                    return Ok(IrType::Model(name.to_string()));
                }
            }
            return Ok(IrType::Any);
        }
        self.in_progress.insert(schema.pointer.clone());
        let result = self.compute_type(resolver, schema);
        self.in_progress.remove(&schema.pointer);
        let ir_type = result?;
        self.types.insert(schema.pointer.clone(), ir_type.clone());
        Ok(ir_type)
    }

    fn compute_type(&mut self, resolver: &mut Resolver, schema: &Located<Schema>) -> Result<IrType, GenerateError> {
        let nullable = schema.node.nullable_flag() == Some(true) || schema.node.has_type("null");
        // A pure wrapper is referenced through its member, never declared.
        if let Some(member) = sole_variant(resolver, schema)? {
            let ir_type = self.type_of(resolver, &member)?;
            return Ok(if nullable { ir_type.with_null() } else { ir_type });
        }
        let shape = classify(resolver, schema)?;
        let ir_type = match shape {
            Shape::Union(union) => {
                let mut members = Vec::with_capacity(union.variants.len() + 1);
                match union.base.map(|base| *base) {
                    Some(base) if base.is_model() => {
                        members.push(IrType::Model(self.ensure_model(resolver, schema, base)?));
                    }
                    Some(base) => members.push(self.shape_type(resolver, schema, base)?),
                    None => {}
                }
                for variant in &union.variants {
                    members.push(self.type_of(resolver, variant)?);
                }
                IrType::union(members)
            }
            shape => self.shape_type(resolver, schema, shape)?,
        };
        Ok(if nullable { ir_type.with_null() } else { ir_type })
    }

    fn shape_type(
        &mut self,
        resolver: &mut Resolver,
        schema: &Located<Schema>,
        shape: Shape,
    ) -> Result<IrType, GenerateError> {
        if shape.is_model() {
            return Ok(IrType::Model(self.ensure_model(resolver, schema, shape)?));
        }
        Ok(match shape {
            Shape::Map(_) => IrType::Generic(BaseKind::Map),
            Shape::List(_) => IrType::Generic(BaseKind::List),
            Shape::Primitive(primitive) => primitive_expression(primitive),
            Shape::Object(_) | Shape::Union(_) | Shape::Unclassified => IrType::Any,
        })
    }

    /// The class declared for `schema`, building it on first use.
    fn ensure_model(
        &mut self,
        resolver: &mut Resolver,
        schema: &Located<Schema>,
        shape: Shape,
    ) -> Result<String, GenerateError> {
        let pointer = &schema.pointer;
        if let Some(name) = self.aliases.get(pointer) {
            return Ok(name.clone());
        }
        if self.models.contains_key(pointer) {
            if let Some(name) = self.names.assigned(pointer) {
                return Ok(name.to_string());
            }
        }

        let preferred = self.array_name(resolver, pointer, &shape)?;
        let proposed = match &preferred {
            Some(name) => name.clone(),
            None => self.names.propose(resolver, pointer)?,
        };
        let name = self.names.allocate(pointer, proposed.clone());
        self.models.insert(pointer.clone(), None);

        let model = self.fill(resolver, schema, shape, &name)?;

        // An anonymous list shaped exactly like an existing `{Item}Array`
        // reuses that class.
        if preferred.is_some() && name != proposed {
            let same = self
                .declared
                .get(&proposed)
                .and_then(|owner| self.models.get(owner))
                .and_then(Option::as_ref)
                .is_some_and(|existing| existing.same_shape(&model));
            if same {
                self.models.shift_remove(pointer);
                self.names.unbind(pointer);
                self.names.bind(pointer, &proposed);
                self.aliases.insert(pointer.clone(), proposed.clone());
                return Ok(proposed);
            }
        }

        self.declare(pointer, model)
    }

    /// Record a finished model, rejecting a second model under a name that
    /// is already declared with a different shape.
    fn declare(&mut self, pointer: &Pointer, model: IrModel) -> Result<String, GenerateError> {
        let name = model.name.clone();
        if let Some(owner) = self.declared.get(&name).filter(|owner| *owner != pointer) {
            let existing = self.models.get(owner).and_then(Option::as_ref);
            if existing.is_some_and(|existing| existing.same_shape(&model)) {
                self.models.shift_remove(pointer);
                self.aliases.insert(pointer.clone(), name.clone());
                return Ok(name);
            }
            return Err(GenerateError::DuplicateClassName {
                name,
                existing: owner.to_string(),
                pointer: pointer.to_string(),
            });
        }
        self.declared.insert(name.clone(), pointer.clone());
        self.models.insert(pointer.clone(), Some(model));
        Ok(name)
    }

    /// `{Item}Array` for an anonymous list whose only item is a named
    /// definition.
    fn array_name(
        &mut self,
        resolver: &mut Resolver,
        pointer: &Pointer,
        shape: &Shape,
    ) -> Result<Option<String>, GenerateError> {
        let Shape::List(list) = shape else {
            return Ok(None);
        };
        if is_named_definition(pointer) || list.item_schemas.len() != 1 {
            return Ok(None);
        }
        let item = &list.item_schemas[0];
        if !is_named_definition(&item.pointer) || !classify(resolver, item)?.is_model() {
            return Ok(None);
        }
        let item_name = self.names.name_for(resolver, &item.pointer)?;
        Ok(Some(format!("{item_name}Array")))
    }

    fn fill(
        &mut self,
        resolver: &mut Resolver,
        schema: &Located<Schema>,
        shape: Shape,
        name: &str,
    ) -> Result<IrModel, GenerateError> {
        let mut model = IrModel {
            name: name.to_string(),
            base: BaseKind::Object,
            origin: schema.pointer.clone(),
            description: schema.node.description.clone(),
            fields: Vec::new(),
            item_types: Vec::new(),
            value_types: Vec::new(),
            enum_values: schema.node.enum_values.clone(),
            discriminator: schema
                .node
                .discriminator
                .as_ref()
                .map(|discriminator| discriminator.property_name().to_string()),
        };
        match shape {
            Shape::Object(object) => {
                let mut used: HashSet<String> = HashSet::new();
                for (wire_name, property) in &object.properties {
                    let required = object.required.contains(wire_name);
                    let mut field_type = self.type_of(resolver, property)?;
                    if required && self.version.is_swagger() && property.node.nullable_flag() != Some(false) {
                        field_type = field_type.with_null();
                    }
                    let field_name = unique_name(property_name(wire_name), |candidate| used.contains(candidate));
                    used.insert(field_name.clone());
                    model.fields.push(IrField {
                        name: field_name,
                        wire_name: wire_name.clone(),
                        field_type,
                        required,
                        versions: property.node.versions(),
                        description: property.node.description.clone(),
                        read_only: property.node.read_only.unwrap_or(false),
                        write_only: property.node.write_only.unwrap_or(false),
                    });
                }
            }
            Shape::Map(map) => {
                model.base = BaseKind::Map;
                model.value_types = self.member_types(resolver, &map.value_schemas)?;
            }
            Shape::List(list) => {
                model.base = BaseKind::List;
                model.item_types = self.member_types(resolver, &list.item_schemas)?;
            }
            Shape::Union(union) => match union.base {
                Some(base) => return self.fill(resolver, schema, *base, name),
                None => return Err(not_a_model(schema)),
            },
            Shape::Primitive(_) | Shape::Unclassified => return Err(not_a_model(schema)),
        }
        Ok(model)
    }

    /// The deduplicated, flattened member types of a list or map.
    fn member_types(
        &mut self,
        resolver: &mut Resolver,
        schemas: &[Located<Schema>],
    ) -> Result<Vec<IrType>, GenerateError> {
        let mut members = Vec::with_capacity(schemas.len());
        for schema in schemas {
            members.push(self.type_of(resolver, schema)?);
        }
        Ok(IrType::union(members).members().to_vec())
    }

    /// Every model, sorted by origin pointer, and every pointer → class
    /// binding (aliases included), sorted by pointer.
    pub fn finish(self) -> Result<(Vec<IrModel>, Vec<(Pointer, String)>), GenerateError> {
        let mut models = Vec::with_capacity(self.models.len());
        for (pointer, model) in self.models {
            match model {
                Some(model) => models.push(model),
                None => {
                    return Err(GenerateError::validation(
                        &pointer,
                        "type description was reserved but never completed",
                    ));
                }
            }
        }
        models.sort_by(|a, b| a.origin.cmp(&b.origin));
        let mut pointers: Vec<(Pointer, String)> = models
            .iter()
            .map(|model| (model.origin.clone(), model.name.clone()))
            .chain(self.aliases)
            .collect();
        pointers.sort();
        Ok((models, pointers))
    }
}

fn not_a_model(schema: &Located<Schema>) -> GenerateError {
    GenerateError::validation(&schema.pointer, "schema does not define a model")
}

/// A primitive type expression: the declared kinds, narrowed to literal
/// values when the schema is enumerated.
fn primitive_expression(primitive: PrimitiveShape) -> IrType {
    if primitive.enum_values.is_empty() {
        return IrType::union(primitive.kinds);
    }
    let nullable = primitive.kinds.contains(&IrType::Null);
    let kinds: Vec<IrType> = primitive
        .kinds
        .into_iter()
        .filter(|kind| *kind != IrType::Null)
        .collect();
    let enumerated = IrType::Enumerated {
        values: primitive.enum_values,
        kinds,
    };
    if nullable { enumerated.with_null() } else { enumerated }
}
