use minijinja::context;
use oapigen_core::ir::{BaseKind, IrField, IrModel, IrSpec};

use super::{docstring, environment};
use crate::error::EmitError;
use crate::type_mapper::{PythonTypes, python_literal, python_string, python_tuple, required_imports};

/// Emit the model module: one `sob` class per type description, the
/// metadata assignments, and the pointer → class map.
pub fn emit_model_module(ir: &IrSpec) -> Result<String, EmitError> {
    let env = environment("model.py.j2", include_str!("../../templates/model.py.j2"))?;
    let tmpl = env.get_template("model.py.j2")?;

    let types = PythonTypes::local();
    let models: Vec<minijinja::Value> = ir.models.iter().map(|model| model_to_ctx(model, &types)).collect();
    let pointers: Vec<minijinja::Value> = ir
        .pointers
        .iter()
        .map(|(pointer, class_name)| {
            context! {
                pointer => python_string(&pointer.to_string()),
                class_name => class_name.clone(),
            }
        })
        .collect();
    let imports = required_imports(ir.models.iter().flat_map(IrModel::referenced_types));

    Ok(tmpl.render(context! {
        header => docstring(&[format!("Models for {}.", ir.info.title)], 0),
        imports => imports,
        models => models,
        pointers => pointers,
    })?)
}

fn model_to_ctx(model: &IrModel, types: &PythonTypes<'_>) -> minijinja::Value {
    let mut paragraphs = vec![model.origin.to_string()];
    if let Some(description) = model.description.as_deref().filter(|d| !d.trim().is_empty()) {
        paragraphs.push(description.to_string());
    }
    if let Some(discriminator) = &model.discriminator {
        paragraphs.push(format!("Discriminator: `{discriminator}`"));
    }
    if !model.enum_values.is_empty() {
        let values: Vec<String> = model.enum_values.iter().map(python_literal).collect();
        paragraphs.push(format!("Allowed values: `{}`", values.join("`, `")));
    }

    let (kind, base) = match model.base {
        BaseKind::Object => ("object", "sob.Object"),
        BaseKind::List => ("array", "sob.Array"),
        BaseKind::Map => ("dictionary", "sob.Dictionary"),
    };
    let fields: Vec<minijinja::Value> = model
        .fields
        .iter()
        .map(|field| field_to_ctx(field, types))
        .collect();
    let member_hint = |members: &[oapigen_core::ir::IrType]| {
        let mut hints: Vec<String> = members.iter().map(|member| types.hint(member)).collect();
        hints.dedup();
        if hints.is_empty() {
            "sob.abc.MarshallableTypes".to_string()
        } else {
            hints.join(" | ")
        }
    };

    context! {
        kind => kind,
        name => model.name.clone(),
        base => base,
        docstring => docstring(&paragraphs, 4),
        fields => fields,
        item_hint => member_hint(&model.item_types),
        value_hint => member_hint(&model.value_types),
        item_types => types.type_entries(&model.item_types),
        value_types => types.type_entries(&model.value_types),
    }
}

fn field_to_ctx(field: &IrField, types: &PythonTypes<'_>) -> minijinja::Value {
    let mut keywords = Vec::new();
    if field.wire_name != field.name {
        keywords.push(format!("name={}", python_string(&field.wire_name)));
    }
    if field.required {
        keywords.push("required=True".to_string());
    }
    if !field.versions.is_empty() {
        let versions: Vec<String> = field.versions.iter().map(|gate| python_string(gate)).collect();
        keywords.push(format!("versions={}", python_tuple(&versions)));
    }
    let mut notes = Vec::new();
    if field.read_only {
        notes.push("read-only");
    }
    if field.write_only {
        notes.push("write-only");
    }

    context! {
        name => field.name.clone(),
        name_literal => python_string(&field.name),
        hint => types.optional_hint(&field.field_type),
        property => types.property(&field.field_type, &keywords),
        note => notes.join(", "),
    }
}

#[cfg(test)]
mod tests {
    use oapigen_core::ir::{IrInfo, IrInitDefaults, IrType, PrimitiveKind};
    use oapigen_core::parse::DocumentVersion;
    use oapigen_core::resolve::Pointer;

    use super::*;

    fn field(name: &str, wire_name: &str, field_type: IrType, required: bool) -> IrField {
        IrField {
            name: name.to_string(),
            wire_name: wire_name.to_string(),
            field_type,
            required,
            versions: Vec::new(),
            description: None,
            read_only: false,
            write_only: false,
        }
    }

    fn spec(models: Vec<IrModel>) -> IrSpec {
        let pointers = models
            .iter()
            .map(|model| (model.origin.clone(), model.name.clone()))
            .collect();
        IrSpec {
            info: IrInfo {
                title: "Pets".to_string(),
                description: None,
                version: "1".to_string(),
            },
            version: DocumentVersion { major: 3, minor: 0 },
            models,
            pointers,
            operations: Vec::new(),
            init_defaults: IrInitDefaults::default(),
        }
    }

    fn model(name: &str, base: BaseKind, pointer: &str) -> IrModel {
        IrModel {
            name: name.to_string(),
            base,
            origin: Pointer::parse(pointer),
            description: None,
            fields: Vec::new(),
            item_types: Vec::new(),
            value_types: Vec::new(),
            enum_values: Vec::new(),
            discriminator: None,
        }
    }

    #[test]
    fn test_object_class_and_metadata() {
        let mut pet = model("Pet", BaseKind::Object, "#/components/schemas/Pet");
        pet.description = Some("A pet.".to_string());
        pet.fields = vec![
            field("pet_id", "petId", IrType::primitive(PrimitiveKind::Integer, None), true),
            field("born", "born", IrType::primitive(PrimitiveKind::Date, None), false),
        ];
        let output = emit_model_module(&spec(vec![pet])).unwrap();

        assert!(output.contains("import datetime\n"));
        assert!(!output.contains("import decimal"));
        assert!(output.contains(
            "class Pet(sob.Object):\n    \"\"\"\n    #/components/schemas/Pet\n\n    A pet.\n    \"\"\""
        ));
        assert!(output.contains("        pet_id: int | None = None,\n"));
        assert!(output.contains("        self.pet_id: int | None = pet_id\n"));
        assert!(output.contains(
            "    (\"pet_id\", sob.IntegerProperty(name=\"petId\", required=True)),\n"
        ));
        assert!(output.contains("    (\"born\", sob.DateProperty()),\n"));
        assert!(output.contains("    \"#/components/schemas/Pet\": Pet,\n"));
    }

    #[test]
    fn test_array_and_dictionary_metadata() {
        let mut pets = model("PetArray", BaseKind::List, "#/components/schemas/Pets");
        pets.item_types = vec![IrType::Model("Pet".to_string())];
        let mut labels = model("Labels", BaseKind::Map, "#/components/schemas/Labels");
        labels.value_types = vec![IrType::primitive(PrimitiveKind::String, None)];
        let output = emit_model_module(&spec(vec![labels, pets])).unwrap();

        assert!(output.contains("class PetArray(sob.Array):\n"));
        assert!(output.contains("typing.Iterable[Pet]"));
        assert!(output.contains("sob.get_writable_array_meta(  # type: ignore\n    PetArray\n).item_types = sob.MutableTypes([\n    Pet,\n])"));
        assert!(output.contains("class Labels(sob.Dictionary):\n"));
        assert!(output.contains("typing.Mapping[str, str]"));
        assert!(output.contains(").value_types = sob.MutableTypes([\n    sob.StringProperty(),\n])"));
    }

    #[test]
    fn test_enumerated_models_list_their_values() {
        let mut sizes = model("Sizes", BaseKind::List, "#/components/schemas/Sizes");
        sizes.item_types = vec![IrType::primitive(PrimitiveKind::Integer, None)];
        sizes.enum_values = vec![serde_json::json!([1, 2]), serde_json::json!([3])];
        let output = emit_model_module(&spec(vec![sizes])).unwrap();
        assert!(output.contains(
            "class Sizes(sob.Array):\n    \"\"\"\n    #/components/schemas/Sizes\n\n    Allowed values: `[1, 2]`, `[3]`\n    \"\"\""
        ));
    }

    #[test]
    fn test_module_is_read_back_by_name_recovery() {
        let mut point = model("Coordinate", BaseKind::Object, "#/components/schemas/Point");
        point.fields = vec![field("x", "x", IrType::primitive(PrimitiveKind::Number, None), true)];
        let output = emit_model_module(&spec(vec![point])).unwrap();
        let prior = oapigen_core::transform::PriorNames::parse(&output);
        assert_eq!(prior.get(&Pointer::parse("#/components/schemas/Point")), Some("Coordinate"));
    }
}
