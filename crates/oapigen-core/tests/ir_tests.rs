use oapigen_core::ir::{
    BaseKind, IrOperation, IrParameterLocation, IrSpec, IrType, ParameterStyle, PrimitiveKind,
};
use oapigen_core::parse;
use oapigen_core::resolve::{Pointer, Resolver};
use oapigen_core::transform::{self, PriorNames, TransformOptions};

const SHAPES: &str = include_str!("fixtures/shapes-3.0.yaml");
const PETSTORE_V2: &str = include_str!("fixtures/petstore-2.0.yaml");

fn transform_yaml(source: &str) -> IrSpec {
    let document = parse::from_yaml(source).unwrap();
    transform::transform(&mut Resolver::new(document, None)).expect("should transform")
}

fn operation<'a>(ir: &'a IrSpec, name: &str) -> &'a IrOperation {
    ir.operations
        .iter()
        .find(|op| op.method_name == name)
        .unwrap_or_else(|| panic!("should have operation {name}"))
}

#[test]
fn object_with_required_integer() {
    let ir = transform_yaml(SHAPES);
    let point = ir.model("Point").expect("should declare Point");

    assert_eq!(point.base, BaseKind::Object);
    assert_eq!(point.origin, Pointer::parse("#/components/schemas/Point"));
    assert_eq!(point.fields.len(), 1);
    assert_eq!(point.fields[0].wire_name, "x");
    assert!(point.fields[0].required);
    assert_eq!(
        point.fields[0].field_type,
        IrType::primitive(PrimitiveKind::Integer, None)
    );
}

#[test]
fn list_items_reference_their_class() {
    let ir = transform_yaml(SHAPES);
    let points = ir.model("Points").expect("should declare Points");
    assert_eq!(points.base, BaseKind::List);
    assert_eq!(points.item_types, vec![IrType::Model("Point".to_string())]);
}

#[test]
fn inline_parameter_schemas_are_named_after_their_parameter() {
    let ir = transform_yaml(SHAPES);
    let first = ir.model("AGetFirst").expect("should declare AGetFirst");
    let second = ir.model("AGetSecond").expect("should declare AGetSecond");

    assert_eq!(
        first.origin,
        Pointer::parse("#/paths/~1a/get/parameters/0/schema")
    );
    assert_eq!(first.fields[0].wire_name, "x");
    assert_eq!(second.fields[0].wire_name, "y");
}

#[test]
fn nullable_one_of_is_a_primitive_union() {
    let ir = transform_yaml(SHAPES);
    assert!(ir.model("Value").is_none(), "a primitive union is not a class");

    let label = ir.model("Label").expect("should declare Label");
    assert_eq!(
        label.fields[0].field_type,
        IrType::Union(vec![
            IrType::primitive(PrimitiveKind::String, None),
            IrType::primitive(PrimitiveKind::Integer, None),
            IrType::Null,
        ])
    );
}

#[test]
fn responses_form_the_return_union() {
    let ir = transform_yaml(SHAPES);

    let no_content = operation(&ir, "get_a");
    assert!(no_content.response_types.is_empty());

    let shapes = operation(&ir, "get_shapes");
    assert_eq!(
        shapes.response_types,
        vec![
            IrType::Model("Point".to_string()),
            IrType::Model("Line".to_string()),
        ]
    );
}

#[test]
fn recursive_schemas_reference_themselves_by_name() {
    let ir = transform_yaml(SHAPES);
    let tree = ir.model("Tree").expect("should declare Tree");
    assert_eq!(
        tree.fields[0].field_type,
        IrType::Model("TreeArray".to_string())
    );
    let children = ir.model("TreeArray").expect("should declare TreeArray");
    assert_eq!(children.item_types, vec![IrType::Model("Tree".to_string())]);
}

#[test]
fn every_class_name_is_unique_and_mapped() {
    let ir = transform_yaml(SHAPES);
    let mut names: Vec<&str> = ir.models.iter().map(|m| m.name.as_str()).collect();
    let total = names.len();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), total);

    for model in &ir.models {
        assert!(
            ir.pointers
                .iter()
                .any(|(pointer, name)| pointer == &model.origin && name == &model.name),
            "{} should be in the pointer map",
            model.name
        );
    }
}

#[test]
fn swagger_collection_format_multi() {
    let ir = transform_yaml(PETSTORE_V2);
    let find_pets = operation(&ir, "get_pets");
    let tag = find_pets
        .parameters
        .iter()
        .find(|p| p.wire_name == "tag")
        .expect("should have tag");

    assert_eq!(tag.location, IrParameterLocation::Query);
    assert_eq!(tag.style, ParameterStyle::Form);
    assert!(tag.explode);
    assert!(!tag.required);
    assert_eq!(
        find_pets.response_types,
        vec![IrType::Model("PetArray".to_string())]
    );
}

#[test]
fn swagger_required_fields_are_nullable() {
    let ir = transform_yaml(PETSTORE_V2);
    let pet = ir.model("Pet").expect("should declare Pet");
    let id = pet.fields.iter().find(|f| f.name == "id").unwrap();
    let tag = pet.fields.iter().find(|f| f.name == "tag").unwrap();
    assert!(id.required && id.field_type.is_nullable());
    assert!(!tag.required && !tag.field_type.is_nullable());
}

#[test]
fn swagger_operations() {
    let ir = transform_yaml(PETSTORE_V2);

    let add_pet = operation(&ir, "post_pets");
    let body = add_pet.body().expect("should have a body");
    assert_eq!(body.argument_name, "pet");
    assert_eq!(body.param_type, IrType::Model("NewPet".to_string()));

    // The path-level `id` is inherited and the API key header is left to the runtime.
    let find_pet = operation(&ir, "get_pets_id");
    let names: Vec<&str> = find_pet
        .parameters
        .iter()
        .map(|p| p.argument_name.as_str())
        .collect();
    assert_eq!(names, vec!["id"]);
    assert_eq!(find_pet.parameters[0].location, IrParameterLocation::Path);

    let delete_pet = operation(&ir, "delete_pets_id");
    assert!(delete_pet.response_types.is_empty());

    let upload = operation(&ir, "post_pets_id_photo");
    assert!(upload.multipart);
    let names: Vec<&str> = upload
        .parameters
        .iter()
        .map(|p| p.argument_name.as_str())
        .collect();
    assert_eq!(names, vec!["id", "file", "caption"]);
    assert_eq!(upload.parameters[1].location, IrParameterLocation::FormData);
}

#[test]
fn swagger_security_defaults() {
    let ir = transform_yaml(PETSTORE_V2);
    assert_eq!(ir.init_defaults.api_key_in, "header");
    assert_eq!(ir.init_defaults.api_key_name, "api_key");
    assert_eq!(
        ir.init_defaults.oauth2_token_url.as_deref(),
        Some("https://petstore.example.com/oauth/token")
    );
    assert_eq!(ir.init_defaults.oauth2_flows, vec!["clientCredentials"]);
}

#[test]
fn operation_ids_name_methods_on_request() {
    let document = parse::from_yaml(PETSTORE_V2).unwrap();
    let options = TransformOptions {
        use_operation_id: true,
        ..TransformOptions::default()
    };
    let ir = transform::transform_with_options(&mut Resolver::new(document, None), options)
        .expect("should transform");
    let names: Vec<&str> = ir.operations.iter().map(|op| op.method_name.as_str()).collect();
    for expected in ["find_pets", "add_pet", "find_pet_by_id", "delete_pet", "upload_photo"] {
        assert!(names.contains(&expected), "missing {expected} in {names:?}");
    }
}

#[test]
fn prior_names_survive_a_second_run() {
    let document = parse::from_yaml(SHAPES).unwrap();
    let options = TransformOptions {
        prior_names: PriorNames::from_pairs([(
            Pointer::parse("#/components/schemas/Point"),
            "Coordinate".to_string(),
        )]),
        ..TransformOptions::default()
    };
    let ir = transform::transform_with_options(&mut Resolver::new(document, None), options)
        .expect("should transform");

    assert!(ir.model("Point").is_none());
    assert!(ir.model("Coordinate").is_some());
    let points = ir.model("Points").expect("should declare Points");
    assert_eq!(points.item_types, vec![IrType::Model("Coordinate".to_string())]);
}
