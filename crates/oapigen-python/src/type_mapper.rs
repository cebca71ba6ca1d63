use oapigen_core::ir::{BaseKind, IrType, PrimitiveKind};
use serde_json::Value;

/// How type expressions are spelled in a particular module.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonTypes<'a> {
    /// Module that qualifies generated class names, e.g. `model.Pet`.
    pub module: Option<&'a str>,
    /// Accept readable binary streams wherever bytes are expected.
    pub streams: bool,
}

impl<'a> PythonTypes<'a> {
    /// Spelling used inside the model module.
    pub fn local() -> Self {
        Self::default()
    }

    /// Spelling used by a module importing the models as `module`.
    pub fn imported(module: &'a str) -> Self {
        Self {
            module: Some(module),
            streams: true,
        }
    }

    pub fn class_reference(&self, name: &str) -> String {
        match self.module {
            Some(module) => format!("{module}.{name}"),
            None => name.to_string(),
        }
    }

    /// Map an `IrType` to a Python type hint. `None` always comes last.
    pub fn hint(&self, ir_type: &IrType) -> String {
        let mut parts: Vec<String> = Vec::new();
        self.collect_hints(ir_type, &mut parts);
        if let Some(index) = parts.iter().position(|part| part == "None") {
            let none = parts.remove(index);
            parts.push(none);
        }
        parts.join(" | ")
    }

    /// A type hint that also admits `None`.
    pub fn optional_hint(&self, ir_type: &IrType) -> String {
        if ir_type.is_nullable() {
            self.hint(ir_type)
        } else {
            self.hint(&ir_type.clone().with_null())
        }
    }

    fn collect_hints(&self, ir_type: &IrType, parts: &mut Vec<String>) {
        let push = |parts: &mut Vec<String>, hint: String| {
            if !parts.contains(&hint) {
                parts.push(hint);
            }
        };
        match ir_type {
            IrType::Primitive { kind, .. } => {
                let hints: &[&str] = match kind {
                    PrimitiveKind::Integer => &["int"],
                    PrimitiveKind::Number => &["float", "int", "decimal.Decimal"],
                    PrimitiveKind::String => &["str"],
                    PrimitiveKind::Boolean => &["bool"],
                    PrimitiveKind::Bytes if self.streams => &["typing.IO[bytes]", "bytes"],
                    PrimitiveKind::Bytes => &["bytes"],
                    PrimitiveKind::Date => &["datetime.date"],
                    PrimitiveKind::DateTime => &["datetime.datetime"],
                };
                for hint in hints {
                    push(parts, hint.to_string());
                }
            }
            IrType::Enumerated { kinds, .. } => {
                for kind in kinds {
                    self.collect_hints(kind, parts);
                }
            }
            IrType::Model(name) => push(parts, self.class_reference(name)),
            IrType::Generic(BaseKind::List) => push(parts, "sob.abc.Array | list".to_string()),
            IrType::Generic(BaseKind::Map) => push(parts, "sob.abc.Dictionary | dict".to_string()),
            IrType::Generic(BaseKind::Object) => push(parts, "sob.abc.Object".to_string()),
            IrType::Any => push(parts, "sob.abc.MarshallableTypes".to_string()),
            IrType::Null => push(parts, "None".to_string()),
            IrType::Union(members) => {
                for member in members {
                    self.collect_hints(member, parts);
                }
            }
        }
    }

    /// A `sob` property constructor for a type expression. `keywords` are
    /// appended verbatim, e.g. `name="petId"`.
    pub fn property(&self, ir_type: &IrType, keywords: &[String]) -> String {
        let mut arguments: Vec<String> = Vec::new();
        let constructor = match ir_type {
            IrType::Primitive { kind, .. } => primitive_property(*kind),
            IrType::Generic(BaseKind::List) => "sob.ArrayProperty",
            IrType::Generic(BaseKind::Map) | IrType::Generic(BaseKind::Object) => {
                "sob.DictionaryProperty"
            }
            IrType::Enumerated { values, kinds } => {
                let values: Vec<String> = values.iter().map(python_literal).collect();
                arguments.push(format!("values={}", python_tuple(&values)));
                if !kinds.is_empty() {
                    arguments.push(format!("types={}", self.mutable_types(kinds)));
                }
                "sob.EnumeratedProperty"
            }
            IrType::Any => "sob.Property",
            IrType::Model(_) | IrType::Null | IrType::Union(_) => {
                arguments.push(format!("types={}", self.mutable_types(ir_type.members())));
                "sob.Property"
            }
        };
        arguments.extend(keywords.iter().cloned());
        format!("{constructor}({})", arguments.join(", "))
    }

    /// The entries of a `sob.MutableTypes` list: classes by name, `sob.Null`,
    /// or property instances.
    pub fn type_entries(&self, types: &[IrType]) -> Vec<String> {
        let mut entries: Vec<String> = Vec::new();
        for ir_type in types {
            for member in ir_type.members() {
                let entry = match member {
                    IrType::Model(name) => self.class_reference(name),
                    IrType::Null => "sob.Null".to_string(),
                    other => self.property(other, &[]),
                };
                if !entries.contains(&entry) {
                    entries.push(entry);
                }
            }
        }
        entries
    }

    fn mutable_types(&self, types: &[IrType]) -> String {
        format!("sob.MutableTypes([{}])", self.type_entries(types).join(", "))
    }
}

fn primitive_property(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::Integer => "sob.IntegerProperty",
        PrimitiveKind::Number => "sob.NumberProperty",
        PrimitiveKind::String => "sob.StringProperty",
        PrimitiveKind::Boolean => "sob.BooleanProperty",
        PrimitiveKind::Bytes => "sob.BytesProperty",
        PrimitiveKind::Date => "sob.DateProperty",
        PrimitiveKind::DateTime => "sob.DateTimeProperty",
    }
}

/// Modules a set of type expressions needs imported.
pub fn required_imports<'a>(types: impl IntoIterator<Item = &'a IrType>) -> Vec<&'static str> {
    let mut decimal = false;
    let mut datetime = false;
    let mut stack: Vec<&IrType> = types.into_iter().collect();
    while let Some(ir_type) = stack.pop() {
        match ir_type {
            IrType::Primitive { kind, .. } => match kind {
                PrimitiveKind::Number => decimal = true,
                PrimitiveKind::Date | PrimitiveKind::DateTime => datetime = true,
                _ => {}
            },
            IrType::Union(members) | IrType::Enumerated { kinds: members, .. } => {
                stack.extend(members.iter());
            }
            _ => {}
        }
    }
    let mut imports = Vec::new();
    if datetime {
        imports.push("datetime");
    }
    if decimal {
        imports.push("decimal");
    }
    imports
}

/// A Python string literal.
pub fn python_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

/// A Python literal for a JSON value.
pub fn python_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(string) => python_string(string),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(python_literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(entries) => {
            let entries: Vec<String> = entries
                .iter()
                .map(|(key, value)| format!("{}: {}", python_string(key), python_literal(value)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

/// A tuple literal; a single item keeps its trailing comma.
pub fn python_tuple(items: &[String]) -> String {
    match items {
        [single] => format!("({single},)"),
        items => format!("({})", items.join(", ")),
    }
}
