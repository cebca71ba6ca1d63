use std::fmt;

use serde_json::Value;

use crate::resolve::Pointer;

/// Primitive value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Integer,
    Number,
    String,
    Boolean,
    Bytes,
    Date,
    DateTime,
}

/// The runtime base a generated type derives from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKind {
    Object,
    List,
    Map,
}

impl fmt::Display for BaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BaseKind::Object => "object",
            BaseKind::List => "list",
            BaseKind::Map => "map",
        })
    }
}

/// A type expression: a reference to a generated type by name, a primitive,
/// an unparameterized base, or a union of those.
#[derive(Debug, Clone, PartialEq)]
pub enum IrType {
    Primitive {
        kind: PrimitiveKind,
        format: Option<String>,
    },
    /// A primitive restricted to literal values.
    Enumerated {
        values: Vec<Value>,
        kinds: Vec<IrType>,
    },
    /// Reference to a generated type by class name.
    Model(String),
    /// A list or map with unconstrained members.
    Generic(BaseKind),
    Any,
    Null,
    Union(Vec<IrType>),
}

impl IrType {
    pub fn primitive(kind: PrimitiveKind, format: Option<&str>) -> Self {
        IrType::Primitive {
            kind,
            format: format.map(str::to_string),
        }
    }

    /// Build a union, flattening nested unions and dropping structural
    /// duplicates. A single member collapses to itself; no members yields
    /// `Any`.
    pub fn union(members: impl IntoIterator<Item = IrType>) -> IrType {
        let mut flat: Vec<IrType> = Vec::new();
        for member in members {
            push_distinct(&mut flat, member);
        }
        match flat.len() {
            0 => IrType::Any,
            1 => flat.remove(0),
            _ => IrType::Union(flat),
        }
    }

    /// The members of a union, or the expression itself.
    pub fn members(&self) -> &[IrType] {
        match self {
            IrType::Union(members) => members,
            other => std::slice::from_ref(other),
        }
    }

    pub fn is_nullable(&self) -> bool {
        self.members().contains(&IrType::Null)
    }

    /// Extend the expression with `Null`.
    pub fn with_null(self) -> IrType {
        IrType::union([self, IrType::Null])
    }

    /// Class names referenced anywhere in the expression.
    pub fn model_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_model_names(self, &mut names);
        names
    }
}

fn push_distinct(flat: &mut Vec<IrType>, member: IrType) {
    match member {
        IrType::Union(members) => {
            for member in members {
                push_distinct(flat, member);
            }
        }
        member => {
            if !flat.contains(&member) {
                flat.push(member);
            }
        }
    }
}

fn collect_model_names<'a>(ir_type: &'a IrType, names: &mut Vec<&'a str>) {
    match ir_type {
        IrType::Model(name) => names.push(name),
        IrType::Union(members) | IrType::Enumerated { kinds: members, .. } => {
            for member in members {
                collect_model_names(member, names);
            }
        }
        _ => {}
    }
}

/// A generated type.
#[derive(Debug, Clone, PartialEq)]
pub struct IrModel {
    pub name: String,
    pub base: BaseKind,
    /// The canonical pointer of the schema that produced this type.
    pub origin: Pointer,
    pub description: Option<String>,
    pub fields: Vec<IrField>,
    pub item_types: Vec<IrType>,
    pub value_types: Vec<IrType>,
    pub enum_values: Vec<Value>,
    /// Discriminator property, kept as metadata only.
    pub discriminator: Option<String>,
}

impl IrModel {
    /// True when two descriptions declare the same type surface, ignoring
    /// name, origin and documentation.
    pub fn same_shape(&self, other: &IrModel) -> bool {
        self.base == other.base
            && self.fields == other.fields
            && self.item_types == other.item_types
            && self.value_types == other.value_types
            && self.enum_values == other.enum_values
    }

    /// Every type expression the model refers to.
    pub fn referenced_types(&self) -> impl Iterator<Item = &IrType> {
        self.fields
            .iter()
            .map(|field| &field.field_type)
            .chain(self.item_types.iter())
            .chain(self.value_types.iter())
    }
}

/// A field on an object type.
#[derive(Debug, Clone, PartialEq)]
pub struct IrField {
    /// Normalized identifier.
    pub name: String,
    /// The property key as serialized.
    pub wire_name: String,
    pub field_type: IrType,
    pub required: bool,
    /// Version gates such as `openapi>=3.0`.
    pub versions: Vec<String>,
    pub description: Option<String>,
    pub read_only: bool,
    pub write_only: bool,
}
