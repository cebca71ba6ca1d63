//! Class-name allocation.
//!
//! Names are derived from the canonical pointer of the schema that produces
//! a type, unless a previously emitted model module already assigned one.
//! A prior module is read back through its `_POINTERS_CLASSES` literal and
//! the pointer that opens each class docstring.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::GenerateError;
use crate::resolve::{Pointer, Resolver};

use super::name_normalizer::{class_name, unique_name};

/// Replaces the pointer-derived class name. Receives the canonical pointer
/// and, for a parameter's schema, the parameter name (otherwise empty).
pub type NamingHook = Box<dyn Fn(&str, &str) -> String>;

static POINTERS_CLASSES_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_POINTERS_CLASSES\s*(?::[^=]*)?=\s*\{").expect("Invalid regex")
});

static POINTERS_CLASSES_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*("(?:[^"\\]|\\.)*")\s*:\s*([A-Za-z_][A-Za-z0-9_]*)\s*,?\s*$"#)
        .expect("Invalid regex")
});

static CLASS_DOCSTRING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^class\s+([A-Za-z_][A-Za-z0-9_]*)\(\s*sob\.(?:Object|Array|Dictionary)\s*\)\s*:\s*"""\s*(\S*#\S*)"#,
    )
    .expect("Invalid regex")
});

/// Pointer → class assignments recovered from a previously emitted model
/// module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorNames {
    names: HashMap<Pointer, String>,
}

impl PriorNames {
    /// Read the assignments from module source. Entries in the
    /// `_POINTERS_CLASSES` literal take precedence over class docstrings.
    pub fn parse(source: &str) -> Self {
        let mut names = HashMap::new();
        for captures in CLASS_DOCSTRING.captures_iter(source) {
            names.insert(Pointer::parse(&captures[2]), captures[1].to_string());
        }
        if let Some(start) = POINTERS_CLASSES_START.find(source) {
            for line in source[start.end()..].lines() {
                if line.trim_start().starts_with('}') {
                    break;
                }
                let Some(captures) = POINTERS_CLASSES_ENTRY.captures(line) else {
                    continue;
                };
                let Ok(pointer) = serde_json::from_str::<String>(&captures[1]) else {
                    continue;
                };
                names.insert(Pointer::parse(&pointer), captures[2].to_string());
            }
        }
        log::debug!("recovered {} class names from the prior module", names.len());
        Self { names }
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (Pointer, String)>) -> Self {
        Self {
            names: pairs.into_iter().collect(),
        }
    }

    pub fn get(&self, pointer: &Pointer) -> Option<&str> {
        self.names.get(pointer).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// True when `name` was assigned to some pointer other than `pointer`.
    fn claims(&self, name: &str, pointer: &Pointer) -> bool {
        self.names
            .iter()
            .any(|(other, assigned)| assigned == name && other != pointer)
    }
}

/// Assigns each model-defining pointer a unique class name.
pub struct NameAllocator {
    prior: PriorNames,
    hook: Option<NamingHook>,
    assigned: HashMap<Pointer, String>,
    owners: HashMap<String, Pointer>,
}

impl NameAllocator {
    pub fn new(prior: PriorNames, hook: Option<NamingHook>) -> Self {
        Self {
            prior,
            hook,
            assigned: HashMap::new(),
            owners: HashMap::new(),
        }
    }

    /// The class name bound to `pointer`, allocating one on first use.
    pub fn name_for(&mut self, resolver: &mut Resolver, pointer: &Pointer) -> Result<String, GenerateError> {
        if let Some(name) = self.assigned.get(pointer) {
            return Ok(name.clone());
        }
        let proposed = self.propose(resolver, pointer)?;
        Ok(self.allocate(pointer, proposed))
    }

    /// Bind `pointer` to a unique variant of `proposed`, unless the prior
    /// module already named it.
    pub fn allocate(&mut self, pointer: &Pointer, proposed: String) -> String {
        if let Some(name) = self.assigned.get(pointer) {
            return name.clone();
        }
        let name = match self.prior.get(pointer) {
            Some(prior) => prior.to_string(),
            None => unique_name(proposed, |candidate| {
                self.owners
                    .get(candidate)
                    .is_some_and(|owner| owner != pointer)
                    || self.prior.claims(candidate, pointer)
            }),
        };
        log::debug!("class {name} assigned to {pointer}");
        self.bind(pointer, &name);
        name
    }

    /// Bind `pointer` to `name` without uniqueness checks. Used when a
    /// pointer is an alias of an existing type.
    pub fn bind(&mut self, pointer: &Pointer, name: &str) {
        self.assigned.insert(pointer.clone(), name.to_string());
        self.owners
            .entry(name.to_string())
            .or_insert_with(|| pointer.clone());
    }

    /// Drop a binding made for `pointer`, freeing its name when `pointer`
    /// owned it.
    pub fn unbind(&mut self, pointer: &Pointer) {
        if let Some(name) = self.assigned.remove(pointer) {
            if self.owners.get(&name) == Some(pointer) {
                self.owners.remove(&name);
            }
        }
    }

    pub fn assigned(&self, pointer: &Pointer) -> Option<&str> {
        self.assigned.get(pointer).map(String::as_str)
    }

    /// The first pointer bound to `name`.
    pub fn owner(&self, name: &str) -> Option<&Pointer> {
        self.owners.get(name)
    }

    pub fn prior(&self, pointer: &Pointer) -> Option<&str> {
        self.prior.get(pointer)
    }

    /// The name the derivation (or the hook) would give `pointer`, before
    /// uniqueness is enforced.
    pub fn propose(&self, resolver: &mut Resolver, pointer: &Pointer) -> Result<String, GenerateError> {
        let (path, parameter_name) = name_path(resolver, pointer)?;
        Ok(match &self.hook {
            Some(hook) => hook(&pointer.to_string(), parameter_name.as_deref().unwrap_or("")),
            None => class_name(&path),
        })
    }
}

/// True for a schema declared directly under `definitions` or
/// `components/schemas`.
pub fn is_named_definition(pointer: &Pointer) -> bool {
    let segments = pointer.segments();
    matches!(
        segments.iter().map(String::as_str).collect::<Vec<_>>().as_slice(),
        ["definitions", _] | ["components", "schemas", _]
    )
}

/// The `/`-joined name path for a pointer, plus the parameter name when the
/// pointer is a parameter's schema.
///
/// `#/paths/~1a/get/parameters/0/schema` (a parameter named `first`)
/// becomes `/a/get/first`; `#/definitions/Pet/properties/tags/items`
/// becomes `Pet/tags/item`.
fn name_path(resolver: &mut Resolver, pointer: &Pointer) -> Result<(String, Option<String>), GenerateError> {
    let segments = pointer.segments();
    let mut index = match segments.first().map(String::as_str) {
        Some("components") => 2,
        Some("definitions" | "paths" | "parameters" | "responses") => 1,
        _ => 0,
    };
    let mut parts: Vec<String> = Vec::new();
    let mut parameter_name = None;
    let is_index = |position: usize| {
        segments
            .get(position)
            .is_some_and(|segment| segment.parse::<usize>().is_ok())
    };

    while index < segments.len() {
        let segment = segments[index].as_str();
        let has_next = index + 1 < segments.len();
        match segment {
            "properties" if has_next => {
                parts.push(segments[index + 1].clone());
                index += 2;
            }
            "anyOf" | "allOf" | "oneOf" if is_index(index + 1) => index += 2,
            "items" => {
                parts.push("item".to_string());
                index += 1;
            }
            "responses" if has_next => {
                let code = segments[index + 1].as_str();
                parts.push("response".to_string());
                if code != "200" {
                    parts.push(code.to_string());
                }
                index += 2;
            }
            "requestBody" => {
                parts.push("request_body".to_string());
                index += 1;
            }
            "parameters" if is_index(index + 1) => {
                let at = Pointer::new(pointer.url(), "")
                    .child_segments(&segments[..index + 2]);
                let name = parameter_name_at(resolver, &at)?
                    .unwrap_or_else(|| segments[index + 1].clone());
                parts.push(name.clone());
                parameter_name = Some(name);
                index += 2;
            }
            "content" if has_next => index += 2,
            "schema" => index += 1,
            _ => {
                parts.push(segment.to_string());
                index += 1;
            }
        }
    }

    // A named component parameter (`components/parameters/Name/schema`).
    if parameter_name.is_none()
        && matches!(
            segments.iter().map(String::as_str).collect::<Vec<_>>().as_slice(),
            ["components", "parameters", _, ..] | ["parameters", _, ..]
        )
    {
        let depth = if segments[0] == "components" { 3 } else { 2 };
        let at = Pointer::new(pointer.url(), "").child_segments(&segments[..depth]);
        parameter_name = parameter_name_at(resolver, &at)?;
    }

    Ok((parts.join("/"), parameter_name))
}

fn parameter_name_at(resolver: &mut Resolver, at: &Pointer) -> Result<Option<String>, GenerateError> {
    let node = resolver.fetch(at)?;
    Ok(node.node.get("name").and_then(Value::as_str).map(str::to_string))
}
