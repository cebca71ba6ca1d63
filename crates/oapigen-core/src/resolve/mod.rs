//! Reference resolution across the root document and any external documents
//! it points to.
//!
//! Every document keeps a cache of `fragment → resolved node`. An entry is
//! seeded with `None` while its `$ref` chain is being followed; meeting a
//! `None` entry again means the chain loops back on itself without reaching
//! a concrete node.

pub mod loader;
pub mod pointer;

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::error::{LoadError, ResolveError};
use crate::parse;
use crate::parse::parameter::{Parameter, ParameterOrRef};
use crate::parse::request_body::{RequestBody, RequestBodyOrRef};
use crate::parse::response::{Response, ResponseOrRef};
use crate::parse::schema::{Schema, SchemaOrRef};
use crate::parse::security::{SecurityScheme, SecuritySchemeOrRef};

pub use loader::{DocumentLoader, FileLoader};
pub use pointer::Pointer;

/// A node together with the pointer it was read from. After dereferencing,
/// the pointer is the referenced location, not the reference site.
#[derive(Debug, Clone, PartialEq)]
pub struct Located<T> {
    pub pointer: Pointer,
    pub node: T,
}

impl<T> Located<T> {
    pub fn new(pointer: Pointer, node: T) -> Self {
        Self { pointer, node }
    }
}

/// Either side of a `$ref`-or-inline metamodel enum.
pub enum Node<'a, T> {
    Reference(&'a str),
    Inline(&'a T),
}

/// Metamodel enums that may hold a `$ref` in place of the node.
pub trait MaybeRef {
    type Target: DeserializeOwned + Clone;

    fn node(&self) -> Node<'_, Self::Target>;
}

macro_rules! maybe_ref {
    ($enum:ident, $variant:ident, $target:ty) => {
        impl MaybeRef for $enum {
            type Target = $target;

            fn node(&self) -> Node<'_, $target> {
                match self {
                    $enum::Ref { ref_path } => Node::Reference(ref_path),
                    $enum::$variant(inline) => Node::Inline(inline),
                }
            }
        }
    };
}

maybe_ref!(SchemaOrRef, Schema, Schema);
maybe_ref!(ParameterOrRef, Parameter, Parameter);
maybe_ref!(RequestBodyOrRef, RequestBody, RequestBody);
maybe_ref!(ResponseOrRef, Response, Response);
maybe_ref!(SecuritySchemeOrRef, SecurityScheme, SecurityScheme);

struct Document {
    base: Option<Url>,
    root: Value,
    cache: HashMap<String, Option<Located<Value>>>,
}

impl Document {
    fn new(base: Option<Url>, root: Value) -> Self {
        Self {
            base,
            root,
            cache: HashMap::new(),
        }
    }
}

/// Resolves `$ref` pointers, loading external documents on demand.
pub struct Resolver {
    root_url: Option<Url>,
    documents: IndexMap<String, Document>,
    loader: Box<dyn DocumentLoader>,
}

impl Resolver {
    /// Create a resolver for an already-parsed root document. `base_url` is
    /// the document's own location, used to resolve relative references.
    pub fn new(root: Value, base_url: Option<Url>) -> Self {
        Self::with_loader(root, base_url, Box::new(FileLoader))
    }

    pub fn with_loader(root: Value, base_url: Option<Url>, loader: Box<dyn DocumentLoader>) -> Self {
        let mut documents = IndexMap::new();
        documents.insert(String::new(), Document::new(base_url.clone(), root));
        Self {
            root_url: base_url,
            documents,
            loader,
        }
    }

    /// Load the root document from a URL through the given loader.
    pub fn load(url: Url, loader: Box<dyn DocumentLoader>) -> Result<Self, ResolveError> {
        let bytes = loader.load(&url).map_err(|source| ResolveError::Load {
            url: url.to_string(),
            source,
        })?;
        let root = parse::from_slice(&bytes).map_err(|source| ResolveError::Load {
            url: url.to_string(),
            source,
        })?;
        Ok(Self::with_loader(root, Some(url), loader))
    }

    /// The root document.
    pub fn root(&self) -> &Value {
        // The root document is inserted at construction and never removed.
        &self.documents[0].root
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.root_url.as_ref()
    }

    /// Follow `reference` (as found at `from`) to a concrete node.
    pub fn resolve_reference(
        &mut self,
        reference: &str,
        from: &Pointer,
    ) -> Result<Located<Value>, ResolveError> {
        let target = self.target_pointer(reference, from)?;
        self.fetch(&target)
    }

    /// Follow `reference` and deserialize the target.
    pub fn resolve<T: DeserializeOwned>(
        &mut self,
        reference: &str,
        from: &Pointer,
    ) -> Result<Located<T>, ResolveError> {
        let located = self.resolve_reference(reference, from)?;
        deserialize(located)
    }

    /// Dereference a `$ref`-or-inline node found at `at`.
    pub fn deref<R: MaybeRef>(
        &mut self,
        item: &R,
        at: &Pointer,
    ) -> Result<Located<R::Target>, ResolveError> {
        match item.node() {
            Node::Reference(reference) => self.resolve(reference, at),
            Node::Inline(inline) => Ok(Located::new(at.clone(), inline.clone())),
        }
    }

    /// Fetch the node at a canonical pointer, following it if it is itself
    /// a reference.
    pub fn fetch(&mut self, pointer: &Pointer) -> Result<Located<Value>, ResolveError> {
        let document = self.document_mut(pointer.url())?;
        match document.cache.get(pointer.fragment()) {
            Some(Some(located)) => return Ok(located.clone()),
            Some(None) => return Err(ResolveError::ReferenceLoop(pointer.to_string())),
            None => {}
        }
        let Some(node) = document.root.pointer(pointer.fragment()).cloned() else {
            return Err(ResolveError::ReferencePointer(pointer.to_string()));
        };
        document.cache.insert(pointer.fragment().to_string(), None);

        let reference = node.get("$ref").and_then(Value::as_str).map(str::to_string);
        let resolved = match reference {
            Some(reference) => self.resolve_reference(&reference, pointer),
            None => Ok(Located::new(pointer.clone(), node)),
        };

        let document = self.document_mut(pointer.url())?;
        match resolved {
            Ok(located) => {
                document
                    .cache
                    .insert(pointer.fragment().to_string(), Some(located.clone()));
                Ok(located)
            }
            Err(error) => {
                document.cache.remove(pointer.fragment());
                Err(error)
            }
        }
    }

    /// Fetch and deserialize the node at a canonical pointer.
    pub fn fetch_as<T: DeserializeOwned>(&mut self, pointer: &Pointer) -> Result<Located<T>, ResolveError> {
        let located = self.fetch(pointer)?;
        deserialize(located)
    }

    /// The root document with every reference replaced by its target.
    /// References that would recurse into one of their own ancestors are
    /// left in place.
    pub fn dereference(&mut self) -> Result<Value, ResolveError> {
        let root = self.root().clone();
        let mut ancestors = HashSet::new();
        self.dereference_value(root, &Pointer::root(), &mut ancestors)
    }

    fn dereference_value(
        &mut self,
        value: Value,
        at: &Pointer,
        ancestors: &mut HashSet<Pointer>,
    ) -> Result<Value, ResolveError> {
        match value {
            Value::Object(map) => {
                let reference = map.get("$ref").and_then(Value::as_str).map(str::to_string);
                if let Some(reference) = reference {
                    let target = match self.resolve_reference(&reference, at) {
                        Ok(target) => target,
                        Err(ResolveError::ReferenceLoop(_)) => return Ok(Value::Object(map)),
                        Err(error) => return Err(error),
                    };
                    if ancestors.contains(&target.pointer) {
                        return Ok(Value::Object(map));
                    }
                    ancestors.insert(target.pointer.clone());
                    let dereferenced = self.dereference_value(target.node, &target.pointer, ancestors);
                    ancestors.remove(&target.pointer);
                    return dereferenced;
                }
                ancestors.insert(at.clone());
                let mut dereferenced = serde_json::Map::new();
                for (key, child) in map {
                    let child_pointer = at.child(&key);
                    let child = self.dereference_value(child, &child_pointer, ancestors)?;
                    dereferenced.insert(key, child);
                }
                ancestors.remove(at);
                Ok(Value::Object(dereferenced))
            }
            Value::Array(items) => {
                let mut dereferenced = Vec::with_capacity(items.len());
                for (index, child) in items.into_iter().enumerate() {
                    let child_pointer = at.index(index);
                    dereferenced.push(self.dereference_value(child, &child_pointer, ancestors)?);
                }
                Ok(Value::Array(dereferenced))
            }
            other => Ok(other),
        }
    }

    /// The canonical pointer a reference denotes when found at `from`.
    fn target_pointer(&mut self, reference: &str, from: &Pointer) -> Result<Pointer, ResolveError> {
        let (location, fragment) = reference.split_once('#').unwrap_or((reference, ""));
        let fragment = pointer::percent_decode(fragment);
        if !fragment.is_empty() && !fragment.starts_with('/') {
            return Err(ResolveError::InvalidReference(reference.to_string()));
        }
        if location.is_empty() {
            return Ok(Pointer::new(from.url(), fragment));
        }
        let base = self.document_mut(from.url())?.base.clone();
        let absolute = match base {
            Some(base) => base.join(location),
            None => Url::parse(location),
        }
        .map_err(|_| ResolveError::InvalidReference(reference.to_string()))?;
        let key = self.document_key(&absolute);
        if !self.documents.contains_key(&key) {
            log::debug!("loading external document {absolute}");
            let bytes = self
                .loader
                .load(&absolute)
                .map_err(|source| ResolveError::Load {
                    url: absolute.to_string(),
                    source,
                })?;
            let root = parse::from_slice(&bytes).map_err(|source: LoadError| ResolveError::Load {
                url: absolute.to_string(),
                source,
            })?;
            self.documents
                .insert(key.clone(), Document::new(Some(absolute), root));
        }
        Ok(Pointer::new(key, fragment))
    }

    /// Documents are keyed by their URL relative to the root document, so
    /// canonical pointers do not depend on where the root lives.
    fn document_key(&self, absolute: &Url) -> String {
        match &self.root_url {
            Some(root) if root == absolute => String::new(),
            Some(root) => root
                .make_relative(absolute)
                .filter(|relative| !relative.is_empty())
                .unwrap_or_else(|| absolute.to_string()),
            None => absolute.to_string(),
        }
    }

    fn document_mut(&mut self, key: &str) -> Result<&mut Document, ResolveError> {
        self.documents
            .get_mut(key)
            .ok_or_else(|| ResolveError::ReferencePointer(format!("{key}#")))
    }
}

fn deserialize<T: DeserializeOwned>(located: Located<Value>) -> Result<Located<T>, ResolveError> {
    let node = serde_json::from_value(located.node).map_err(|source| ResolveError::Deserialize {
        pointer: located.pointer.to_string(),
        source,
    })?;
    Ok(Located::new(located.pointer, node))
}
