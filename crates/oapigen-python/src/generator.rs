use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, info};
use oapigen_core::ir::IrSpec;
use oapigen_core::resolve::{DocumentLoader, FileLoader, Resolver};
use oapigen_core::transform::{self, MethodNameHook, NamingHook, PriorNames, TransformOptions};
use serde_json::Value;
use tempfile::NamedTempFile;
use url::Url;

use crate::emitters::client::{ClientLayout, emit_client_module};
use crate::emitters::models::emit_model_module;
use crate::error::EmitError;

/// Where the OpenAPI document comes from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    Path(PathBuf),
    Url(Url),
    /// An already-parsed document. `base_url` locates relative references.
    Value {
        document: Value,
        base_url: Option<Url>,
    },
}

impl DocumentSource {
    /// Interpret a CLI argument: anything that parses as an absolute URL
    /// with a scheme longer than one letter is a URL, the rest are paths.
    pub fn parse(input: &str) -> Self {
        match Url::parse(input) {
            Ok(url) if url.scheme().len() > 1 => DocumentSource::Url(url),
            _ => DocumentSource::Path(PathBuf::from(input)),
        }
    }

    /// A resolver reading external documents from the local filesystem.
    pub fn resolver(&self) -> Result<Resolver, EmitError> {
        self.resolver_with_loader(Box::new(FileLoader))
    }

    pub fn resolver_with_loader(&self, loader: Box<dyn DocumentLoader>) -> Result<Resolver, EmitError> {
        match self {
            DocumentSource::Path(path) => {
                let absolute = fs::canonicalize(path).map_err(|source| EmitError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                let url = Url::from_file_path(&absolute)
                    .map_err(|()| oapigen_core::error::LoadError::UnsupportedScheme(absolute.display().to_string()))?;
                Ok(Resolver::load(url, loader)?)
            }
            DocumentSource::Url(url) => Ok(Resolver::load(url.clone(), loader)?),
            DocumentSource::Value { document, base_url } => {
                Ok(Resolver::with_loader(document.clone(), base_url.clone(), loader))
            }
        }
    }
}

/// Options for the model module.
#[derive(Default)]
pub struct ModelOptions {
    /// Replaces the pointer-derived class name proposal.
    pub naming_hook: Option<NamingHook>,
    /// Names recovered from an earlier emission of the same module.
    pub prior_names: PriorNames,
}

/// Options for the client module.
pub struct ClientOptions {
    pub class_name: String,
    /// Dotted path of the base class.
    pub base_class: String,
    /// Extra import statements, emitted verbatim.
    pub imports: Vec<String>,
    pub init_parameter_defaults: IndexMap<String, String>,
    pub add_init_parameters: Vec<String>,
    pub include_init_parameters: Vec<String>,
    pub use_operation_id: bool,
    pub method_name_hook: Option<MethodNameHook>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        let layout = ClientLayout::default();
        Self {
            class_name: layout.class_name,
            base_class: layout.base_class,
            imports: Vec::new(),
            init_parameter_defaults: IndexMap::new(),
            add_init_parameters: Vec::new(),
            include_init_parameters: Vec::new(),
            use_operation_id: false,
            method_name_hook: None,
        }
    }
}

impl From<&oapigen_core::config::ClientConfig> for ClientOptions {
    fn from(config: &oapigen_core::config::ClientConfig) -> Self {
        Self {
            class_name: config.class_name.clone(),
            base_class: config.base_class.clone(),
            imports: config.imports.clone(),
            init_parameter_defaults: config.init_parameter_defaults.clone(),
            add_init_parameters: config.add_init_parameters.clone(),
            include_init_parameters: config.include_init_parameters.clone(),
            use_operation_id: config.use_operation_id,
            method_name_hook: None,
        }
    }
}

/// Module names the client module binds itself; a model module with one of
/// these names is imported under an alias.
const CLIENT_BINDINGS: &[&str] = &["datetime", "decimal", "logging", "oapi", "sob", "typing"];

/// Build the IR for the model module.
pub fn model_ir(source: &DocumentSource, options: ModelOptions) -> Result<IrSpec, EmitError> {
    let mut resolver = source.resolver()?;
    Ok(transform::transform_with_options(
        &mut resolver,
        TransformOptions {
            naming_hook: options.naming_hook,
            prior_names: options.prior_names,
            ..TransformOptions::default()
        },
    )?)
}

/// The model module text.
pub fn model_module_source(source: &DocumentSource, options: ModelOptions) -> Result<String, EmitError> {
    let ir = model_ir(source, options)?;
    emit_model_module(&ir)
}

/// Generate the model module and write it to `path`. Class names already
/// assigned by a module at `path` are kept.
pub fn write_model_module(path: &Path, source: &DocumentSource, mut options: ModelOptions) -> Result<(), EmitError> {
    if options.prior_names.is_empty()
        && let Some(existing) = read_existing(path)?
    {
        options.prior_names = PriorNames::parse(&existing);
    }
    let content = model_module_source(source, options)?;
    write_atomic(path, &content)?;
    info!("wrote {}", path.display());
    Ok(())
}

/// The client module text. `model_source` is the emitted model module the
/// client's class names must agree with; `model_import` is the statement
/// reaching it and the name it binds, as built by [`relative_import`].
pub fn client_module_source(
    source: &DocumentSource,
    model_source: &str,
    model_import: (String, String),
    options: ClientOptions,
) -> Result<String, EmitError> {
    let mut resolver = source.resolver()?;
    let ir = transform::transform_with_options(
        &mut resolver,
        TransformOptions {
            naming_hook: None,
            method_name_hook: options.method_name_hook,
            use_operation_id: options.use_operation_id,
            prior_names: PriorNames::parse(model_source),
        },
    )?;
    let (model_import, model_alias) = model_import;
    let layout = ClientLayout {
        class_name: options.class_name,
        base_class: options.base_class,
        model_import,
        model_alias,
        imports: options.imports,
        init_parameter_defaults: options.init_parameter_defaults,
        add_init_parameters: options.add_init_parameters,
        include_init_parameters: options.include_init_parameters,
    };
    emit_client_module(&ir, &layout)
}

/// Generate the client module for the model module at `model_path` and
/// write it to `path`.
pub fn write_client_module(
    path: &Path,
    source: &DocumentSource,
    model_path: &Path,
    options: ClientOptions,
) -> Result<(), EmitError> {
    let model_source = fs::read_to_string(model_path).map_err(|source| EmitError::Io {
        path: model_path.display().to_string(),
        source,
    })?;
    let import = relative_import(model_path, path);
    debug!("client imports the model module with `{}`", import.0);
    let content = client_module_source(source, &model_source, import, options)?;
    write_atomic(path, &content)?;
    info!("wrote {}", path.display());
    Ok(())
}

/// The statement importing `model_path` from a module at `client_path`, and
/// the name it binds.
///
/// - `a/b/c.py` from `a/b/f.py` → `from . import c`
/// - `a/b/c.py` from `d/e/f.py` → `from ...a.b import c`
pub fn relative_import(model_path: &Path, client_path: &Path) -> (String, String) {
    let stem = model_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());
    let model_dir = directories(model_path);
    let client_dir = directories(client_path);
    let common = model_dir
        .iter()
        .zip(client_dir.iter())
        .take_while(|(left, right)| left == right)
        .count();

    let dots = ".".repeat(client_dir.len() - common + 1);
    let package = model_dir[common..].join(".");
    let (statement, alias) = if CLIENT_BINDINGS.contains(&stem.as_str()) {
        let alias = format!("_{stem}");
        (format!("from {dots}{package} import {stem} as {alias}"), alias)
    } else {
        (format!("from {dots}{package} import {stem}"), stem)
    };
    (statement, alias)
}

/// The normalized directory components of a file path.
fn directories(path: &Path) -> Vec<String> {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut parts: Vec<String> = Vec::new();
    for component in absolute.parent().unwrap_or(Path::new("")).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::ParentDir => {
                parts.pop();
            }
            _ => {}
        }
    }
    parts
}

fn read_existing(path: &Path) -> Result<Option<String>, EmitError> {
    if !path.exists() {
        return Ok(None);
    }
    fs::read_to_string(path)
        .map(Some)
        .map_err(|source| EmitError::Io {
            path: path.display().to_string(),
            source,
        })
}

/// Write through a sibling temporary file renamed over `path`, so a failed
/// run leaves any previous module in place.
fn write_atomic(path: &Path, content: &str) -> Result<(), EmitError> {
    let io_error = |source: std::io::Error| EmitError::Io {
        path: path.display().to_string(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(io_error)?;
    let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
    file.write_all(content.as_bytes()).map_err(io_error)?;
    file.persist(path).map_err(|error| io_error(error.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PETSTORE: &str = r##"
openapi: 3.0.3
info:
  title: Pets
  version: "1"
paths:
  /pets/{petId}:
    get:
      parameters:
        - name: petId
          in: path
          required: true
          schema:
            type: integer
      responses:
        "200":
          description: A pet
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Pet"
components:
  schemas:
    Pet:
      type: object
      properties:
        name:
          type: string
"##;

    fn petstore() -> DocumentSource {
        DocumentSource::Value {
            document: serde_yaml_ng::from_str(PETSTORE).unwrap(),
            base_url: None,
        }
    }

    #[test]
    fn test_relative_import() {
        assert_eq!(
            relative_import(Path::new("/a/b/c.py"), Path::new("/a/b/f.py")),
            ("from . import c".to_string(), "c".to_string())
        );
        assert_eq!(
            relative_import(Path::new("/a/b/c.py"), Path::new("/d/e/f.py")),
            ("from ...a.b import c".to_string(), "c".to_string())
        );
        assert_eq!(
            relative_import(Path::new("/a/b/c.py"), Path::new("/a/f.py")),
            ("from .b import c".to_string(), "c".to_string())
        );
        assert_eq!(
            relative_import(Path::new("/a/typing.py"), Path::new("/a/client.py")),
            ("from . import typing as _typing".to_string(), "_typing".to_string())
        );
    }

    #[test]
    fn test_document_source_parse() {
        assert!(matches!(
            DocumentSource::parse("https://example.com/openapi.json"),
            DocumentSource::Url(_)
        ));
        assert!(matches!(DocumentSource::parse("specs/openapi.yaml"), DocumentSource::Path(_)));
        assert!(matches!(DocumentSource::parse("C:\\specs\\openapi.yaml"), DocumentSource::Path(_)));
    }

    #[test]
    fn test_write_modules() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("api").join("model.py");
        let client_path = dir.path().join("api").join("client.py");

        write_model_module(&model_path, &petstore(), ModelOptions::default()).unwrap();
        write_client_module(&client_path, &petstore(), &model_path, ClientOptions::default()).unwrap();

        let model = fs::read_to_string(&model_path).unwrap();
        let client = fs::read_to_string(&client_path).unwrap();
        assert!(model.contains("class Pet(sob.Object):"));
        assert!(client.contains("from . import model\n"));
        assert!(client.contains("    def get_pets_pet_id(\n"));
        assert!(client.contains(") -> model.Pet:"));
    }

    #[test]
    fn test_rewrite_keeps_names() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.py");
        let first = model_module_source(&petstore(), ModelOptions::default()).unwrap();
        let renamed = first
            .replace("class Pet(", "class Animal(")
            .replace("\": Pet,", "\": Animal,");
        fs::write(&model_path, renamed).unwrap();

        write_model_module(&model_path, &petstore(), ModelOptions::default()).unwrap();
        let second = fs::read_to_string(&model_path).unwrap();
        assert!(second.contains("class Animal(sob.Object):"));
        assert!(second.contains("\"#/components/schemas/Pet\": Animal,"));
    }

    #[test]
    fn test_failed_run_leaves_existing_module() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.py");
        fs::write(&model_path, "# previous\n").unwrap();
        let broken = DocumentSource::Value {
            document: serde_json::json!({"swagger": "1.2", "info": {"title": "Old", "version": "1"}}),
            base_url: None,
        };
        assert!(write_model_module(&model_path, &broken, ModelOptions::default()).is_err());
        assert_eq!(fs::read_to_string(&model_path).unwrap(), "# previous\n");
    }
}
