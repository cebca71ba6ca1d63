pub mod classifier;
pub mod defaults;
pub mod name_normalizer;
pub mod names;
pub mod operations;
pub mod traverse;
pub mod type_builder;

use log::debug;

use crate::error::GenerateError;
use crate::ir::{IrInfo, IrSpec};
use crate::parse::{self, DocumentVersion};
use crate::resolve::Resolver;

pub use names::{NamingHook, PriorNames};
pub use operations::{MethodNameHook, default_method_name};

use names::NameAllocator;
use operations::OperationAnalyzer;
use traverse::Traversal;
use type_builder::TypeBuilder;

/// Options controlling how classes and methods are named.
#[derive(Default)]
pub struct TransformOptions {
    /// Replaces the pointer-derived class name proposal.
    pub naming_hook: Option<NamingHook>,
    /// Replaces the default method name derivation.
    pub method_name_hook: Option<MethodNameHook>,
    pub use_operation_id: bool,
    /// Class names assigned by a previously emitted model module.
    pub prior_names: PriorNames,
}

/// Build the IR for the resolver's root document.
pub fn transform(resolver: &mut Resolver) -> Result<IrSpec, GenerateError> {
    transform_with_options(resolver, TransformOptions::default())
}

/// Build the IR with explicit naming options.
pub fn transform_with_options(
    resolver: &mut Resolver,
    options: TransformOptions,
) -> Result<IrSpec, GenerateError> {
    let root = resolver.root().clone();
    let version = DocumentVersion::detect(&root)?;
    let document = parse::to_openapi(&root)?;

    // Phase 1: Build a type description for every reachable model-defining schema
    let mut builder = TypeBuilder::new(
        version,
        NameAllocator::new(options.prior_names, options.naming_hook),
    );
    let mut traversal = Traversal::new(resolver, &mut builder);
    traversal.run(&document)?;
    debug!("visited {} schemas", traversal.visited());

    // Phase 2: Analyze operations against the same type descriptions
    let schemes = defaults::security_schemes(resolver, &document)?;
    let operations = OperationAnalyzer::new(resolver, &mut builder, defaults::api_key_parameter(&schemes))
        .use_operation_id(options.use_operation_id)
        .method_name_hook(options.method_name_hook.as_ref())
        .run(&document)?;

    // Phase 3: Freeze the models and the pointer map
    let (models, pointers) = builder.finish()?;
    debug!(
        "{} models, {} pointers, {} operations",
        models.len(),
        pointers.len(),
        operations.len()
    );

    Ok(IrSpec {
        info: IrInfo {
            title: document.info.title.clone(),
            description: document.info.description.clone(),
            version: document.info.version.clone(),
        },
        version,
        models,
        pointers,
        operations,
        init_defaults: defaults::init_defaults(&schemes),
    })
}
