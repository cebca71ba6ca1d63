pub mod emitters;
pub mod error;
pub mod generator;
pub mod type_mapper;

pub use emitters::client::ClientLayout;
pub use error::EmitError;
pub use generator::{
    ClientOptions, DocumentSource, ModelOptions, client_module_source, model_module_source,
    relative_import, write_client_module, write_model_module,
};
