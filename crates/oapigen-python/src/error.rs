use oapigen_core::error::{GenerateError, LoadError, ResolveError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<LoadError> for EmitError {
    fn from(error: LoadError) -> Self {
        Self::Generate(GenerateError::Load(error))
    }
}

impl From<ResolveError> for EmitError {
    fn from(error: ResolveError) -> Self {
        Self::Generate(GenerateError::Resolve(error))
    }
}
