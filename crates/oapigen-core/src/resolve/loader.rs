use std::fs;

use url::Url;

use crate::error::LoadError;

/// Fetches the raw bytes of an external document. Implementations block
/// until the whole body is available.
pub trait DocumentLoader {
    fn load(&self, url: &Url) -> Result<Vec<u8>, LoadError>;
}

/// Loads `file:` URLs from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl DocumentLoader for FileLoader {
    fn load(&self, url: &Url) -> Result<Vec<u8>, LoadError> {
        if url.scheme() != "file" {
            return Err(LoadError::UnsupportedScheme(url.to_string()));
        }
        let path = url
            .to_file_path()
            .map_err(|()| LoadError::UnsupportedScheme(url.to_string()))?;
        fs::read(&path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}
