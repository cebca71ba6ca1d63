use crate::parse::DocumentVersion;
use crate::resolve::Pointer;

use super::operations::{IrInitDefaults, IrOperation};
use super::schemas::IrModel;

/// Everything the emitters need from one root document.
#[derive(Debug, Clone)]
pub struct IrSpec {
    pub info: IrInfo,
    pub version: DocumentVersion,
    /// Type descriptions, sorted by canonical origin pointer.
    pub models: Vec<IrModel>,
    /// Every model-defining pointer and the class it maps to, sorted by
    /// pointer. Several pointers may share a class.
    pub pointers: Vec<(Pointer, String)>,
    pub operations: Vec<IrOperation>,
    pub init_defaults: IrInitDefaults,
}

impl IrSpec {
    pub fn model(&self, name: &str) -> Option<&IrModel> {
        self.models.iter().find(|model| model.name == name)
    }
}

/// API metadata.
#[derive(Debug, Clone, Default)]
pub struct IrInfo {
    pub title: String,
    pub description: Option<String>,
    pub version: String,
}
