use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

/// Top-level project configuration loaded from `.oapigen.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Path or URL of the OpenAPI document.
    pub input: String,
    pub model: ModelConfig,
    pub client: ClientConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            input: "openapi.yaml".to_string(),
            model: ModelConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

/// Model module options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub output: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            output: "model.py".to_string(),
        }
    }
}

/// Client module options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Where to write the client module. No client is generated when unset.
    pub output: Option<String>,
    pub class_name: String,
    /// Dotted path of the runtime base class.
    pub base_class: String,
    pub use_operation_id: bool,
    /// Extra import statements, emitted verbatim.
    pub imports: Vec<String>,
    /// Init parameter name → Python expression overriding the inferred default.
    pub init_parameter_defaults: IndexMap<String, String>,
    /// Extra init parameter declarations, e.g. `region: str = "eu"`.
    pub add_init_parameters: Vec<String>,
    /// Init parameters to keep. Empty keeps all of them.
    pub include_init_parameters: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            output: None,
            class_name: "Client".to_string(),
            base_class: "oapi.client.Client".to_string(),
            use_operation_id: false,
            imports: Vec::new(),
            init_parameter_defaults: IndexMap::new(),
            add_init_parameters: Vec::new(),
            include_init_parameters: Vec::new(),
        }
    }
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".oapigen.yaml";

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<GeneratorConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
    let config: GeneratorConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))?;
    Ok(Some(config))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# oapigen configuration
input: openapi.yaml   # path or URL

model:
  output: model.py

client:
  output: client.py     # remove to skip the client module
  class_name: Client
  base_class: oapi.client.Client
  use_operation_id: false
  imports: []
    # - import os
  init_parameter_defaults: {}
    # timeout: "30"
    # url: os.environ["API_URL"]
  add_init_parameters: []
    # - "region: str = \"eu\""
  include_init_parameters: []   # empty keeps every parameter
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeneratorConfig::default();
        assert_eq!(config.input, "openapi.yaml");
        assert_eq!(config.model.output, "model.py");
        assert_eq!(config.client.output, None);
        assert_eq!(config.client.class_name, "Client");
        assert_eq!(config.client.base_class, "oapi.client.Client");
        assert!(!config.client.use_operation_id);
        assert!(config.client.init_parameter_defaults.is_empty());
    }

    #[test]
    fn test_default_content_parses() {
        let config: GeneratorConfig = serde_yaml_ng::from_str(default_config_content()).unwrap();
        assert_eq!(config.client.output.as_deref(), Some("client.py"));
        assert!(config.client.include_init_parameters.is_empty());
    }

    #[test]
    fn test_parse_config_yaml() {
        let yaml = r#"
input: https://example.com/openapi.json
model:
  output: api/model.py
client:
  output: api/client.py
  class_name: PetStore
  base_class: petstore.base.Client
  use_operation_id: true
  imports:
    - import os
  init_parameter_defaults:
    url: os.environ["PETSTORE_URL"]
  add_init_parameters:
    - "region: str = \"eu\""
  include_init_parameters: [url, api_key, timeout]
"#;
        let config: GeneratorConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.input, "https://example.com/openapi.json");
        assert_eq!(config.model.output, "api/model.py");
        assert_eq!(config.client.output.as_deref(), Some("api/client.py"));
        assert_eq!(config.client.class_name, "PetStore");
        assert!(config.client.use_operation_id);
        assert_eq!(config.client.imports, vec!["import os"]);
        assert_eq!(
            config.client.init_parameter_defaults["url"],
            "os.environ[\"PETSTORE_URL\"]"
        );
        assert_eq!(config.client.add_init_parameters, vec!["region: str = \"eu\""]);
        assert_eq!(config.client.include_init_parameters.len(), 3);
    }

    #[test]
    fn test_parse_minimal_config() {
        let yaml = "input: api.yaml\n";
        let config: GeneratorConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.input, "api.yaml");
        // Defaults applied
        assert_eq!(config.model.output, "model.py");
        assert_eq!(config.client.output, None);
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert!(loaded.is_none());
    }
}
