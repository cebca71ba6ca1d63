use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use log::info;

use oapigen_core::config::{self, CONFIG_FILE_NAME, GeneratorConfig};
use oapigen_core::ir::{IrSpec, IrType};
use oapigen_python::generator::model_ir;
use oapigen_python::type_mapper::PythonTypes;
use oapigen_python::{ClientOptions, DocumentSource, ModelOptions};

#[derive(Parser)]
#[command(
    name = "oapigen",
    about = "Generate Python model and client modules from OpenAPI 2.0/3.x documents",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the model module and, when configured, the client module
    Generate {
        /// Path or URL of the OpenAPI document (YAML or JSON)
        #[arg(short, long)]
        input: Option<String>,

        /// Where to write the model module
        #[arg(long)]
        model: Option<PathBuf>,

        /// Where to write the client module
        #[arg(long)]
        client: Option<PathBuf>,
    },

    /// Resolve every schema and operation of a document
    Validate {
        /// Path or URL of the OpenAPI document
        #[arg(short, long)]
        input: String,
    },

    /// Print the type descriptions and operation records of a document
    Inspect {
        /// Path or URL of the OpenAPI document
        #[arg(short, long)]
        input: String,

        /// Output format
        #[arg(long, default_value = "yaml")]
        format: InspectFormat,
    },

    /// Print a document with every reference replaced by its target
    Dereference {
        /// Path or URL of the OpenAPI document
        #[arg(short, long)]
        input: String,
    },

    /// Write a default oapigen configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Clone, ValueEnum)]
enum InspectFormat {
    Yaml,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            input,
            model,
            client,
        } => cmd_generate(input, model, client),

        Commands::Validate { input } => cmd_validate(&input),

        Commands::Inspect { input, format } => cmd_inspect(&input, format),

        Commands::Dereference { input } => cmd_dereference(&input),

        Commands::Init { force } => cmd_init(force),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "oapigen", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Try to load the project config file from the current directory.
fn try_load_config() -> Result<Option<GeneratorConfig>> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);
    config::load_config(&config_path).map_err(|e| anyhow::anyhow!(e))
}

fn cmd_generate(input: Option<String>, model: Option<PathBuf>, client: Option<PathBuf>) -> Result<()> {
    let cfg = try_load_config()?.unwrap_or_default();
    let source = DocumentSource::parse(input.as_deref().unwrap_or(&cfg.input));
    let model_path = model.unwrap_or_else(|| PathBuf::from(&cfg.model.output));

    oapigen_python::write_model_module(&model_path, &source, ModelOptions::default())
        .with_context(|| format!("failed to generate {}", model_path.display()))?;
    eprintln!("  wrote {}", model_path.display());

    let client_path = client.or_else(|| cfg.client.output.as_ref().map(PathBuf::from));
    if let Some(client_path) = client_path {
        oapigen_python::write_client_module(
            &client_path,
            &source,
            &model_path,
            ClientOptions::from(&cfg.client),
        )
        .with_context(|| format!("failed to generate {}", client_path.display()))?;
        eprintln!("  wrote {}", client_path.display());
    } else {
        info!("no client output configured");
    }
    Ok(())
}

fn cmd_validate(input: &str) -> Result<()> {
    let ir = model_ir(&DocumentSource::parse(input), ModelOptions::default())
        .with_context(|| format!("failed to resolve {input}"))?;

    eprintln!(
        "Valid OpenAPI {}.{} document: {}",
        ir.version.major, ir.version.minor, ir.info.title
    );
    eprintln!("  Version: {}", ir.info.version);
    eprintln!("  Classes: {}", ir.models.len());
    eprintln!("  Schema pointers: {}", ir.pointers.len());
    eprintln!("  Operations: {}", ir.operations.len());
    eprintln!("Validation successful.");
    Ok(())
}

fn cmd_inspect(input: &str, format: InspectFormat) -> Result<()> {
    let ir = model_ir(&DocumentSource::parse(input), ModelOptions::default())
        .with_context(|| format!("failed to resolve {input}"))?;

    let summary = build_inspect_summary(&ir);

    match format {
        InspectFormat::Yaml => {
            let yaml = serde_yaml_ng::to_string(&summary)?;
            print!("{}", yaml);
        }
        InspectFormat::Json => {
            let json = serde_json::to_string_pretty(&summary)?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn build_inspect_summary(ir: &IrSpec) -> serde_json::Value {
    let types = PythonTypes::local();
    let hints = |members: &[IrType]| -> Vec<String> { members.iter().map(|t| types.hint(t)).collect() };

    let models: Vec<serde_json::Value> = ir
        .models
        .iter()
        .map(|m| {
            let fields: Vec<serde_json::Value> = m
                .fields
                .iter()
                .map(|f| {
                    serde_json::json!({
                        "name": f.name,
                        "wire_name": f.wire_name,
                        "type": types.hint(&f.field_type),
                        "required": f.required,
                    })
                })
                .collect();
            serde_json::json!({
                "name": m.name,
                "base": m.base.to_string(),
                "origin": m.origin.to_string(),
                "fields": fields,
                "item_types": hints(&m.item_types),
                "value_types": hints(&m.value_types),
            })
        })
        .collect();

    let operations: Vec<serde_json::Value> = ir
        .operations
        .iter()
        .map(|op| {
            let parameters: Vec<serde_json::Value> = op
                .parameters
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "name": p.argument_name,
                        "wire_name": p.wire_name,
                        "in": p.location.as_str(),
                        "style": p.style.as_str(),
                        "explode": p.explode,
                        "required": p.required,
                        "type": types.hint(&p.param_type),
                    })
                })
                .collect();
            serde_json::json!({
                "name": op.method_name,
                "method": op.method.as_str(),
                "path": op.path,
                "parameters": parameters,
                "multipart": op.multipart,
                "returns": hints(&op.response_types),
                "deprecated": op.deprecated,
            })
        })
        .collect();

    serde_json::json!({
        "info": {
            "title": ir.info.title,
            "version": ir.info.version,
        },
        "models": models,
        "operations": operations,
    })
}

fn cmd_dereference(input: &str) -> Result<()> {
    let mut resolver = DocumentSource::parse(input)
        .resolver()
        .with_context(|| format!("failed to load {input}"))?;
    let document = resolver
        .dereference()
        .with_context(|| format!("failed to dereference {input}"))?;
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, config::default_config_content())?;
    eprintln!("Created {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_generate() {
        let cli = Cli::try_parse_from(["oapigen", "generate", "-i", "api.yaml", "--client", "out/client.py"]).unwrap();
        match cli.command {
            Commands::Generate { input, model, client } => {
                assert_eq!(input.as_deref(), Some("api.yaml"));
                assert!(model.is_none());
                assert_eq!(client, Some(PathBuf::from("out/client.py")));
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_inspect_summary() {
        let document = serde_json::json!({
            "swagger": "2.0",
            "info": {"title": "Pets", "version": "1"},
            "paths": {},
            "definitions": {
                "Pet": {"type": "object", "properties": {"id": {"type": "integer"}}}
            }
        });
        let source = DocumentSource::Value { document, base_url: None };
        let ir = model_ir(&source, ModelOptions::default()).unwrap();
        let summary = build_inspect_summary(&ir);
        assert_eq!(summary["models"][0]["name"], "Pet");
        assert_eq!(summary["models"][0]["origin"], "#/definitions/Pet");
        assert_eq!(summary["models"][0]["fields"][0]["type"], "int");
    }
}
