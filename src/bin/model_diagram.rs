//! Print the diagram of a package's visual model
//!
//! Reads a package document (JSON), loads it into an in-memory backend,
//! activates a visual model and writes the synthesized diagram as JSON.

use anyhow::Context;
use clap::Parser;
use conceptual_model_editor::{
    EditorConfig, EditorContext, InMemoryExternalSource, InMemoryPackageBackend, PackageDocument,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Synthesize the diagram of a conceptual model package
#[derive(Parser, Debug)]
#[command(name = "model-diagram")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Package document (.json)
    package: PathBuf,

    /// Visual model to show; the first one of the package by default
    #[arg(short, long)]
    visual_model: Option<String>,

    /// Configuration file (.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Language labels are shown in
    #[arg(short, long)]
    language: Option<String>,

    /// Write the diagram here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> anyhow::Result<EditorConfig> {
    let mut config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::from_env()?,
    };
    if let Some(language) = &cli.language {
        config.preferred_language = language.clone();
    }
    config.validate()?;
    Ok(config)
}

fn read_document(path: &Path) -> anyhow::Result<PackageDocument> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading package {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing package {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let document = read_document(&cli.package)?;

    let backend = Arc::new(InMemoryPackageBackend::new(config.package_root_url.clone()));
    let package = backend.insert_document(document);
    let mut context = EditorContext::new(
        config,
        backend,
        Arc::new(InMemoryExternalSource::new(Vec::new())),
    );
    context.load_package(&package.iri).await?;

    if let Some(visual_model) = &cli.visual_model {
        context
            .view()
            .change_active_visual_model(Some(visual_model))?;
    }
    if context.view().active_visual_model_id().is_none() {
        anyhow::bail!("package {} has no visual model", package.iri);
    }

    let mut synchronizer = context.synchronizer();
    synchronizer.process_pending();
    let diagram = serde_json::to_string_pretty(&synchronizer.diagram())?;

    match &cli.output {
        Some(path) => std::fs::write(path, diagram)
            .with_context(|| format!("writing diagram to {}", path.display()))?,
        None => println!("{diagram}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_package_and_options() {
        let cli = Cli::try_parse_from([
            "model-diagram",
            "package.json",
            "--visual-model",
            "layout",
            "--language",
            "cs",
        ])
        .unwrap();
        assert_eq!(cli.package, PathBuf::from("package.json"));
        assert_eq!(cli.visual_model.as_deref(), Some("layout"));
        assert_eq!(cli.language.as_deref(), Some("cs"));
        assert!(cli.config.is_none());
    }

    #[test]
    fn cli_requires_package() {
        assert!(Cli::try_parse_from(["model-diagram"]).is_err());
    }
}
