//! CLI domain: clap definitions and command routing.
//!
//! Parse types carry no behavior; `RunContext` owns the opened store and
//! dispatches each command to the domain modules.

use crate::config::RetellConfig;
use crate::error::PipelineError;
use crate::generator::VariantGenerator;
use crate::ingest::ingest_units;
use crate::pipeline::Pipeline;
use crate::prompt::TemplateSet;
use crate::provider::ProviderFactory;
use crate::store::{SledContentStore, UnitStore, VariantStore};
use crate::types::Tier;
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Retell CLI - difficulty-graded rewrites of textbook content
#[derive(Parser)]
#[command(name = "retell")]
#[command(about = "Generate difficulty-graded rewrites of stored textbook content")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Store directory (overrides configuration)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Disable logging output
    #[arg(long)]
    pub quiet: bool,

    /// Enable verbose logging
    #[arg(long)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load content units from a JSON document
    Ingest {
        /// Path to a JSON array of {unit_id, title, body} objects
        file: PathBuf,

        /// Clear existing units before loading
        #[arg(long)]
        replace: bool,
    },
    /// Run the variant-generation pipeline
    Generate {
        /// Clear all existing variants first (prompts for confirmation)
        #[arg(long)]
        regenerate: bool,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show unit and variant coverage
    Status {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

/// Owns the opened store and executes commands against it
pub struct RunContext {
    config: RetellConfig,
    store: Arc<SledContentStore>,
}

impl RunContext {
    pub fn new(
        config: RetellConfig,
        data_dir_override: Option<PathBuf>,
    ) -> Result<Self, PipelineError> {
        let data_dir =
            data_dir_override.unwrap_or_else(|| config.storage.resolve_data_dir());
        let store = SledContentStore::new(&data_dir)?;
        info!(data_dir = %data_dir.display(), "Store opened");
        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    pub async fn execute(&self, command: &Commands) -> Result<String, PipelineError> {
        match command {
            Commands::Ingest { file, replace } => {
                let report = ingest_units(
                    self.store.as_ref(),
                    file,
                    self.config.generation.body_cap,
                    *replace,
                )?;
                Ok(format!(
                    "Ingested {} units ({} truncated, {} cleared)",
                    report.loaded, report.truncated, report.cleared
                ))
            }
            Commands::Generate { regenerate, yes } => self.generate(*regenerate, *yes).await,
            Commands::Status { format } => self.status(format),
        }
    }

    async fn generate(&self, regenerate: bool, yes: bool) -> Result<String, PipelineError> {
        if regenerate {
            let existing = self.store.variant_count()?;
            if existing > 0 {
                let confirmed = yes || confirm_clear(existing)?;
                if confirmed {
                    let removed = self.store.clear_all()?;
                    info!(removed, "Cleared existing variants");
                } else {
                    // Declined: fall through and let skip-if-covered apply
                    info!("Keeping existing variants, covered units will be skipped");
                }
            }
        }

        let client = ProviderFactory::create_client(&self.config.provider)?;
        info!(
            provider = client.provider_name(),
            model = client.model_name(),
            "Provider client ready"
        );

        let generator = VariantGenerator::new(
            Arc::from(client),
            TemplateSet::builtin(),
            self.config.generation.retry_policy(),
        );
        let pipeline = Pipeline::new(
            self.store.clone() as Arc<dyn UnitStore>,
            self.store.clone() as Arc<dyn VariantStore>,
            generator,
            self.config.generation.pipeline_config(),
        );

        let summary = pipeline.run().await?;
        Ok(format!("Run complete: {}", summary))
    }

    fn status(&self, format: &str) -> Result<String, PipelineError> {
        let units = self.store.list_units()?;
        let variant_total = self.store.variant_count()?;

        let mut coverage = Vec::new();
        for unit in &units {
            let mut tiers = Vec::new();
            for tier in Tier::ALL {
                if self.store.get(&unit.unit_id, tier)?.is_some() {
                    tiers.push(tier);
                }
            }
            coverage.push((unit, tiers));
        }

        match format {
            "json" => {
                let value = serde_json::json!({
                    "units": units.len(),
                    "variants": variant_total,
                    "coverage": coverage
                        .iter()
                        .map(|(unit, tiers)| {
                            serde_json::json!({
                                "unit_id": unit.unit_id,
                                "title": unit.title,
                                "tiers": tiers,
                            })
                        })
                        .collect::<Vec<_>>(),
                });
                serde_json::to_string_pretty(&value)
                    .map_err(|e| PipelineError::Config(format!("Failed to render status: {}", e)))
            }
            "text" => {
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(vec!["Unit", "Title", "Coverage", "Tiers"]);
                for (unit, tiers) in &coverage {
                    let fraction = format!("{}/{}", tiers.len(), Tier::ALL.len());
                    let colored = match tiers.len() {
                        0 => fraction.red().to_string(),
                        n if n == Tier::ALL.len() => fraction.green().to_string(),
                        _ => fraction.yellow().to_string(),
                    };
                    let tier_list = tiers
                        .iter()
                        .map(|t| t.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                    table.add_row(vec![
                        unit.unit_id.clone(),
                        unit.title.clone(),
                        colored,
                        tier_list,
                    ]);
                }
                Ok(format!(
                    "{}\n{} units, {} variants",
                    table, units.len(), variant_total
                ))
            }
            other => Err(PipelineError::Config(format!(
                "Invalid status format '{}' (expected text or json)",
                other
            ))),
        }
    }
}

fn confirm_clear(existing: usize) -> Result<bool, PipelineError> {
    dialoguer::Confirm::new()
        .with_prompt(format!(
            "Delete {} existing variants and regenerate everything?",
            existing
        ))
        .default(false)
        .interact()
        .map_err(|e| PipelineError::Config(format!("Confirmation prompt failed: {}", e)))
}
