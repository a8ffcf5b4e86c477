//! Variant-Generation Pipeline
//!
//! Orchestrates one run: walk all content units in id order, skip units that
//! already have variants, generate each tier through the retrying generator,
//! persist successes immediately, pace requests, and report a summary.
//! Execution is strictly sequential: one provider call in flight at a time,
//! with a fixed delay between tier requests.

use crate::error::PipelineError;
use crate::generator::VariantGenerator;
use crate::store::{UnitStore, VariantStore};
use crate::types::{ContentUnit, ContentVariant, Tier};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{info, warn};

/// Pipeline pacing configuration
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Fixed delay between tier requests, successful or not
    pub pace_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pace_delay: Duration::from_millis(500),
        }
    }
}

/// Summary of one pipeline run. Ephemeral; never persisted.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Units seen in the store
    pub units_total: usize,
    /// Units skipped because variants already existed
    pub units_skipped: usize,
    /// Variants generated and persisted
    pub variants_written: usize,
    /// Tier requests that produced no variant
    pub tier_failures: usize,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} units ({} skipped), {} variants written, {} failures in {}ms",
            self.units_total,
            self.units_skipped,
            self.variants_written,
            self.tier_failures,
            self.duration_ms
        )
    }
}

/// Drives one full generation run over the unit store
pub struct Pipeline {
    units: Arc<dyn UnitStore>,
    variants: Arc<dyn VariantStore>,
    generator: VariantGenerator,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        units: Arc<dyn UnitStore>,
        variants: Arc<dyn VariantStore>,
        generator: VariantGenerator,
        config: PipelineConfig,
    ) -> Self {
        Self {
            units,
            variants,
            generator,
            config,
        }
    }

    /// Process every unit once.
    ///
    /// Tier failures are recorded and skipped past; store errors and template
    /// misses abort the run. Rerunning after an abort is safe: covered units
    /// are skipped, and reprocessed units overwrite via upsert.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let start = Instant::now();
        let units = self.units.list_units()?;
        let mut summary = RunSummary {
            units_total: units.len(),
            ..RunSummary::default()
        };

        info!(units = units.len(), "Starting variant generation run");

        for unit in &units {
            // Coarse-grained idempotence: any existing variant skips the whole
            // unit. Partial coverage is not topped up.
            let existing = self.variants.count_existing(&unit.unit_id)?;
            if existing > 0 {
                info!(unit_id = %unit.unit_id, existing, "Skipping unit, variants exist");
                summary.units_skipped += 1;
                continue;
            }

            info!(unit_id = %unit.unit_id, title = %unit.title, "Processing unit");
            self.process_unit(unit, &mut summary).await?;
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            units = summary.units_total,
            skipped = summary.units_skipped,
            written = summary.variants_written,
            failures = summary.tier_failures,
            duration_ms = summary.duration_ms,
            "Run complete"
        );

        Ok(summary)
    }

    async fn process_unit(
        &self,
        unit: &ContentUnit,
        summary: &mut RunSummary,
    ) -> Result<(), PipelineError> {
        for tier in Tier::ALL {
            match self.generator.generate(tier, &unit.body).await? {
                Some(text) => {
                    self.variants
                        .upsert(&ContentVariant::new(&unit.unit_id, tier, &unit.title, text))?;
                    summary.variants_written += 1;
                    info!(unit_id = %unit.unit_id, tier = %tier, "Variant persisted");
                }
                None => {
                    summary.tier_failures += 1;
                    warn!(unit_id = %unit.unit_id, tier = %tier, "Variant generation failed");
                }
            }

            // Pace the next request regardless of outcome
            sleep(self.config.pace_delay).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::RetryPolicy;
    use crate::prompt::TemplateSet;
    use crate::provider::{MockCompletionClient, MockFailure};
    use crate::store::SledContentStore;
    use tempfile::TempDir;

    fn seed_unit(store: &SledContentStore, id: &str) {
        store
            .put_unit(&ContentUnit {
                unit_id: id.to_string(),
                title: format!("Unit {}", id),
                body: format!("Body of {}", id),
            })
            .unwrap();
    }

    fn seed_full_coverage(store: &SledContentStore, id: &str) {
        for tier in Tier::ALL {
            store
                .upsert(&ContentVariant::new(
                    id,
                    tier,
                    &format!("Unit {}", id),
                    "existing".to_string(),
                ))
                .unwrap();
        }
    }

    fn pipeline(store: Arc<SledContentStore>, client: Arc<MockCompletionClient>) -> Pipeline {
        let generator = VariantGenerator::new(
            client,
            TemplateSet::builtin(),
            RetryPolicy::default(),
        );
        Pipeline::new(store.clone(), store, generator, PipelineConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_covered_unit_makes_no_calls() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SledContentStore::new(temp_dir.path()).unwrap());
        seed_unit(&store, "ch1-1");
        seed_full_coverage(&store, "ch1-1");

        let client = Arc::new(MockCompletionClient::always_ok("new text"));
        let summary = pipeline(store.clone(), client.clone()).run().await.unwrap();

        assert_eq!(client.calls(), 0);
        assert_eq!(summary.units_skipped, 1);
        assert_eq!(summary.variants_written, 0);
        // Existing rows untouched
        assert_eq!(
            store.get("ch1-1", Tier::Simple).unwrap().unwrap().text,
            "existing"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_partially_covered_unit_is_skipped_whole() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SledContentStore::new(temp_dir.path()).unwrap());
        seed_unit(&store, "ch1-1");
        store
            .upsert(&ContentVariant::new(
                "ch1-1",
                Tier::Simple,
                "Unit ch1-1",
                "only simple".to_string(),
            ))
            .unwrap();

        let client = Arc::new(MockCompletionClient::always_ok("new text"));
        let summary = pipeline(store.clone(), client.clone()).run().await.unwrap();

        assert_eq!(client.calls(), 0);
        assert_eq!(summary.units_skipped, 1);
        assert_eq!(store.count_existing("ch1-1").unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tier_failures_are_independent() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SledContentStore::new(temp_dir.path()).unwrap());
        seed_unit(&store, "ch1-1");

        // simple fails hard, normal and advanced succeed
        let client = Arc::new(MockCompletionClient::new(vec![
            Err(MockFailure::Provider),
            Ok("normal text".to_string()),
            Ok("advanced text".to_string()),
        ]));
        let summary = pipeline(store.clone(), client.clone()).run().await.unwrap();

        assert_eq!(client.calls(), 3, "run must continue past the failed tier");
        assert_eq!(summary.variants_written, 2);
        assert_eq!(summary.tier_failures, 1);
        assert!(store.get("ch1-1", Tier::Simple).unwrap().is_none());
        assert_eq!(
            store.get("ch1-1", Tier::Normal).unwrap().unwrap().text,
            "normal text"
        );
        assert_eq!(
            store.get("ch1-1", Tier::Advanced).unwrap().unwrap().text,
            "advanced text"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_scenario_mixed_units() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SledContentStore::new(temp_dir.path()).unwrap());
        seed_unit(&store, "ch1-1");
        seed_unit(&store, "ch1-2");
        seed_full_coverage(&store, "ch1-1");

        let client = Arc::new(MockCompletionClient::always_ok("generated"));
        let summary = pipeline(store.clone(), client.clone()).run().await.unwrap();

        assert_eq!(client.calls(), 3);
        assert_eq!(summary.units_total, 2);
        assert_eq!(summary.units_skipped, 1);
        assert_eq!(summary.variants_written, 3);
        assert_eq!(summary.tier_failures, 0);
        assert_eq!(store.count_existing("ch1-2").unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_variant_title_echoes_unit_title() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SledContentStore::new(temp_dir.path()).unwrap());
        seed_unit(&store, "ch1-1");

        let client = Arc::new(MockCompletionClient::always_ok("generated"));
        pipeline(store.clone(), client).run().await.unwrap();

        let stored = store.get("ch1-1", Tier::Normal).unwrap().unwrap();
        assert_eq!(stored.title, "Unit ch1-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_store_reports_zero_run() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SledContentStore::new(temp_dir.path()).unwrap());
        let client = Arc::new(MockCompletionClient::always_ok("x"));
        let summary = pipeline(store, client.clone()).run().await.unwrap();

        assert_eq!(summary.units_total, 0);
        assert_eq!(client.calls(), 0);
    }
}
