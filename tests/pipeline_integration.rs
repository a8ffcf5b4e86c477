//! End-to-end pipeline scenarios against a real sled store.

use async_trait::async_trait;
use retell::error::CompletionError;
use retell::generator::{RetryPolicy, VariantGenerator};
use retell::pipeline::{Pipeline, PipelineConfig};
use retell::prompt::TemplateSet;
use retell::provider::CompletionClient;
use retell::store::{SledContentStore, UnitStore, VariantStore};
use retell::types::{ContentUnit, ContentVariant, Tier};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Client that echoes a tier-visible rewrite and counts calls
struct EchoClient {
    calls: AtomicUsize,
}

impl EchoClient {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for EchoClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("rewrite #{}: {} chars of prompt", n + 1, prompt.len()))
    }

    fn provider_name(&self) -> &str {
        "echo"
    }

    fn model_name(&self) -> &str {
        "echo-model"
    }
}

/// Client that rate-limits every call
struct ThrottledClient;

#[async_trait]
impl CompletionClient for ThrottledClient {
    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        Err(CompletionError::RateLimited("429".to_string()))
    }

    fn provider_name(&self) -> &str {
        "throttled"
    }

    fn model_name(&self) -> &str {
        "throttled-model"
    }
}

fn open_store(temp_dir: &TempDir) -> Arc<SledContentStore> {
    Arc::new(SledContentStore::new(temp_dir.path().join("store")).unwrap())
}

fn seed_units(store: &SledContentStore, ids: &[&str]) {
    let units: Vec<ContentUnit> = ids
        .iter()
        .map(|id| ContentUnit {
            unit_id: id.to_string(),
            title: format!("Unit {}", id),
            body: format!("Source body for {}", id),
        })
        .collect();
    store.put_units(&units).unwrap();
}

fn pipeline(store: Arc<SledContentStore>, client: Arc<dyn CompletionClient>) -> Pipeline {
    let generator = VariantGenerator::new(client, TemplateSet::builtin(), RetryPolicy::default());
    Pipeline::new(
        store.clone() as Arc<dyn UnitStore>,
        store as Arc<dyn VariantStore>,
        generator,
        PipelineConfig::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn two_uncovered_units_yield_six_variants() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    seed_units(&store, &["ch1-1", "ch1-2"]);

    let client = Arc::new(EchoClient::new());
    let summary = pipeline(store.clone(), client.clone()).run().await.unwrap();

    assert_eq!(summary.units_total, 2);
    assert_eq!(summary.units_skipped, 0);
    assert_eq!(summary.variants_written, 6);
    assert_eq!(summary.tier_failures, 0);
    assert_eq!(client.calls(), 6);
    assert_eq!(store.variant_count().unwrap(), 6);

    for id in ["ch1-1", "ch1-2"] {
        for tier in Tier::ALL {
            let variant = store.get(id, tier).unwrap().unwrap();
            assert_eq!(variant.title, format!("Unit {}", id));
            assert!(!variant.text.is_empty());
        }
    }
}

#[tokio::test(start_paused = true)]
async fn rerun_after_full_coverage_is_a_noop() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    seed_units(&store, &["ch1-1"]);

    let first = Arc::new(EchoClient::new());
    pipeline(store.clone(), first).run().await.unwrap();
    let texts_before: Vec<String> = Tier::ALL
        .iter()
        .map(|t| store.get("ch1-1", *t).unwrap().unwrap().text)
        .collect();

    let second = Arc::new(EchoClient::new());
    let summary = pipeline(store.clone(), second.clone()).run().await.unwrap();

    assert_eq!(second.calls(), 0);
    assert_eq!(summary.units_skipped, 1);
    assert_eq!(summary.variants_written, 0);
    let texts_after: Vec<String> = Tier::ALL
        .iter()
        .map(|t| store.get("ch1-1", *t).unwrap().unwrap().text)
        .collect();
    assert_eq!(texts_before, texts_after);
}

#[tokio::test(start_paused = true)]
async fn covered_and_uncovered_units_mix() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    seed_units(&store, &["ch1-1", "ch1-2"]);
    for tier in Tier::ALL {
        store
            .upsert(&ContentVariant::new(
                "ch1-1",
                tier,
                "Unit ch1-1",
                "preexisting".to_string(),
            ))
            .unwrap();
    }

    let client = Arc::new(EchoClient::new());
    let summary = pipeline(store.clone(), client.clone()).run().await.unwrap();

    assert_eq!(client.calls(), 3);
    assert_eq!(summary.units_skipped, 1);
    assert_eq!(summary.variants_written, 3);
    assert_eq!(store.count_existing("ch1-2").unwrap(), 3);
    assert_eq!(
        store.get("ch1-1", Tier::Simple).unwrap().unwrap().text,
        "preexisting"
    );
}

#[tokio::test(start_paused = true)]
async fn permanently_throttled_provider_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    seed_units(&store, &["ch1-1"]);

    let summary = pipeline(store.clone(), Arc::new(ThrottledClient))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.variants_written, 0);
    assert_eq!(summary.tier_failures, 3);
    assert_eq!(store.variant_count().unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn clear_all_then_rerun_regenerates() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    seed_units(&store, &["ch1-1"]);

    pipeline(store.clone(), Arc::new(EchoClient::new()))
        .run()
        .await
        .unwrap();
    assert_eq!(store.variant_count().unwrap(), 3);

    assert_eq!(store.clear_all().unwrap(), 3);

    let client = Arc::new(EchoClient::new());
    let summary = pipeline(store.clone(), client.clone()).run().await.unwrap();
    assert_eq!(client.calls(), 3);
    assert_eq!(summary.variants_written, 3);
    assert_eq!(store.variant_count().unwrap(), 3);
}
