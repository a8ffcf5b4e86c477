//! Bounded-retry generation of a single tier variant.
//!
//! Wraps a `CompletionClient` with the retry contract: rate limiting is
//! retried with linear backoff, any other provider failure ends the request
//! on the first attempt.

use crate::error::{CompletionError, PipelineError};
use crate::prompt::TemplateSet;
use crate::provider::CompletionClient;
use crate::types::Tier;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry policy for one tier request
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum completion attempts per request
    pub max_attempts: usize,
    /// Base backoff delay; attempt n waits n * base_delay
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(10),
        }
    }
}

/// Generates one variant text per call, retrying transient provider failures
pub struct VariantGenerator {
    client: Arc<dyn CompletionClient>,
    templates: TemplateSet,
    policy: RetryPolicy,
}

impl VariantGenerator {
    pub fn new(client: Arc<dyn CompletionClient>, templates: TemplateSet, policy: RetryPolicy) -> Self {
        Self {
            client,
            templates,
            policy,
        }
    }

    /// Generate the rewrite of `body` for `tier`.
    ///
    /// Returns `Ok(None)` when the provider failed non-transiently or retries
    /// were exhausted; the caller records a per-tier failure and moves on.
    /// An `UnknownTier` template miss propagates as an error.
    pub async fn generate(&self, tier: Tier, body: &str) -> Result<Option<String>, PipelineError> {
        let prompt = self.templates.render(tier, body)?;

        for attempt in 0..self.policy.max_attempts {
            match self.client.complete(&prompt).await {
                Ok(text) => {
                    debug!(
                        tier = %tier,
                        attempt = attempt + 1,
                        chars = text.len(),
                        "Generated variant"
                    );
                    return Ok(Some(text));
                }
                Err(CompletionError::RateLimited(msg)) => {
                    let remaining = self.policy.max_attempts - attempt - 1;
                    if remaining == 0 {
                        warn!(
                            tier = %tier,
                            attempts = self.policy.max_attempts,
                            "Rate limited on final attempt, giving up"
                        );
                        break;
                    }
                    let delay = self.policy.base_delay * (attempt as u32 + 1);
                    warn!(
                        tier = %tier,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %msg,
                        "Rate limited, backing off"
                    );
                    sleep(delay).await;
                }
                Err(CompletionError::Provider(msg)) => {
                    warn!(tier = %tier, error = %msg, "Provider error, not retrying");
                    return Ok(None);
                }
            }
        }

        Ok(None)
    }
}
