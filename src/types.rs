//! Core data types shared across the pipeline.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Difficulty tier of a generated variant
///
/// Closed set. `ALL` fixes the order tiers are generated and presented in;
/// the order carries no correctness weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Simple,
    Normal,
    Advanced,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Simple, Tier::Normal, Tier::Advanced];

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Simple => "simple",
            Tier::Normal => "normal",
            Tier::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(Tier::Simple),
            "normal" => Ok(Tier::Normal),
            "advanced" => Ok(Tier::Advanced),
            other => Err(PipelineError::UnknownTier(other.to_string())),
        }
    }
}

/// One addressable chunk of source textbook material
///
/// Deposited by the upstream producer (see `ingest`); never mutated by the
/// pipeline. `unit_id` is unique across the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUnit {
    pub unit_id: String,
    pub title: String,
    pub body: String,
}

/// A tier-specific rewrite of a content unit
///
/// At most one variant exists per `(unit_id, tier)` pair; writes go through
/// the store's keyed upsert and replace the row wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentVariant {
    pub unit_id: String,
    pub tier: Tier,
    pub title: String,
    pub text: String,
    /// RFC 3339 creation timestamp, reset on every replace
    pub created_at: String,
}

impl ContentVariant {
    pub fn new(unit_id: &str, tier: Tier, title: &str, text: String) -> Self {
        Self {
            unit_id: unit_id.to_string(),
            tier,
            title: title.to_string(),
            text,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
