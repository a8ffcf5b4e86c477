//! Prompt templates for tiered rewrites.
//!
//! One fixed template per difficulty tier. Rendering embeds the source body
//! verbatim; the heading structure each template asks for is a contract with
//! the model, not something the pipeline validates.

use crate::error::PipelineError;
use crate::types::Tier;
use std::collections::HashMap;

/// Placeholder the source body is substituted into
const SOURCE_SLOT: &str = "{source}";

const SIMPLE_TEMPLATE: &str = "\
You are a tutor for students who struggle with the subject.
Rewrite the following material as a VERY SIMPLE explanation:

SOURCE MATERIAL:
{source}

RULES:
1. Use plain language a beginner understands
2. Explain step by step, in detail
3. Use everyday analogies
4. Give one easy worked example
5. Avoid technical jargon
6. Format with markdown headings and bullet points

OUTPUT SHAPE:
## [Topic title]

[Simple explanation with an analogy]

### Steps
1. [First step, explained in detail]
2. [Next step]

### Easy example
[A simple problem with a full solution]

### Remember
[One short tip worth memorizing]
";

const NORMAL_TEMPLATE: &str = "\
You are a tutor for students at grade level.
Rewrite the following material as a CLEAR, STRUCTURED explanation:

SOURCE MATERIAL:
{source}

RULES:
1. Explain the concepts clearly and in order
2. State the important formulas or definitions with explanations
3. Include two worked examples at different difficulty
4. Use tidy markdown formatting
5. Use correct notation (LaTeX with $$ for display blocks where it applies)

OUTPUT SHAPE:
## [Topic title]

### Core concepts
[Explanation]

### Key formulas
$$[formula]$$
Where: [meaning of each symbol]

### Worked example 1 (easy)
[Problem and solution]

### Worked example 2 (medium)
[Problem and solution]

### Summary
[Bullet list of the essential points]
";

const ADVANCED_TEMPLATE: &str = "\
You are a tutor for students who are already fluent in the subject.
Rewrite the following material as a CONCISE, CHALLENGING explanation:

SOURCE MATERIAL:
{source}

RULES:
1. Go straight to the substance, no warm-up
2. Focus on the harder ideas and their applications
3. Pose challenging problems
4. Connect to more advanced related topics
5. Use formal notation (LaTeX with $$)

OUTPUT SHAPE:
## [Topic title]

### Key ideas
[Short, dense explanation]

### Formulas
$$[formula]$$

### Challenge problems
1. [Hard problem]
2. [Hard problem]

### Going further
[Pointer to the related advanced topic]
";

/// Immutable mapping from tier to its prompt template
#[derive(Debug, Clone)]
pub struct TemplateSet {
    templates: HashMap<Tier, String>,
}

impl TemplateSet {
    /// The built-in set, covering all three tiers.
    pub fn builtin() -> Self {
        let mut templates = HashMap::new();
        templates.insert(Tier::Simple, SIMPLE_TEMPLATE.to_string());
        templates.insert(Tier::Normal, NORMAL_TEMPLATE.to_string());
        templates.insert(Tier::Advanced, ADVANCED_TEMPLATE.to_string());
        Self { templates }
    }

    /// Build a set from explicit templates. Templates must contain the
    /// `{source}` slot; tiers without an entry fail at render time.
    pub fn with_templates(templates: HashMap<Tier, String>) -> Self {
        Self { templates }
    }

    /// Render the full instruction string for a tier.
    ///
    /// Pure; embeds `body` verbatim. Fails with `UnknownTier` when this set
    /// carries no template for the requested tier.
    pub fn render(&self, tier: Tier, body: &str) -> Result<String, PipelineError> {
        let template = self
            .templates
            .get(&tier)
            .ok_or_else(|| PipelineError::UnknownTier(tier.as_str().to_string()))?;
        Ok(template.replace(SOURCE_SLOT, body))
    }
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::builtin()
    }
}
