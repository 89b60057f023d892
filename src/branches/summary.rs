use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{BranchContext, BranchError, GenerationStrategy, Preserve};
use crate::generator::ContentGenerator;
use crate::prompts;
use crate::state_machine::Mode;

#[derive(Debug, Deserialize)]
struct SummaryReply {
    summary: String,
}

/// New summary written around the target's keywords.
pub struct FreshSummary {
    generator: Arc<dyn ContentGenerator>,
}

impl FreshSummary {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl GenerationStrategy<String> for FreshSummary {
    fn name(&self) -> &'static str {
        "fresh_summary"
    }

    async fn generate(&self, ctx: &BranchContext, source: &String) -> Result<String, BranchError> {
        let contract = prompts::summary_contract();
        let reply: SummaryReply = self
            .generator
            .complete(
                &prompts::summary_prompt(&ctx.hints, source),
                Some(&contract),
                ctx.remaining(),
            )
            .await?
            .parse()?;

        let summary = reply.summary.trim();
        if summary.is_empty() {
            return Err(BranchError::Parse("empty summary".into()));
        }
        Ok(summary.to_string())
    }
}

/// Light edits keep the summary verbatim.
pub fn strategy(
    mode: Mode,
    generator: Arc<dyn ContentGenerator>,
) -> Arc<dyn GenerationStrategy<String>> {
    match mode {
        Mode::GenerateFresh => Arc::new(FreshSummary::new(generator)),
        Mode::LightEdit => Arc::new(Preserve),
    }
}
