use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{BranchContext, BranchError, GenerationStrategy, Preserve};
use crate::generator::ContentGenerator;
use crate::prompts;
use crate::state_machine::Mode;

pub type SkillMap = BTreeMap<String, String>;

#[derive(Debug, Deserialize)]
struct SkillsReply {
    technical_skills: BTreeMap<String, Value>,
}

/// Regenerated skill categories from the target's keywords.
pub struct FreshSkills {
    generator: Arc<dyn ContentGenerator>,
}

impl FreshSkills {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl GenerationStrategy<SkillMap> for FreshSkills {
    fn name(&self) -> &'static str {
        "fresh_skills"
    }

    async fn generate(
        &self,
        ctx: &BranchContext,
        source: &SkillMap,
    ) -> Result<SkillMap, BranchError> {
        let contract = prompts::skills_contract();
        let reply: SkillsReply = self
            .generator
            .complete(
                &prompts::skills_prompt(&ctx.hints, source),
                Some(&contract),
                ctx.remaining(),
            )
            .await?
            .parse()?;

        let skills = flatten_categories(reply.technical_skills);
        if skills.is_empty() {
            return Err(BranchError::Parse("no skill categories in reply".into()));
        }
        Ok(skills)
    }
}

/// Category values arrive as lists or strings; store them as one
/// comma-separated line and drop empty categories.
fn flatten_categories(raw: BTreeMap<String, Value>) -> SkillMap {
    raw.into_iter()
        .filter_map(|(category, value)| {
            let line = match value {
                Value::String(s) => s.trim().to_string(),
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(", "),
                _ => String::new(),
            };
            let category = category.trim().to_string();
            (!category.is_empty() && !line.is_empty()).then_some((category, line))
        })
        .collect()
}

pub fn strategy(
    mode: Mode,
    generator: Arc<dyn ContentGenerator>,
) -> Arc<dyn GenerationStrategy<SkillMap>> {
    match mode {
        Mode::GenerateFresh => Arc::new(FreshSkills::new(generator)),
        Mode::LightEdit => Arc::new(Preserve),
    }
}
