use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::{BranchContext, BranchError, BulletBalancer, GenerationStrategy};
use crate::document::ExperienceEntry;
use crate::generator::ContentGenerator;
use crate::prompts;
use crate::state_machine::Mode;
use crate::text::clean_bullet;

#[derive(Debug, Deserialize)]
struct ExperienceReply {
    experience: Vec<ExperienceEntry>,
}

/// Bullets written from scratch; the service only sees company, role and
/// period of each entry.
pub struct FreshExperience {
    generator: Arc<dyn ContentGenerator>,
    balancer: BulletBalancer,
}

impl FreshExperience {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self {
            balancer: BulletBalancer::new(generator.clone()),
            generator,
        }
    }
}

#[async_trait]
impl GenerationStrategy<Vec<ExperienceEntry>> for FreshExperience {
    fn name(&self) -> &'static str {
        "fresh_experience"
    }

    async fn generate(
        &self,
        ctx: &BranchContext,
        source: &Vec<ExperienceEntry>,
    ) -> Result<Vec<ExperienceEntry>, BranchError> {
        let headers: Vec<ExperienceEntry> = source.iter().map(ExperienceEntry::header).collect();
        let prompt = prompts::experience_fresh_prompt(&ctx.hints, &headers);
        generate_entries(self.generator.as_ref(), &self.balancer, ctx, source, &prompt).await
    }
}

/// Existing bullets edited in place; the service sees the full entries.
pub struct LightEditExperience {
    generator: Arc<dyn ContentGenerator>,
    balancer: BulletBalancer,
}

impl LightEditExperience {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self {
            balancer: BulletBalancer::new(generator.clone()),
            generator,
        }
    }
}

#[async_trait]
impl GenerationStrategy<Vec<ExperienceEntry>> for LightEditExperience {
    fn name(&self) -> &'static str {
        "light_edit_experience"
    }

    async fn generate(
        &self,
        ctx: &BranchContext,
        source: &Vec<ExperienceEntry>,
    ) -> Result<Vec<ExperienceEntry>, BranchError> {
        let prompt = prompts::experience_light_prompt(&ctx.hints, source);
        generate_entries(self.generator.as_ref(), &self.balancer, ctx, source, &prompt).await
    }
}

async fn generate_entries(
    generator: &dyn ContentGenerator,
    balancer: &BulletBalancer,
    ctx: &BranchContext,
    source: &[ExperienceEntry],
    prompt: &str,
) -> Result<Vec<ExperienceEntry>, BranchError> {
    let contract = prompts::experience_contract();
    let reply: ExperienceReply = generator
        .complete(prompt, Some(&contract), ctx.remaining())
        .await?
        .parse()?;

    let entries = clean_entries(reply.experience);
    if entries.is_empty() && !source.is_empty() {
        return Err(BranchError::Parse("reply contained no experience entries".into()));
    }
    if entries.len() < source.len() {
        warn!(
            returned = entries.len(),
            expected = source.len(),
            "experience reply has fewer entries than the source"
        );
    }

    Ok(balancer.balance(ctx, entries).await)
}

/// Strip formatting noise from bullets and drop entries that can't be
/// attributed to a company or role.
fn clean_entries(raw: Vec<ExperienceEntry>) -> Vec<ExperienceEntry> {
    raw.into_iter()
        .filter_map(|mut entry| {
            if entry.is_ungrouped() {
                warn!(period = %entry.period, "dropping experience entry without company or role");
                return None;
            }
            entry.points = entry
                .points
                .iter()
                .map(|p| clean_bullet(p))
                .filter(|p| !p.is_empty())
                .collect();
            Some(entry)
        })
        .collect()
}

pub fn strategy(
    mode: Mode,
    generator: Arc<dyn ContentGenerator>,
) -> Arc<dyn GenerationStrategy<Vec<ExperienceEntry>>> {
    match mode {
        Mode::GenerateFresh => Arc::new(FreshExperience::new(generator)),
        Mode::LightEdit => Arc::new(LightEditExperience::new(generator)),
    }
}
