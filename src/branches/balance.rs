//! Bullet-count balancing for experience entries.
//!
//! Every entry should end up with 6 to 8 bullets. Entries outside that range
//! get one rewrite call each, sequentially, inside the experience branch's
//! budget. When the call fails or returns nothing usable, the entry keeps
//! its bullets and the deviation is logged.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use super::BranchContext;
use crate::document::ExperienceEntry;
use crate::generator::{ContentGenerator, GenerationError};
use crate::prompts::{self, MAX_BULLETS, MIN_BULLETS};
use crate::text::{clean_bullet, parse_marked_bullets};

/// Budget held back so the branch can still return before its deadline.
const DEFAULT_RESERVE: Duration = Duration::from_millis(250);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BalanceError {
    #[error("branch budget exhausted")]
    BudgetExhausted,

    #[error("rewrite reply had no bullet lines")]
    NoBullets,

    #[error("rewrite reply had {0} bullets, outside {min}..={max}", min = MIN_BULLETS, max = MAX_BULLETS)]
    OutOfRange(usize),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

pub struct BulletBalancer {
    generator: Arc<dyn ContentGenerator>,
    reserve: Duration,
}

impl BulletBalancer {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self {
            generator,
            reserve: DEFAULT_RESERVE,
        }
    }

    pub fn in_range(count: usize) -> bool {
        (MIN_BULLETS..=MAX_BULLETS).contains(&count)
    }

    /// Rebalance every out-of-range entry; entries whose rewrite fails keep
    /// their original bullets.
    pub async fn balance(
        &self,
        ctx: &BranchContext,
        mut entries: Vec<ExperienceEntry>,
    ) -> Vec<ExperienceEntry> {
        for entry in entries.iter_mut() {
            let before = entry.points.len();
            if Self::in_range(before) {
                continue;
            }
            match self.rebalance(ctx, entry).await {
                Ok(points) => {
                    info!(
                        entry = %entry.label(),
                        before,
                        after = points.len(),
                        "bullets rebalanced"
                    );
                    entry.points = points;
                }
                Err(e) => {
                    warn!(
                        entry = %entry.label(),
                        bullets = before,
                        error = %e,
                        "balancing failed, keeping original bullets"
                    );
                }
            }
        }
        entries
    }

    async fn rebalance(
        &self,
        ctx: &BranchContext,
        entry: &ExperienceEntry,
    ) -> Result<Vec<String>, BalanceError> {
        let budget = ctx
            .remaining()
            .checked_sub(self.reserve)
            .filter(|d| !d.is_zero())
            .ok_or(BalanceError::BudgetExhausted)?;

        let reply = self
            .generator
            .complete(&prompts::balance_prompt(&ctx.hints, entry), None, budget)
            .await?
            .into_text();

        let points: Vec<String> = parse_marked_bullets(&reply)
            .iter()
            .map(|b| clean_bullet(b))
            .filter(|b| !b.is_empty())
            .collect();
        if points.is_empty() {
            return Err(BalanceError::NoBullets);
        }
        if !Self::in_range(points.len()) {
            return Err(BalanceError::OutOfRange(points.len()));
        }
        Ok(points)
    }
}
