//! The three content branches run concurrently by the pipeline.
//!
//! Each branch is a [`BranchExecutor`] around a [`GenerationStrategy`]
//! picked once from the job's [`Mode`](crate::state_machine::Mode). The
//! executor owns the timeout and the fallback: whatever goes wrong inside a
//! strategy, the branch returns the source field unchanged and records why.

pub mod balance;
pub mod experience;
pub mod skills;
pub mod summary;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::generator::GenerationError;
use crate::preprocess::TargetHints;

pub use balance::BulletBalancer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchKind {
    Summary,
    Experience,
    Skills,
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchKind::Summary => write!(f, "summary"),
            BranchKind::Experience => write!(f, "experience"),
            BranchKind::Skills => write!(f, "skills"),
        }
    }
}

/// Why a branch fell back to the source content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BranchError {
    #[error("branch timed out after {0:?}")]
    Timeout(Duration),

    #[error("service error: {0}")]
    Service(String),

    #[error("unusable output: {0}")]
    Parse(String),

    #[error("branch task panicked: {0}")]
    Panicked(String),
}

impl From<GenerationError> for BranchError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Timeout(d) => BranchError::Timeout(d),
            GenerationError::Service(msg) => BranchError::Service(msg),
            GenerationError::Parse(msg) => BranchError::Parse(msg),
        }
    }
}

/// Shared inputs of one branch run.
pub struct BranchContext {
    pub hints: Arc<TargetHints>,
    /// Absolute end of the branch's budget.
    pub deadline: Instant,
}

impl BranchContext {
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// Produces a new value for one resume field.
#[async_trait]
pub trait GenerationStrategy<F>: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, ctx: &BranchContext, source: &F) -> Result<F, BranchError>;
}

/// Returns the source field as is, without any external call.
pub struct Preserve;

#[async_trait]
impl<F: Clone + Send + Sync> GenerationStrategy<F> for Preserve {
    fn name(&self) -> &'static str {
        "preserve"
    }

    async fn generate(&self, _ctx: &BranchContext, source: &F) -> Result<F, BranchError> {
        Ok(source.clone())
    }
}

/// Branch result; `fallback` is set when `value` is the source content
/// substituted for a failed generation.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchOutcome<F> {
    pub value: F,
    pub fallback: Option<BranchError>,
}

impl<F> BranchOutcome<F> {
    pub fn fell_back(&self) -> bool {
        self.fallback.is_some()
    }
}

pub struct BranchExecutor<F> {
    kind: BranchKind,
    timeout: Duration,
    strategy: Arc<dyn GenerationStrategy<F>>,
}

impl<F: Clone + Send + Sync> BranchExecutor<F> {
    pub fn new(
        kind: BranchKind,
        timeout: Duration,
        strategy: Arc<dyn GenerationStrategy<F>>,
    ) -> Self {
        Self {
            kind,
            timeout,
            strategy,
        }
    }

    pub fn kind(&self) -> BranchKind {
        self.kind
    }

    /// Run the strategy under the branch timeout. Never fails: errors and
    /// timeouts yield the source field.
    pub async fn execute(&self, hints: Arc<TargetHints>, source: &F) -> BranchOutcome<F> {
        let deadline = Instant::now() + self.timeout;
        let ctx = BranchContext { hints, deadline };

        let result = tokio::time::timeout_at(deadline, self.strategy.generate(&ctx, source))
            .await
            .unwrap_or(Err(BranchError::Timeout(self.timeout)));

        match result {
            Ok(value) => {
                info!(
                    branch = %self.kind,
                    strategy = self.strategy.name(),
                    fallback = false,
                    "branch finished"
                );
                BranchOutcome {
                    value,
                    fallback: None,
                }
            }
            Err(e) => {
                warn!(
                    branch = %self.kind,
                    strategy = self.strategy.name(),
                    fallback = true,
                    error = %e,
                    "branch fell back to source content"
                );
                self.fallback(source, e)
            }
        }
    }

    pub fn fallback(&self, source: &F, reason: BranchError) -> BranchOutcome<F> {
        BranchOutcome {
            value: source.clone(),
            fallback: Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing(BranchError);

    #[async_trait]
    impl GenerationStrategy<String> for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn generate(
            &self,
            _ctx: &BranchContext,
            _source: &String,
        ) -> Result<String, BranchError> {
            Err(self.0.clone())
        }
    }

    struct Sleeping;

    #[async_trait]
    impl GenerationStrategy<String> for Sleeping {
        fn name(&self) -> &'static str {
            "sleeping"
        }
        async fn generate(
            &self,
            _ctx: &BranchContext,
            _source: &String,
        ) -> Result<String, BranchError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".into())
        }
    }

    struct Upper;

    #[async_trait]
    impl GenerationStrategy<String> for Upper {
        fn name(&self) -> &'static str {
            "upper"
        }
        async fn generate(
            &self,
            ctx: &BranchContext,
            source: &String,
        ) -> Result<String, BranchError> {
            assert!(ctx.remaining() > Duration::ZERO);
            Ok(source.to_uppercase())
        }
    }

    fn hints() -> Arc<TargetHints> {
        Arc::new(TargetHints::default())
    }

    #[tokio::test]
    async fn success_uses_generated_value() {
        let exec: BranchExecutor<String> =
            BranchExecutor::new(BranchKind::Summary, Duration::from_secs(60), Arc::new(Upper));
        let out = exec.execute(hints(), &"abc".to_string()).await;
        assert_eq!(out.value, "ABC");
        assert!(!out.fell_back());
    }

    #[tokio::test]
    async fn error_falls_back_to_source() {
        let exec: BranchExecutor<String> = BranchExecutor::new(
            BranchKind::Skills,
            Duration::from_secs(60),
            Arc::new(Failing(BranchError::Parse("bad json".into()))),
        );
        let out = exec.execute(hints(), &"original".to_string()).await;
        assert_eq!(out.value, "original");
        assert_eq!(out.fallback, Some(BranchError::Parse("bad json".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_falls_back_to_source() {
        let exec: BranchExecutor<String> =
            BranchExecutor::new(BranchKind::Summary, Duration::from_secs(60), Arc::new(Sleeping));
        let out = exec.execute(hints(), &"original".to_string()).await;
        assert_eq!(out.value, "original");
        assert_eq!(out.fallback, Some(BranchError::Timeout(Duration::from_secs(60))));
    }

    #[tokio::test]
    async fn preserve_returns_source() {
        let exec: BranchExecutor<Vec<u8>> =
            BranchExecutor::new(BranchKind::Experience, Duration::from_secs(1), Arc::new(Preserve));
        let out = exec.execute(hints(), &vec![1, 2, 3]).await;
        assert_eq!(out.value, vec![1, 2, 3]);
        assert!(!out.fell_back());
    }

    #[test]
    fn generation_errors_map_one_to_one() {
        assert_eq!(
            BranchError::from(GenerationError::Service("down".into())),
            BranchError::Service("down".into())
        );
        assert_eq!(
            BranchError::from(GenerationError::Timeout(Duration::from_secs(1))),
            BranchError::Timeout(Duration::from_secs(1))
        );
    }
}
