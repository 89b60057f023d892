//! sled-backed job store.
//!
//! Records are JSON values in a single tree keyed by request id. Creation
//! and updates use compare-and-swap, so concurrent writers on the same
//! record never lose an update and a terminal record can't be overwritten.

use std::path::Path;

use async_trait::async_trait;
use sled::{Db, Tree};
use tracing::debug;

use super::{JobStore, StoreError, newest_first};
use crate::state_machine::{Job, JobPatch, StateMachine};

const TREE_JOBS: &str = "jobs";

#[derive(Clone)]
pub struct SledJobStore {
    db: Db,
    jobs: Tree,
}

impl SledJobStore {
    pub fn new(db: Db) -> Result<Self, StoreError> {
        let jobs = db.open_tree(TREE_JOBS)?;
        Ok(Self { db, jobs })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::new(sled::open(path)?)
    }

    pub fn db(&self) -> &Db {
        &self.db
    }
}

#[async_trait]
impl JobStore for SledJobStore {
    async fn create(&self, job: Job) -> Result<(), StoreError> {
        let value = serde_json::to_vec(&job)?;
        let swapped = self.jobs.compare_and_swap(
            job.request_id.as_bytes(),
            None::<&[u8]>,
            Some(value),
        )?;
        if swapped.is_err() {
            return Err(StoreError::AlreadyExists(job.request_id));
        }
        self.jobs.flush_async().await?;
        Ok(())
    }

    async fn get(&self, request_id: &str) -> Result<Option<Job>, StoreError> {
        let Some(raw) = self.jobs.get(request_id.as_bytes())? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    async fn update(&self, request_id: &str, patch: JobPatch) -> Result<Job, StoreError> {
        let key = request_id.as_bytes();
        loop {
            let Some(current) = self.jobs.get(key)? else {
                return Err(StoreError::NotFound(request_id.to_string()));
            };
            let mut job: Job = serde_json::from_slice(&current)?;
            StateMachine::apply(&mut job, patch.clone())?;
            let next = serde_json::to_vec(&job)?;

            match self.jobs.compare_and_swap(key, Some(current), Some(next))? {
                Ok(()) => {
                    self.jobs.flush_async().await?;
                    return Ok(job);
                }
                Err(_) => debug!(request_id, "concurrent write on job record, retrying"),
            }
        }
    }

    async fn list(&self) -> Result<Vec<Job>, StoreError> {
        let mut out = Vec::new();
        for result in self.jobs.iter() {
            let (_, value) = result?;
            out.push(serde_json::from_slice::<Job>(&value)?);
        }
        newest_first(&mut out);
        Ok(out)
    }
}
