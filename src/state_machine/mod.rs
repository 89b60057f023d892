mod job;
mod state;

pub use job::{Job, JobPatch, JobSummary, Mode};
pub use state::{JobStatus, StateMachine, Transition, TransitionError};
