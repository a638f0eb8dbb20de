//! Background runs: submit returns a run id, status can be polled.

mod memory;
mod trait_;

pub use memory::InMemoryRunScheduler;
pub use trait_::{Run, RunScheduler, RunStatus, SchedulerError};
