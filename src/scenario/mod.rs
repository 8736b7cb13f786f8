//! Create / fetch / rename / delete round trips against the integration API.

mod machine;
mod task;

pub use self::machine::{run_machine_round_trip, MACHINE_NAME_SUFFIX};
pub use self::task::{run_task_round_trip, TASK_NAME_SUFFIX};

use crate::core::Id;

/// How far a round trip got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Creation yielded nothing, usually because the record already exists.
    NotCreated,
    /// Created, but the lookup by external key came back empty.
    NotFetched { id: Id },
    Completed { id: Id, updated: bool, deleted: bool },
}
