//! Domain model (IDs, status state machine, records, errors).

pub mod errors;
pub mod ids;
pub mod record;
pub mod state;

pub use self::errors::{ExecutionError, TaskError};
pub use self::ids::{IdParseError, TaskId};
pub use self::record::{FailureKind, TaskFailure, TaskOptions, TaskRecord, Transition};
pub use self::state::{TaskStatus, UnknownStatus};
