//! Ports: the seams the manager is wired through.
//!
//! Each trait can be swapped at construction time, which is how tests inject
//! a fixed clock or a scripted executor.

pub mod clock;
pub mod executor;
pub mod id_generator;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::executor::Executor;
pub use self::id_generator::{IdGenerator, UlidGenerator};
