//! Built-in executor implementations.

pub mod simulated;

pub use self::simulated::SimulatedExecutor;
