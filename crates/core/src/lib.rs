//! Fleet core domain logic.
//!
//! Pure building blocks shared by the store and the API: the task status
//! state machine, input validation, and the capability traits for remote
//! script execution and host reachability probing. Nothing in this crate
//! owns shared state.

pub mod error;
pub mod execution;
pub mod pagination;
pub mod probe;
pub mod task;
pub mod types;
pub mod validation;
