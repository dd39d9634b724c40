//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&Store` as the first argument.

pub mod group_repo;
pub mod script_repo;
pub mod server_repo;
pub mod task_repo;

pub use group_repo::GroupRepo;
pub use script_repo::ScriptRepo;
pub use server_repo::ServerRepo;
pub use task_repo::TaskRepo;
