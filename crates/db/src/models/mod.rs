//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `Serialize` entity struct as stored
//! - A `Deserialize` create DTO for inserts
//! - Request/query DTOs for the matching HTTP routes

pub mod group;
pub mod script;
pub mod server;
pub mod task;
