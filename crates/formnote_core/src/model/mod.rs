//! Domain model for templates, notes and their owning accounts.
//!
//! # Responsibility
//! - Define the aggregate records and read views used by services.
//! - Hold the pure rules that keep templates and notes consistent.
//!
//! # Invariants
//! - Nothing in this module touches storage.
//! - Every id is an opaque string; format checks belong to the store.

pub mod account;
pub mod note;
pub mod template;
pub mod validation;
