//! Workouts-related HTTP API.
//!
//! Reads are public. Writes require a caller, and updates or deletes of an
//! existing workout go through [`crate::ownership::authorize`].

pub mod create;
pub mod delete;
pub mod get;
pub mod update;
