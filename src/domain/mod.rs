//! Domain layer for the QA automation engine
//!
//! This module contains core business types and the port traits that
//! external collaborators implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
