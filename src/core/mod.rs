//! Core runtime infrastructure.
//!
//! - [`config`] - Configuration parsing and validation
//! - [`runtime`] - Component lifecycle orchestration
//! - [`time`] - Clock abstraction
//! - [`error`] - Error types and HTTP status mapping

pub mod config;
pub mod error;
pub mod runtime;
pub mod time;
