//! Guardhouse - per-user guard token service.
//!
//! Guardhouse issues, refreshes and revokes short-lived guard tokens scoped to
//! a user identity. Each guard is a time-boxed record in a key-value store;
//! the guard manager layers a per-user quota and existence rules on top.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              HTTP (axum)            │        CLI (clap)         │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Guard Manager                            │
//! │        quota │ existence │ expiry anchoring │ error taxonomy    │
//! └─────────────────────────────────────────────────────────────────┘
//!            │                     │                      │
//! ┌────────────────────┐ ┌──────────────────┐ ┌────────────────────┐
//! │     Key Codec      │ │ Clock / Id Gen   │ │    Guard Store     │
//! └────────────────────┘ └──────────────────┘ │  Redis │ Memory    │
//!                                             └────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! ## Core
//! - [`core::config`] - Configuration parsing and validation
//! - [`core::runtime`] - Component lifecycle orchestration
//! - [`core::time`] - Clock abstraction
//! - [`core::error`] - Error types and HTTP status mapping
//!
//! ## Guards
//! - [`guard::key`] - Store key composition and scan patterns
//! - [`guard::id`] - Guard identifier generation
//! - [`guard::record`] - Persisted record value
//! - [`guard::manager`] - Issue, refresh and revoke
//!
//! ## Storage
//! - [`store::memory`] - In-process store with clock-driven expiry
//! - [`store::redis`] - Redis store over RESP2
//!
//! ## Surfaces
//! - [`http`] - HTTP routes
//! - [`cli::commands`] - CLI command implementations
//!
//! # Key Invariants
//!
//! - A guard lives under `{user_id}_{guard_id}`; user ids never contain `_`
//! - Expiry is always `now + lifetime`, on issue and on refresh
//! - A record whose expiry has passed is indistinguishable from a missing one
//! - Store failures are never reported as "absent"

// Core infrastructure
pub mod core;

// Guard lifecycle
pub mod guard;

// Key-value backends
pub mod store;

// HTTP surface
pub mod http;

// CLI
pub mod cli;

// Re-exports for convenience
pub use self::core::{config, error, runtime, time};
pub use guard::{GuardManager, GuardPolicy};
pub use store::{GuardStore, MemoryGuardStore, RedisGuardStore};
