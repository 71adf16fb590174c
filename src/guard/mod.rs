//! Guard lifecycle.
//!
//! - [`key`] - store key composition and per-user scan patterns
//! - [`id`] - guard identifier generation
//! - [`record`] - persisted record value
//! - [`manager`] - issue, refresh and revoke with quota and existence rules

pub mod id;
pub mod key;
pub mod manager;
pub mod record;

pub use id::{IdGenerator, SequentialGenerator, UuidGenerator};
pub use key::{prefix_for, prepare_key};
pub use manager::{GuardManager, GuardPolicy};
pub use record::GuardRecord;
