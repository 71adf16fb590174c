//! Guard identifier generation.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Produces globally unique, opaque guard identifiers.
///
/// Uniqueness is the generator's contract; the manager never re-checks it.
pub trait IdGenerator: Send + Sync {
    /// Next identifier.
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs in hyphenated lowercase form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic UUID-shaped identifiers: `00000000-0000-4000-8000-{counter:012x}`.
///
/// Intended for tests and reproducible demos.
#[derive(Debug, Default)]
pub struct SequentialGenerator {
    next: AtomicU64,
}

impl SequentialGenerator {
    /// Start counting at 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialGenerator {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("00000000-0000-4000-8000-{:012x}", n)
    }
}
