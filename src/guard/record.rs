//! Persisted record value.
//!
//! The stored value is the guard's expiry as an RFC 3339 UTC instant with
//! millisecond precision (`2024-05-01T12:01:00.000Z`). The store TTL is set
//! to the same lifetime, so the backend drops the record at roughly the same
//! moment the value says it expires.

use chrono::{DateTime, SecondsFormat, Utc};

/// Decoded guard record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardRecord {
    /// Instant after which the guard is absent.
    pub expires_at: DateTime<Utc>,
}

impl GuardRecord {
    /// Record expiring at `expires_at`.
    pub fn new(expires_at: DateTime<Utc>) -> Self {
        Self { expires_at }
    }

    /// Encode as the stored string value.
    pub fn encode(&self) -> String {
        self.expires_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Decode a stored value. Returns `None` for anything that is not an
    /// RFC 3339 instant.
    pub fn decode(value: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|t| Self::new(t.with_timezone(&Utc)))
    }

    /// Whether the record is still live at `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn encodes_iso_instant() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 1, 0).unwrap();
        assert_eq!(GuardRecord::new(at).encode(), "2024-05-01T12:01:00.000Z");
    }

    #[test]
    fn decodes_offsets_into_utc() {
        let record = GuardRecord::decode("2024-05-01T14:01:00+02:00").unwrap();
        assert_eq!(
            record.expires_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 1, 0).unwrap()
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(GuardRecord::decode("1").is_none());
        assert!(GuardRecord::decode("").is_none());
    }

    #[test]
    fn liveness_boundary_is_exclusive() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = GuardRecord::new(at);
        assert!(record.is_live_at(at - chrono::Duration::milliseconds(1)));
        assert!(!record.is_live_at(at));
    }
}
