/// Record identifier parsing utilities.
///
/// Records are keyed by a store-assigned UUIDv7, so ids sort by creation
/// time. Ids arriving in a request path are untrusted text; anything that is
/// not a UUID can never match a stored record.
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Allocate a fresh, time-ordered id.
    pub fn generate() -> Self {
        RecordId(Uuid::now_v7())
    }

    /// Parse an id taken from a request path.
    /// Returns `None` for malformed input instead of an error: callers treat
    /// an unparseable id exactly like an unknown one.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(RecordId)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for RecordId {
    fn from(id: Uuid) -> Self {
        RecordId(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_generated_id() {
        let id = RecordId::generate();
        let parsed = RecordId::parse(&id.to_string());
        assert_eq!(parsed, Some(id));
    }

    #[test]
    fn parse_rejects_non_uuid() {
        assert_eq!(RecordId::parse("abc123"), None);
        assert_eq!(RecordId::parse(""), None);
        assert_eq!(RecordId::parse("42"), None);
    }

    #[test]
    fn generated_ids_are_time_ordered() {
        let first = RecordId::generate();
        let second = RecordId::generate();
        assert!(first < second);
    }
}
