use super::types::CollectionType;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// A single comparable value extracted from an entity for sorting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortValue {
    Text(String),
    Integer(u64),
    Kind(CollectionType),
    Timestamp(DateTime<Utc>),
}

impl SortValue {
    /// Text compares case-insensitively, then by raw bytes so that "a" and "A"
    /// still have a fixed order.
    pub fn compare(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Text(a), SortValue::Text(b)) => a
                .to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b)),
            (SortValue::Integer(a), SortValue::Integer(b)) => a.cmp(b),
            (SortValue::Kind(a), SortValue::Kind(b)) => a.cmp(b),
            (SortValue::Timestamp(a), SortValue::Timestamp(b)) => a.cmp(b),

            // Mixed variants only happen if a caller mixes keys; keep it total.
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Text(_) => 0,
            Self::Integer(_) => 1,
            Self::Kind(_) => 2,
            Self::Timestamp(_) => 3,
        }
    }
}
