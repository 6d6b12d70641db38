//! Conversation identity types.
//!
//! A conversation is identified by the unordered pair of its two
//! participants. `CanonicalPair` fixes the pair into a deterministic
//! arrangement so (A, B) and (B, A) map to the same identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Two participant ids in canonical order (`low < high` by `Uuid`'s
/// total order).
///
/// Construction is symmetric: `CanonicalPair::new(a, b)` and
/// `CanonicalPair::new(b, a)` produce the same value. A pair of a user
/// with themselves is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalPair {
    low: Uuid,
    high: Uuid,
}

impl CanonicalPair {
    /// Order the two ids canonically. Returns `None` when `a == b`.
    pub fn new(a: Uuid, b: Uuid) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Reconstruct a pair already known to be canonical (e.g. from a
    /// storage row). Returns `None` unless `low < high`.
    pub fn from_ordered(low: Uuid, high: Uuid) -> Option<Self> {
        (low < high).then_some(Self { low, high })
    }

    pub fn low(&self) -> Uuid {
        self.low
    }

    pub fn high(&self) -> Uuid {
        self.high
    }

    /// Whether `user` is one of the two participants.
    pub fn contains(&self, user: Uuid) -> bool {
        self.low == user || self.high == user
    }

    /// The participant that is not `user`, or `None` if `user` is not a
    /// participant at all.
    pub fn counterpart_of(&self, user: Uuid) -> Option<Uuid> {
        if user == self.low {
            Some(self.high)
        } else if user == self.high {
            Some(self.low)
        } else {
            None
        }
    }
}

/// A direct-message thread between two users.
///
/// At most one conversation exists per canonical pair; `last_activity_at`
/// advances transactionally with every message append and orders the chat
/// list. Conversations are never deleted in normal operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub participant_low: Uuid,
    pub participant_high: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl Conversation {
    pub fn participants(&self) -> Option<CanonicalPair> {
        CanonicalPair::from_ordered(self.participant_low, self.participant_high)
    }

    pub fn involves(&self, user: Uuid) -> bool {
        self.participant_low == user || self.participant_high == user
    }

    /// The participant that is not `user`.
    pub fn counterpart_of(&self, user: Uuid) -> Option<Uuid> {
        if user == self.participant_low {
            Some(self.participant_high)
        } else if user == self.participant_high {
            Some(self.participant_low)
        } else {
            None
        }
    }
}
