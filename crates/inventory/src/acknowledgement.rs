//! Per-user acknowledgement of rejected adjustment requests.
//!
//! Purely a visibility concern: acknowledging never touches the request or the
//! item, it only stops the requester's warning badge from reappearing.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use laundrydesk_core::{AdjustmentRequestId, UserId};

use crate::{AdjustmentRequest, AdjustmentStatus};

/// Set of `(user, request)` pairs the user has dismissed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RejectionAcknowledgements {
    seen: HashSet<(UserId, AdjustmentRequestId)>,
}

impl RejectionAcknowledgements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `user` has seen `request`. Returns `false` if it was already
    /// recorded (the call is then a no-op).
    pub fn acknowledge(&mut self, user: UserId, request: AdjustmentRequestId) -> bool {
        self.seen.insert((user, request))
    }

    pub fn is_acknowledged(&self, user: UserId, request: AdjustmentRequestId) -> bool {
        self.seen.contains(&(user, request))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// The user's own rejected requests they have not dismissed yet.
    pub fn unacknowledged_for<'a>(
        &'a self,
        user: UserId,
        requests: impl IntoIterator<Item = &'a AdjustmentRequest>,
    ) -> impl Iterator<Item = &'a AdjustmentRequest> {
        requests.into_iter().filter(move |r| {
            r.requested_by() == user
                && r.status() == AdjustmentStatus::Rejected
                && !self.is_acknowledged(user, r.id_typed())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acknowledge_is_idempotent() {
        let mut acks = RejectionAcknowledgements::new();
        let user = UserId::new();
        let request = AdjustmentRequestId::new();

        assert!(acks.acknowledge(user, request));
        let after_first = acks.clone();
        assert!(!acks.acknowledge(user, request));
        assert_eq!(acks, after_first);
        assert_eq!(acks.len(), 1);
    }

    #[test]
    fn acknowledgement_is_scoped_per_user() {
        let mut acks = RejectionAcknowledgements::new();
        let request = AdjustmentRequestId::new();
        let alice = UserId::new();
        let bob = UserId::new();

        acks.acknowledge(alice, request);
        assert!(acks.is_acknowledged(alice, request));
        assert!(!acks.is_acknowledged(bob, request));
    }
}
