//! Recipient deduplication.
//!
//! One applicant may own several unsubmitted applications in a round; they
//! should still receive exactly one message per scan.

use std::collections::BTreeMap;

use crate::candidate::NotificationCandidate;

/// Collapse candidates to one per recipient email.
///
/// Later candidates overwrite earlier ones for the same email. Iteration
/// order of the result is by email, so dispatch order is deterministic.
pub fn dedupe(
    candidates: impl IntoIterator<Item = NotificationCandidate>,
) -> BTreeMap<String, NotificationCandidate> {
    let mut unique = BTreeMap::new();
    for candidate in candidates {
        unique.insert(candidate.recipient_email.clone(), candidate);
    }
    unique
}
