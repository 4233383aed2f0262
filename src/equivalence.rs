//! Content equivalence between a sent and a received message
//!
//! Two messages are equivalent when they share the same multipart
//! flag, the same number of top-level parts, and byte-identical
//! decoded content for every part at the same index. Headers are
//! ignored: relays add `Received:`, `Return-Path:` and friends, and
//! may rewrite others.

use crate::email::Email;
use crate::error::{Error, Mismatch, Result};

/// Check `received` against `sent`, reporting the first difference.
///
/// # Errors
///
/// Returns [`Error::Mismatch`] describing the first check that failed.
pub fn verify_equivalent(sent: &Email, received: &Email) -> Result<()> {
    first_mismatch(sent, received).map_or(Ok(()), |m| Err(Error::Mismatch(m)))
}

/// `true` when [`verify_equivalent`] would succeed.
#[must_use]
pub fn equivalent(sent: &Email, received: &Email) -> bool {
    first_mismatch(sent, received).is_none()
}

fn first_mismatch(sent: &Email, received: &Email) -> Option<Mismatch> {
    if sent.multipart != received.multipart {
        return Some(Mismatch::Multipart {
            sent: sent.multipart,
            received: received.multipart,
        });
    }

    if sent.parts.len() != received.parts.len() {
        return Some(Mismatch::PartCount {
            sent: sent.parts.len(),
            received: received.parts.len(),
        });
    }

    sent.parts
        .iter()
        .zip(&received.parts)
        .position(|(s, r)| s.content != r.content)
        .map(|index| Mismatch::Content {
            index,
            sent_len: sent.parts[index].content.len(),
            received_len: received.parts[index].content.len(),
        })
}
