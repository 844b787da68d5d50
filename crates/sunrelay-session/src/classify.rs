//! Deciding whether a failure means "your session is no longer valid".
//!
//! The session manager retries an operation exactly once after
//! re-authenticating, but only when the failure looks like an expired or
//! invalid session. This module makes that call.
//!
//! # Policy
//!
//! For each error in the `source()` chain, in order:
//!
//! 1. If it is an [`UpstreamError`] that reports [`is_auth`](UpstreamError::is_auth),
//!    it is an auth error.
//! 2. Otherwise, if its message contains one of [`AUTH_MESSAGE_MARKERS`]
//!    (case-insensitive), it is an auth error.
//!
//! If no link matches, it is not an auth error.
//!
//! # Known imprecision
//!
//! Upstream clients do not always tag expired sessions with a structured
//! kind, so the text fallback is required. It is also approximate: a
//! failure that merely echoes user content containing "session" will be
//! classified as an auth error and cost one extra login. That trade-off is
//! accepted here rather than narrowed, because missing a real expiry would
//! fail the request outright.

use std::error::Error;

use crate::UpstreamError;

/// Substrings that mark a failure message as auth-related.
///
/// Matched against the lowercased message, so these must stay lowercase.
pub const AUTH_MESSAGE_MARKERS: [&str; 4] = [
    "unauthorized",
    "unauthenticated",
    "session",
    "login required",
];

/// Returns `true` if `error` indicates an expired or invalid session.
///
/// Pure: looks at the error, changes nothing.
pub fn is_auth_error(error: &(dyn Error + 'static)) -> bool {
    let mut link = Some(error);

    while let Some(err) = link {
        if err
            .downcast_ref::<UpstreamError>()
            .is_some_and(UpstreamError::is_auth)
        {
            return true;
        }
        if message_indicates_auth(&err.to_string()) {
            return true;
        }
        link = err.source();
    }

    false
}

/// The text half of the policy: does `message` contain an auth marker?
pub fn message_indicates_auth(message: &str) -> bool {
    let lowered = message.to_lowercase();
    AUTH_MESSAGE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}
