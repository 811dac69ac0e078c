// crates/resilience/src/classify.rs
//! Retryable vs fatal error classification

use crate::signature::ErrorSignature;

/// Transient network failure signatures
pub const TRANSIENT_CODES: [&str; 4] = ["ECONNRESET", "ETIMEDOUT", "ENOTFOUND", "ECONNREFUSED"];

/// Response statuses worth retrying: rate limiting and server-side failures
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Returns true if the error looks like a transient failure
///
/// Matches a known network failure code in either the code or the message,
/// or a retryable response status.
pub fn is_transient<E: ErrorSignature + ?Sized>(error: &E) -> bool {
    if error
        .status()
        .is_some_and(|status| RETRYABLE_STATUSES.contains(&status))
    {
        return true;
    }

    let code = error.code();
    let message = error.message();
    TRANSIENT_CODES
        .iter()
        .any(|sig| code.is_some_and(|c| c.contains(sig)) || message.contains(sig))
}

/// Returns true if the error matches any entry of an explicit allow-list
///
/// An entry matches when it is contained in the error code or message, or
/// equals the decimal response status. Empty entries never match.
pub fn matches_allow_list<E: ErrorSignature + ?Sized>(error: &E, allowed: &[String]) -> bool {
    let code = error.code();
    let message = error.message();
    let status = error.status().map(|s| s.to_string());

    allowed
        .iter()
        .map(String::as_str)
        .filter(|entry| !entry.is_empty())
        .any(|entry| {
            code.is_some_and(|c| c.contains(entry))
                || message.contains(entry)
                || status.as_deref() == Some(entry)
        })
}
