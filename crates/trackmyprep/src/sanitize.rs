//! Helpers for sanitizing data before it reaches log output.
//!
//! Credentials and local filesystem layout must never appear in logs or
//! span fields.

use std::path::Path;

/// Characters of a bearer token kept when it has to be referenced in logs.
const TOKEN_PREFIX_LEN: usize = 6;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Reduces a bearer token to a short prefix plus its length.
///
/// Tokens too short to leave anything hidden are fully masked.
pub fn redact_token(token: &str) -> String {
    let len = token.chars().count();
    if len <= TOKEN_PREFIX_LEN * 2 {
        return format!("****(len={})", len);
    }
    let prefix: String = token.chars().take(TOKEN_PREFIX_LEN).collect();
    format!("{}****(len={})", prefix, len)
}

/// Truncates an upstream error body for inclusion in an error message.
pub fn truncate_body(body: &str, max: usize) -> String {
    if body.chars().count() <= max {
        return body.to_string();
    }
    let head: String = body.chars().take(max).collect();
    format!("{}... (truncated)", head)
}
