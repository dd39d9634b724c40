//! Limit/offset paging for list endpoints.

/// Page size used when a request does not give one.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Largest page a request may ask for.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Clamp a user-provided limit into `1..=max`.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided offset to non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}
