//! Tolerant decoding of stored values.
//!
//! Database files adopted from earlier releases may hold values that today's
//! validation rejects, such as a prefix containing a space. Such rows are
//! skipped with a warning so one bad row does not make a guild unreadable.

use hifumi_types::ValidationError;

/// Parses `raw`, or logs and returns `None` if it no longer validates.
pub(crate) fn decode<T>(
    table: &'static str,
    raw: &str,
    parse: fn(&str) -> Result<T, ValidationError>,
) -> Option<T> {
    match parse(raw) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(table, value = raw, %error, "skipping stored value that no longer validates");
            None
        }
    }
}
