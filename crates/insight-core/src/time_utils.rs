use chrono_tz::Tz;
use tracing::warn;

use crate::error::{InsightError, Result};

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Uses the `iana-time-zone` crate directly – no subprocess calls.
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Parse an IANA timezone name, resolving `"auto"` to the system zone.
pub fn resolve_timezone(name: &str) -> Result<Tz> {
    let name = if name == "auto" {
        get_system_timezone()
    } else {
        name.to_string()
    };
    name.parse::<Tz>()
        .map_err(|_| InsightError::Config(format!("unrecognised timezone \"{}\"", name)))
}

/// Like [`resolve_timezone`] but falls back to UTC with a warning.
pub fn resolve_timezone_or_utc(name: &str) -> Tz {
    resolve_timezone(name).unwrap_or_else(|e| {
        warn!(error = %e, "falling back to UTC");
        Tz::UTC
    })
}
