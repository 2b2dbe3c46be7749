#![forbid(unsafe_code)]

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Whole seconds since the Unix epoch, clamped at zero.
pub fn now_epoch_s() -> u64 {
    let secs = OffsetDateTime::now_utc().unix_timestamp();
    if secs <= 0 { 0 } else { secs as u64 }
}
