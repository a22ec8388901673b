//! Timestamps used in output folder names

use time::{macros::format_description, OffsetDateTime};

/// The current local time as `YYYYmmdd_HHMMSS`.
/// Falls back to UTC if the local offset cannot be determined.
pub fn folder_timestamp() -> String {
	let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
	return format_timestamp(now);
}

pub fn format_timestamp(t: OffsetDateTime) -> String {
	let fmt = format_description!("[year][month][day]_[hour][minute][second]");
	return t.format(&fmt).unwrap_or_else(|_| t.unix_timestamp().to_string());
}
