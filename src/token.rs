// Authorization and expiry status derived from a credential record.
// No I/O here; the clock is passed in where it matters.

use crate::store::{
    CredentialRecord, ACCESS_TOKEN, ACCOUNT_ID, ACCOUNT_USERNAME, CLIENT_ID, EXPIRES_IN,
    EXPIRE_DATE, REFRESH_TOKEN,
};
use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Keys that must all be present for a record to count as authorized.
pub const REQUIRED_KEYS: [&str; 5] = [
    ACCESS_TOKEN,
    REFRESH_TOKEN,
    ACCOUNT_USERNAME,
    ACCOUNT_ID,
    EXPIRES_IN,
];

/// Subtracted from the server-provided lifetime to absorb clock skew and
/// the time spent between issuance and storage.
pub const SAFETY_MARGIN_SECS: i64 = 120;

pub fn is_authorized(record: &CredentialRecord) -> bool {
    REQUIRED_KEYS.iter().all(|key| record.contains(key))
}

/// Whether the stored access token has passed its expiry date.
///
/// # Panics
///
/// Panics if `record` is not authorized; asking an anonymous record
/// about expiry is a caller bug.
pub fn is_expired(record: &CredentialRecord) -> bool {
    is_expired_at(record, Utc::now())
}

/// [`is_expired`] against an explicit clock.
///
/// A missing or unreadable `expire_date` counts as expired so the
/// session gets renewed rather than trusted.
pub fn is_expired_at(record: &CredentialRecord, now: DateTime<Utc>) -> bool {
    assert!(
        is_authorized(record),
        "is_expired called on an unauthorized credential record"
    );
    match record.get(EXPIRE_DATE).and_then(parse_expire_date) {
        Some(expire_date) => now >= expire_date,
        None => true,
    }
}

/// Copy of `record` stripped down to the anonymous state.
pub fn deauthorize(record: &CredentialRecord) -> CredentialRecord {
    record.filtered(|key| key == CLIENT_ID)
}

pub fn compute_expire_date(now: DateTime<Utc>, expires_in_secs: u32) -> DateTime<Utc> {
    now + Duration::seconds(i64::from(expires_in_secs)) - Duration::seconds(SAFETY_MARGIN_SECS)
}

/// Persisted representation of an expiry date.
pub fn format_expire_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_expire_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}
