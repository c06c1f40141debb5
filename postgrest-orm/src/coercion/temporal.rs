//! Timestamp and date tokens, including the `infinity` sentinels.
//!
//! Postgres represents unbounded instants as `infinity` / `-infinity`. They map
//! to the extreme representable instants of the chrono types, in both directions.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Wire token for an instant after every other instant.
pub const POSITIVE_INFINITY: &str = "infinity";

/// Wire token for an instant before every other instant.
pub const NEGATIVE_INFINITY: &str = "-infinity";

/// Offset-carrying layouts Postgres emits besides RFC 3339 (`+00` short offsets).
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

/// Layouts without an offset (`timestamp without time zone`), read as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    if *ts == DateTime::<Utc>::MAX_UTC {
        POSITIVE_INFINITY.to_string()
    } else if *ts == DateTime::<Utc>::MIN_UTC {
        NEGATIVE_INFINITY.to_string()
    } else {
        ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)
    }
}

pub fn decode_timestamp(token: &str) -> Option<DateTime<Utc>> {
    match token {
        POSITIVE_INFINITY => return Some(DateTime::<Utc>::MAX_UTC),
        NEGATIVE_INFINITY => return Some(DateTime::<Utc>::MIN_UTC),
        _ => {}
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(token) {
        return Some(ts.with_timezone(&Utc));
    }

    OFFSET_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(token, format).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .or_else(|| {
            NAIVE_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(token, format).ok())
                .map(|naive| naive.and_utc())
        })
}

pub fn encode_date(date: &NaiveDate) -> String {
    if *date == NaiveDate::MAX {
        POSITIVE_INFINITY.to_string()
    } else if *date == NaiveDate::MIN {
        NEGATIVE_INFINITY.to_string()
    } else {
        date.format(DATE_FORMAT).to_string()
    }
}

pub fn decode_date(token: &str) -> Option<NaiveDate> {
    match token {
        POSITIVE_INFINITY => Some(NaiveDate::MAX),
        NEGATIVE_INFINITY => Some(NaiveDate::MIN),
        _ => NaiveDate::parse_from_str(token, DATE_FORMAT).ok(),
    }
}
