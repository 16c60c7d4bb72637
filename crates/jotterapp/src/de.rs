//! Lenient deserializers for service payloads.
//!
//! The notes service is not consistent about scalar encodings: flags arrive as
//! `true` or `1`, counters as `12` or `"12"`, timestamps as RFC 3339 strings,
//! SQL-style datetimes or bare dates. Everything here accepts all of those and
//! yields one canonical Rust type.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFlag {
    Bool(bool),
    Int(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(u64),
    Float(f64),
    Text(String),
}

/// Parses the timestamp formats the service is known to emit.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawFlag>::deserialize(deserializer)? {
        None => Ok(false),
        Some(RawFlag::Bool(b)) => Ok(b),
        Some(RawFlag::Int(n)) => Ok(n != 0),
        Some(RawFlag::Text(s)) => match s.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            other => Err(de::Error::custom(format!("invalid flag: {other}"))),
        },
    }
}

fn number_from_raw<E: de::Error>(raw: RawNumber) -> Result<u64, E> {
    match raw {
        RawNumber::Int(n) => Ok(n),
        RawNumber::Float(f) if f >= 0.0 && f.fract() == 0.0 => Ok(f as u64),
        RawNumber::Float(f) => Err(E::custom(format!("invalid count: {f}"))),
        RawNumber::Text(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| E::custom(format!("invalid count: {s}"))),
    }
}

pub fn opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawNumber>::deserialize(deserializer)?
        .map(number_from_raw)
        .transpose()
}

pub fn opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match opt_u64(deserializer)? {
        None => Ok(None),
        Some(n) => u32::try_from(n)
            .map(Some)
            .map_err(|_| de::Error::custom(format!("count out of range: {n}"))),
    }
}

pub fn opt_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawFlag>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawFlag::Bool(b)) => Ok(Some(b)),
        Some(RawFlag::Int(n)) => Ok(Some(n != 0)),
        Some(RawFlag::Text(s)) => Ok(Some(matches!(s.trim(), "true" | "1"))),
    }
}

pub fn opt_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {s}"))),
    }
}

pub fn opt_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_timestamp(deserializer)?.map(|ts| ts.date_naive()))
}

/// A list that may be `null`, missing, or contain `null` holes.
pub fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let raw: Option<Vec<Option<T>>> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default().into_iter().flatten().collect())
}
