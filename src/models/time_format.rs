//! Serde adapters for the wall-clock formats used in saved routes

use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serializer, de::Error};

const HOUR_MINUTE: &str = "%H:%M";
const FORECAST_STAMP: &str = "%Y-%m-%d %H:%M:%S";

/// Parse `"HH:MM"`, tolerating a trailing `":SS"`
pub fn parse_hour_minute(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, HOUR_MINUTE)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// Parse an OpenWeatherMap `dt_txt` stamp (`"YYYY-MM-DD HH:MM:SS"`, UTC)
pub fn parse_forecast_stamp(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), FORECAST_STAMP)
        .ok()
        .map(|naive| naive.and_utc())
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.with_timezone(&Utc)))
}

/// `"HH:MM"` for a required time
pub mod hour_minute {
    use super::*;

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(HOUR_MINUTE).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_hour_minute(&raw).ok_or_else(|| D::Error::custom(format!("invalid time '{raw}'")))
    }
}

/// `"HH:MM"` or null
pub mod hour_minute_opt {
    use super::*;

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => serializer.serialize_some(&time.format(HOUR_MINUTE).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse_hour_minute(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid time '{raw}'"))),
        }
    }
}

/// List of forecast stamps in `dt_txt` form
pub mod forecast_stamps {
    use super::*;

    pub fn serialize<S: Serializer>(
        stamps: &[DateTime<Utc>],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(stamps.iter().map(|stamp| stamp.format(FORECAST_STAMP).to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<DateTime<Utc>>, D::Error> {
        let raw: Vec<String> = Vec::deserialize(deserializer)?;
        raw.iter()
            .map(|stamp| {
                parse_forecast_stamp(stamp)
                    .ok_or_else(|| D::Error::custom(format!("invalid forecast stamp '{stamp}'")))
            })
            .collect()
    }
}
