use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

const INPUT_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Parses a submitted timestamp. Values without an offset are read as local time.
pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .and_then(local_to_utc)
        .ok_or_else(|| "Enter a valid date/time, e.g. 2026-02-03 09:30.".to_string())
}

pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Value for an `<input type="datetime-local">`.
pub fn input_value(value: &DateTime<Utc>) -> String {
    value.with_timezone(&Local).format("%Y-%m-%dT%H:%M").to_string()
}

fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    let result = Local.from_local_datetime(&naive);
    result
        .earliest()
        .or_else(|| result.latest())
        .map(|dt| dt.with_timezone(&Utc))
}
