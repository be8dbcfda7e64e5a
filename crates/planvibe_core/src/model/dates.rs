use crate::error::AppError;
use time::Date;
use time::macros::format_description;

/// Parses a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(raw: &str) -> Result<Date, AppError> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::invalid_input(format!("date must be YYYY-MM-DD, got '{}'", raw.trim())))
}

pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

// Server timestamps carry a time-of-day and the zero value `0001-01-01T00:00:00Z`
// stands for "unset"; only the date part is meaningful here.
fn parse_lenient(raw: &str) -> Result<Option<Date>, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    let date = parse_date(date_part)
        .map_err(|_| AppError::invalid_data(format!("unrecognized date '{trimmed}'")))?;
    if date.year() <= 1 {
        return Ok(None);
    }
    Ok(Some(date))
}

pub(crate) mod optional_date {
    use super::{format_date, parse_lenient};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(value: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => serializer.serialize_some(&format_date(*date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Date>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(value) => parse_lenient(&value).map_err(|err| D::Error::custom(err.message())),
            None => Ok(None),
        }
    }

    /// Request bodies spell an unset date as an empty string.
    pub fn serialize_wire<S: Serializer>(
        value: &Option<Date>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let formatted = value.map(format_date).unwrap_or_default();
        serializer.serialize_str(&formatted)
    }
}
