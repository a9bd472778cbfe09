use crate::config::Schema;
use crate::models::{CountOrigin, NormalizedRecord, Record, WEEKDAYS};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::cmp::Ordering;

const DATE_TIME_FORMATS: [&str; 8] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Canonical text written back by [`NormalizedRecord::to_record`].
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Parse a stored timestamp, keeping the wall-clock time as written.
///
/// Date-only values resolve to midnight. Returns `None` when no known layout
/// matches.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local());
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, format) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Coerce a count cell to a non-negative integer.
pub fn coerce_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => {
            if let Some(count) = number.as_u64() {
                return Some(count);
            }
            if number.is_i64() {
                return None;
            }
            number.as_f64().and_then(truncate_float)
        }
        Value::String(text) => {
            let text = text.trim();
            text.parse::<u64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(truncate_float))
        }
        _ => None,
    }
}

fn truncate_float(value: f64) -> Option<u64> {
    if value.is_finite() && value >= 0.0 && value < u64::MAX as f64 {
        Some(value.trunc() as u64)
    } else {
        None
    }
}

pub fn weekday_name(date: NaiveDate) -> &'static str {
    WEEKDAYS[date.weekday().num_days_from_monday() as usize]
}

fn item_name(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn first_field<'a>(record: &'a Record, fields: &[String]) -> Option<&'a Value> {
    fields
        .iter()
        .find_map(|field| record.get(field.as_str()).filter(|value| !value.is_null()))
}

/// Build the typed table from raw records.
///
/// When no record carries any count field each row counts once; otherwise a
/// missing or unparseable count is zero.
pub fn normalize(schema: &Schema, records: &[Record]) -> Vec<NormalizedRecord> {
    let has_count_column = records
        .iter()
        .any(|record| schema.count_fields.iter().any(|field| record.contains_key(field.as_str())));

    records
        .iter()
        .map(|record| {
            let timestamp = match first_field(record, &schema.date_fields) {
                Some(Value::String(text)) => parse_timestamp(text),
                _ => None,
            };
            let date = timestamp.map(|value| value.date());

            let (count, count_origin) = if !has_count_column {
                (1, CountOrigin::Implicit)
            } else {
                match first_field(record, &schema.count_fields) {
                    Some(value) => match coerce_count(value) {
                        Some(count) => (count, CountOrigin::Field),
                        None => (0, CountOrigin::Invalid),
                    },
                    None => (0, CountOrigin::Missing),
                }
            };

            NormalizedRecord {
                item_name: item_name(record.get(schema.item_field.as_str())),
                timestamp,
                date,
                day_of_week: date.map(weekday_name),
                count,
                count_origin,
                fields: record.clone(),
            }
        })
        .collect()
}

/// Newest first; rows without a parsed timestamp sink to the end.
pub fn sort_newest_first(records: &mut [NormalizedRecord]) {
    records.sort_by(|a, b| match (a.timestamp, b.timestamp) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

impl NormalizedRecord {
    /// Raw record with canonical values written over the schema fields.
    pub fn to_record(&self, schema: &Schema) -> Record {
        let mut record = self.fields.clone();
        if let Some(item) = &self.item_name {
            record.insert(schema.item_field.clone(), Value::String(item.clone()));
        }
        if let (Some(timestamp), Some(field)) = (self.timestamp, date_field_in_use(schema, &self.fields)) {
            record.insert(
                field,
                Value::String(timestamp.format(CANONICAL_FORMAT).to_string()),
            );
        }
        if self.count_origin == CountOrigin::Field {
            if let Some(field) = schema
                .count_fields
                .iter()
                .find(|field| self.fields.get(field.as_str()).is_some_and(|value| !value.is_null()))
            {
                record.insert(field.clone(), Value::from(self.count));
            }
        }
        record
    }
}

fn date_field_in_use(schema: &Schema, record: &Record) -> Option<String> {
    schema
        .date_fields
        .iter()
        .find(|field| record.get(field.as_str()).is_some_and(|value| !value.is_null()))
        .cloned()
}
