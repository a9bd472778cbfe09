use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One raw row as returned by a table scan.
pub type Record = Map<String, Value>;

pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Where a row's count came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountOrigin {
    /// Read from a configured count field.
    Field,
    /// No row in the set has a count field, so each row counts once.
    Implicit,
    /// The set has a count column but this row lacks it.
    Missing,
    /// The count field was present but could not be coerced.
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub item_name: Option<String>,
    pub timestamp: Option<NaiveDateTime>,
    pub date: Option<NaiveDate>,
    pub day_of_week: Option<&'static str>,
    pub count: u64,
    pub count_origin: CountOrigin,
    pub fields: Record,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTotal {
    pub item: String,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayTotal {
    pub day: String,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Ready,
    Empty,
}

/// Rows left out of one or more aggregates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusions {
    pub missing_item: usize,
    pub invalid_date: usize,
    pub invalid_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub status: ReportStatus,
    pub warning: Option<String>,
    pub today: NaiveDate,
    pub record_count: usize,
    pub distinct_items: usize,
    pub total_all_time: u64,
    pub total_today: u64,
    pub items_all_time: Vec<ItemTotal>,
    pub items_today: Vec<ItemTotal>,
    pub by_weekday: Vec<WeekdayTotal>,
    pub excluded: Exclusions,
    pub records: Vec<NormalizedRecord>,
}

impl Report {
    /// All-time total for one item, zero when the item never appears.
    pub fn item_total(&self, item: &str) -> u64 {
        lookup(&self.items_all_time, item)
    }

    pub fn item_total_today(&self, item: &str) -> u64 {
        lookup(&self.items_today, item)
    }

    pub fn weekday_total(&self, day: &str) -> u64 {
        self.by_weekday
            .iter()
            .find(|entry| entry.day == day)
            .map(|entry| entry.total)
            .unwrap_or_default()
    }
}

fn lookup(totals: &[ItemTotal], item: &str) -> u64 {
    totals
        .iter()
        .find(|entry| entry.item == item)
        .map(|entry| entry.total)
        .unwrap_or_default()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodayResponse {
    pub date: String,
    pub total: u64,
    pub items: Vec<ItemTotal>,
    pub warning: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub today: Option<String>,
}
