use crate::config::Schema;
use crate::models::{
    CountOrigin, Exclusions, ItemTotal, Record, Report, ReportStatus, WEEKDAYS, WeekdayTotal,
};
use crate::normalize::{normalize, sort_newest_first};
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

/// Aggregate a record set against a fixed reference date.
///
/// Only rows with an item name take part in totals, so the per-item maps
/// always sum to the matching scalar total. Date based aggregates further
/// require a parsed date.
pub fn build_report_at(today: NaiveDate, schema: &Schema, records: &[Record]) -> Report {
    let mut table = normalize(schema, records);
    sort_newest_first(&mut table);

    let mut report = Report {
        status: ReportStatus::Empty,
        warning: None,
        today,
        record_count: table.len(),
        distinct_items: 0,
        total_all_time: 0,
        total_today: 0,
        items_all_time: Vec::new(),
        items_today: Vec::new(),
        by_weekday: weekday_series(&[0; 7]),
        excluded: Exclusions::default(),
        records: Vec::new(),
    };
    if table.is_empty() {
        return report;
    }

    let mut all_time: HashMap<&str, u64> = HashMap::new();
    let mut today_totals: HashMap<&str, u64> = HashMap::new();
    let mut weekdays = [0u64; 7];

    for row in &table {
        if row.date.is_none() {
            report.excluded.invalid_date += 1;
        }
        if matches!(row.count_origin, CountOrigin::Missing | CountOrigin::Invalid) {
            report.excluded.invalid_count += 1;
        }
        let Some(item) = row.item_name.as_deref() else {
            report.excluded.missing_item += 1;
            continue;
        };

        let entry = all_time.entry(item).or_default();
        *entry = entry.saturating_add(row.count);
        report.total_all_time = report.total_all_time.saturating_add(row.count);

        let Some(date) = row.date else {
            continue;
        };
        let slot = &mut weekdays[date.weekday().num_days_from_monday() as usize];
        *slot = slot.saturating_add(row.count);

        if date == today {
            let entry = today_totals.entry(item).or_default();
            *entry = entry.saturating_add(row.count);
            report.total_today = report.total_today.saturating_add(row.count);
        }
    }

    report.status = ReportStatus::Ready;
    report.distinct_items = all_time.len();
    report.items_all_time = ranked(all_time);
    report.items_today = ranked(today_totals);
    report.by_weekday = weekday_series(&weekdays);
    report.records = table;
    report
}

/// Largest total first, ties broken by name.
fn ranked(totals: HashMap<&str, u64>) -> Vec<ItemTotal> {
    let mut items: Vec<ItemTotal> = totals
        .into_iter()
        .map(|(item, total)| ItemTotal {
            item: item.to_string(),
            total,
        })
        .collect();
    items.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.item.cmp(&b.item)));
    items
}

fn weekday_series(totals: &[u64; 7]) -> Vec<WeekdayTotal> {
    WEEKDAYS
        .iter()
        .zip(totals)
        .map(|(day, total)| WeekdayTotal {
            day: day.to_string(),
            total: *total,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn records(value: Value) -> Vec<Record> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item.as_object().unwrap().clone())
            .collect()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_input_reports_zeroes() {
        let report = build_report_at(day(2024, 3, 4), &Schema::default(), &[]);
        assert_eq!(report.status, ReportStatus::Empty);
        assert_eq!(report.total_all_time, 0);
        assert_eq!(report.total_today, 0);
        assert!(report.items_all_time.is_empty());
        assert!(report.items_today.is_empty());
        assert!(report.records.is_empty());
        assert_eq!(report.by_weekday.len(), 7);
        assert!(report.by_weekday.iter().all(|entry| entry.total == 0));
    }

    #[test]
    fn single_monday_record_counts_today() {
        let report = build_report_at(
            day(2024, 3, 4),
            &Schema::default(),
            &records(json!([{ "ItemName": "Bolt", "Date": "2024-03-04", "NoOfManufactured": 5 }])),
        );
        assert_eq!(report.status, ReportStatus::Ready);
        assert_eq!(report.total_today, 5);
        assert_eq!(report.item_total_today("Bolt"), 5);
        assert_eq!(report.weekday_total("Monday"), 5);
        for name in &WEEKDAYS[1..] {
            assert_eq!(report.weekday_total(name), 0);
        }
    }

    #[test]
    fn identical_names_are_summed() {
        let report = build_report_at(
            day(2024, 3, 4),
            &Schema::default(),
            &records(json!([
                { "ItemName": "Widget", "Quantity": 3 },
                { "ItemName": "Widget", "Quantity": 4 }
            ])),
        );
        assert_eq!(report.item_total("Widget"), 7);
        assert_eq!(report.total_all_time, 7);
    }

    #[test]
    fn unparseable_date_only_feeds_all_time_totals() {
        let report = build_report_at(
            day(2024, 3, 4),
            &Schema::default(),
            &records(json!([
                { "ItemName": "Widget", "Date": "sometime", "NoOfManufactured": 2 },
                { "ItemName": "Widget", "Date": "2024-03-04", "NoOfManufactured": 1 }
            ])),
        );
        assert_eq!(report.item_total("Widget"), 3);
        assert_eq!(report.total_today, 1);
        assert_eq!(report.by_weekday.iter().map(|entry| entry.total).sum::<u64>(), 1);
        assert_eq!(report.excluded.invalid_date, 1);
        assert_eq!(report.records.len(), 2);
    }

    #[test]
    fn rows_without_item_stay_in_the_table_only() {
        let report = build_report_at(
            day(2024, 3, 4),
            &Schema::default(),
            &records(json!([
                { "Date": "2024-03-04", "NoOfManufactured": 9 },
                { "ItemName": "Nut", "Date": "2024-03-04", "NoOfManufactured": 1 }
            ])),
        );
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.total_all_time, 1);
        assert_eq!(report.total_today, 1);
        assert_eq!(report.weekday_total("Monday"), 1);
        assert_eq!(report.excluded.missing_item, 1);
    }

    #[test]
    fn case_differences_form_distinct_groups() {
        let report = build_report_at(
            day(2024, 3, 4),
            &Schema::default(),
            &records(json!([{ "ItemName": "bolt" }, { "ItemName": "Bolt" }, { "ItemName": "Bolt" }])),
        );
        assert_eq!(report.distinct_items, 2);
        assert_eq!(
            report.items_all_time,
            vec![
                ItemTotal { item: "Bolt".to_string(), total: 2 },
                ItemTotal { item: "bolt".to_string(), total: 1 },
            ]
        );
    }

    #[test]
    fn totals_agree_with_item_sums() {
        let raw = records(json!([
            { "ItemName": "A", "Timestamp": "2024-03-04 09:00:00", "Quantity": "3" },
            { "ItemName": "B", "Timestamp": "2024-03-05 09:00:00", "Quantity": 8 },
            { "ItemName": "A", "Timestamp": "2024-03-10 09:00:00", "Quantity": "bad" },
            { "ItemName": "C", "Timestamp": "later", "Quantity": 2.5 },
            { "Timestamp": "2024-03-04 10:00:00", "Quantity": 4 },
            { "ItemName": "B", "Timestamp": "2024-03-04 11:00:00" }
        ]));
        let report = build_report_at(day(2024, 3, 4), &Schema::default(), &raw);

        let all: u64 = report.items_all_time.iter().map(|entry| entry.total).sum();
        let today: u64 = report.items_today.iter().map(|entry| entry.total).sum();
        assert_eq!(all, report.total_all_time);
        assert_eq!(today, report.total_today);
        assert_eq!(report.total_all_time, 13);
        assert_eq!(report.total_today, 3);
        assert_eq!(report.excluded.invalid_count, 2);

        let days: Vec<_> = report.by_weekday.iter().map(|entry| entry.day.as_str()).collect();
        assert_eq!(days, WEEKDAYS);
        assert_eq!(report.weekday_total("Tuesday"), 8);
        assert_eq!(report.weekday_total("Sunday"), 0);
    }

    #[test]
    fn today_uses_calendar_date_only() {
        let report = build_report_at(
            day(2024, 3, 4),
            &Schema::default(),
            &records(json!([
                { "ItemName": "A", "Date": "2024-03-04T23:59:59" },
                { "ItemName": "A", "Date": "2024-03-05T00:00:00" },
                { "ItemName": "A", "Date": "2024-03-03T23:59:59" }
            ])),
        );
        assert_eq!(report.total_today, 1);
        assert_eq!(report.total_all_time, 3);
    }

    #[test]
    fn raw_table_is_newest_first() {
        let report = build_report_at(
            day(2024, 3, 4),
            &Schema::default(),
            &records(json!([
                { "ItemName": "old", "Date": "2024-01-01" },
                { "ItemName": "new", "Date": "2024-03-01" }
            ])),
        );
        assert_eq!(report.records[0].item_name.as_deref(), Some("new"));
    }
}
