use crate::config::Schema;
use crate::models::{ItemTotal, NormalizedRecord, Report, ReportStatus, WeekdayTotal};
use serde_json::Value;
use std::f64::consts::PI;

const PIE_COLORS: [&str; 8] = [
    "#ff6b4a", "#2f4858", "#f6ae2d", "#33658a", "#86bbd8", "#758e4f", "#b96ac9", "#c63b2b",
];

pub fn render_dashboard(report: &Report, schema: &Schema) -> String {
    let items: Vec<(&str, u64)> = report
        .items_all_time
        .iter()
        .map(|ItemTotal { item, total }| (item.as_str(), *total))
        .collect();
    let weekdays: Vec<(&str, u64)> = report
        .by_weekday
        .iter()
        .map(|WeekdayTotal { day, total }| (day.as_str(), *total))
        .collect();

    let today = report.today.to_string();
    let notice = render_notice(report);
    let total = report.total_all_time.to_string();
    let total_today = report.total_today.to_string();
    let distinct = report.distinct_items.to_string();
    let record_count = report.record_count.to_string();
    let item_chart = bar_chart(&items);
    let today_pie = pie_chart(&report.items_today);
    let weekday_chart = bar_chart(&weekdays);
    let table = record_table(&report.records, schema);

    fill_template(INDEX_HTML, |key| match key {
        "TODAY" => Some(today.as_str()),
        "NOTICE" => Some(notice.as_str()),
        "TOTAL" => Some(total.as_str()),
        "TOTAL_TODAY" => Some(total_today.as_str()),
        "ITEMS" => Some(distinct.as_str()),
        "RECORDS" => Some(record_count.as_str()),
        "ITEM_CHART" => Some(item_chart.as_str()),
        "TODAY_PIE" => Some(today_pie.as_str()),
        "WEEKDAY_CHART" => Some(weekday_chart.as_str()),
        "TABLE" => Some(table.as_str()),
        _ => None,
    })
}

/// Substitute `{{KEY}}` placeholders in one pass over the template.
///
/// Substituted text is never scanned again, so record data that happens to
/// spell a placeholder stays literal.
fn fill_template<'a>(template: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = &after[..end];
                match lookup(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(key);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn render_notice(report: &Report) -> String {
    let mut notice = String::new();
    if let Some(warning) = &report.warning {
        notice.push_str(&format!(
            r#"<div class="status" data-type="error">{}</div>"#,
            escape(warning)
        ));
    }
    if report.status == ReportStatus::Empty {
        notice.push_str(r#"<div class="status" data-type="info">No records found.</div>"#);
    }
    let excluded = &report.excluded;
    if excluded.missing_item + excluded.invalid_date + excluded.invalid_count > 0 {
        notice.push_str(&format!(
            r#"<div class="status" data-type="info">{} without item name, {} with unreadable date, {} with missing or unreadable count.</div>"#,
            excluded.missing_item, excluded.invalid_date, excluded.invalid_count
        ));
    }
    notice
}

fn bar_chart(entries: &[(&str, u64)]) -> String {
    if entries.is_empty() {
        return r#"<p class="empty">No data yet</p>"#.to_string();
    }
    let max = entries.iter().map(|(_, total)| *total).max().unwrap_or(0).max(1);
    let rows: String = entries
        .iter()
        .map(|(label, total)| {
            let width = *total as f64 / max as f64 * 100.0;
            format!(
                r#"<div class="bar-row"><span class="bar-label">{label}</span><span class="bar-track"><span class="bar" style="width: {width:.1}%"></span></span><span class="bar-value">{total}</span></div>"#,
                label = escape(label),
            )
        })
        .collect();
    format!(r#"<div class="bars">{rows}</div>"#)
}

fn pie_chart(entries: &[ItemTotal]) -> String {
    let total: u64 = entries.iter().map(|entry| entry.total).sum();
    if total == 0 {
        return r#"<p class="empty">Nothing recorded today</p>"#.to_string();
    }

    let (cx, cy, r) = (100.0_f64, 100.0_f64, 90.0_f64);
    let mut slices = String::new();
    let mut legend = String::new();
    let mut start = -PI / 2.0;

    for (index, entry) in entries.iter().filter(|entry| entry.total > 0).enumerate() {
        let color = PIE_COLORS[index % PIE_COLORS.len()];
        let share = entry.total as f64 / total as f64;
        if share >= 1.0 {
            slices.push_str(&format!(
                r#"<circle cx="{cx}" cy="{cy}" r="{r}" fill="{color}" />"#
            ));
        } else {
            let end = start + share * 2.0 * PI;
            let large_arc = u8::from(share > 0.5);
            slices.push_str(&format!(
                r#"<path d="M {cx} {cy} L {x1:.2} {y1:.2} A {r} {r} 0 {large_arc} 1 {x2:.2} {y2:.2} Z" fill="{color}" />"#,
                x1 = cx + r * start.cos(),
                y1 = cy + r * start.sin(),
                x2 = cx + r * end.cos(),
                y2 = cy + r * end.sin(),
            ));
            start = end;
        }
        legend.push_str(&format!(
            r#"<li><span class="swatch" style="background: {color}"></span>{item} <strong>{count}</strong> ({pct:.0}%)</li>"#,
            item = escape(&entry.item),
            count = entry.total,
            pct = share * 100.0,
        ));
    }

    format!(
        r#"<div class="pie"><svg viewBox="0 0 200 200" role="img" aria-label="Today by item">{slices}</svg><ul class="legend">{legend}</ul></div>"#
    )
}

fn record_table(records: &[NormalizedRecord], schema: &Schema) -> String {
    if records.is_empty() {
        return r#"<p class="empty">No records</p>"#.to_string();
    }

    let columns = table_columns(records, schema);

    let mut head: String = columns
        .iter()
        .map(|column| format!("<th>{}</th>", escape(column)))
        .collect();
    head.push_str("<th>Parsed date</th><th>Day</th><th>Count</th>");

    let body: String = records
        .iter()
        .map(|record| {
            let mut row: String = columns
                .iter()
                .map(|column| {
                    let cell = record.fields.get(*column).map(cell_text).unwrap_or_default();
                    format!("<td>{}</td>", escape(&cell))
                })
                .collect();
            row.push_str(&format!(
                "<td>{}</td><td>{}</td><td>{}</td>",
                record.timestamp.map(|value| value.to_string()).unwrap_or_default(),
                record.day_of_week.unwrap_or_default(),
                record.count,
            ));
            format!("<tr>{row}</tr>")
        })
        .collect();

    format!(r#"<div class="table-wrap"><table><thead><tr>{head}</tr></thead><tbody>{body}</tbody></table></div>"#)
}

/// Schema fields first, in schema order, then every other key seen in any row.
fn table_columns<'a>(records: &'a [NormalizedRecord], schema: &'a Schema) -> Vec<&'a str> {
    let present = |field: &str| records.iter().any(|record| record.fields.contains_key(field));

    let mut columns: Vec<&str> = std::iter::once(&schema.item_field)
        .chain(&schema.date_fields)
        .chain(&schema.count_fields)
        .map(String::as_str)
        .filter(|field| present(field))
        .collect();
    for record in records {
        for key in record.fields.keys() {
            if !schema.is_schema_field(key) && !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }
    columns
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Detected Objects Dashboard</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #f8f3e6;
      --bg-2: #f5d3a7;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #ffe9d4 60%, #f9f2e9 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(1080px, 100%);
      background: var(--card);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 28px;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-size: clamp(2rem, 4vw, 2.6rem);
      margin: 0;
    }

    h2 {
      margin: 0 0 12px;
      font-size: 1.3rem;
    }

    .subtitle {
      margin: 6px 0 0;
      color: #5f5c57;
    }

    .panel,
    .charts {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
      gap: 16px;
    }

    .charts {
      grid-template-columns: repeat(auto-fit, minmax(300px, 1fr));
    }

    .stat,
    .card {
      background: white;
      border-radius: 18px;
      padding: 18px;
      border: 1px solid rgba(47, 72, 88, 0.08);
    }

    .stat .label {
      display: block;
      font-size: 0.85rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #8b857d;
    }

    .stat .value {
      display: block;
      font-size: 1.7rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    .bars {
      display: grid;
      gap: 8px;
    }

    .bar-row {
      display: grid;
      grid-template-columns: 110px 1fr 48px;
      align-items: center;
      gap: 10px;
      font-size: 0.9rem;
    }

    .bar-label {
      overflow: hidden;
      text-overflow: ellipsis;
      white-space: nowrap;
    }

    .bar-track {
      background: rgba(47, 72, 88, 0.08);
      border-radius: 999px;
      height: 12px;
    }

    .bar {
      display: block;
      height: 100%;
      background: var(--accent);
      border-radius: 999px;
    }

    .bar-value {
      text-align: right;
      font-weight: 600;
    }

    .pie {
      display: flex;
      flex-wrap: wrap;
      gap: 16px;
      align-items: center;
    }

    .pie svg {
      width: 180px;
      height: 180px;
    }

    .legend {
      list-style: none;
      margin: 0;
      padding: 0;
      display: grid;
      gap: 6px;
      font-size: 0.9rem;
    }

    .swatch {
      display: inline-block;
      width: 12px;
      height: 12px;
      border-radius: 4px;
      margin-right: 8px;
    }

    .table-wrap {
      overflow-x: auto;
    }

    table {
      width: 100%;
      border-collapse: collapse;
      font-size: 0.9rem;
    }

    th,
    td {
      text-align: left;
      padding: 8px 10px;
      border-bottom: 1px solid rgba(47, 72, 88, 0.08);
      white-space: nowrap;
    }

    th {
      color: #8b857d;
      font-weight: 600;
    }

    .status {
      font-size: 0.95rem;
      color: #6b645d;
    }

    .status[data-type="error"] {
      color: #c63b2b;
    }

    .empty {
      color: #7a746d;
      margin: 0;
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Detected Objects Dashboard</h1>
      <p class="subtitle">Report for {{TODAY}}. Reload to fetch the latest records.</p>
    </header>

    {{NOTICE}}

    <section class="panel">
      <div class="stat">
        <span class="label">Total detected</span>
        <span id="total" class="value">{{TOTAL}}</span>
      </div>
      <div class="stat">
        <span class="label">Detected today</span>
        <span id="total-today" class="value">{{TOTAL_TODAY}}</span>
      </div>
      <div class="stat">
        <span class="label">Item types</span>
        <span id="items" class="value">{{ITEMS}}</span>
      </div>
      <div class="stat">
        <span class="label">Records</span>
        <span id="records" class="value">{{RECORDS}}</span>
      </div>
    </section>

    <section class="charts">
      <div class="card">
        <h2>By item</h2>
        {{ITEM_CHART}}
      </div>
      <div class="card">
        <h2>Today by item</h2>
        {{TODAY_PIE}}
      </div>
      <div class="card">
        <h2>By day of week</h2>
        {{WEEKDAY_CHART}}
      </div>
    </section>

    <section class="card">
      <h2>Records</h2>
      {{TABLE}}
    </section>
  </main>
</body>
</html>
"#;
