use crate::config::Schema;
use crate::models::Report;
use crate::source::RecordSource;
use crate::stats::build_report_at;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn RecordSource>,
    pub schema: Arc<Schema>,
}

impl AppState {
    pub fn new(source: Arc<dyn RecordSource>, schema: Schema) -> Self {
        Self {
            source,
            schema: Arc::new(schema),
        }
    }

    /// Fetch the whole table and aggregate it. A failed fetch degrades to an
    /// empty report carrying the failure as a warning.
    pub async fn report(&self, today: NaiveDate) -> Report {
        let (records, warning) = match self.source.scan().await {
            Ok(records) => (records, None),
            Err(err) => {
                warn!(source = %self.source.describe(), "retrieval failed: {err}");
                (Vec::new(), Some(format!("Could not load records: {err}")))
            }
        };

        let mut report = build_report_at(today, &self.schema, &records);
        report.warning = warning;
        info!(
            records = report.record_count,
            total = report.total_all_time,
            today = %today,
            "report built"
        );
        report
    }
}
