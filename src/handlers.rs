use crate::errors::AppError;
use crate::models::{Report, ReportQuery, TodayResponse};
use crate::normalize::parse_timestamp;
use crate::state::AppState;
use crate::ui::render_dashboard;
use axum::{
    extract::{Query, State},
    response::Html,
    Json,
};
use chrono::{Local, NaiveDate};

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Html<String>, AppError> {
    let today = reference_date(&query)?;
    let report = state.report(today).await;
    Ok(Html(render_dashboard(&report, &state.schema)))
}

pub async fn get_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Report>, AppError> {
    let today = reference_date(&query)?;
    Ok(Json(state.report(today).await))
}

pub async fn get_today(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<TodayResponse>, AppError> {
    let today = reference_date(&query)?;
    let report = state.report(today).await;
    Ok(Json(TodayResponse {
        date: today.to_string(),
        total: report.total_today,
        items: report.items_today,
        warning: report.warning,
    }))
}

fn reference_date(query: &ReportQuery) -> Result<NaiveDate, AppError> {
    match query.today.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => parse_timestamp(value)
            .map(|timestamp| timestamp.date())
            .ok_or_else(|| AppError::bad_request(format!("today must be a date like 2024-03-04, got '{value}'"))),
        None => Ok(Local::now().date_naive()),
    }
}
