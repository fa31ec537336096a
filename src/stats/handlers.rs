use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::{macros::format_description, Date, Duration, Month, OffsetDateTime};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    state::AppState,
    transactions::{
        dto::parse_date_range,
        repo::{Transaction, TxKind},
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats/summary", get(summary))
        .route("/stats/categories", get(by_category))
        .route("/stats/timeline", get(timeline))
        .route("/predict", get(predict))
}

#[derive(Debug, Default, Deserialize)]
struct RangeQuery {
    date_from: Option<String>,
    date_to: Option<String>,
}

#[derive(Debug, Serialize)]
struct SummaryResponse {
    income: f64,
    expense: f64,
}

#[instrument(skip(state))]
async fn summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<RangeQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let (from, to) = parse_date_range(query.date_from.as_deref(), query.date_to.as_deref())?;
    let (income, expense) = Transaction::summary(&state.db, user_id, from, to).await?;
    Ok(Json(SummaryResponse { income, expense }))
}

#[instrument(skip(state))]
async fn by_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<RangeQuery>,
) -> Result<Json<BTreeMap<String, f64>>, ApiError> {
    let (from, to) = parse_date_range(query.date_from.as_deref(), query.date_to.as_deref())?;
    let rows = Transaction::by_category(&state.db, user_id, from, to).await?;
    Ok(Json(rows.into_iter().collect()))
}

#[derive(Debug, Default, Deserialize)]
struct TimelineQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    range: Option<String>,
}

/// Daily totals over the trailing week or month, zero-filled so charts get
/// a point for every day in the range, activity or not.
#[instrument(skip(state))]
async fn timeline(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<TimelineQuery>,
) -> Result<Json<BTreeMap<String, f64>>, ApiError> {
    let kind = match query.kind.as_deref() {
        None => TxKind::Expense,
        Some(s) => TxKind::parse(s)
            .ok_or_else(|| ApiError::Validation("invalid type. Must be 'expense' or 'income'".into()))?,
    };

    let now = OffsetDateTime::now_utc();
    let start = match query.range.as_deref().unwrap_or("month") {
        "week" => now - Duration::days(7),
        "month" => one_month_before(now),
        _ => {
            return Err(ApiError::Validation(
                "invalid range. Must be 'week' or 'month'".into(),
            ))
        }
    };

    let list = Transaction::list_for_user(&state.db, user_id, Some(start), Some(now), Some(kind))
        .await?;
    Ok(Json(zero_filled_daily(start.date(), now.date(), &list)))
}

#[derive(Debug, Deserialize)]
struct PredictQuery {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    average_per_day: f64,
    days_next_month: f64,
    predicted_total: f64,
}

/// Next month's expected total: the current month's daily average,
/// extrapolated over next month's length.
#[instrument(skip(state))]
async fn predict(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<PredictQuery>,
) -> Result<Json<PredictResponse>, ApiError> {
    let kind = TxKind::parse(&query.kind)
        .ok_or_else(|| ApiError::Validation("invalid type. Must be 'expense' or 'income'".into()))?;

    let now = OffsetDateTime::now_utc();
    let first = now
        .date()
        .replace_day(1)
        .expect("every month has a first day");
    let month_start = first.midnight().assume_utc();

    let list = Transaction::list_for_user(
        &state.db,
        user_id,
        Some(month_start),
        Some(now),
        Some(kind),
    )
    .await?;
    let total: f64 = list.iter().map(|tx| tx.amount).sum();

    let mut days_passed = (now - month_start).as_seconds_f64() / 86_400.0;
    if days_passed == 0.0 {
        days_passed = 1.0;
    }

    let average_per_day = total / days_passed;
    let days_next_month = days_in_following_month(now.date()) as f64;

    Ok(Json(PredictResponse {
        average_per_day,
        days_next_month,
        predicted_total: average_per_day * days_next_month,
    }))
}

/// One calendar month earlier, the day clamped to the target month's length
/// (March 31 goes to the last day of February).
fn one_month_before(dt: OffsetDateTime) -> OffsetDateTime {
    let date = dt.date();
    let (year, month) = match date.month() {
        Month::January => (date.year() - 1, Month::December),
        m => (date.year(), m.previous()),
    };
    let day = date.day().min(time::util::days_in_month(month, year));
    let shifted = Date::from_calendar_date(year, month, day).expect("clamped day is valid");
    dt.replace_date(shifted)
}

fn days_in_following_month(date: Date) -> u8 {
    let (year, month) = match date.month() {
        Month::December => (date.year() + 1, Month::January),
        m => (date.year(), m.next()),
    };
    time::util::days_in_month(month, year)
}

/// Bucket transaction amounts by day, with an explicit zero for every day
/// of the inclusive range.
fn zero_filled_daily(start: Date, end: Date, list: &[Transaction]) -> BTreeMap<String, f64> {
    let day_format = format_description!("[year]-[month]-[day]");
    let format_day =
        |d: Date| d.format(&day_format).expect("date formats with a static description");

    let mut buckets = BTreeMap::new();
    let mut day = start;
    while day <= end {
        buckets.insert(format_day(day), 0.0);
        match day.next_day() {
            Some(next) => day = next,
            None => break,
        }
    }

    for tx in list {
        *buckets.entry(format_day(tx.date.date())).or_insert(0.0) += tx.amount;
    }
    buckets
}
