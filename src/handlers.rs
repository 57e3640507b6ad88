use crate::charts::build_chart;
use crate::controller::{ensure_fresh, RefreshOutcome};
use crate::errors::{AppError, FetchError};
use crate::models::{ChartData, ChartQuery, RefreshRequest, RefreshResponse, SessionSummary};
use crate::period::{PeriodSelector, Preset, REFERENCE_TZ};
use crate::state::AppState;
use crate::ui::render_index;
use axum::{
    extract::{Query, State},
    response::Html,
    Json,
};
use chrono::{NaiveDate, Utc};

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let session = state.session.lock().await;
    Html(render_index(&session.summary()))
}

pub async fn get_session(State(state): State<AppState>) -> Json<SessionSummary> {
    let session = state.session.lock().await;
    Json(session.summary())
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AppError> {
    let selector = parse_selector(&payload)?;
    let now = Utc::now().with_timezone(&REFERENCE_TZ);

    let outcome = ensure_fresh(
        &state.session,
        state.fetcher.as_ref(),
        selector,
        payload.name_filter.as_deref(),
        now,
    )
    .await;

    let (status, message) = match outcome {
        Ok(RefreshOutcome::Refreshed(_)) => ("refreshed", None),
        Ok(RefreshOutcome::Unchanged) => ("unchanged", None),
        // Empty is a warning, not a failure: prior rows stay on screen.
        Err(FetchError::Empty) => ("empty", Some(FetchError::Empty.to_string())),
        Err(err) => return Err(err.into()),
    };

    let session = state.session.lock().await;
    Ok(Json(RefreshResponse {
        status,
        message,
        session: session.summary(),
    }))
}

pub async fn get_chart(
    State(state): State<AppState>,
    Query(params): Query<ChartQuery>,
) -> Result<Json<ChartData>, AppError> {
    let session = state.session.lock().await;
    if !session.authenticated {
        return Err(AppError::conflict(
            "authenticate first to view data and charts",
        ));
    }
    Ok(Json(build_chart(&session.records, params.kind, params.group)))
}

fn parse_selector(payload: &RefreshRequest) -> Result<PeriodSelector, AppError> {
    if payload.preset == "custom" {
        let start = parse_date(payload.start.as_deref(), "start")?;
        let end = parse_date(payload.end.as_deref(), "end")?;
        return Ok(PeriodSelector::Custom { start, end });
    }

    Preset::parse(&payload.preset)
        .map(PeriodSelector::Preset)
        .ok_or_else(|| AppError::bad_request(format!("unknown preset '{}'", payload.preset)))
}

fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, AppError> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::bad_request(format!("custom period requires '{field}'")))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::bad_request(format!("invalid {field} date '{raw}', expected YYYY-MM-DD")))
}
