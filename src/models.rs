use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// A CRM sales-pipeline record. Identity is `id`; rows are immutable once
/// fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct Opportunity {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Tz>,
    pub stage: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// One of the named presets, or `"custom"` together with `start`/`end`.
    pub preset: String,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    /// Optional free-text opportunity name or record id filter.
    #[serde(default)]
    pub name_filter: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub authenticated: bool,
    pub total: usize,
    pub period_label: Option<String>,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub session: SessionSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Pie,
    Scatter,
    Line,
    Histogram,
    Box,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    Date,
    Stage,
}

#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    pub kind: ChartKind,
    #[serde(default)]
    pub group: GroupBy,
}

/// One bucket of a counted series (per day or per stage).
#[derive(Debug, PartialEq, Serialize)]
pub struct CountPoint {
    pub label: String,
    pub count: u64,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub date: String,
    pub timestamp: i64,
    pub id: String,
}

/// Five-number summary of creation timestamps for one stage, in epoch
/// seconds plus display dates for the axis.
#[derive(Debug, PartialEq, Serialize)]
pub struct BoxSummary {
    pub stage: String,
    pub min: i64,
    pub q1: i64,
    pub median: i64,
    pub q3: i64,
    pub max: i64,
    pub min_date: String,
    pub max_date: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartData {
    Bar { title: String, points: Vec<CountPoint> },
    Pie { title: String, slices: Vec<CountPoint> },
    Scatter { title: String, points: Vec<ScatterPoint> },
    Line { title: String, points: Vec<CountPoint> },
    Histogram { title: String, points: Vec<CountPoint> },
    Box { title: String, groups: Vec<BoxSummary> },
}
