use crate::errors::FetchError;
use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

/// Every period boundary and record timestamp in the system is computed
/// against US Eastern, regardless of the server's local zone.
pub const REFERENCE_TZ: Tz = chrono_tz::America::New_York;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    CurrentWeek,
    CurrentMonth,
    CurrentQuarter,
    Last7Days,
    Last30Days,
    Last90Days,
    Last3Years,
}

impl Preset {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "current_week" => Some(Self::CurrentWeek),
            "current_month" => Some(Self::CurrentMonth),
            "current_quarter" => Some(Self::CurrentQuarter),
            "last_7_days" => Some(Self::Last7Days),
            "last_30_days" => Some(Self::Last30Days),
            "last_90_days" => Some(Self::Last90Days),
            "last_3_years" => Some(Self::Last3Years),
            _ => None,
        }
    }

    /// Window size for the sliding presets; `None` for the calendar ones.
    fn sliding_days(self) -> Option<i64> {
        match self {
            Self::Last7Days => Some(7),
            Self::Last30Days => Some(30),
            Self::Last90Days => Some(90),
            Self::Last3Years => Some(1095),
            _ => None,
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            Self::CurrentWeek => "Current week",
            Self::CurrentMonth => "Current month",
            Self::CurrentQuarter => "Current quarter",
            Self::Last7Days => "Last 7 days",
            Self::Last30Days => "Last 30 days",
            Self::Last90Days => "Last 90 days",
            Self::Last3Years => "Last 3 years",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodSelector {
    Preset(Preset),
    Custom { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPeriod {
    pub selector: PeriodSelector,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub label: String,
}

/// Maps a period selector plus a reference "now" to concrete bounds in the
/// reference timezone. Fails only for a custom range with start after end.
pub fn resolve(selector: PeriodSelector, now: DateTime<Tz>) -> Result<ResolvedPeriod, FetchError> {
    let (start, end, label) = match selector {
        PeriodSelector::Preset(preset) => resolve_preset(preset, now),
        PeriodSelector::Custom { start, end } => {
            if start > end {
                return Err(FetchError::InvalidRange { start, end });
            }
            (
                at(start, 0, 0, 0),
                last_instant_of(end),
                format!("{} to {}", long_date(start), long_date(end)),
            )
        }
    };

    Ok(ResolvedPeriod {
        selector,
        start,
        end,
        label,
    })
}

fn resolve_preset(preset: Preset, now: DateTime<Tz>) -> (DateTime<Tz>, DateTime<Tz>, String) {
    if let Some(days) = preset.sliding_days() {
        // Sliding windows end at the instant of resolution; the start is
        // deliberately not truncated to midnight.
        let start = now - Duration::days(days);
        let label = format!(
            "{}: {} to {}",
            preset.display_name(),
            long_date(start.date_naive()),
            long_date(now.date_naive())
        );
        return (start, now, label);
    }

    let today = now.date_naive();
    match preset {
        Preset::CurrentWeek => {
            let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
            let sunday = monday + Duration::days(6);
            let label = format!("Week of {} to {}", long_date(monday), long_date(sunday));
            (at(monday, 0, 0, 0), at(sunday, 23, 59, 59), label)
        }
        Preset::CurrentMonth => {
            let first = ymd(today.year(), today.month(), 1);
            let last = ymd(
                today.year(),
                today.month(),
                days_in_month(today.year(), today.month()),
            );
            let label = now.format("%B %Y").to_string();
            (at(first, 0, 0, 0), at(last, 23, 59, 59), label)
        }
        Preset::CurrentQuarter => {
            let quarter = (today.month() - 1) / 3 + 1;
            let first_month = (quarter - 1) * 3 + 1;
            let last_month = first_month + 2;
            let first = ymd(today.year(), first_month, 1);
            let last = ymd(
                today.year(),
                last_month,
                days_in_month(today.year(), last_month),
            );
            let label = format!("Q{quarter} {}", today.year());
            (at(first, 0, 0, 0), at(last, 23, 59, 59), label)
        }
        _ => unreachable!("sliding presets handled above"),
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
                29
            } else {
                28
            }
        }
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("day never exceeds days_in_month")
}

fn at(date: NaiveDate, hour: u32, min: u32, sec: u32) -> DateTime<Tz> {
    localize(date.and_hms_opt(hour, min, sec).expect("clock time in range"))
}

fn last_instant_of(date: NaiveDate) -> DateTime<Tz> {
    localize(
        date.and_hms_nano_opt(23, 59, 59, 999_999_999)
            .expect("clock time in range"),
    )
}

fn localize(naive: NaiveDateTime) -> DateTime<Tz> {
    match REFERENCE_TZ.from_local_datetime(&naive) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t,
        // Day boundaries never fall in the New York spring-forward gap
        // (02:00-03:00); map through UTC rather than panic if one ever does.
        LocalResult::None => REFERENCE_TZ.from_utc_datetime(&naive),
    }
}

fn long_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}
