//! Re-aggregates the cached opportunity table into the series the in-page
//! SVG renderer draws. Same table and chart kind always produce the same
//! aggregation.

use crate::models::{
    BoxSummary, ChartData, ChartKind, CountPoint, GroupBy, Opportunity, ScatterPoint,
};
use chrono::DateTime;
use chrono_tz::Tz;
use std::collections::BTreeMap;

pub fn build_chart(records: &[Opportunity], kind: ChartKind, group: GroupBy) -> ChartData {
    match kind {
        ChartKind::Bar => ChartData::Bar {
            title: counted_title(group),
            points: counted(records, group),
        },
        ChartKind::Line => ChartData::Line {
            title: "Opportunities Created Over Time".to_string(),
            points: counted(records, group),
        },
        ChartKind::Histogram => ChartData::Histogram {
            title: "Distribution of Opportunities by Creation Date".to_string(),
            points: counted(records, group),
        },
        ChartKind::Pie => ChartData::Pie {
            title: match group {
                GroupBy::Stage => "Opportunity Stage Distribution".to_string(),
                GroupBy::Date => "Opportunities by Creation Date".to_string(),
            },
            slices: counted(records, group),
        },
        ChartKind::Scatter => ChartData::Scatter {
            title: "Opportunities Created Over Time".to_string(),
            points: scatter_points(records),
        },
        ChartKind::Box => ChartData::Box {
            title: "Opportunities by Stage".to_string(),
            groups: box_summaries(records),
        },
    }
}

fn counted_title(group: GroupBy) -> String {
    match group {
        GroupBy::Date => "Opportunities Created Per Day".to_string(),
        GroupBy::Stage => "Opportunities by Stage".to_string(),
    }
}

/// Counts per calendar day (reference timezone) or per stage. BTreeMap
/// keeps the bucket order stable.
fn counted(records: &[Opportunity], group: GroupBy) -> Vec<CountPoint> {
    let mut buckets: BTreeMap<String, u64> = BTreeMap::new();
    for record in records {
        let key = match group {
            GroupBy::Date => day_key(record.created_at),
            GroupBy::Stage => record.stage.clone(),
        };
        *buckets.entry(key).or_default() += 1;
    }

    buckets
        .into_iter()
        .map(|(label, count)| CountPoint { label, count })
        .collect()
}

fn scatter_points(records: &[Opportunity]) -> Vec<ScatterPoint> {
    let mut points: Vec<ScatterPoint> = records
        .iter()
        .map(|record| ScatterPoint {
            date: day_key(record.created_at),
            timestamp: record.created_at.timestamp(),
            id: record.id.clone(),
        })
        .collect();
    points.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
    points
}

fn box_summaries(records: &[Opportunity]) -> Vec<BoxSummary> {
    let mut by_stage: BTreeMap<&str, Vec<DateTime<Tz>>> = BTreeMap::new();
    for record in records {
        by_stage
            .entry(record.stage.as_str())
            .or_default()
            .push(record.created_at);
    }

    by_stage
        .into_iter()
        .map(|(stage, mut times)| {
            times.sort();
            let seconds: Vec<i64> = times.iter().map(|t| t.timestamp()).collect();
            BoxSummary {
                stage: stage.to_string(),
                min: seconds[0],
                q1: percentile(&seconds, 0.25),
                median: percentile(&seconds, 0.5),
                q3: percentile(&seconds, 0.75),
                max: seconds[seconds.len() - 1],
                min_date: day_key(times[0]),
                max_date: day_key(times[times.len() - 1]),
            }
        })
        .collect()
}

fn day_key(instant: DateTime<Tz>) -> String {
    instant.date_naive().format("%Y-%m-%d").to_string()
}

/// Linear-interpolated percentile over a sorted, non-empty slice.
fn percentile(sorted: &[i64], p: f64) -> i64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    (sorted[lo] as f64 + (sorted[hi] - sorted[lo]) as f64 * frac).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::REFERENCE_TZ;
    use chrono::TimeZone;

    fn opp(id: &str, stage: &str, day: u32, hour: u32) -> Opportunity {
        Opportunity {
            id: id.to_string(),
            name: format!("Deal {id}"),
            created_at: REFERENCE_TZ
                .with_ymd_and_hms(2024, 3, day, hour, 0, 0)
                .single()
                .unwrap(),
            stage: stage.to_string(),
        }
    }

    fn sample() -> Vec<Opportunity> {
        vec![
            opp("a", "New", 11, 9),
            opp("b", "New", 11, 15),
            opp("c", "New Business", 12, 8),
            opp("d", "New", 13, 10),
        ]
    }

    #[test]
    fn daily_counts_bucket_by_reference_day() {
        let records = sample();
        let points = counted(&records, GroupBy::Date);
        assert_eq!(
            points,
            vec![
                CountPoint { label: "2024-03-11".into(), count: 2 },
                CountPoint { label: "2024-03-12".into(), count: 1 },
                CountPoint { label: "2024-03-13".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn stage_counts_cover_both_categories() {
        let records = sample();
        let points = counted(&records, GroupBy::Stage);
        assert_eq!(
            points,
            vec![
                CountPoint { label: "New".into(), count: 3 },
                CountPoint { label: "New Business".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn scatter_is_ordered_by_creation_time() {
        let records = vec![opp("late", "New", 14, 9), opp("early", "New", 11, 9)];
        let points = scatter_points(&records);
        assert_eq!(points[0].id, "early");
        assert_eq!(points[1].id, "late");
        assert!(points[0].timestamp < points[1].timestamp);
    }

    #[test]
    fn box_summary_orders_the_five_numbers() {
        let records = sample();
        let groups = box_summaries(&records);
        assert_eq!(groups.len(), 2);

        let new = &groups[0];
        assert_eq!(new.stage, "New");
        assert!(new.min <= new.q1 && new.q1 <= new.median);
        assert!(new.median <= new.q3 && new.q3 <= new.max);
        assert_eq!(new.min_date, "2024-03-11");
        assert_eq!(new.max_date, "2024-03-13");

        // Single-element stage collapses to one value.
        let single = &groups[1];
        assert_eq!(single.min, single.max);
        assert_eq!(single.median, single.min);
    }

    #[test]
    fn empty_table_yields_empty_series() {
        assert!(counted(&[], GroupBy::Date).is_empty());
        assert!(scatter_points(&[]).is_empty());
        assert!(box_summaries(&[]).is_empty());
    }

    #[test]
    fn same_table_same_aggregation() {
        let records = sample();
        let first = counted(&records, GroupBy::Date);
        let second = counted(&records, GroupBy::Date);
        assert_eq!(first, second);
    }
}
