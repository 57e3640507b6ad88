use crate::period::ResolvedPeriod;
use chrono::DateTime;
use chrono_tz::Tz;

/// Stages counted as new business; every fetch is restricted to these.
pub const NEW_BUSINESS_STAGES: [&str; 2] = ["New", "New Business"];

/// Builds the Opportunity query for a resolved period. Datetime bounds come
/// from trusted resolved instants; any user-supplied filter text is escaped
/// before it reaches the clause, never concatenated raw.
pub fn opportunity_query(period: &ResolvedPeriod, name_filter: Option<&str>) -> String {
    let stages = NEW_BUSINESS_STAGES
        .iter()
        .map(|stage| format!("'{}'", escape_literal(stage)))
        .collect::<Vec<_>>()
        .join(", ");

    let mut query = format!(
        "SELECT Id, Name, StageName, CreatedDate FROM Opportunity \
         WHERE CreatedDate >= {} AND CreatedDate <= {} AND StageName IN ({stages})",
        datetime_literal(period.start),
        datetime_literal(period.end),
    );

    if let Some(filter) = name_filter.map(str::trim).filter(|f| !f.is_empty()) {
        let escaped = escape_literal(filter);
        query.push_str(&format!(
            " AND (Name LIKE '%{escaped}%' OR Id = '{escaped}')"
        ));
    }

    query.push_str(" ORDER BY CreatedDate");
    query
}

/// SOQL datetime literals are unquoted ISO-8601 with a zone offset and no
/// fractional seconds.
fn datetime_literal(instant: DateTime<Tz>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Escapes a string for use inside a single-quoted SOQL literal.
fn escape_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::{resolve, PeriodSelector, Preset, REFERENCE_TZ};
    use chrono::DateTime;

    fn sample_period() -> ResolvedPeriod {
        let now = DateTime::parse_from_rfc3339("2024-03-15T10:00:00-05:00")
            .unwrap()
            .with_timezone(&REFERENCE_TZ);
        resolve(PeriodSelector::Preset(Preset::Last7Days), now).unwrap()
    }

    #[test]
    fn query_embeds_resolved_bounds_and_stage_filter() {
        let query = opportunity_query(&sample_period(), None);
        assert!(query.contains("CreatedDate >= 2024-03-08T10:00:00-05:00"));
        assert!(query.contains("CreatedDate <= 2024-03-15T11:00:00-04:00"));
        assert!(query.contains("StageName IN ('New', 'New Business')"));
        assert!(query.ends_with("ORDER BY CreatedDate"));
        assert!(!query.contains("LIKE"));
    }

    #[test]
    fn name_filter_is_escaped() {
        let query = opportunity_query(&sample_period(), Some("O'Brien \\ Sons"));
        assert!(query.contains("Name LIKE '%O\\'Brien \\\\ Sons%'"));
        assert!(query.contains("OR Id = 'O\\'Brien \\\\ Sons'"));
    }

    #[test]
    fn blank_name_filter_is_ignored() {
        let query = opportunity_query(&sample_period(), Some("   "));
        assert!(!query.contains("LIKE"));
    }
}
