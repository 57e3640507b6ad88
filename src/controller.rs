//! Decides when a user action turns into a remote fetch, and applies the
//! result to the session.

use crate::errors::FetchError;
use crate::period::{resolve, PeriodSelector};
use crate::salesforce::OpportunityFetcher;
use crate::soql::opportunity_query;
use crate::state::SessionState;
use chrono::DateTime;
use chrono_tz::Tz;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The fetch ran and the session now holds this many rows.
    Refreshed(usize),
    /// Preset and filter match the cached state; no remote call was made.
    Unchanged,
}

/// One user-triggered refresh cycle. Resolves the period, skips the fetch
/// when the cached named preset (and filter) still match, and otherwise
/// runs the query once. Any failure leaves the session exactly as it was,
/// so the dashboard keeps showing the last-known-good rows.
pub async fn ensure_fresh(
    session: &Mutex<SessionState>,
    fetcher: &dyn OpportunityFetcher,
    selector: PeriodSelector,
    name_filter: Option<&str>,
    now: DateTime<Tz>,
) -> Result<RefreshOutcome, FetchError> {
    let period = resolve(selector, now)?;
    let filter = name_filter
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty());

    {
        let state = session.lock().await;
        // Named presets are compared by explicit selector equality; a custom
        // range always re-fetches on request since its boundary comparison
        // is treated as potentially stale.
        if state.authenticated && matches!(selector, PeriodSelector::Preset(_)) {
            let same_preset =
                state.current_period.as_ref().map(|p| p.selector) == Some(selector);
            if same_preset && state.current_filter == filter {
                return Ok(RefreshOutcome::Unchanged);
            }
        }
    }

    let query = opportunity_query(&period, filter.as_deref());
    let records = fetcher.fetch_opportunities(&query).await?;
    if records.is_empty() {
        // Keep whatever was fetched before; the caller surfaces the warning.
        warn!("no opportunities for period {:?}", period.label);
        return Err(FetchError::Empty);
    }

    let total = records.len();
    let mut state = session.lock().await;
    state.records = records;
    state.current_period = Some(period);
    state.current_filter = filter;
    state.last_query = Some(query);
    state.authenticated = true;
    info!("session refreshed: {total} opportunities");

    Ok(RefreshOutcome::Refreshed(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Opportunity;
    use crate::period::{Preset, REFERENCE_TZ};
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedFetcher {
        calls: AtomicUsize,
        result: std::sync::Mutex<Result<Vec<Opportunity>, FetchError>>,
        last_query: std::sync::Mutex<Option<String>>,
    }

    impl ScriptedFetcher {
        fn returning(result: Result<Vec<Opportunity>, FetchError>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                result: std::sync::Mutex::new(result),
                last_query: std::sync::Mutex::new(None),
            }
        }

        fn set_result(&self, result: Result<Vec<Opportunity>, FetchError>) {
            *self.result.lock().unwrap() = result;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OpportunityFetcher for ScriptedFetcher {
        async fn fetch_opportunities(&self, soql: &str) -> Result<Vec<Opportunity>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_query.lock().unwrap() = Some(soql.to_string());
            self.result.lock().unwrap().clone()
        }
    }

    fn rows(n: usize) -> Vec<Opportunity> {
        (0..n)
            .map(|i| Opportunity {
                id: format!("006{i:015}"),
                name: format!("Deal {i}"),
                created_at: REFERENCE_TZ
                    .with_ymd_and_hms(2024, 3, 10 + i as u32, 9, 0, 0)
                    .single()
                    .unwrap(),
                stage: "New".to_string(),
            })
            .collect()
    }

    fn now() -> DateTime<Tz> {
        REFERENCE_TZ.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).single().unwrap()
    }

    fn last_7_days() -> PeriodSelector {
        PeriodSelector::Preset(Preset::Last7Days)
    }

    fn custom(start: (i32, u32, u32), end: (i32, u32, u32)) -> PeriodSelector {
        PeriodSelector::Custom {
            start: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        }
    }

    #[tokio::test]
    async fn unchanged_preset_fetches_exactly_once() {
        let fetcher = ScriptedFetcher::returning(Ok(rows(2)));
        let session = Mutex::new(SessionState::default());

        let first = ensure_fresh(&session, &fetcher, last_7_days(), None, now())
            .await
            .unwrap();
        assert_eq!(first, RefreshOutcome::Refreshed(2));

        let second = ensure_fresh(&session, &fetcher, last_7_days(), None, now())
            .await
            .unwrap();
        assert_eq!(second, RefreshOutcome::Unchanged);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn changed_preset_refetches() {
        let fetcher = ScriptedFetcher::returning(Ok(rows(1)));
        let session = Mutex::new(SessionState::default());

        ensure_fresh(&session, &fetcher, last_7_days(), None, now())
            .await
            .unwrap();
        ensure_fresh(
            &session,
            &fetcher,
            PeriodSelector::Preset(Preset::CurrentMonth),
            None,
            now(),
        )
        .await
        .unwrap();
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn custom_range_always_refetches() {
        let fetcher = ScriptedFetcher::returning(Ok(rows(1)));
        let session = Mutex::new(SessionState::default());
        let selector = custom((2024, 1, 1), (2024, 1, 31));

        ensure_fresh(&session, &fetcher, selector, None, now())
            .await
            .unwrap();
        let again = ensure_fresh(&session, &fetcher, selector, None, now())
            .await
            .unwrap();
        assert_eq!(again, RefreshOutcome::Refreshed(1));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn changed_filter_refetches_same_preset() {
        let fetcher = ScriptedFetcher::returning(Ok(rows(1)));
        let session = Mutex::new(SessionState::default());

        ensure_fresh(&session, &fetcher, last_7_days(), None, now())
            .await
            .unwrap();
        ensure_fresh(&session, &fetcher, last_7_days(), Some("Acme"), now())
            .await
            .unwrap();
        assert_eq!(fetcher.calls(), 2);
        assert!(
            fetcher
                .last_query
                .lock()
                .unwrap()
                .as_deref()
                .unwrap()
                .contains("Acme")
        );
    }

    #[tokio::test]
    async fn invalid_custom_range_never_reaches_the_fetcher() {
        let fetcher = ScriptedFetcher::returning(Ok(rows(1)));
        let session = Mutex::new(SessionState::default());
        let selector = custom((2024, 2, 10), (2024, 1, 1));

        let err = ensure_fresh(&session, &fetcher, selector, None, now())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidRange { .. }));
        assert_eq!(fetcher.calls(), 0);
        assert!(!session.lock().await.authenticated);
    }

    #[tokio::test]
    async fn empty_result_preserves_prior_rows() {
        let fetcher = ScriptedFetcher::returning(Ok(rows(3)));
        let session = Mutex::new(SessionState::default());

        ensure_fresh(&session, &fetcher, last_7_days(), None, now())
            .await
            .unwrap();
        let cached_label = session
            .lock()
            .await
            .current_period
            .as_ref()
            .unwrap()
            .label
            .clone();

        fetcher.set_result(Ok(Vec::new()));
        let err = ensure_fresh(
            &session,
            &fetcher,
            PeriodSelector::Preset(Preset::CurrentWeek),
            None,
            now(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, FetchError::Empty);

        let state = session.lock().await;
        assert_eq!(state.records.len(), 3);
        assert!(state.authenticated);
        assert_eq!(state.current_period.as_ref().unwrap().label, cached_label);
    }

    #[tokio::test]
    async fn empty_first_fetch_does_not_authenticate() {
        let fetcher = ScriptedFetcher::returning(Ok(Vec::new()));
        let session = Mutex::new(SessionState::default());

        let err = ensure_fresh(&session, &fetcher, last_7_days(), None, now())
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Empty);

        let state = session.lock().await;
        assert!(!state.authenticated);
        assert!(state.records.is_empty());
        assert!(state.current_period.is_none());
    }

    #[tokio::test]
    async fn remote_failure_leaves_last_known_good_state() {
        let fetcher = ScriptedFetcher::returning(Ok(rows(2)));
        let session = Mutex::new(SessionState::default());

        ensure_fresh(&session, &fetcher, last_7_days(), None, now())
            .await
            .unwrap();

        fetcher.set_result(Err(FetchError::Remote("INVALID_LOGIN".into())));
        let err = ensure_fresh(
            &session,
            &fetcher,
            PeriodSelector::Preset(Preset::CurrentQuarter),
            None,
            now(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, FetchError::Remote("INVALID_LOGIN".into()));

        let state = session.lock().await;
        assert!(state.authenticated);
        assert_eq!(state.records.len(), 2);
    }

    #[tokio::test]
    async fn first_fetch_records_query_text() {
        let fetcher = ScriptedFetcher::returning(Ok(rows(1)));
        let session = Mutex::new(SessionState::default());

        ensure_fresh(&session, &fetcher, last_7_days(), None, now())
            .await
            .unwrap();

        let state = session.lock().await;
        let query = state.last_query.as_deref().unwrap();
        assert!(query.contains("FROM Opportunity"));
        assert!(query.contains("StageName IN ('New', 'New Business')"));
    }
}
