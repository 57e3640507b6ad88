use crate::models::{Opportunity, SessionSummary};
use crate::period::ResolvedPeriod;
use crate::salesforce::OpportunityFetcher;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-process dashboard session. Starts unauthenticated and empty; only a
/// fetch cycle mutates it, and it lives for the process lifetime.
#[derive(Debug, Default)]
pub struct SessionState {
    pub authenticated: bool,
    pub records: Vec<Opportunity>,
    pub current_period: Option<ResolvedPeriod>,
    pub current_filter: Option<String>,
    pub last_query: Option<String>,
}

impl SessionState {
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            authenticated: self.authenticated,
            total: self.records.len(),
            period_label: self.current_period.as_ref().map(|p| p.label.clone()),
            period_start: self.current_period.as_ref().map(|p| p.start.to_rfc3339()),
            period_end: self.current_period.as_ref().map(|p| p.end.to_rfc3339()),
            query: self.last_query.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<SessionState>>,
    pub fetcher: Arc<dyn OpportunityFetcher>,
}

impl AppState {
    pub fn new(fetcher: Arc<dyn OpportunityFetcher>) -> Self {
        Self {
            session: Arc::new(Mutex::new(SessionState::default())),
            fetcher,
        }
    }
}
