pub mod app;
pub mod charts;
pub mod config;
pub mod controller;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod period;
pub mod salesforce;
pub mod soql;
pub mod state;
pub mod ui;

pub use app::router;
pub use config::Credentials;
pub use salesforce::SalesforceClient;
pub use state::AppState;
