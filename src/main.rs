use opp_dashboard::{config, router, AppState, Credentials, SalesforceClient};
use std::{net::SocketAddr, sync::Arc};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Credentials are read once here; missing values only surface when the
    // user triggers the first fetch.
    let credentials = Credentials::from_env();
    let client = Arc::new(SalesforceClient::new(credentials));
    let state = AppState::new(client);

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config::port_from_env()));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
