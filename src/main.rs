use smokelog::{AppState, Config, RecordStore, SurveyStore, router};
use tokio::fs;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    fs::create_dir_all(&config.data_dir).await?;

    let store = RecordStore::open(config.store_path()).await?;
    let settings = store.initialize().await?;
    info!(
        start_date = %settings.start_date,
        daily_goal = settings.daily_goal,
        "record store ready at {}",
        store.path().display()
    );

    let survey = SurveyStore::new(config.survey_path());
    info!("survey answers at {}", survey.path().display());
    let app = router(AppState::new(store, survey));

    let addr = config.socket_addr();
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
