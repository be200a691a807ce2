use tracing_subscriber::EnvFilter;
use women::{make_router, run_app, AppState, Config};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("women=info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(error) => {
            tracing::error!("Invalid configuration: {:#}", error);
            std::process::exit(1);
        }
    };
    let addr = config.bind_address;
    let state = match AppState::new(config).await {
        Ok(state) => state,
        Err(error) => {
            tracing::error!("Startup failed: {:#}", error);
            std::process::exit(1);
        }
    };
    let router = make_router();
    tracing::info!("Server started on {}", addr);
    match run_app(router, state, addr).await {
        Ok(_) => (),
        Err(error) => tracing::error!("Error: {}", error),
    }
}
