use toolrelay::config::AppConfig;
use toolrelay::mcp::Registry;
use toolrelay::routes::configure_routes;
use toolrelay::state::AppState;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("toolrelay=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let registry = Registry::load(&config.registry_path);

    let state = match AppState::from_config(&config, registry) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize the model provider");
            std::process::exit(1);
        }
    };

    tracing::info!(
        addr = %config.bind_addr,
        model = %config.openai.model,
        registry = %config.registry_path.display(),
        "starting server"
    );
    warp::serve(configure_routes(state)).run(config.bind_addr).await;
}
