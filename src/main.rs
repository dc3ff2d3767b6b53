use dca_profit::{api, config::Config, DefiLlamaPriceSource, PriceSource, ProfitEngine};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let prices: Arc<dyn PriceSource> = Arc::new(DefiLlamaPriceSource::new(
        config.price_api_url.clone(),
        config.price_max_retry,
    ));
    let engine = Arc::new(ProfitEngine::new(prices));

    let addr = SocketAddr::new(config.bind_addr, config.port);
    let app = api::create_router(api::AppState::new(engine, config));

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
