use asin_cache::api::{self, handlers::AppState};
use asin_cache::config::{Config, StoreBackend};
use asin_cache::core::models::ASIN_CACHE_INVALIDATOR;
use asin_cache::core::services::{CachePolicy, CacheService, InvalidationService};
use asin_cache::infrastructure::{
    bus::NotificationBus,
    fetcher::{ProductFetcher, serpapi::SerpApiClient},
    store::{BlobBackend, BlobStore, file::FileBackend, in_memory::InMemoryBackend},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("fatal: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .init();
    info!(?config, "starting asin-cache");

    match config.store_backend {
        StoreBackend::File => {
            let backend = FileBackend::open(&config.store_root, &config.store_namespace).await?;
            info!(dir = %backend.dir().display(), "using file blob store");
            serve(config, backend).await
        }
        StoreBackend::Memory => serve(config, InMemoryBackend::new()).await,
    }
}

async fn serve<B: BlobBackend + 'static>(config: Config, backend: B) -> Result<(), Box<dyn std::error::Error>> {
    let api_client = SerpApiClient::new(
        &config.serpapi_base_url,
        config.serpapi_key.clone(),
        config.upstream_timeout,
    )?;
    let store = Arc::new(BlobStore::new(backend));
    let fetcher = Arc::new(ProductFetcher::new(api_client));
    let policy = CachePolicy {
        ttl: config.cache_ttl,
        cache_degraded: config.cache_degraded,
    };
    let cache = Arc::new(CacheService::new(store, fetcher, policy));

    let bus = NotificationBus::default();
    // Kept for the life of the process.
    let _observer = bus.subscribe(ASIN_CACHE_INVALIDATOR, |event| {
        let asins: Vec<&str> = event.keys().map(|asin| asin.as_str()).collect();
        info!(?asins, "fresh product data published");
    });
    let invalidation = Arc::new(InvalidationService::new(cache.clone(), bus));

    let app = api::app(AppState {
        cache,
        invalidation,
        tracked: Arc::new(config.tracked_asins.clone()),
    });

    // Start server
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server stopped");
        return Err(e.into());
    }

    Ok(())
}
