use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = meu_rdo::config::CONFIG.clone()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.basic.database_url,
        listen_addr = %cfg.basic.listen_addr,
        storage_root = %cfg.storage.root.display(),
        loglevel = %cfg.basic.loglevel,
        free_max_obras = cfg.plans.free_max_obras,
        billing = !cfg.billing.secret_key.is_empty(),
    );
    if let Err(e) = cfg.validate() {
        error!(error = %e, "refusing to start");
        return Err(e.into());
    }

    let storage = meu_rdo::db::Storage::connect(&cfg.basic.database_url).await?;
    tokio::fs::create_dir_all(&cfg.storage.root).await?;

    let addr = cfg.basic.listen_addr.clone();
    let state = meu_rdo::router::RdoState::new(storage, cfg).await?;
    let app = meu_rdo::router::rdo_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}
