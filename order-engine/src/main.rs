use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use order_engine::{
    Config, JsonMenuSource, MemoryOrderStore, MenuCatalog, RolloverScheduler, SessionRegistry,
    SystemClock, print_banner, setup_environment,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (dotenv, work dir, logging)
    let config = setup_environment()?;

    print_banner();

    tracing::info!("Order engine starting...");

    // 2. Core state
    let clock = Arc::new(SystemClock);
    let store = Arc::new(MemoryOrderStore::new());
    let menu_source = Arc::new(JsonMenuSource::new(&config.menu_path));
    let catalog = Arc::new(MenuCatalog::new(
        menu_source,
        clock.clone(),
        config.menu_ttl(),
    ));
    let registry = Arc::new(SessionRegistry::new(
        store.clone(),
        catalog.clone(),
        clock.clone(),
    ));

    // Warm the menu cache up front so the first conversation does
    // not pay the load
    if let Err(e) = catalog.force_refresh().await {
        tracing::warn!(error = %e, "Initial menu load failed, will retry on demand");
    }

    // 3. Background tasks
    let shutdown = CancellationToken::new();

    let scheduler = RolloverScheduler::new(
        store.clone(),
        clock.clone(),
        shutdown.clone(),
        config.recovery_window_days,
    );
    let scheduler_handle = tokio::spawn(scheduler.run());

    let eviction_handle = tokio::spawn({
        let registry = registry.clone();
        let shutdown = shutdown.clone();
        let idle_timeout = config.session_idle_timeout();
        async move {
            let mut ticker = tokio::time::interval(idle_timeout / 2);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = registry.evict_idle(idle_timeout);
                        if evicted > 0 {
                            tracing::info!(evicted, "Idle sessions evicted");
                        }
                    }
                    _ = shutdown.cancelled() => return,
                }
            }
        }
    });

    tracing::info!(
        work_dir = %config.work_dir,
        menu = %config.menu_path,
        "Order engine ready"
    );

    // 4. Run until interrupted
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    shutdown.cancel();
    let _ = scheduler_handle.await;
    let _ = eviction_handle.await;

    tracing::info!("Order engine stopped");
    Ok(())
}
