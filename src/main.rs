// main.rs - Entry point: wire configured exchanges to services and run
// until interrupted.

use env_logger::Env;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use trisync::config::{Config, ExchangeConfig};
use trisync::service::ExchangeServiceHandle;
use trisync::{
    BingxConnector, BitgetConnector, CacheStore, ExchangeId, KucoinConnector, NotificationHub,
    RateLimiter,
};

fn build_service(
    exchange: ExchangeId,
    config: &ExchangeConfig,
    cache_dir: &str,
    hub: NotificationHub,
) -> ExchangeServiceHandle {
    // Each exchange client gets its own pacer; exchanges rate-limit
    // independently of each other.
    let limiter = Arc::new(RateLimiter::new(config.requests_per_second.unwrap_or(1.0)));
    let credentials = config.credentials();
    let cache = CacheStore::new(cache_dir);

    match exchange {
        ExchangeId::Bingx => {
            ExchangeServiceHandle::spawn(BingxConnector::new(credentials, limiter), cache, hub)
        }
        ExchangeId::Bitget => {
            ExchangeServiceHandle::spawn(BitgetConnector::new(credentials, limiter), cache, hub)
        }
        ExchangeId::Kucoin => {
            ExchangeServiceHandle::spawn(KucoinConnector::new(credentials, limiter), cache, hub)
        }
    }
}

#[tokio::main]
async fn main() {
    let config = match Config::from_file("config.toml").await {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error loading configuration: {err}");
            eprintln!("Falling back to default configuration");
            Config::default()
        }
    };

    env_logger::Builder::from_env(
        Env::default().default_filter_or(config.general.log_level.clone()),
    )
    .init();

    let hub = NotificationHub::new();

    // Demo sink: log every change event's store tag. A UI or push gateway
    // subscribes the same way and reads the JSON payload instead.
    let mut events = hub.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(message) => info!("update-data: {}", message.store_name()),
                Err(RecvError::Lagged(skipped)) => warn!("event sink lagged by {skipped}"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut services = Vec::new();
    for (name, exchange_config) in &config.exchanges {
        let Ok(exchange) = name.parse::<ExchangeId>() else {
            warn!("unknown exchange in config: {name}");
            continue;
        };
        if !exchange_config.credentials().is_complete() {
            warn!("{name}: credentials incomplete, service skipped");
            continue;
        }

        let handle = build_service(exchange, exchange_config, &config.general.cache_dir, hub.clone());
        let interval = exchange_config
            .refresh_interval_secs
            .unwrap_or(config.general.refresh_interval_secs);
        handle.start_auto_refresh(Duration::from_secs(interval));
        info!("{exchange} service started (refresh every {interval}s)");
        services.push(handle);
    }

    if services.is_empty() {
        warn!("no exchange configured; add credentials to config.toml and restart");
    }

    tokio::signal::ctrl_c().await.ok();
    info!("shutting down");
    for handle in services {
        handle.stop_auto_refresh();
        handle.shutdown().await;
    }
}
