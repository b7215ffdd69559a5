//! cw-responder: answers `weather.current` requests from a short-TTL cache
//! backed by the upstream weather API.

use std::sync::Arc;

use cweather::cli::{self, ResponderArgs};
use cweather_core::{AppError, Config};
use cweather_services::shutdown::shutdown_on_signal;
use cweather_services::transport::{connect, subscribe};
use cweather_services::{LoggingObserver, NatsReplySink, Responder, Server};
use cweather_weather::{OpenWeatherProvider, ResponseCache};

#[tokio::main]
async fn main() {
    let args: ResponderArgs = cli::parse_or_exit();

    if let Err(e) = cweather_core::init() {
        eprintln!("Warning: {}", e);
    }

    if let Err(e) = run(args).await {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(e.exit_code());
    }
}

async fn run(args: ResponderArgs) -> Result<(), AppError> {
    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);

    // Fail fast, before touching the network.
    let api_key = config.require_api_key()?.to_string();
    let config = config.validated()?;

    let fetcher = OpenWeatherProvider::new(
        config.weather.api_url.as_str(),
        api_key,
        config.weather.request_timeout(),
    )
    .map_err(anyhow::Error::from)?;
    let cache = Arc::new(ResponseCache::new(
        config.cache.ttl(),
        config.cache.max_entries,
    ));

    let client = connect(&config.transport, Arc::new(LoggingObserver)).await?;
    let source = subscribe(
        &client,
        &config.transport.subject,
        &config.transport.queue_group,
    )
    .await?;

    let server = Server::new(Responder::new(cache, fetcher), config.server.max_in_flight);
    tokio::spawn(shutdown_on_signal(server.shutdown_handle()));

    tracing::info!(
        "cw-responder ready (cache ttl {:?}, {} in flight)",
        config.cache.ttl(),
        config.server.max_in_flight
    );
    server.run(source, Arc::new(NatsReplySink::new(client))).await;

    Ok(())
}
