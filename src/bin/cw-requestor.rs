//! cw-requestor: sends one weather request and prints the reply.

use std::sync::Arc;

use anyhow::Context;
use cweather::cli::{self, RequestorArgs};
use cweather_core::{Config, ConfigError};
use cweather_services::transport::connect;
use cweather_services::{LoggingObserver, Requestor};
use cweather_weather::IpGeolocator;

#[tokio::main]
async fn main() {
    let args: RequestorArgs = cli::parse_or_exit();

    if let Err(e) = cweather_core::init() {
        eprintln!("Warning: {}", e);
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match request_weather(&config, args.location).await {
        Ok(reply) => println!("{}", reply),
        Err(e) => println!("Error: {:#}", e),
    }
}

fn load_config(args: &RequestorArgs) -> Result<Config, ConfigError> {
    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validated()
}

async fn request_weather(config: &Config, location: Option<String>) -> anyhow::Result<String> {
    let location = match location {
        Some(location) => location,
        None => IpGeolocator::new(config.requestor.geolocate_url.as_str())?
            .locate()
            .await
            .context("Could not determine your location; pass --location")?,
    };

    let transport = config.requestor_transport();
    let client = connect(&transport, Arc::new(LoggingObserver)).await?;
    let requestor = Requestor::new(client, transport.subject, config.requestor.timeout());

    Ok(requestor.request(&location).await?)
}
