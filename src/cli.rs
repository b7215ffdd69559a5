//! Command-line parsing for the cweather binaries.

use std::path::PathBuf;

use clap::Parser;
use cweather_core::Config;

/// Cached current-weather responder
#[derive(Parser, Debug)]
#[command(name = "cw-responder")]
#[command(about = "Answer weather requests from NATS using a cached upstream API")]
#[command(version)]
pub struct ResponderArgs {
    /// Weather API key (falls back to CW_API_KEY, then the config file)
    #[arg(value_name = "API_KEY")]
    pub api_key: Option<String>,

    /// NATS server URL; a tls:// URL requires an encrypted connection
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// NATS credentials file
    #[arg(long, value_name = "PATH")]
    pub creds: Option<PathBuf>,

    /// Configuration file (default: <config dir>/cweather/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl ResponderArgs {
    /// Override configuration values with the ones given on the command line.
    pub fn apply(&self, config: &mut Config) {
        if let Some(key) = &self.api_key {
            config.weather.api_key = Some(key.clone());
        }
        if let Some(url) = &self.url {
            config.transport.url = url.clone();
        }
        if let Some(creds) = &self.creds {
            config.transport.creds = Some(creds.clone());
        }
    }
}

/// Ask the weather service for current conditions
#[derive(Parser, Debug)]
#[command(name = "cw-requestor")]
#[command(about = "Request current weather over NATS and print the reply")]
#[command(version)]
pub struct RequestorArgs {
    /// Place name or "<lat>,<long>"; looked up from your IP address if omitted
    #[arg(long, value_name = "LOCATION")]
    pub location: Option<String>,

    /// NATS server URL
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// NATS credentials file
    #[arg(long, value_name = "PATH")]
    pub creds: Option<PathBuf>,

    /// Configuration file (default: <config dir>/cweather/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl RequestorArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.url {
            config.requestor.url = url.clone();
        }
        if let Some(creds) = &self.creds {
            config.transport.creds = Some(creds.clone());
        }
    }
}

/// Parse arguments, exiting with status 1 on malformed input.
///
/// `--help` and `--version` print to stdout and exit with 0.
pub fn parse_or_exit<T: Parser>() -> T {
    match T::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            // Nothing sensible to do if the terminal is gone.
            let _ = e.print();
            std::process::exit(code);
        }
    }
}
