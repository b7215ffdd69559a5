//! cweather: a cached request/reply current-weather service over NATS.
//!
//! The binaries live in `src/bin`; this library only holds their shared
//! command-line handling.

pub mod cli;
