//! Tracing setup for the binary.
//!
//! The level starts at INFO (DEBUG with `--debug`) and can be raised once the
//! config file has been read, since `debug: true` may only be known then.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, Registry};

pub struct LogHandle(reload::Handle<LevelFilter, Registry>);

pub fn init(debug: bool) -> LogHandle {
    let level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let (filter, handle) = reload::Layer::new(level);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
    LogHandle(handle)
}

impl LogHandle {
    pub fn enable_debug(&self) {
        if let Err(e) = self.0.modify(|filter| *filter = LevelFilter::DEBUG) {
            tracing::warn!(error = %e, "Failed to raise log level to debug");
        }
    }
}
