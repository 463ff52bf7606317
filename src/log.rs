//! Swappable logger proxy.
//!
//! The filter is a library consumed by a host graph/scheduler; it must
//! not hijack global logger installation for the whole host process.
//! `ProxyLogger`
//! forwards to whatever `log::Log` implementation the host last
//! installed via [`LOGGER_SWITCHER`], defaulting to a no-op logger so
//! a host that never calls `switch` sees no output.

use log::{LevelFilter, Log, Metadata, Record};
use once_cell::sync::Lazy;
use std::sync::{Arc, RwLock};

struct NopLogger;

impl Log for NopLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        false
    }
    fn log(&self, _: &Record) {}
    fn flush(&self) {}
}

#[derive(Clone)]
pub struct ProxyLogger {
    logger: Arc<RwLock<Box<dyn Log>>>,
}

pub static LOGGER_SWITCHER: Lazy<ProxyLogger> = Lazy::new(|| {
    let logger = ProxyLogger {
        logger: Arc::new(RwLock::new(Box::new(NopLogger))),
    };
    // Installing the global logger may fail if the host already
    // installed its own before loading this crate; that's fine, the
    // host's logger wins and our macros simply go nowhere.
    let _ = log::set_boxed_logger(Box::new(logger.clone()));
    log::set_max_level(LevelFilter::Debug);
    logger
});

impl ProxyLogger {
    /// Install a concrete logger and reset the global max level.
    pub fn switch<L: Log + 'static>(&self, logger: L, level_filter: LevelFilter) {
        *self.logger.write().unwrap() = Box::new(logger);
        log::set_max_level(level_filter);
    }
}

impl Log for ProxyLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.logger.read().unwrap().enabled(metadata)
    }
    fn log(&self, record: &Record) {
        self.logger.read().unwrap().log(record)
    }
    fn flush(&self) {
        self.logger.read().unwrap().flush()
    }
}
