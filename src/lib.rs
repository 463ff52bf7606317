//! A trace-processing filter that augments userspace tracing events
//! with resolved debug information (binary path, function name,
//! source location), following the shape of LTTng-UST's
//! `lttng-utils.debug-info` babeltrace filter.
//!
//! The crate is organized leaves-first, mirroring the dependency
//! order of its five components: [`bininfo`] resolves one mapped
//! binary's addresses, [`process_sources`] aggregates those per
//! traced process and ingests the statedump events that build the
//! map, [`debug_info_index`] owns that per input trace, [`trace_ir`]
//! copies and augments the trace metadata/data graph, and
//! [`iterator`] drives the whole pipeline from an upstream message
//! source.

pub mod address;
pub mod bininfo;
pub mod config;
pub mod debug_info_index;
pub mod error;
pub mod iterator;
pub mod log;
pub mod message;
pub mod process_sources;
pub mod trace_ir;
mod util;

pub use config::Config;
pub use error::{Error, Result, Status};
pub use iterator::Iterator;
pub use message::UpstreamIterator;
