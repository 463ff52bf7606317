//! The upstream message source this filter pumps from.
//!
//! The real host component is the babeltrace graph's upstream message
//! iterator, which this crate does not implement or model in full.
//! `UpstreamIterator` is the minimal seam this crate needs against
//! it: pull one batch of messages, or seek back to the beginning.

use crate::error::Status;
use crate::trace_ir::trace::Message;

/// A source of upstream messages, standing in for the host graph's
/// connected upstream message iterator.
pub trait UpstreamIterator {
    /// Pulls up to `capacity` messages. Mirrors `Iterator::next`'s
    /// status contract: `Status::Ok(n)` with `n`
    /// messages appended to `out`, `Status::Again` if none are
    /// available yet without blocking, `Status::End` once the
    /// upstream is exhausted.
    fn next(&mut self, capacity: usize, out: &mut Vec<Message>) -> Status;

    /// Rewinds the upstream to the beginning of the trace; the caller
    /// is responsible for resetting any state derived from it.
    fn seek_to_beginning(&mut self) -> Status;
}
