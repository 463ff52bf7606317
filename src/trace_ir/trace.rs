//! Trace / stream / packet / event and the message
//! types the iterator pump consumes and produces.
//!
//! Input and output share the same Rust types — a trace class
//! produced by an upstream component and one produced by this filter
//! have an identical shape, only the content (and, for one structure
//! field class, the augmentation) differs. `TraceIrMaps` tells them
//! apart by `Rc` pointer identity (see `maps.rs`), which is the
//! direct analogue of babeltrace's "input object" vs "output object"
//! distinction without needing a parallel set of types.

use std::rc::Rc;

use super::classes::{EventClass, StreamClass, TraceClass};
use super::field_class::UserAttributes;
use super::value::FieldValue;

/// Returns a stable identity key for any reference-counted trace-IR
/// object — the Rust analogue of "is this the same input object we
/// saw before" ("for every input object ever
/// referenced ... an output counterpart exists").
pub fn ptr_key<T>(rc: &Rc<T>) -> usize {
    Rc::as_ptr(rc) as *const () as usize
}

pub struct Trace {
    pub name: Option<String>,
    pub user_attributes: UserAttributes,
    pub trace_class: Rc<TraceClass>,
}

pub struct Stream {
    pub id: u64,
    pub name: Option<String>,
    pub user_attributes: UserAttributes,
    pub stream_class: Rc<StreamClass>,
    pub trace: Rc<Trace>,
}

pub struct Packet {
    pub stream: Rc<Stream>,
    pub context_field: Option<FieldValue>,
}

pub struct Event {
    pub event_class: Rc<EventClass>,
    pub common_context_field: Option<FieldValue>,
    pub specific_context_field: Option<FieldValue>,
    pub payload_field: Option<FieldValue>,
}

/// A default clock snapshot, when the owning stream class declares
/// one.
pub type ClockSnapshot = u64;

/// The messages produced by an upstream iterator and consumed by this
/// filter's pump. This is the crate's stand-in for the
/// host graph's message type — out of scope for this crate, but a
/// concrete shape is needed to exercise and test the pump.
pub enum Message {
    StreamBeginning {
        stream: Rc<Stream>,
    },
    StreamEnd {
        stream: Rc<Stream>,
    },
    PacketBeginning {
        packet: Rc<Packet>,
        default_clock_snapshot: Option<ClockSnapshot>,
    },
    PacketEnd {
        packet: Rc<Packet>,
        default_clock_snapshot: Option<ClockSnapshot>,
    },
    Event {
        stream: Rc<Stream>,
        packet: Option<Rc<Packet>>,
        event: Event,
        default_clock_snapshot: Option<ClockSnapshot>,
    },
    DiscardedEvents {
        stream: Rc<Stream>,
        count: Option<u64>,
        begin_default_clock_snapshot: Option<ClockSnapshot>,
        end_default_clock_snapshot: Option<ClockSnapshot>,
    },
    DiscardedPackets {
        stream: Rc<Stream>,
        count: Option<u64>,
        begin_default_clock_snapshot: Option<ClockSnapshot>,
        end_default_clock_snapshot: Option<ClockSnapshot>,
    },
    /// Forwarded unchanged; references no mapped objects.
    Inactivity,
}
