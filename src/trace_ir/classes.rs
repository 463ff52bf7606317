//! Trace class / stream class / event class.

use std::cell::RefCell;
use std::rc::Rc;

use super::clock_class::ClockClass;
use super::field_class::{FieldClass, UserAttributes};

#[derive(Debug, Clone)]
pub enum EnvValue {
    Int(i64),
    Str(String),
}

/// An input or output trace class. Stream classes are appended as
/// they're first sighted ("created on first sighting of a
/// trace class"), hence the `RefCell` — everything else about a
/// trace class is fixed at copy time.
pub struct TraceClass {
    pub user_attributes: UserAttributes,
    pub environment: Vec<(String, EnvValue)>,
    pub stream_classes: RefCell<Vec<Rc<StreamClass>>>,
}

impl TraceClass {
    pub fn new(user_attributes: UserAttributes, environment: Vec<(String, EnvValue)>) -> Self {
        Self {
            user_attributes,
            environment,
            stream_classes: RefCell::new(Vec::new()),
        }
    }

    pub fn push_stream_class(&self, sc: Rc<StreamClass>) {
        self.stream_classes.borrow_mut().push(sc);
    }
}

pub struct EventClass {
    pub id: u64,
    pub name: Option<String>,
    pub log_level: Option<i64>,
    pub emf_uri: Option<String>,
    pub user_attributes: UserAttributes,
    pub specific_context_field_class: Option<FieldClass>,
    pub payload_field_class: Option<FieldClass>,
}

pub struct StreamClass {
    pub id: u64,
    pub name: Option<String>,
    pub user_attributes: UserAttributes,
    pub default_clock_class: Option<Rc<ClockClass>>,
    pub supports_packets: bool,
    pub packets_have_beginning_default_clock_snapshot: bool,
    pub packets_have_end_default_clock_snapshot: bool,
    pub supports_discarded_events: bool,
    pub discarded_events_have_default_clock_snapshots: bool,
    pub supports_discarded_packets: bool,
    pub discarded_packets_have_default_clock_snapshots: bool,
    pub packet_context_field_class: Option<FieldClass>,
    /// The event common context, possibly augmented with the
    /// `debug_info` struct (see `debug_info_augmented` below).
    pub event_common_context_field_class: Option<FieldClass>,
    pub event_classes: RefCell<Vec<Rc<EventClass>>>,
    /// Set when this stream class's common context was augmented
    /// with the `debug_info` struct — the iterator consults this to
    /// decide whether to run `fill_debug_info_event_if_needed`.
    pub debug_info_augmented: bool,
}

impl StreamClass {
    pub fn find_event_class(&self, id: u64) -> Option<Rc<EventClass>> {
        self.event_classes.borrow().iter().find(|ec| ec.id == id).cloned()
    }

    pub fn push_event_class(&self, ec: Rc<EventClass>) {
        self.event_classes.borrow_mut().push(ec);
    }
}
