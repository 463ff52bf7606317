//! Trace-IR: metadata classes, field classes, values and the copier
//! that turns an input trace-IR graph into its augmented output
//! counterpart.

pub mod classes;
pub mod clock_class;
pub mod copy;
pub mod data_copy;
pub mod field_class;
pub mod maps;
pub mod resolving_context;
pub mod trace;
pub mod value;

pub use classes::{EventClass, StreamClass, TraceClass};
pub use clock_class::ClockClass;
pub use field_class::FieldClass;
pub use trace::{Event, Message, Packet, Stream, Trace};
pub use value::FieldValue;
