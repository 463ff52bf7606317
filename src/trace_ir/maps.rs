//! `TraceIrMaps`: input → output object maps for
//! every trace-IR level, keyed by `Rc` pointer identity.
//!
//! The upstream model retires an entry when babeltrace fires a
//! "destruction listener" on the input object. This crate has no such
//! hook — instead, `forget_stream`/`forget_packet` are called by the
//! iterator exactly when it handles the matching `StreamEnd`/
//! `PacketEnd` message, which every well-formed trace is guaranteed to
//! emit for every `StreamBeginning`/`PacketBeginning` it emits. Class-level
//! maps (trace/stream/event/clock class) are never retired mid-trace;
//! they're cleared wholesale on `reset`, which a seek to the beginning
//! of the trace triggers.

use std::collections::HashMap;
use std::rc::Rc;

use crate::config::Config;
use crate::error::Result;

use super::classes::{EventClass, StreamClass, TraceClass};
use super::clock_class::ClockClass;
use super::copy::{self, require_structure};
use super::data_copy::empty_debug_info_value;
use super::field_class::copy_user_attributes;
use super::resolving_context::ResolvingContext;
use super::trace::{ptr_key, Packet, Stream, Trace};
use super::value::FieldValue;

#[derive(Default)]
pub struct MetadataMaps {
    trace_class_map: HashMap<usize, Rc<TraceClass>>,
    stream_class_map: HashMap<usize, Rc<StreamClass>>,
    event_class_map: HashMap<usize, Rc<EventClass>>,
    clock_class_map: HashMap<usize, Rc<ClockClass>>,
}

impl MetadataMaps {
    fn get_or_create_clock_class(&mut self, input: &Rc<ClockClass>) -> Rc<ClockClass> {
        let key = ptr_key(input);
        self.clock_class_map.entry(key).or_insert_with(|| Rc::new(input.copy())).clone()
    }

    fn get_or_create_trace_class(&mut self, input: &Rc<TraceClass>) -> Rc<TraceClass> {
        let key = ptr_key(input);
        if let Some(existing) = self.trace_class_map.get(&key) {
            return existing.clone();
        }
        let out = Rc::new(TraceClass::new(
            copy_user_attributes(&input.user_attributes),
            input.environment.clone(),
        ));
        self.trace_class_map.insert(key, out.clone());
        out
    }

    /// Copies a stream class (and, transitively, all its event
    /// classes) the first time it's sighted, applying the debug-info
    /// augmentation rule to its common context.
    fn get_or_create_stream_class(
        &mut self,
        input: &Rc<StreamClass>,
        output_trace_class: &Rc<TraceClass>,
        config: &Config,
    ) -> Result<Rc<StreamClass>> {
        let key = ptr_key(input);
        if let Some(existing) = self.stream_class_map.get(&key) {
            return Ok(existing.clone());
        }

        let default_clock_class = input.default_clock_class.as_ref().map(|cc| self.get_or_create_clock_class(cc));

        let root_ctx = ResolvingContext {
            packet_context: None,
            event_common_context: None,
            event_specific_context: None,
            event_payload: None,
            current: &[],
        };
        let packet_context_field_class = input
            .packet_context_field_class
            .as_ref()
            .map(|fc| copy::copy_field_class(fc, &root_ctx))
            .transpose()?;

        let ec_ctx = ResolvingContext {
            packet_context: packet_context_field_class.as_ref(),
            ..root_ctx
        };
        let (event_common_context_field_class, debug_info_augmented) =
            copy::copy_event_common_context(input.event_common_context_field_class.as_ref(), config, &ec_ctx)?;

        let out = Rc::new(StreamClass {
            id: input.id,
            name: input.name.clone(),
            user_attributes: copy_user_attributes(&input.user_attributes),
            default_clock_class,
            supports_packets: input.supports_packets,
            packets_have_beginning_default_clock_snapshot: input.packets_have_beginning_default_clock_snapshot,
            packets_have_end_default_clock_snapshot: input.packets_have_end_default_clock_snapshot,
            supports_discarded_events: input.supports_discarded_events,
            discarded_events_have_default_clock_snapshots: input.discarded_events_have_default_clock_snapshots,
            supports_discarded_packets: input.supports_discarded_packets,
            discarded_packets_have_default_clock_snapshots: input.discarded_packets_have_default_clock_snapshots,
            packet_context_field_class,
            event_common_context_field_class,
            event_classes: Default::default(),
            debug_info_augmented,
        });
        self.stream_class_map.insert(key, out.clone());
        output_trace_class.push_stream_class(out.clone());
        Ok(out)
    }

    fn get_or_create_event_class(
        &mut self,
        output_stream_class: &Rc<StreamClass>,
        input: &Rc<EventClass>,
        packet_context: Option<&super::field_class::FieldClass>,
        event_common_context: Option<&super::field_class::FieldClass>,
    ) -> Result<Rc<EventClass>> {
        let key = ptr_key(input);
        if let Some(existing) = self.event_class_map.get(&key) {
            return Ok(existing.clone());
        }

        let base_ctx = ResolvingContext {
            packet_context,
            event_common_context,
            event_specific_context: None,
            event_payload: None,
            current: &[],
        };
        let specific_context_field_class = input
            .specific_context_field_class
            .as_ref()
            .map(|fc| copy::copy_field_class(fc, &base_ctx))
            .transpose()?;
        let payload_ctx = ResolvingContext {
            event_specific_context: specific_context_field_class.as_ref(),
            ..base_ctx
        };
        let payload_field_class = input
            .payload_field_class
            .as_ref()
            .map(|fc| copy::copy_field_class(fc, &payload_ctx))
            .transpose()?;

        let out = Rc::new(EventClass {
            id: input.id,
            name: input.name.clone(),
            log_level: input.log_level,
            emf_uri: input.emf_uri.clone(),
            user_attributes: copy_user_attributes(&input.user_attributes),
            specific_context_field_class,
            payload_field_class,
        });
        self.event_class_map.insert(key, out.clone());
        output_stream_class.push_event_class(out.clone());
        Ok(out)
    }

    pub fn reset(&mut self) {
        self.trace_class_map.clear();
        self.stream_class_map.clear();
        self.event_class_map.clear();
        self.clock_class_map.clear();
    }
}

#[derive(Default)]
pub struct DataMaps {
    trace_map: HashMap<usize, Rc<Trace>>,
    stream_map: HashMap<usize, Rc<Stream>>,
    packet_map: HashMap<usize, Rc<Packet>>,
}

impl DataMaps {
    pub fn forget_stream(&mut self, input: &Rc<Stream>) {
        self.stream_map.remove(&ptr_key(input));
    }

    pub fn forget_packet(&mut self, input: &Rc<Packet>) {
        self.packet_map.remove(&ptr_key(input));
    }

    pub fn reset(&mut self) {
        self.trace_map.clear();
        self.stream_map.clear();
        self.packet_map.clear();
    }
}

/// Input → output mapping for one upstream component's entire graph
///: one `TraceIrMaps` per message iterator instance.
#[derive(Default)]
pub struct TraceIrMaps {
    pub metadata: MetadataMaps,
    pub data: DataMaps,
    config: Config,
}

impl TraceIrMaps {
    pub fn new(config: Config) -> Self {
        Self { metadata: MetadataMaps::default(), data: DataMaps::default(), config }
    }

    pub fn map_trace(&mut self, input: &Rc<Trace>) -> Rc<Trace> {
        let key = ptr_key(input);
        if let Some(existing) = self.data.trace_map.get(&key) {
            return existing.clone();
        }
        let trace_class = self.metadata.get_or_create_trace_class(&input.trace_class);
        let out = Rc::new(Trace {
            name: input.name.clone(),
            user_attributes: copy_user_attributes(&input.user_attributes),
            trace_class,
        });
        self.data.trace_map.insert(key, out.clone());
        out
    }

    pub fn map_stream(&mut self, input: &Rc<Stream>) -> Result<Rc<Stream>> {
        let key = ptr_key(input);
        if let Some(existing) = self.data.stream_map.get(&key) {
            return Ok(existing.clone());
        }
        let trace = self.map_trace(&input.trace);
        let stream_class =
            self.metadata
                .get_or_create_stream_class(&input.stream_class, &trace.trace_class, &self.config)?;
        let out = Rc::new(Stream {
            id: input.id,
            name: input.name.clone(),
            user_attributes: copy_user_attributes(&input.user_attributes),
            stream_class,
            trace,
        });
        self.data.stream_map.insert(key, out.clone());
        Ok(out)
    }

    pub fn map_packet(&mut self, input: &Rc<Packet>) -> Result<Rc<Packet>> {
        let key = ptr_key(input);
        if let Some(existing) = self.data.packet_map.get(&key) {
            return Ok(existing.clone());
        }
        let stream = self.map_stream(&input.stream)?;
        let context_field = match (&stream.stream_class.packet_context_field_class, &input.context_field) {
            (Some(_), Some(value)) => {
                let input_class = input
                    .stream
                    .stream_class
                    .packet_context_field_class
                    .as_ref()
                    .expect("packet has a context field so its stream class declares one");
                Some(super::data_copy::copy_field_value(input_class, value)?)
            }
            _ => None,
        };
        let out = Rc::new(Packet { stream, context_field });
        self.data.packet_map.insert(key, out.clone());
        Ok(out)
    }

    /// Maps an event's class (creating it, and its specific-context
    /// and payload field classes, on first sighting) and copies its
    /// field values. The debug-info member, if the
    /// stream class's common context was augmented, is appended as
    /// empty placeholders for `fill_debug_info_event_if_needed` to
    /// overwrite afterward.
    pub fn map_event(
        &mut self,
        output_stream: &Rc<Stream>,
        input: &super::trace::Event,
    ) -> Result<super::trace::Event> {
        let event_class = self.metadata.get_or_create_event_class(
            &output_stream.stream_class,
            &input.event_class,
            output_stream.stream_class.packet_context_field_class.as_ref(),
            output_stream.stream_class.event_common_context_field_class.as_ref(),
        )?;

        let common_context_field = self.copy_common_context(&output_stream.stream_class, input)?;

        let specific_context_field = match (&event_class.specific_context_field_class, &input.specific_context_field) {
            (Some(_), Some(value)) => {
                let input_class = input
                    .event_class
                    .specific_context_field_class
                    .as_ref()
                    .expect("event has a specific context field so its class declares one");
                Some(super::data_copy::copy_field_value(input_class, value)?)
            }
            _ => None,
        };
        let payload_field = match (&event_class.payload_field_class, &input.payload_field) {
            (Some(_), Some(value)) => {
                let input_class = input
                    .event_class
                    .payload_field_class
                    .as_ref()
                    .expect("event has a payload field so its class declares one");
                Some(super::data_copy::copy_field_value(input_class, value)?)
            }
            _ => None,
        };

        Ok(super::trace::Event {
            event_class,
            common_context_field,
            specific_context_field,
            payload_field,
        })
    }

    fn copy_common_context(
        &self,
        output_stream_class: &Rc<StreamClass>,
        input: &super::trace::Event,
    ) -> Result<Option<FieldValue>> {
        let Some(value) = &input.common_context_field else { return Ok(None) };
        let Some(output_class) = &output_stream_class.event_common_context_field_class else { return Ok(None) };

        let members = require_structure(output_class)?;
        let input_member_count = if output_stream_class.debug_info_augmented { members.len() - 1 } else { members.len() };
        let input_class_stub = super::field_class::FieldClass::Structure {
            members: members[..input_member_count].to_vec(),
        };
        let mut copied = super::data_copy::copy_field_value(&input_class_stub, value)?;

        if output_stream_class.debug_info_augmented {
            if let FieldValue::Structure(fields) = &mut copied {
                fields.push((self.config.debug_info_field_name.clone(), empty_debug_info_value()));
            }
        }
        Ok(Some(copied))
    }

    pub fn reset(&mut self) {
        self.metadata.reset();
        self.data.reset();
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
