//! The message-iterator pump: drives the upstream
//! iterator, dispatches each message by type, and emits the mapped
//! output message.

use std::collections::HashMap;
use std::rc::Rc;

use crate::bininfo::fd_cache::FdCache;
use crate::config::Config;
use crate::debug_info_index::{self, DebugInfoIndex};
use crate::error::{Error, Status};
use crate::message::UpstreamIterator;
use crate::process_sources::statedump;
use crate::trace_ir::maps::TraceIrMaps;
use crate::trace_ir::trace::{ptr_key, Message, Stream};

pub struct Iterator<U: UpstreamIterator> {
    upstream: U,
    maps: TraceIrMaps,
    fd_cache: FdCache,
    /// Per-input-trace `DebugInfoIndex` ("destroyed when the
    /// input trace is destroyed"). Without a destruction-listener hook
    /// this is instead cleared wholesale on seek, alongside the
    /// metadata/data maps — see `seek_to_beginning`.
    debug_info_indices: HashMap<usize, DebugInfoIndex>,
    config: Config,
}

impl<U: UpstreamIterator> Iterator<U> {
    pub fn new(upstream: U, config: Config) -> Self {
        Self {
            upstream,
            maps: TraceIrMaps::new(config.clone()),
            fd_cache: FdCache::new(),
            debug_info_indices: HashMap::new(),
            config,
        }
    }

    /// Pulls up to `capacity` messages and appends their mapped
    /// counterparts to `out`. On a per-message failure,
    /// `out` is truncated back to its length on entry — "drop
    /// references on all output messages constructed in this call" —
    /// and `Status::Error` is returned.
    pub fn next(&mut self, capacity: usize, out: &mut Vec<Message>) -> Status {
        let baseline = out.len();
        let mut input = Vec::with_capacity(capacity);
        let upstream_status = self.upstream.next(capacity, &mut input);

        for msg in input {
            match self.handle_message(msg) {
                Ok(Some(mapped)) => out.push(mapped),
                Ok(None) => {}
                Err(e) => {
                    out.truncate(baseline);
                    return Status::Error(e);
                }
            }
        }

        match upstream_status {
            Status::Ok(_) => Status::Ok(out.len() - baseline),
            other => other,
        }
    }

    /// Seeks the upstream to the beginning and, if it succeeds,
    /// drops every map this iterator owns.
    pub fn seek_to_beginning(&mut self) -> Status {
        let status = self.upstream.seek_to_beginning();
        if matches!(status, Status::Ok(_)) {
            self.maps.reset();
            self.debug_info_indices.clear();
        }
        status
    }

    fn handle_message(&mut self, msg: Message) -> Result<Option<Message>, Error> {
        match msg {
            Message::StreamBeginning { stream } => {
                let mapped = self.maps.map_stream(&stream)?;
                Ok(Some(Message::StreamBeginning { stream: mapped }))
            }
            Message::StreamEnd { stream } => {
                let mapped = self.maps.map_stream(&stream)?;
                self.maps.data.forget_stream(&stream);
                Ok(Some(Message::StreamEnd { stream: mapped }))
            }
            Message::PacketBeginning { packet, default_clock_snapshot } => {
                let mapped = self.maps.map_packet(&packet)?;
                let snapshot = clamp_snapshot(
                    default_clock_snapshot,
                    mapped.stream.stream_class.packets_have_beginning_default_clock_snapshot,
                );
                Ok(Some(Message::PacketBeginning { packet: mapped, default_clock_snapshot: snapshot }))
            }
            Message::PacketEnd { packet, default_clock_snapshot } => {
                let mapped = self.maps.map_packet(&packet)?;
                self.maps.data.forget_packet(&packet);
                let snapshot = clamp_snapshot(
                    default_clock_snapshot,
                    mapped.stream.stream_class.packets_have_end_default_clock_snapshot,
                );
                Ok(Some(Message::PacketEnd { packet: mapped, default_clock_snapshot: snapshot }))
            }
            Message::DiscardedEvents { stream, count, begin_default_clock_snapshot, end_default_clock_snapshot } => {
                let mapped = self.maps.map_stream(&stream)?;
                let sc = &mapped.stream_class;
                Ok(Some(Message::DiscardedEvents {
                    stream: mapped.clone(),
                    count: count.filter(|_| sc.supports_discarded_events),
                    begin_default_clock_snapshot: clamp_snapshot(
                        begin_default_clock_snapshot,
                        sc.discarded_events_have_default_clock_snapshots,
                    ),
                    end_default_clock_snapshot: clamp_snapshot(
                        end_default_clock_snapshot,
                        sc.discarded_events_have_default_clock_snapshots,
                    ),
                }))
            }
            Message::DiscardedPackets { stream, count, begin_default_clock_snapshot, end_default_clock_snapshot } => {
                let mapped = self.maps.map_stream(&stream)?;
                let sc = &mapped.stream_class;
                Ok(Some(Message::DiscardedPackets {
                    stream: mapped.clone(),
                    count: count.filter(|_| sc.supports_discarded_packets),
                    begin_default_clock_snapshot: clamp_snapshot(
                        begin_default_clock_snapshot,
                        sc.discarded_packets_have_default_clock_snapshots,
                    ),
                    end_default_clock_snapshot: clamp_snapshot(
                        end_default_clock_snapshot,
                        sc.discarded_packets_have_default_clock_snapshots,
                    ),
                }))
            }
            Message::Inactivity => Ok(Some(Message::Inactivity)),
            Message::Event { stream, packet, event, default_clock_snapshot } => {
                self.handle_event(stream, packet, event, default_clock_snapshot).map(Some)
            }
        }
    }

    fn handle_event(
        &mut self,
        stream: Rc<Stream>,
        packet: Option<Rc<crate::trace_ir::trace::Packet>>,
        event: crate::trace_ir::trace::Event,
        default_clock_snapshot: Option<u64>,
    ) -> Result<Message, Error> {
        let event_name = event.event_class.name.as_deref().unwrap_or("");
        let vpid = event
            .common_context_field
            .as_ref()
            .and_then(|f| f.member("vpid"))
            .and_then(|v| v.as_i64());

        if statedump::is_lttng_ust(event_name) {
            // `statedump:start` carries its vpid via the common
            // context only and has no payload fields of its own; treat
            // a missing payload as an empty structure rather than
            // skipping the event, or a statedump reset would never fire.
            if let Some(vpid) = vpid {
                let empty_payload = crate::trace_ir::value::FieldValue::Structure(Vec::new());
                let payload = event.payload_field.as_ref().unwrap_or(&empty_payload);
                let index = self.debug_info_indices.entry(ptr_key(&stream.trace)).or_default();
                index.handle_statedump_event(event_name, vpid, payload, &mut self.fd_cache, &self.config)?;
            }
        }

        let mapped_stream = self.maps.map_stream(&stream)?;
        let mapped_packet = match packet {
            Some(p) => Some(self.maps.map_packet(&p)?),
            None => None,
        };
        let mut mapped_event = self.maps.map_event(&mapped_stream, &event)?;

        if mapped_stream.stream_class.debug_info_augmented {
            let index = self.debug_info_indices.get_mut(&ptr_key(&stream.trace));
            debug_info_index::fill_debug_info_event_if_needed(
                &mut mapped_event.common_context_field,
                &self.config.debug_info_field_name,
                self.config.full_path,
                index,
                &mut self.fd_cache,
            )?;
        }

        let snapshot = clamp_snapshot(default_clock_snapshot, mapped_stream.stream_class.default_clock_class.is_some());
        Ok(Message::Event {
            stream: mapped_stream,
            packet: mapped_packet,
            event: mapped_event,
            default_clock_snapshot: snapshot,
        })
    }
}

fn clamp_snapshot(snapshot: Option<u64>, declared: bool) -> Option<u64> {
    if declared {
        snapshot
    } else {
        None
    }
}
