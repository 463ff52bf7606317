//! DebugInfoIndex: per-input-trace registry of per-process state.

use std::collections::HashMap;
use std::rc::Rc;

use crate::bininfo::fd_cache::FdCache;
use crate::config::Config;
use crate::error::Result;
use crate::process_sources::statedump::{self, StatedumpEvent};
use crate::process_sources::ProcessSources;
use crate::trace_ir::data_copy;
use crate::trace_ir::value::FieldValue;

#[derive(Default)]
pub struct DebugInfoIndex {
    vpid_to_proc: HashMap<i64, ProcessSources>,
}

impl DebugInfoIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes one event to its vpid's `ProcessSources`, creating it on
    /// first sighting. `vpid`/`payload` come from the
    /// event's (already mapped) common context and its own payload.
    pub fn handle_statedump_event(
        &mut self,
        event_name: &str,
        vpid: i64,
        payload: &FieldValue,
        fd_cache: &mut FdCache,
        config: &Config,
    ) -> Result<()> {
        if !statedump::is_lttng_ust(event_name) {
            return Ok(());
        }
        let Some(kind) = StatedumpEvent::from_name(event_name) else { return Ok(()) };
        self.vpid_to_proc
            .entry(vpid)
            .or_default()
            .handle_event(kind, payload, fd_cache, config)
    }

    pub fn query(&mut self, fd_cache: &mut FdCache, vpid: i64, ip: u64) -> Result<Option<crate::bininfo::ResolvedDebugInfo>> {
        match self.vpid_to_proc.get_mut(&vpid) {
            Some(proc) => proc.query(fd_cache, ip),
            None => Ok(None),
        }
    }
}

/// Fills a `debug_info` struct member in an already-copied event
/// common context in place. `index` is `None` when the
/// input trace has no associated `DebugInfoIndex`, in which case all
/// three strings are written empty.
pub fn fill_debug_info_event_if_needed(
    common_context: &mut Option<FieldValue>,
    field_name: &str,
    full_path: bool,
    index: Option<&mut DebugInfoIndex>,
    fd_cache: &mut FdCache,
) -> Result<()> {
    let Some(FieldValue::Structure(fields)) = common_context else { return Ok(()) };
    if !fields.iter().any(|(n, _)| n == field_name) {
        return Ok(());
    }

    let vpid = fields.iter().find(|(n, _)| n == "vpid").and_then(|(_, v)| v.as_i64());
    let ip = fields.iter().find(|(n, _)| n == "ip").and_then(|(_, v)| v.as_u64());
    let resolved = match (index, vpid, ip) {
        (Some(index), Some(vpid), Some(ip)) => index.query(fd_cache, vpid, ip)?,
        _ => None,
    };

    let (_, debug_info_value) = fields
        .iter_mut()
        .find(|(n, _)| n == field_name)
        .expect("presence just checked above");
    *debug_info_value = match resolved {
        None => data_copy::empty_debug_info_value(),
        Some(info) => FieldValue::Structure(vec![
            ("bin".to_string(), FieldValue::String(info.bin_field(full_path))),
            ("func".to_string(), FieldValue::String(info.func_field())),
            ("src".to_string(), FieldValue::String(info.src_field(full_path))),
        ]),
    };
    Ok(())
}
