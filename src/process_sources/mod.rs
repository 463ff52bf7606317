//! ProcessSources: per-vpid binary map plus the statedump state
//! machine that builds and mutates it.

pub mod statedump;

use std::collections::HashMap;

use crate::address::TraceAddress;
use crate::bininfo::fd_cache::FdCache;
use crate::bininfo::{BinaryInfo, ResolvedDebugInfo};
use crate::config::Config;
use crate::error::Result;
use crate::trace_ir::value::FieldValue;
use statedump::StatedumpEvent;

/// Per-vpid state: the set of loaded binaries and a resolution cache
/// of already-looked-up instruction pointers.
#[derive(Default)]
pub struct ProcessSources {
    baddr_to_bin: HashMap<u64, BinaryInfo>,
    ip_to_resolved: HashMap<u64, ResolvedDebugInfo>,
}

impl ProcessSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatches one statedump event's payload.
    /// Unrecognized/malformed payloads are dropped silently; every
    /// handler's failure mode here is "ignore", not "hard error".
    pub fn handle_event(
        &mut self,
        kind: StatedumpEvent,
        payload: &FieldValue,
        fd_cache: &mut FdCache,
        config: &Config,
    ) -> Result<()> {
        match kind {
            StatedumpEvent::Start => {
                self.baddr_to_bin.clear();
                self.ip_to_resolved.clear();
            }
            StatedumpEvent::BinInfo => self.handle_load(payload, config, payload_is_pic(payload))?,
            StatedumpEvent::DlOpen => self.handle_load(payload, config, Some(true))?,
            StatedumpEvent::LibLoad => self.handle_load(payload, config, payload_is_pic(payload))?,
            StatedumpEvent::LibUnload => self.handle_unload(payload),
            StatedumpEvent::BuildId => self.handle_build_id(payload, fd_cache),
            StatedumpEvent::DebugLink => self.handle_debug_link(payload),
        }
        Ok(())
    }

    fn handle_load(&mut self, payload: &FieldValue, config: &Config, is_pic: Option<bool>) -> Result<()> {
        let Some(baddr) = payload.member("baddr").and_then(FieldValue::as_u64) else { return Ok(()) };
        let Some(memsz) = payload.member("memsz").and_then(FieldValue::as_u64) else { return Ok(()) };
        let Some(path) = payload.member("path").and_then(FieldValue::as_str) else { return Ok(()) };
        if memsz == 0 || self.baddr_to_bin.contains_key(&baddr) {
            return Ok(());
        }
        let is_pic = is_pic.unwrap_or(false);
        let bin = BinaryInfo::create(
            path,
            baddr,
            memsz,
            is_pic,
            config.debug_info_dir.clone(),
            config.target_prefix.as_deref(),
        )?;
        self.baddr_to_bin.insert(baddr, bin);
        Ok(())
    }

    /// Removes the binary at `baddr` and drops any cached resolutions
    /// that fell inside its address range, so a reused `baddr` after
    /// unload/reload can't serve a stale resolution from the previous
    /// occupant.
    fn handle_unload(&mut self, payload: &FieldValue) {
        let Some(baddr) = payload.member("baddr").and_then(FieldValue::as_u64) else { return };
        let Some(bin) = self.baddr_to_bin.remove(&baddr) else { return };
        self.ip_to_resolved.retain(|&ip, _| !bin.has_address(TraceAddress::from(ip)));
    }

    fn handle_build_id(&mut self, payload: &FieldValue, fd_cache: &mut FdCache) {
        let Some(baddr) = payload.member("baddr").and_then(FieldValue::as_u64) else { return };
        let Some(build_id) = payload.member("build_id").and_then(FieldValue::as_byte_array) else { return };
        if let Some(bin) = self.baddr_to_bin.get_mut(&baddr) {
            // A mismatch is sticky on the BinaryInfo itself; the
            // statedump handler just needs to not crash on it.
            let _ = bin.set_build_id(fd_cache, &build_id);
        }
    }

    fn handle_debug_link(&mut self, payload: &FieldValue) {
        let Some(baddr) = payload.member("baddr").and_then(FieldValue::as_u64) else { return };
        let Some(filename) = payload.member("filename").and_then(FieldValue::as_str) else { return };
        let Some(crc) = payload.member("crc").and_then(FieldValue::as_u64) else { return };
        if let Some(bin) = self.baddr_to_bin.get_mut(&baddr) {
            bin.set_debug_link(filename, crc as u32);
        }
    }

    /// `query(ip)`: cache hit, or resolve against the
    /// first containing binary and memoize.
    pub fn query(&mut self, fd_cache: &mut FdCache, ip: u64) -> Result<Option<ResolvedDebugInfo>> {
        if let Some(resolved) = self.ip_to_resolved.get(&ip) {
            return Ok(Some(resolved.clone()));
        }
        let addr = TraceAddress::from(ip);
        let Some(bin) = self.baddr_to_bin.values_mut().find(|b| b.has_address(addr)) else {
            return Ok(None);
        };
        if !bin.is_resolvable(fd_cache) {
            return Ok(None);
        }
        let func = bin.lookup_function_name(fd_cache, addr)?;
        let src = bin.lookup_source_location(fd_cache, addr)?;
        let bin_loc = bin.get_bin_loc(addr);
        let resolved = ResolvedDebugInfo::new(func, src, bin.elf_path().to_string_lossy().to_string(), bin_loc);
        self.ip_to_resolved.insert(ip, resolved.clone());
        Ok(Some(resolved))
    }
}

fn payload_is_pic(payload: &FieldValue) -> Option<bool> {
    payload.member("is_pic").and_then(FieldValue::as_u64).map(|v| v != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn struct_val(fields: &[(&str, FieldValue)]) -> FieldValue {
        FieldValue::Structure(fields.iter().map(|(n, v)| (n.to_string(), v.clone())).collect())
    }

    #[test]
    fn bin_info_creates_entry_and_is_idempotent_per_baddr() {
        let mut ps = ProcessSources::new();
        let mut fd_cache = FdCache::new();
        let config = Config::default();
        let payload = struct_val(&[
            ("baddr", FieldValue::UnsignedInteger(0x400000)),
            ("memsz", FieldValue::UnsignedInteger(0x1000)),
            ("path", FieldValue::String("/bin/a".to_string())),
            ("is_pic", FieldValue::UnsignedInteger(0)),
        ]);
        ps.handle_event(StatedumpEvent::BinInfo, &payload, &mut fd_cache, &config).unwrap();
        assert_eq!(ps.baddr_to_bin.len(), 1);
        ps.handle_event(StatedumpEvent::BinInfo, &payload, &mut fd_cache, &config).unwrap();
        assert_eq!(ps.baddr_to_bin.len(), 1, "second bin_info for same baddr is ignored");
    }

    #[test]
    fn zero_memsz_is_ignored() {
        let mut ps = ProcessSources::new();
        let mut fd_cache = FdCache::new();
        let config = Config::default();
        let payload = struct_val(&[
            ("baddr", FieldValue::UnsignedInteger(0x400000)),
            ("memsz", FieldValue::UnsignedInteger(0)),
            ("path", FieldValue::String("/bin/a".to_string())),
            ("is_pic", FieldValue::UnsignedInteger(0)),
        ]);
        ps.handle_event(StatedumpEvent::BinInfo, &payload, &mut fd_cache, &config).unwrap();
        assert!(ps.baddr_to_bin.is_empty());
    }

    #[test]
    fn unload_removes_entry_and_is_silent_if_absent() {
        let mut ps = ProcessSources::new();
        let mut fd_cache = FdCache::new();
        let config = Config::default();
        let bin_info = struct_val(&[
            ("baddr", FieldValue::UnsignedInteger(0x400000)),
            ("memsz", FieldValue::UnsignedInteger(0x1000)),
            ("path", FieldValue::String("/bin/a".to_string())),
            ("is_pic", FieldValue::UnsignedInteger(0)),
        ]);
        ps.handle_event(StatedumpEvent::BinInfo, &bin_info, &mut fd_cache, &config).unwrap();
        let unload = struct_val(&[("baddr", FieldValue::UnsignedInteger(0x400000))]);
        ps.handle_event(StatedumpEvent::LibUnload, &unload, &mut fd_cache, &config).unwrap();
        assert!(ps.baddr_to_bin.is_empty());
        // Unloading again (nothing left) must not error.
        ps.handle_event(StatedumpEvent::LibUnload, &unload, &mut fd_cache, &config).unwrap();
    }

    #[test]
    fn start_clears_both_maps() {
        let mut ps = ProcessSources::new();
        let mut fd_cache = FdCache::new();
        let config = Config::default();
        let bin_info = struct_val(&[
            ("baddr", FieldValue::UnsignedInteger(0x400000)),
            ("memsz", FieldValue::UnsignedInteger(0x1000)),
            ("path", FieldValue::String("/bin/a".to_string())),
            ("is_pic", FieldValue::UnsignedInteger(0)),
        ]);
        ps.handle_event(StatedumpEvent::BinInfo, &bin_info, &mut fd_cache, &config).unwrap();
        ps.ip_to_resolved.insert(
            0x400500,
            ResolvedDebugInfo::new(None, None, "/bin/a".to_string(), "@0x400500".to_string()),
        );
        ps.handle_event(StatedumpEvent::Start, &FieldValue::Structure(vec![]), &mut fd_cache, &config)
            .unwrap();
        assert!(ps.baddr_to_bin.is_empty());
        assert!(ps.ip_to_resolved.is_empty());
    }

    #[test]
    fn query_misses_when_no_binary_contains_address() {
        let mut ps = ProcessSources::new();
        let mut fd_cache = FdCache::new();
        assert_eq!(ps.query(&mut fd_cache, 0xdeadbeef).unwrap(), None);
    }
}
