//! Address newtypes distinguishing trace-recorded instruction
//! pointers from file-relative (PIC-normalized) addresses.
//!
//! Mirrors the relocated/global address split of a live-process
//! debugger, but here the "relocation" direction runs the other way:
//! the trace hands us an already-relocated runtime address, and
//! `bininfo` subtracts the load base to get a file-relative address
//! before consulting ELF/DWARF ("PIC normalization").

use std::fmt::{Display, Formatter};

/// An instruction pointer as recorded in the trace (`ip` field of an
/// event's common context). Always a live runtime address.
#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, Default, PartialOrd, Ord)]
pub struct TraceAddress(u64);

impl TraceAddress {
    #[inline(always)]
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Normalize to a file-relative address if `is_pic`, otherwise
    /// pass through unchanged (§8 "PIC normalization").
    #[inline(always)]
    pub fn normalize(self, low_addr: u64, is_pic: bool) -> FileAddress {
        if is_pic {
            FileAddress(self.0 - low_addr)
        } else {
            FileAddress(self.0)
        }
    }
}

impl From<u64> for TraceAddress {
    fn from(addr: u64) -> Self {
        TraceAddress(addr)
    }
}

impl From<TraceAddress> for u64 {
    fn from(addr: TraceAddress) -> Self {
        addr.0
    }
}

impl Display for TraceAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{:#018x}", self.0))
    }
}

/// An address already made relative to a binary's own load base (or
/// identical to the trace address for non-PIC binaries).
#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, Default, PartialOrd, Ord)]
pub struct FileAddress(u64);

impl FileAddress {
    #[inline(always)]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for FileAddress {
    fn from(addr: u64) -> Self {
        FileAddress(addr)
    }
}

impl From<FileAddress> for u64 {
    fn from(addr: FileAddress) -> Self {
        addr.0
    }
}

impl Display for FileAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{:#018x}", self.0))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pic_normalization_subtracts_base() {
        let ip = TraceAddress::from(0x400500u64);
        assert_eq!(ip.normalize(0x400000, true).as_u64(), 0x500);
    }

    #[test]
    fn non_pic_passes_through() {
        let ip = TraceAddress::from(0x400500u64);
        assert_eq!(ip.normalize(0x400000, false).as_u64(), 0x400500);
    }
}
