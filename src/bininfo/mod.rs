//! BinaryInfo: one mapped memory region (shared object or executable)
//! of one traced process.
//!
//! Resolves addresses to symbolic information by lazily opening the
//! ELF file (and, if located, a separate DWARF file) the first time a
//! lookup is requested: an `EndianArcSlice` reader, a parallel section
//! loader, and a symbol table as an ELF-only fallback when DWARF can't
//! be attached, generalized from "one process being debugged" to "one
//! binary seen in a trace".

mod dwarf_unit;
pub mod fd_cache;
mod loader;

use gimli::RunTimeEndian;
use object::{Object, ObjectSection, ObjectSymbol, SymbolKind};
use std::path::{Path, PathBuf};

use crate::address::TraceAddress;
use crate::error::{Error, Result};
use crate::util::{crc32, paths};
use fd_cache::FdCache;

pub type EndianArcSlice = gimli::EndianArcSlice<RunTimeEndian>;

/// `(filename, line_no)` — a value type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub filename: String,
    pub line_no: u64,
}

/// Return the last path component of `s`, borrowed from `s` — the
/// basename used by the `short_*` fields.
fn basename(s: &str) -> &str {
    s.rsplit('/').next().unwrap_or(s)
}

/// Immutable, value-type result of resolving one instruction pointer
/// against a binary's debug info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDebugInfo {
    func: Option<String>,
    src: Option<SourceLocation>,
    bin_path: String,
    bin_loc: String,
}

impl ResolvedDebugInfo {
    pub fn new(func: Option<String>, src: Option<SourceLocation>, bin_path: String, bin_loc: String) -> Self {
        Self {
            func,
            src,
            bin_path,
            bin_loc,
        }
    }

    pub fn func(&self) -> Option<&str> {
        self.func.as_deref()
    }

    pub fn src_path(&self) -> Option<&str> {
        self.src.as_ref().map(|s| s.filename.as_str())
    }

    pub fn short_src_path(&self) -> Option<&str> {
        self.src_path().map(basename)
    }

    pub fn src_line(&self) -> Option<u64> {
        self.src.as_ref().map(|s| s.line_no)
    }

    pub fn bin_path(&self) -> &str {
        &self.bin_path
    }

    pub fn short_bin_path(&self) -> &str {
        basename(&self.bin_path)
    }

    pub fn bin_loc(&self) -> &str {
        &self.bin_loc
    }

    /// The `bin` output field.
    pub fn bin_field(&self, full_path: bool) -> String {
        let path = if full_path { self.bin_path() } else { self.short_bin_path() };
        format!("{path}{}", self.bin_loc)
    }

    /// The `func` output field.
    pub fn func_field(&self) -> String {
        self.func.clone().unwrap_or_default()
    }

    /// The `src` output field.
    pub fn src_field(&self, full_path: bool) -> String {
        match &self.src {
            None => String::new(),
            Some(loc) => {
                let path = if full_path { loc.filename.as_str() } else { basename(&loc.filename) };
                format!("{path}:{}", loc.line_no)
            }
        }
    }
}

struct DwarfHandle {
    units: Vec<dwarf_unit::ParsedUnit>,
}

pub struct BinaryInfo {
    low_addr: u64,
    high_addr: u64,
    #[allow(dead_code)]
    memsz: u64,
    is_pic: bool,
    elf_path: PathBuf,
    debug_info_dir: PathBuf,
    build_id: Option<Vec<u8>>,
    dbg_link: Option<(String, u32)>,
    /// DWARF was attached-or-gave-up already; don't re-attempt until
    /// a new build id or debug link arrives ("make the
    /// tried and failed state explicit").
    dwarf_attach_attempted: bool,
    is_elf_only: bool,
    file_build_id_matches: Option<bool>,
    dwarf: Option<DwarfHandle>,
    symbols: Option<Vec<(u64, String)>>,
    elf_accessible: Option<bool>,
}

impl BinaryInfo {
    /// Create a `BinaryInfo` for a binary loaded at `low_addr`.
    /// `elf_path` is `target_prefix/path` when a prefix is configured.
    pub fn create(
        path: &str,
        low_addr: u64,
        memsz: u64,
        is_pic: bool,
        debug_info_dir: PathBuf,
        target_prefix: Option<&Path>,
    ) -> Result<Self> {
        let elf_path = match target_prefix {
            Some(prefix) => prefix.join(path.trim_start_matches('/')),
            None => PathBuf::from(path),
        };
        Ok(Self {
            low_addr,
            high_addr: low_addr + memsz,
            memsz,
            is_pic,
            elf_path,
            debug_info_dir,
            build_id: None,
            dbg_link: None,
            dwarf_attach_attempted: false,
            is_elf_only: false,
            file_build_id_matches: None,
            dwarf: None,
            symbols: None,
            elf_accessible: None,
        })
    }

    /// Whether the on-disk ELF file can be opened and parsed at all,
    /// memoized. `ProcessSources::query` uses this to tell "no
    /// information because the recorded binary isn't on this host"
    /// (a full resolution miss, scenario 2) apart from "this
    /// ELF is just missing DWARF" (a partial resolution, scenario 3).
    pub fn elf_accessible(&mut self, fd_cache: &mut FdCache) -> bool {
        if let Some(accessible) = self.elf_accessible {
            return accessible;
        }
        let accessible = fd_cache
            .open(&self.elf_path)
            .ok()
            .and_then(|mapped| object::File::parse(&*mapped.mmap).ok())
            .is_some();
        self.elf_accessible = Some(accessible);
        accessible
    }

    /// Whether a resolution attempt against this binary can produce
    /// any useful information: the ELF
    /// must be reachable, and any recorded build ID must have
    /// matched.
    pub fn is_resolvable(&mut self, fd_cache: &mut FdCache) -> bool {
        self.file_build_id_matches != Some(false) && self.elf_accessible(fd_cache)
    }

    pub fn low_addr(&self) -> u64 {
        self.low_addr
    }

    pub fn elf_path(&self) -> &Path {
        &self.elf_path
    }

    pub fn is_pic(&self) -> bool {
        self.is_pic
    }

    pub fn is_elf_only(&self) -> bool {
        self.is_elf_only
    }

    pub fn file_build_id_matches(&self) -> Option<bool> {
        self.file_build_id_matches
    }

    /// `low_addr <= addr < high_addr`.
    pub fn has_address(&self, addr: TraceAddress) -> bool {
        let a = addr.as_u64();
        self.low_addr <= a && a < self.high_addr
    }

    /// `"+0xHEX"` for PIC binaries (file-relative), `"@0xHEX"`
    /// otherwise.
    pub fn get_bin_loc(&self, addr: TraceAddress) -> String {
        if self.is_pic {
            format!("+{:#x}", addr.as_u64() - self.low_addr)
        } else {
            format!("@{:#x}", addr.as_u64())
        }
    }

    /// Record and verify a build ID against the on-disk ELF's
    /// `.note.gnu.build-id`. `file_build_id_matches`
    /// becomes permanent once set.
    pub fn set_build_id(&mut self, fd_cache: &mut FdCache, build_id: &[u8]) -> Result<()> {
        self.build_id = Some(build_id.to_vec());
        self.reset_dwarf_attachment();

        let matches = self.read_build_id_note(fd_cache).ok().flatten().as_deref() == Some(build_id);
        self.file_build_id_matches = Some(matches);
        if matches {
            Ok(())
        } else {
            Err(Error::Other(format!(
                "build id mismatch for {:?}",
                self.elf_path
            )))
        }
    }

    /// Record a GNU debug-link `(filename, crc32)` pair.
    pub fn set_debug_link(&mut self, filename: impl Into<String>, crc: u32) {
        self.dbg_link = Some((filename.into(), crc));
        self.reset_dwarf_attachment();
    }

    fn reset_dwarf_attachment(&mut self) {
        self.is_elf_only = false;
        self.dwarf_attach_attempted = false;
        self.dwarf = None;
    }

    fn read_build_id_note(&self, fd_cache: &mut FdCache) -> Result<Option<Vec<u8>>> {
        let mapped = fd_cache.open(&self.elf_path)?;
        let obj = object::File::parse(&*mapped.mmap)?;
        let Some(section) = obj.section_by_name(".note.gnu.build-id") else {
            return Ok(None);
        };
        let data = section.data()?;
        // GNU build-id notes always carry the 4-byte "GNU\0" name,
        // so the fixed header is exactly 16 bytes (4 namesz + 4
        // descsz + 4 type + 4 padded name).
        if data.len() < 16 {
            return Err(Error::BuildIdFormat);
        }
        Ok(Some(data[16..].to_vec()))
    }

    /// Resolve the function name covering `addr`, or `None` for "no
    /// information".
    pub fn lookup_function_name(
        &mut self,
        fd_cache: &mut FdCache,
        addr: TraceAddress,
    ) -> Result<Option<String>> {
        if self.file_build_id_matches == Some(false) {
            return Ok(None);
        }
        self.ensure_dwarf_attached(fd_cache)?;
        let file_addr = addr.normalize(self.low_addr, self.is_pic).as_u64();

        if !self.is_elf_only {
            if let Some(dwarf) = &self.dwarf {
                for unit in &dwarf.units {
                    if let Some(func) = unit.find_function(file_addr) {
                        if let Some(name) = &func.name {
                            return Ok(Some(name.clone()));
                        }
                    }
                }
            }
        }

        self.ensure_symbols_loaded(fd_cache);
        Ok(self.nearest_symbol(file_addr))
    }

    /// Resolve the source location covering `addr`, or `None` if no
    /// DWARF line information is available.
    pub fn lookup_source_location(
        &mut self,
        fd_cache: &mut FdCache,
        addr: TraceAddress,
    ) -> Result<Option<SourceLocation>> {
        if self.file_build_id_matches == Some(false) {
            return Ok(None);
        }
        self.ensure_dwarf_attached(fd_cache)?;
        if self.is_elf_only {
            return Ok(None);
        }
        let file_addr = addr.normalize(self.low_addr, self.is_pic).as_u64();
        let Some(dwarf) = &self.dwarf else {
            return Ok(None);
        };

        for unit in &dwarf.units {
            // Inlined routines report their call site, not their own
            // body's line.
            if let Some(inline) = unit.find_inline(file_addr) {
                if let (Some(file_idx), Some(line)) = (inline.call_file, inline.call_line) {
                    if let Some(file) = unit.file(file_idx) {
                        return Ok(Some(SourceLocation {
                            filename: file.to_string_lossy().to_string(),
                            line_no: line,
                        }));
                    }
                }
            }
            if let Some((file, line)) = unit.find_exact_line(file_addr) {
                return Ok(Some(SourceLocation {
                    filename: file.to_string_lossy().to_string(),
                    line_no: line,
                }));
            }
        }
        Ok(None)
    }

    /// Attempt, in order, to attach DWARF from (a) the ELF file
    /// itself, (b) the build-id convention, (c) the debug-link
    /// convention. Runs at most once per "generation" of
    /// build id / debug link (see `reset_dwarf_attachment`).
    fn ensure_dwarf_attached(&mut self, fd_cache: &mut FdCache) -> Result<()> {
        if self.dwarf_attach_attempted {
            return Ok(());
        }
        self.dwarf_attach_attempted = true;

        if let Some(units) = self.try_load_dwarf_from(fd_cache, &self.elf_path.clone())? {
            self.dwarf = Some(DwarfHandle { units });
            return Ok(());
        }

        if let Some(build_id) = self.build_id.clone() {
            if let Some(path) = paths::build_id_path(&self.debug_info_dir, &build_id) {
                if path.is_file() {
                    if let Some(units) = self.try_load_dwarf_from(fd_cache, &path)? {
                        self.dwarf = Some(DwarfHandle { units });
                        return Ok(());
                    }
                }
            }
        }

        if let Some((filename, crc)) = self.dbg_link.clone() {
            for candidate in paths::debug_link_candidates(&self.elf_path, &self.debug_info_dir, &filename) {
                if !candidate.is_file() {
                    continue;
                }
                if crc32::crc32_file(&candidate).ok() != Some(crc) {
                    continue;
                }
                if let Some(units) = self.try_load_dwarf_from(fd_cache, &candidate)? {
                    self.dwarf = Some(DwarfHandle { units });
                    return Ok(());
                }
            }
        }

        log::debug!(
            "no DWARF reachable for {:?}, falling back to ELF symbols",
            self.elf_path
        );
        self.is_elf_only = true;
        Ok(())
    }

    fn try_load_dwarf_from(
        &self,
        fd_cache: &mut FdCache,
        path: &Path,
    ) -> Result<Option<Vec<dwarf_unit::ParsedUnit>>> {
        let mapped = match fd_cache.open(path) {
            Ok(m) => m,
            Err(e) => {
                log::debug!("cannot open {path:?}: {e}");
                return Ok(None);
            }
        };
        let obj = match object::File::parse(&*mapped.mmap) {
            Ok(o) => o,
            Err(e) => {
                log::debug!("cannot parse {path:?} as an object file: {e}");
                return Ok(None);
            }
        };
        if obj.section_by_name(".debug_info").is_none() {
            return Ok(None);
        }
        let endian = if obj.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };
        let dwarf = match loader::load_par(&obj, endian) {
            Ok(d) => d,
            Err(e) => {
                log::debug!("failed loading DWARF sections from {path:?}: {e}");
                return Ok(None);
            }
        };
        match dwarf_unit::parse_units(&dwarf) {
            Ok(units) if !units.is_empty() => Ok(Some(units)),
            Ok(_) => Ok(None),
            Err(e) => {
                log::debug!("failed parsing DWARF units from {path:?}: {e}");
                Ok(None)
            }
        }
    }

    fn ensure_symbols_loaded(&mut self, fd_cache: &mut FdCache) {
        if self.symbols.is_some() {
            return;
        }
        let mut syms = Vec::new();
        if let Ok(mapped) = fd_cache.open(&self.elf_path) {
            if let Ok(obj) = object::File::parse(&*mapped.mmap) {
                for sym in obj.symbols() {
                    if sym.kind() != SymbolKind::Text {
                        continue;
                    }
                    if let Ok(name) = sym.name() {
                        syms.push((sym.address(), rustc_demangle::demangle(name).to_string()));
                    }
                }
            }
        }
        syms.sort_unstable_by_key(|(addr, _)| *addr);
        self.symbols = Some(syms);
    }

    fn nearest_symbol(&self, file_addr: u64) -> Option<String> {
        let syms = self.symbols.as_ref()?;
        let idx = match syms.binary_search_by_key(&file_addr, |(addr, _)| *addr) {
            Ok(i) => i,
            Err(0) => return None,
            Err(i) => i - 1,
        };
        let (sym_addr, name) = &syms[idx];
        Some(format!("{name}+{:#x}", file_addr - sym_addr))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn bin(low: u64, memsz: u64, is_pic: bool) -> BinaryInfo {
        BinaryInfo::create("/nonexistent", low, memsz, is_pic, PathBuf::from("/usr/lib/debug"), None).unwrap()
    }

    #[test]
    fn has_address_is_half_open() {
        let b = bin(0x400000, 0x1000, false);
        assert!(b.has_address(TraceAddress::from(0x400000u64)));
        assert!(b.has_address(TraceAddress::from(0x400fffu64)));
        assert!(!b.has_address(TraceAddress::from(0x401000u64)));
    }

    #[test]
    fn bin_loc_pic_is_offset_from_low_addr() {
        let b = bin(0x400000, 0x1000, true);
        assert_eq!(b.get_bin_loc(TraceAddress::from(0x400500u64)), "+0x500");
    }

    #[test]
    fn bin_loc_non_pic_is_absolute() {
        let b = bin(0x400000, 0x1000, false);
        assert_eq!(b.get_bin_loc(TraceAddress::from(0x400500u64)), "@0x400500");
    }

    #[test]
    fn target_prefix_is_prepended() {
        let b = BinaryInfo::create(
            "/usr/bin/foo",
            0x1000,
            0x1000,
            false,
            PathBuf::from("/usr/lib/debug"),
            Some(Path::new("/mnt/target")),
        )
        .unwrap();
        assert_eq!(b.elf_path(), Path::new("/mnt/target/usr/bin/foo"));
    }

    #[test]
    fn missing_binary_is_usable_for_containment_only() {
        let mut b = bin(0x400000, 0x1000, false);
        let mut cache = FdCache::new();
        // The file doesn't exist; the lookup degrades to "no
        // information" rather than propagating an I/O error.
        let result = b.lookup_function_name(&mut cache, TraceAddress::from(0x400500u64));
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), None);
        assert!(b.is_elf_only());
    }

    #[test]
    fn build_id_mismatch_is_sticky_and_blocks_resolution() {
        let mut b = bin(0x400000, 0x1000, false);
        let mut cache = FdCache::new();
        // The ELF doesn't exist, so `read_build_id_note` can never
        // confirm a match — the same path a real on-disk build-id
        // disagreement takes.
        let set_result = b.set_build_id(&mut cache, &[0xde, 0xad, 0xbe, 0xef]);
        assert!(set_result.is_err());
        assert_eq!(b.file_build_id_matches(), Some(false));

        let addr = TraceAddress::from(0x400500u64);
        assert_eq!(b.lookup_function_name(&mut cache, addr).unwrap(), None);
        assert_eq!(b.lookup_source_location(&mut cache, addr).unwrap(), None);
    }

    #[test]
    fn resolved_debug_info_formats_fields() {
        let info = ResolvedDebugInfo::new(
            Some("foo".to_string()),
            Some(SourceLocation {
                filename: "/src/foo.c".to_string(),
                line_no: 42,
            }),
            "/usr/bin/foo".to_string(),
            "+0x10".to_string(),
        );
        assert_eq!(info.bin_field(true), "/usr/bin/foo+0x10");
        assert_eq!(info.bin_field(false), "foo+0x10");
        assert_eq!(info.func_field(), "foo");
        assert_eq!(info.src_field(true), "/src/foo.c:42");
        assert_eq!(info.src_field(false), "foo.c:42");
    }

    #[test]
    fn resolved_debug_info_empty_src_is_empty_string() {
        let info = ResolvedDebugInfo::new(None, None, "/bin/a".to_string(), "@0x1".to_string());
        assert_eq!(info.func_field(), "");
        assert_eq!(info.src_field(false), "");
    }
}
