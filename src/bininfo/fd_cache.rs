//! Shared file-descriptor cache ("owned by the iterator
//! and used by all BinaryInfo objects it transitively creates").
//!
//! Opening and memory-mapping an ELF file is shared across every
//! `BinaryInfo` that happens to reference the same path — statedump
//! bursts routinely describe the same shared library loaded into
//! several processes. Single-threaded, keyed by canonical path.

use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{Error, Result};

pub struct MappedFile {
    pub mmap: Mmap,
}

impl MappedFile {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // Safety: memory-mapping a file the caller handed us a path
        // to; external modification while mapped is a standard,
        // accepted hazard of mmap-based ELF readers (matches the
        // teacher's use of `memmap2` in the same role).
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(MappedFile { mmap })
    }
}

#[derive(Default)]
pub struct FdCache {
    files: HashMap<PathBuf, Rc<MappedFile>>,
}

impl FdCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or return the cached handle for) `path`.
    pub fn open(&mut self, path: &Path) -> Result<Rc<MappedFile>> {
        if let Some(mapped) = self.files.get(path) {
            return Ok(mapped.clone());
        }
        let mapped = Rc::new(MappedFile::open(path)?);
        self.files.insert(path.to_path_buf(), mapped.clone());
        Ok(mapped)
    }

    /// Drop the cached handle for `path`, if any closed file is no
    /// longer referenced elsewhere.
    pub fn evict(&mut self, path: &Path) {
        self.files.remove(path);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
