//! Path conventions for locating separate DWARF files.

use std::path::{Path, PathBuf};

/// `<debug_dir>/.build-id/<xx>/<yyyy...>.debug`.
///
/// Returns `None` if `build_id` is empty (there is no first byte to
/// split off).
pub fn build_id_path(debug_dir: &Path, build_id: &[u8]) -> Option<PathBuf> {
    let (first, rest) = build_id.split_first()?;
    let mut path = debug_dir.join(".build-id");
    path.push(format!("{first:02x}"));
    let mut name = rest.iter().map(|b| format!("{b:02x}")).collect::<String>();
    name.push_str(".debug");
    path.push(name);
    Some(path)
}

/// Candidate paths for a GNU debug-link `filename`, tried in order
///: next to the binary, in its `.debug/` subdirectory,
/// and mirrored under the configured debug-info directory.
pub fn debug_link_candidates(elf_path: &Path, debug_dir: &Path, filename: &str) -> Vec<PathBuf> {
    let dir = elf_path.parent().unwrap_or_else(|| Path::new(""));
    let mut candidates = vec![dir.join(filename), dir.join(".debug").join(filename)];

    // `<debug_dir><dirname(elf_path)>/<filename>` — dirname is joined
    // as a relative suffix of debug_dir, matching the original's
    // string concatenation rather than PathBuf::join's absolute-path
    // override semantics.
    let dir_suffix = dir.strip_prefix("/").unwrap_or(dir);
    candidates.push(debug_dir.join(dir_suffix).join(filename));
    candidates
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn build_id_path_splits_first_byte() {
        let build_id = [0xab, 0xcd, 0xef, 0x01];
        let path = build_id_path(Path::new("/usr/lib/debug"), &build_id).unwrap();
        assert_eq!(
            path,
            PathBuf::from("/usr/lib/debug/.build-id/ab/cdef01.debug")
        );
    }

    #[test]
    fn build_id_path_empty_is_none() {
        assert!(build_id_path(Path::new("/usr/lib/debug"), &[]).is_none());
    }

    #[test]
    fn debug_link_candidates_in_order() {
        let candidates = debug_link_candidates(
            Path::new("/usr/bin/foo"),
            Path::new("/usr/lib/debug"),
            "foo.debug",
        );
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/usr/bin/foo.debug"),
                PathBuf::from("/usr/bin/.debug/foo.debug"),
                PathBuf::from("/usr/lib/debug/usr/bin/foo.debug"),
            ]
        );
    }
}
