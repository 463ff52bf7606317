//! The four user-configurable parameters.
//!
//! Parsing these out of plugin parameter objects is the host's job;
//! the core only ever sees a built `Config`.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the struct field spliced into the event common context.
    pub debug_info_field_name: String,
    /// Root under which `.build-id/` and debug-link fallback paths
    /// are searched.
    pub debug_info_dir: PathBuf,
    /// Prepended to every binary path recorded in the trace before
    /// opening it on the host filesystem.
    pub target_prefix: Option<PathBuf>,
    /// If true, `bin` and `src` fields carry absolute paths; if
    /// false, only the basename.
    pub full_path: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug_info_field_name: "debug_info".to_string(),
            debug_info_dir: PathBuf::from("/usr/lib/debug"),
            target_prefix: None,
            full_path: false,
        }
    }
}

impl Config {
    pub fn new(
        debug_info_field_name: impl Into<String>,
        debug_info_dir: impl Into<PathBuf>,
        target_prefix: Option<PathBuf>,
        full_path: bool,
    ) -> Self {
        Self {
            debug_info_field_name: debug_info_field_name.into(),
            debug_info_dir: debug_info_dir.into(),
            target_prefix,
            full_path,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = Config::default();
        assert_eq!(cfg.debug_info_field_name, "debug_info");
        assert_eq!(cfg.debug_info_dir, PathBuf::from("/usr/lib/debug"));
        assert_eq!(cfg.target_prefix, None);
        assert!(!cfg.full_path);
    }
}
