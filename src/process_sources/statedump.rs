//! The seven LTTng-UST event names the statedump state machine reacts
//! to, interned as an enum. Real babeltrace interns event
//! names as GQuark integers for O(1) comparison; a `Copy` enum looked
//! up once via a static table gives the same property without a
//! quark table's global mutable state.

use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatedumpEvent {
    Start,
    BinInfo,
    DlOpen,
    LibLoad,
    LibUnload,
    BuildId,
    DebugLink,
}

static EVENT_NAMES: Lazy<HashMap<&'static str, StatedumpEvent>> = Lazy::new(|| {
    use StatedumpEvent::*;
    HashMap::from([
        ("lttng_ust_statedump:start", Start),
        ("lttng_ust_statedump:bin_info", BinInfo),
        ("lttng_ust_dl:dlopen", DlOpen),
        ("lttng_ust_lib:load", LibLoad),
        ("lttng_ust_lib:unload", LibUnload),
        ("lttng_ust_statedump:build_id", BuildId),
        ("lttng_ust_statedump:debug_link", DebugLink),
    ])
});

impl StatedumpEvent {
    pub fn from_name(name: &str) -> Option<Self> {
        EVENT_NAMES.get(name).copied()
    }
}

/// Cheap pre-filter so non-LTTng-UST traces ("non-LTTng
/// trace passthrough") never pay for a hash lookup per event.
pub fn is_lttng_ust(name: &str) -> bool {
    name.starts_with("lttng_ust_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_all_seven_events() {
        for name in [
            "lttng_ust_statedump:start",
            "lttng_ust_statedump:bin_info",
            "lttng_ust_dl:dlopen",
            "lttng_ust_lib:load",
            "lttng_ust_lib:unload",
            "lttng_ust_statedump:build_id",
            "lttng_ust_statedump:debug_link",
        ] {
            assert!(StatedumpEvent::from_name(name).is_some(), "{name}");
        }
    }

    #[test]
    fn unrelated_event_is_none() {
        assert_eq!(StatedumpEvent::from_name("sched:switch"), None);
    }

    #[test]
    fn prefix_filter_matches_quark_table() {
        assert!(!is_lttng_ust("sched:switch"));
        assert!(is_lttng_ust("lttng_ust_lib:load"));
    }
}
